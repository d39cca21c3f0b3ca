//! Schedule evaluation
//!
//! Schedules restrict *when* a list blocks. A list without a usable
//! schedule blocks all the time; the evaluator never fails toward access.

use crate::config::{BlockList, BlockPolicy, Schedule};
use crate::types::{Enforcement, Moment};

/// Whether a list governed by `schedule` is blocking at `at`.
///
/// In order: a disabled schedule blocks always; an empty day list blocks
/// always; an unlisted weekday does not block; an empty interval list blocks
/// all day; otherwise the current minute must fall inside an interval
/// (both endpoints inclusive).
pub fn is_blocking_active(schedule: &Schedule, at: &Moment) -> bool {
    if !schedule.enabled || schedule.days.is_empty() {
        return true;
    }
    if !schedule.days.contains(&at.weekday) {
        return false;
    }
    if schedule.intervals.is_empty() {
        return true;
    }
    schedule.intervals.iter().any(|iv| iv.contains(at.minute_of_day))
}

/// Pick strict or challenge for a `scheduled` list.
///
/// Returns `None` when the weekday is outside a configured `strictSchedule`
/// day list, meaning the list does not block at this instant. Inside the
/// strict windows the result is strict; every other minute is challenge.
pub fn resolve_scheduled_policy(list: &BlockList, at: &Moment) -> Option<Enforcement> {
    let strict = &list.strict_schedule;

    if !strict.days.is_empty() && !strict.days.contains(&at.weekday) {
        return None;
    }

    if strict.intervals.iter().any(|iv| iv.contains(at.minute_of_day)) {
        Some(Enforcement::Strict)
    } else {
        Some(Enforcement::Challenge)
    }
}

/// Enforcement for a list that matched and is schedule-active.
pub fn effective_policy(list: &BlockList, at: &Moment) -> Option<Enforcement> {
    match list.block_policy {
        BlockPolicy::Strict => Some(Enforcement::Strict),
        BlockPolicy::Challenge => Some(Enforcement::Challenge),
        BlockPolicy::Scheduled => resolve_scheduled_policy(list, at),
    }
}

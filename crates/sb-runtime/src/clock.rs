//! Wall clock seam.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use sb_core::types::Moment;

pub trait Clock: Send + Sync {
    fn now(&self) -> Moment;

    fn now_ms(&self) -> i64 {
        self.now().epoch_ms
    }
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Moment {
        Moment::now()
    }
}

/// A clock that only moves when told to. Weekday and minute are taken in
/// UTC so results do not depend on the host timezone.
#[derive(Debug, Default)]
pub struct ManualClock {
    epoch_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(epoch_ms: i64) -> Self {
        Self {
            epoch_ms: AtomicI64::new(epoch_ms),
        }
    }

    pub fn set(&self, epoch_ms: i64) {
        self.epoch_ms.store(epoch_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.epoch_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Moment {
        let epoch_ms = self.epoch_ms.load(Ordering::SeqCst);
        match Utc.timestamp_millis_opt(epoch_ms).single() {
            Some(dt) => Moment::from_datetime(&dt),
            None => Moment {
                epoch_ms,
                weekday: 0,
                minute_of_day: 0,
            },
        }
    }
}

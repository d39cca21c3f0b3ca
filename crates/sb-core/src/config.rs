//! Stored configuration and its read boundary.
//!
//! The extension keeps block lists and settings as loosely typed JSON in the
//! synced storage area. Everything is decoded here exactly once: absent or
//! wrongly typed fields take their defaults, so the matcher, schedule
//! evaluator and decision engine never re-check for missing data.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::TimeParseError;
use crate::url::is_http_url;

// =============================================================================
// Storage Keys
// =============================================================================

/// Synced area key holding the ordered block lists.
pub const BLOCK_LISTS_KEY: &str = "blockLists";
/// Synced area key holding global settings.
pub const SETTINGS_KEY: &str = "settings";
/// Synced area key holding challenge configuration.
pub const CHALLENGE_SETTINGS_KEY: &str = "triviaSettings";

/// Unlock duration granted by a passed challenge when none is configured.
pub const DEFAULT_UNLOCK_MINUTES: u32 = 10;
/// Estimated minutes saved each time a navigation is blocked.
pub const MINUTES_SAVED_PER_BLOCK: u64 = 5;

const MINUTES_PER_DAY: u16 = 24 * 60;

// =============================================================================
// Time of Day
// =============================================================================

/// Minute-resolution local wall-clock time, stored as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes < MINUTES_PER_DAY {
            Some(Self(minutes))
        } else {
            None
        }
    }

    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    /// Minutes since midnight.
    pub const fn minutes(self) -> u16 {
        self.0
    }

    /// Parse `H:MM` or `HH:MM` (hour 0-23, two-digit minute).
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let malformed = || TimeParseError::Malformed(s.to_string());

        let (hour, minute) = s.split_once(':').ok_or_else(malformed)?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
            return Err(malformed());
        }

        let hour: u16 = hour.parse().map_err(|_| malformed())?;
        let minute: u16 = minute.parse().map_err(|_| malformed())?;
        Self::from_hm(hour, minute).ok_or_else(|| TimeParseError::OutOfRange(s.to_string()))
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Schedules
// =============================================================================

/// Inclusive time window. An interval with a missing or unparsable endpoint
/// never contains any minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Interval {
    #[serde(default, deserialize_with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeOfDay>,
}

impl Interval {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Whether `minute_of_day` lies in `[start, end]`. No wraparound past
    /// midnight: a window with `end < start` contains nothing.
    pub fn contains(&self, minute_of_day: u16) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start.minutes() <= minute_of_day && minute_of_day <= end.minutes(),
            _ => false,
        }
    }
}

/// A weekly schedule: which weekdays (0 = Sunday) and which windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub enabled: bool,
    pub days: Vec<u8>,
    pub intervals: Vec<Interval>,
}

impl Default for Schedule {
    /// An absent schedule: enabled with no day list, so always active.
    fn default() -> Self {
        Self {
            enabled: true,
            days: Vec::new(),
            intervals: Vec::new(),
        }
    }
}

impl Schedule {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn on_days(days: impl IntoIterator<Item = u8>, intervals: Vec<Interval>) -> Self {
        Self {
            enabled: true,
            days: days.into_iter().filter(|d| *d <= 6).collect(),
            intervals,
        }
    }

    /// Decode any stored shape. Objects carry `enabled`/`days`/`intervals`
    /// (or the legacy single `start`/`end` pair); a bare array is a list of
    /// intervals; anything else is the default.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(fields) => {
                let enabled = !matches!(fields.get("enabled"), Some(Value::Bool(false)));
                let days = fields.get("days").map(decode_days).unwrap_or_default();
                let mut intervals = fields.get("intervals").map(decode_intervals).unwrap_or_default();

                if intervals.is_empty() {
                    let start = fields.get("start").and_then(decode_time);
                    let end = fields.get("end").and_then(decode_time);
                    if start.is_some() || end.is_some() {
                        intervals.push(Interval { start, end });
                    }
                }

                Self {
                    enabled,
                    days,
                    intervals,
                }
            }
            Value::Array(_) => Self {
                intervals: decode_intervals(value),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn decode_days(value: &Value) -> Vec<u8> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_u64)
            .filter(|d| *d <= 6)
            .map(|d| d as u8)
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_intervals(value: &Value) -> Vec<Interval> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_time(value: &Value) -> Option<TimeOfDay> {
    value.as_str().and_then(|s| TimeOfDay::parse(s).ok())
}

// =============================================================================
// Policies
// =============================================================================

/// Enforcement strength configured on a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockPolicy {
    /// Hard redirect, no bypass.
    #[default]
    Strict,
    /// Redirect to the challenge page (stored as `"difficult"`).
    Challenge,
    /// Strict or challenge depending on `strictSchedule`.
    Scheduled,
}

impl BlockPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Challenge => "difficult",
            Self::Scheduled => "scheduled",
        }
    }

    /// Unknown policy strings fall back to strict.
    pub fn parse(s: &str) -> Self {
        match s {
            "difficult" | "challenge" => Self::Challenge,
            "scheduled" => Self::Scheduled,
            _ => Self::Strict,
        }
    }
}

impl Serialize for BlockPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Self::parse).unwrap_or_default())
    }
}

/// Whether a list denies or permits its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    #[default]
    Block,
    Allow,
}

// =============================================================================
// Block Lists
// =============================================================================

/// A named, ordered collection of entries with its own policy and schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockList {
    #[serde(deserialize_with = "lenient")]
    pub id: String,
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub enabled: bool,
    #[serde(deserialize_with = "lenient")]
    pub list_type: ListType,
    #[serde(deserialize_with = "lenient_strings")]
    pub websites: Vec<String>,
    pub block_policy: BlockPolicy,
    pub schedule: Schedule,
    pub strict_schedule: Schedule,
    /// Carried for the settings UI; decisions never consult it.
    pub challenge_schedule: Schedule,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub custom_redirect: Option<String>,
}

impl Default for BlockList {
    /// The shape of a stored list with every field missing: inert.
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            enabled: false,
            list_type: ListType::Block,
            websites: Vec::new(),
            block_policy: BlockPolicy::Strict,
            schedule: Schedule::default(),
            strict_schedule: Schedule::default(),
            challenge_schedule: Schedule::default(),
            custom_redirect: None,
        }
    }
}

impl BlockList {
    /// A freshly created list as the settings UI makes it.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let all_week = 0..=6;
        let window = |start: (u16, u16), end: (u16, u16)| {
            match (TimeOfDay::from_hm(start.0, start.1), TimeOfDay::from_hm(end.0, end.1)) {
                (Some(start), Some(end)) => vec![Interval::new(start, end)],
                _ => Vec::new(),
            }
        };

        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            strict_schedule: Schedule {
                enabled: false,
                ..Schedule::on_days(all_week.clone(), window((9, 0), (17, 0)))
            },
            challenge_schedule: Schedule {
                enabled: false,
                ..Schedule::on_days(all_week, window((18, 0), (22, 0)))
            },
            ..Self::default()
        }
    }

    pub fn with_websites<I, S>(mut self, websites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.websites = websites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_policy(mut self, policy: BlockPolicy) -> Self {
        self.block_policy = policy;
        self
    }

    /// The configured custom redirect, if it is a usable http(s) URL.
    pub fn custom_redirect_target(&self) -> Option<&str> {
        self.custom_redirect
            .as_deref()
            .map(str::trim)
            .filter(|target| is_http_url(target))
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Block counters shown by the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    #[serde(deserialize_with = "lenient")]
    pub attempt_count: u64,
    /// Estimated minutes saved.
    #[serde(deserialize_with = "lenient")]
    pub times_saved: u64,
}

impl Stats {
    pub fn record_block(&mut self) {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.times_saved = self.times_saved.saturating_add(MINUTES_SAVED_PER_BLOCK);
    }
}

/// Global settings. Fields this crate does not interpret (theme, focus
/// preferences) are kept in `extra` so writes do not drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient_flag_on")]
    pub blocking_enabled: bool,
    /// Epoch milliseconds at which a timed global disable ends.
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub blocking_disabled_until: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub stats: Stats,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blocking_enabled: true,
            blocking_disabled_until: None,
            stats: Stats::default(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Whether a timed global disable has run out and blocking should be
    /// switched back on.
    pub fn reenable_due(&self, now_ms: i64) -> bool {
        !self.blocking_enabled && self.blocking_disabled_until.is_some_and(|until| now_ms >= until)
    }

    pub fn reenable(&mut self) {
        self.blocking_enabled = true;
        self.blocking_disabled_until = None;
    }
}

/// Challenge configuration (stored under `triviaSettings`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSettings {
    #[serde(rename = "unlockDuration", deserialize_with = "lenient")]
    pub unlock_duration: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChallengeSettings {
    /// Minutes a passed challenge unblocks a site for.
    pub fn unlock_minutes(&self) -> u32 {
        if self.unlock_duration == 0 {
            DEFAULT_UNLOCK_MINUTES
        } else {
            self.unlock_duration
        }
    }
}

// =============================================================================
// Read Boundary
// =============================================================================

/// Decode the stored block list array. Elements that are not objects are
/// skipped; missing array means no lists.
pub fn load_block_lists(value: Option<&Value>) -> Vec<BlockList> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                if !item.is_object() {
                    warn!("Skipping block list #{index}: not an object");
                    return None;
                }
                serde_json::from_value(item.clone())
                    .map_err(|e| warn!("Skipping block list #{index}: {e}"))
                    .ok()
            })
            .collect(),
        Some(_) => {
            warn!("Stored block lists are not an array, treating as empty");
            Vec::new()
        }
    }
}

pub fn load_settings(value: Option<&Value>) -> Settings {
    decode_or_default(value, SETTINGS_KEY)
}

pub fn load_challenge_settings(value: Option<&Value>) -> ChallengeSettings {
    decode_or_default(value, CHALLENGE_SETTINGS_KEY)
}

fn decode_or_default<T: DeserializeOwned + Default>(value: Option<&Value>, key: &str) -> T {
    match value {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            warn!("Stored {key} unreadable ({e}), using defaults");
            T::default()
        }),
    }
}

/// Everything from the synced area that a decision depends on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicySnapshot {
    pub settings: Settings,
    pub lists: Vec<BlockList>,
    pub challenge: ChallengeSettings,
}

impl PolicySnapshot {
    pub fn new(settings: Settings, lists: Vec<BlockList>) -> Self {
        Self {
            settings,
            lists,
            challenge: ChallengeSettings::default(),
        }
    }

    /// Decode from the key/value mapping of the synced storage area.
    pub fn from_sync_area(area: &Map<String, Value>) -> Self {
        Self {
            settings: load_settings(area.get(SETTINGS_KEY)),
            lists: load_block_lists(area.get(BLOCK_LISTS_KEY)),
            challenge: load_challenge_settings(area.get(CHALLENGE_SETTINGS_KEY)),
        }
    }
}

// =============================================================================
// Lenient Field Decoders
// =============================================================================

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_flag_on<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(true))
}

fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<TimeOfDay>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(decode_time(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_time_parse() {
        assert_eq!(TimeOfDay::parse("09:00").map(TimeOfDay::minutes), Ok(540));
        assert_eq!(TimeOfDay::parse("9:05").map(TimeOfDay::minutes), Ok(545));
        assert_eq!(TimeOfDay::parse("23:59").map(TimeOfDay::minutes), Ok(1439));
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("12:5").is_err());
        assert!(TimeOfDay::parse("12:60").is_err());
        assert!(TimeOfDay::parse("noon").is_err());
        assert!(TimeOfDay::parse("123:00").is_err());
    }

    #[test]
    fn test_time_display() {
        let t = TimeOfDay::from_hm(7, 5).unwrap();
        assert_eq!(t.to_string(), "07:05");
    }

    #[test]
    fn test_interval_inclusive() {
        let iv = Interval::new(TimeOfDay::from_hm(9, 0).unwrap(), TimeOfDay::from_hm(17, 0).unwrap());
        assert!(iv.contains(540));
        assert!(iv.contains(1020));
        assert!(!iv.contains(539));
        assert!(!iv.contains(1021));
        assert!(!Interval::default().contains(600));
    }

    #[test]
    fn test_schedule_defaults_when_missing() {
        let list: BlockList = serde_json::from_value(json!({
            "id": "a",
            "name": "A",
            "enabled": true,
            "websites": ["example.com"]
        }))
        .unwrap();
        assert_eq!(list.schedule, Schedule::default());
        assert!(list.schedule.enabled);
        assert_eq!(list.block_policy, BlockPolicy::Strict);
        assert_eq!(list.custom_redirect, None);
    }

    #[test]
    fn test_schedule_legacy_start_end() {
        let schedule = Schedule::from_value(&json!({ "start": "09:00", "end": "17:00" }));
        assert_eq!(schedule.intervals.len(), 1);
        assert!(schedule.intervals[0].contains(600));
        assert!(schedule.days.is_empty());
    }

    #[test]
    fn test_schedule_interval_array() {
        let schedule = Schedule::from_value(&json!([{ "start": "18:00", "end": "22:00" }]));
        assert!(schedule.enabled);
        assert_eq!(schedule.intervals.len(), 1);
    }

    #[test]
    fn test_schedule_malformed_fields() {
        let schedule = Schedule::from_value(&json!({
            "enabled": "yes",
            "days": [1, "x", 9, 3],
            "intervals": [{ "start": "bad", "end": "10:00" }, 7]
        }));
        assert!(schedule.enabled);
        assert_eq!(schedule.days, vec![1, 3]);
        assert_eq!(schedule.intervals.len(), 2);
        assert!(schedule.intervals.iter().all(|iv| !iv.contains(540)));
    }

    #[test]
    fn test_policy_parse() {
        let list: BlockList = serde_json::from_value(json!({ "blockPolicy": "difficult" })).unwrap();
        assert_eq!(list.block_policy, BlockPolicy::Challenge);
        let list: BlockList = serde_json::from_value(json!({ "blockPolicy": 42 })).unwrap();
        assert_eq!(list.block_policy, BlockPolicy::Strict);
        let list: BlockList = serde_json::from_value(json!({ "blockPolicy": "whatever" })).unwrap();
        assert_eq!(list.block_policy, BlockPolicy::Strict);
        assert_eq!(serde_json::to_value(BlockPolicy::Challenge).unwrap(), json!("difficult"));
    }

    #[test]
    fn test_websites_drop_non_strings() {
        let list: BlockList = serde_json::from_value(json!({
            "websites": ["a.com", 5, null, "", "*casino*"]
        }))
        .unwrap();
        assert_eq!(list.websites, vec!["a.com", "*casino*"]);
    }

    #[test]
    fn test_custom_redirect_target() {
        let mut list = BlockList::new("a", "A");
        assert_eq!(list.custom_redirect_target(), None);
        list.custom_redirect = Some(String::new());
        assert_eq!(list.custom_redirect_target(), None);
        list.custom_redirect = Some("ftp://files".into());
        assert_eq!(list.custom_redirect_target(), None);
        list.custom_redirect = Some("https://calendar.example.org/today".into());
        assert_eq!(list.custom_redirect_target(), Some("https://calendar.example.org/today"));
    }

    #[test]
    fn test_load_block_lists_tolerates_garbage() {
        let value = json!([
            { "id": "a", "name": "A", "enabled": true, "websites": ["a.com"] },
            "not a list",
            { "id": "b", "enabled": "maybe" }
        ]);
        let lists = load_block_lists(Some(&value));
        assert_eq!(lists.len(), 2);
        assert!(lists[0].enabled);
        assert!(!lists[1].enabled);

        assert!(load_block_lists(Some(&json!({ "oops": true }))).is_empty());
        assert!(load_block_lists(None).is_empty());
    }

    #[test]
    fn test_settings_defaults_and_extra_fields() {
        assert!(load_settings(None).blocking_enabled);

        let settings = load_settings(Some(&json!({
            "blockingEnabled": false,
            "darkMode": true,
            "stats": { "attemptCount": 3, "timesSaved": 15 }
        })));
        assert!(!settings.blocking_enabled);
        assert_eq!(settings.stats.attempt_count, 3);
        assert_eq!(settings.extra.get("darkMode"), Some(&json!(true)));

        let round = serde_json::to_value(&settings).unwrap();
        assert_eq!(round["darkMode"], json!(true));
        assert_eq!(round["blockingEnabled"], json!(false));

        let settings = load_settings(Some(&json!({ "blockingEnabled": "nope" })));
        assert!(settings.blocking_enabled);
    }

    #[test]
    fn test_reenable_due() {
        let mut settings = Settings {
            blocking_enabled: false,
            blocking_disabled_until: Some(1_000),
            ..Settings::default()
        };
        assert!(!settings.reenable_due(999));
        assert!(settings.reenable_due(1_000));
        settings.reenable();
        assert!(settings.blocking_enabled);
        assert!(!settings.reenable_due(5_000));
    }

    #[test]
    fn test_stats_record_block() {
        let mut stats = Stats::default();
        stats.record_block();
        stats.record_block();
        assert_eq!(stats.attempt_count, 2);
        assert_eq!(stats.times_saved, 10);
    }

    #[test]
    fn test_unlock_minutes_default() {
        assert_eq!(load_challenge_settings(None).unlock_minutes(), 10);
        let challenge = load_challenge_settings(Some(&json!({ "unlockDuration": 25, "amount": 3 })));
        assert_eq!(challenge.unlock_minutes(), 25);
    }

    #[test]
    fn test_snapshot_from_sync_area() {
        let area = json!({
            "blockLists": [{ "id": "a", "enabled": true, "websites": ["x.com"] }],
            "settings": { "blockingEnabled": true }
        });
        let snapshot = PolicySnapshot::from_sync_area(area.as_object().unwrap());
        assert_eq!(snapshot.lists.len(), 1);
        assert!(snapshot.settings.blocking_enabled);
        assert_eq!(snapshot.challenge.unlock_minutes(), DEFAULT_UNLOCK_MINUTES);
    }
}

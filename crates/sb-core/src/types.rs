//! Core type definitions for Site Blocker
//!
//! Decision outputs, enforcement modes and the block pages they point at.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enforcement
// =============================================================================

/// Block page served by the extension for strict blocks.
pub const STRICT_PAGE: &str = "blocked-strict.html";
/// Block page hosting the trivia / typing challenge.
pub const CHALLENGE_PAGE: &str = "blocked-challenge.html";
/// Base URL used when the embedder does not supply the extension origin.
pub const DEFAULT_BASE_URL: &str = "chrome-extension://site-blocker";

/// How a block is enforced once a list applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// Hard redirect with no way through.
    Strict,
    /// Redirect to the challenge page; passing it grants a temporary override.
    Challenge,
}

impl Enforcement {
    pub fn page(self) -> &'static str {
        match self {
            Self::Strict => STRICT_PAGE,
            Self::Challenge => CHALLENGE_PAGE,
        }
    }
}

// =============================================================================
// Block Decision
// =============================================================================

/// Final decision for a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BlockDecision {
    /// Navigation proceeds.
    Allow,
    /// Navigation is redirected to a block page.
    Block {
        via: Enforcement,
        #[serde(rename = "redirectTarget")]
        redirect_target: String,
    },
    /// Navigation is redirected to the list's own URL.
    CustomRedirect { url: String },
}

impl BlockDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Where the tab should be sent, if anywhere.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Block { redirect_target, .. } => Some(redirect_target),
            Self::CustomRedirect { url } => Some(url),
        }
    }
}

// =============================================================================
// Block Pages
// =============================================================================

/// Locations of the extension's block pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPages {
    base_url: String,
}

impl Default for BlockPages {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BlockPages {
    /// `base_url` is the extension origin, e.g. `chrome-extension://<id>`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bare page URL for a mode.
    pub fn page_url(&self, via: Enforcement) -> String {
        format!("{}/{}", self.base_url, via.page())
    }

    /// Page URL carrying the blocked URL so the challenge page can send the
    /// user back after a pass.
    pub fn redirect_for(&self, via: Enforcement, original_url: &str) -> String {
        format!("{}?url={}", self.page_url(via), urlencoding::encode(original_url))
    }
}

// =============================================================================
// Moment
// =============================================================================

/// A point in time as the decision engine sees it: absolute milliseconds for
/// override expiry plus the local weekday and minute for schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub epoch_ms: i64,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u8,
    pub minute_of_day: u16,
}

impl Moment {
    /// Current local time.
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            epoch_ms: dt.timestamp_millis(),
            weekday: dt.weekday().num_days_from_sunday() as u8,
            minute_of_day: (dt.hour() * 60 + dt.minute()) as u16,
        }
    }

    /// Local time at an epoch millisecond timestamp.
    pub fn from_epoch_ms(epoch_ms: i64) -> Option<Self> {
        Local
            .timestamp_millis_opt(epoch_ms)
            .single()
            .map(|dt| Self::from_datetime(&dt))
    }
}

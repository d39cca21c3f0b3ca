//! Site Blocker Core Library
//!
//! This crate holds the blocking decision engine for the Site Blocker
//! extension: everything needed to answer "should this navigation be
//! blocked right now, and how?" without touching storage or the browser.
//!
//! # Architecture
//!
//! Configuration is decoded once at the read boundary (`config`) into fully
//! populated values. The decision engine then combines the list matcher, the
//! schedule evaluator and a snapshot of temporary overrides into a single
//! [`BlockDecision`]. All of it is pure given its inputs, so the declarative
//! rule compiler and the live per-tab check can share it freely.
//!
//! # Modules
//!
//! - `config`: stored block lists and settings, lenient decoding
//! - `matcher`: domain and keyword entry matching
//! - `schedule`: blocking windows and scheduled policy resolution
//! - `overrides`: temporary unblock keys, expiry checks and sweeping
//! - `decision`: the decision engine
//! - `catalog`: block list management rules
//! - `url`: allocation-free URL helpers
//! - `types`: decisions, enforcement modes, block pages, moments

pub mod catalog;
pub mod config;
pub mod decision;
pub mod error;
pub mod matcher;
pub mod overrides;
pub mod schedule;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use catalog::ListCatalog;
pub use config::{BlockList, BlockPolicy, PolicySnapshot, Schedule, Settings};
pub use decision::DecisionEngine;
pub use error::{CatalogError, TimeParseError};
pub use overrides::OverrideSnapshot;
pub use types::{BlockDecision, BlockPages, Enforcement, Moment};

//! Site Blocker Runtime
//!
//! The background side of the extension: storage, declarative rule and tab
//! seams, the temporary override store, and the coordinator that ties them
//! to the pure decision engine in `sb-core`.
//!
//! Browser APIs are reached only through the traits in [`store`] and
//! [`engine`]. In-memory implementations are provided for the CLI and for
//! tests.

pub mod cache;
pub mod clock;
pub mod coordinator;
pub mod engine;
pub mod message;
pub mod overrides;
pub mod store;

pub use cache::PolicyCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{CompileOutcome, CoordinatorConfig, EnforcementCoordinator, Services, SweepReport};
pub use engine::{
    MemoryRuleEngine, NavigationError, RecordingNavigator, RuleEngine, RuleEngineError, TabId, TabInfo, TabNavigator,
};
pub use message::Message;
pub use overrides::TemporaryOverrideStore;
pub use store::{KeyValueStore, MemoryStore, StorageArea, StorageChange, StoreError};

//! Browser seams: the declarative rule engine and tab navigation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use sb_compiler::DeclarativeRule;

/// Browser tab identifier.
pub type TabId = i32;

/// A tab whose top-level navigation just completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

impl TabInfo {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleEngineError {
    #[error("rule engine unavailable: {0}")]
    Unavailable(String),
    #[error("duplicate rule id {0}")]
    DuplicateId(u32),
    #[error("rule set of {count} exceeds the limit of {limit}")]
    TooManyRules { count: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("tab {0} no longer exists")]
    TabClosed(TabId),
    #[error("navigation failed: {0}")]
    Failed(String),
}

/// The browser's dynamic declarative rule table.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    async fn get_current_rules(&self) -> Result<Vec<DeclarativeRule>, RuleEngineError>;

    /// Remove `remove_ids` and add `add` as one transaction. On error the
    /// table is left as it was.
    async fn replace_rules(&self, remove_ids: &[u32], add: Vec<DeclarativeRule>) -> Result<(), RuleEngineError>;
}

#[async_trait]
pub trait TabNavigator: Send + Sync {
    async fn update_tab_location(&self, tab_id: TabId, url: &str) -> Result<(), NavigationError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// In-memory implementations
// =============================================================================

/// Rule table held in memory, with the same transactional contract and id
/// checks as the browser's.
#[derive(Default)]
pub struct MemoryRuleEngine {
    rules: Mutex<Vec<DeclarativeRule>>,
    limit: Option<usize>,
    replacements: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn rules(&self) -> Vec<DeclarativeRule> {
        lock(&self.rules).clone()
    }

    /// Number of successful `replace_rules` calls.
    pub fn replacements(&self) -> usize {
        self.replacements.load(Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RuleEngineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RuleEngineError::Unavailable("rule engine offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RuleEngine for MemoryRuleEngine {
    async fn get_current_rules(&self) -> Result<Vec<DeclarativeRule>, RuleEngineError> {
        self.check_available()?;
        Ok(self.rules())
    }

    async fn replace_rules(&self, remove_ids: &[u32], add: Vec<DeclarativeRule>) -> Result<(), RuleEngineError> {
        self.check_available()?;
        let mut rules = lock(&self.rules);

        let mut next: Vec<DeclarativeRule> = rules
            .iter()
            .filter(|rule| !remove_ids.contains(&rule.id))
            .cloned()
            .collect();
        next.extend(add);

        let mut seen = HashSet::new();
        if let Some(rule) = next.iter().find(|rule| !seen.insert(rule.id)) {
            return Err(RuleEngineError::DuplicateId(rule.id));
        }
        if let Some(limit) = self.limit {
            if next.len() > limit {
                return Err(RuleEngineError::TooManyRules {
                    count: next.len(),
                    limit,
                });
            }
        }

        *rules = next;
        self.replacements.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Navigator that records every redirect instead of performing it.
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<(TabId, String)>>,
    closed: Mutex<HashSet<TabId>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<(TabId, String)> {
        lock(&self.visits).clone()
    }

    /// Make later navigations of `tab_id` fail.
    pub fn close_tab(&self, tab_id: TabId) {
        lock(&self.closed).insert(tab_id);
    }
}

#[async_trait]
impl TabNavigator for RecordingNavigator {
    async fn update_tab_location(&self, tab_id: TabId, url: &str) -> Result<(), NavigationError> {
        if lock(&self.closed).contains(&tab_id) {
            return Err(NavigationError::TabClosed(tab_id));
        }
        lock(&self.visits).push((tab_id, url.to_string()));
        Ok(())
    }
}

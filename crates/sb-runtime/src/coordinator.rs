//! Enforcement coordinator
//!
//! Keeps the browser's declarative rules in step with stored configuration
//! and enforces what those rules cannot express on each completed
//! navigation.
//!
//! Compiles are debounced: every request restarts a single pending timer
//! and one compile runs once requests stop for the debounce period. A
//! compile that finds another already running is dropped; whatever
//! triggered it is observed again by the next event. A running compile is
//! never cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::Map;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use sb_compiler::{CompileOutput, RuleCompiler, MAX_RULES};
use sb_core::catalog::ListCatalog;
use sb_core::config::{load_block_lists, load_settings, Settings, BLOCK_LISTS_KEY, SETTINGS_KEY};
use sb_core::decision::DecisionEngine;
use sb_core::overrides::OverrideSnapshot;
use sb_core::types::{BlockDecision, BlockPages, DEFAULT_BASE_URL};
use sb_core::url::{extract_host, extract_scheme, Scheme};

use crate::cache::PolicyCache;
use crate::clock::Clock;
use crate::engine::{RuleEngine, RuleEngineError, TabInfo, TabNavigator};
use crate::message::Message;
use crate::overrides::TemporaryOverrideStore;
use crate::store::{KeyValueStore, StorageArea, StorageChange, StoreError};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Quiet period before a requested compile runs.
    pub debounce: Duration,
    /// Period of the expired-override sweep.
    pub sweep_interval: Duration,
    pub max_rules: usize,
    /// Extension origin the block pages live under.
    pub base_url: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            sweep_interval: Duration::from_secs(60),
            max_rules: MAX_RULES,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Everything the coordinator talks to.
pub struct Services {
    pub sync: Arc<dyn KeyValueStore>,
    pub local: Arc<dyn KeyValueStore>,
    /// Optional best-effort backup for override reads.
    pub fallback: Option<Arc<dyn KeyValueStore>>,
    pub rules: Arc<dyn RuleEngine>,
    pub tabs: Arc<dyn TabNavigator>,
    pub clock: Arc<dyn Clock>,
}

// =============================================================================
// Outcomes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    Installed { rules: usize, truncated: bool },
    /// Another compile was running.
    Skipped,
    /// The previous rules were kept.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub overrides_removed: usize,
    pub blocking_reenabled: bool,
}

// =============================================================================
// Coordinator
// =============================================================================

struct Inner {
    config: CoordinatorConfig,
    pages: BlockPages,
    sync: Arc<dyn KeyValueStore>,
    rules: Arc<dyn RuleEngine>,
    tabs: Arc<dyn TabNavigator>,
    clock: Arc<dyn Clock>,
    overrides: TemporaryOverrideStore,
    policy: PolicyCache,
    compiling: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Clears the compiling flag when a compile ends, however it ends.
struct CompilingGuard<'a>(&'a AtomicBool);

impl Drop for CompilingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct EnforcementCoordinator {
    inner: Arc<Inner>,
}

impl EnforcementCoordinator {
    pub fn new(services: Services, config: CoordinatorConfig) -> Self {
        let mut overrides = TemporaryOverrideStore::new(services.local, services.clock.clone());
        if let Some(fallback) = services.fallback {
            overrides = overrides.with_fallback(fallback);
        }

        Self {
            inner: Arc::new(Inner {
                pages: BlockPages::new(config.base_url.clone()),
                config,
                policy: PolicyCache::new(services.sync.clone()),
                sync: services.sync,
                rules: services.rules,
                tabs: services.tabs,
                clock: services.clock,
                overrides,
                compiling: AtomicBool::new(false),
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn overrides(&self) -> &TemporaryOverrideStore {
        &self.inner.overrides
    }

    pub fn pages(&self) -> &BlockPages {
        &self.inner.pages
    }

    /// Schedule a compile after the debounce period, replacing any compile
    /// still waiting. Must be called within a tokio runtime.
    pub fn request_compile(&self) {
        let mut pending = lock(&self.inner.pending);
        if let Some(waiting) = pending.take() {
            waiting.abort();
        }

        let this = self.clone();
        let delay = self.inner.config.debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // detached so a later request cannot abort it mid-flight
            tokio::spawn(async move {
                this.compile_now().await;
            });
        }));
        debug!("Rule compile scheduled in {delay:?}");
    }

    /// Compile and install rules now, unless a compile is already running.
    pub async fn compile_now(&self) -> CompileOutcome {
        if self.inner.compiling.swap(true, Ordering::AcqRel) {
            info!("Rule compile already in progress, dropping request");
            return CompileOutcome::Skipped;
        }
        let _guard = CompilingGuard(&self.inner.compiling);

        match self.install_rules().await {
            Ok(Some(output)) => CompileOutcome::Installed {
                rules: output.rules.len(),
                truncated: output.stats.truncated,
            },
            Ok(None) => CompileOutcome::Failed,
            Err(e) => {
                error!("Rule update failed, keeping previous rules: {e}");
                CompileOutcome::Failed
            }
        }
    }

    async fn install_rules(&self) -> Result<Option<CompileOutput>, RuleEngineError> {
        let policy = match self.inner.policy.load().await {
            Ok(policy) => policy,
            Err(e) => {
                error!("Cannot read configuration, keeping previous rules: {e}");
                return Ok(None);
            }
        };
        let overrides = self.inner.overrides.snapshot_all().await.unwrap_or_else(|e| {
            warn!("Cannot read overrides, compiling without them: {e}");
            OverrideSnapshot::new()
        });

        let output = RuleCompiler::new(&self.inner.pages)
            .with_max_rules(self.inner.config.max_rules)
            .compile(&policy, &overrides, self.inner.clock.now_ms());

        let current = self.inner.rules.get_current_rules().await?;
        let remove_ids: Vec<u32> = current.iter().map(|rule| rule.id).collect();
        self.inner.rules.replace_rules(&remove_ids, output.rules.clone()).await?;

        info!(
            "Installed {} rules (removed {}, truncated: {})",
            output.rules.len(),
            remove_ids.len(),
            output.stats.truncated
        );
        Ok(Some(output))
    }

    /// Per-tab enforcement for a completed top-level navigation. Only
    /// http(s) pages are checked, so block pages never loop.
    pub async fn on_navigation_complete(&self, tab: &TabInfo) -> BlockDecision {
        if !extract_scheme(&tab.url).is_some_and(Scheme::is_web) {
            return BlockDecision::Allow;
        }
        let Some(host) = extract_host(&tab.url) else {
            return BlockDecision::Allow;
        };

        let policy = self.inner.policy.current().await;
        let overrides = self.inner.overrides.snapshot_for(host).await;
        let at = self.inner.clock.now();
        let decision = DecisionEngine::new(&policy, &overrides, &self.inner.pages).decide(host, &tab.url, &at);

        if let Some(target) = decision.redirect_target() {
            match self.inner.tabs.update_tab_location(tab.id, target).await {
                Ok(()) => {
                    info!("Redirected tab {} from {} to {target}", tab.id, tab.url);
                    self.record_block().await;
                }
                Err(e) => warn!("Could not redirect tab {}: {e}", tab.id),
            }
        }
        decision
    }

    pub async fn handle_message(&self, message: Message) -> Result<(), StoreError> {
        match message {
            Message::UpdateRules => self.request_compile(),
            Message::SetTempUnblock { domain, unblock_until } => {
                self.inner.overrides.set_until(&domain, unblock_until).await?;
                self.request_compile();
            }
        }
        Ok(())
    }

    /// React to a storage notification.
    pub fn on_storage_change(&self, change: &StorageChange) {
        match change.area {
            StorageArea::Sync => {
                self.inner.policy.invalidate();
                if change.touches(BLOCK_LISTS_KEY) || change.touches(SETTINGS_KEY) {
                    self.request_compile();
                }
            }
            StorageArea::Local => {
                if change.touches_overrides() {
                    self.request_compile();
                }
            }
        }
    }

    /// Unblock `domain` for the configured unlock duration after a passed
    /// challenge. Returns the expiry.
    pub async fn grant_challenge_pass(&self, domain: &str) -> Result<i64, StoreError> {
        let minutes = self.inner.policy.current().await.challenge.unlock_minutes();
        let until = self.inner.overrides.grant(domain, minutes).await?;
        self.request_compile();
        Ok(until)
    }

    /// Periodic maintenance: drop expired overrides and end a timed global
    /// disable whose deadline has passed.
    pub async fn sweep_tick(&self) -> SweepReport {
        let overrides_removed = self.inner.overrides.sweep_expired().await.unwrap_or_else(|e| {
            warn!("Override sweep failed: {e}");
            0
        });

        let now = self.inner.clock.now_ms();
        let blocking_reenabled = match self.update_settings(|settings| {
            let due = settings.reenable_due(now);
            if due {
                settings.reenable();
            }
            due
        })
        .await
        {
            Ok(reenabled) => reenabled,
            Err(e) => {
                warn!("Could not check timed disable: {e}");
                false
            }
        };
        if blocking_reenabled {
            info!("Timed disable ended, blocking re-enabled");
        }

        if overrides_removed > 0 || blocking_reenabled {
            self.request_compile();
        }
        SweepReport {
            overrides_removed,
            blocking_reenabled,
        }
    }

    /// Store the default block list if storage holds none.
    pub async fn ensure_default_list(&self) -> Result<bool, StoreError> {
        let stored = self.inner.sync.get(&[BLOCK_LISTS_KEY.to_string()]).await?;
        if !load_block_lists(stored.get(BLOCK_LISTS_KEY)).is_empty() {
            return Ok(false);
        }
        let catalog = ListCatalog::from_lists(Vec::new());
        let mut entries = Map::new();
        entries.insert(BLOCK_LISTS_KEY.to_string(), catalog.to_value());
        self.inner.sync.set(entries).await?;
        Ok(true)
    }

    /// Start the event loop: initial compile, storage listeners and the
    /// periodic sweep. Runs until both stores close their change channels.
    pub fn spawn_background(&self) -> JoinHandle<()> {
        let mut sync_changes = self.inner.sync.subscribe();
        let mut local_changes = self.inner.overrides.store().subscribe();
        let this = self.clone();

        tokio::spawn(async move {
            if let Err(e) = this.ensure_default_list().await {
                warn!("Could not create default block list: {e}");
            }
            this.request_compile();

            let mut sweep = tokio::time::interval(this.inner.config.sweep_interval);
            // the first tick fires immediately
            sweep.tick().await;

            let (mut sync_open, mut local_open) = (true, true);
            while sync_open || local_open {
                tokio::select! {
                    _ = sweep.tick() => {
                        this.sweep_tick().await;
                    }
                    change = sync_changes.recv(), if sync_open => {
                        sync_open = this.on_change_event(change);
                    }
                    change = local_changes.recv(), if local_open => {
                        local_open = this.on_change_event(change);
                    }
                }
            }
            info!("Storage channels closed, stopping background loop");
        })
    }

    /// Returns false once the channel is closed.
    fn on_change_event(&self, change: Result<StorageChange, RecvError>) -> bool {
        match change {
            Ok(change) => {
                self.on_storage_change(&change);
                true
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("Missed {missed} storage notifications, resyncing");
                self.inner.policy.invalidate();
                self.request_compile();
                true
            }
            Err(RecvError::Closed) => false,
        }
    }

    async fn record_block(&self) {
        let result = self
            .update_settings(|settings| {
                settings.stats.record_block();
                true
            })
            .await;
        if let Err(e) = result {
            warn!("Could not update block stats: {e}");
        }
    }

    /// Read, modify and write back the stored settings. `edit` returns
    /// whether anything changed; nothing is written otherwise.
    async fn update_settings<F>(&self, edit: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Settings) -> bool,
    {
        let stored = self.inner.sync.get(&[SETTINGS_KEY.to_string()]).await?;
        let mut settings = load_settings(stored.get(SETTINGS_KEY));
        if !edit(&mut settings) {
            return Ok(false);
        }

        let value = serde_json::to_value(&settings).map_err(|e| StoreError::WriteRejected(e.to_string()))?;
        let mut entries = Map::new();
        entries.insert(SETTINGS_KEY.to_string(), value);
        self.inner.sync.set(entries).await?;
        Ok(true)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Decision Engine
//!
//! Combines the matcher, schedule evaluator and override snapshot into one
//! answer per navigation. The engine holds only borrowed, immutable inputs,
//! so the rule compiler and the per-tab check always agree.

use log::debug;

use crate::config::{BlockList, PolicySnapshot, Settings};
use crate::matcher::list_matches;
use crate::overrides::OverrideSnapshot;
use crate::schedule::{effective_policy, is_blocking_active};
use crate::types::{BlockDecision, BlockPages, Enforcement, Moment};
use crate::url::{extract_host, strip_www};

/// The list that decided a navigation, and how.
#[derive(Debug, Clone, Copy)]
pub struct ListVerdict<'a> {
    pub list: &'a BlockList,
    pub via: Enforcement,
}

/// Decides whether navigations are blocked.
pub struct DecisionEngine<'a> {
    settings: &'a Settings,
    lists: &'a [BlockList],
    overrides: &'a OverrideSnapshot,
    pages: &'a BlockPages,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(policy: &'a PolicySnapshot, overrides: &'a OverrideSnapshot, pages: &'a BlockPages) -> Self {
        Self {
            settings: &policy.settings,
            lists: &policy.lists,
            overrides,
            pages,
        }
    }

    /// Decide for a navigation to `url` whose host is `host` (as it appears
    /// in the URL, `www.` included).
    pub fn decide(&self, host: &str, url: &str, at: &Moment) -> BlockDecision {
        // 1: global kill switch
        if !self.settings.blocking_enabled {
            return BlockDecision::Allow;
        }

        // 2: a live override beats every list
        if self.overrides.is_active(host, at.epoch_ms) {
            debug!("{host} is temporarily unblocked");
            return BlockDecision::Allow;
        }

        // 3: first matching, schedule-active list wins
        let Some(verdict) = self.first_blocking_list(strip_www(host), url, at) else {
            return BlockDecision::Allow;
        };

        debug!(
            "Blocking {host} by list {:?} ({:?})",
            verdict.list.name, verdict.via
        );

        match verdict.list.custom_redirect_target() {
            Some(target) => BlockDecision::CustomRedirect {
                url: target.to_string(),
            },
            None => BlockDecision::Block {
                via: verdict.via,
                redirect_target: self.pages.redirect_for(verdict.via, url),
            },
        }
    }

    /// Decide for a full URL. URLs without a host are allowed.
    pub fn decide_url(&self, url: &str, at: &Moment) -> BlockDecision {
        match extract_host(url) {
            Some(host) => self.decide(host, url, at),
            None => BlockDecision::Allow,
        }
    }

    /// The list that would block `domain` at `at`, ignoring overrides and
    /// the global switch.
    pub fn first_blocking_list(&self, domain: &str, url: &str, at: &Moment) -> Option<ListVerdict<'a>> {
        self.lists.iter().find_map(|list| {
            if !list.enabled || !list_matches(list, domain, url) {
                return None;
            }
            if !is_blocking_active(&list.schedule, at) {
                return None;
            }
            effective_policy(list, at).map(|via| ListVerdict { list, via })
        })
    }
}

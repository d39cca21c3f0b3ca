//! Rule builder
//!
//! Walks lists in stored order and emits one host-anchored redirect rule per
//! plain domain entry, plus a `www.` companion carrying the original URL.
//! Entries the declarative layer cannot express are left to the per-tab
//! check: keyword entries, lists with a custom redirect, and anything with
//! a live override. Entries that are not bare hostnames match nothing on
//! the per-tab path, so they produce no rule either. Output stops at the per-ruleset cap; later lists lose.

use log::{debug, info, warn};

use sb_core::config::{BlockList, BlockPolicy, PolicySnapshot};
use sb_core::matcher::Entry;
use sb_core::overrides::OverrideSnapshot;
use sb_core::types::{BlockPages, Enforcement};
use sb_core::url::{is_plain_hostname, strip_www};

use crate::rule::{DeclarativeRule, ResourceType};

/// Hard cap on rules in the dynamic ruleset.
pub const MAX_RULES: usize = 100;
pub const RULE_PRIORITY: u32 = 1;
/// Placeholder the block page replaces with the blocked URL.
pub const ORIGINAL_URL_PLACEHOLDER: &str = "{url}";

/// What a compile did with the entries it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileStats {
    pub lists_compiled: usize,
    pub skipped_keyword: usize,
    pub skipped_overridden: usize,
    pub skipped_custom_redirect: usize,
    /// Domain entries that are not bare hostnames (`*.x.com`, `a.com/b`).
    pub skipped_invalid: usize,
    /// True if the cap cut off rules that would otherwise be emitted.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileOutput {
    pub rules: Vec<DeclarativeRule>,
    pub stats: CompileStats,
}

/// Compiles block lists into declarative redirect rules.
pub struct RuleCompiler<'a> {
    pages: &'a BlockPages,
    max_rules: usize,
}

impl<'a> RuleCompiler<'a> {
    pub fn new(pages: &'a BlockPages) -> Self {
        Self {
            pages,
            max_rules: MAX_RULES,
        }
    }

    pub fn with_max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = max_rules;
        self
    }

    /// Build the full rule set. Rule ids are assigned from 1 in emission
    /// order.
    pub fn compile(&self, policy: &PolicySnapshot, overrides: &OverrideSnapshot, now_ms: i64) -> CompileOutput {
        let mut out = CompileOutput::default();

        if !policy.settings.blocking_enabled {
            info!("Blocking disabled, compiling empty rule set");
            return out;
        }

        for list in policy.lists.iter().filter(|list| list.enabled) {
            if !self.compile_list(list, overrides, now_ms, &mut out) {
                out.stats.truncated = true;
                warn!(
                    "Declarative rule cap of {} reached at list {:?}; remaining entries are not compiled",
                    self.max_rules, list.name
                );
                break;
            }
            out.stats.lists_compiled += 1;
        }

        info!("Compiled {} declarative rules", out.rules.len());
        out
    }

    /// Returns false when the cap stopped emission.
    fn compile_list(&self, list: &BlockList, overrides: &OverrideSnapshot, now_ms: i64, out: &mut CompileOutput) -> bool {
        let page = self.pages.page_url(declarative_enforcement(list.block_policy));
        let has_custom_redirect = list.custom_redirect_target().is_some();

        for website in &list.websites {
            let Entry::Domain(website) = Entry::parse(website) else {
                out.stats.skipped_keyword += 1;
                continue;
            };

            let domain = strip_www(website);
            if !is_plain_hostname(domain) {
                debug!("Skipping rule for {website:?}: not a plain hostname");
                out.stats.skipped_invalid += 1;
                continue;
            }

            if overrides.is_active(website, now_ms) || overrides.is_active(domain, now_ms) {
                debug!("Skipping rule for {website}: temporarily unblocked");
                out.stats.skipped_overridden += 1;
                continue;
            }

            if has_custom_redirect {
                debug!("Skipping rule for {website}: custom redirect configured");
                out.stats.skipped_custom_redirect += 1;
                continue;
            }

            if !self.push(out, format!("||{domain}"), page.clone()) {
                return false;
            }

            if !domain.starts_with("www.") {
                let target = format!("{page}?url={ORIGINAL_URL_PLACEHOLDER}");
                if !self.push(out, format!("||www.{domain}"), target) {
                    return false;
                }
            }
        }

        true
    }

    fn push(&self, out: &mut CompileOutput, url_filter: String, redirect_target: String) -> bool {
        if out.rules.len() >= self.max_rules {
            return false;
        }
        out.rules.push(DeclarativeRule {
            id: out.rules.len() as u32 + 1,
            priority: RULE_PRIORITY,
            url_filter,
            resource_types: ResourceType::MAIN_FRAME,
            redirect_target,
        });
        true
    }
}

/// Block page for a list in the declarative layer: challenge lists get the
/// challenge page, everything else (scheduled included) the strict page.
fn declarative_enforcement(policy: BlockPolicy) -> Enforcement {
    match policy {
        BlockPolicy::Challenge => Enforcement::Challenge,
        BlockPolicy::Strict | BlockPolicy::Scheduled => Enforcement::Strict,
    }
}

/// Compile with the default cap.
pub fn compile_rules(
    policy: &PolicySnapshot,
    overrides: &OverrideSnapshot,
    pages: &BlockPages,
    now_ms: i64,
) -> CompileOutput {
    RuleCompiler::new(pages).compile(policy, overrides, now_ms)
}

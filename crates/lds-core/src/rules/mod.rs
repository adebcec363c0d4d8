//! Managed-region reconciliation of the AdGuard user-rule list
//!
//! The rule list belongs to the user. This crate owns exactly one slice of
//! it, delimited by [`START_MARKER`] and [`END_MARKER`], and regenerates that
//! slice on every pass. Everything outside the markers is left as found.

mod adguard;

pub use adguard::{AdGuardClient, FilterStatus, FilteringApi, SET_RULES_PATH, STATUS_PATH};

#[cfg(test)]
pub use adguard::MockFilteringApi;

use crate::domains::RewriteEntry;
use crate::error::{Error, Result};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// First line of the managed region
pub const START_MARKER: &str = "# lancache-dns-sync start";

/// Last line of the managed region
pub const END_MARKER: &str = "# lancache-dns-sync end";

/// Render one rewrite as an AdGuard rule
///
/// Exact hostnames match only themselves (`|host^`). A `*.` prefix becomes a
/// domain-and-subdomains match (`||host^`). The record type follows the
/// target's address family.
pub fn render_rule(entry: &RewriteEntry) -> String {
    let record = match entry.target {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    };
    match entry.domain.strip_prefix("*.") {
        Some(base) => format!("||{base}^$dnsrewrite=NOERROR;{record};{},important", entry.target),
        None => format!(
            "|{}^$dnsrewrite=NOERROR;{record};{},important",
            entry.domain, entry.target
        ),
    }
}

/// Outcome of splitting a rule list at the markers
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RuleScan {
    /// Lines outside any managed region, in original order
    pub foreign: Vec<String>,
    /// Lines dropped because they sat inside a managed region
    pub managed: usize,
    /// Start markers seen while already inside a region
    pub nested_starts: usize,
    /// Input ended inside a region
    pub unterminated: bool,
}

/// Split `rules` into foreign lines and managed-region bookkeeping
///
/// Single front-to-back pass. A start marker switches to "inside", an end
/// marker switches back; both are dropped. Other lines are kept only while
/// outside. An unmatched start therefore swallows the rest of the list.
pub fn scan_rules(rules: &[String]) -> RuleScan {
    let mut scan = RuleScan::default();
    let mut inside = false;

    for rule in rules {
        if rule == START_MARKER {
            if inside {
                scan.nested_starts += 1;
            }
            inside = true;
        } else if rule == END_MARKER {
            inside = false;
        } else if inside {
            scan.managed += 1;
        } else {
            scan.foreign.push(rule.clone());
        }
    }

    scan.unterminated = inside;
    scan
}

/// Rules not owned by this crate, in original order
pub fn extract_foreign(rules: &[String]) -> Vec<String> {
    scan_rules(rules).foreign
}

/// Foreign rules followed by a freshly generated managed region
pub fn build_rule_list(foreign: Vec<String>, rewrites: &[RewriteEntry]) -> Vec<String> {
    let mut rules = foreign;
    rules.reserve(rewrites.len() + 2);
    rules.push(START_MARKER.to_string());
    rules.extend(rewrites.iter().map(render_rule));
    rules.push(END_MARKER.to_string());
    rules
}

/// Counts from one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Foreign rules carried over untouched
    pub preserved: usize,
    /// Previously managed rules that were replaced
    pub replaced: usize,
    /// Managed rules written this time
    pub written: usize,
}

/// Rewrites the managed region through a [`FilteringApi`]
///
/// Read, rebuild, write. There is no version check between the read and
/// the write, so a concurrent external edit in that window is lost.
pub struct Reconciler {
    api: Arc<dyn FilteringApi>,
}

impl Reconciler {
    /// Create a reconciler on top of `api`
    pub fn new(api: Arc<dyn FilteringApi>) -> Self {
        Self { api }
    }

    /// Replace the managed region with one rule per entry of `rewrites`
    ///
    /// The full list is written in a single call; on any error nothing has
    /// been written.
    #[instrument(skip_all, fields(rewrites = rewrites.len()))]
    pub async fn reconcile(&self, rewrites: &[RewriteEntry]) -> Result<ReconcileSummary> {
        let status = self
            .api
            .filtering_status()
            .await
            .map_err(|e| Error::step("read filtering status", e))?;
        debug!(existing = status.user_rules.len(), "Read current user rules");

        let scan = scan_rules(&status.user_rules);
        if scan.nested_starts > 0 {
            warn!(
                nested = scan.nested_starts,
                "Rule list has nested start markers; treating them as one region"
            );
        }
        if scan.unterminated {
            warn!(
                dropped = scan.managed,
                "Rule list ends inside the managed region; lines after the start marker are replaced"
            );
        }

        let summary = ReconcileSummary {
            preserved: scan.foreign.len(),
            replaced: scan.managed,
            written: rewrites.len(),
        };
        let rules = build_rule_list(scan.foreign, rewrites);

        self.api
            .set_rules(rules)
            .await
            .map_err(|e| Error::step("write filtering rules", e))?;

        info!(
            preserved = summary.preserved,
            replaced = summary.replaced,
            written = summary.written,
            "Updated filtering rules"
        );
        Ok(summary)
    }
}

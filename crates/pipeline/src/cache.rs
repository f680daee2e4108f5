//! Per-organization rule snapshots
//!
//! Readers clone an `Arc<OrgRules>` and keep using it for the whole call;
//! a rebuild swaps in a new snapshot without touching the old one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use live_config::OrgId;

use crate::builder::OrgRules;

/// Built rule sets by organization
#[derive(Default)]
pub struct RuleCache {
    orgs: DashMap<OrgId, Arc<OrgRules>>,
    /// Bumped by every invalidation
    generation: AtomicU64,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, org_id: OrgId) -> Option<Arc<OrgRules>> {
        self.orgs.get(&org_id).map(|r| Arc::clone(r.value()))
    }

    /// Current generation, read before starting a build
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store a snapshot built at `generation`
    ///
    /// Returns false (and stores nothing) if an invalidation happened since,
    /// so a build racing a config change cannot resurrect stale rules.
    pub fn insert_if_current(&self, org_id: OrgId, generation: u64, rules: Arc<OrgRules>) -> bool {
        let entry = self.orgs.entry(org_id);
        if self.generation() != generation {
            return false;
        }
        entry.insert(rules);
        true
    }

    /// Swap in a snapshot unconditionally
    pub fn replace(&self, org_id: OrgId, rules: Arc<OrgRules>) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.orgs.insert(org_id, rules);
    }

    /// Drop an organization's snapshot; the next lookup rebuilds it
    pub fn invalidate(&self, org_id: OrgId) -> bool {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.orgs.remove(&org_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.orgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty()
    }
}

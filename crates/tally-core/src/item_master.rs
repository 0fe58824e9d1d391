//! Read-only collaborators: item master and verification records
//!
//! The item master supplies expected item counts per rack; the
//! verification records store supplies how many items a session has
//! counted so far. Both are synchronized from the ERP outside this
//! subsystem, so they appear here only as seam traits with static
//! implementations for standalone use and tests.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use tally_common::TallyResult;

/// Expected stock per rack, keyed by rack id
#[async_trait]
pub trait ItemMaster: Send + Sync {
    /// Number of distinct items expected on the rack
    async fn item_count(&self, rack_id: &str) -> TallyResult<i64>;
}

/// Per-session counting progress
#[async_trait]
pub trait VerificationRecords: Send + Sync {
    /// Items verified so far in the session
    async fn counted_items(&self, session_id: &str) -> TallyResult<i64>;
}

/// Fixed item counts, loadable at startup
#[derive(Clone, Default)]
pub struct StaticItemMaster {
    counts: Arc<DashMap<String, i64>>,
}

impl StaticItemMaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_count(&self, rack_id: &str, count: i64) {
        self.counts.insert(rack_id.to_string(), count);
    }
}

#[async_trait]
impl ItemMaster for StaticItemMaster {
    async fn item_count(&self, rack_id: &str) -> TallyResult<i64> {
        Ok(self.counts.get(rack_id).map(|entry| *entry).unwrap_or(0))
    }
}

/// Fixed per-session counts, settable by tests and demo tooling
#[derive(Clone, Default)]
pub struct StaticVerificationRecords {
    counts: Arc<DashMap<String, i64>>,
}

impl StaticVerificationRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_counted(&self, session_id: &str, count: i64) {
        self.counts.insert(session_id.to_string(), count);
    }
}

#[async_trait]
impl VerificationRecords for StaticVerificationRecords {
    async fn counted_items(&self, session_id: &str) -> TallyResult<i64> {
        Ok(self.counts.get(session_id).map(|entry| *entry).unwrap_or(0))
    }
}

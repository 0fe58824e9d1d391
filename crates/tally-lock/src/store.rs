//! Lock store adapter
//!
//! `LockStore` is the seam between the lease semantics and the shared
//! key/value backend. Three operations carry the correctness weight:
//! create-if-absent (atomic acquisition), compare-and-delete (release
//! only what you hold), and extend (renew only what you hold).
//!
//! `MemoryLockStore` is the embedded implementation used in
//! standalone deployments and tests. Expired entries are treated as
//! absent at every read and CAS point and removed lazily, so a
//! crashed holder's lease is taken over at the next acquisition
//! without any sweeper.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use tally_common::TallyResult;

/// Key/value store with TTL lease operations
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomically create `key` with `value` unless a live entry exists.
    ///
    /// Returns false (no side effect) when the key is held with a
    /// different value. Re-asserting the same value refreshes the TTL
    /// and returns true.
    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> TallyResult<bool>;

    /// Delete `key` only if it currently holds `value`.
    async fn compare_and_delete(&self, key: &str, value: &str) -> TallyResult<bool>;

    /// Extend the TTL of `key` only if it currently holds `value`.
    ///
    /// False means the entry is gone or owned by someone else; the
    /// caller must stop treating the lease as held.
    async fn extend(&self, key: &str, value: &str, ttl: Duration) -> TallyResult<bool>;

    /// Current live value of `key`, if any.
    async fn get(&self, key: &str) -> TallyResult<Option<String>>;

    /// Remaining TTL of `key`, if live.
    async fn ttl_remaining(&self, key: &str) -> TallyResult<Option<Duration>>;

    /// Unconditional delete.
    async fn delete(&self, key: &str) -> TallyResult<()>;
}

#[derive(Debug, Clone)]
struct LockEntry {
    value: String,
    expires_at: Instant,
}

impl LockEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        LockEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory lock store backed by a concurrent map
#[derive(Clone, Default)]
pub struct MemoryLockStore {
    entries: std::sync::Arc<DashMap<String, LockEntry>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the entry if its lease has lapsed.
    fn purge_if_expired(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| entry.is_expired());
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> TallyResult<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if current.is_expired() || current.value == value {
                    occupied.insert(LockEntry::new(value, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(LockEntry::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn compare_and_delete(&self, key: &str, value: &str) -> TallyResult<bool> {
        self.purge_if_expired(key);
        let removed = self
            .entries
            .remove_if(key, |_, entry| entry.value == value)
            .is_some();
        Ok(removed)
    }

    async fn extend(&self, key: &str, value: &str, ttl: Duration) -> TallyResult<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if current.is_expired() {
                    occupied.remove();
                    Ok(false)
                } else if current.value == value {
                    occupied.insert(LockEntry::new(value, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> TallyResult<Option<String>> {
        self.purge_if_expired(key);
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn ttl_remaining(&self, key: &str) -> TallyResult<Option<Duration>> {
        self.purge_if_expired(key);
        Ok(self.entries.get(key).map(|entry| {
            entry
                .expires_at
                .saturating_duration_since(Instant::now())
        }))
    }

    async fn delete(&self, key: &str) -> TallyResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

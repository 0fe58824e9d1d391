//! Lock manager
//!
//! Owns the key schemes and lease semantics built on the lock store:
//! short rack leases for mutual exclusion, long session leases for
//! bookkeeping, and user heartbeat markers for presence queries.
//!
//! A disconnected client's hold self-expires within one TTL window;
//! nothing here ever needs operator cleanup.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tally_common::TallyResult;

use crate::store::LockStore;

/// Default rack lease TTL. Clients heartbeat at 20-30s against this.
pub const RACK_LOCK_TTL: Duration = Duration::from_secs(60);

/// Default session bookkeeping lease TTL.
pub const SESSION_LOCK_TTL: Duration = Duration::from_secs(3600);

/// Default user presence marker TTL.
pub const USER_HEARTBEAT_TTL: Duration = Duration::from_secs(90);

/// Build rack lock key format: rack:{rack_id}
fn rack_lock_key(rack_id: &str) -> String {
    format!("rack:{}", rack_id)
}

/// Build session lock key format: session:{session_id}
fn session_lock_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// Build heartbeat key format: heartbeat:{user_id}
fn heartbeat_key(user_id: &str) -> String {
    format!("heartbeat:{}", user_id)
}

/// Value stored under a session lock key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLockInfo {
    pub owner: String,
    pub rack_id: String,
}

/// Lease semantics over a [`LockStore`]
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        LockManager { store }
    }

    /// Try to take the rack lease for `owner`.
    ///
    /// Atomic create-if-absent: exactly one concurrent caller wins.
    /// Returns false with no side effect when another owner holds a
    /// live lease. Acquiring a lease already held by `owner` refreshes
    /// its TTL.
    pub async fn acquire_rack_lock(
        &self,
        rack_id: &str,
        owner: &str,
        ttl: Duration,
    ) -> TallyResult<bool> {
        let acquired = self
            .store
            .put_if_absent(&rack_lock_key(rack_id), owner, ttl)
            .await?;
        if acquired {
            tracing::debug!(rack_id = %rack_id, owner = %owner, "rack lock acquired");
        }
        Ok(acquired)
    }

    /// Release the rack lease if `owner` still holds it.
    ///
    /// Compare-and-delete keeps a stale or duplicate release from
    /// dropping someone else's lease.
    pub async fn release_rack_lock(&self, rack_id: &str, owner: &str) -> TallyResult<bool> {
        let released = self
            .store
            .compare_and_delete(&rack_lock_key(rack_id), owner)
            .await?;
        if released {
            tracing::debug!(rack_id = %rack_id, owner = %owner, "rack lock released");
        }
        Ok(released)
    }

    /// Extend the rack lease if `owner` still holds it.
    ///
    /// False signals the lease is lost; the caller must stop treating
    /// the rack as owned.
    pub async fn renew_rack_lock(
        &self,
        rack_id: &str,
        owner: &str,
        ttl: Duration,
    ) -> TallyResult<bool> {
        self.store.extend(&rack_lock_key(rack_id), owner, ttl).await
    }

    /// Current holder of the rack lease, if any.
    pub async fn get_rack_lock_owner(&self, rack_id: &str) -> TallyResult<Option<String>> {
        self.store.get(&rack_lock_key(rack_id)).await
    }

    /// Remaining TTL of the rack lease, if live.
    pub async fn get_rack_lock_ttl(&self, rack_id: &str) -> TallyResult<Option<Duration>> {
        self.store.ttl_remaining(&rack_lock_key(rack_id)).await
    }

    /// Create the long-lived session bookkeeping lease.
    ///
    /// Independent of the rack lease's short TTL window; survives
    /// transient rack lease loss so the session remains traceable.
    pub async fn create_session_lock(
        &self,
        session_id: &str,
        owner: &str,
        rack_id: &str,
        ttl: Duration,
    ) -> TallyResult<bool> {
        let info = SessionLockInfo {
            owner: owner.to_string(),
            rack_id: rack_id.to_string(),
        };
        let value = serde_json::to_string(&info)
            .map_err(|e| tally_common::TallyError::Store(e.to_string()))?;
        self.store
            .put_if_absent(&session_lock_key(session_id), &value, ttl)
            .await
    }

    /// Drop the session bookkeeping lease.
    pub async fn delete_session_lock(&self, session_id: &str) -> TallyResult<()> {
        self.store.delete(&session_lock_key(session_id)).await
    }

    /// Refresh the user's presence marker.
    ///
    /// Unrelated to any specific rack; answers "is this user online".
    pub async fn update_user_heartbeat(&self, user_id: &str, ttl: Duration) -> TallyResult<()> {
        self.store
            .put_if_absent(&heartbeat_key(user_id), user_id, ttl)
            .await?;
        Ok(())
    }

    /// Whether the user's presence marker is still live.
    pub async fn is_user_online(&self, user_id: &str) -> TallyResult<bool> {
        Ok(self.store.get(&heartbeat_key(user_id)).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLockStore;

    const SHORT: Duration = Duration::from_millis(40);

    fn manager() -> LockManager {
        LockManager::new(Arc::new(MemoryLockStore::new()))
    }

    #[test]
    fn test_key_schemes() {
        assert_eq!(rack_lock_key("R-12"), "rack:R-12");
        assert_eq!(session_lock_key("abc"), "session:abc");
        assert_eq!(heartbeat_key("alice"), "heartbeat:alice");
    }

    #[tokio::test]
    async fn test_mutual_exclusion() {
        let locks = manager();

        assert!(locks.acquire_rack_lock("R-1", "alice", RACK_LOCK_TTL).await.unwrap());
        assert!(!locks.acquire_rack_lock("R-1", "bob", RACK_LOCK_TTL).await.unwrap());
        assert_eq!(
            locks.get_rack_lock_owner("R-1").await.unwrap(),
            Some("alice".to_string())
        );

        // Different rack is unaffected
        assert!(locks.acquire_rack_lock("R-2", "bob", RACK_LOCK_TTL).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_then_reacquire() {
        let locks = manager();

        assert!(locks.acquire_rack_lock("R-1", "alice", RACK_LOCK_TTL).await.unwrap());
        assert!(locks.release_rack_lock("R-1", "alice").await.unwrap());
        assert!(locks.acquire_rack_lock("R-1", "bob", RACK_LOCK_TTL).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_by_non_owner_is_refused() {
        let locks = manager();

        locks.acquire_rack_lock("R-1", "alice", RACK_LOCK_TTL).await.unwrap();
        assert!(!locks.release_rack_lock("R-1", "bob").await.unwrap());
        assert_eq!(
            locks.get_rack_lock_owner("R-1").await.unwrap(),
            Some("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_renew_keeps_lease_alive() {
        let locks = manager();

        locks.acquire_rack_lock("R-1", "alice", SHORT).await.unwrap();
        assert!(locks.renew_rack_lock("R-1", "alice", RACK_LOCK_TTL).await.unwrap());

        let ttl = locks.get_rack_lock_ttl("R-1").await.unwrap().unwrap();
        assert!(ttl > Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_renew_after_expiry_reports_lost() {
        let locks = manager();

        locks.acquire_rack_lock("R-1", "alice", SHORT).await.unwrap();
        tokio::time::sleep(SHORT * 2).await;

        assert!(!locks.renew_rack_lock("R-1", "alice", RACK_LOCK_TTL).await.unwrap());
        assert_eq!(locks.get_rack_lock_owner("R-1").await.unwrap(), None);

        // Expired lease is claimable by someone else
        assert!(locks.acquire_rack_lock("R-1", "bob", RACK_LOCK_TTL).await.unwrap());
    }

    #[tokio::test]
    async fn test_session_lock_roundtrip() {
        let locks = manager();

        assert!(
            locks
                .create_session_lock("s-1", "alice", "R-1", SESSION_LOCK_TTL)
                .await
                .unwrap()
        );
        locks.delete_session_lock("s-1").await.unwrap();

        // Deleting again is a no-op
        locks.delete_session_lock("s-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_user_heartbeat_presence() {
        let locks = manager();

        assert!(!locks.is_user_online("alice").await.unwrap());
        locks.update_user_heartbeat("alice", SHORT).await.unwrap();
        assert!(locks.is_user_online("alice").await.unwrap());

        tokio::time::sleep(SHORT * 2).await;
        assert!(!locks.is_user_online("alice").await.unwrap());
    }
}

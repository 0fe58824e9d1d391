//! Rack service: the claim/release/pause/resume state machine
//!
//! Every transition performs its lease operation first and its
//! registry write second. The two stores are kept consistent by that
//! call ordering alone; the narrow inconsistency window this leaves is
//! self-healing through the TTL backstop and the stale-active
//! reconciliation rule enforced at claim and list time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use tally_common::{DEFAULT_FLOORS, TallyError, TallyResult, is_valid_id};
use tally_lock::{LockManager, RACK_LOCK_TTL, SESSION_LOCK_TTL};

use crate::item_master::ItemMaster;
use crate::model::{Rack, RackStatus, SessionStatus, VerificationSession};
use crate::notify::{RackEvent, RackEventBus, RackEventKind};
use crate::registry::{RackRegistry, SessionStore};

/// Tunables for the rack service
#[derive(Clone, Debug)]
pub struct RackServiceConfig {
    pub rack_lock_ttl: Duration,
    pub session_lock_ttl: Duration,
    /// Floors reported while the registry is still empty
    pub default_floors: Vec<String>,
}

impl Default for RackServiceConfig {
    fn default() -> Self {
        RackServiceConfig {
            rack_lock_ttl: RACK_LOCK_TTL,
            session_lock_ttl: SESSION_LOCK_TTL,
            default_floors: DEFAULT_FLOORS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Result of a successful claim
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub rack: Rack,
    pub session: VerificationSession,
}

/// Rack document joined with its live lease state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RackStatusView {
    pub rack: Rack,
    pub lock_owner: Option<String>,
    pub lock_ttl_seconds: Option<i64>,
}

/// Claimable rack enriched with the expected item count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimableRack {
    pub rack: Rack,
    pub item_count: i64,
}

/// Orchestrates rack ownership over the lock manager, rack registry,
/// and notification bus
#[derive(Clone)]
pub struct RackService {
    locks: LockManager,
    racks: Arc<dyn RackRegistry>,
    sessions: Arc<dyn SessionStore>,
    items: Arc<dyn ItemMaster>,
    bus: RackEventBus,
    config: RackServiceConfig,
}

impl RackService {
    pub fn new(
        locks: LockManager,
        racks: Arc<dyn RackRegistry>,
        sessions: Arc<dyn SessionStore>,
        items: Arc<dyn ItemMaster>,
        bus: RackEventBus,
        config: RackServiceConfig,
    ) -> Self {
        RackService {
            locks,
            racks,
            sessions,
            items,
            bus,
            config,
        }
    }

    /// Claim a rack for `user`, creating the rack row lazily.
    ///
    /// Preconditions: status is claimable, or the row is stale (an
    /// owned status whose lease has silently expired; such a rack is
    /// effectively available and gets overwritten here). The lock
    /// acquisition decides the race; on any failure after it, the
    /// lease is released before the error propagates so no claim
    /// attempt leaves an orphaned lease.
    pub async fn claim(&self, rack_id: &str, floor: &str, user: &str) -> TallyResult<ClaimOutcome> {
        if !is_valid_id(rack_id) {
            return Err(TallyError::BadRequest(format!(
                "illegal rack id '{}'",
                rack_id
            )));
        }
        if !is_valid_id(user) {
            return Err(TallyError::BadRequest(format!("illegal user id '{}'", user)));
        }
        if floor.trim().is_empty() {
            return Err(TallyError::BadRequest("floor is required".to_string()));
        }

        let rack = self
            .racks
            .get(rack_id)
            .await?
            .unwrap_or_else(|| Rack::new(rack_id, floor));

        if !rack.status.is_claimable() {
            let live_owner = self.locks.get_rack_lock_owner(rack_id).await?;
            let stale = rack.status.is_owned() && live_owner.is_none();
            if !stale {
                return Err(TallyError::held_by(
                    rack_id,
                    live_owner.or_else(|| rack.claimed_by.clone()),
                ));
            }
            warn!(
                rack_id = %rack_id,
                stale_owner = ?rack.claimed_by,
                "registry row is stale, lease already expired; treating rack as available"
            );
        }

        if !self
            .locks
            .acquire_rack_lock(rack_id, user, self.config.rack_lock_ttl)
            .await?
        {
            let owner = self.locks.get_rack_lock_owner(rack_id).await?;
            return Err(TallyError::held_by(
                rack_id,
                owner.or_else(|| rack.claimed_by.clone()),
            ));
        }

        match self.commit_claim(rack, user).await {
            Ok(outcome) => {
                self.bus.publish(RackEvent::new(
                    RackEventKind::Claimed,
                    rack_id,
                    &outcome.rack.floor,
                    user,
                    Some(outcome.session.session_id.clone()),
                ));
                Ok(outcome)
            }
            Err(e) => {
                if let Err(release_err) = self.locks.release_rack_lock(rack_id, user).await {
                    warn!(
                        rack_id = %rack_id,
                        user = %user,
                        error = %release_err,
                        "failed to roll back rack lock after claim failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Registry writes that follow a won lock acquisition
    async fn commit_claim(&self, mut rack: Rack, user: &str) -> TallyResult<ClaimOutcome> {
        // Overwriting a stale row (or re-claiming a paused rack)
        // displaces the previous session; close it out so it leaves
        // the active set and its bookkeeping lease.
        if let Some(old_session_id) = rack.session_id.take() {
            self.close_displaced_session(&old_session_id).await;
        }

        let session = VerificationSession::new(user, &rack.rack_id, &rack.floor);

        self.locks
            .create_session_lock(
                &session.session_id,
                user,
                &rack.rack_id,
                self.config.session_lock_ttl,
            )
            .await?;
        self.sessions.upsert(session.clone()).await?;

        let now = Utc::now();
        rack.status = RackStatus::Active;
        rack.claimed_by = Some(user.to_string());
        rack.session_id = Some(session.session_id.clone());
        rack.lock_expires_at = now
            .checked_add_signed(
                chrono::Duration::from_std(self.config.rack_lock_ttl)
                    .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            );
        rack.updated_at = now;
        self.racks.upsert(rack.clone()).await?;

        Ok(ClaimOutcome { rack, session })
    }

    /// Release a rack back to the available pool.
    ///
    /// The lease release is best-effort: a lock store hiccup is logged
    /// and the registry update proceeds anyway, so the rack is never
    /// left stuck. The TTL backstop clears any lease left behind.
    pub async fn release(&self, rack_id: &str, user: &str) -> TallyResult<Rack> {
        let mut rack = self.owned_rack(rack_id, user).await?;

        if let Err(e) = self.locks.release_rack_lock(rack_id, user).await {
            warn!(
                rack_id = %rack_id,
                user = %user,
                error = %e,
                "lease release failed; relying on TTL expiry"
            );
        }

        let session_id = rack.session_id.clone();
        if let Some(ref sid) = session_id {
            self.finish_session(sid).await?;
            self.delete_session_lock_best_effort(sid).await;
        }

        rack.status = RackStatus::Available;
        rack.clear_ownership();
        rack.updated_at = Utc::now();
        self.racks.upsert(rack.clone()).await?;

        self.bus.publish(RackEvent::new(
            RackEventKind::Released,
            rack_id,
            &rack.floor,
            user,
            session_id,
        ));
        Ok(rack)
    }

    /// Pause counting without giving up the rack.
    ///
    /// The lease is retained: pausing withholds mutual exclusion from
    /// others, it is not a release.
    pub async fn pause(&self, rack_id: &str, user: &str) -> TallyResult<Rack> {
        let mut rack = self.owned_rack(rack_id, user).await?;
        if rack.status != RackStatus::Active {
            return Err(TallyError::BadRequest(format!(
                "cannot pause rack in status '{}'",
                rack.status
            )));
        }

        rack.status = RackStatus::Paused;
        rack.updated_at = Utc::now();
        self.racks.upsert(rack.clone()).await?;

        if let Some(ref sid) = rack.session_id {
            self.set_session_status(sid, SessionStatus::Paused, false)
                .await?;
        }

        self.bus.publish(RackEvent::new(
            RackEventKind::Paused,
            rack_id,
            &rack.floor,
            user,
            rack.session_id.clone(),
        ));
        Ok(rack)
    }

    /// Resume a paused rack. Ownership fields are untouched.
    pub async fn resume(&self, rack_id: &str, user: &str) -> TallyResult<Rack> {
        let mut rack = self.owned_rack(rack_id, user).await?;
        if rack.status != RackStatus::Paused {
            return Err(TallyError::BadRequest(format!(
                "cannot resume rack in status '{}'",
                rack.status
            )));
        }

        rack.status = RackStatus::Active;
        rack.updated_at = Utc::now();
        self.racks.upsert(rack.clone()).await?;

        if let Some(ref sid) = rack.session_id {
            self.set_session_status(sid, SessionStatus::Active, true)
                .await?;
        }

        self.bus.publish(RackEvent::new(
            RackEventKind::Resumed,
            rack_id,
            &rack.floor,
            user,
            rack.session_id.clone(),
        ));
        Ok(rack)
    }

    /// Rack row joined with the live lease, for dashboards
    pub async fn rack_status(&self, rack_id: &str) -> TallyResult<RackStatusView> {
        let rack = self
            .racks
            .get(rack_id)
            .await?
            .ok_or_else(|| TallyError::rack_not_found(rack_id))?;
        let lock_owner = self.locks.get_rack_lock_owner(rack_id).await?;
        let lock_ttl_seconds = self
            .locks
            .get_rack_lock_ttl(rack_id)
            .await?
            .map(|ttl| ttl.as_secs() as i64);
        Ok(RackStatusView {
            rack,
            lock_owner,
            lock_ttl_seconds,
        })
    }

    /// Racks a new claim could target, enriched with item counts.
    ///
    /// Available and paused racks are claimable; so is a rack whose
    /// row still says active but whose lease has expired (the
    /// stale-active reconciliation rule). Completed racks never are.
    pub async fn list_claimable(&self, floor: Option<&str>) -> TallyResult<Vec<ClaimableRack>> {
        let mut out = Vec::new();
        for rack in self.racks.list().await? {
            if let Some(f) = floor
                && rack.floor != f
            {
                continue;
            }
            let claimable = match rack.status {
                RackStatus::Available | RackStatus::Paused => true,
                RackStatus::Active => {
                    self.locks.get_rack_lock_owner(&rack.rack_id).await?.is_none()
                }
                RackStatus::Completed => false,
            };
            if claimable {
                let item_count = self.items.item_count(&rack.rack_id).await?;
                out.push(ClaimableRack { rack, item_count });
            }
        }
        out.sort_by(|a, b| a.rack.rack_id.cmp(&b.rack.rack_id));
        Ok(out)
    }

    /// Distinct floors, falling back to the configured defaults while
    /// the registry is empty
    pub async fn list_floors(&self) -> TallyResult<Vec<String>> {
        let floors = self.racks.floors().await?;
        if floors.is_empty() {
            Ok(self.config.default_floors.clone())
        } else {
            Ok(floors)
        }
    }

    /// The rack currently claimed by `user`, if any
    pub async fn active_rack_for_user(&self, user: &str) -> TallyResult<Option<Rack>> {
        Ok(self
            .racks
            .list()
            .await?
            .into_iter()
            .find(|rack| rack.status.is_owned() && rack.claimed_by.as_deref() == Some(user)))
    }

    /// Load the rack and check the caller owns it. Ownership is
    /// re-checked immediately before every mutating write.
    async fn owned_rack(&self, rack_id: &str, user: &str) -> TallyResult<Rack> {
        let rack = self
            .racks
            .get(rack_id)
            .await?
            .ok_or_else(|| TallyError::rack_not_found(rack_id))?;
        if rack.claimed_by.as_deref() != Some(user) {
            return Err(TallyError::Forbidden(format!(
                "user '{}' is not the current owner of rack '{}'",
                user, rack_id
            )));
        }
        Ok(rack)
    }

    async fn finish_session(&self, session_id: &str) -> TallyResult<()> {
        if let Some(mut session) = self.sessions.get(session_id).await? {
            session.status = SessionStatus::Completed;
            session.completed_at = Some(Utc::now());
            self.sessions.upsert(session).await?;
        }
        Ok(())
    }

    async fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        touch_heartbeat: bool,
    ) -> TallyResult<()> {
        if let Some(mut session) = self.sessions.get(session_id).await? {
            session.status = status;
            if touch_heartbeat {
                session.last_heartbeat = Utc::now();
            }
            self.sessions.upsert(session).await?;
        }
        Ok(())
    }

    /// Best-effort close of a session superseded by a newer claim
    async fn close_displaced_session(&self, session_id: &str) {
        match self.sessions.get(session_id).await {
            Ok(Some(mut session)) if session.status != SessionStatus::Completed => {
                session.status = SessionStatus::Completed;
                session.completed_at = Some(Utc::now());
                if let Err(e) = self.sessions.upsert(session).await {
                    warn!(
                        session_id = %session_id,
                        error = %e,
                        "failed to close displaced session"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "failed to load displaced session");
            }
        }
        self.delete_session_lock_best_effort(session_id).await;
    }

    async fn delete_session_lock_best_effort(&self, session_id: &str) {
        if let Err(e) = self.locks.delete_session_lock(session_id).await {
            warn!(session_id = %session_id, error = %e, "failed to delete session lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item_master::StaticItemMaster;
    use crate::registry::{MemoryRackRegistry, MemorySessionStore};
    use async_trait::async_trait;
    use tally_lock::MemoryLockStore;

    const SHORT: Duration = Duration::from_millis(40);

    struct Fixture {
        service: RackService,
        racks: Arc<MemoryRackRegistry>,
        sessions: Arc<MemorySessionStore>,
        items: StaticItemMaster,
        locks: LockManager,
        bus: RackEventBus,
    }

    fn fixture() -> Fixture {
        fixture_with_ttl(RACK_LOCK_TTL)
    }

    fn fixture_with_ttl(rack_lock_ttl: Duration) -> Fixture {
        let locks = LockManager::new(Arc::new(MemoryLockStore::new()));
        let racks = Arc::new(MemoryRackRegistry::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let items = StaticItemMaster::new();
        let bus = RackEventBus::new();
        let service = RackService::new(
            locks.clone(),
            racks.clone(),
            sessions.clone(),
            Arc::new(items.clone()),
            bus.clone(),
            RackServiceConfig {
                rack_lock_ttl,
                ..RackServiceConfig::default()
            },
        );
        Fixture {
            service,
            racks,
            sessions,
            items,
            locks,
            bus,
        }
    }

    #[tokio::test]
    async fn test_claim_creates_rack_lazily() {
        let fx = fixture();

        let outcome = fx.service.claim("R-12", "Ground", "alice").await.unwrap();
        assert_eq!(outcome.rack.status, RackStatus::Active);
        assert_eq!(outcome.rack.claimed_by.as_deref(), Some("alice"));
        assert_eq!(
            outcome.rack.session_id.as_deref(),
            Some(outcome.session.session_id.as_str())
        );
        assert!(outcome.rack.lock_expires_at.is_some());

        let stored = fx.racks.get("R-12").await.unwrap().unwrap();
        assert_eq!(stored.status, RackStatus::Active);

        let session = fx
            .sessions
            .get(&outcome.session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.rack_id, "R-12");
        assert_eq!(session.floor, "Ground");
    }

    #[tokio::test]
    async fn test_second_claim_conflicts_and_reports_owner() {
        let fx = fixture();

        fx.service.claim("R-12", "Ground", "alice").await.unwrap();
        let err = fx.service.claim("R-12", "Ground", "bob").await.unwrap_err();
        match err {
            TallyError::Conflict { rack_id, owner } => {
                assert_eq!(rack_id, "R-12");
                assert_eq!(owner.as_deref(), Some("alice"));
            }
            other => panic!("expected Conflict, got {:?}", other),
        }

        // Registry unchanged by the losing claim
        let rack = fx.racks.get("R-12").await.unwrap().unwrap();
        assert_eq!(rack.claimed_by.as_deref(), Some("alice"));
        assert_eq!(fx.sessions.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_after_release_succeeds() {
        let fx = fixture();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        fx.service.release("R-1", "alice").await.unwrap();

        let outcome = fx.service.claim("R-1", "Ground", "bob").await.unwrap();
        assert_eq!(outcome.rack.claimed_by.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_claim_after_lease_expiry_overwrites_stale_row() {
        let fx = fixture_with_ttl(SHORT);

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        tokio::time::sleep(SHORT * 2).await;

        // Lease is gone but the registry still says active/alice
        assert_eq!(fx.locks.get_rack_lock_owner("R-1").await.unwrap(), None);
        let stale = fx.racks.get("R-1").await.unwrap().unwrap();
        assert_eq!(stale.status, RackStatus::Active);
        assert_eq!(stale.claimed_by.as_deref(), Some("alice"));

        let outcome = fx.service.claim("R-1", "Ground", "bob").await.unwrap();
        assert_eq!(outcome.rack.claimed_by.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_claim_over_stale_row_closes_displaced_session() {
        let fx = fixture_with_ttl(SHORT);

        let first = fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        tokio::time::sleep(SHORT * 2).await;
        let second = fx.service.claim("R-1", "Ground", "bob").await.unwrap();
        assert_ne!(second.session.session_id, first.session.session_id);

        let displaced = fx
            .sessions
            .get(&first.session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(displaced.status, SessionStatus::Completed);
        assert!(displaced.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_reclaiming_own_paused_rack_displaces_old_session() {
        let fx = fixture();

        let first = fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        fx.service.pause("R-1", "alice").await.unwrap();

        // The owner's own lease is re-entrant, so this claim wins
        let second = fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        assert_ne!(second.session.session_id, first.session.session_id);
        assert_eq!(second.rack.status, RackStatus::Active);

        let displaced = fx
            .sessions
            .get(&first.session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(displaced.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_completed_rack_is_not_claimable() {
        let fx = fixture();

        let mut rack = Rack::new("R-9", "Ground");
        rack.status = RackStatus::Completed;
        fx.racks.upsert(rack).await.unwrap();

        let err = fx.service.claim("R-9", "Ground", "carol").await.unwrap_err();
        match err {
            TallyError::Conflict { owner, .. } => assert_eq!(owner, None),
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_claim_rejects_bad_identifiers() {
        let fx = fixture();

        assert!(matches!(
            fx.service.claim("bad rack", "Ground", "alice").await,
            Err(TallyError::BadRequest(_))
        ));
        assert!(matches!(
            fx.service.claim("R-1", "", "alice").await,
            Err(TallyError::BadRequest(_))
        ));
        assert!(matches!(
            fx.service.claim("R-1", "Ground", "").await,
            Err(TallyError::BadRequest(_))
        ));
    }

    /// Session store that fails every write
    struct FailingSessionStore;

    #[async_trait]
    impl SessionStore for FailingSessionStore {
        async fn get(&self, _: &str) -> TallyResult<Option<VerificationSession>> {
            Ok(None)
        }
        async fn upsert(&self, _: VerificationSession) -> TallyResult<()> {
            Err(TallyError::Store("session store down".to_string()))
        }
        async fn list(&self) -> TallyResult<Vec<VerificationSession>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_failed_claim_releases_the_lock() {
        let locks = LockManager::new(Arc::new(MemoryLockStore::new()));
        let service = RackService::new(
            locks.clone(),
            Arc::new(MemoryRackRegistry::new()),
            Arc::new(FailingSessionStore),
            Arc::new(StaticItemMaster::new()),
            RackEventBus::new(),
            RackServiceConfig::default(),
        );

        let err = service.claim("R-1", "Ground", "alice").await.unwrap_err();
        assert!(matches!(err, TallyError::Store(_)));

        // No orphaned lease: the rack is immediately claimable again
        assert_eq!(locks.get_rack_lock_owner("R-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_release_clears_rack_and_completes_session() {
        let fx = fixture();

        let outcome = fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        let rack = fx.service.release("R-1", "alice").await.unwrap();

        assert_eq!(rack.status, RackStatus::Available);
        assert!(rack.claimed_by.is_none());
        assert!(rack.session_id.is_none());
        assert!(rack.lock_expires_at.is_none());
        assert_eq!(fx.locks.get_rack_lock_owner("R-1").await.unwrap(), None);

        let session = fx
            .sessions
            .get(&outcome.session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_release_by_non_owner_is_forbidden() {
        let fx = fixture();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        assert!(matches!(
            fx.service.release("R-1", "bob").await,
            Err(TallyError::Forbidden(_))
        ));

        // Registry untouched
        let rack = fx.racks.get("R-1").await.unwrap().unwrap();
        assert_eq!(rack.claimed_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_double_release_fails_cleanly() {
        let fx = fixture();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        fx.service.release("R-1", "alice").await.unwrap();

        // The owner is cleared now, so a duplicate release is refused
        assert!(matches!(
            fx.service.release("R-1", "alice").await,
            Err(TallyError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_release_unknown_rack_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.service.release("R-404", "alice").await,
            Err(TallyError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn test_pause_and_resume_preserve_ownership() {
        let fx = fixture();

        let outcome = fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        let session_id = outcome.session.session_id.clone();

        let paused = fx.service.pause("R-1", "alice").await.unwrap();
        assert_eq!(paused.status, RackStatus::Paused);
        assert_eq!(paused.claimed_by.as_deref(), Some("alice"));
        assert_eq!(paused.session_id.as_deref(), Some(session_id.as_str()));
        assert_eq!(
            fx.sessions.get(&session_id).await.unwrap().unwrap().status,
            SessionStatus::Paused
        );

        // The lease is retained while paused
        assert_eq!(
            fx.locks.get_rack_lock_owner("R-1").await.unwrap(),
            Some("alice".to_string())
        );

        let resumed = fx.service.resume("R-1", "alice").await.unwrap();
        assert_eq!(resumed.status, RackStatus::Active);
        assert_eq!(resumed.claimed_by.as_deref(), Some("alice"));
        assert_eq!(resumed.session_id.as_deref(), Some(session_id.as_str()));
        assert_eq!(
            fx.sessions.get(&session_id).await.unwrap().unwrap().status,
            SessionStatus::Active
        );
    }

    #[tokio::test]
    async fn test_paused_rack_still_conflicts_for_others() {
        let fx = fixture();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        fx.service.pause("R-1", "alice").await.unwrap();

        // Paused is in the claimable set, but the retained lease wins
        let err = fx.service.claim("R-1", "Ground", "bob").await.unwrap_err();
        match err {
            TallyError::Conflict { owner, .. } => {
                assert_eq!(owner.as_deref(), Some("alice"))
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resume_requires_paused() {
        let fx = fixture();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        assert!(matches!(
            fx.service.resume("R-1", "alice").await,
            Err(TallyError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_pause_requires_active() {
        let fx = fixture();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        fx.service.pause("R-1", "alice").await.unwrap();
        assert!(matches!(
            fx.service.pause("R-1", "alice").await,
            Err(TallyError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_pause_by_non_owner_is_forbidden() {
        let fx = fixture();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        assert!(matches!(
            fx.service.pause("R-1", "bob").await,
            Err(TallyError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_rack_status_joins_lease_state() {
        let fx = fixture();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        let view = fx.service.rack_status("R-1").await.unwrap();
        assert_eq!(view.lock_owner.as_deref(), Some("alice"));
        assert!(view.lock_ttl_seconds.unwrap() <= 60);

        assert!(matches!(
            fx.service.rack_status("R-404").await,
            Err(TallyError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn test_list_claimable_filters_and_enriches() {
        let fx = fixture();

        fx.racks.upsert(Rack::new("R-1", "Ground")).await.unwrap();
        fx.racks.upsert(Rack::new("R-2", "Upper")).await.unwrap();
        let mut done = Rack::new("R-3", "Ground");
        done.status = RackStatus::Completed;
        fx.racks.upsert(done).await.unwrap();
        fx.items.set_count("R-1", 24);

        // Active with a live lease is not claimable
        fx.service.claim("R-4", "Ground", "alice").await.unwrap();

        let all = fx.service.list_claimable(None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.rack.rack_id.as_str()).collect();
        assert_eq!(ids, vec!["R-1", "R-2"]);
        assert_eq!(all[0].item_count, 24);
        assert_eq!(all[1].item_count, 0);

        let ground = fx.service.list_claimable(Some("Ground")).await.unwrap();
        assert_eq!(ground.len(), 1);
        assert_eq!(ground[0].rack.rack_id, "R-1");
    }

    #[tokio::test]
    async fn test_list_claimable_includes_paused_and_stale_active() {
        let fx = fixture_with_ttl(SHORT);

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        fx.service.pause("R-1", "alice").await.unwrap();

        fx.service.claim("R-2", "Ground", "bob").await.unwrap();
        tokio::time::sleep(SHORT * 2).await;

        // R-1 paused (claimable), R-2 stale active (lease expired)
        let claimable = fx.service.list_claimable(None).await.unwrap();
        let ids: Vec<&str> = claimable.iter().map(|c| c.rack.rack_id.as_str()).collect();
        assert!(ids.contains(&"R-1"));
        assert!(ids.contains(&"R-2"));
    }

    #[tokio::test]
    async fn test_list_floors_falls_back_to_defaults() {
        let fx = fixture();

        let floors = fx.service.list_floors().await.unwrap();
        assert_eq!(floors, vec!["Ground", "Mezzanine", "Upper"]);

        fx.racks.upsert(Rack::new("R-1", "Basement")).await.unwrap();
        assert_eq!(fx.service.list_floors().await.unwrap(), vec!["Basement"]);
    }

    #[tokio::test]
    async fn test_active_rack_for_user() {
        let fx = fixture();

        assert_eq!(fx.service.active_rack_for_user("alice").await.unwrap(), None);

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        let rack = fx
            .service
            .active_rack_for_user("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rack.rack_id, "R-1");

        // A paused rack still counts as the user's active rack
        fx.service.pause("R-1", "alice").await.unwrap();
        assert!(
            fx.service
                .active_rack_for_user("alice")
                .await
                .unwrap()
                .is_some()
        );

        fx.service.release("R-1", "alice").await.unwrap();
        assert_eq!(fx.service.active_rack_for_user("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lifecycle_events_are_broadcast() {
        let fx = fixture();
        let mut rx = fx.bus.subscribe();

        fx.service.claim("R-1", "Ground", "alice").await.unwrap();
        fx.service.pause("R-1", "alice").await.unwrap();
        fx.service.resume("R-1", "alice").await.unwrap();
        fx.service.release("R-1", "alice").await.unwrap();

        let kinds: Vec<RackEventKind> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| e.kind)
        .collect();
        assert_eq!(
            kinds,
            vec![
                RackEventKind::Claimed,
                RackEventKind::Paused,
                RackEventKind::Resumed,
                RackEventKind::Released,
            ]
        );
    }
}

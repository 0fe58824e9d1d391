//! Session service: heartbeats, completion, and read projections
//!
//! Heartbeats keep a claimed rack alive. The three heartbeat effects
//! (presence marker, lease renewal, last_heartbeat write) are
//! independent and individually best-effort: a transient store hiccup
//! never tears down an otherwise healthy session. Renewal failure is
//! returned as data so the client can re-claim proactively.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tally_common::{TallyError, TallyResult};
use tally_lock::{LockManager, RACK_LOCK_TTL, USER_HEARTBEAT_TTL};

use crate::item_master::{ItemMaster, VerificationRecords};
use crate::model::{RackStatus, SessionStatus, VerificationSession};
use crate::registry::{RackRegistry, SessionStore, matches_filters};

/// Heartbeat acknowledgement returned to the client
///
/// A false `lock_renewed` means the lease is lost (and
/// `lock_ttl_seconds` is `None`); the client should re-claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    pub session_id: String,
    pub lock_renewed: bool,
    pub lock_ttl_seconds: Option<i64>,
    pub last_heartbeat: DateTime<Utc>,
}

/// Per-session counting statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_id: String,
    pub rack_id: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub counted_items: i64,
    pub expected_items: i64,
    pub progress_percent: f64,
    pub elapsed_seconds: i64,
}

/// Orchestrates session liveness and completion over the lock
/// manager, session store, and rack registry
#[derive(Clone)]
pub struct SessionService {
    locks: LockManager,
    sessions: Arc<dyn SessionStore>,
    racks: Arc<dyn RackRegistry>,
    items: Arc<dyn ItemMaster>,
    records: Arc<dyn VerificationRecords>,
    rack_lock_ttl: Duration,
    user_heartbeat_ttl: Duration,
}

impl SessionService {
    pub fn new(
        locks: LockManager,
        sessions: Arc<dyn SessionStore>,
        racks: Arc<dyn RackRegistry>,
        items: Arc<dyn ItemMaster>,
        records: Arc<dyn VerificationRecords>,
    ) -> Self {
        SessionService {
            locks,
            sessions,
            racks,
            items,
            records,
            rack_lock_ttl: RACK_LOCK_TTL,
            user_heartbeat_ttl: USER_HEARTBEAT_TTL,
        }
    }

    pub fn with_rack_lock_ttl(mut self, ttl: Duration) -> Self {
        self.rack_lock_ttl = ttl;
        self
    }

    pub fn with_user_heartbeat_ttl(mut self, ttl: Duration) -> Self {
        self.user_heartbeat_ttl = ttl;
        self
    }

    /// Record a client heartbeat.
    ///
    /// Contract: clients call this well below the rack lease TTL
    /// (20-30s against the 60s default, a >= 2x safety margin).
    pub async fn heartbeat(&self, session_id: &str, user: &str) -> TallyResult<HeartbeatAck> {
        let mut session = self.owned_session(session_id, user).await?;
        if session.status == SessionStatus::Completed {
            return Err(TallyError::BadRequest(format!(
                "session '{}' is already completed",
                session_id
            )));
        }

        if let Err(e) = self
            .locks
            .update_user_heartbeat(user, self.user_heartbeat_ttl)
            .await
        {
            warn!(user = %user, error = %e, "failed to refresh presence marker");
        }

        let lock_renewed = match self
            .locks
            .renew_rack_lock(&session.rack_id, user, self.rack_lock_ttl)
            .await
        {
            Ok(renewed) => renewed,
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    rack_id = %session.rack_id,
                    error = %e,
                    "lease renewal errored; reporting as not renewed"
                );
                false
            }
        };
        // The TTL read only makes sense for a lease this user still
        // holds; after a failed renewal it would report whoever took
        // the rack over.
        let lock_ttl_seconds = if lock_renewed {
            match self.locks.get_rack_lock_ttl(&session.rack_id).await {
                Ok(ttl) => ttl.map(|t| t.as_secs() as i64),
                Err(_) => None,
            }
        } else {
            None
        };

        session.last_heartbeat = Utc::now();
        let last_heartbeat = session.last_heartbeat;
        if let Err(e) = self.sessions.upsert(session).await {
            warn!(session_id = %session_id, error = %e, "failed to persist heartbeat time");
        }

        Ok(HeartbeatAck {
            session_id: session_id.to_string(),
            lock_renewed,
            lock_ttl_seconds,
            last_heartbeat,
        })
    }

    /// Complete the session and mark the rack counted.
    ///
    /// The rack (and its lease) is only touched while still bound to
    /// this session; a session displaced by a newer claim completes
    /// itself alone and leaves the new owner's claim intact. Succeeds
    /// for the caller even when the lease release fails at the store
    /// layer; the TTL backstop guarantees eventual cleanup.
    pub async fn complete(&self, session_id: &str, user: &str) -> TallyResult<VerificationSession> {
        let mut session = self.owned_session(session_id, user).await?;
        if session.status == SessionStatus::Completed {
            return Err(TallyError::BadRequest(format!(
                "session '{}' is already completed",
                session_id
            )));
        }

        if let Some(mut rack) = self.racks.get(&session.rack_id).await?
            && rack.session_id.as_deref() == Some(session_id)
        {
            if let Err(e) = self.locks.release_rack_lock(&session.rack_id, user).await {
                warn!(
                    rack_id = %session.rack_id,
                    user = %user,
                    error = %e,
                    "lease release failed during completion; relying on TTL expiry"
                );
            }
            rack.status = RackStatus::Completed;
            rack.clear_ownership();
            rack.updated_at = Utc::now();
            self.racks.upsert(rack).await?;
        }

        session.status = SessionStatus::Completed;
        session.completed_at = Some(Utc::now());
        self.sessions.upsert(session.clone()).await?;

        if let Err(e) = self.locks.delete_session_lock(session_id).await {
            warn!(session_id = %session_id, error = %e, "failed to delete session lock");
        }

        tracing::info!(
            session_id = %session_id,
            rack_id = %session.rack_id,
            user_id = %user,
            "session completed"
        );
        Ok(session)
    }

    /// Single-session detail
    pub async fn get_session(&self, session_id: &str) -> TallyResult<VerificationSession> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| TallyError::session_not_found(session_id))
    }

    /// Active (or paused) sessions, optionally filtered by user/rack
    pub async fn list_active(
        &self,
        user_id: Option<&str>,
        rack_id: Option<&str>,
    ) -> TallyResult<Vec<VerificationSession>> {
        let mut sessions: Vec<VerificationSession> = self
            .sessions
            .list()
            .await?
            .into_iter()
            .filter(|s| s.status != SessionStatus::Completed)
            .filter(|s| matches_filters(s, user_id, rack_id, None))
            .collect();
        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(sessions)
    }

    /// Completed-session history, optionally filtered by user
    pub async fn completed_history(
        &self,
        user_id: Option<&str>,
    ) -> TallyResult<Vec<VerificationSession>> {
        let mut sessions: Vec<VerificationSession> = self
            .sessions
            .list()
            .await?
            .into_iter()
            .filter(|s| matches_filters(s, user_id, None, Some(SessionStatus::Completed)))
            .collect();
        sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(sessions)
    }

    /// Counting statistics sourced from the verification-records and
    /// item-master collaborators
    pub async fn session_stats(&self, session_id: &str) -> TallyResult<SessionStats> {
        let session = self.get_session(session_id).await?;

        let counted_items = self.records.counted_items(session_id).await?;
        let expected_items = self.items.item_count(&session.rack_id).await?;
        let progress_percent = if expected_items > 0 {
            ((counted_items as f64 / expected_items as f64) * 100.0).min(100.0)
        } else {
            0.0
        };
        let end = session.completed_at.unwrap_or_else(Utc::now);
        let elapsed_seconds = (end - session.started_at).num_seconds().max(0);

        Ok(SessionStats {
            session_id: session.session_id,
            rack_id: session.rack_id,
            user_id: session.user_id,
            status: session.status,
            counted_items,
            expected_items,
            progress_percent,
            elapsed_seconds,
        })
    }

    /// Load the session and check the caller owns it
    async fn owned_session(&self, session_id: &str, user: &str) -> TallyResult<VerificationSession> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| TallyError::session_not_found(session_id))?;
        if session.user_id != user {
            return Err(TallyError::Forbidden(format!(
                "session '{}' does not belong to user '{}'",
                session_id, user
            )));
        }
        Ok(session)
    }
}

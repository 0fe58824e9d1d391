//! Persistent registries for rack and session documents
//!
//! The registries are the durable side of the dual-store design: the
//! lock store holds ephemeral leases, these hold the documents. The
//! traits are the seam for an external database; the in-memory
//! implementations back standalone deployments and tests.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use tally_common::TallyResult;

use crate::model::{Rack, SessionStatus, VerificationSession};

/// Store of rack documents
#[async_trait]
pub trait RackRegistry: Send + Sync {
    async fn get(&self, rack_id: &str) -> TallyResult<Option<Rack>>;

    /// Insert or overwrite the document for `rack.rack_id`
    async fn upsert(&self, rack: Rack) -> TallyResult<()>;

    async fn list(&self) -> TallyResult<Vec<Rack>>;

    /// Distinct floors present in the registry, sorted
    async fn floors(&self) -> TallyResult<Vec<String>>;
}

/// Store of verification-session documents
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> TallyResult<Option<VerificationSession>>;

    async fn upsert(&self, session: VerificationSession) -> TallyResult<()>;

    async fn list(&self) -> TallyResult<Vec<VerificationSession>>;
}

/// In-memory rack registry backed by a concurrent map
#[derive(Clone, Default)]
pub struct MemoryRackRegistry {
    racks: Arc<DashMap<String, Rack>>,
}

impl MemoryRackRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RackRegistry for MemoryRackRegistry {
    async fn get(&self, rack_id: &str) -> TallyResult<Option<Rack>> {
        Ok(self.racks.get(rack_id).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, rack: Rack) -> TallyResult<()> {
        self.racks.insert(rack.rack_id.clone(), rack);
        Ok(())
    }

    async fn list(&self) -> TallyResult<Vec<Rack>> {
        Ok(self
            .racks
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn floors(&self) -> TallyResult<Vec<String>> {
        let mut floors: Vec<String> = self
            .racks
            .iter()
            .map(|entry| entry.value().floor.clone())
            .collect();
        floors.sort();
        floors.dedup();
        Ok(floors)
    }
}

/// In-memory session store backed by a concurrent map
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, VerificationSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> TallyResult<Option<VerificationSession>> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, session: VerificationSession) -> TallyResult<()> {
        self.sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn list(&self) -> TallyResult<Vec<VerificationSession>> {
        Ok(self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// Filter helper shared by the session read projections
pub(crate) fn matches_filters(
    session: &VerificationSession,
    user_id: Option<&str>,
    rack_id: Option<&str>,
    status: Option<SessionStatus>,
) -> bool {
    user_id.is_none_or(|u| session.user_id == u)
        && rack_id.is_none_or(|r| session.rack_id == r)
        && status.is_none_or(|s| session.status == s)
}

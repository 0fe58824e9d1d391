//! Shared application state

use std::sync::Arc;

use tally_core::{
    MemoryRackRegistry, MemorySessionStore, RackEventBus, RackService, RackServiceConfig,
    SessionService, StaticItemMaster, StaticVerificationRecords,
};
use tally_lock::{LockManager, MemoryLockStore};

use super::config::Configuration;

/// Everything the HTTP handlers need
pub struct AppState {
    pub configuration: Configuration,
    pub rack_service: RackService,
    pub session_service: SessionService,
    pub event_bus: RackEventBus,
}

impl AppState {
    /// Build the standalone in-process stack: in-memory lock store and
    /// registries shared by both services.
    pub fn standalone(configuration: Configuration) -> Self {
        let locks = LockManager::new(Arc::new(MemoryLockStore::new()));
        let racks = Arc::new(MemoryRackRegistry::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let items = Arc::new(StaticItemMaster::new());
        let records = Arc::new(StaticVerificationRecords::new());
        let event_bus = RackEventBus::new();

        let rack_service = RackService::new(
            locks.clone(),
            racks.clone(),
            sessions.clone(),
            items.clone(),
            event_bus.clone(),
            RackServiceConfig {
                rack_lock_ttl: configuration.rack_lock_ttl(),
                session_lock_ttl: configuration.session_lock_ttl(),
                default_floors: configuration.default_floors(),
            },
        );
        let session_service = SessionService::new(locks, sessions, racks, items, records)
            .with_rack_lock_ttl(configuration.rack_lock_ttl())
            .with_user_heartbeat_ttl(configuration.user_heartbeat_ttl());

        AppState {
            configuration,
            rack_service,
            session_service,
            event_bus,
        }
    }
}

//! Tally Core - rack leasing and session lifecycle
//!
//! The two services in this crate orchestrate the stock-counting
//! concurrency core: `RackService` runs the claim/release/pause/resume
//! state machine over the lock manager and rack registry, and
//! `SessionService` keeps claimed racks alive through heartbeats and
//! closes them out on completion.
//!
//! All authoritative state lives in the lock store and the registries;
//! the services themselves are stateless and safe to run in any number
//! of server processes.

pub mod item_master;
pub mod model;
pub mod notify;
pub mod rack_service;
pub mod registry;
pub mod session_service;

pub use item_master::{ItemMaster, StaticItemMaster, StaticVerificationRecords, VerificationRecords};
pub use model::{Rack, RackStatus, SessionStatus, VerificationSession};
pub use notify::{RackEvent, RackEventBus, RackEventKind};
pub use rack_service::{RackService, RackServiceConfig};
pub use registry::{MemoryRackRegistry, MemorySessionStore, RackRegistry, SessionStore};
pub use session_service::SessionService;

//! Tally Lock - TTL lease store and lock manager
//!
//! Mutual exclusion for rack ownership is built from three primitives
//! offered by a shared key/value store: atomic create-if-absent,
//! compare-and-delete, and TTL extension. Everything above that
//! (key schemes, default TTLs, liveness markers) lives in the
//! [`LockManager`].

pub mod manager;
pub mod store;

pub use manager::{
    LockManager, RACK_LOCK_TTL, SESSION_LOCK_TTL, USER_HEARTBEAT_TTL,
};
pub use store::{LockStore, MemoryLockStore};

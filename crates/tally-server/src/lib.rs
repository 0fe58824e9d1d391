//! Tally server - HTTP surface over the rack and session services
//!
//! The handlers here are thin wrappers: identity comes from headers,
//! all decisions live in `tally-core`, and every service error maps to
//! its HTTP status through the shared response envelope.

pub mod api;
pub mod auth;
pub mod model;
pub mod startup;

pub use model::common::AppState;

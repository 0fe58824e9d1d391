//! Server-side models: configuration, shared state, and the HTTP
//! response envelope

pub mod common;
pub mod config;
pub mod response;

pub use config::Configuration;

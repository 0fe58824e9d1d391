//! HTTP API handlers

pub mod model;
pub mod racks;
pub mod route;
pub mod sessions;

//! Tally Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all Tally
//! components:
//! - Error types and error codes
//! - Utility functions
//! - Common constants

pub mod error;
pub mod utils;

// Re-exports for convenience
pub use error::{ErrorCode, TallyError, TallyResult};
pub use utils::{is_valid_id, now_millis};

/// Header carrying the resolved caller user id
pub const USER_HEADER: &str = "X-Tally-User";

/// Header carrying the resolved caller role
pub const ROLE_HEADER: &str = "X-Tally-Role";

/// Role assigned when the caller provides none
pub const DEFAULT_ROLE: &str = "counter";

/// Floors reported when the rack registry is still empty
pub const DEFAULT_FLOORS: [&str; 3] = ["Ground", "Mezzanine", "Upper"];

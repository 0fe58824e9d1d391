//! Error types and error codes for Tally
//!
//! This module defines:
//! - `TallyError`: Application-specific error enum covering the
//!   lease/ownership failure taxonomy
//! - `ErrorCode`: Structured error codes for API responses

use serde::{Deserialize, Serialize};

/// Application-specific error types
///
/// Every fallible rack/session operation resolves to one of these.
/// `Conflict` and `Forbidden` are the two ownership failures a client
/// is expected to handle: a conflict is retryable after the lease
/// expires, a forbidden call requires re-claiming the rack first.
#[derive(thiserror::Error, Debug)]
pub enum TallyError {
    #[error("rack '{rack_id}' is not claimable")]
    Conflict {
        rack_id: String,
        owner: Option<String>,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} '{1}' not found")]
    NotFound(&'static str, String),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("store error: {0}")]
    Store(String),
}

impl TallyError {
    /// Conflict over a rack held by a known owner
    pub fn held_by(rack_id: &str, owner: Option<String>) -> Self {
        TallyError::Conflict {
            rack_id: rack_id.to_string(),
            owner,
        }
    }

    pub fn rack_not_found(rack_id: &str) -> Self {
        TallyError::NotFound("rack", rack_id.to_string())
    }

    pub fn session_not_found(session_id: &str) -> Self {
        TallyError::NotFound("session", session_id.to_string())
    }

    /// HTTP status this error maps to at the API layer
    pub fn status(&self) -> u16 {
        match self {
            TallyError::Conflict { .. } => 409,
            TallyError::Forbidden(_) => 403,
            TallyError::NotFound(..) => 404,
            TallyError::BadRequest(_) => 400,
            TallyError::Store(_) => 500,
        }
    }
}

/// Result alias used across the workspace
pub type TallyResult<T> = Result<T, TallyError>;

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

// General success and error codes
pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_MISSING: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "parameter missing",
};

pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const NOT_RACK_OWNER: ErrorCode<'static> = ErrorCode {
    code: 20001,
    message: "caller is not the current rack owner",
};

pub const RACK_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "rack not found",
};

pub const RACK_HELD: ErrorCode<'static> = ErrorCode {
    code: 20003,
    message: "rack is held by another user",
};

pub const INVALID_TRANSITION: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "transition invalid for current rack state",
};

pub const ILLEGAL_RACK_ID: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "illegal rack id",
};

pub const SESSION_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 21001,
    message: "session not found",
};

pub const SESSION_COMPLETED: ErrorCode<'static> = ErrorCode {
    code: 21002,
    message: "session already completed",
};

pub const STORE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "store error",
};

//! HTTP response types for the Tally server
//!
//! Every endpoint answers with the same JSON envelope; service errors
//! map to HTTP statuses here and nowhere else.

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};

use tally_common::{TallyError, error};

/// Generic result wrapper for API responses
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Result<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> Result<T> {
    pub fn new(code: i32, message: String, data: T) -> Self {
        Result::<T> {
            code,
            message,
            data,
        }
    }

    pub fn success(data: T) -> Result<T> {
        Result::<T> {
            code: 0,
            message: "success".to_string(),
            data,
        }
    }

    pub fn http_success(data: impl Serialize) -> HttpResponse {
        HttpResponse::Ok().json(Result::success(data))
    }

    pub fn http_response(
        status: u16,
        code: i32,
        message: String,
        data: impl Serialize,
    ) -> HttpResponse {
        HttpResponseBuilder::new(StatusCode::from_u16(status).unwrap_or_default())
            .json(Result::new(code, message, data))
    }
}

/// Map a service error to its HTTP response.
///
/// Conflict responses carry the current owner so a human can find who
/// holds the rack; everything else surfaces a retry-safe message.
pub fn error_response(err: &TallyError) -> HttpResponse {
    match err {
        TallyError::Conflict { owner, .. } => Result::<serde_json::Value>::http_response(
            err.status(),
            error::RACK_HELD.code,
            err.to_string(),
            serde_json::json!({ "owner": owner }),
        ),
        TallyError::Forbidden(_) => Result::<()>::http_response(
            err.status(),
            error::NOT_RACK_OWNER.code,
            err.to_string(),
            (),
        ),
        TallyError::NotFound(kind, _) => {
            let code = if *kind == "session" {
                error::SESSION_NOT_FOUND.code
            } else {
                error::RACK_NOT_FOUND.code
            };
            Result::<()>::http_response(err.status(), code, err.to_string(), ())
        }
        TallyError::BadRequest(_) => Result::<()>::http_response(
            err.status(),
            error::INVALID_TRANSITION.code,
            err.to_string(),
            (),
        ),
        TallyError::Store(_) => Result::<()>::http_response(
            err.status(),
            error::STORE_ERROR.code,
            "store temporarily unavailable, please retry".to_string(),
            (),
        ),
    }
}

//! Caller identity resolution
//!
//! Token issuance and verification live upstream; by the time a
//! request reaches this server a gateway has resolved the caller and
//! forwarded `{user_id, role}` as headers. Authorization for every
//! mutating rack/session operation is exactly "caller == current
//! owner", enforced in the services; there is no admin override.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized};

use tally_common::{DEFAULT_ROLE, ROLE_HEADER, USER_HEADER, is_valid_id};

/// Resolved identity of the requesting user
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub role: String,
}

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| is_valid_id(v))
            .map(str::to_string);

        let role = req
            .headers()
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| is_valid_id(v))
            .unwrap_or(DEFAULT_ROLE)
            .to_string();

        match user_id {
            Some(user_id) => ready(Ok(Caller { user_id, role })),
            None => ready(Err(ErrorUnauthorized(format!(
                "missing or invalid {} header",
                USER_HEADER
            )))),
        }
    }
}

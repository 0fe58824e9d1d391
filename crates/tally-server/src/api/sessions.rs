//! Session API handlers
//!
//! Implements the session lifecycle endpoints:
//! - POST /tally/v1/sessions/{session_id}/heartbeat - Renew liveness
//! - POST /tally/v1/sessions/{session_id}/complete - Finish the count
//! - GET  /tally/v1/sessions/active - List live sessions
//! - GET  /tally/v1/sessions/history - Completed sessions
//! - GET  /tally/v1/sessions/{session_id} - Session detail
//! - GET  /tally/v1/sessions/{session_id}/stats - Counting progress

use actix_web::{Responder, get, post, web};

use crate::auth::Caller;
use crate::model::common::AppState;
use crate::model::response::{Result, error_response};

use super::model::{HistoryQuery, SessionFilterQuery};

/// Record a heartbeat; the ack reports whether the rack lease was
/// renewed and how long it has left
#[post("/{session_id}/heartbeat")]
pub async fn heartbeat(
    data: web::Data<AppState>,
    path: web::Path<String>,
    caller: Caller,
) -> impl Responder {
    match data
        .session_service
        .heartbeat(&path.into_inner(), &caller.user_id)
        .await
    {
        Ok(ack) => Result::<()>::http_success(ack),
        Err(e) => error_response(&e),
    }
}

/// Complete the session and mark its rack counted
#[post("/{session_id}/complete")]
pub async fn complete(
    data: web::Data<AppState>,
    path: web::Path<String>,
    caller: Caller,
) -> impl Responder {
    match data
        .session_service
        .complete(&path.into_inner(), &caller.user_id)
        .await
    {
        Ok(session) => Result::<()>::http_success(session),
        Err(e) => error_response(&e),
    }
}

/// List live sessions, optionally filtered by user or rack
#[get("/active")]
pub async fn list_active(
    data: web::Data<AppState>,
    query: web::Query<SessionFilterQuery>,
) -> impl Responder {
    match data
        .session_service
        .list_active(query.user_id.as_deref(), query.rack_id.as_deref())
        .await
    {
        Ok(sessions) => Result::<()>::http_success(sessions),
        Err(e) => error_response(&e),
    }
}

/// Completed-session history, optionally filtered by user
#[get("/history")]
pub async fn history(
    data: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> impl Responder {
    match data
        .session_service
        .completed_history(query.user_id.as_deref())
        .await
    {
        Ok(sessions) => Result::<()>::http_success(sessions),
        Err(e) => error_response(&e),
    }
}

/// Counting statistics for one session
#[get("/{session_id}/stats")]
pub async fn stats(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.session_service.session_stats(&path.into_inner()).await {
        Ok(stats) => Result::<()>::http_success(stats),
        Err(e) => error_response(&e),
    }
}

/// Single-session detail
#[get("/{session_id}")]
pub async fn get_session(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.session_service.get_session(&path.into_inner()).await {
        Ok(session) => Result::<()>::http_success(session),
        Err(e) => error_response(&e),
    }
}

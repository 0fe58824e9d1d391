//! Rack API handlers
//!
//! Implements the rack lifecycle endpoints:
//! - GET  /tally/v1/racks/available - List claimable racks
//! - GET  /tally/v1/racks/floors - List floors
//! - GET  /tally/v1/racks/user/active - Caller's current rack
//! - POST /tally/v1/racks/{rack_id}/claim - Claim a rack
//! - POST /tally/v1/racks/{rack_id}/release - Release a rack
//! - POST /tally/v1/racks/{rack_id}/pause - Pause counting
//! - POST /tally/v1/racks/{rack_id}/resume - Resume counting
//! - GET  /tally/v1/racks/{rack_id}/status - Rack + lease status

use actix_web::{Responder, get, post, web};

use crate::auth::Caller;
use crate::model::common::AppState;
use crate::model::response::{Result, error_response};

use super::model::{ClaimRequest, FloorQuery};

/// List racks a new claim could target, optionally filtered by floor
#[get("/available")]
pub async fn list_available(
    data: web::Data<AppState>,
    query: web::Query<FloorQuery>,
) -> impl Responder {
    match data
        .rack_service
        .list_claimable(query.floor.as_deref())
        .await
    {
        Ok(racks) => Result::<()>::http_success(racks),
        Err(e) => error_response(&e),
    }
}

/// List distinct floors known to the registry
#[get("/floors")]
pub async fn list_floors(data: web::Data<AppState>) -> impl Responder {
    match data.rack_service.list_floors().await {
        Ok(floors) => Result::<()>::http_success(floors),
        Err(e) => error_response(&e),
    }
}

/// The rack currently claimed by the caller, if any
#[get("/user/active")]
pub async fn user_active(data: web::Data<AppState>, caller: Caller) -> impl Responder {
    match data.rack_service.active_rack_for_user(&caller.user_id).await {
        Ok(rack) => Result::<()>::http_success(rack),
        Err(e) => error_response(&e),
    }
}

/// Claim a rack for the caller
#[post("/{rack_id}/claim")]
pub async fn claim(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ClaimRequest>,
    caller: Caller,
) -> impl Responder {
    let rack_id = path.into_inner();
    match data
        .rack_service
        .claim(&rack_id, &body.floor, &caller.user_id)
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                rack_id = %rack_id,
                user_id = %caller.user_id,
                session_id = %outcome.session.session_id,
                "rack claimed"
            );
            Result::<()>::http_success(outcome)
        }
        Err(e) => error_response(&e),
    }
}

/// Release a rack back to the available pool
#[post("/{rack_id}/release")]
pub async fn release(
    data: web::Data<AppState>,
    path: web::Path<String>,
    caller: Caller,
) -> impl Responder {
    let rack_id = path.into_inner();
    match data.rack_service.release(&rack_id, &caller.user_id).await {
        Ok(rack) => {
            tracing::info!(rack_id = %rack_id, user_id = %caller.user_id, "rack released");
            Result::<()>::http_success(rack)
        }
        Err(e) => error_response(&e),
    }
}

/// Pause counting on a rack; the lease is retained
#[post("/{rack_id}/pause")]
pub async fn pause(
    data: web::Data<AppState>,
    path: web::Path<String>,
    caller: Caller,
) -> impl Responder {
    let rack_id = path.into_inner();
    match data.rack_service.pause(&rack_id, &caller.user_id).await {
        Ok(rack) => Result::<()>::http_success(rack),
        Err(e) => error_response(&e),
    }
}

/// Resume counting on a paused rack
#[post("/{rack_id}/resume")]
pub async fn resume(
    data: web::Data<AppState>,
    path: web::Path<String>,
    caller: Caller,
) -> impl Responder {
    let rack_id = path.into_inner();
    match data.rack_service.resume(&rack_id, &caller.user_id).await {
        Ok(rack) => Result::<()>::http_success(rack),
        Err(e) => error_response(&e),
    }
}

/// Rack document joined with live lease state
#[get("/{rack_id}/status")]
pub async fn status(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.rack_service.rack_status(&path.into_inner()).await {
        Ok(view) => Result::<()>::http_success(view),
        Err(e) => error_response(&e),
    }
}

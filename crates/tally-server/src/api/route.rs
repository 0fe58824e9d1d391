//! API routing configuration
//!
//! Routes:
//! - GET  /v1/racks/available - List claimable racks
//! - GET  /v1/racks/floors - List floors
//! - GET  /v1/racks/user/active - Caller's current rack
//! - POST /v1/racks/{rack_id}/claim - Claim a rack
//! - POST /v1/racks/{rack_id}/release - Release a rack
//! - POST /v1/racks/{rack_id}/pause - Pause counting
//! - POST /v1/racks/{rack_id}/resume - Resume counting
//! - GET  /v1/racks/{rack_id}/status - Rack + lease status
//! - POST /v1/sessions/{session_id}/heartbeat - Renew liveness
//! - POST /v1/sessions/{session_id}/complete - Finish the count
//! - GET  /v1/sessions/active - List live sessions
//! - GET  /v1/sessions/history - Completed sessions
//! - GET  /v1/sessions/{session_id}/stats - Counting progress
//! - GET  /v1/sessions/{session_id} - Session detail

use actix_web::{Scope, web};

use super::{racks, sessions};

/// Create the V1 rack and session routes
///
/// Fixed-path routes are registered before `{id}` captures so
/// `/racks/user/active` and `/sessions/active` resolve correctly.
pub fn tally_routes() -> Scope {
    web::scope("/v1")
        .service(
            web::scope("/racks")
                .service(racks::list_available)
                .service(racks::list_floors)
                .service(racks::user_active)
                .service(racks::claim)
                .service(racks::release)
                .service(racks::pause)
                .service(racks::resume)
                .service(racks::status),
        )
        .service(
            web::scope("/sessions")
                .service(sessions::list_active)
                .service(sessions::history)
                .service(sessions::heartbeat)
                .service(sessions::complete)
                .service(sessions::stats)
                .service(sessions::get_session),
        )
}

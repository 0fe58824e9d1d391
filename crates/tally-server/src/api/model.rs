//! Request DTOs for the rack and session endpoints

use serde::Deserialize;

/// Body of POST /racks/{rack_id}/claim
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub floor: String,
}

/// Query of GET /racks/available
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorQuery {
    pub floor: Option<String>,
}

/// Query of GET /sessions/active
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilterQuery {
    pub user_id: Option<String>,
    pub rack_id: Option<String>,
}

/// Query of GET /sessions/history
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: Option<String>,
}

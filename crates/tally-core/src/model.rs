//! Domain model for racks and verification sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rack lifecycle states
///
/// `available -> active -> paused -> active -> {available | completed}`.
/// Only `Available` and `Paused` are claimable; `Completed` is terminal
/// for the session that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RackStatus {
    Available,
    Active,
    Paused,
    Completed,
}

impl RackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RackStatus::Available => "available",
            RackStatus::Active => "active",
            RackStatus::Paused => "paused",
            RackStatus::Completed => "completed",
        }
    }

    /// Whether a claim may target a rack in this state
    pub fn is_claimable(self) -> bool {
        matches!(self, RackStatus::Available | RackStatus::Paused)
    }

    /// Whether this state implies a current owner
    pub fn is_owned(self) -> bool {
        matches!(self, RackStatus::Active | RackStatus::Paused)
    }
}

impl std::fmt::Display for RackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(RackStatus::Available),
            "active" => Ok(RackStatus::Active),
            "paused" => Ok(RackStatus::Paused),
            "completed" => Ok(RackStatus::Completed),
            _ => Err(format!("Invalid rack status: {}", s)),
        }
    }
}

/// A physical, leasable storage location
///
/// Created lazily on the first claim attempt for an unseen id, mutated
/// only by the rack service, never deleted. Invariant: `claimed_by` and
/// `session_id` are `Some` iff `status` is `Active` or `Paused`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rack {
    pub rack_id: String,
    pub floor: String,
    pub status: RackStatus,
    pub claimed_by: Option<String>,
    pub session_id: Option<String>,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Rack {
    /// A fresh, unclaimed rack
    pub fn new(rack_id: &str, floor: &str) -> Self {
        Rack {
            rack_id: rack_id.to_string(),
            floor: floor.to_string(),
            status: RackStatus::Available,
            claimed_by: None,
            session_id: None,
            lock_expires_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Clear ownership fields, leaving `status` for the caller to set
    pub fn clear_ownership(&mut self) {
        self.claimed_by = None;
        self.session_id = None;
        self.lock_expires_at = None;
    }
}

/// Verification session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "paused" => Ok(SessionStatus::Paused),
            "completed" => Ok(SessionStatus::Completed),
            _ => Err(format!("Invalid session status: {}", s)),
        }
    }
}

/// One user's unit of counting work on one rack
///
/// Created on successful claim, terminal at `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSession {
    pub session_id: String,
    pub user_id: String,
    pub rack_id: String,
    pub floor: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl VerificationSession {
    /// A new active session with a generated id
    pub fn new(user_id: &str, rack_id: &str, floor: &str) -> Self {
        let now = Utc::now();
        VerificationSession {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            rack_id: rack_id.to_string(),
            floor: floor.to_string(),
            status: SessionStatus::Active,
            started_at: now,
            last_heartbeat: now,
            completed_at: None,
        }
    }
}

//! Rack event broadcast bus
//!
//! Best-effort publish/subscribe over a tokio broadcast channel.
//! Delivery is at-least-once for live subscribers and carries no
//! ordering guarantee; dashboards must treat rack state as eventually
//! consistent and reconcile via the status endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Rack state transitions worth broadcasting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RackEventKind {
    Claimed,
    Released,
    Paused,
    Resumed,
}

impl RackEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RackEventKind::Claimed => "claimed",
            RackEventKind::Released => "released",
            RackEventKind::Paused => "paused",
            RackEventKind::Resumed => "resumed",
        }
    }
}

impl std::fmt::Display for RackEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single rack state change notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RackEvent {
    pub rack_id: String,
    pub kind: RackEventKind,
    pub floor: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RackEvent {
    pub fn new(
        kind: RackEventKind,
        rack_id: &str,
        floor: &str,
        user_id: &str,
        session_id: Option<String>,
    ) -> Self {
        RackEvent {
            rack_id: rack_id.to_string(),
            kind,
            floor: floor.to_string(),
            user_id: user_id.to_string(),
            session_id,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast channel capacity; slow receivers past this lag drop events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Best-effort broadcaster of rack state events
#[derive(Clone)]
pub struct RackEventBus {
    sender: broadcast::Sender<RackEvent>,
}

impl RackEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        RackEventBus { sender }
    }

    /// Publish an event to current subscribers.
    ///
    /// Having no subscribers is not an error; the stream is advisory.
    pub fn publish(&self, event: RackEvent) {
        tracing::debug!(
            rack_id = %event.rack_id,
            kind = %event.kind,
            user_id = %event.user_id,
            "rack event"
        );
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RackEvent> {
        self.sender.subscribe()
    }
}

impl Default for RackEventBus {
    fn default() -> Self {
        Self::new()
    }
}

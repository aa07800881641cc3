//! Domain models for sleep/wake events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Sleep,
    Wake,
}

impl EventType {
    /// Column value in the events table
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Sleep => "sleep",
            EventType::Wake => "wake",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "sleep" => Some(EventType::Sleep),
            "wake" => Some(EventType::Wake),
            _ => None,
        }
    }
}

/// Stored event row
///
/// `event_time` is the semantic timestamp of the activity and may sit
/// in the future relative to `created_at` (quick-entry offsets).
/// Both are UTC instants; day bucketing is derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_type: EventType,
    pub event_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Payload for inserting a new event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub user_id: Uuid,
    pub event_type: EventType,
    pub event_time: DateTime<Utc>,
}

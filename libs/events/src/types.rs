//! Event definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EventError;

// =============================================================================
// Event Kinds
// =============================================================================

/// Kind of event, used to route events to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A value changed in the configured (desired) state tree.
    StateChange,
    /// A value changed in the discovered (observed) state tree.
    Discovery,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::StateChange => "state_change",
            EventType::Discovery => "discovery",
        };
        write!(f, "{}", s)
    }
}

/// What happened to the value at a state-change URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StateChangeType {
    #[default]
    Update,
    Create,
}

// =============================================================================
// Payloads
// =============================================================================

/// Payload of a [`EventType::StateChange`] event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    /// Kind of change.
    #[serde(rename = "type")]
    pub change: StateChangeType,

    /// Node-qualified URL of the changed value.
    pub url: String,

    /// New value.
    pub value: serde_json::Value,
}

/// Typed event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    StateChange(StateChangeEvent),
    Raw { data: serde_json::Value },
}

// =============================================================================
// Event
// =============================================================================

/// An event delivered through the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Routing kind.
    pub kind: EventType,

    /// Node-qualified URL the event refers to.
    pub url: String,

    /// When the event was emitted.
    pub occurred_at: DateTime<Utc>,

    /// Event data.
    pub data: EventPayload,
}

impl Event {
    /// Build a state-change event for a node-qualified URL.
    pub fn state_change(
        url: impl Into<String>,
        change: StateChangeType,
        value: serde_json::Value,
    ) -> Self {
        let url = url.into();
        Self {
            kind: EventType::StateChange,
            url: url.clone(),
            occurred_at: Utc::now(),
            data: EventPayload::StateChange(StateChangeEvent { change, url, value }),
        }
    }

    /// Build an event with an untyped payload.
    pub fn raw(kind: EventType, url: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind,
            url: url.into(),
            occurred_at: Utc::now(),
            data: EventPayload::Raw { data },
        }
    }

    /// URL the event refers to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Event data.
    pub fn data(&self) -> &EventPayload {
        &self.data
    }

    /// The state-change payload, if this is a state-change event.
    pub fn as_state_change(&self) -> Result<&StateChangeEvent, EventError> {
        match &self.data {
            EventPayload::StateChange(sc) => Ok(sc),
            EventPayload::Raw { .. } => Err(EventError::InvalidPayload(format!(
                "{} event for {} carries no state change",
                self.kind, self.url
            ))),
        }
    }
}

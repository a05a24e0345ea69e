//! Error types for event delivery.

use thiserror::Error;

/// Errors that can occur when subscribing to or delivering events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The subscriber's channel has been closed.
    #[error("subscriber channel closed: {0}")]
    ChannelClosed(String),

    /// A listener with this name is already subscribed.
    #[error("duplicate listener: {0}")]
    DuplicateListener(String),

    /// The event payload does not have the expected shape.
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}

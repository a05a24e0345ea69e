//! # corral-events
//!
//! Event types and the subscription interface of the corral event bus.
//!
//! ## Design Principles
//!
//! - Events are immutable notifications; they carry the URL of what changed
//!   and a typed payload
//! - Subscribers register a listener: an event kind, a predicate, and a
//!   handler that forwards admitted events (usually onto a channel)
//! - Filtering happens at the bus, so subscribers never see events their
//!   predicate rejects
//!
//! ## URLs
//!
//! Event URLs are node-qualified: `<node_id>/<path>`, for example
//! `node_01HV4Z2WQXKJNM8GPQY6VBKC3D/Services/pxe/State`.

mod bus;
mod error;
mod types;

pub use bus::*;
pub use error::EventError;
pub use types::*;

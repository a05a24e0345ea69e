//! # corral-id
//!
//! Identifier types shared by every corral component.
//!
//! ## Identifier Kinds
//!
//! - [`NodeId`]: system-generated, prefixed ULID (`node_01HV4Z2WQXKJNM8GPQY6VBKC3D`).
//!   Every node process owns exactly one and uses it to scope its subtree of
//!   the shared state tree.
//! - [`ServiceId`]: operator-chosen name of a service instance managed on a
//!   node (`svc-a`, `dhcpd`, `pxe`). It becomes a path segment in
//!   `/Services/<id>/State`, so it must not contain `/` or whitespace.
//!
//! Both kinds parse strictly and format back to the same string.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;

//! Node and service identifier definitions.

use std::borrow::Borrow;
use std::fmt;

use crate::{impl_id_traits, IdError, Ulid};

// =============================================================================
// Nodes
// =============================================================================

/// Identity of a node process, rendered as `node_<ulid>`.
///
/// The textual form is the first segment of every node-qualified state URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(Ulid);

impl NodeId {
    pub const PREFIX: &'static str = "node";

    /// Generate a fresh node id.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse `node_<ulid>`. The prefix is case sensitive.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let Some((prefix, raw)) = s.split_once('_') else {
            return Err(if s.is_empty() {
                IdError::Empty
            } else {
                IdError::MissingSeparator
            });
        };

        if prefix != Self::PREFIX {
            return Err(IdError::WrongPrefix {
                expected: Self::PREFIX,
                found: prefix.to_string(),
            });
        }

        Ulid::from_string(raw).map(Self).map_err(|e| IdError::InvalidUlid {
            id: s.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl_id_traits!(NodeId);

// =============================================================================
// Services
// =============================================================================

/// Name of a service instance managed on a node.
///
/// Service ids are chosen by whoever registers the instance and are embedded
/// verbatim as a path segment of the state tree, so they are validated on
/// construction: non-empty, no `/`, no whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(String);

impl ServiceId {
    /// Parses and validates a service id.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }

        if let Some(ch) = s
            .chars()
            .find(|c| *c == '/' || c.is_whitespace() || c.is_control())
        {
            return Err(IdError::InvalidCharacter {
                id: s.to_string(),
                ch,
            });
        }

        Ok(Self(s.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServiceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl_id_traits!(ServiceId);

// =============================================================================
// Tests
// =============================================================================

//! Typed state-tree paths and node-qualified URLs.

use std::fmt;
use std::str::FromStr;

use corral_id::{NodeId, ServiceId};

use crate::PathError;

/// Root segment of the services subtree.
pub const SERVICES_ROOT: &str = "Services";

/// Leaf segment holding a service's lifecycle state.
pub const STATE_KEY: &str = "State";

/// A path in a node's state tree, stored as segments.
///
/// The textual form is `/a/b/c`; the leading slash is optional when parsing
/// and a single trailing slash is tolerated. The empty string and `/` are
/// the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatePath {
    segments: Vec<String>,
}

impl StatePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a textual path.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for seg in trimmed.split('/') {
            if seg.is_empty() {
                return Err(PathError::EmptySegment(s.to_string()));
            }
            segments.push(seg.to_string());
        }

        Ok(Self { segments })
    }

    /// Append a segment, returning the extended path.
    #[must_use]
    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for StatePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Path of a service's lifecycle state: `/Services/<id>/State`.
pub fn service_state_path(id: &ServiceId) -> StatePath {
    StatePath::root()
        .push(SERVICES_ROOT)
        .push(id.as_str())
        .push(STATE_KEY)
}

/// Extract the service id from a path under `/Services/<id>`.
pub fn service_id_from_path(path: &StatePath) -> Result<ServiceId, PathError> {
    match path.segments() {
        [root, id, ..] if root == SERVICES_ROOT => {
            ServiceId::parse(id).map_err(|source| PathError::InvalidService {
                path: path.to_string(),
                source,
            })
        }
        _ => Err(PathError::NotAServicePath(path.to_string())),
    }
}

/// A path qualified by the node whose tree it addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeUrl {
    pub node: NodeId,
    pub path: StatePath,
}

impl NodeUrl {
    pub fn new(node: NodeId, path: StatePath) -> Self {
        Self { node, path }
    }

    /// Split a URL into its raw node component and the rest of the path.
    ///
    /// The returned path keeps its leading slash, if any.
    pub fn split(url: &str) -> Option<(&str, &str)> {
        let idx = url.find('/')?;
        Some((&url[..idx], &url[idx..]))
    }

    /// Parse `<node_id>/<path>`.
    pub fn parse(url: &str) -> Result<Self, PathError> {
        let (node, path) = Self::split(url).ok_or_else(|| PathError::MissingPath(url.to_string()))?;

        let node = NodeId::parse(node).map_err(|source| PathError::InvalidNode {
            url: url.to_string(),
            source,
        })?;

        Ok(Self {
            node,
            path: StatePath::parse(path)?,
        })
    }
}

impl fmt::Display for NodeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.node, self.path)
    }
}

impl FromStr for NodeUrl {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

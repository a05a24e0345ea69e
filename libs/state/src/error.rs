//! Errors from path parsing and store access.

use corral_id::IdError;
use thiserror::Error;

/// Errors parsing paths and node URLs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path contains an empty segment (`a//b`).
    #[error("empty segment in path: {0}")]
    EmptySegment(String),

    /// A node URL has no path after the node component.
    #[error("node URL has no path: {0}")]
    MissingPath(String),

    /// The node component of a URL is not a valid node id.
    #[error("invalid node id in URL {url}: {source}")]
    InvalidNode {
        url: String,
        #[source]
        source: IdError,
    },

    /// The path is not under `/Services/<id>`.
    #[error("not a service path: {0}")]
    NotAServicePath(String),

    /// The service segment is not a valid service id.
    #[error("invalid service id in path {path}: {source}")]
    InvalidService {
        path: String,
        #[source]
        source: IdError,
    },
}

/// Errors from state store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No value is stored at the path.
    #[error("no value at {0}")]
    NotFound(String),

    /// The path cannot hold a value.
    #[error("invalid path for a value: {0}")]
    InvalidPath(String),

    /// The backing store is unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

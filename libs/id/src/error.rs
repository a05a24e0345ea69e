use thiserror::Error;

/// Why a string was rejected as an identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,

    #[error("node id has no '_' between prefix and ULID")]
    MissingSeparator,

    #[error("expected '{expected}_' prefix, found '{found}_'")]
    WrongPrefix {
        expected: &'static str,
        found: String,
    },

    #[error("malformed ULID in '{id}': {reason}")]
    InvalidUlid { id: String, reason: String },

    /// Service ids become path segments, so `/` and whitespace are out.
    #[error("invalid character {ch:?} in service id '{id}'")]
    InvalidCharacter { id: String, ch: char },
}

//! Error types for the link resolution engine.
//!
//! One crate-wide error enum with a `Result` alias. Configuration problems
//! are fatal and surfaced as early as possible, transport faults propagate
//! unchanged, and "not found" is never an error anywhere in this crate.

use thiserror::Error;

/// Result type alias for ODM operations.
pub type OdmResult<T> = Result<T, OdmError>;

/// Error types for link resolution operations.
#[derive(Debug, Error)]
pub enum OdmError {
    /// Fatal configuration error: missing back-reference metadata, a
    /// mixed-type batch handed to `fetch_list`, or a nesting-ceiling breach.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A relation targets an entity type that was never registered.
    #[error("relation target '{0}' is not registered")]
    NameNotFound(String),

    /// Persistence-layer failure, propagated unchanged with no retry.
    #[error("transport error: {0}")]
    Transport(String),

    /// Document (de)serialization failure while materializing entities.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OdmError {
    /// Returns true for errors that indicate a broken schema or call-site
    /// configuration rather than a runtime fault.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::NameNotFound(_))
    }
}

//! Error types for omc-core operations.
//!
//! Nothing here ever reaches the end user. The hook binary logs these and
//! degrades to a passthrough decision.

use std::path::PathBuf;

/// All errors that can occur in omc-core operations.
#[derive(Debug, thiserror::Error)]
pub enum OmcError {
    // ─────────────────────────────────────────────────────────────────────
    // Scope Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    #[error("No project directory could be resolved")]
    NoProjectDirectory,

    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    #[error("Mode {0} keeps no state and cannot be activated directly")]
    NotPersistent(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("State file has no parent directory: {0}")]
    NoParentDirectory(PathBuf),
}

impl OmcError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        OmcError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        OmcError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using OmcError.
pub type Result<T> = std::result::Result<T, OmcError>;

impl From<OmcError> for String {
    fn from(err: OmcError) -> String {
        err.to_string()
    }
}

//! Error types and result definitions for valve operations.

use thiserror::Error;

/// Errors raised while loading, editing or saving valve settings.
#[derive(Error, Debug)]
pub enum ValveError {
    /// The form has no field with this key.
    #[error("unknown valve field: {0}")]
    UnknownField(String),

    /// Array/object text failed to parse at save time.
    #[error("invalid JSON in field `{key}`: {source}")]
    InvalidJson {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Numeric text could not be converted to a number at save time.
    #[error("invalid number in field `{key}`: {input:?}")]
    InvalidNumber { key: String, input: String },

    /// An input of the wrong shape was given for a field's control.
    #[error("field `{key}` expects {expected} input")]
    InputMismatch { key: String, expected: &'static str },

    /// Save was requested with no pipeline selected.
    #[error("no pipeline selected")]
    NoSelection,

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Client settings that cannot be used (e.g. a malformed token).
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// Transport-level failure talking to the backend.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned a body that could not be decoded.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The terminal editor could not be run.
    #[error("terminal UI error: {0}")]
    Ui(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ValveError>;

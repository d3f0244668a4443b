//! Error types for the fallible edges of the core.
//!
//! The decision algorithms themselves never fail. Errors only exist where the
//! core touches the filesystem on the host's behalf (saving state) or where a
//! host hands in configuration that would make the algorithms meaningless.

use thiserror::Error;

/// Errors that can occur while writing a session snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The snapshot could not be written to disk.
    #[error("failed to write session state to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded as JSON.
    #[error("failed to encode session state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors produced when validating adaptive parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A parameter is outside its allowed range.
    #[error("invalid parameter `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending parameter.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::Invalid { field, .. } => field,
        }
    }
}

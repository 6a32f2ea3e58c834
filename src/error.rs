//! Centralized error types for mimefilter.
//!
//! The filters themselves never fail. Errors only come from the surfaces
//! around them: filter specs, configuration, object state files and I/O.

use std::path::PathBuf;
use thiserror::Error;

use crate::arg::Tag;

/// All errors produced by the mimefilter library.
#[derive(Error, Debug)]
pub enum FilterError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A textual filter description could not be understood.
    #[error("Invalid filter spec: {0}")]
    InvalidFilterSpec(String),

    /// The configuration could not be saved or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An object state file is truncated, has a bad magic or an unknown version.
    #[error("Invalid object state: {reason}")]
    InvalidState { reason: String },

    /// The argument type cannot be written to an object state file.
    #[error("Argument {0} cannot be stored in object state")]
    UnsupportedStateArg(Tag),
}

/// Convenience alias for `Result<T, FilterError>`.
pub type Result<T> = std::result::Result<T, FilterError>;

impl FilterError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `InvalidState` variant.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (streams and in-memory state buffers).
impl From<std::io::Error> for FilterError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<stream>"),
            source,
        }
    }
}

//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by the native host for one RPC call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host received the call and refused or failed it.
    #[error("Host rejected call: {0}")]
    Rejected(String),

    /// The host could not be reached.
    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum Error {
    /// A timer or task was requested outside of a tokio runtime.
    #[error("No tokio runtime available")]
    NoRuntime,

    #[error("Invalid settings payload: {0}")]
    Decode(String),

    /// The settings blob decoded, but its root is not a mapping.
    #[error("Settings payload is not a mapping")]
    NotAMapping,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Failed to access {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

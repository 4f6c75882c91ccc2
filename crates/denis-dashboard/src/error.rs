//! Error types for the dashboard core.

use denis_topology::TopologyError;
use thiserror::Error;

/// Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the dashboard core.
#[derive(Debug, Error)]
pub enum Error {
    /// Inbound snapshot could not be decoded or failed validation
    #[error("invalid snapshot: {0}")]
    Validation(String),

    /// Referenced node does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure while accepting or reading
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Invalid startup or runtime configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A background analysis task panicked or was cancelled
    #[error("task failed: {0}")]
    Task(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Validation(e.to_string())
    }
}

impl From<TopologyError> for Error {
    fn from(e: TopologyError) -> Self {
        match e {
            TopologyError::NodeNotFound(id) => Error::NotFound(format!("node {}", id)),
            other => Error::Validation(other.to_string()),
        }
    }
}

//! Error types for the topology model.

use thiserror::Error;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors raised while installing or editing a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// A node in the snapshot has no identifier.
    #[error("node at position {index} has no identifier")]
    MissingNodeId { index: usize },

    /// A slice number outside the supported range.
    #[error("invalid slice {slice} for node {node}: expected 1..=16")]
    InvalidSlice { node: String, slice: i64 },

    /// The referenced node is not in the current topology.
    #[error("node not found: {0}")]
    NodeNotFound(String),
}

impl TopologyError {
    /// Whether this error came from validating inbound snapshot data.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingNodeId { .. } | Self::InvalidSlice { .. })
    }
}

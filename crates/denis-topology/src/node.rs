//! Nodes and edges as they appear in a topology snapshot.

use crate::{is_valid_slice, TopologyError, DEFAULT_CLASS, DEFAULT_SLICE};

/// A node of the installed topology.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    /// Unique identifier within the topology
    pub id: String,
    /// Human-readable description
    pub desc: String,
    /// Network slice (1..=16)
    pub slice: u8,
    /// Free-form class tag (e.g. "Node", "Border")
    pub class: String,
}

impl Node {
    /// Create a node with default description, slice and class.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            desc: id.clone(),
            id,
            slice: DEFAULT_SLICE,
            class: DEFAULT_CLASS.to_string(),
        }
    }

    /// Set the slice.
    pub fn with_slice(mut self, slice: u8) -> Self {
        self.slice = slice;
        self
    }
}

/// A node as reported by the controller, before defaults are applied.
///
/// Every field is optional on the wire. Only the identifier is required for
/// installation since it is the join key for edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSpec {
    pub id: Option<String>,
    pub desc: Option<String>,
    pub slice: Option<i64>,
    pub class: Option<String>,
}

impl NodeSpec {
    /// Spec with only an identifier.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Apply the defaulting rules and validate.
    ///
    /// `index` is the position in the snapshot, used for error reporting
    /// when the identifier is missing.
    pub fn resolve(self, index: usize) -> Result<Node, TopologyError> {
        let id = self.id.ok_or(TopologyError::MissingNodeId { index })?;

        let slice = match self.slice {
            None => DEFAULT_SLICE,
            Some(slice) if is_valid_slice(slice) => slice as u8,
            Some(slice) => return Err(TopologyError::InvalidSlice { node: id, slice }),
        };

        Ok(Node {
            desc: self.desc.unwrap_or_else(|| id.clone()),
            id,
            slice,
            class: self.class.unwrap_or_else(|| DEFAULT_CLASS.to_string()),
        })
    }
}

/// An undirected link between two node identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
}

impl EdgeSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

//! Immutable arena-style topology graph.
//!
//! Nodes live in a `Vec` in insertion order and are addressed by index.
//! Adjacency is stored as index lists, so traversals never hash strings
//! after the initial lookup.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{is_valid_slice, EdgeSpec, Node, NodeSpec, TopologyError};

/// A complete, frozen topology.
///
/// Built by [`TopologyBuilder`] and never mutated after publication. Slice
/// edits produce a new `Topology` (see [`Topology::with_slice`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    version: u64,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
}

impl Topology {
    /// The empty topology at version 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Logical version assigned by the store on publication.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by identifier.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Arena index of a node.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Neighbour indices of the node at `index`.
    ///
    /// A self-loop lists the node itself twice.
    pub fn neighbor_indices(&self, index: usize) -> &[usize] {
        &self.adjacency[index]
    }

    /// Neighbours of a node, or `None` if the node does not exist.
    pub fn neighbors(&self, id: &str) -> Option<impl Iterator<Item = &Node> + '_> {
        let index = self.index_of(id)?;
        Some(self.adjacency[index].iter().map(move |&n| &self.nodes[n]))
    }

    /// Degree of a node. A self-loop counts twice.
    pub fn degree(&self, id: &str) -> Option<usize> {
        self.index_of(id).map(|i| self.adjacency[i].len())
    }

    /// Degree of the node at an arena index.
    pub fn degree_at(&self, index: usize) -> usize {
        self.adjacency[index].len()
    }

    /// Edges as identifier pairs, in the order they were first accepted.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.edges
            .iter()
            .map(|&(a, b)| (self.nodes[a].id.as_str(), self.nodes[b].id.as_str()))
    }

    /// Copy of this topology with one node moved to another slice.
    ///
    /// The copy carries `version`; `self` is untouched.
    pub fn with_slice(&self, id: &str, slice: u8, version: u64) -> Result<Self, TopologyError> {
        if !is_valid_slice(slice as i64) {
            return Err(TopologyError::InvalidSlice {
                node: id.to_string(),
                slice: slice as i64,
            });
        }
        let index = self
            .index_of(id)
            .ok_or_else(|| TopologyError::NodeNotFound(id.to_string()))?;

        let mut next = self.clone();
        next.nodes[index].slice = slice;
        next.version = version;
        Ok(next)
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Builds a [`Topology`] off to the side before it is published.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
    seen_edges: HashSet<(usize, usize)>,
    dropped_edges: usize,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw controller specs.
    ///
    /// Any node that fails validation rejects the whole snapshot. Edges with
    /// unknown endpoints are dropped one by one.
    pub fn from_specs(nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> Result<Self, TopologyError> {
        let mut builder = Self::new();
        for (i, spec) in nodes.into_iter().enumerate() {
            builder.add_node(spec.resolve(i)?);
        }
        for edge in &edges {
            builder.add_edge(&edge.source, &edge.target);
        }
        Ok(builder)
    }

    /// Add a node. A repeated identifier replaces the earlier node's
    /// attributes but keeps its position.
    pub fn add_node(&mut self, node: Node) -> &mut Self {
        match self.index.get(&node.id) {
            Some(&i) => self.nodes[i] = node,
            None => {
                self.index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
                self.adjacency.push(Vec::new());
            }
        }
        self
    }

    /// Add an undirected edge. Returns `false` if it was not added.
    ///
    /// Edges with an unknown endpoint count as dropped. Repeats are ignored
    /// without counting as dropped. A self-loop is kept and adds 2 to the
    /// node's degree.
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(source), self.index.get(target)) else {
            debug!(source, target, "dropping edge with unknown endpoint");
            self.dropped_edges += 1;
            return false;
        };

        let key = (a.min(b), a.max(b));
        if !self.seen_edges.insert(key) {
            return false;
        }

        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        self.edges.push((a, b));
        true
    }

    /// Number of edges dropped for unknown endpoints so far.
    pub fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }

    /// Freeze into a topology at version 0. The store assigns the real
    /// version on publication.
    pub fn build(self) -> Topology {
        Topology {
            version: 0,
            nodes: self.nodes,
            index: self.index,
            adjacency: self.adjacency,
            edges: self.edges,
        }
    }
}

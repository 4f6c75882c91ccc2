//! Shared topology store with atomic snapshot publication.
//!
//! Readers take a cheap `Arc` clone of the current [`Topology`] and traverse
//! it with no lock held. Writers build the replacement off to the side and
//! only take the write lock for the pointer swap.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::info;

use crate::{EdgeSpec, NodeSpec, Result, Topology, TopologyBuilder};

/// Outcome of a successful snapshot installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Version assigned to the installed topology
    pub version: u64,
    /// Nodes installed
    pub nodes: usize,
    /// Distinct edges installed
    pub edges: usize,
    /// Edges dropped for referencing unknown nodes
    pub dropped_edges: usize,
    /// The topology this install published
    pub topology: Arc<Topology>,
}

/// Owner of the live topology.
///
/// Handed to every component as `Arc<TopologyStore>`.
#[derive(Debug)]
pub struct TopologyStore {
    current: RwLock<Arc<Topology>>,
    /// Serialises writers and holds the last published version.
    writer: Mutex<u64>,
}

impl Default for TopologyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStore {
    /// Create a store holding the empty topology (version 0).
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Topology::empty())),
            writer: Mutex::new(0),
        }
    }

    /// Frozen view of the current topology.
    pub fn snapshot(&self) -> Arc<Topology> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Version of the current topology.
    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Validate and install a full snapshot, replacing all prior state.
    ///
    /// On error the installed topology is unchanged.
    pub fn install_snapshot(&self, nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> Result<InstallReport> {
        let builder = TopologyBuilder::from_specs(nodes, edges)?;
        Ok(self.install(builder))
    }

    /// Publish a topology assembled by the caller.
    pub fn install(&self, builder: TopologyBuilder) -> InstallReport {
        let dropped_edges = builder.dropped_edges();
        let mut topology = builder.build();

        let mut last = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let version = *last + 1;
        topology.set_version(version);

        let topology = Arc::new(topology);
        let report = InstallReport {
            version,
            nodes: topology.len(),
            edges: topology.edge_count(),
            dropped_edges,
            topology: Arc::clone(&topology),
        };
        self.publish(topology);
        *last = version;

        info!(
            version,
            nodes = report.nodes,
            edges = report.edges,
            dropped = report.dropped_edges,
            "installed topology snapshot"
        );
        report
    }

    /// Move a node to another slice.
    ///
    /// Fails with `NodeNotFound` if the node is not installed, leaving the
    /// topology untouched.
    pub fn set_slice(&self, id: &str, slice: u8) -> Result<u64> {
        let mut last = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let version = *last + 1;
        let next = self.snapshot().with_slice(id, slice, version)?;
        self.publish(Arc::new(next));
        *last = version;

        info!(node = id, slice, version, "slice reassigned");
        Ok(version)
    }

    /// Install the empty topology.
    pub fn clear(&self) -> u64 {
        self.install(TopologyBuilder::new()).version
    }

    fn publish(&self, topology: Arc<Topology>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = topology;
    }
}

//! Events published to the presentation layer.

use denis_analysis::{DensityEntry, DensityThresholds, Tier};
use denis_topology::{EdgeSpec, Node, Topology};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the event bus before slow subscribers start lagging.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Serializable view of an installed topology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyView {
    pub version: u64,
    pub nodes: Vec<Node>,
    pub links: Vec<EdgeSpec>,
}

impl From<&Topology> for TopologyView {
    fn from(topology: &Topology) -> Self {
        Self {
            version: topology.version(),
            nodes: topology.nodes().to_vec(),
            links: topology
                .edges()
                .map(|(source, target)| EdgeSpec::new(source, target))
                .collect(),
        }
    }
}

/// Result of one monitor tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Topology version the analytics were computed over
    pub version: u64,
    /// Monitor tick counter, starting at 1
    pub tick: u64,
    pub border: String,
    /// Whether the border node exists in the analysed topology
    pub border_present: bool,
    /// Nodes with no path to the border, in topology order
    pub disconnected: Vec<String>,
    /// Density ranking, densest first, with disconnected nodes overridden
    pub ranking: Vec<DensityEntry>,
    pub thresholds: Option<DensityThresholds>,
}

impl AnalyticsReport {
    /// Whether every node can reach the border.
    pub fn is_healthy(&self) -> bool {
        self.disconnected.is_empty()
    }

    /// Tier of a node in this report.
    pub fn tier_of(&self, node: &str) -> Option<Tier> {
        self.ranking.iter().find(|e| e.node == node).map(|e| e.tier)
    }
}

/// Notifications streamed to dashboard clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// A new snapshot was installed
    TopologyChanged(TopologyView),

    /// A monitor tick finished
    AnalyticsReady(AnalyticsReport),

    /// A node was moved to another slice
    SliceChanged { node: String, slice: u8, version: u64 },
}

impl DashboardEvent {
    /// Topology version this event refers to.
    pub fn version(&self) -> u64 {
        match self {
            DashboardEvent::TopologyChanged(view) => view.version,
            DashboardEvent::AnalyticsReady(report) => report.version,
            DashboardEvent::SliceChanged { version, .. } => *version,
        }
    }
}

/// Fan-out channel for [`DashboardEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: DashboardEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

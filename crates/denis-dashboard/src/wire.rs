//! JSON snapshot format pushed by the DENIS-SDN controller.
//!
//! ```json
//! {
//!   "nodes": [{"id": "00.00", "desc": "Border", "slice": 1, "class": "Border"}],
//!   "links": [{"source": "00.00", "target": "00.01"}]
//! }
//! ```
//!
//! Unknown top-level fields (such as `sliceType` or the `directed`/`graph`
//! keys of node-link documents) are ignored.

use denis_topology::{EdgeSpec, NodeSpec};
use serde::Deserialize;

use crate::error::Result;

/// A decoded controller message.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSnapshot {
    pub nodes: Vec<WireNode>,
    #[serde(default)]
    pub links: Vec<WireLink>,
}

/// Node identifiers arrive as strings or bare numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireNode {
    pub id: Option<WireId>,
    pub desc: Option<String>,
    pub slice: Option<i64>,
    pub class: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLink {
    pub source: WireId,
    pub target: WireId,
}

impl WireSnapshot {
    /// Split into the specs the topology store installs.
    pub fn into_specs(self) -> (Vec<NodeSpec>, Vec<EdgeSpec>) {
        let nodes = self
            .nodes
            .into_iter()
            .map(|n| NodeSpec {
                id: n.id.map(String::from),
                desc: n.desc,
                slice: n.slice,
                class: n.class,
            })
            .collect();
        let edges = self
            .links
            .into_iter()
            .map(|l| EdgeSpec::new(l.source, l.target))
            .collect();
        (nodes, edges)
    }
}

/// Decode one snapshot from raw bytes.
pub fn decode(bytes: &[u8]) -> Result<(Vec<NodeSpec>, Vec<EdgeSpec>)> {
    let snapshot: WireSnapshot = serde_json::from_slice(bytes)?;
    Ok(snapshot.into_specs())
}

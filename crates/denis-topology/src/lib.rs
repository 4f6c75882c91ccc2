//! DENIS-SDN Topology Model
//!
//! Live model of a dynamically-sliced network topology as reported by the
//! DENIS-SDN controller.
//!
//! # Snapshots
//!
//! The controller never sends deltas. Every message is a complete topology
//! that replaces whatever was installed before. A snapshot is built off to
//! the side into an immutable [`Topology`] and then published with a single
//! pointer swap, so readers see either the old graph or the new one, never a
//! mix of the two.
//!
//! # Slices
//!
//! Every node belongs to one of [`MAX_SLICE`] network slices. Slice
//! assignments arrive with the snapshot and may be changed live by the
//! dashboard through [`TopologyStore::set_slice`].

mod error;
mod graph;
mod node;
mod store;

pub use error::{Result, TopologyError};
pub use graph::{Topology, TopologyBuilder};
pub use node::{EdgeSpec, Node, NodeSpec};
pub use store::{InstallReport, TopologyStore};

/// Lowest valid slice number.
pub const MIN_SLICE: u8 = 1;

/// Highest valid slice number.
pub const MAX_SLICE: u8 = 16;

/// Slice assigned to nodes that arrive without one.
pub const DEFAULT_SLICE: u8 = MIN_SLICE;

/// Class tag assigned to nodes that arrive without one.
pub const DEFAULT_CLASS: &str = "Node";

/// Check that a slice number is within `MIN_SLICE..=MAX_SLICE`.
pub const fn is_valid_slice(slice: i64) -> bool {
    slice >= MIN_SLICE as i64 && slice <= MAX_SLICE as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_bounds() {
        assert!(!is_valid_slice(0));
        assert!(is_valid_slice(1));
        assert!(is_valid_slice(16));
        assert!(!is_valid_slice(17));
        assert!(!is_valid_slice(-3));
    }

    #[test]
    fn default_slice_is_valid() {
        assert!(is_valid_slice(DEFAULT_SLICE as i64));
    }
}

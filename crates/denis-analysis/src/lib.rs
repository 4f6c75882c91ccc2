//! Topology Analytics
//!
//! Two checks run periodically over a frozen [`Topology`]:
//!
//! - **CODET** (connectivity detector): every node must keep at least one
//!   path to the border router. [`detect`] returns the nodes that do not.
//! - **Density classifier**: nodes are ranked by degree and split into four
//!   tiers by quartile. See [`classify`].
//!
//! # Tier Assignment
//!
//! Quartile thresholds are read off the degree-sorted ranking, but nodes are
//! assigned to tiers by comparing their *degree* against those thresholds,
//! not by their rank. Nodes with equal degree always share a tier, so a tier
//! may hold more or less than a quarter of the nodes.
//!
//! [`Topology`]: denis_topology::Topology

mod connectivity;
mod density;

pub use connectivity::{detect, is_connected};
pub use density::{classify, classify_degrees, mark_disconnected, DensityEntry, DensityThresholds, Tier};

#[cfg(test)]
mod tests {
    use super::*;
    use denis_topology::{Node, Topology, TopologyBuilder};

    fn build(ids: &[&str], edges: &[(&str, &str)]) -> Topology {
        let mut b = TopologyBuilder::new();
        for id in ids {
            b.add_node(Node::new(*id));
        }
        for (s, t) in edges {
            b.add_edge(s, t);
        }
        b.build()
    }

    #[test]
    fn single_dangling_node() {
        let g = build(&["X", "Y", "Z"], &[("X", "Y")]);
        assert_eq!(detect(&g, "X"), vec!["Z".to_string()]);
    }

    #[test]
    fn two_isolated_nodes() {
        let g = build(&["X", "Y"], &[]);
        assert_eq!(detect(&g, "X"), vec!["Y".to_string()]);

        let ranking = classify(&g);
        assert_eq!(ranking.len(), 2);
        assert!(ranking.iter().all(|e| e.degree == 0 && e.tier == Tier::Green));
    }

    #[test]
    fn self_loop_counts_towards_density() {
        let g = build(&["A", "B", "C", "D"], &[("A", "A")]);
        let ranking = classify(&g);
        assert_eq!(ranking[0].node, "A");
        assert_eq!(ranking[0].degree, 2);
        assert_eq!(ranking[0].tier, Tier::Red);
        assert!(ranking[1..].iter().all(|e| e.tier == Tier::Green));

        // A loop is not a path to anywhere
        assert_eq!(detect(&g, "B"), vec!["A", "C", "D"]);
    }
}

//! Node density classifier.
//!
//! Ranks nodes by degree and splits them into four tiers using the degrees
//! found at the 25%, 50% and 75% positions of the ranking.

use denis_topology::Topology;

/// Density tier of a node, ordered from sparsest to densest.
///
/// `Disconnected` is not a density tier; it overrides the tier of nodes
/// that CODET found unreachable so they stand out from sparse ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Tier {
    Green,
    Yellow,
    Orange,
    Red,
    Disconnected,
}

impl Tier {
    /// Display colour used by the dashboard.
    pub fn color(&self) -> &'static str {
        match self {
            Tier::Green => "green",
            Tier::Yellow => "yellow",
            Tier::Orange => "orange",
            Tier::Red => "red",
            Tier::Disconnected => "gray",
        }
    }
}

/// One row of the density ranking.
///
/// Serialized with the tier's display colour alongside the tier itself.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "EntryRepr", from = "EntryRepr"))]
pub struct DensityEntry {
    pub node: String,
    pub degree: usize,
    pub tier: Tier,
}

impl DensityEntry {
    /// Display colour of this entry's tier.
    pub fn color(&self) -> &'static str {
        self.tier.color()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct EntryRepr {
    node: String,
    degree: usize,
    tier: Tier,
    // Derived from `tier`; ignored on input
    #[serde(default)]
    color: String,
}

#[cfg(feature = "serde")]
impl From<DensityEntry> for EntryRepr {
    fn from(entry: DensityEntry) -> Self {
        Self {
            color: entry.color().to_string(),
            node: entry.node,
            degree: entry.degree,
            tier: entry.tier,
        }
    }
}

#[cfg(feature = "serde")]
impl From<EntryRepr> for DensityEntry {
    fn from(repr: EntryRepr) -> Self {
        Self {
            node: repr.node,
            degree: repr.degree,
            tier: repr.tier,
        }
    }
}

/// Degree cut-offs read from the sorted ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DensityThresholds {
    /// Degree at rank ⌊n/4⌋; anything above is red
    pub red: usize,
    /// Degree at rank ⌊n/2⌋; anything above (up to `red`) is orange
    pub orange: usize,
    /// Degree at rank ⌊3n/4⌋; anything above (up to `orange`) is yellow
    pub yellow: usize,
}

impl DensityThresholds {
    /// Read thresholds from degrees sorted in descending order.
    ///
    /// Indices are clamped to the last element, so any non-empty ranking
    /// yields thresholds. Returns `None` for an empty ranking.
    pub fn from_sorted(degrees: &[usize]) -> Option<Self> {
        let n = degrees.len();
        let last = n.checked_sub(1)?;
        let at = |index: usize| degrees[index.min(last)];
        Some(Self {
            red: at(n / 4),
            orange: at(n / 2),
            yellow: at(3 * n / 4),
        })
    }

    /// Tier for a degree value.
    pub fn tier_for(&self, degree: usize) -> Tier {
        if degree <= self.yellow {
            Tier::Green
        } else if degree <= self.orange {
            Tier::Yellow
        } else if degree <= self.red {
            Tier::Orange
        } else {
            Tier::Red
        }
    }
}

/// Classify every node of `graph`, densest first.
///
/// Nodes with equal degree keep their topology order.
pub fn classify(graph: &Topology) -> Vec<DensityEntry> {
    classify_degrees(
        graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), graph.degree_at(i))),
    )
}

/// Classify `(node, degree)` pairs given in insertion order.
pub fn classify_degrees(degrees: impl IntoIterator<Item = (String, usize)>) -> Vec<DensityEntry> {
    let mut ranked: Vec<(String, usize)> = degrees.into_iter().collect();
    // Stable: ties stay in insertion order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let sorted: Vec<usize> = ranked.iter().map(|(_, d)| *d).collect();
    let Some(thresholds) = DensityThresholds::from_sorted(&sorted) else {
        return Vec::new();
    };

    ranked
        .into_iter()
        .map(|(node, degree)| DensityEntry {
            node,
            degree,
            tier: thresholds.tier_for(degree),
        })
        .collect()
}

/// Override the tier of every disconnected node.
pub fn mark_disconnected(ranking: &mut [DensityEntry], disconnected: &[String]) {
    for entry in ranking.iter_mut() {
        if disconnected.contains(&entry.node) {
            entry.tier = Tier::Disconnected;
        }
    }
}

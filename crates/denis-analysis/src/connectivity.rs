//! CODET: connectivity detection against the border router.
//!
//! Each non-border node runs its own breadth-first search towards the
//! border, O(V·(V+E)) per run.

use std::collections::VecDeque;

use denis_topology::Topology;

/// Nodes with no path to `border`, in topology order.
///
/// If the border node is not in the graph, every other node is reported.
pub fn detect(graph: &Topology, border: &str) -> Vec<String> {
    let target = graph.index_of(border);
    let mut visited = vec![false; graph.len()];
    let mut frontier = VecDeque::new();

    graph
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, node)| node.id != border)
        .filter(|&(source, _)| match target {
            Some(target) => !bfs(graph, source, target, &mut visited, &mut frontier),
            None => true,
        })
        .map(|(_, node)| node.id.clone())
        .collect()
}

/// Whether `from` has a path to `border`.
///
/// A node is trivially connected to itself. Unknown nodes are never
/// connected.
pub fn is_connected(graph: &Topology, from: &str, border: &str) -> bool {
    let (Some(source), Some(target)) = (graph.index_of(from), graph.index_of(border)) else {
        return false;
    };
    let mut visited = vec![false; graph.len()];
    bfs(graph, source, target, &mut visited, &mut VecDeque::new())
}

/// Breadth-first search from `source`, stopping once `target` is dequeued.
///
/// `visited` and `frontier` are scratch buffers reused across sources.
fn bfs(
    graph: &Topology,
    source: usize,
    target: usize,
    visited: &mut [bool],
    frontier: &mut VecDeque<usize>,
) -> bool {
    visited.fill(false);
    frontier.clear();

    visited[source] = true;
    frontier.push_back(source);

    while let Some(current) = frontier.pop_front() {
        if current == target {
            return true;
        }
        for &next in graph.neighbor_indices(current) {
            if !visited[next] {
                visited[next] = true;
                frontier.push_back(next);
            }
        }
    }
    false
}

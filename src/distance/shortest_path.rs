use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::OptimizerError;

/// node -> neighbor -> non-negative weight. A missing pair means "no direct
/// edge".
pub type Graph = HashMap<usize, HashMap<usize, f64>>;

/// Ordered node list forming the minimum-distance path, and its weight.
/// `distance` is `f64::INFINITY` and `path` empty when `dst` is unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub path: Vec<usize>,
    pub distance: f64,
}

/// Computes the minimum-distance path from `src` to `dst`.
///
/// Fails with [`OptimizerError::InvalidGraph`] if any edge has a negative
/// weight.
pub fn shortest_path(graph: &Graph, src: usize, dst: usize) -> Result<PathResult, OptimizerError> {
    for neighbors in graph.values() {
        for &weight in neighbors.values() {
            if weight < 0.0 {
                return Err(OptimizerError::InvalidGraph(
                    "negative edge weight".to_string(),
                ));
            }
        }
    }

    if src == dst {
        return Ok(PathResult {
            path: vec![src],
            distance: 0.0,
        });
    }

    let mut dist: HashMap<usize, f64> = HashMap::new();
    let mut prev: HashMap<usize, usize> = HashMap::new();
    let mut heap: BinaryHeap<Reverse<(OrderedCost, usize)>> = BinaryHeap::new();

    dist.insert(src, 0.0);
    heap.push(Reverse((OrderedCost(0.0), src)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        let cost = cost.0;
        if node == dst {
            return Ok(reconstruct(&prev, dst, cost));
        }
        if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }
        if let Some(neighbors) = graph.get(&node) {
            for (&neighbor, &weight) in neighbors {
                let new_cost = cost + weight;
                if new_cost < *dist.get(&neighbor).unwrap_or(&f64::INFINITY) {
                    dist.insert(neighbor, new_cost);
                    prev.insert(neighbor, node);
                    heap.push(Reverse((OrderedCost(new_cost), neighbor)));
                }
            }
        }
    }

    Ok(PathResult {
        path: Vec::new(),
        distance: f64::INFINITY,
    })
}

/// Computes shortest paths for every ordered pair drawn from `nodes`.
pub fn all_pairs(
    graph: &Graph,
    nodes: &[usize],
) -> Result<HashMap<(usize, usize), PathResult>, OptimizerError> {
    let mut results = HashMap::new();
    for &a in nodes {
        for &b in nodes {
            if a == b {
                continue;
            }
            results.insert((a, b), shortest_path(graph, a, b)?);
        }
    }
    Ok(results)
}

fn reconstruct(prev: &HashMap<usize, usize>, dst: usize, distance: f64) -> PathResult {
    let mut path = vec![dst];
    let mut cur = dst;
    while let Some(&p) = prev.get(&cur) {
        path.push(p);
        cur = p;
    }
    path.reverse();
    PathResult { path, distance }
}

/// `f64` wrapper with a total order, used only as the heap's cost key.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedCost(f64);

impl Eq for OrderedCost {}

impl PartialOrd for OrderedCost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedCost {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

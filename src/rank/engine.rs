//! Fixed-iteration PageRank with dangling-mass redistribution.
//!
//! Each iteration reads the previous vector and writes a fresh one; nodes are
//! visited in index order so published fixtures reproduce bit-for-bit. Mass
//! from dangling nodes (no outgoing links) is pooled and redistributed
//! uniformly together with the teleportation term, keeping the vector a
//! proper probability distribution at every step.

/// Damping factor: probability of following a link vs. teleporting.
pub const ALPHA: f64 = 0.85;

/// Truncate to three decimal places. Matches the precision the published
/// test vectors are expressed in, and the drift diagnostic below.
pub fn three_decimals(value: f64) -> f64 {
    (value * 1000.0).trunc() / 1000.0
}

/// Compute entity ranks over the adjacency graph for a fixed number of
/// iterations. Every node starts at `1/N`; zero iterations returns the
/// uniform vector. An empty graph yields an empty vector.
pub fn compute_ranks(graph: &[Vec<usize>], iterations: usize) -> Vec<f64> {
    let node_count = graph.len();
    if node_count == 0 {
        return Vec::new();
    }

    let mut ranks = vec![1.0 / node_count as f64; node_count];
    for iteration in 0..iterations {
        ranks = iterate(graph, &ranks);
        tracing::debug!(iteration, "rank iteration finished");
    }
    ranks
}

fn iterate(graph: &[Vec<usize>], old_ranks: &[f64]) -> Vec<f64> {
    let node_count = graph.len();
    let mut ranks = vec![0.0; node_count];
    let mut dangling_mass = 0.0;

    for (i, targets) in graph.iter().enumerate() {
        if targets.is_empty() {
            dangling_mass += old_ranks[i];
        } else {
            let share = old_ranks[i] * ALPHA / targets.len() as f64;
            for &j in targets {
                ranks[j] += share;
            }
        }
    }

    let redistribution = dangling_mass * ALPHA / node_count as f64
        + (1.0 - ALPHA) / node_count as f64;
    for rank in ranks.iter_mut() {
        *rank += redistribution;
    }

    let sum: f64 = ranks.iter().sum();
    if three_decimals(sum) != 1.0 {
        tracing::warn!(sum, "rank sum drift beyond three-decimal tolerance");
    }

    ranks
}

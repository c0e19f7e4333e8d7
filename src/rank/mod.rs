//! Entity importance ranking.
//!
//! Two passes over the pre-sorted triple stream build a dense entity-link
//! graph ([`builder`]), then a fixed-iteration PageRank with dangling-mass
//! redistribution computes a stationary importance score per entity
//! ([`engine`]). The resulting id → rank table feeds the search index's
//! relevance ordering.

pub mod builder;
pub mod engine;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RankError;
use crate::triples;

pub use builder::{build_adjacency, build_node_dictionary};
pub use engine::{compute_ranks, three_decimals, ALPHA};

/// Persisted id → rank table, the artifact consumed by the search index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankTable {
    pub ranks: HashMap<String, f64>,
}

impl RankTable {
    pub fn rank_of(&self, id: &str) -> f64 {
        self.ranks.get(id).copied().unwrap_or(0.0)
    }

    /// Encode to bincode and write to disk.
    pub fn save(&self, path: &Path) -> Result<(), RankError> {
        let encoded = bincode::serialize(self).map_err(|e| RankError::Serialization {
            message: format!("failed to encode rank table: {e}"),
        })?;
        std::fs::write(path, encoded).map_err(|source| RankError::Io { source })
    }

    /// Read and decode a bincode rank table.
    pub fn load(path: &Path) -> Result<Self, RankError> {
        let bytes = std::fs::read(path).map_err(|source| RankError::Io { source })?;
        bincode::deserialize(&bytes).map_err(|e| RankError::Serialization {
            message: format!("failed to decode rank table: {e}"),
        })
    }
}

/// Build the full id → rank table from a triples file.
///
/// Streams the file twice: once for the subject dictionary, once for the
/// adjacency graph. The iteration count is fixed by the caller; there is no
/// convergence threshold, so results are deterministic for a given count.
pub fn build_rank_table(triples_path: &Path, iterations: usize) -> Result<RankTable, RankError> {
    tracing::info!(path = %triples_path.display(), "building node dictionary");
    let dictionary = build_node_dictionary(triples::stream_lines(triples_path)?);

    tracing::info!(nodes = dictionary.len(), "building adjacency graph");
    let graph = build_adjacency(triples::stream_lines(triples_path)?, &dictionary);

    tracing::info!(iterations, "computing ranks");
    let ranks = compute_ranks(&graph, iterations);

    let table = dictionary
        .into_iter()
        .map(|(id, index)| (id, ranks[index]))
        .collect();
    Ok(RankTable { ranks: table })
}

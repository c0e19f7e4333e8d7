//! Session facade: top-level API for the qanat engine.
//!
//! A `Session` owns the shared read-only state of one query session — the
//! search index, the type index, and the optional remote endpoint — and
//! hands resolutions to the resolver. Opened once, then safe to share across
//! threads; nothing mutates after `open` returns.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::endpoint::RemoteEndpoint;
use crate::error::{QanatResult, SessionError};
use crate::index::{MemoryIndex, ResultRow, SearchIndex};
use crate::query::{QueryGraph, Resolver, ResolverConfig};
use crate::rank::RankTable;
use crate::typeindex::TypeIndex;

/// Configuration for opening a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// JSON document export backing the search index.
    pub index_path: PathBuf,
    /// Optional persisted rank table; applied over the stored ranks.
    pub ranks_path: Option<PathBuf>,
    /// Optional persisted type index. Built from the index when absent.
    pub types_path: Option<PathBuf>,
    /// Remote SPARQL endpoint URL. Local-only resolution when absent.
    pub endpoint_url: Option<String>,
    /// Sampling seed; `None` keeps the production non-deterministic path.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            ranks_path: None,
            types_path: None,
            endpoint_url: None,
            seed: None,
        }
    }
}

/// Snapshot of a session's loaded state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub entities: usize,
    pub properties: usize,
    pub has_type_index: bool,
    pub endpoint: Option<String>,
}

/// The answer to one resolution: `{id, label, rank, value}` rows per node
/// and per edge slot.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub nodes: BTreeMap<i32, Vec<ResultRow>>,
    pub edges: BTreeMap<i32, Vec<ResultRow>>,
}

impl From<&QueryGraph> for Resolution {
    fn from(graph: &QueryGraph) -> Self {
        Self {
            nodes: graph
                .nodes
                .iter()
                .map(|(id, n)| (*id, n.results.iter().map(ResultRow::from).collect()))
                .collect(),
            edges: graph
                .edges
                .iter()
                .map(|(id, e)| (*id, e.results.iter().map(ResultRow::from).collect()))
                .collect(),
        }
    }
}

/// One opened query session.
pub struct Session {
    index: Arc<MemoryIndex>,
    types: Arc<TypeIndex>,
    resolver: Resolver,
    endpoint_url: Option<String>,
}

impl Session {
    /// Load all session state from disk and wire up the resolver.
    pub fn open(config: SessionConfig) -> QanatResult<Self> {
        if let Some(url) = &config.endpoint_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SessionError::InvalidConfig {
                    message: format!("endpoint URL must be http(s), got \"{url}\""),
                }
                .into());
            }
        }
        if !config.index_path.exists() {
            return Err(SessionError::DataFile {
                path: config.index_path.display().to_string(),
            }
            .into());
        }

        let mut index = MemoryIndex::load_json(&config.index_path)?;
        if let Some(ranks_path) = &config.ranks_path {
            let table = RankTable::load(ranks_path)?;
            index.apply_ranks(&table);
        }
        let index = Arc::new(index);

        let types = Arc::new(match &config.types_path {
            Some(path) => TypeIndex::load(path)?,
            None => TypeIndex::build(index.as_ref()),
        });

        let endpoint = config.endpoint_url.clone().map(RemoteEndpoint::new);
        tracing::info!(
            entities = index.entity_count(),
            properties = index.property_count(),
            endpoint = config.endpoint_url.as_deref().unwrap_or("none"),
            "session open"
        );

        let resolver = Resolver::new(
            Arc::clone(&index) as Arc<dyn SearchIndex>,
            Arc::clone(&types),
            endpoint,
            ResolverConfig {
                seed: config.seed,
                ..ResolverConfig::default()
            },
        );

        Ok(Self {
            index,
            types,
            resolver,
            endpoint_url: config.endpoint_url,
        })
    }

    /// Resolve a JSON query graph into per-slot result rows.
    pub fn resolve_request(&self, json: &str) -> QanatResult<Resolution> {
        let mut graph = QueryGraph::from_json(json)?;
        self.resolver.resolve(&mut graph);
        Ok(Resolution::from(&graph))
    }

    /// Resolve an already-parsed graph in place.
    pub fn resolve(&self, graph: &mut QueryGraph) {
        self.resolver.resolve(graph);
    }

    /// Ranked label search over the entity index.
    pub fn search(&self, text: &str, top_k: usize) -> QanatResult<Vec<ResultRow>> {
        let entities = self.index.entities_by_label(text, top_k)?;
        Ok(entities.iter().map(ResultRow::from).collect())
    }

    /// The backing search index.
    pub fn index(&self) -> &MemoryIndex {
        &self.index
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            entities: self.index.entity_count(),
            properties: self.index.property_count(),
            has_type_index: !self.types.is_empty(),
            endpoint: self.endpoint_url.clone(),
        }
    }
}

//! In-memory model of a partial query graph.
//!
//! Nodes and edges arrive as JSON from the caller (`{"nodes": [...],
//! "edges": [...]}`), are validated for referential integrity, and live in
//! ordered maps for deterministic iteration. Each node and edge owns exactly
//! one result slot, assigned once by the resolver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::index::{Entity, Property};

use super::QueryType;

/// Property id asserting that a subject belongs to a type.
pub const INSTANCE_OF: &str = "P31";

/// The trailing identifier of an entity or property URI.
/// `http://www.wikidata.org/entity/Q42` → `Q42`; bare ids pass through.
pub fn uri_id(uri: &str) -> &str {
    match uri.rfind('/') {
        Some(pos) => &uri[pos + 1..],
        None => uri,
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestNode {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    /// Concrete entity URIs when the caller already knows this node.
    #[serde(default)]
    pub uris: Vec<String>,
    /// Caller-supplied ground-truth types; never queried when present.
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestEdge {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    /// Concrete property URIs when the caller already knows this edge.
    #[serde(default)]
    pub uris: Vec<String>,
    #[serde(rename = "sourceId")]
    pub source: i32,
    #[serde(rename = "targetId")]
    pub target: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestGraph {
    #[serde(default)]
    pub nodes: Vec<RequestNode>,
    #[serde(default)]
    pub edges: Vec<RequestEdge>,
}

// ---------------------------------------------------------------------------
// Resolved model
// ---------------------------------------------------------------------------

/// A node of the query graph: an entity, concrete or unknown.
#[derive(Debug, Clone, Serialize)]
pub struct QueryNode {
    pub id: i32,
    pub name: String,
    pub uris: Vec<String>,
    /// Concrete types: caller-given, or derived from an instance-of edge.
    pub types: Vec<String>,
    pub is_given_type: bool,
    pub is_instance_of_type: bool,
    /// Heuristic types from domain/range intersection.
    pub inferred_types: Vec<String>,
    pub results: Vec<Entity>,
}

impl QueryNode {
    fn from_request(node: RequestNode) -> Self {
        let is_given_type = !node.types.is_empty();
        Self {
            id: node.id,
            name: node.name,
            uris: node.uris,
            types: node.types,
            is_given_type,
            is_instance_of_type: false,
            inferred_types: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Ids of the concrete entities behind this node's URIs.
    pub fn uri_ids(&self) -> Vec<String> {
        self.uris.iter().map(|u| uri_id(u).to_string()).collect()
    }

    /// Concrete types when available, inferred types otherwise.
    pub fn effective_types(&self) -> &[String] {
        if self.types.is_empty() {
            &self.inferred_types
        } else {
            &self.types
        }
    }
}

/// An edge of the query graph: a property, concrete or unknown.
#[derive(Debug, Clone, Serialize)]
pub struct QueryEdge {
    pub id: i32,
    pub name: String,
    pub uris: Vec<String>,
    pub source: i32,
    pub target: i32,
    /// Types plausible for the subject end.
    pub domain: Vec<String>,
    /// Types plausible for the object end.
    pub range: Vec<String>,
    pub is_instance_of: bool,
    pub is_given_type: bool,
    pub query_type: QueryType,
    pub results: Vec<Property>,
}

impl QueryEdge {
    fn from_request(edge: RequestEdge) -> Self {
        let is_given_type = !edge.uris.is_empty();
        let is_instance_of = edge.uris.iter().any(|u| uri_id(u) == INSTANCE_OF);
        Self {
            id: edge.id,
            name: edge.name,
            uris: edge.uris,
            source: edge.source,
            target: edge.target,
            domain: Vec::new(),
            range: Vec::new(),
            is_instance_of,
            is_given_type,
            query_type: QueryType::Unknown,
            results: Vec::new(),
        }
    }

    /// Ids of the concrete properties behind this edge's URIs.
    pub fn uri_ids(&self) -> Vec<String> {
        self.uris.iter().map(|u| uri_id(u).to_string()).collect()
    }
}

/// One partial query: node and edge maps plus connectivity helpers.
#[derive(Debug, Clone, Serialize)]
pub struct QueryGraph {
    pub nodes: BTreeMap<i32, QueryNode>,
    pub edges: BTreeMap<i32, QueryEdge>,
}

impl QueryGraph {
    /// Validate and adopt a wire-format graph. Every edge endpoint must
    /// reference an existing node id.
    pub fn from_request(request: RequestGraph) -> Result<Self, QueryError> {
        let nodes: BTreeMap<i32, QueryNode> = request
            .nodes
            .into_iter()
            .map(|n| (n.id, QueryNode::from_request(n)))
            .collect();

        let mut edges = BTreeMap::new();
        for edge in request.edges {
            for endpoint in [edge.source, edge.target] {
                if !nodes.contains_key(&endpoint) {
                    return Err(QueryError::DanglingEdge {
                        edge: edge.id,
                        node: endpoint,
                    });
                }
            }
            edges.insert(edge.id, QueryEdge::from_request(edge));
        }

        Ok(Self { nodes, edges })
    }

    /// Parse and validate a JSON query graph.
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        let request: RequestGraph = serde_json::from_str(json).map_err(|e| QueryError::Json {
            message: e.to_string(),
        })?;
        Self::from_request(request)
    }

    pub fn outgoing_edges(&self, node: i32) -> Vec<&QueryEdge> {
        self.edges.values().filter(|e| e.source == node).collect()
    }

    pub fn incoming_edges(&self, node: i32) -> Vec<&QueryEdge> {
        self.edges.values().filter(|e| e.target == node).collect()
    }

    /// A node participating in no edge at all.
    pub fn is_disconnected(&self, node: i32) -> bool {
        !self
            .edges
            .values()
            .any(|e| e.source == node || e.target == node)
    }

    pub fn source_node(&self, edge: &QueryEdge) -> &QueryNode {
        &self.nodes[&edge.source]
    }

    pub fn target_node(&self, edge: &QueryEdge) -> &QueryNode {
        &self.nodes[&edge.target]
    }
}

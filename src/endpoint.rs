//! Remote SPARQL collaborator.
//!
//! Renders node- and edge-centered `SELECT DISTINCT` queries from a query
//! graph and submits them to a remote endpoint over blocking HTTP. The
//! endpoint is strictly best-effort: one attempt, a fixed timeout, and every
//! failure mode collapses to "no remote answer" so the resolver can fall
//! back to the local index. Callers of a resolution never see these errors.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::EndpointError;
use crate::query::graph::{uri_id, QueryEdge, QueryGraph, QueryNode};

/// Fixed per-request timeout. Broad queries that exceed it are treated the
/// same as an unreachable endpoint.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Row cap rendered into every query.
pub const RESULT_LIMIT: usize = 100;

/// One result row: variable name (without `?`) to terminal id.
pub type BindingRow = HashMap<String, String>;

// ---------------------------------------------------------------------------
// SPARQL rendering
// ---------------------------------------------------------------------------

/// SPARQL variable for an unknown node.
pub fn node_variable(id: i32) -> String {
    format!("node{id}")
}

/// SPARQL variable for an unknown edge.
pub fn edge_variable(id: i32) -> String {
    format!("prop{id}")
}

fn node_term(node: &QueryNode) -> String {
    if node.uris.len() == 1 {
        format!("<{}>", node.uris[0])
    } else {
        format!("?{}", node_variable(node.id))
    }
}

fn edge_term(edge: &QueryEdge) -> String {
    if edge.uris.len() == 1 {
        format!("<{}>", edge.uris[0])
    } else {
        format!("?{}", edge_variable(edge.id))
    }
}

/// `VALUES` clauses pinning multi-URI nodes and edges to their candidates.
fn values_clauses(graph: &QueryGraph, out: &mut String) {
    for node in graph.nodes.values() {
        if node.uris.len() > 1 {
            out.push_str(&format!(
                "  VALUES ?{} {{ {} }}\n",
                node_variable(node.id),
                node.uris
                    .iter()
                    .map(|u| format!("<{u}>"))
                    .collect::<Vec<_>>()
                    .join(" ")
            ));
        }
    }
    for edge in graph.edges.values() {
        if edge.uris.len() > 1 {
            out.push_str(&format!(
                "  VALUES ?{} {{ {} }}\n",
                edge_variable(edge.id),
                edge.uris
                    .iter()
                    .map(|u| format!("<{u}>"))
                    .collect::<Vec<_>>()
                    .join(" ")
            ));
        }
    }
}

fn render(graph: &QueryGraph, focus: &str) -> String {
    let mut query = format!("SELECT DISTINCT ?{focus} WHERE {{\n");
    values_clauses(graph, &mut query);
    for edge in graph.edges.values() {
        query.push_str(&format!(
            "  {} {} {} .\n",
            node_term(graph.source_node(edge)),
            edge_term(edge),
            node_term(graph.target_node(edge)),
        ));
    }
    query.push_str(&format!("}}\nLIMIT {RESULT_LIMIT}"));
    query
}

/// Render the whole graph as a query selecting candidates for one node.
pub fn node_query(graph: &QueryGraph, node: &QueryNode) -> String {
    render(graph, &node_variable(node.id))
}

/// Render the whole graph as a query selecting candidates for one edge.
pub fn edge_query(graph: &QueryGraph, edge: &QueryEdge) -> String {
    render(graph, &edge_variable(edge.id))
}

// ---------------------------------------------------------------------------
// Endpoint client
// ---------------------------------------------------------------------------

/// Blocking client for one remote SPARQL endpoint.
pub struct RemoteEndpoint {
    url: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl RemoteEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            url: url.into(),
            agent,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Submit a query and parse the SPARQL JSON results. Single attempt.
    pub fn query_remote(&self, sparql: &str) -> Result<Vec<BindingRow>, EndpointError> {
        let response = self
            .agent
            .get(&self.url)
            .query("query", sparql)
            .set("Accept", "application/sparql-results+json")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => EndpointError::Status { code },
                ureq::Error::Transport(transport) => EndpointError::Transport {
                    message: transport.to_string(),
                },
            })?;

        let body: serde_json::Value =
            response
                .into_json()
                .map_err(|e| EndpointError::Malformed {
                    message: e.to_string(),
                })?;
        parse_bindings(&body)
    }

    /// Best-effort variant: any failure logs a warning and yields `None`.
    pub fn try_query(&self, sparql: &str) -> Option<Vec<BindingRow>> {
        match self.query_remote(sparql) {
            Ok(rows) => {
                tracing::debug!(url = %self.url, rows = rows.len(), "remote answer");
                Some(rows)
            }
            Err(error) => {
                tracing::warn!(url = %self.url, %error, "no remote answer, using local index");
                None
            }
        }
    }
}

/// Extract `results.bindings` rows, reducing each bound value to its
/// trailing URI id.
fn parse_bindings(body: &serde_json::Value) -> Result<Vec<BindingRow>, EndpointError> {
    let bindings = body
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(|b| b.as_array())
        .ok_or_else(|| EndpointError::Malformed {
            message: "missing results.bindings array".into(),
        })?;

    let mut rows = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let object = binding.as_object().ok_or_else(|| EndpointError::Malformed {
            message: "binding row is not an object".into(),
        })?;
        let mut row = BindingRow::new();
        for (variable, term) in object {
            let Some(value) = term.get("value").and_then(|v| v.as_str()) else {
                continue;
            };
            row.insert(variable.clone(), uri_id(value).to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Distinct ids bound to one variable, first-seen order.
pub fn ids_for(rows: &[BindingRow], variable: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for row in rows {
        let Some(id) = row.get(variable) else { continue };
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.clone());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> QueryGraph {
        QueryGraph::from_json(
            r#"{
                "nodes": [
                    {"id": 0},
                    {"id": 1, "uris": ["http://www.wikidata.org/entity/Q5"]}
                ],
                "edges": [
                    {"id": 0, "sourceId": 0, "targetId": 1,
                     "uris": ["http://www.wikidata.org/prop/direct/P31"]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn node_query_selects_the_unknown_node() {
        let graph = sample_graph();
        let sparql = node_query(&graph, &graph.nodes[&0]);
        assert!(sparql.starts_with("SELECT DISTINCT ?node0 WHERE {"));
        assert!(sparql.contains(
            "?node0 <http://www.wikidata.org/prop/direct/P31> \
             <http://www.wikidata.org/entity/Q5> ."
        ));
        assert!(sparql.ends_with("LIMIT 100"));
    }

    #[test]
    fn edge_query_selects_the_unknown_edge() {
        let graph = QueryGraph::from_json(
            r#"{
                "nodes": [
                    {"id": 0, "uris": ["http://www.wikidata.org/entity/Q76"]},
                    {"id": 1}
                ],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]
            }"#,
        )
        .unwrap();
        let sparql = edge_query(&graph, &graph.edges[&0]);
        assert!(sparql.starts_with("SELECT DISTINCT ?prop0 WHERE {"));
        assert!(sparql.contains("<http://www.wikidata.org/entity/Q76> ?prop0 ?node1 ."));
    }

    #[test]
    fn multi_uri_node_becomes_values_clause() {
        let graph = QueryGraph::from_json(
            r#"{
                "nodes": [
                    {"id": 0},
                    {"id": 1, "uris": [
                        "http://www.wikidata.org/entity/Q26",
                        "http://www.wikidata.org/entity/Q27"
                    ]}
                ],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]
            }"#,
        )
        .unwrap();
        let sparql = node_query(&graph, &graph.nodes[&0]);
        assert!(sparql.contains(
            "VALUES ?node1 { <http://www.wikidata.org/entity/Q26> \
             <http://www.wikidata.org/entity/Q27> }"
        ));
        assert!(sparql.contains("?node0 ?prop0 ?node1 ."));
    }

    #[test]
    fn bindings_reduce_uris_to_ids() {
        let body = serde_json::json!({
            "head": {"vars": ["node0"]},
            "results": {"bindings": [
                {"node0": {"type": "uri",
                           "value": "http://www.wikidata.org/entity/Q42"}},
                {"node0": {"type": "uri",
                           "value": "http://www.wikidata.org/entity/Q5"}},
                {"node0": {"type": "uri",
                           "value": "http://www.wikidata.org/entity/Q42"}}
            ]}
        });
        let rows = parse_bindings(&body).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            ids_for(&rows, "node0"),
            vec!["Q42".to_string(), "Q5".to_string()]
        );
        assert!(ids_for(&rows, "prop9").is_empty());
    }

    #[test]
    fn malformed_body_is_rejected() {
        let body = serde_json::json!({"results": "nope"});
        let err = parse_bindings(&body);
        assert!(matches!(err, Err(EndpointError::Malformed { .. })));
    }
}

//! Static classification of query-graph nodes and edges.
//!
//! Runs once before resolution: derives concrete types from instance-of
//! edges, annotates every edge with plausible domain/range type sets, infers
//! heuristic types for untyped nodes, and assigns each edge its resolution
//! strategy from the decision table. Classification reads the graph and the
//! property documents only; it issues no remote queries.

use crate::index::SearchIndex;

use super::graph::{QueryEdge, QueryGraph, QueryNode};
use super::QueryType;

/// How a node is handled by the node-resolution strategy, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCase {
    /// Type supplied by the caller; nothing to resolve.
    GivenType,
    /// No incoming or outgoing edges.
    Disconnected,
    /// Exactly one outgoing edge, an instance-of with a concrete type, and
    /// no incoming edges.
    InstanceOfOnly,
    /// Everything else.
    General,
}

/// Classify a node against the graph's static structure. Pure, no I/O.
pub fn node_case(graph: &QueryGraph, node: &QueryNode) -> NodeCase {
    if node.is_given_type {
        return NodeCase::GivenType;
    }
    if graph.is_disconnected(node.id) {
        return NodeCase::Disconnected;
    }
    let outgoing = graph.outgoing_edges(node.id);
    if graph.incoming_edges(node.id).is_empty()
        && outgoing.len() == 1
        && outgoing[0].is_instance_of
        && node.is_instance_of_type
    {
        return NodeCase::InstanceOfOnly;
    }
    NodeCase::General
}

/// "If-any" intersection: an empty side does not erase accumulated types,
/// only a non-empty side narrows them. Order of the accumulated side wins.
pub fn intersect_if_any(current: Vec<String>, other: &[String]) -> Vec<String> {
    if other.is_empty() {
        return current;
    }
    if current.is_empty() {
        return other.to_vec();
    }
    current
        .into_iter()
        .filter(|t| other.contains(t))
        .collect()
}

/// Annotate and classify the whole graph: known types, edge domain/range,
/// inferred types, then the edge decision table.
pub fn classify(graph: &mut QueryGraph, index: &dyn SearchIndex) {
    set_known_types(graph);
    set_domains_and_ranges(graph, index);
    set_inferred_types(graph);
    assign_query_types(graph);
}

/// Copy concrete types onto nodes that carry an instance-of edge pointing at
/// a concrete type entity.
fn set_known_types(graph: &mut QueryGraph) {
    let mut derived: Vec<(i32, Vec<String>)> = Vec::new();
    for node in graph.nodes.values() {
        if node.is_given_type {
            continue;
        }
        let mut types = Vec::new();
        for edge in graph.outgoing_edges(node.id) {
            if !edge.is_instance_of {
                continue;
            }
            for type_id in graph.target_node(edge).uri_ids() {
                if !types.contains(&type_id) {
                    types.push(type_id);
                }
            }
        }
        if !types.is_empty() {
            derived.push((node.id, types));
        }
    }
    for (id, types) in derived {
        let node = graph.nodes.get_mut(&id).expect("classified node exists");
        node.types = types;
        node.is_instance_of_type = true;
    }
}

/// The domain (range) of an edge: the subject's (object's) concrete types
/// when present, else the given property's own observed domain (range).
fn edge_bounds(
    graph: &QueryGraph,
    edge: &QueryEdge,
    index: &dyn SearchIndex,
) -> (Vec<String>, Vec<String>) {
    let source = graph.source_node(edge);
    let target = graph.target_node(edge);

    let domain = if !source.types.is_empty() {
        source.types.clone()
    } else if edge.is_given_type && !edge.is_instance_of {
        property_field(index, edge, |p| p.domain.clone())
    } else {
        Vec::new()
    };

    let range = if !target.types.is_empty() {
        target.types.clone()
    } else if edge.is_given_type && !edge.is_instance_of {
        property_field(index, edge, |p| p.range.clone())
    } else {
        Vec::new()
    };

    (domain, range)
}

fn property_field(
    index: &dyn SearchIndex,
    edge: &QueryEdge,
    field: impl Fn(&crate::index::Property) -> Vec<String>,
) -> Vec<String> {
    let mut values = Vec::new();
    for id in edge.uri_ids() {
        let Some(property) = index.property_by_id(&id) else {
            continue;
        };
        for value in field(&property) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

fn set_domains_and_ranges(graph: &mut QueryGraph, index: &dyn SearchIndex) {
    let bounds: Vec<(i32, Vec<String>, Vec<String>)> = graph
        .edges
        .values()
        .map(|e| {
            let (domain, range) = edge_bounds(graph, e, index);
            (e.id, domain, range)
        })
        .collect();
    for (id, domain, range) in bounds {
        let edge = graph.edges.get_mut(&id).expect("classified edge exists");
        edge.domain = domain;
        edge.range = range;
    }
}

/// Heuristic types for untyped nodes: if-any intersection of the domains of
/// outgoing non-instance-of edges with the ranges of incoming ones.
fn set_inferred_types(graph: &mut QueryGraph) {
    let mut inferred: Vec<(i32, Vec<String>)> = Vec::new();
    for node in graph.nodes.values() {
        if !node.types.is_empty() || node.is_given_type {
            continue;
        }
        let domains: Vec<String> = graph
            .outgoing_edges(node.id)
            .iter()
            .filter(|e| !e.is_instance_of)
            .flat_map(|e| e.domain.iter().cloned())
            .collect();
        let ranges: Vec<String> = graph
            .incoming_edges(node.id)
            .iter()
            .filter(|e| !e.is_instance_of)
            .flat_map(|e| e.range.iter().cloned())
            .collect();

        let mut types = intersect_if_any(Vec::new(), &domains);
        types = intersect_if_any(types, &ranges);
        types.dedup();
        if !types.is_empty() {
            inferred.push((node.id, types));
        }
    }
    for (id, types) in inferred {
        graph
            .nodes
            .get_mut(&id)
            .expect("classified node exists")
            .inferred_types = types;
    }
}

/// How concretely a node's type is pinned down, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeLevel {
    Given,
    Known,
    Inferred,
    None,
}

fn type_level(node: &QueryNode) -> TypeLevel {
    if node.is_given_type {
        TypeLevel::Given
    } else if node.is_instance_of_type {
        TypeLevel::Known
    } else if !node.inferred_types.is_empty() {
        TypeLevel::Inferred
    } else {
        TypeLevel::None
    }
}

/// The decision table: one strategy per (subject level, object level) pair.
/// Given outranks Known outranks Inferred on mixed endpoints.
fn assign_query_types(graph: &mut QueryGraph) {
    use QueryType::*;
    use TypeLevel::*;

    let assignments: Vec<(i32, QueryType)> = graph
        .edges
        .values()
        .map(|edge| {
            let subject = type_level(graph.source_node(edge));
            let object = type_level(graph.target_node(edge));
            let query_type = match (subject, object) {
                (Given, Given) => GivenSubjectAndObjectTypeDirectQueryIntersectOutInProperties,
                (Given, _) => GivenSubjectTypeDirectQueryOutgoingProperties,
                (_, Given) => GivenObjectTypeDirectQueryIncomingProperties,
                (Known, Known) => KnownSubjectAndObjectTypesIntersectDomainRangeProperties,
                (Known, _) => KnownSubjectTypeQueryDomainProperties,
                (_, Known) => KnownObjectTypeQueryRangeProperties,
                (Inferred, Inferred) => InferredDomainAndRangeTypeProperties,
                (Inferred, None) => InferredDomainTypeProperties,
                (None, Inferred) => InferredRangeTypeProperties,
                (None, None) => Unknown,
            };
            (edge.id, query_type)
        })
        .collect();
    for (id, query_type) in assignments {
        graph
            .edges
            .get_mut(&id)
            .expect("classified edge exists")
            .query_type = query_type;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, Property};

    fn index_with_employer() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        index.insert_property(Property {
            id: "P108".into(),
            label: "employer".into(),
            rank: 0.3,
            domain: vec!["Q5".into()],
            range: vec!["Q4830453".into()],
        });
        index
    }

    fn classified(json: &str, index: &MemoryIndex) -> QueryGraph {
        let mut graph = QueryGraph::from_json(json).unwrap();
        classify(&mut graph, index);
        graph
    }

    #[test]
    fn intersect_if_any_semantics() {
        let q5 = vec!["Q5".to_string()];
        let both = vec!["Q5".to_string(), "Q6".to_string()];

        assert_eq!(intersect_if_any(Vec::new(), &q5), q5);
        assert_eq!(intersect_if_any(q5.clone(), &[]), q5);
        assert_eq!(intersect_if_any(both, &q5), q5);
        let disjoint = intersect_if_any(vec!["Q7".to_string()], &q5);
        assert!(disjoint.is_empty());
    }

    #[test]
    fn instance_of_edge_derives_known_types() {
        let index = MemoryIndex::new();
        let graph = classified(
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
            &index,
        );
        let node = &graph.nodes[&0];
        assert!(node.is_instance_of_type);
        assert!(!node.is_given_type);
        assert_eq!(node.types, vec!["Q5".to_string()]);
    }

    #[test]
    fn given_property_bounds_infer_node_types() {
        // ?x --P108--> ?y with both ends untyped: the property's domain and
        // range provide the heuristic types.
        let index = index_with_employer();
        let graph = classified(
            r#"{
                "nodes": [{"id": 0}, {"id": 1}],
                "edges": [
                    {"id": 0, "sourceId": 0, "targetId": 1,
                     "uris": ["http://www.wikidata.org/prop/direct/P108"]}
                ]
            }"#,
            &index,
        );
        assert_eq!(graph.nodes[&0].inferred_types, vec!["Q5".to_string()]);
        assert_eq!(graph.nodes[&1].inferred_types, vec!["Q4830453".to_string()]);
        assert_eq!(graph.edges[&0].domain, vec!["Q5".to_string()]);
        assert_eq!(graph.edges[&0].range, vec!["Q4830453".to_string()]);
    }

    #[test]
    fn given_types_dominate_decision_table() {
        let index = MemoryIndex::new();
        let graph = classified(
            r#"{
                "nodes": [
                    {"id": 0, "types": ["Q5"]},
                    {"id": 1, "types": ["Q4830453"]}
                ],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]
            }"#,
            &index,
        );
        assert_eq!(
            graph.edges[&0].query_type,
            QueryType::GivenSubjectAndObjectTypeDirectQueryIntersectOutInProperties
        );
        assert_eq!(graph.edges[&0].domain, vec!["Q5".to_string()]);
        assert_eq!(graph.edges[&0].range, vec!["Q4830453".to_string()]);
    }

    #[test]
    fn given_subject_only() {
        let index = MemoryIndex::new();
        let graph = classified(
            r#"{
                "nodes": [{"id": 0, "types": ["Q5"]}, {"id": 1}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]
            }"#,
            &index,
        );
        assert_eq!(
            graph.edges[&0].query_type,
            QueryType::GivenSubjectTypeDirectQueryOutgoingProperties
        );
    }

    #[test]
    fn given_object_only() {
        let index = MemoryIndex::new();
        let graph = classified(
            r#"{
                "nodes": [{"id": 0}, {"id": 1, "types": ["Q5"]}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]
            }"#,
            &index,
        );
        assert_eq!(
            graph.edges[&0].query_type,
            QueryType::GivenObjectTypeDirectQueryIncomingProperties
        );
    }

    #[test]
    fn known_types_from_instance_of_edges() {
        // ?x is-a Q5, ?y is-a Q515, plus an unknown edge ?x --?--> ?y.
        let index = MemoryIndex::new();
        let graph = classified(
            r#"{
                "nodes": [
                    {"id": 0}, {"id": 1},
                    {"id": 2, "uris": ["http://www.wikidata.org/entity/Q5"]},
                    {"id": 3, "uris": ["http://www.wikidata.org/entity/Q515"]}
                ],
                "edges": [
                    {"id": 0, "sourceId": 0, "targetId": 2,
                     "uris": ["http://www.wikidata.org/prop/direct/P31"]},
                    {"id": 1, "sourceId": 1, "targetId": 3,
                     "uris": ["http://www.wikidata.org/prop/direct/P31"]},
                    {"id": 2, "sourceId": 0, "targetId": 1}
                ]
            }"#,
            &index,
        );
        assert_eq!(
            graph.edges[&2].query_type,
            QueryType::KnownSubjectAndObjectTypesIntersectDomainRangeProperties
        );
        assert_eq!(graph.edges[&2].domain, vec!["Q5".to_string()]);
        assert_eq!(graph.edges[&2].range, vec!["Q515".to_string()]);
    }

    #[test]
    fn inferred_levels_in_decision_table() {
        let index = index_with_employer();
        // ?x --P108--> ?y (inferred both) and ?x --?--> ?z (inferred/none).
        let graph = classified(
            r#"{
                "nodes": [{"id": 0}, {"id": 1}, {"id": 2}],
                "edges": [
                    {"id": 0, "sourceId": 0, "targetId": 1,
                     "uris": ["http://www.wikidata.org/prop/direct/P108"]},
                    {"id": 1, "sourceId": 0, "targetId": 2}
                ]
            }"#,
            &index,
        );
        assert_eq!(
            graph.edges[&0].query_type,
            QueryType::InferredDomainAndRangeTypeProperties
        );
        assert_eq!(
            graph.edges[&1].query_type,
            QueryType::InferredDomainTypeProperties
        );
    }

    #[test]
    fn fully_unknown_edge_stays_unknown() {
        let index = MemoryIndex::new();
        let graph = classified(
            r#"{
                "nodes": [{"id": 0}, {"id": 1}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]
            }"#,
            &index,
        );
        assert_eq!(graph.edges[&0].query_type, QueryType::Unknown);
    }

    #[test]
    fn node_cases() {
        let index = MemoryIndex::new();
        let graph = classified(
            r#"{
                "nodes": [
                    {"id": 0, "types": ["Q5"]},
                    {"id": 1},
                    {"id": 2},
                    {"id": 3, "uris": ["http://www.wikidata.org/entity/Q5"]}
                ],
                "edges": [
                    {"id": 0, "sourceId": 2, "targetId": 3,
                     "uris": ["http://www.wikidata.org/prop/direct/P31"]}
                ]
            }"#,
            &index,
        );
        assert_eq!(node_case(&graph, &graph.nodes[&0]), NodeCase::GivenType);
        assert_eq!(node_case(&graph, &graph.nodes[&1]), NodeCase::Disconnected);
        assert_eq!(node_case(&graph, &graph.nodes[&2]), NodeCase::InstanceOfOnly);
        assert_eq!(node_case(&graph, &graph.nodes[&3]), NodeCase::General);
    }
}

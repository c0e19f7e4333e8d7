//! Routed resolution of classified query graphs.
//!
//! Every node and edge owns an independent result slot, so resolution fans
//! out over rayon with only read-only shared state (the search index, the
//! type index, the endpoint client). The remote endpoint is attempted first
//! wherever a strategy allows it; any failure degrades to the local
//! heuristics without surfacing an error.

use std::cmp::Ordering;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::endpoint::{edge_query, edge_variable, ids_for, node_query, node_variable, RemoteEndpoint};
use crate::index::{Entity, Property, SearchIndex};
use crate::typeindex::TypeIndex;

use super::classify::{classify, intersect_if_any, node_case, NodeCase};
use super::graph::{QueryEdge, QueryGraph, QueryNode};
use super::QueryType;

/// Tunables for one resolver. The defaults match the published behavior;
/// `seed` pins the sampling paths for reproducible runs.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Base seed for all sampling. `None` draws from entropy per call.
    pub seed: Option<u64>,
    /// Exclusive upper bound of the global `Q{n}` id space sampled for
    /// disconnected nodes.
    pub random_pool: u64,
    /// Candidate ids drawn for a disconnected node.
    pub disconnected_sample: usize,
    /// Per-type member limit for instance-of queries.
    pub instance_limit: usize,
    /// Cap on the random sample of intersected heuristic types.
    pub type_sample: usize,
    /// Overall cap on instance-of query results.
    pub overall_cap: usize,
    /// Fetch size for the explicit-type narrowing query.
    pub narrow_fetch: usize,
    /// Entities kept from the narrowing query.
    pub narrow_take: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            seed: None,
            random_pool: 999_999,
            disconnected_sample: 20,
            instance_limit: 20,
            type_sample: 100,
            overall_cap: 100,
            narrow_fetch: 200,
            narrow_take: 20,
        }
    }
}

/// Resolves query graphs against a shared read-only index pair and an
/// optional remote endpoint.
pub struct Resolver {
    index: Arc<dyn SearchIndex>,
    types: Arc<TypeIndex>,
    endpoint: Option<RemoteEndpoint>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        types: Arc<TypeIndex>,
        endpoint: Option<RemoteEndpoint>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            index,
            types,
            endpoint,
            config,
        }
    }

    /// Classify the graph, then fill every node's and edge's result slot.
    /// Nodes and edges resolve as two independent parallel batches.
    pub fn resolve(&self, graph: &mut QueryGraph) {
        classify(graph, self.index.as_ref());

        let shared: &QueryGraph = graph;
        let node_results: Vec<(i32, Vec<Entity>)> = shared
            .nodes
            .values()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|node| (node.id, self.resolve_node(shared, node)))
            .collect();
        let edge_results: Vec<(i32, Vec<Property>)> = shared
            .edges
            .values()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|edge| (edge.id, self.resolve_edge(shared, edge)))
            .collect();

        for (id, results) in node_results {
            graph.nodes.get_mut(&id).expect("resolved node exists").results = results;
        }
        for (id, results) in edge_results {
            graph.edges.get_mut(&id).expect("resolved edge exists").results = results;
        }
    }

    // -- node strategy ------------------------------------------------------

    fn resolve_node(&self, graph: &QueryGraph, node: &QueryNode) -> Vec<Entity> {
        if !node.uris.is_empty() && !node.is_given_type {
            // Concrete node: hydrate the named entities, nothing to search.
            return self.index.entities_by_ids(&node.uri_ids());
        }
        match node_case(graph, node) {
            NodeCase::GivenType => Vec::new(),
            NodeCase::Disconnected => self.resolve_disconnected(node),
            NodeCase::InstanceOfOnly => self.index.entities_by_instance_of(
                &node.types,
                self.config.instance_limit,
                self.config.instance_limit,
            ),
            NodeCase::General => {
                if let Some(entities) = self.try_remote_node(graph, node) {
                    return entities;
                }
                self.resolve_node_local(graph, node)
            }
        }
    }

    /// Draw candidate ids from the global id space and keep the hits.
    fn resolve_disconnected(&self, node: &QueryNode) -> Vec<Entity> {
        let mut rng = self.rng_for(node.id);
        let ids: Vec<String> = (0..self.config.disconnected_sample)
            .map(|_| format!("Q{}", rng.gen_range(0..self.config.random_pool)))
            .collect();
        self.index.entities_by_ids(&ids)
    }

    fn try_remote_node(&self, graph: &QueryGraph, node: &QueryNode) -> Option<Vec<Entity>> {
        let endpoint = self.endpoint.as_ref()?;
        let rows = endpoint.try_query(&node_query(graph, node))?;
        let ids = ids_for(&rows, &node_variable(node.id));
        Some(self.index.entities_by_ids(&ids))
    }

    /// Heuristic fallback: if-any intersection of edge domains and ranges,
    /// capped random type sample, instance query, then strict narrowing by
    /// any explicit instance-of type.
    fn resolve_node_local(&self, graph: &QueryGraph, node: &QueryNode) -> Vec<Entity> {
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

        let mut intersect_types = intersect_if_any(Vec::new(), &domains);
        intersect_types = intersect_if_any(intersect_types, &ranges);
        let sampled = self.sample_types(distinct(intersect_types), node.id);

        let mut results = self.index.entities_by_instance_of(
            &sampled,
            self.config.instance_limit,
            self.config.overall_cap,
        );

        if node.is_instance_of_type {
            // True intersection: the explicit type filter may empty the set.
            let narrowed: Vec<String> = self
                .index
                .entities_by_instance_of(&node.types, self.config.narrow_fetch, self.config.narrow_fetch)
                .into_iter()
                .take(self.config.narrow_take)
                .map(|e| e.id)
                .collect();
            results.retain(|e| narrowed.contains(&e.id));
        }
        results
    }

    fn sample_types(&self, mut types: Vec<String>, slot: i32) -> Vec<String> {
        if types.len() > self.config.type_sample {
            let mut rng = self.rng_for(slot);
            types.shuffle(&mut rng);
            types.truncate(self.config.type_sample);
        }
        types
    }

    /// One RNG per output slot, derived from the session seed so parallel
    /// scheduling cannot perturb seeded runs.
    fn rng_for(&self, slot: i32) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(
                seed.wrapping_add((slot as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            ),
            None => StdRng::from_entropy(),
        }
    }

    // -- edge strategy ------------------------------------------------------

    fn resolve_edge(&self, graph: &QueryGraph, edge: &QueryEdge) -> Vec<Property> {
        if edge.is_given_type {
            return Vec::new();
        }
        if let Some(properties) = self.try_remote_edge(graph, edge) {
            return properties;
        }
        self.resolve_edge_local(graph, edge)
    }

    fn try_remote_edge(&self, graph: &QueryGraph, edge: &QueryEdge) -> Option<Vec<Property>> {
        let endpoint = self.endpoint.as_ref()?;
        let rows = endpoint.try_query(&edge_query(graph, edge))?;
        let ids = ids_for(&rows, &edge_variable(edge.id));
        Some(self.index.properties_by_ids(&ids))
    }

    fn resolve_edge_local(&self, graph: &QueryGraph, edge: &QueryEdge) -> Vec<Property> {
        use QueryType::*;

        let source = graph.source_node(edge);
        let target = graph.target_node(edge);

        let ids = match edge.query_type {
            Unknown => Vec::new(),
            GivenSubjectTypeDirectQueryOutgoingProperties => {
                self.outgoing_ids_of_type_entities(&source.types)
            }
            GivenSubjectAndObjectTypeDirectQueryIntersectOutInProperties => ordered_intersection(
                self.outgoing_ids_of_type_entities(&source.types),
                &self.reverse_ids_of_type_entities(&target.types),
            ),
            GivenObjectTypeDirectQueryIncomingProperties => {
                self.reverse_ids_of_type_entities(&target.types)
            }
            KnownSubjectAndObjectTypesIntersectDomainRangeProperties => ordered_intersection(
                self.types.outgoing_properties(&source.types),
                &self.types.incoming_properties(&target.types),
            ),
            KnownSubjectTypeQueryDomainProperties => self.types.outgoing_properties(&source.types),
            KnownObjectTypeQueryRangeProperties => self.types.incoming_properties(&target.types),
            InferredDomainAndRangeTypeProperties => ordered_intersection(
                self.types.outgoing_properties(&source.inferred_types),
                &self.types.incoming_properties(&target.inferred_types),
            ),
            InferredDomainTypeProperties => {
                self.types.outgoing_properties(&source.inferred_types)
            }
            InferredRangeTypeProperties => self.types.incoming_properties(&target.inferred_types),
        };

        let properties = self.index.properties_by_ids(&ids);
        match edge.query_type {
            KnownSubjectAndObjectTypesIntersectDomainRangeProperties
            | KnownSubjectTypeQueryDomainProperties
            | KnownObjectTypeQueryRangeProperties => sort_by_rank(properties),
            _ => properties,
        }
    }

    /// Outgoing property ids observed on the entities that *are* the given
    /// types, distinct, first-seen order.
    fn outgoing_ids_of_type_entities(&self, types: &[String]) -> Vec<String> {
        let mut ids = Vec::new();
        for entity in self.index.entities_by_ids(types) {
            for id in entity.property_ids() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    fn reverse_ids_of_type_entities(&self, types: &[String]) -> Vec<String> {
        let mut ids = Vec::new();
        for entity in self.index.entities_by_ids(types) {
            for id in &entity.reverse_properties {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }
}

/// Intersection preserving the first operand's order, duplicates removed.
fn ordered_intersection(first: Vec<String>, second: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in first {
        if second.contains(&id) && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn sort_by_rank(mut properties: Vec<Property>) -> Vec<Property> {
    properties.sort_by(|a, b| {
        b.rank
            .partial_cmp(&a.rank)
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    properties
}

fn distinct(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, PropertyValue};

    fn entity(id: &str, label: &str, rank: f64, instance_of: &[&str]) -> Entity {
        Entity {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            alt_labels: vec![],
            rank,
            instance_of: instance_of.iter().map(|s| s.to_string()).collect(),
            properties: vec![],
            reverse_properties: vec![],
        }
    }

    fn property(id: &str, label: &str, rank: f64) -> Property {
        Property {
            id: id.into(),
            label: label.into(),
            rank,
            domain: vec![],
            range: vec![],
        }
    }

    /// People (Q5) living in cities (Q515) and working for companies
    /// (Q4830453), plus the type entities themselves.
    fn people_index() -> MemoryIndex {
        let mut index = MemoryIndex::new();

        let mut alice = entity("Q1", "alice", 0.3, &["Q5"]);
        alice.properties = vec![
            PropertyValue { property: "P551".into(), value: Some("Q2".into()) },
            PropertyValue { property: "P108".into(), value: Some("Q3".into()) },
        ];
        index.insert_entity(alice);

        let mut bob = entity("Q10", "bob", 0.5, &["Q5"]);
        bob.properties = vec![PropertyValue {
            property: "P108".into(),
            value: Some("Q3".into()),
        }];
        index.insert_entity(bob);

        let mut city = entity("Q2", "springfield", 0.2, &["Q515"]);
        city.reverse_properties = vec!["P551".into()];
        index.insert_entity(city);

        let mut company = entity("Q3", "acme", 0.1, &["Q4830453"]);
        company.reverse_properties = vec!["P108".into()];
        index.insert_entity(company);

        // The type entities, carrying aggregate property observations.
        let mut person_type = entity("Q5", "human", 0.6, &[]);
        person_type.properties = vec![
            PropertyValue { property: "P551".into(), value: None },
            PropertyValue { property: "P108".into(), value: None },
        ];
        index.insert_entity(person_type);

        let mut company_type = entity("Q4830453", "business", 0.4, &[]);
        company_type.reverse_properties = vec!["P108".into(), "P999".into()];
        index.insert_entity(company_type);

        let mut emp = property("P108", "employer", 0.9);
        emp.domain = vec!["Q5".into()];
        emp.range = vec!["Q4830453".into()];
        index.insert_property(emp);
        index.insert_property(property("P551", "residence", 0.1));

        index
    }

    fn resolver(index: MemoryIndex, config: ResolverConfig) -> Resolver {
        let index: Arc<dyn SearchIndex> = Arc::new(index);
        let types = Arc::new(TypeIndex::build(index.as_ref()));
        Resolver::new(index, types, None, config)
    }

    fn resolved(json: &str, config: ResolverConfig) -> QueryGraph {
        let r = resolver(people_index(), config);
        let mut graph = QueryGraph::from_json(json).unwrap();
        r.resolve(&mut graph);
        graph
    }

    fn seeded() -> ResolverConfig {
        ResolverConfig {
            seed: Some(7),
            ..ResolverConfig::default()
        }
    }

    #[test]
    fn given_type_node_stays_empty() {
        let graph = resolved(
            r#"{"nodes": [{"id": 0, "types": ["Q5"]},
                          {"id": 1}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]}"#,
            seeded(),
        );
        assert!(graph.nodes[&0].results.is_empty());
    }

    #[test]
    fn given_property_edge_stays_empty() {
        let graph = resolved(
            r#"{"nodes": [{"id": 0}, {"id": 1}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1,
                           "uris": ["http://www.wikidata.org/prop/direct/P108"]}]}"#,
            seeded(),
        );
        assert!(graph.edges[&0].results.is_empty());
    }

    #[test]
    fn concrete_node_hydrates_itself() {
        let graph = resolved(
            r#"{"nodes": [{"id": 0, "uris": ["http://www.wikidata.org/entity/Q1"]},
                          {"id": 1}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]}"#,
            seeded(),
        );
        let ids: Vec<&str> = graph.nodes[&0].results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Q1"]);
    }

    #[test]
    fn disconnected_node_samples_deterministically_with_seed() {
        // A tiny pool guarantees hits against the fixture ids.
        let config = ResolverConfig {
            seed: Some(42),
            random_pool: 4,
            ..ResolverConfig::default()
        };
        let json = r#"{"nodes": [{"id": 0}], "edges": []}"#;
        let first = resolved(json, config.clone());
        let second = resolved(json, config);

        let first_ids: Vec<String> =
            first.nodes[&0].results.iter().map(|e| e.id.clone()).collect();
        let second_ids: Vec<String> =
            second.nodes[&0].results.iter().map(|e| e.id.clone()).collect();

        assert!(!first_ids.is_empty());
        assert_eq!(first_ids, second_ids);
        // Only fixture ids can come back; misses drop silently.
        for id in &first_ids {
            assert!(["Q1", "Q2", "Q3"].contains(&id.as_str()));
        }
    }

    #[test]
    fn instance_of_only_node_lists_type_members() {
        let graph = resolved(
            r#"{"nodes": [{"id": 0},
                          {"id": 1, "uris": ["http://www.wikidata.org/entity/Q5"]}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1,
                           "uris": ["http://www.wikidata.org/prop/direct/P31"]}]}"#,
            seeded(),
        );
        let ids: Vec<&str> = graph.nodes[&0].results.iter().map(|e| e.id.as_str()).collect();
        // Q5 members by rank descending.
        assert_eq!(ids, vec!["Q10", "Q1"]);
    }

    #[test]
    fn instance_limit_caps_type_members() {
        let config = ResolverConfig {
            seed: Some(7),
            instance_limit: 1,
            ..ResolverConfig::default()
        };
        let graph = resolved(
            r#"{"nodes": [{"id": 0},
                          {"id": 1, "uris": ["http://www.wikidata.org/entity/Q5"]}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1,
                           "uris": ["http://www.wikidata.org/prop/direct/P31"]}]}"#,
            config,
        );
        assert_eq!(graph.nodes[&0].results.len(), 1);
        assert_eq!(graph.nodes[&0].results[0].id, "Q10");
    }

    #[test]
    fn general_node_falls_back_to_domain_heuristics() {
        // ?x --P108--> ?y: the property's domain types the subject as Q5.
        let graph = resolved(
            r#"{"nodes": [{"id": 0}, {"id": 1}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1,
                           "uris": ["http://www.wikidata.org/prop/direct/P108"]}]}"#,
            seeded(),
        );
        let subject_ids: Vec<&str> =
            graph.nodes[&0].results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(subject_ids, vec!["Q10", "Q1"]);

        let object_ids: Vec<&str> =
            graph.nodes[&1].results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(object_ids, vec!["Q3"]);
    }

    #[test]
    fn explicit_type_narrows_with_true_intersection() {
        // ?x is-a human with an employer: heuristics suggest both humans,
        // but a narrowing take of one keeps only the top-ranked member.
        let config = ResolverConfig {
            seed: Some(7),
            narrow_take: 1,
            ..ResolverConfig::default()
        };
        let graph = resolved(
            r#"{"nodes": [{"id": 0},
                          {"id": 1},
                          {"id": 2, "uris": ["http://www.wikidata.org/entity/Q5"]}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 2,
                           "uris": ["http://www.wikidata.org/prop/direct/P31"]},
                          {"id": 1, "sourceId": 0, "targetId": 1,
                           "uris": ["http://www.wikidata.org/prop/direct/P108"]}]}"#,
            config,
        );
        let ids: Vec<&str> = graph.nodes[&0].results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Q10"]);
    }

    #[test]
    fn given_types_intersect_out_in_property_ids() {
        // Subject typed Q5, object typed Q4830453, edge unknown: outgoing ids
        // of the Q5 entity intersect reverse ids of the Q4830453 entity,
        // first-set order preserved.
        let graph = resolved(
            r#"{"nodes": [{"id": 0, "types": ["Q5"]},
                          {"id": 1, "types": ["Q4830453"]}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]}"#,
            seeded(),
        );
        let ids: Vec<&str> = graph.edges[&0].results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P108"]);
    }

    #[test]
    fn given_subject_type_lists_outgoing_properties() {
        let graph = resolved(
            r#"{"nodes": [{"id": 0, "types": ["Q5"]}, {"id": 1}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]}"#,
            seeded(),
        );
        let ids: Vec<&str> = graph.edges[&0].results.iter().map(|p| p.id.as_str()).collect();
        // First-seen order of the type entity's statements, no rank sort.
        assert_eq!(ids, vec!["P551", "P108"]);
    }

    #[test]
    fn known_subject_type_sorts_by_rank_descending() {
        // Subject typed via instance-of: the type-index union [P551, P108]
        // comes back rank-sorted, employer (0.9) first.
        let graph = resolved(
            r#"{"nodes": [{"id": 0},
                          {"id": 1},
                          {"id": 2, "uris": ["http://www.wikidata.org/entity/Q5"]}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 2,
                           "uris": ["http://www.wikidata.org/prop/direct/P31"]},
                          {"id": 1, "sourceId": 0, "targetId": 1}]}"#,
            seeded(),
        );
        assert_eq!(
            graph.edges[&1].query_type,
            QueryType::KnownSubjectTypeQueryDomainProperties
        );
        let ids: Vec<&str> = graph.edges[&1].results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P108", "P551"]);
    }

    #[test]
    fn inferred_domain_keeps_observation_order() {
        // Subject inferred as Q5 through its given P108 edge; the unknown
        // edge resolves from the type index in first-seen order, unsorted.
        let graph = resolved(
            r#"{"nodes": [{"id": 0}, {"id": 1}, {"id": 2}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1,
                           "uris": ["http://www.wikidata.org/prop/direct/P108"]},
                          {"id": 1, "sourceId": 0, "targetId": 2}]}"#,
            seeded(),
        );
        assert_eq!(
            graph.edges[&1].query_type,
            QueryType::InferredDomainTypeProperties
        );
        let ids: Vec<&str> = graph.edges[&1].results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P551", "P108"]);
    }

    #[test]
    fn unknown_edge_resolves_empty() {
        let graph = resolved(
            r#"{"nodes": [{"id": 0}, {"id": 1}],
                "edges": [{"id": 0, "sourceId": 0, "targetId": 1}]}"#,
            seeded(),
        );
        assert!(graph.edges[&0].results.is_empty());
    }

    #[test]
    fn ordered_intersection_preserves_first_operand_order() {
        let first = vec!["P17".to_string(), "P108".to_string(), "P17".to_string()];
        let second = vec!["P108".to_string(), "P17".to_string()];
        assert_eq!(
            ordered_intersection(first, &second),
            vec!["P17".to_string(), "P108".to_string()]
        );
    }
}

//! Partial query graphs and their resolution machinery.
//!
//! A query graph is a small graph of nodes (entities, some concrete, some
//! unknown) and edges (properties, some concrete, some unknown) representing
//! one user query. [`graph`] holds the in-memory model, [`classify`] the
//! static classification of nodes and edges into resolution states, and
//! [`resolver`] the routed remote-first/local-fallback execution.

pub mod classify;
pub mod graph;
pub mod resolver;

use serde::{Deserialize, Serialize};

pub use graph::{QueryEdge, QueryGraph, QueryNode};
pub use resolver::{Resolver, ResolverConfig};

/// Resolution strategy for an edge, a closed enumeration reflecting which
/// endpoint types are concretely known vs. only inferable.
///
/// "Given" endpoints had their type supplied by the caller; "Known" types
/// were derived with certainty from an instance-of edge; "Inferred" types
/// come from heuristic domain/range intersection only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QueryType {
    #[default]
    Unknown,
    GivenSubjectTypeDirectQueryOutgoingProperties,
    GivenSubjectAndObjectTypeDirectQueryIntersectOutInProperties,
    GivenObjectTypeDirectQueryIncomingProperties,
    KnownSubjectAndObjectTypesIntersectDomainRangeProperties,
    KnownSubjectTypeQueryDomainProperties,
    KnownObjectTypeQueryRangeProperties,
    InferredDomainAndRangeTypeProperties,
    InferredDomainTypeProperties,
    InferredRangeTypeProperties,
}

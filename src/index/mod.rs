//! Search index collaborator surface.
//!
//! The full-text engine itself is an external collaborator; this module owns
//! what the resolver needs from it: the document models ([`Entity`],
//! [`Property`]), the lookup contract ([`SearchIndex`]), and the search-term
//! hygiene pipeline (prepare → parse → escaped retry). [`memory::MemoryIndex`]
//! is the in-process implementation used by sessions and tests.

pub mod memory;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

pub use memory::{IndexDocuments, MemoryIndex};

/// Result type for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

// ---------------------------------------------------------------------------
// Document models
// ---------------------------------------------------------------------------

/// An outgoing property of an entity, with its linked entity value when the
/// statement is entity-directed (literal-directed statements carry `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub property: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// An entity document as stored in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub alt_labels: Vec<String>,
    /// Precomputed importance score from the rank engine.
    #[serde(default)]
    pub rank: f64,
    /// Type ids this entity is an instance of.
    #[serde(default)]
    pub instance_of: Vec<String>,
    /// Outgoing properties.
    #[serde(default)]
    pub properties: Vec<PropertyValue>,
    /// Ids of properties pointing at this entity from elsewhere.
    #[serde(default)]
    pub reverse_properties: Vec<String>,
}

impl Entity {
    /// Distinct outgoing property ids, insertion order preserved.
    pub fn property_ids(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for pv in &self.properties {
            if !seen.contains(&pv.property) {
                seen.push(pv.property.clone());
            }
        }
        seen
    }
}

/// A property document as stored in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub rank: f64,
    /// Entity types observed as subjects of this property.
    #[serde(default)]
    pub domain: Vec<String>,
    /// Entity types observed as objects of this property.
    #[serde(default)]
    pub range: Vec<String>,
}

/// A row in a resolved result list, as surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub id: String,
    pub label: String,
    pub rank: f64,
    pub value: String,
}

impl From<&Entity> for ResultRow {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            label: entity.label.clone(),
            rank: entity.rank,
            value: entity.description.clone(),
        }
    }
}

impl From<&Property> for ResultRow {
    fn from(property: &Property) -> Self {
        Self {
            id: property.id.clone(),
            label: property.label.clone(),
            rank: property.rank,
            value: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup contract
// ---------------------------------------------------------------------------

/// Lookup operations the resolver requires from the search index.
///
/// Implementations must be safe for concurrent readers; the resolver issues
/// lookups from parallel workers against one shared, read-only index.
pub trait SearchIndex: Send + Sync {
    /// Exact lookup by id: zero or one document.
    fn entity_by_id(&self, id: &str) -> Option<Entity>;

    /// Batched lookup by id list. Results preserve the caller's requested
    /// order; ids with no match are silently dropped.
    fn entities_by_ids(&self, ids: &[String]) -> Vec<Entity>;

    /// Multi-field ranked text lookup over label and alternate labels,
    /// ordered by combined relevance × precomputed rank.
    fn entities_by_label(&self, text: &str, top_k: usize) -> IndexResult<Vec<Entity>>;

    /// Batched lookup filtered by instance-of type. Per type, the highest
    /// ranked members up to `per_type_limit`; overall result capped at
    /// `overall_cap`, duplicates removed.
    fn entities_by_instance_of(
        &self,
        types: &[String],
        per_type_limit: usize,
        overall_cap: usize,
    ) -> Vec<Entity>;

    /// Exact property lookup by id.
    fn property_by_id(&self, id: &str) -> Option<Property>;

    /// Batched property lookup; same order/drop semantics as entities.
    fn properties_by_ids(&self, ids: &[String]) -> Vec<Property>;

    /// Full scan over entity documents, in stable storage order.
    fn all_entities(&self) -> Vec<Entity>;
}

// ---------------------------------------------------------------------------
// Search-term hygiene
// ---------------------------------------------------------------------------

static RE_STRIP_SPECIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-*]").unwrap());

static RE_VALID_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9*?]+$").unwrap());

static RE_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9*? ]").unwrap());

/// A search term is invalid when nothing indexable remains after stripping
/// special characters. Invalid terms are filtered before any query is issued.
pub fn is_invalid_search_term(input: &str) -> bool {
    RE_STRIP_SPECIALS.replace_all(input, "").is_empty()
}

/// Expand user text into wildcard-wrapped tokens: trim, dashes to spaces,
/// each token wrapped in `*`.
pub fn prepare_search_term(input: &str) -> String {
    input
        .trim()
        .replace('-', " ")
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| format!("*{}*", t.trim()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A parsed search term: lowercase pattern with `*` (any run) and `?` (one
/// character) wildcards.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTerm {
    pattern: String,
}

impl SearchTerm {
    /// Wildcard match against one field value, case-insensitive.
    pub fn matches(&self, field: &str) -> bool {
        wildcard_match(&self.pattern, &field.to_lowercase())
    }
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    // Classic two-pointer wildcard matcher with backtracking on '*'.
    let (mut pi, mut ti) = (0usize, 0usize);
    let (mut star, mut mark) = (None::<usize>, 0usize);
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

fn try_parse_terms(prepared: &str) -> Option<Vec<SearchTerm>> {
    let mut terms = Vec::new();
    for token in prepared.split_whitespace() {
        if !RE_VALID_TOKEN.is_match(token) {
            return None;
        }
        // A token of only wildcards matches everything and parses to nothing.
        if token.chars().all(|c| c == '*' || c == '?') {
            continue;
        }
        terms.push(SearchTerm {
            pattern: token.to_lowercase(),
        });
    }
    Some(terms)
}

/// Parse prepared search text into matchable terms.
///
/// First attempt is a literal parse. On failure, the text is retried once
/// with all special characters escaped out; if that also fails the error
/// propagates — fatal for this single lookup only, not the session.
pub fn parse_search_terms(prepared: &str) -> IndexResult<Vec<SearchTerm>> {
    if let Some(terms) = try_parse_terms(prepared) {
        return Ok(terms);
    }
    let escaped = RE_ESCAPE.replace_all(prepared, "");
    match try_parse_terms(&escaped) {
        Some(terms) if !terms.is_empty() => Ok(terms),
        _ => Err(IndexError::QueryParse {
            term: prepared.to_string(),
        }),
    }
}

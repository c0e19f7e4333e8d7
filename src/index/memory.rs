//! In-process search index.
//!
//! Backs the [`SearchIndex`] contract with plain maps, loadable from a JSON
//! document export and re-rankable from a persisted rank table. Read-only
//! after session open; all resolver workers share one instance.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::rank::RankTable;

use super::{
    is_invalid_search_term, parse_search_terms, prepare_search_term, Entity, IndexResult,
    Property, SearchIndex,
};

/// On-disk document export: the JSON shape `MemoryIndex` loads from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocuments {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// In-process implementation of [`SearchIndex`].
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entities: HashMap<String, Entity>,
    properties: HashMap<String, Property>,
    /// Stable storage order for scans and deterministic tie-breaks.
    entity_order: Vec<String>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: IndexDocuments) -> Self {
        let mut index = Self::new();
        for entity in documents.entities {
            index.insert_entity(entity);
        }
        for property in documents.properties {
            index.insert_property(property);
        }
        index
    }

    /// Load a JSON document export from disk.
    pub fn load_json(path: &Path) -> IndexResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| IndexError::Io { source })?;
        let documents: IndexDocuments =
            serde_json::from_str(&content).map_err(|e| IndexError::Serialization {
                message: format!("invalid index JSON: {e}"),
            })?;
        Ok(Self::from_documents(documents))
    }

    pub fn insert_entity(&mut self, entity: Entity) {
        if !self.entities.contains_key(&entity.id) {
            self.entity_order.push(entity.id.clone());
        }
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn insert_property(&mut self, property: Property) {
        self.properties.insert(property.id.clone(), property);
    }

    /// Overwrite document ranks from a freshly computed rank table.
    /// Ids absent from the table keep their stored rank.
    pub fn apply_ranks(&mut self, table: &RankTable) {
        for entity in self.entities.values_mut() {
            if let Some(&rank) = table.ranks.get(&entity.id) {
                entity.rank = rank;
            }
        }
        for property in self.properties.values_mut() {
            if let Some(&rank) = table.ranks.get(&property.id) {
                property.rank = rank;
            }
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl SearchIndex for MemoryIndex {
    fn entity_by_id(&self, id: &str) -> Option<Entity> {
        self.entities.get(id).cloned()
    }

    fn entities_by_ids(&self, ids: &[String]) -> Vec<Entity> {
        ids.iter()
            .filter(|id| !is_invalid_search_term(id))
            .filter_map(|id| self.entities.get(id.as_str()).cloned())
            .collect()
    }

    fn entities_by_label(&self, text: &str, top_k: usize) -> IndexResult<Vec<Entity>> {
        if is_invalid_search_term(text) {
            return Ok(Vec::new());
        }
        let prepared = prepare_search_term(text);
        let terms = parse_search_terms(&prepared)?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f64, f64, &Entity)> = Vec::new();
        for id in &self.entity_order {
            let entity = &self.entities[id];
            let matched = terms
                .iter()
                .filter(|t| {
                    t.matches(&entity.label) || entity.alt_labels.iter().any(|a| t.matches(a))
                })
                .count();
            if matched == 0 {
                continue;
            }
            let relevance = matched as f64 / terms.len() as f64;
            scored.push((relevance * entity.rank, relevance, entity));
        }

        // Combined relevance × rank, relevance breaking rank-less ties, then
        // id for full determinism.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
                .then(a.2.id.cmp(&b.2.id))
        });
        Ok(scored.into_iter().take(top_k).map(|(_, _, e)| e.clone()).collect())
    }

    fn entities_by_instance_of(
        &self,
        types: &[String],
        per_type_limit: usize,
        overall_cap: usize,
    ) -> Vec<Entity> {
        let mut results: Vec<Entity> = Vec::new();
        for type_id in types {
            if is_invalid_search_term(type_id) {
                continue;
            }
            let mut members: Vec<&Entity> = self
                .entity_order
                .iter()
                .map(|id| &self.entities[id])
                .filter(|e| e.instance_of.iter().any(|t| t == type_id))
                .collect();
            members.sort_by(|a, b| {
                b.rank
                    .partial_cmp(&a.rank)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            });
            for member in members.into_iter().take(per_type_limit) {
                if results.len() >= overall_cap {
                    return results;
                }
                if !results.iter().any(|e| e.id == member.id) {
                    results.push(member.clone());
                }
            }
        }
        results
    }

    fn property_by_id(&self, id: &str) -> Option<Property> {
        self.properties.get(id).cloned()
    }

    fn properties_by_ids(&self, ids: &[String]) -> Vec<Property> {
        ids.iter()
            .filter(|id| !is_invalid_search_term(id))
            .filter_map(|id| self.properties.get(id.as_str()).cloned())
            .collect()
    }

    fn all_entities(&self) -> Vec<Entity> {
        self.entity_order
            .iter()
            .map(|id| self.entities[id].clone())
            .collect()
    }
}

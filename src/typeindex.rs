//! Precomputed type → property-id mapping.
//!
//! One scan over the entity index yields, for every entity type, the set of
//! property ids observed leaving instances of that type (outgoing) and the
//! set observed arriving at them (incoming). Built once per session, then
//! shared read-only by reference across all resolutions — no writer exists
//! after initialization, so no locking is involved.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::index::SearchIndex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeIndex {
    /// Type id → distinct property ids observed on instances of the type.
    outgoing: HashMap<String, Vec<String>>,
    /// Type id → distinct property ids observed pointing at instances.
    incoming: HashMap<String, Vec<String>>,
}

fn push_distinct(map: &mut HashMap<String, Vec<String>>, key: &str, value: &str) {
    let entries = map.entry(key.to_string()).or_default();
    if !entries.iter().any(|p| p == value) {
        entries.push(value.to_string());
    }
}

impl TypeIndex {
    /// Build from a full entity scan.
    ///
    /// For each entity with instance-of types T: its outgoing property ids
    /// join `outgoing[t]` for every t in T, and for every entity-directed
    /// statement (p, v) the property id joins `incoming[u]` for every type u
    /// of the value entity v.
    pub fn build(index: &dyn SearchIndex) -> Self {
        let mut types = TypeIndex::default();
        let entities = index.all_entities();

        let mut type_lookup: HashMap<&str, &Vec<String>> = HashMap::new();
        for entity in &entities {
            type_lookup.insert(entity.id.as_str(), &entity.instance_of);
        }

        for entity in &entities {
            for type_id in &entity.instance_of {
                for property_id in entity.property_ids() {
                    push_distinct(&mut types.outgoing, type_id, &property_id);
                }
            }
            for pv in &entity.properties {
                let Some(value) = &pv.value else { continue };
                let Some(value_types) = type_lookup.get(value.as_str()) else {
                    continue;
                };
                for value_type in *value_types {
                    push_distinct(&mut types.incoming, value_type, &pv.property);
                }
            }
        }

        tracing::info!(
            outgoing_types = types.outgoing.len(),
            incoming_types = types.incoming.len(),
            "type index built"
        );
        types
    }

    /// Distinct union of outgoing property ids over the given types,
    /// first-seen order preserved.
    pub fn outgoing_properties(&self, types: &[String]) -> Vec<String> {
        self.union(&self.outgoing, types)
    }

    /// Distinct union of incoming property ids over the given types.
    pub fn incoming_properties(&self, types: &[String]) -> Vec<String> {
        self.union(&self.incoming, types)
    }

    fn union(&self, map: &HashMap<String, Vec<String>>, types: &[String]) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for type_id in types {
            let Some(properties) = map.get(type_id) else {
                continue;
            };
            for property in properties {
                if !result.iter().any(|p| p == property) {
                    result.push(property.clone());
                }
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }

    /// Encode to bincode and write to disk.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let encoded = bincode::serialize(self).map_err(|e| IndexError::Serialization {
            message: format!("failed to encode type index: {e}"),
        })?;
        std::fs::write(path, encoded).map_err(|source| IndexError::Io { source })
    }

    /// Read and decode a persisted type index.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = std::fs::read(path).map_err(|source| IndexError::Io { source })?;
        bincode::deserialize(&bytes).map_err(|e| IndexError::Serialization {
            message: format!("failed to decode type index: {e}"),
        })
    }
}

//! Entity-link graph construction from the grouped triple stream.
//!
//! First pass assigns every distinct subject a dense index in order of first
//! appearance; second pass collects, per subject, the distinct entity-valued
//! object indices. Literal objects are excluded. The adjacency structure is a
//! plain `Vec<Vec<usize>>` so the rank iteration stays cache-friendly even
//! for dump-scale graphs.

use std::collections::HashMap;

use crate::triples::{self, TripleLine};

/// Progress log interval, in subject groups.
const NOTIFY_TICKS: usize = 100_000;

/// Assign a dense 0-based index to every distinct subject, in order of first
/// appearance. Assumes the stream is pre-sorted by subject; an out-of-order
/// subject yields a second group that keeps its first index, so indices stay
/// contiguous in `0..dictionary.len()`.
pub fn build_node_dictionary<I>(lines: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = String>,
{
    let mut dictionary = HashMap::new();
    let mut group_count = 0usize;

    for group in triples::group_by_subject(lines) {
        if group_count % NOTIFY_TICKS == 0 {
            tracing::debug!(group = group_count, "dictionary pass");
        }
        group_count += 1;

        let subject_id = triples::token_id(triples::subject_token(&group[0])).to_string();
        let next_index = dictionary.len();
        dictionary.entry(subject_id).or_insert(next_index);
    }
    dictionary
}

/// Second pass: build the adjacency graph restricted to entity-valued objects.
///
/// Object ids are deduplicated per subject, insertion order preserved. An
/// object id missing from the dictionary resolves to the default index 0,
/// silently aliasing unresolved links onto node 0. That behavior is load-
/// bearing for existing rank fixtures and is preserved as-is.
pub fn build_adjacency<I>(lines: I, dictionary: &HashMap<String, usize>) -> Vec<Vec<usize>>
where
    I: IntoIterator<Item = String>,
{
    let mut graph = vec![Vec::new(); dictionary.len()];
    let mut node_count = 0usize;

    for group in triples::group_by_subject(lines) {
        if node_count % NOTIFY_TICKS == 0 {
            tracing::debug!(group = node_count, "adjacency pass");
        }
        node_count += 1;

        let subject_id = triples::token_id(triples::subject_token(&group[0]));
        let subject_index = dictionary.get(subject_id).copied().unwrap_or(0);

        let mut connections: Vec<usize> = Vec::new();
        for line in &group {
            let Some(triple) = TripleLine::parse(line) else {
                continue;
            };
            if !triples::is_entity(triple.object) {
                continue;
            }
            let object_id = triples::token_id(triple.object);
            let object_index = dictionary.get(object_id).copied().unwrap_or(0);
            if !connections.contains(&object_index) {
                connections.push(object_index);
            }
        }
        graph[subject_index] = connections;
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::fixtures::reference_lines;

    #[test]
    fn dictionary_counts_distinct_subjects() {
        let dictionary = build_node_dictionary(reference_lines());
        assert_eq!(dictionary.len(), 7);
        assert_eq!(dictionary["Q1"], 0);
        assert_eq!(dictionary["Q4"], 3);
        assert_eq!(dictionary["Q7"], 6);
    }

    #[test]
    fn adjacency_matches_dictionary_size() {
        let dictionary = build_node_dictionary(reference_lines());
        let graph = build_adjacency(reference_lines(), &dictionary);

        assert_eq!(graph.len(), dictionary.len());
        assert_eq!(graph[0].len(), 2);
        assert_eq!(graph[1].len(), 3);
        assert_eq!(graph[2].len(), 2);
        assert_eq!(graph[3].len(), 2);
        assert_eq!(graph[4].len(), 6);
        assert_eq!(graph[5].len(), 2);
        assert!(graph[6].is_empty());
        assert!(graph.iter().flatten().all(|&i| i < graph.len()));
    }

    #[test]
    fn literal_objects_are_excluded() {
        let lines = vec![
            "Q1 P1476 \"only a label\" .".to_string(),
            "Q1 P31 Q2 .".to_string(),
            "Q2 P1476 \"no entity links at all\" .".to_string(),
        ];
        let dictionary = build_node_dictionary(lines.clone());
        let graph = build_adjacency(lines, &dictionary);

        assert_eq!(graph[0], vec![1]);
        assert!(graph[1].is_empty());
    }

    #[test]
    fn duplicate_objects_deduplicated_in_order() {
        let lines = vec![
            "Q1 P31 Q3 .".to_string(),
            "Q1 P279 Q2 .".to_string(),
            "Q1 P361 Q3 .".to_string(),
            "Q2 P31 Q1 .".to_string(),
            "Q3 P31 Q1 .".to_string(),
        ];
        let dictionary = build_node_dictionary(lines.clone());
        let graph = build_adjacency(lines, &dictionary);
        assert_eq!(graph[0], vec![2, 1]);
    }

    #[test]
    fn reappearing_subject_keeps_indices_dense() {
        // Q1 reappears after Q2: the second group reuses index 0 and Q3
        // still gets a contiguous index.
        let lines = vec![
            "Q1 P31 Q2 .".to_string(),
            "Q2 P31 Q1 .".to_string(),
            "Q1 P31 Q3 .".to_string(),
            "Q3 P31 Q1 .".to_string(),
        ];
        let dictionary = build_node_dictionary(lines.clone());
        assert_eq!(dictionary.len(), 3);
        let mut indices: Vec<usize> = dictionary.values().copied().collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2]);

        let graph = build_adjacency(lines, &dictionary);
        assert_eq!(graph.len(), 3);
        assert!(graph.iter().flatten().all(|&i| i < graph.len()));
    }

    #[test]
    fn unresolved_object_aliases_to_node_zero() {
        // Q99 is never a subject: the lookup defaults to index 0.
        let lines = vec![
            "Q1 P31 Q99 .".to_string(),
            "Q2 P31 Q1 .".to_string(),
        ];
        let dictionary = build_node_dictionary(lines.clone());
        let graph = build_adjacency(lines, &dictionary);
        assert_eq!(graph[0], vec![0]);
        assert_eq!(graph[1], vec![0]);
    }
}

//! Type-specific aggregation handlers: counting, listing, summing, and
//! comparing over the documents a query retrieved (or over graph-derived
//! facts for relationship-aware counting).

use std::collections::HashMap;

use crate::graph::{AttributeValue, GraphTraverser};
use crate::reasoning::domain_maps::{detect_state_name_in_query, entity_label};
use crate::reasoning::field_extraction::extract_field_from_query;
use crate::retrieval::{AggregationResult, AggregationType};
use crate::vector::Document;

fn contains_any(q: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| q.contains(n))
}

/// Filter `documents` to those whose `state`-ish attribute matches a US
/// state name mentioned in the query, if any state name is mentioned.
fn apply_state_filter<'a>(query: &str, documents: &'a [Document]) -> Vec<&'a Document> {
    match detect_state_name_in_query(query) {
        Some(state) => documents
            .iter()
            .filter(|d| {
                d.attribute_string("state").map(|s| s.eq_ignore_ascii_case(state)).unwrap_or(false)
                    || d.attribute_string("state_name").map(|s| s.eq_ignore_ascii_case(state)).unwrap_or(false)
            })
            .collect(),
        None => documents.iter().collect(),
    }
}

fn is_curve_mnemonic_count_query(q: &str) -> bool {
    contains_any(q, &["available", "different", "unique", "distinct"]) && q.contains("mnemonic")
}

/// Well counting and per-well curve counting, resolved against the graph
/// rather than the retrieved document set, since these questions are about
/// the whole corpus, not just what vector search happened to surface.
pub fn handle_relationship_aware_aggregation(
    query: &str,
    traverser: &GraphTraverser,
) -> Option<AggregationResult> {
    let q = query.to_lowercase();

    if q.contains("how many") && q.contains("well") {
        let force_only = contains_any(&q, &["force", "force2020", "norwegian"]);
        let count = traverser
            .nodes()
            .filter(|n| n.kind == "las_document")
            .filter(|n| !force_only || n.id.starts_with("force2020-well-"))
            .count();
        return Some(AggregationResult::Direct(format!("There are {count} wells.")));
    }

    if q.contains("each") && q.contains("curve") && q.contains("well") {
        let mut counts: Vec<usize> = traverser
            .nodes()
            .filter(|n| n.kind == "las_document")
            .map(|well| traverser.curves_for_well_ids(&well.id).len())
            .collect();
        if counts.is_empty() {
            return None;
        }
        counts.sort_unstable();
        let total: usize = counts.iter().sum();
        let min = *counts.first().unwrap();
        let max = *counts.last().unwrap();
        let avg = total as f64 / counts.len() as f64;
        return Some(AggregationResult::NeedsGeneration {
            formatted_context: format!(
                "Per-well curve counts across {} wells: minimum {min}, maximum {max}, average {avg:.1}.",
                counts.len()
            ),
        });
    }

    None
}

/// General aggregation dispatch keyed by the detected aggregation type,
/// applied to the document set already narrowed by retrieval/filtering.
pub fn handle_aggregation(
    query: &str,
    aggregation_type: AggregationType,
    documents: &[Document],
    traverser: &GraphTraverser,
) -> Option<AggregationResult> {
    let filtered = apply_state_filter(query, documents);
    let q = query.to_lowercase();

    match aggregation_type {
        AggregationType::Count => {
            if is_curve_mnemonic_count_query(&q) {
                let mut mnemonics = std::collections::HashSet::new();
                for node in traverser.nodes().filter(|n| n.kind == "las_curve" && n.id.contains("force2020")) {
                    if let Some(m) = node.mnemonic() {
                        mnemonics.insert(m);
                    }
                }
                return Some(AggregationResult::Direct(format!(
                    "There are {} unique curve mnemonics.",
                    mnemonics.len()
                )));
            }
            let entity_type = filtered.first().and_then(|d| d.entity_type()).unwrap_or("");
            let label = entity_label(entity_type);
            Some(AggregationResult::Direct(format!("There are {} {label}.", filtered.len())))
        }

        AggregationType::List | AggregationType::Distinct => {
            let field = extract_field_from_query(query, documents)?;
            let mut values: Vec<String> =
                filtered.iter().filter_map(|d| d.attribute_string(&field)).collect();
            values.sort();
            values.dedup();
            Some(AggregationResult::NeedsGeneration {
                formatted_context: format!("Distinct values for '{field}': {}.", values.join(", ")),
            })
        }

        AggregationType::Sum => {
            let field = extract_field_from_query(query, documents)?;
            let sum: f64 = filtered
                .iter()
                .filter_map(|d| d.attribute(&field))
                .filter_map(|v| AttributeValue::from_json(v).coerce_numeric())
                .sum();
            Some(AggregationResult::NeedsGeneration {
                formatted_context: format!("Sum of '{field}' across {} records: {sum}.", filtered.len()),
            })
        }

        AggregationType::Max | AggregationType::Min => {
            let field = extract_field_from_query(query, documents)?;
            let want_max = aggregation_type == AggregationType::Max;
            let extreme = extreme_value(&filtered, &field, want_max)?;
            Some(AggregationResult::Direct(extreme))
        }

        AggregationType::Range => {
            let field = extract_field_from_query(query, documents)?;
            let values: Vec<f64> = filtered
                .iter()
                .filter_map(|d| d.attribute(&field))
                .filter_map(|v| AttributeValue::from_json(v).coerce_numeric())
                .collect();
            if values.is_empty() {
                return None;
            }
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let inclusive = contains_any(
                &q,
                &["how many years", "number of years", "years of data", "year span"],
            );
            let range = if inclusive { max - min + 1.0 } else { max - min };
            Some(AggregationResult::NeedsGeneration {
                formatted_context: format!("Range of '{field}': {range} (min {min}, max {max})."),
            })
        }

        AggregationType::Comparison => {
            let field = comparison_field(&q, query, documents)?;
            let mut groups: HashMap<String, usize> = HashMap::new();
            for doc in &filtered {
                if let Some(value) = doc.attribute_string(&field) {
                    *groups.entry(value).or_insert(0) += 1;
                }
            }
            let (group, count) = groups.into_iter().max_by_key(|(_, count)| *count)?;
            Some(AggregationResult::Direct(format!("{group} has the most, with {count}.")))
        }
    }
}

fn comparison_field(q: &str, query: &str, documents: &[Document]) -> Option<String> {
    for (keyword, field) in
        [("domain", "domain"), ("operator", "operator"), ("state", "state"), ("entity_type", "entity_type")]
    {
        if q.contains(keyword) {
            return Some(field.to_string());
        }
    }
    extract_field_from_query(query, documents)
}

fn extreme_value(documents: &[&Document], field: &str, want_max: bool) -> Option<String> {
    let mut best: Option<(f64, String)> = None;
    let mut best_text: Option<String> = None;
    for doc in documents {
        let Some(value) = doc.attribute(field) else { continue };
        let attr = AttributeValue::from_json(value);
        let display = attr.coerce_string().unwrap_or_default();
        if let Some(numeric) = attr.coerce_numeric() {
            let better = best.as_ref().map(|(b, _)| if want_max { numeric > *b } else { numeric < *b }).unwrap_or(true);
            if better {
                best = Some((numeric, display));
            }
        } else {
            let better = best_text.as_ref().map(|b| if want_max { &display > b } else { &display < b }).unwrap_or(true);
            if better && best.is_none() {
                best_text = Some(display);
            }
        }
    }
    best.map(|(_, s)| s).or(best_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Graph};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::new(value.as_object().unwrap().clone())
    }

    fn empty_traverser() -> GraphTraverser {
        GraphTraverser::new(Graph { nodes: vec![], edges: vec![] as Vec<Edge> })
    }

    #[test]
    fn count_uses_entity_label() {
        let docs = vec![doc(json!({"entity_type": "las_document"})), doc(json!({"entity_type": "las_document"}))];
        let result = handle_aggregation("how many wells?", AggregationType::Count, &docs, &empty_traverser());
        match result {
            Some(AggregationResult::Direct(text)) => assert_eq!(text, "There are 2 wells."),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sum_coerces_numeric_strings() {
        let docs = vec![doc(json!({"production": "10"})), doc(json!({"production": 5}))];
        let result = handle_aggregation("total production sum", AggregationType::Sum, &docs, &empty_traverser());
        match result {
            Some(AggregationResult::NeedsGeneration { formatted_context }) => {
                assert!(formatted_context.contains("15"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn max_picks_highest_numeric_value() {
        let docs = vec![doc(json!({"depth": 100})), doc(json!({"depth": 250}))];
        let result = handle_aggregation("what is the maximum depth?", AggregationType::Max, &docs, &empty_traverser());
        match result {
            Some(AggregationResult::Direct(text)) => assert_eq!(text, "250"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn range_adds_one_for_inclusive_year_span() {
        let docs = vec![doc(json!({"year": 2010})), doc(json!({"year": 2015}))];
        let result = handle_aggregation("how many years of data do we have?", AggregationType::Range, &docs, &empty_traverser());
        match result {
            Some(AggregationResult::NeedsGeneration { formatted_context }) => assert!(formatted_context.contains('6')),
            other => panic!("unexpected {other:?}"),
        }
    }
}

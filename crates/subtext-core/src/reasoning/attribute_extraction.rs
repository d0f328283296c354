//! Structured-extraction strategies: answer attribute-style questions
//! directly from retrieved documents or the graph, without a generation
//! call, whenever the query shape is simple enough to trust a direct
//! lookup.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::graph::GraphTraverser;
use crate::reasoning::domain_maps::{normalize_unit2, US_STATES};
use crate::reasoning::field_extraction::extract_field_from_query;
use crate::vector::Document;

const COMPLEX_REASONING_KEYWORDS: &[&str] =
    &["why", "how does", "explain", "compare", "difference between", "relationship", "what is the effect"];

/// Closed set of attribute kinds the query can be asking about, ordered the
/// way the detector tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Well,
    Domain,
    SiteCode,
    SiteName,
    Mnemonic,
    Description,
    State,
    County,
    Operator,
    ApiNumber,
    Year,
    Date,
    UnitFilteredMnemonic,
}

const ATTRIBUTE_PATTERNS: &[(AttributeKind, &[&str])] = &[
    (AttributeKind::UnitFilteredMnemonic, &["unit", "units"]),
    (AttributeKind::Well, &["which well", "what well", "well name", "well id"]),
    (AttributeKind::Domain, &["what domain", "which domain"]),
    (AttributeKind::SiteCode, &["site code", "site id", "site number"]),
    (AttributeKind::SiteName, &["site name", "name of the site"]),
    (AttributeKind::Mnemonic, &["mnemonic"]),
    (AttributeKind::Description, &["description", "describe the curve", "what does it measure"]),
    (AttributeKind::State, &["what state", "which state"]),
    (AttributeKind::County, &["what county", "which county"]),
    (AttributeKind::Operator, &["operator", "operated by"]),
    (AttributeKind::ApiNumber, &["api number", "api no"]),
    (AttributeKind::Year, &["what year", "which year"]),
    (AttributeKind::Date, &["what date", "which date"]),
];

/// `detect_attribute_query` ported as a linear table scan: first pattern
/// whose keyword appears in the query wins. The unit-filtered-mnemonic
/// case additionally requires an ohm.m-style unit term alongside "unit(s)".
pub fn detect_attribute_query(query: &str) -> Option<AttributeKind> {
    let q = query.to_lowercase();
    for (kind, keywords) in ATTRIBUTE_PATTERNS {
        if *kind == AttributeKind::UnitFilteredMnemonic {
            let has_unit_term = q.contains("ohm.m") || q.contains("ohm m") || q.contains("ohm-m");
            if keywords.iter().any(|k| q.contains(k)) && has_unit_term {
                return Some(*kind);
            }
            continue;
        }
        if keywords.iter().any(|k| q.contains(k)) {
            return Some(*kind);
        }
    }
    None
}

pub fn should_use_structured_extraction(query: &str, is_aggregation: bool) -> bool {
    if is_aggregation {
        return false;
    }
    let q = query.to_lowercase();
    if COMPLEX_REASONING_KEYWORDS.iter().any(|k| q.contains(k)) {
        return false;
    }
    detect_attribute_query(query).is_some()
}

static LOCATION_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^LOCATION:\s*(.+)$").unwrap());

fn node_unit_is_ohm_m(node: &crate::graph::Node) -> bool {
    node.attribute("unit")
        .and_then(crate::graph::AttributeValue::coerce_string)
        .map(|unit| normalize_unit2(&unit) == "ohm.m")
        .unwrap_or(false)
}

fn extract_unit_filtered_mnemonics(documents: &[Document], traverser: &GraphTraverser) -> Option<String> {
    let mut mnemonics: Vec<String> = traverser
        .nodes()
        .filter(|n| n.kind == "las_curve")
        .filter(|n| node_unit_is_ohm_m(n))
        .filter_map(|n| n.mnemonic())
        .collect();
    if mnemonics.is_empty() {
        for doc in documents {
            if let Some(unit) = doc.attribute_string("unit") {
                if normalize_unit2(&unit) == "ohm.m" {
                    if let Some(m) = doc.attribute_string("mnemonic") {
                        mnemonics.push(m.to_uppercase());
                    }
                }
            }
        }
    }
    mnemonics.sort();
    mnemonics.dedup();
    if mnemonics.is_empty() {
        None
    } else {
        Some(format!("Mnemonics measured in ohm.m: {}.", mnemonics.join(", ")))
    }
}

fn extract_temporal_attribute(kind: AttributeKind, documents: &[Document]) -> Option<String> {
    let field = match kind {
        AttributeKind::Year => "year",
        AttributeKind::Date => "date",
        _ => return None,
    };
    let value = documents.iter().find_map(|d| d.attribute_string(field))?;
    Some(value)
}

fn extract_state_attribute(documents: &[Document]) -> Option<String> {
    for doc in documents {
        if let Some(value) = doc.attribute_string("state") {
            if let Some((_, full)) = US_STATES.iter().find(|(abbr, _)| abbr.eq_ignore_ascii_case(&value)) {
                return Some(format!("{value} ({full})"));
            }
            return Some(value);
        }
    }
    for doc in documents {
        if let Some(text) = doc.semantic_text().or_else(|| doc.text()) {
            for line in text.lines() {
                if let Some(caps) = LOCATION_LINE_RE.captures(line) {
                    return Some(caps[1].trim().to_string());
                }
            }
        }
    }
    None
}

fn extract_location_attribute(query: &str, documents: &[Document]) -> Option<String> {
    let q = query.to_lowercase();
    if !(q.contains("where") || q.contains("located")) {
        return None;
    }
    for doc in documents {
        if let Some(text) = doc.semantic_text().or_else(|| doc.text()) {
            for line in text.lines() {
                if let Some(caps) = LOCATION_LINE_RE.captures(line) {
                    return Some(caps[1].trim().to_string());
                }
            }
        }
    }
    None
}

fn extract_well_attribute(well_id_filter: Option<&str>, traverser: &GraphTraverser) -> Option<String> {
    let well_id = well_id_filter?;
    let node_id = crate::retrieval::normalize_well_node_id(well_id);
    let node = traverser.get_node(&node_id)?;
    node.attribute("WELL").and_then(crate::graph::AttributeValue::coerce_string).or_else(|| Some(node.id.clone()))
}

fn extract_mnemonic_with_descriptions(documents: &[Document]) -> Option<String> {
    let mut pairs = Vec::new();
    for doc in documents {
        if let (Some(mnemonic), Some(description)) =
            (doc.attribute_string("mnemonic"), doc.attribute_string("description"))
        {
            pairs.push(format!("{mnemonic}: {description}"));
        }
    }
    if pairs.is_empty() {
        None
    } else {
        pairs.sort();
        pairs.dedup();
        Some(pairs.join("; "))
    }
}

fn extract_generic_attribute(query: &str, documents: &[Document]) -> Option<String> {
    let field = extract_field_from_query(query, documents)?;
    let mut values: Vec<String> = documents.iter().filter_map(|d| d.attribute_string(&field)).collect();
    values.sort();
    values.dedup();
    match values.len() {
        0 => None,
        1 => Some(values.into_iter().next().unwrap()),
        n if n <= 5 => Some(values.join(", ")),
        n => Some(format!("{n} different values found: {}", values.join(", "))),
    }
}

/// Run the seven ordered sub-strategies against the retrieved documents,
/// returning the first one that produces an answer.
pub fn structured_extraction_answer(
    query: &str,
    attribute_kind: AttributeKind,
    documents: &[Document],
    traverser: &GraphTraverser,
    well_id_filter: Option<&str>,
) -> Option<String> {
    if attribute_kind == AttributeKind::Well {
        if let Some(answer) = extract_well_attribute(well_id_filter, traverser) {
            return Some(answer);
        }
    }

    if attribute_kind == AttributeKind::UnitFilteredMnemonic {
        if let Some(answer) = extract_unit_filtered_mnemonics(documents, traverser) {
            return Some(answer);
        }
    }

    extract_temporal_attribute(attribute_kind, documents)
        .or_else(|| extract_state_attribute(documents))
        .or_else(|| extract_location_attribute(query, documents))
        .or_else(|| extract_well_attribute(well_id_filter, traverser))
        .or_else(|| extract_mnemonic_with_descriptions(documents))
        .or_else(|| extract_generic_attribute(query, documents))
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
    fn detects_state_attribute_query() {
        assert_eq!(detect_attribute_query("what state is this well in?"), Some(AttributeKind::State));
    }

    #[test]
    fn complex_reasoning_keyword_disables_structured_extraction() {
        assert!(!should_use_structured_extraction("why does NPHI read high here?", false));
    }

    #[test]
    fn aggregation_queries_never_use_structured_extraction() {
        assert!(!should_use_structured_extraction("what state is this well in?", true));
    }

    #[test]
    fn state_attribute_expands_abbreviation() {
        let docs = vec![doc(json!({"state": "ND"}))];
        let answer = extract_state_attribute(&docs).unwrap();
        assert!(answer.contains("North Dakota"));
    }

    #[test]
    fn generic_attribute_summarizes_many_values() {
        let docs: Vec<Document> = (0..8).map(|i| doc(json!({"operator": format!("Op{i}")}))).collect();
        let answer = extract_generic_attribute("who operates these?", &docs).unwrap();
        assert!(answer.starts_with("8 different values found"));
    }

    #[test]
    fn structured_extraction_answer_falls_back_through_strategies() {
        let docs = vec![doc(json!({"mnemonic": "GR", "description": "gamma ray log"}))];
        let answer =
            structured_extraction_answer("describe the curve", AttributeKind::Description, &docs, &empty_traverser(), None);
        assert_eq!(answer.as_deref(), Some("GR: gamma ray log"));
    }

    #[test]
    fn unit_filtered_mnemonic_path_does_not_preempt_other_attribute_kinds() {
        let nodes = vec![crate::graph::Node {
            id: "force2020-well-15_9-13-curve-rdep".to_string(),
            kind: "las_curve".to_string(),
            attributes: {
                let mut m = std::collections::HashMap::new();
                m.insert("unit".to_string(), crate::graph::AttributeValue::from_json(&json!("ohm.m")));
                m
            },
        }];
        let traverser = GraphTraverser::new(Graph { nodes, edges: vec![] });
        let docs = vec![doc(json!({"state": "ND"}))];
        let answer = structured_extraction_answer("what state is this well in?", AttributeKind::State, &docs, &traverser, None);
        assert_eq!(answer.as_deref(), Some("ND (North Dakota)"));
    }
}

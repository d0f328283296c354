use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::vector::Document;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9_]+").unwrap());

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "of", "for", "what", "which", "how", "many", "list",
    "all", "show", "in", "on", "at", "to", "and", "or", "do", "does", "this", "that",
];

/// Domain fields preferred over an arbitrary candidate match, in priority order.
const DOMAIN_PRIORITY: &[&str] = &[
    "production", "oil", "gas", "mnemonic", "curve", "well", "region", "site", "operator",
    "county", "state", "unit", "value", "depth", "date", "year", "month",
];

fn query_tokens(query: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(&query.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn candidate_fields(documents: &[Document]) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();
    for doc in documents {
        fields.extend(doc.candidate_fields());
    }
    fields
}

/// Infer the document field the query is most likely asking about, trying
/// three strategies in order: exact token-to-field match, shortest
/// substring match (tokens of at least 3 characters), then a fixed
/// domain-keyword priority list matched against field names. Deterministic
/// given a fixed document set, since candidate fields are collected into a
/// `BTreeSet` rather than an unordered set.
pub fn extract_field_from_query(query: &str, documents: &[Document]) -> Option<String> {
    let fields = candidate_fields(documents);
    if fields.is_empty() {
        return None;
    }
    let tokens = query_tokens(query);

    for token in &tokens {
        if fields.contains(token) {
            return Some(token.clone());
        }
    }

    let mut best_substring: Option<&String> = None;
    for token in tokens.iter().filter(|t| t.len() >= 3) {
        for field in &fields {
            if field.contains(token.as_str()) || token.contains(field.as_str()) {
                if best_substring.map(|b| field.len() < b.len()).unwrap_or(true) {
                    best_substring = Some(field);
                }
            }
        }
    }
    if let Some(field) = best_substring {
        return Some(field.clone());
    }

    for keyword in DOMAIN_PRIORITY {
        if let Some(field) = fields.iter().find(|f| f.contains(keyword)) {
            return Some(field.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: serde_json::Value) -> Document {
        Document::new(fields.as_object().unwrap().clone())
    }

    #[test]
    fn exact_token_match_wins() {
        let docs = vec![doc(json!({"operator": "Equinor", "state": "ND"}))];
        assert_eq!(extract_field_from_query("what operator runs this well?", &docs), Some("operator".to_string()));
    }

    #[test]
    fn substring_match_when_no_exact_token() {
        let docs = vec![doc(json!({"operator_name": "Equinor"}))];
        assert_eq!(extract_field_from_query("what operator is listed?", &docs), Some("operator_name".to_string()));
    }

    #[test]
    fn domain_priority_fallback() {
        let docs = vec![doc(json!({"mnemonic": "GR", "unrelated_field": "x"}))];
        assert_eq!(extract_field_from_query("tell me about this", &docs), Some("mnemonic".to_string()));
    }

    #[test]
    fn no_documents_yields_none() {
        assert_eq!(extract_field_from_query("what operator?", &[]), None);
    }
}

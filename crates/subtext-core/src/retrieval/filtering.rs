use once_cell::sync::Lazy;
use regex::Regex;

use crate::retrieval::config as cfg;
use crate::retrieval::reranker::rerank;
use crate::retrieval::state::Metadata;
use crate::vector::Document;

static CONTAINS_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)contain(?:s)?\s+(?:the word\s+)?(\w+)").unwrap());
static WITH_IN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)with\s+(\w+)\s+in\s+(?:the\s+)?(?:name|mnemonic)").unwrap());
static CALLED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcalled\s+(\w+)").unwrap());
static NAMED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bnamed\s+(\w+)").unwrap());

/// Keywords the query explicitly demands appear in a document's text,
/// extracted via the same four surface patterns as the source system's
/// `_extract_critical_keywords`.
pub fn extract_critical_keywords(query: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    for re in [&*CONTAINS_WORD_RE, &*WITH_IN_NAME_RE, &*CALLED_RE, &*NAMED_RE] {
        for cap in re.captures_iter(query) {
            keywords.push(cap[1].to_lowercase());
        }
    }
    keywords
}

fn document_matches_keywords(doc: &Document, keywords: &[String], or_semantics: bool) -> bool {
    let haystack = doc.best_text().to_lowercase();
    if or_semantics {
        keywords.iter().any(|k| haystack.contains(k.as_str()))
    } else {
        keywords.iter().all(|k| haystack.contains(k.as_str()))
    }
}

/// Apply the keyword filter, the well-id filter, and truncation (in that
/// order), falling back to a reranked top-5 of the pre-filter set if
/// filtering empties an originally non-empty result.
pub fn apply_filters(
    query: &str,
    documents: Vec<Document>,
    well_id_filter: Option<&str>,
    relationship_confidence: f64,
    metadata: &mut Metadata,
) -> Vec<Document> {
    let pre_filter = documents.clone();
    let mut filtered = documents;
    let mut any_filter_fired = false;

    let keywords = extract_critical_keywords(query);
    if !keywords.is_empty() {
        any_filter_fired = true;
        let or_semantics = cfg::should_use_or_logic(relationship_confidence, well_id_filter.is_some());
        filtered.retain(|doc| document_matches_keywords(doc, &keywords, or_semantics));
    }

    if let Some(well_id) = well_id_filter {
        any_filter_fired = true;
        filtered.retain(|doc| doc.contains_id_like(well_id));
    }

    if any_filter_fired {
        filtered.truncate(cfg::MAX_FILTERED_RESULTS);
    }

    if any_filter_fired && filtered.is_empty() && !pre_filter.is_empty() {
        metadata.log("filter emptied results; falling back to reranked top 5 of pre-filter set");
        metadata.filter_fallback_applied = true;
        filtered = rerank(query, pre_filter, relationship_confidence, 5);
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(text: &str, id: &str) -> Document {
        let mut map = json!({ "text": text }).as_object().unwrap().clone();
        map.insert("_id".to_string(), json!(id));
        Document::new(map)
    }

    #[test]
    fn extracts_keyword_from_contains_the_word() {
        let kws = extract_critical_keywords("wells that contain the word Sleipner");
        assert_eq!(kws, vec!["sleipner".to_string()]);
    }

    #[test]
    fn extracts_keyword_from_named() {
        let kws = extract_critical_keywords("the curve named GR");
        assert_eq!(kws, vec!["gr".to_string()]);
    }

    #[test]
    fn and_semantics_requires_all_keywords_present() {
        let docs = vec![doc("alpha only", "1"), doc("alpha and beta", "2")];
        let mut metadata = Metadata::default();
        // AND semantics simulated directly since extract_critical_keywords only
        // yields one keyword per query pattern in practice; exercise via apply_filters
        // with a query containing two distinct trigger phrases.
        let filtered = apply_filters(
            "wells that contain the word alpha and contain the word beta",
            docs,
            None,
            0.0,
            &mut metadata,
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id(), Some("2"));
    }

    #[test]
    fn well_id_filter_retains_matching_documents_only() {
        let docs = vec![doc("well a", "force2020-well-15_9-13"), doc("well b", "force2020-well-16_1-2")];
        let mut metadata = Metadata::default();
        let filtered = apply_filters("curves for well 15_9-13", docs, Some("15_9-13"), 0.0, &mut metadata);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id(), Some("force2020-well-15_9-13"));
    }

    #[test]
    fn fallback_fires_when_filter_empties_a_non_empty_result() {
        let docs = vec![doc("well a", "1"), doc("well b", "2")];
        let mut metadata = Metadata::default();
        let filtered = apply_filters("wells that contain the word zzz_nonexistent", docs, None, 0.0, &mut metadata);
        assert!(!filtered.is_empty());
        assert!(metadata.decision_log.iter().any(|l| l.contains("fallback") || l.contains("falling back")));
        assert!(metadata.filter_fallback_applied);
    }

    #[test]
    fn fallback_flag_stays_unset_when_no_filter_fires() {
        let docs = vec![doc("well a", "1"), doc("well b", "2")];
        let mut metadata = Metadata::default();
        apply_filters("what curves are available?", docs, None, 0.0, &mut metadata);
        assert!(!metadata.filter_fallback_applied);
    }

    #[test]
    fn truncates_to_max_filtered_results_when_a_filter_fires() {
        let docs: Vec<Document> = (0..20).map(|i| doc("contains alpha", &i.to_string())).collect();
        let mut metadata = Metadata::default();
        let filtered = apply_filters("wells that contain the word alpha", docs, None, 0.0, &mut metadata);
        assert!(filtered.len() <= cfg::MAX_FILTERED_RESULTS);
    }
}

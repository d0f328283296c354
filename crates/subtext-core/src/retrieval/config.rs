//! Fixed thresholds and limits governing the retrieval pipeline.
//!
//! Ported directly from the constants the original system centralized for
//! the same purpose: keep magic numbers for retrieval/filtering/reranking
//! out of the logic that uses them. These are deliberately not part of
//! [`crate::config::Settings`] — they describe the shape of a single
//! request's retrieval behavior, not deployment configuration.

/// Default number of documents pulled from the initial vector search.
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 100;
/// Initial vector search limit for aggregation queries, which need broad recall.
pub const AGGREGATION_INITIAL_LIMIT: usize = 1000;
/// Hard cap on documents paged in for an aggregation query.
pub const AGGREGATION_MAX_DOCUMENTS: usize = 5000;
/// Initial vector search limit for COUNT fast-path queries.
pub const COUNT_QUERY_RETRIEVAL_LIMIT: usize = 100;

/// Reranked result count when relationship confidence is high.
pub const HIGH_CONFIDENCE_TOP_K: usize = 30;
/// Reranked result count at medium relationship confidence.
pub const MEDIUM_CONFIDENCE_TOP_K: usize = 18;
/// Reranked result count when confidence is low or absent.
pub const LOW_CONFIDENCE_TOP_K: usize = 15;

/// Vector-score weight used in hybrid reranking at high confidence.
pub const HIGH_CONFIDENCE_VECTOR_WEIGHT: f64 = 0.6;
/// Keyword-score weight used in hybrid reranking at high confidence.
pub const HIGH_CONFIDENCE_KEYWORD_WEIGHT: f64 = 0.4;
/// Default vector-score weight.
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.7;
/// Default keyword-score weight.
pub const DEFAULT_KEYWORD_WEIGHT: f64 = 0.3;

/// Relationship-confidence threshold above which the "high confidence" regime applies.
pub const HIGH_RELATIONSHIP_CONFIDENCE: f64 = 0.85;
/// Relationship-confidence threshold above which the "medium confidence" regime applies.
pub const MEDIUM_RELATIONSHIP_CONFIDENCE: f64 = 0.6;
/// Confidence threshold below which scope detection escalates to the LLM.
pub const SCOPE_CHECK_CONFIDENCE_THRESHOLD: f64 = 0.7;
/// Minimum relationship confidence required before graph traversal expansion runs.
pub const MIN_TRAVERSAL_CONFIDENCE: f64 = 0.6;

/// Maximum results retained after keyword/well-id filtering.
pub const MAX_FILTERED_RESULTS: usize = 15;

/// Default hop budget for graph traversal expansion.
pub const DEFAULT_MAX_HOPS: u32 = 1;
/// Hop budget when expanding from a well seed toward its curves.
pub const WELL_TO_CURVES_MAX_HOPS: u32 = 2;
/// Hop budget when expanding from a curve seed toward its well.
pub const CURVE_TO_WELL_MAX_HOPS: u32 = 2;

/// Token budget for aggregation-answer generation.
pub const AGGREGATION_MAX_TOKENS: u32 = 256;
/// Token budget for ordinary generation.
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Adaptive `top_k` based on relationship confidence, unless `override_k` is set.
pub fn top_k(relationship_confidence: f64, override_k: Option<usize>) -> usize {
    if let Some(k) = override_k {
        return k;
    }
    if relationship_confidence >= HIGH_RELATIONSHIP_CONFIDENCE {
        HIGH_CONFIDENCE_TOP_K
    } else if relationship_confidence >= MEDIUM_RELATIONSHIP_CONFIDENCE {
        MEDIUM_CONFIDENCE_TOP_K
    } else {
        LOW_CONFIDENCE_TOP_K
    }
}

/// Vector/keyword weight pair for hybrid reranking at the given confidence.
pub fn reranking_weights(relationship_confidence: f64) -> (f64, f64) {
    if relationship_confidence >= HIGH_RELATIONSHIP_CONFIDENCE {
        (HIGH_CONFIDENCE_VECTOR_WEIGHT, HIGH_CONFIDENCE_KEYWORD_WEIGHT)
    } else {
        (DEFAULT_VECTOR_WEIGHT, DEFAULT_KEYWORD_WEIGHT)
    }
}

/// Whether keyword/well filtering should OR its predicates together rather than AND them.
pub fn should_use_or_logic(relationship_confidence: f64, well_id_present: bool) -> bool {
    relationship_confidence >= HIGH_RELATIONSHIP_CONFIDENCE || well_id_present
}

/// Initial vector-search limit and optional max-documents cap for a query.
pub fn retrieval_limits(
    is_aggregation: bool,
    metadata_limit: Option<usize>,
    metadata_max: Option<usize>,
) -> (usize, Option<usize>) {
    if is_aggregation {
        (AGGREGATION_INITIAL_LIMIT, Some(metadata_max.unwrap_or(AGGREGATION_MAX_DOCUMENTS)))
    } else {
        (metadata_limit.unwrap_or(DEFAULT_RETRIEVAL_LIMIT), None)
    }
}

/// Hop budget for graph traversal expansion given the detected relationship type
/// and the entity kinds of the seed nodes.
pub fn traversal_hops(relation_type: Option<&str>, seed_kinds: &[String]) -> u32 {
    match relation_type {
        Some("well_to_curves") if seed_kinds.iter().any(|k| k == "las_curve") => WELL_TO_CURVES_MAX_HOPS,
        Some("curve_to_well") if seed_kinds.iter().any(|k| k == "las_document") => CURVE_TO_WELL_MAX_HOPS,
        _ => DEFAULT_MAX_HOPS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_tiers_match_confidence_bands() {
        assert_eq!(top_k(0.9, None), HIGH_CONFIDENCE_TOP_K);
        assert_eq!(top_k(0.7, None), MEDIUM_CONFIDENCE_TOP_K);
        assert_eq!(top_k(0.1, None), LOW_CONFIDENCE_TOP_K);
        assert_eq!(top_k(0.1, Some(7)), 7);
    }

    #[test]
    fn traversal_hops_respect_seed_kinds() {
        assert_eq!(traversal_hops(Some("well_to_curves"), &["las_curve".to_string()]), WELL_TO_CURVES_MAX_HOPS);
        assert_eq!(traversal_hops(Some("well_to_curves"), &["las_document".to_string()]), DEFAULT_MAX_HOPS);
        assert_eq!(traversal_hops(None, &[]), DEFAULT_MAX_HOPS);
    }
}

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::retrieval::config as cfg;
use crate::vector::Document;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

fn tokens(text: &str) -> HashSet<String> {
    TOKEN_RE.find_iter(&text.to_lowercase()).map(|m| m.as_str().to_string()).collect()
}

fn keyword_overlap(query_tokens: &HashSet<String>, doc_text: &str) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let doc_tokens = tokens(doc_text);
    let overlap = query_tokens.intersection(&doc_tokens).count();
    overlap as f64 / query_tokens.len() as f64
}

/// Hybrid-rerank `documents` (already in vector-store rank order) against
/// `query`, returning the top `top_k` by combined score. The sort is
/// stable, so documents tied on score keep their original relative order —
/// satisfying the reranking-stability invariant without extra bookkeeping.
pub fn rerank(query: &str, documents: Vec<Document>, relationship_confidence: f64, top_k: usize) -> Vec<Document> {
    let (w_vector, w_keyword) = cfg::reranking_weights(relationship_confidence);
    let query_tokens = tokens(query);
    let n = documents.len().max(1) as f64;

    let mut scored: Vec<(f64, Document)> = documents
        .into_iter()
        .enumerate()
        .map(|(rank, doc)| {
            let vector_rank_score = 1.0 - (rank as f64) / n;
            let overlap = keyword_overlap(&query_tokens, &doc.best_text());
            let combined = w_vector * vector_rank_score + w_keyword * overlap;
            (combined, doc)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(top_k).map(|(_, doc)| doc).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(text: &str) -> Document {
        Document::new(json!({ "text": text }).as_object().unwrap().clone())
    }

    #[test]
    fn keyword_overlap_is_fraction_of_query_tokens_present() {
        let q = tokens("gamma ray curve");
        assert_eq!(keyword_overlap(&q, "the gamma ray log"), 2.0 / 3.0);
    }

    #[test]
    fn rerank_is_stable_on_ties() {
        let docs = vec![doc("unrelated text"), doc("more unrelated text")];
        let reranked = rerank("zzz nonexistent", docs.clone(), 0.0, 10);
        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0], docs[0]);
        assert_eq!(reranked[1], docs[1]);
    }

    #[test]
    fn rerank_truncates_to_top_k() {
        let docs = (0..5).map(|i| doc(&format!("doc {i}"))).collect();
        let reranked = rerank("doc", docs, 0.0, 2);
        assert_eq!(reranked.len(), 2);
    }

    #[test]
    fn rerank_prefers_higher_keyword_overlap_at_equal_rank_weighting() {
        let docs = vec![doc("completely unrelated filler"), doc("gamma ray nphi rhob curve")];
        let reranked = rerank("gamma ray nphi rhob", docs, 0.0, 2);
        assert!(reranked[0].best_text().contains("gamma ray nphi rhob curve"));
    }
}

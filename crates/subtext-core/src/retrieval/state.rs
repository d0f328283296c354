use std::collections::BTreeMap;

use crate::graph::TraversalDirection;
use crate::vector::Document;

/// Closed set of aggregation intents a query can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    Count,
    List,
    Distinct,
    Sum,
    Max,
    Min,
    Range,
    Comparison,
}

impl AggregationType {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationType::Count => "COUNT",
            AggregationType::List => "LIST",
            AggregationType::Distinct => "DISTINCT",
            AggregationType::Sum => "SUM",
            AggregationType::Max => "MAX",
            AggregationType::Min => "MIN",
            AggregationType::Range => "RANGE",
            AggregationType::Comparison => "COMPARISON",
        }
    }
}

/// Closed set of well/site-relationship shapes the query analyzer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipType {
    WellToCurves,
    CurveToWell,
    SiteToMeasurements,
    MeasurementToSite,
    CurveToDocument,
}

/// Derived traversal parameters for `GraphTraversalExpansionStage`.
#[derive(Debug, Clone)]
pub struct TraversalStrategy {
    pub apply_traversal: bool,
    pub max_hops: u32,
    pub direction: Option<TraversalDirection>,
    pub edge_type: Option<String>,
}

/// Output of relationship-query detection: which relationship (if any) the
/// query resembles, which entities were recognized in it, and a confidence
/// score in `[0, 1]` reflecting how strongly the query resembles a
/// relational traversal rather than a plain lookup.
#[derive(Debug, Clone)]
pub struct RelationshipDetection {
    pub relationship_type: Option<RelationshipType>,
    pub confidence: f64,
    pub well_ids: Vec<String>,
    pub site_codes: Vec<String>,
    pub mnemonics: Vec<String>,
    pub traversal_strategy: TraversalStrategy,
}

impl RelationshipDetection {
    pub fn none() -> Self {
        Self {
            relationship_type: None,
            confidence: 0.0,
            well_ids: Vec::new(),
            site_codes: Vec::new(),
            mnemonics: Vec::new(),
            traversal_strategy: TraversalStrategy {
                apply_traversal: false,
                max_hops: 0,
                direction: None,
                edge_type: None,
            },
        }
    }

    pub fn is_relationship_query(&self) -> bool {
        self.relationship_type.is_some()
    }
}

/// Append-only log of recoverable failures surfaced during a single query,
/// mirroring `_record_workflow_error` in the source system.
#[derive(Debug, Clone)]
pub struct WorkflowError {
    pub kind: String,
    pub message: String,
}

/// Outcome of an aggregation strategy: either a directly-answerable scalar
/// (COUNT/MAX/MIN/COMPARISON) or a formatted context string to be handed to
/// the generation client (LIST/DISTINCT/SUM/RANGE).
#[derive(Debug, Clone)]
pub enum AggregationResult {
    Direct(String),
    NeedsGeneration { formatted_context: String },
}

/// Per-query decisions threaded between pipeline stages and reasoning
/// strategies. A typed struct rather than a free-form map: every field here
/// corresponds to a key the original system's dict-based metadata actually
/// has a reader for.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub query_embedding: Option<Vec<f32>>,
    pub detected_aggregation_type: Option<AggregationType>,
    pub relationship_detection: Option<RelationshipDetection>,
    pub auto_filter: Option<BTreeMap<String, String>>,
    pub well_id_filter: Option<String>,

    pub vector_search_documents: Vec<Document>,
    pub initial_retrieval_count: usize,
    pub filter_applied: Option<BTreeMap<String, String>>,
    pub direct_count: Option<u64>,
    pub filter_fallback_applied: bool,

    pub reranked_documents: Vec<Document>,

    pub retrieved_documents: Vec<Document>,
    pub retrieved_node_ids: Vec<String>,
    pub retrieved_entity_types: Vec<String>,
    pub num_results: usize,
    pub initial_results: usize,
    pub reranked: bool,

    pub graph_traversal_applied: bool,
    pub num_results_after_traversal: Option<usize>,
    pub expansion_ratio: Option<f64>,

    pub decision_log: Vec<String>,
    pub errors: Vec<WorkflowError>,

    pub is_aggregation: bool,
    pub aggregation_result: Option<AggregationResult>,

    pub structured_extraction: bool,
    pub relationship_structured_answer: bool,

    pub scope_in_scope: Option<bool>,
    pub scope_category: Option<String>,
    pub scope_confidence: Option<f64>,
    pub defusion_applied: bool,
    pub domain_rule_applied: bool,

    pub expanded_query: Option<String>,
    pub query_expanded: bool,

    pub curve_count: Option<usize>,
}

impl Metadata {
    pub fn record_error(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        self.errors.push(WorkflowError { kind: kind.into(), message: message.into() });
    }

    pub fn log(&mut self, entry: impl Into<String>) {
        self.decision_log.push(entry.into());
    }

    pub fn relationship_confidence(&self) -> f64 {
        self.relationship_detection.as_ref().map(|r| r.confidence).unwrap_or(0.0)
    }
}

/// Pipeline-scoped, per-query mutable state. A fresh instance is created on
/// query ingress and discarded on response; never shared across queries.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub query: String,
    pub retrieved: Vec<String>,
    pub response: Option<String>,
    pub metadata: Metadata,
}

impl WorkflowState {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), retrieved: Vec::new(), response: None, metadata: Metadata::default() }
    }

    /// Insert a synthesized summary line ahead of whatever is already
    /// retrieved, preserving the response-totality invariant when a
    /// strategy answers from structured data without touching retrieval.
    pub fn prepend_summary(&mut self, summary: impl Into<String>) {
        self.retrieved.insert(0, summary.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_no_response_and_empty_retrieval() {
        let state = WorkflowState::new("how many wells are there?");
        assert!(state.response.is_none());
        assert!(state.retrieved.is_empty());
    }

    #[test]
    fn prepend_summary_keeps_existing_entries_after_it() {
        let mut state = WorkflowState::new("q");
        state.retrieved.push("original".to_string());
        state.prepend_summary("summary");
        assert_eq!(state.retrieved, vec!["summary".to_string(), "original".to_string()]);
    }
}

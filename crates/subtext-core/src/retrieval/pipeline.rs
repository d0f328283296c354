use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::graph::{GraphTraverser, Node, TraversalDirection};
use crate::retrieval::config as cfg;
use crate::retrieval::filtering::apply_filters;
use crate::retrieval::query_analysis::analyze;
use crate::retrieval::query_expansion::{expand_query_with_synonyms, should_expand_query};
use crate::retrieval::reranker::rerank;
use crate::retrieval::state::{RelationshipType, WorkflowState};
use crate::vector::{Document, EmbeddingClient, VectorStoreClient};

/// Everything a pipeline stage needs beyond the per-query `WorkflowState`.
pub struct PipelineContext {
    pub embedding_client: Arc<dyn EmbeddingClient>,
    pub vector_store: Arc<dyn VectorStoreClient>,
    pub traverser: Arc<GraphTraverser>,
    pub collection: String,
    pub caller_entity_filter: Option<String>,
    pub caller_retrieval_limit: Option<usize>,
    pub caller_top_k: Option<usize>,
    pub skip_count_sample: bool,
}

#[async_trait]
pub trait RetrievalStage: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, state: &mut WorkflowState, ctx: &PipelineContext) -> Result<()>;
}

/// Six-stage sequential pipeline run in the order the stages are registered.
pub struct RetrievalPipeline {
    stages: Vec<Box<dyn RetrievalStage>>,
}

impl RetrievalPipeline {
    pub fn new(stages: Vec<Box<dyn RetrievalStage>>) -> Self {
        Self { stages }
    }

    /// The default six-stage pipeline, in spec order.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(QueryAnalysisStage),
            Box::new(VectorSearchStage),
            Box::new(RerankingStage),
            Box::new(FilteringStage),
            Box::new(StateFinalizeStage),
            Box::new(GraphTraversalExpansionStage),
        ])
    }

    pub async fn run(&self, state: &mut WorkflowState, ctx: &PipelineContext) -> Result<()> {
        for stage in &self.stages {
            debug!(stage = stage.name(), query = %state.query, "running retrieval stage");
            if let Err(err) = stage.run(state, ctx).await {
                if stage.name() == "embedding" || stage.name() == "query_analysis_and_search" {
                    // No downstream stage can proceed without an embedding.
                    return Err(err);
                }
                warn!(stage = stage.name(), %err, "stage failed, continuing with partial state");
                state.metadata.record_error(stage.name(), err.to_string());
            }
        }
        Ok(())
    }
}

pub struct QueryAnalysisStage;

#[async_trait]
impl RetrievalStage for QueryAnalysisStage {
    fn name(&self) -> &'static str {
        "query_analysis"
    }

    async fn run(&self, state: &mut WorkflowState, ctx: &PipelineContext) -> Result<()> {
        let analysis = analyze(&state.query, ctx.caller_entity_filter.as_deref());
        state.metadata.is_aggregation = analysis.aggregation_type.is_some();
        state.metadata.detected_aggregation_type = analysis.aggregation_type;
        state.metadata.auto_filter = analysis.auto_filter;
        state.metadata.well_id_filter = analysis.well_id_filter;
        state.metadata.relationship_detection = Some(analysis.relationship);
        Ok(())
    }
}

pub struct VectorSearchStage;

#[async_trait]
impl RetrievalStage for VectorSearchStage {
    fn name(&self) -> &'static str {
        "query_analysis_and_search"
    }

    async fn run(&self, state: &mut WorkflowState, ctx: &PipelineContext) -> Result<()> {
        let is_aggregation = state.metadata.is_aggregation;
        let (initial_limit, max_documents) =
            cfg::retrieval_limits(is_aggregation, ctx.caller_retrieval_limit, None);

        let embed_text = if should_expand_query(&state.query) {
            let expanded = expand_query_with_synonyms(&state.query);
            state.metadata.query_expanded = true;
            state.metadata.expanded_query = Some(expanded.clone());
            expanded
        } else {
            state.query.clone()
        };
        let embedding = ctx.embedding_client.embed_one(&embed_text).await?;
        state.metadata.query_embedding = Some(embedding.clone());

        let filter = filter_to_json(state.metadata.auto_filter.as_ref());

        let mentions_specific_well = state.metadata.well_id_filter.is_some();
        let is_count = state.metadata.detected_aggregation_type == Some(crate::retrieval::state::AggregationType::Count);

        if is_count && !mentions_specific_well {
            let count = ctx.vector_store.count_documents(&ctx.collection, filter.as_ref()).await?;
            state.metadata.direct_count = Some(count);
            if !ctx.skip_count_sample {
                let sample_limit = initial_limit.min(100);
                let sample = ctx
                    .vector_store
                    .vector_search(&ctx.collection, &embedding, sample_limit, filter.as_ref(), None)
                    .await?;
                state.metadata.initial_retrieval_count = sample.len();
                state.metadata.vector_search_documents = sample;
            }
        } else {
            let documents = ctx
                .vector_store
                .vector_search(&ctx.collection, &embedding, initial_limit, filter.as_ref(), max_documents)
                .await?;
            state.metadata.initial_retrieval_count = documents.len();
            state.metadata.vector_search_documents = documents;
        }

        state.metadata.filter_applied = state.metadata.auto_filter.clone();
        Ok(())
    }
}

fn filter_to_json(filter: Option<&std::collections::BTreeMap<String, String>>) -> Option<Map<String, Value>> {
    filter.map(|m| m.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
}

pub struct RerankingStage;

#[async_trait]
impl RetrievalStage for RerankingStage {
    fn name(&self) -> &'static str {
        "reranking"
    }

    async fn run(&self, state: &mut WorkflowState, ctx: &PipelineContext) -> Result<()> {
        let confidence = state.metadata.relationship_confidence();
        let top_k = cfg::top_k(confidence, ctx.caller_top_k);
        let documents = std::mem::take(&mut state.metadata.vector_search_documents);
        state.metadata.reranked_documents = rerank(&state.query, documents, confidence, top_k);
        Ok(())
    }
}

pub struct FilteringStage;

#[async_trait]
impl RetrievalStage for FilteringStage {
    fn name(&self) -> &'static str {
        "filtering"
    }

    async fn run(&self, state: &mut WorkflowState, _ctx: &PipelineContext) -> Result<()> {
        let confidence = state.metadata.relationship_confidence();
        let well_id = state.metadata.well_id_filter.clone();
        let documents = state.metadata.reranked_documents.clone();
        let query = state.query.clone();
        let mut metadata = std::mem::take(&mut state.metadata);
        let filtered = apply_filters(&query, documents, well_id.as_deref(), confidence, &mut metadata);
        metadata.reranked_documents = filtered;
        state.metadata = metadata;
        Ok(())
    }
}

pub struct StateFinalizeStage;

#[async_trait]
impl RetrievalStage for StateFinalizeStage {
    fn name(&self) -> &'static str {
        "state_finalize"
    }

    async fn run(&self, state: &mut WorkflowState, _ctx: &PipelineContext) -> Result<()> {
        let documents = std::mem::take(&mut state.metadata.reranked_documents);
        state.retrieved = documents.iter().map(Document::best_text).collect();
        state.metadata.retrieved_node_ids = documents.iter().filter_map(|d| d.id().map(str::to_string)).collect();
        state.metadata.retrieved_entity_types =
            documents.iter().filter_map(|d| d.entity_type().map(str::to_string)).collect();
        state.metadata.num_results = documents.len();
        state.metadata.initial_results = state.metadata.initial_retrieval_count;
        state.metadata.reranked = true;
        state.metadata.retrieved_documents = documents;
        Ok(())
    }
}

pub struct GraphTraversalExpansionStage;

#[async_trait]
impl RetrievalStage for GraphTraversalExpansionStage {
    fn name(&self) -> &'static str {
        "graph_traversal_expansion"
    }

    async fn run(&self, state: &mut WorkflowState, ctx: &PipelineContext) -> Result<()> {
        let Some(relationship) = state.metadata.relationship_detection.clone() else { return Ok(()) };
        if !relationship.traversal_strategy.apply_traversal || relationship.confidence < cfg::MIN_TRAVERSAL_CONFIDENCE
        {
            return Ok(());
        }

        let seeds: Vec<Node> = if relationship.relationship_type == Some(RelationshipType::WellToCurves)
            && state.metadata.well_id_filter.is_some()
        {
            let well_id = normalize_well_node_id(state.metadata.well_id_filter.as_deref().unwrap());
            match ctx.traverser.get_node(&well_id) {
                Some(node) => vec![node.clone()],
                None => seeds_from_documents(&state.metadata.retrieved_documents),
            }
        } else {
            seeds_from_documents(&state.metadata.retrieved_documents)
        };

        if seeds.is_empty() {
            return Ok(());
        }

        let seed_refs: Vec<&Node> = seeds.iter().collect();
        let direction = resolve_direction(&relationship, &seeds);
        let expanded = ctx.traverser.expand_search_results(&seed_refs, direction, relationship.traversal_strategy.max_hops);

        let before = state.metadata.num_results;
        let existing_ids: std::collections::HashSet<String> =
            state.metadata.retrieved_node_ids.iter().cloned().collect();
        let mut new_ids = Vec::new();
        let mut expanded_nodes = Vec::new();
        for node in &expanded {
            if !existing_ids.contains(&node.id) {
                new_ids.push(node.id.clone());
                expanded_nodes.push((*node).clone());
            }
        }

        let fetched = if new_ids.is_empty() {
            Vec::new()
        } else {
            ctx.vector_store.batch_fetch_by_ids(&ctx.collection, &new_ids, None).await.unwrap_or_default()
        };
        let fetched_ids: std::collections::HashSet<String> =
            fetched.iter().filter_map(|d| d.id().map(str::to_string)).collect();

        let mut retrieved_texts: Vec<String> = state.retrieved.clone();
        let mut retrieved_node_ids = state.metadata.retrieved_node_ids.clone();
        for doc in &fetched {
            retrieved_texts.push(doc.best_text());
        }
        for node in &expanded_nodes {
            if !fetched_ids.contains(node.id.as_str()) {
                retrieved_texts.push(synthesize_node_text(node));
            }
            retrieved_node_ids.push(node.id.clone());
        }

        state.retrieved = retrieved_texts;
        state.metadata.retrieved_node_ids = retrieved_node_ids;
        state.metadata.graph_traversal_applied = true;
        let after = state.retrieved.len();
        state.metadata.num_results_after_traversal = Some(after);
        state.metadata.expansion_ratio = Some(after as f64 / before.max(1) as f64);
        Ok(())
    }
}

fn resolve_direction(relationship: &crate::retrieval::state::RelationshipDetection, seeds: &[Node]) -> Option<TraversalDirection> {
    match relationship.relationship_type {
        Some(RelationshipType::WellToCurves) if seeds.iter().any(|n| n.kind == "las_curve") => {
            Some(TraversalDirection::Both)
        }
        Some(RelationshipType::CurveToWell) if seeds.iter().any(|n| n.kind == "las_document") => {
            Some(TraversalDirection::Both)
        }
        _ => relationship.traversal_strategy.direction,
    }
}

fn seeds_from_documents(documents: &[Document]) -> Vec<Node> {
    documents
        .iter()
        .filter_map(|doc| {
            let id = doc.id()?.to_string();
            let kind = doc.entity_type().unwrap_or("").to_string();
            let mut attributes = std::collections::HashMap::new();
            for field in doc.candidate_fields() {
                if let Some(value) = doc.attribute(&field) {
                    attributes.insert(field, crate::graph::AttributeValue::from_json(value));
                }
            }
            Some(Node { id, kind, attributes })
        })
        .collect()
}

fn synthesize_node_text(node: &Node) -> String {
    let mut lines = vec![format!("{}: {}", node.kind, node.id)];
    for (key, value) in &node.attributes {
        if let Some(display) = value.coerce_string() {
            lines.push(format!("- {key}: {display}"));
        }
    }
    lines.join("\n")
}

/// Prefix `force2020-well-` if the id doesn't already carry it, and strip
/// trailing punctuation a user might type after the id.
pub fn normalize_well_node_id(well_id: &str) -> String {
    let trimmed = well_id.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '_');
    if trimmed.starts_with("force2020-well-") {
        trimmed.to_string()
    } else {
        format!("force2020-well-{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_well_node_id_prefixes_when_missing() {
        assert_eq!(normalize_well_node_id("15_9-13"), "force2020-well-15_9-13");
    }

    #[test]
    fn normalize_well_node_id_is_idempotent() {
        let once = normalize_well_node_id("15_9-13");
        let twice = normalize_well_node_id(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_well_node_id_strips_trailing_punctuation() {
        assert_eq!(normalize_well_node_id("15_9-13?"), "force2020-well-15_9-13");
    }
}

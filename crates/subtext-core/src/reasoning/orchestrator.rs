use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::{Result, SubtextError};
use crate::graph::GraphTraverser;
use crate::reasoning::aggregation::{handle_aggregation, handle_relationship_aware_aggregation};
use crate::reasoning::attribute_extraction::{detect_attribute_query, should_use_structured_extraction, AttributeKind};
use crate::reasoning::domain_rules::apply_domain_rules;
use crate::reasoning::scope::{check_query_scope, generate_defusion_response};
use crate::reasoning::well_handlers::{WellHandlerInput, WellHandlerRegistry};
use crate::retrieval::{normalize_well_node_id, AggregationResult, WorkflowState};
use crate::vector::{DecodingMethod, GenerationClient, VectorStoreClient};

const AGGREGATION_MAX_TOKENS: u32 = 256;
const DEFAULT_MAX_TOKENS: u32 = 512;
const SCOPE_CHECK_CONFIDENCE_THRESHOLD: f64 = 0.7;

static UPPER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z0-9_]{2,}").unwrap());

/// Network clients and static resources a reasoning strategy may need.
pub struct ReasoningContext {
    pub generation_client: Arc<dyn GenerationClient>,
    pub vector_store: Arc<dyn VectorStoreClient>,
    pub collection: String,
    pub traverser: Arc<GraphTraverser>,
    pub prompt_template: String,
}

impl ReasoningContext {
    /// `{{question}}` / `{{context}}` placeholder template, falling back to
    /// a plain format when no template file was configured.
    pub fn format_prompt(&self, question: &str, context: &str) -> String {
        if self.prompt_template.contains("{{question}}") {
            self.prompt_template.replace("{{question}}", question).replace("{{context}}", context)
        } else {
            format!("Question: {question}\n\nContext:\n{context}")
        }
    }
}

#[async_trait]
pub trait ReasoningStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_handle(&self, state: &mut WorkflowState) -> bool;
    async fn execute(&self, state: &mut WorkflowState, ctx: &ReasoningContext) -> Result<()>;
}

pub struct ReasoningOrchestrator {
    strategies: Vec<Box<dyn ReasoningStrategy>>,
}

impl ReasoningOrchestrator {
    pub fn standard() -> Self {
        Self {
            strategies: vec![
                Box::new(OutOfScopeStrategy),
                Box::new(CurveCountStrategy),
                Box::new(WellCountStrategy),
                Box::new(RelationshipQueryStrategy),
                Box::new(StructuredExtractionStrategy),
                Box::new(AggregationStrategy),
                Box::new(DomainRulesStrategy),
                Box::new(LlmGenerationStrategy),
            ],
        }
    }

    pub async fn respond(&self, state: &mut WorkflowState, ctx: &ReasoningContext) -> Result<()> {
        for strategy in &self.strategies {
            if strategy.can_handle(state) {
                if let Err(err) = strategy.execute(state, ctx).await {
                    if strategy.name() == "llm_generation" {
                        return Err(err);
                    }
                    warn!(strategy = strategy.name(), %err, "reasoning strategy failed, falling through");
                    state.metadata.record_error(strategy.name(), err.to_string());
                    continue;
                }
                return Ok(());
            }
        }
        Ok(())
    }
}

struct OutOfScopeStrategy;

#[async_trait]
impl ReasoningStrategy for OutOfScopeStrategy {
    fn name(&self) -> &'static str {
        "out_of_scope"
    }

    fn can_handle(&self, state: &mut WorkflowState) -> bool {
        let check = check_query_scope(&state.query);
        let defuse = !check.in_scope && check.confidence > SCOPE_CHECK_CONFIDENCE_THRESHOLD;
        state.metadata.scope_in_scope = Some(check.in_scope);
        state.metadata.scope_category = check.category.clone();
        state.metadata.scope_confidence = Some(check.confidence);
        defuse
    }

    async fn execute(&self, state: &mut WorkflowState, _ctx: &ReasoningContext) -> Result<()> {
        let category = state.metadata.scope_category.clone().unwrap_or_else(|| "that topic".to_string());
        let message = generate_defusion_response(&category);
        state.prepend_summary(message.clone());
        state.response = Some(message);
        state.metadata.defusion_applied = true;
        Ok(())
    }
}

struct CurveCountStrategy;

#[async_trait]
impl ReasoningStrategy for CurveCountStrategy {
    fn name(&self) -> &'static str {
        "curve_count"
    }

    fn can_handle(&self, state: &mut WorkflowState) -> bool {
        let q = state.query.to_lowercase();
        q.contains("how many") && q.contains("curve") && !q.contains("underscore") && state.metadata.well_id_filter.is_some()
    }

    async fn execute(&self, state: &mut WorkflowState, ctx: &ReasoningContext) -> Result<()> {
        let well_id = state.metadata.well_id_filter.clone().unwrap();
        let node_id = normalize_well_node_id(&well_id);
        let count = ctx.traverser.curves_for_well_ids(&node_id).len();
        state.metadata.curve_count = Some(count);
        let message = format!("{count}");
        state.prepend_summary(message.clone());
        state.response = Some(message);
        Ok(())
    }
}

struct WellCountStrategy;

#[async_trait]
impl ReasoningStrategy for WellCountStrategy {
    fn name(&self) -> &'static str {
        "well_count"
    }

    fn can_handle(&self, state: &mut WorkflowState) -> bool {
        let q = state.query.to_lowercase();
        q.contains("how many") && q.contains("well") && state.metadata.well_id_filter.is_none()
    }

    async fn execute(&self, state: &mut WorkflowState, ctx: &ReasoningContext) -> Result<()> {
        let mut filter = serde_json::Map::new();
        filter.insert("entity_type".to_string(), serde_json::Value::String("las_document".to_string()));
        let count = ctx.vector_store.count_documents(&ctx.collection, Some(&filter)).await?;
        let message = format!("There are {count} wells.");
        state.prepend_summary(message.clone());
        state.response = Some(message);
        state.metadata.aggregation_result = Some(AggregationResult::Direct(message));
        Ok(())
    }
}

struct RelationshipQueryStrategy;

#[async_trait]
impl ReasoningStrategy for RelationshipQueryStrategy {
    fn name(&self) -> &'static str {
        "relationship_query"
    }

    fn can_handle(&self, state: &mut WorkflowState) -> bool {
        let q = state.query.to_lowercase();
        let is_relationship = state.metadata.relationship_detection.as_ref().map(|r| r.is_relationship_query()).unwrap_or(false);
        state.metadata.well_id_filter.is_some() || is_relationship || (q.contains("document") && q.contains("curve"))
    }

    async fn execute(&self, state: &mut WorkflowState, ctx: &ReasoningContext) -> Result<()> {
        if let Some(well_id) = state.metadata.well_id_filter.clone() {
            let node_id = normalize_well_node_id(&well_id);
            if let Some(well) = ctx.traverser.get_node(&node_id) {
                let input = WellHandlerInput::build(well, &state.query, &ctx.traverser);
                if let Some(answer) = WellHandlerRegistry::standard().dispatch(&input) {
                    state.prepend_summary(answer.clone());
                    state.response = Some(answer);
                    state.metadata.relationship_structured_answer = true;
                    return Ok(());
                }
            }
        }

        let mut matches: Vec<&str> = UPPER_TOKEN_RE.find_iter(&state.query).map(|m| m.as_str()).collect();
        matches.retain(|m| m.chars().any(|c| c.is_ascii_alphabetic()));
        for mnemonic in matches {
            let wells = ctx.traverser.wells_with_mnemonic(mnemonic);
            if wells.is_empty() {
                continue;
            }
            let well_id = wells[0];
            let node = ctx.traverser.get_node(well_id);
            let name = node.and_then(|n| n.attribute("WELL")).and_then(crate::graph::AttributeValue::coerce_string);
            let mut message = match name {
                Some(name) => format!("{name} (well ID: {well_id})"),
                None => well_id.to_string(),
            };
            if wells.len() > 1 {
                message.push_str(&format!(" (plus {} other matches)", wells.len() - 1));
            }
            state.prepend_summary(message.clone());
            state.response = Some(message);
            state.metadata.relationship_structured_answer = true;
            return Ok(());
        }

        Ok(())
    }
}

struct StructuredExtractionStrategy;

#[async_trait]
impl ReasoningStrategy for StructuredExtractionStrategy {
    fn name(&self) -> &'static str {
        "structured_extraction"
    }

    fn can_handle(&self, state: &mut WorkflowState) -> bool {
        should_use_structured_extraction(&state.query, state.metadata.is_aggregation)
    }

    async fn execute(&self, state: &mut WorkflowState, ctx: &ReasoningContext) -> Result<()> {
        let Some(kind) = detect_attribute_query(&state.query) else { return Ok(()) };
        let documents = state.metadata.retrieved_documents.clone();
        let well_id_filter = state.metadata.well_id_filter.clone();
        if let Some(answer) = crate::reasoning::attribute_extraction::structured_extraction_answer(
            &state.query,
            kind,
            &documents,
            &ctx.traverser,
            well_id_filter.as_deref(),
        ) {
            state.prepend_summary(answer.clone());
            state.response = Some(answer);
            state.metadata.structured_extraction = true;
        }
        Ok(())
    }
}

struct AggregationStrategy;

#[async_trait]
impl ReasoningStrategy for AggregationStrategy {
    fn name(&self) -> &'static str {
        "aggregation"
    }

    fn can_handle(&self, state: &mut WorkflowState) -> bool {
        if state.metadata.is_aggregation {
            return true;
        }
        let q = state.query.to_lowercase();
        q.contains("each") && q.contains("curve") && q.contains("well")
    }

    async fn execute(&self, state: &mut WorkflowState, ctx: &ReasoningContext) -> Result<()> {
        let result = handle_relationship_aware_aggregation(&state.query, &ctx.traverser).or_else(|| {
            state
                .metadata
                .detected_aggregation_type
                .and_then(|t| handle_aggregation(&state.query, t, &state.metadata.retrieved_documents, &ctx.traverser))
        });

        let Some(result) = result else { return Ok(()) };
        match result {
            AggregationResult::Direct(text) => {
                state.prepend_summary(text.clone());
                state.response = Some(text.clone());
                state.metadata.aggregation_result = Some(AggregationResult::Direct(text));
            }
            AggregationResult::NeedsGeneration { formatted_context } => {
                let prompt = ctx.format_prompt(&state.query, &formatted_context);
                let output = ctx.generation_client.generate(&prompt, AGGREGATION_MAX_TOKENS, DecodingMethod::Greedy).await?;
                state.prepend_summary(formatted_context.clone());
                state.response = Some(output.text);
                state.metadata.aggregation_result =
                    Some(AggregationResult::NeedsGeneration { formatted_context });
            }
        }
        Ok(())
    }
}

struct DomainRulesStrategy;

#[async_trait]
impl ReasoningStrategy for DomainRulesStrategy {
    fn name(&self) -> &'static str {
        "domain_rules"
    }

    fn can_handle(&self, state: &mut WorkflowState) -> bool {
        let is_relationship = state.metadata.relationship_detection.as_ref().map(|r| r.is_relationship_query()).unwrap_or(false);
        !is_relationship && apply_domain_rules(&state.query).is_some()
    }

    async fn execute(&self, state: &mut WorkflowState, _ctx: &ReasoningContext) -> Result<()> {
        if let Some(answer) = apply_domain_rules(&state.query) {
            state.prepend_summary(answer.to_string());
            state.response = Some(answer.to_string());
            state.metadata.domain_rule_applied = true;
        }
        Ok(())
    }
}

struct LlmGenerationStrategy;

#[async_trait]
impl ReasoningStrategy for LlmGenerationStrategy {
    fn name(&self) -> &'static str {
        "llm_generation"
    }

    fn can_handle(&self, _state: &mut WorkflowState) -> bool {
        true
    }

    async fn execute(&self, state: &mut WorkflowState, ctx: &ReasoningContext) -> Result<()> {
        if state.retrieved.is_empty() {
            return Err(SubtextError::NoRetrievedContext);
        }
        let context = state.retrieved.join("\n");
        let prompt = ctx.format_prompt(&state.query, &context);
        let output = ctx.generation_client.generate(&prompt, DEFAULT_MAX_TOKENS, DecodingMethod::Greedy).await?;
        state.response = Some(output.text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_prompt_uses_template_placeholders_when_present() {
        let ctx = ReasoningContext {
            generation_client: Arc::new(NoopGenerationClient),
            vector_store: Arc::new(NoopVectorStoreClient),
            collection: "documents".to_string(),
            traverser: Arc::new(GraphTraverser::new(crate::graph::Graph::default())),
            prompt_template: "Q: {{question}} C: {{context}}".to_string(),
        };
        assert_eq!(ctx.format_prompt("how many wells?", "ctx"), "Q: how many wells? C: ctx");
    }

    #[test]
    fn format_prompt_falls_back_without_template() {
        let ctx = ReasoningContext {
            generation_client: Arc::new(NoopGenerationClient),
            vector_store: Arc::new(NoopVectorStoreClient),
            collection: "documents".to_string(),
            traverser: Arc::new(GraphTraverser::new(crate::graph::Graph::default())),
            prompt_template: String::new(),
        };
        assert_eq!(ctx.format_prompt("q", "c"), "Question: q\n\nContext:\nc");
    }

    struct NoopGenerationClient;

    #[async_trait]
    impl GenerationClient for NoopGenerationClient {
        async fn generate(
            &self,
            _prompt: &str,
            _max_new_tokens: u32,
            _decoding_method: DecodingMethod,
        ) -> Result<crate::vector::GenerationOutput> {
            unimplemented!("not exercised in these unit tests")
        }
    }

    struct NoopVectorStoreClient;

    #[async_trait]
    impl VectorStoreClient for NoopVectorStoreClient {
        async fn vector_search(
            &self,
            _collection: &str,
            _embedding: &[f32],
            _limit: usize,
            _filter: Option<&crate::vector::JsonFilter>,
            _max_documents: Option<usize>,
        ) -> Result<Vec<crate::vector::Document>> {
            unimplemented!("not exercised in these unit tests")
        }

        async fn count_documents(&self, _collection: &str, _filter: Option<&crate::vector::JsonFilter>) -> Result<u64> {
            unimplemented!("not exercised in these unit tests")
        }

        async fn batch_fetch_by_ids(
            &self,
            _collection: &str,
            _ids: &[String],
            _embedding: Option<&[f32]>,
        ) -> Result<Vec<crate::vector::Document>> {
            unimplemented!("not exercised in these unit tests")
        }

        async fn upsert_documents(&self, _collection: &str, _documents: &[crate::vector::Document]) -> Result<()> {
            unimplemented!("not exercised in these unit tests")
        }

        async fn create_collection(&self, _name: &str) -> Result<()> {
            unimplemented!("not exercised in these unit tests")
        }

        async fn create_vector_collection(&self, _name: &str, _dimension: usize, _metric: &str) -> Result<()> {
            unimplemented!("not exercised in these unit tests")
        }
    }
}

use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::error::{Result, SubtextError};
use crate::graph::{load_graph, GraphTraverser};
use crate::reasoning::{ReasoningContext, ReasoningOrchestrator};
use crate::retrieval::{PipelineContext, RetrievalPipeline, WorkflowState};
use crate::vector::{
    AstraVectorStore, EmbeddingClient, GenerationClient, VectorStoreClient, WatsonxEmbeddingClient,
    WatsonxGenerationClient,
};

/// Everything built once at process startup and reused across queries: the
/// graph snapshot, the retrieval pipeline, and the reasoning orchestrator,
/// plus the network clients they all share.
pub struct Workflow {
    settings: Settings,
    pipeline: RetrievalPipeline,
    orchestrator: ReasoningOrchestrator,
    pipeline_ctx: PipelineContext,
    reasoning_ctx: ReasoningContext,
}

impl Workflow {
    /// Build every long-lived component: load the graph snapshot, construct
    /// the AstraDB and watsonx.ai clients, and assemble the standard
    /// six-stage retrieval pipeline and eight-strategy reasoning orchestrator.
    pub fn build(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let graph = load_graph(&settings.graph_file_path)?;
        let traverser = Arc::new(GraphTraverser::new(graph));

        let vector_store: Arc<dyn VectorStoreClient> = Arc::new(AstraVectorStore::new(
            settings.astra_db_endpoint.clone().expect("validated above"),
            settings.astra_db_token.clone().expect("validated above"),
            settings.astra_db_keyspace.clone(),
        ));

        let embedding_client: Arc<dyn EmbeddingClient> = Arc::new(WatsonxEmbeddingClient::new(
            settings.watsonx_url.clone().expect("validated above"),
            settings.watsonx_api_key.clone().expect("validated above"),
            settings.watsonx_project_id.clone().expect("validated above"),
            settings.embedding_model_id.clone(),
            settings.watsonx_version.clone(),
        ));

        let generation_client: Arc<dyn GenerationClient> = Arc::new(WatsonxGenerationClient::new(
            settings.watsonx_url.clone().expect("validated above"),
            settings.watsonx_api_key.clone().expect("validated above"),
            settings.watsonx_project_id.clone().expect("validated above"),
            settings.generation_model_id.clone(),
            settings.watsonx_version.clone(),
        ));

        let prompt_template = std::fs::read_to_string(&settings.prompt_template_path).unwrap_or_default();

        let pipeline_ctx = PipelineContext {
            embedding_client,
            vector_store,
            traverser: Arc::clone(&traverser),
            collection: settings.astra_db_collection.clone(),
            caller_entity_filter: None,
            caller_retrieval_limit: None,
            caller_top_k: None,
            skip_count_sample: settings.skip_count_sample,
        };

        let reasoning_ctx = ReasoningContext {
            generation_client,
            vector_store: Arc::clone(&pipeline_ctx.vector_store),
            collection: settings.astra_db_collection.clone(),
            traverser,
            prompt_template,
        };

        Ok(Self {
            settings,
            pipeline: RetrievalPipeline::standard(),
            orchestrator: ReasoningOrchestrator::standard(),
            pipeline_ctx,
            reasoning_ctx,
        })
    }

    /// Answer a single query: validate length, run retrieval, then hand the
    /// resulting state to the reasoning orchestrator.
    pub async fn answer(&self, query: impl Into<String>) -> Result<WorkflowState> {
        let query = query.into();
        if query.len() > self.settings.max_query_length {
            return Err(SubtextError::QueryTooLong { max: self.settings.max_query_length, actual: query.len() });
        }

        let mut state = WorkflowState::new(query);
        info!(query = %state.query, "running retrieval pipeline");
        self.pipeline.run(&mut state, &self.pipeline_ctx).await?;

        info!(num_results = state.metadata.num_results, "running reasoning orchestrator");
        self.orchestrator.respond(&mut state, &self.reasoning_ctx).await?;

        Ok(state)
    }

    /// Override the caller-supplied entity filter/limits for one-shot CLI
    /// invocations, where these come from a flag rather than query analysis.
    pub fn with_caller_filter(mut self, entity_filter: Option<String>) -> Self {
        self.pipeline_ctx.caller_entity_filter = entity_filter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fails_fast_when_credentials_are_missing() {
        let err = Workflow::build(Settings::default()).unwrap_err();
        assert!(matches!(err, SubtextError::MissingConfig(_)));
    }
}

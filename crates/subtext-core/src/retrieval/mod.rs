mod config;
mod filtering;
mod pipeline;
mod query_analysis;
mod query_expansion;
mod reranker;
mod state;

pub use config as limits;
pub use filtering::{apply_filters, extract_critical_keywords};
pub use pipeline::{
    normalize_well_node_id, FilteringStage, GraphTraversalExpansionStage, PipelineContext, QueryAnalysisStage,
    RerankingStage, RetrievalPipeline, RetrievalStage, StateFinalizeStage, VectorSearchStage,
};
pub use query_analysis::{analyze, detect_relationship_query, QueryAnalysis};
pub use query_expansion::{expand_query_with_synonyms, should_expand_query};
pub use reranker::rerank;
pub use state::{
    AggregationResult, AggregationType, Metadata, RelationshipDetection, RelationshipType, TraversalStrategy,
    WorkflowError, WorkflowState,
};

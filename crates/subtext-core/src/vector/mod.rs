mod client;
mod document;
mod embedding;
mod generation;
mod retry;

pub use client::{AstraVectorStore, JsonFilter, VectorStoreClient};
pub use document::Document;
pub use embedding::{EmbeddingClient, WatsonxEmbeddingClient};
pub use generation::{DecodingMethod, GenerationClient, GenerationOutput, GenerationUsage, WatsonxGenerationClient};
pub use retry::{with_backoff, RetryPolicy};

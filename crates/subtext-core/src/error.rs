use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubtextError>;

#[derive(Debug, Error)]
pub enum SubtextError {
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("failed to load graph: {0}")]
    GraphLoad(String),

    #[error("vector store request failed: {0}")]
    VectorStore(#[from] reqwest::Error),

    #[error("vector store returned status {status}: {body}")]
    VectorStoreStatus { status: u16, body: String },

    #[error("embedding request failed: {0}")]
    Embedding(String),

    #[error("generation request failed: {0}")]
    Generation(String),

    #[error("query too long: max {max} characters, got {actual}")]
    QueryTooLong { max: usize, actual: usize },

    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] serde_json::Error),

    #[error("no retrieved context available to answer query")]
    NoRetrievedContext,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

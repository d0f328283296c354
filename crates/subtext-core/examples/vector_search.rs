//! Drive `vector_search` against an in-memory `VectorStoreClient` and rerank
//! the results, without needing a live AstraDB/watsonx.ai deployment.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use subtext_core::retrieval::rerank;
use subtext_core::vector::{Document, VectorStoreClient};
use subtext_core::Result;

struct InMemoryStore {
    documents: Vec<Document>,
}

#[async_trait]
impl VectorStoreClient for InMemoryStore {
    async fn vector_search(
        &self,
        _collection: &str,
        _embedding: &[f32],
        limit: usize,
        _filter: Option<&Map<String, Value>>,
        _max_documents: Option<usize>,
    ) -> Result<Vec<Document>> {
        Ok(self.documents.iter().take(limit).cloned().collect())
    }

    async fn count_documents(&self, _collection: &str, _filter: Option<&Map<String, Value>>) -> Result<u64> {
        Ok(self.documents.len() as u64)
    }

    async fn batch_fetch_by_ids(
        &self,
        _collection: &str,
        ids: &[String],
        _embedding: Option<&[f32]>,
    ) -> Result<Vec<Document>> {
        Ok(self.documents.iter().filter(|d| d.id().map(|id| ids.iter().any(|i| i == id)).unwrap_or(false)).cloned().collect())
    }

    async fn upsert_documents(&self, _collection: &str, _documents: &[Document]) -> Result<()> {
        Ok(())
    }

    async fn create_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn create_vector_collection(&self, _name: &str, _dimension: usize, _metric: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let store = InMemoryStore {
        documents: vec![
            Document::new(json!({"_id": "curve-gr", "text": "GR gamma ray curve for well 15/9-13"}).as_object().unwrap().clone()),
            Document::new(json!({"_id": "curve-rdep", "text": "RDEP deep resistivity curve for well 15/9-13"}).as_object().unwrap().clone()),
            Document::new(json!({"_id": "usgs-1", "text": "streamflow discharge reading at USGS gauge 01646500"}).as_object().unwrap().clone()),
        ],
    };

    let query = "resistivity curves for well 15/9-13";
    let hits = store.vector_search("documents", &[], 10, None, None).await?;
    println!("raw vector search returned {} document(s)", hits.len());

    let reranked = rerank(query, hits, 0.0, 2);
    for doc in &reranked {
        println!("reranked: {}", doc.best_text());
    }

    Ok(())
}

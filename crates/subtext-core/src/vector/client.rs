use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::document::Document;
use super::retry::{with_backoff, RetryPolicy};
use crate::error::{Result, SubtextError};

/// A vector-store filter: an arbitrary JSON object matched against document
/// fields, passed through verbatim to the underlying store.
pub type JsonFilter = Map<String, Value>;

/// Page size cap enforced by the underlying store regardless of what a
/// caller asks for.
const MAX_PAGE_SIZE: usize = 1000;

/// Abstracts the external document/vector store used for retrieval. The
/// query-time pipeline only ever calls `vector_search`, `count_documents`
/// and `batch_fetch_by_ids`; the remaining methods exist for bootstrap
/// tooling outside the core query path.
#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    async fn vector_search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        filter: Option<&JsonFilter>,
        max_documents: Option<usize>,
    ) -> Result<Vec<Document>>;

    async fn count_documents(&self, collection: &str, filter: Option<&JsonFilter>) -> Result<u64>;

    async fn batch_fetch_by_ids(
        &self,
        collection: &str,
        ids: &[String],
        embedding: Option<&[f32]>,
    ) -> Result<Vec<Document>>;

    async fn upsert_documents(&self, collection: &str, documents: &[Document]) -> Result<()>;

    async fn create_collection(&self, name: &str) -> Result<()>;

    async fn create_vector_collection(&self, name: &str, dimension: usize, metric: &str) -> Result<()>;
}

/// HTTP client for a DataStax AstraDB-style Data API: single-op JSON
/// envelopes over `POST {base}/api/json/v1/{namespace}[/{collection}]`,
/// authenticated with an `X-Cassandra-Token` header.
pub struct AstraVectorStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
    namespace: String,
    retry_policy: RetryPolicy,
}

impl AstraVectorStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, namespace: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("reqwest client builds with static TLS config");
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
            namespace: namespace.into(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/api/json/v1/{}/{}", self.base_url.trim_end_matches('/'), self.namespace, collection)
    }

    async fn post(&self, collection: &str, body: &Value) -> Result<DataApiResponse> {
        let url = self.collection_url(collection);
        with_backoff(self.retry_policy, || async {
            let resp = self
                .http
                .post(&url)
                .header("X-Cassandra-Token", &self.token)
                .json(body)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SubtextError::VectorStoreStatus { status: status.as_u16(), body });
            }
            resp.json::<DataApiResponse>().await.map_err(SubtextError::VectorStore)
        })
        .await
    }
}

#[derive(Debug, Serialize, Default)]
struct FindOptions {
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "pagingState")]
    paging_state: Option<String>,
}

#[derive(Debug, Serialize)]
struct FindSort<'a> {
    #[serde(rename = "$vector")]
    vector: &'a [f32],
}

#[derive(Debug, Deserialize, Default)]
struct DataApiResponse {
    #[serde(default)]
    data: DataApiData,
    #[serde(default)]
    status: DataApiStatus,
}

#[derive(Debug, Deserialize, Default)]
struct DataApiData {
    #[serde(default)]
    documents: Vec<Map<String, Value>>,
    #[serde(rename = "nextPageState")]
    next_page_state: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DataApiStatus {
    count: Option<u64>,
}

#[async_trait]
impl VectorStoreClient for AstraVectorStore {
    async fn vector_search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        filter: Option<&JsonFilter>,
        max_documents: Option<usize>,
    ) -> Result<Vec<Document>> {
        let page_size = limit.min(MAX_PAGE_SIZE);
        let mut collected = Vec::new();
        let mut paging_state: Option<String> = None;

        loop {
            let remaining = max_documents.map(|m| m.saturating_sub(collected.len()));
            if remaining == Some(0) {
                break;
            }
            let this_page = remaining.map(|r| r.min(page_size)).unwrap_or(page_size);

            let body = serde_json::json!({
                "find": {
                    "filter": filter.cloned().unwrap_or_default(),
                    "sort": FindSort { vector: embedding },
                    "options": FindOptions { limit: this_page, paging_state: paging_state.clone() },
                }
            });

            let response = self.post(collection, &body).await?;
            let page_len = response.data.documents.len();
            collected.extend(response.data.documents.into_iter().map(Document::new));

            debug!(collection, page_len, total = collected.len(), "vector_search page fetched");

            if let Some(max) = max_documents {
                if collected.len() >= max {
                    collected.truncate(max);
                    break;
                }
            }

            // Treat a short page as terminal even if the store still sent a
            // continuation token — do not assume a token is always absent
            // on the last page.
            if page_len < this_page {
                break;
            }

            match response.data.next_page_state {
                Some(token) => paging_state = Some(token),
                None => break,
            }
        }

        Ok(collected)
    }

    async fn count_documents(&self, collection: &str, filter: Option<&JsonFilter>) -> Result<u64> {
        let body = serde_json::json!({
            "countDocuments": { "filter": filter.cloned().unwrap_or_default() }
        });
        let response = self.post(collection, &body).await?;
        Ok(response.status.count.unwrap_or(0))
    }

    async fn batch_fetch_by_ids(
        &self,
        collection: &str,
        ids: &[String],
        embedding: Option<&[f32]>,
    ) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut filter = Map::new();
        filter.insert("_id".to_string(), serde_json::json!({ "$in": ids }));

        let body = if let Some(vector) = embedding {
            serde_json::json!({
                "find": {
                    "filter": filter,
                    "sort": FindSort { vector },
                    "options": FindOptions { limit: ids.len(), paging_state: None },
                }
            })
        } else {
            serde_json::json!({
                "find": {
                    "filter": filter,
                    "options": FindOptions { limit: ids.len(), paging_state: None },
                }
            })
        };

        let response = self.post(collection, &body).await?;
        Ok(response.data.documents.into_iter().map(Document::new).collect())
    }

    async fn upsert_documents(&self, collection: &str, documents: &[Document]) -> Result<()> {
        let body = serde_json::json!({
            "insertMany": { "documents": documents.iter().map(|d| &d.0).collect::<Vec<_>>() }
        });
        self.post(collection, &body).await?;
        Ok(())
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        let body = serde_json::json!({ "createCollection": { "name": name } });
        self.post(name, &body).await?;
        Ok(())
    }

    async fn create_vector_collection(&self, name: &str, dimension: usize, metric: &str) -> Result<()> {
        let body = serde_json::json!({
            "createCollection": {
                "name": name,
                "options": { "vector": { "dimension": dimension, "metric": metric } }
            }
        });
        self.post(name, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_url_joins_base_namespace_and_collection() {
        let store = AstraVectorStore::new("https://db.example.com", "tok", "default_keyspace");
        assert_eq!(store.collection_url("documents"), "https://db.example.com/api/json/v1/default_keyspace/documents");
    }

    #[test]
    fn collection_url_trims_trailing_slash_on_base() {
        let store = AstraVectorStore::new("https://db.example.com/", "tok", "ks");
        assert_eq!(store.collection_url("docs"), "https://db.example.com/api/json/v1/ks/docs");
    }
}

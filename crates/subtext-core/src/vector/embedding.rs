use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::retry::{with_backoff, RetryPolicy};
use crate::error::{Result, SubtextError};

/// Batched text-to-vector embedding. Details of the provider are out of
/// scope for the core; only the shape of this contract matters downstream.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or_else(|| SubtextError::Embedding("provider returned no embeddings".into()))
    }
}

const DEFAULT_BATCH_SIZE: usize = 500;
const HARD_BATCH_CAP: usize = 1000;

struct CachedToken {
    access_token: String,
    expires_at: std::time::Instant,
}

/// watsonx.ai-style embedding client. IAM bearer auth is fetched once and
/// cached until 60s before expiry; concurrent callers share one refresh via
/// the mutex rather than each firing their own token request.
pub struct WatsonxEmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    project_id: String,
    model_id: String,
    api_version: String,
    token: Mutex<Option<CachedToken>>,
    retry_policy: RetryPolicy,
}

impl WatsonxEmbeddingClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        project_id: impl Into<String>,
        model_id: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("reqwest client builds with static TLS config"),
            base_url: base_url.into(),
            api_key: api_key.into(),
            project_id: project_id.into(),
            model_id: model_id.into(),
            api_version: api_version.into(),
            token: Mutex::new(None),
            retry_policy: RetryPolicy::default(),
        }
    }

    async fn iam_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > std::time::Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        #[derive(Serialize)]
        struct TokenRequest<'a> {
            grant_type: &'a str,
            apikey: &'a str,
        }
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let resp = self
            .http
            .post("https://iam.cloud.ibm.com/identity/token")
            .form(&TokenRequest {
                grant_type: "urn:ibm:params:oauth:grant-type:apikey",
                apikey: &self.api_key,
            })
            .send()
            .await
            .map_err(|e| SubtextError::Embedding(format!("IAM token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SubtextError::Embedding(format!("IAM token request returned {status}: {body}")));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SubtextError::Embedding(format!("malformed IAM token response: {e}")))?;

        let expires_at = std::time::Instant::now()
            + std::time::Duration::from_secs(parsed.expires_in.saturating_sub(60));
        *guard = Some(CachedToken { access_token: parsed.access_token.clone(), expires_at });
        Ok(parsed.access_token)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    inputs: &'a [String],
    project_id: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    results: Vec<EmbeddingResult>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResult {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for WatsonxEmbeddingClient {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(DEFAULT_BATCH_SIZE.min(HARD_BATCH_CAP)) {
            let token = self.iam_token().await?;
            let url = format!(
                "{}/ml/v1/text/embeddings?version={}",
                self.base_url.trim_end_matches('/'),
                self.api_version
            );

            let response = with_backoff(self.retry_policy, || async {
                let resp = self
                    .http
                    .post(&url)
                    .bearer_auth(&token)
                    .json(&EmbeddingRequest { inputs: chunk, project_id: &self.project_id, model_id: &self.model_id })
                    .send()
                    .await
                    .map_err(SubtextError::VectorStore)?;

                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(SubtextError::VectorStoreStatus { status: status.as_u16(), body });
                }
                resp.json::<EmbeddingResponse>().await.map_err(SubtextError::VectorStore)
            })
            .await
            .map_err(|e| SubtextError::Embedding(e.to_string()))?;

            debug!(batch_len = chunk.len(), "embedded batch");
            all.extend(response.results.into_iter().map(|r| r.embedding));
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_texts_of_empty_slice_is_empty_without_a_network_call() {
        let client = WatsonxEmbeddingClient::new("https://example.com", "key", "proj", "model", "2024-01-01");
        let result = client.embed_texts(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::retry::{with_backoff, RetryPolicy};
use crate::error::{Result, SubtextError};

/// Prompt-to-text generation, greedy by default so orchestrator output is
/// reproducible for the same retrieved context (spec idempotence property).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingMethod {
    Greedy,
    Sample,
}

impl DecodingMethod {
    fn as_str(self) -> &'static str {
        match self {
            DecodingMethod::Greedy => "greedy",
            DecodingMethod::Sample => "sample",
        }
    }
}

/// Response metadata captured for downstream cost accounting. Cost/metrics
/// emission itself is out of scope for the core, but the fields are
/// captured here regardless — an ambient concern stays even when unused.
#[derive(Debug, Clone, Default)]
pub struct GenerationUsage {
    pub input_token_count: Option<u64>,
    pub generated_token_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub text: String,
    pub usage: GenerationUsage,
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: u32,
        decoding_method: DecodingMethod,
    ) -> Result<GenerationOutput>;
}

struct CachedToken {
    access_token: String,
    expires_at: std::time::Instant,
}

pub struct WatsonxGenerationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    project_id: String,
    model_id: String,
    api_version: String,
    token: Mutex<Option<CachedToken>>,
    retry_policy: RetryPolicy,
}

impl WatsonxGenerationClient {
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
            .map_err(|e| SubtextError::Generation(format!("IAM token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SubtextError::Generation(format!("IAM token request returned {status}: {body}")));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SubtextError::Generation(format!("malformed IAM token response: {e}")))?;

        let expires_at = std::time::Instant::now()
            + std::time::Duration::from_secs(parsed.expires_in.saturating_sub(60));
        *guard = Some(CachedToken { access_token: parsed.access_token.clone(), expires_at });
        Ok(parsed.access_token)
    }
}

#[derive(Debug, Serialize)]
struct GenerationParameters<'a> {
    decoding_method: &'a str,
    max_new_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model_id: &'a str,
    input: &'a str,
    parameters: GenerationParameters<'a>,
    project_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    generated_text: String,
    input_token_count: Option<u64>,
    generated_token_count: Option<u64>,
}

#[async_trait]
impl GenerationClient for WatsonxGenerationClient {
    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: u32,
        decoding_method: DecodingMethod,
    ) -> Result<GenerationOutput> {
        let token = self.iam_token().await?;
        let url = format!(
            "{}/ml/v1/text/generation?version={}",
            self.base_url.trim_end_matches('/'),
            self.api_version
        );

        let response = with_backoff(self.retry_policy, || async {
            let resp = self
                .http
                .post(&url)
                .bearer_auth(&token)
                .json(&GenerationRequest {
                    model_id: &self.model_id,
                    input: prompt,
                    parameters: GenerationParameters {
                        decoding_method: decoding_method.as_str(),
                        max_new_tokens,
                    },
                    project_id: &self.project_id,
                })
                .send()
                .await
                .map_err(SubtextError::VectorStore)?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SubtextError::VectorStoreStatus { status: status.as_u16(), body });
            }
            resp.json::<GenerationResponse>().await.map_err(SubtextError::VectorStore)
        })
        .await
        .map_err(|e| SubtextError::Generation(e.to_string()))?;

        let first = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| SubtextError::Generation("provider returned no results".into()))?;

        Ok(GenerationOutput {
            text: first.generated_text,
            usage: GenerationUsage {
                input_token_count: first.input_token_count,
                generated_token_count: first.generated_token_count,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoding_method_serializes_to_watsonx_strings() {
        assert_eq!(DecodingMethod::Greedy.as_str(), "greedy");
        assert_eq!(DecodingMethod::Sample.as_str(), "sample");
    }
}

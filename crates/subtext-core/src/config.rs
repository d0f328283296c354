use clap::Parser;

use crate::error::{Result, SubtextError};

/// Runtime configuration for the retrieval and reasoning engine.
///
/// Every field can be set from the environment (`env = "..."`) or overridden
/// on the command line by `subtext-cli`. Fields with no default must be
/// supplied or `validate()` returns an error.
#[derive(Parser, Debug, Clone)]
#[command(name = "subtext", about = "Graph-augmented retrieval and reasoning over energy/subsurface data")]
pub struct Settings {
    /// AstraDB Data API endpoint, e.g. https://<db-id>-<region>.apps.astra.datastax.com
    #[arg(long, env = "ASTRA_DB_API_ENDPOINT")]
    pub astra_db_endpoint: Option<String>,

    /// AstraDB application token used as the X-Cassandra-Token header.
    #[arg(long, env = "ASTRA_DB_APPLICATION_TOKEN")]
    pub astra_db_token: Option<String>,

    /// Keyspace to operate in.
    #[arg(long, env = "ASTRA_DB_KEYSPACE", default_value = "default_keyspace")]
    pub astra_db_keyspace: String,

    /// Default collection holding embedded documents.
    #[arg(long, env = "ASTRA_DB_COLLECTION", default_value = "documents")]
    pub astra_db_collection: String,

    /// watsonx.ai API key.
    #[arg(long, env = "WATSONX_API_KEY")]
    pub watsonx_api_key: Option<String>,

    /// watsonx.ai project id.
    #[arg(long, env = "WATSONX_PROJECT_ID")]
    pub watsonx_project_id: Option<String>,

    /// watsonx.ai base URL, e.g. https://us-south.ml.cloud.ibm.com
    #[arg(long, env = "WATSONX_URL")]
    pub watsonx_url: Option<String>,

    /// watsonx.ai API version date.
    #[arg(long, env = "WATSONX_VERSION", default_value = "2023-05-29")]
    pub watsonx_version: String,

    /// Embedding model id.
    #[arg(
        long,
        env = "WATSONX_EMBED_MODEL_ID",
        default_value = "ibm/granite-embedding-278m-multilingual"
    )]
    pub embedding_model_id: String,

    /// Generation model id.
    #[arg(long, env = "WATSONX_GEN_MODEL_ID", default_value = "ibm/granite-13b-instruct-v2")]
    pub generation_model_id: String,

    /// Path to the static knowledge graph snapshot (JSON) loaded at startup.
    #[arg(long, env = "SUBTEXT_GRAPH_FILE", default_value = "data/graph.json")]
    pub graph_file_path: String,

    /// Path to the prompt template used for the LLM generation fallback.
    #[arg(long, env = "SUBTEXT_PROMPT_TEMPLATE", default_value = "prompts/answer.txt")]
    pub prompt_template_path: String,

    /// Approximate context window size, in characters, reserved for the prompt.
    #[arg(long, env = "MAX_PROMPT_CHARS", default_value_t = 120_000)]
    pub max_prompt_chars: usize,

    /// Heuristic characters-per-token ratio used to estimate remaining budget.
    #[arg(long, env = "CHARS_PER_TOKEN", default_value_t = 4)]
    pub chars_per_token_estimate: usize,

    /// Fraction of the context window remaining below which retrieved context
    /// is compacted before being placed in the prompt.
    #[arg(long, env = "CONTEXT_COMPACT_THRESHOLD", default_value_t = 0.25)]
    pub context_compaction_threshold: f64,

    /// Reject queries longer than this many characters outright.
    #[arg(long, env = "SUBTEXT_MAX_QUERY_LENGTH", default_value_t = 500)]
    pub max_query_length: usize,

    /// Skip the secondary sampled count check on the COUNT fast path.
    #[arg(long, env = "SUBTEXT_SKIP_COUNT_SAMPLE", default_value_t = false)]
    pub skip_count_sample: bool,

    /// The query to answer, if invoked as a one-shot CLI.
    #[arg(skip)]
    pub query: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            astra_db_endpoint: None,
            astra_db_token: None,
            astra_db_keyspace: "default_keyspace".to_string(),
            astra_db_collection: "documents".to_string(),
            watsonx_api_key: None,
            watsonx_project_id: None,
            watsonx_url: None,
            watsonx_version: "2023-05-29".to_string(),
            embedding_model_id: "ibm/granite-embedding-278m-multilingual".to_string(),
            generation_model_id: "ibm/granite-13b-instruct-v2".to_string(),
            graph_file_path: "data/graph.json".to_string(),
            prompt_template_path: "prompts/answer.txt".to_string(),
            max_prompt_chars: 120_000,
            chars_per_token_estimate: 4,
            context_compaction_threshold: 0.25,
            max_query_length: 500,
            skip_count_sample: false,
            query: None,
        }
    }
}

impl Settings {
    /// Confirm the settings needed to reach AstraDB and watsonx.ai are present.
    ///
    /// Graph loading and local reasoning work without these, so this is called
    /// explicitly by the runner right before building network-backed clients,
    /// not from a constructor.
    pub fn validate(&self) -> Result<()> {
        if self.astra_db_endpoint.is_none() || self.astra_db_token.is_none() {
            return Err(SubtextError::MissingConfig(
                "ASTRA_DB_API_ENDPOINT and ASTRA_DB_APPLICATION_TOKEN are required".to_string(),
            ));
        }
        if self.watsonx_api_key.is_none() || self.watsonx_project_id.is_none() || self.watsonx_url.is_none() {
            return Err(SubtextError::MissingConfig(
                "WATSONX_API_KEY, WATSONX_PROJECT_ID and WATSONX_URL are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of prompt characters available before compaction kicks in.
    pub fn compaction_trigger_chars(&self) -> usize {
        ((self.max_prompt_chars as f64) * (1.0 - self.context_compaction_threshold)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_fail_validation_without_credentials() {
        let settings = Settings::default();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn compaction_trigger_is_below_max_prompt_chars() {
        let settings = Settings::default();
        assert!(settings.compaction_trigger_chars() < settings.max_prompt_chars);
    }
}

use std::process::ExitCode;

use clap::Parser;
use subtext_core::{Settings, SubtextError, Workflow};
use tracing::error;

/// Run a single query against the retrieval and reasoning engine and print
/// the answer. All network credentials are read from the environment; see
/// `Settings` for the full list.
#[derive(Parser, Debug)]
#[command(name = "subtext", about = "Answer one question against the energy/subsurface knowledge graph")]
struct Cli {
    /// The natural-language question to answer.
    query: String,

    /// Override the auto-detected entity filter, e.g. '{"entity_type": "las_curve"}'.
    #[arg(long)]
    filter: Option<String>,

    /// Print the raw retrieved context and metadata as JSON instead of a
    /// human-readable rendering.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    settings: Settings,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let entity_filter = match parse_entity_filter(cli.filter.as_deref()) {
        Ok(filter) => filter,
        Err(e) => {
            error!("{e}");
            return exit_code_for(&e);
        }
    };

    let workflow = match Workflow::build(cli.settings) {
        Ok(workflow) => workflow.with_caller_filter(entity_filter),
        Err(e) => {
            error!("{e}");
            return exit_code_for(&e);
        }
    };

    match workflow.answer(cli.query).await {
        Ok(state) => {
            if cli.json {
                let body = serde_json::json!({
                    "retrieved": state.retrieved,
                    "response": state.response,
                    "num_results": state.metadata.num_results,
                    "decision_log": state.metadata.decision_log,
                });
                println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
            } else {
                for line in &state.retrieved {
                    println!("{line}");
                }
                if !state.retrieved.is_empty() {
                    println!();
                }
                println!("{}", state.response.unwrap_or_default());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            exit_code_for(&e)
        }
    }
}

/// `--filter` takes a small JSON object with an `entity_type` string field;
/// anything else is a usage error.
fn parse_entity_filter(raw: Option<&str>) -> subtext_core::Result<Option<String>> {
    let Some(raw) = raw else { return Ok(None) };
    let value: serde_json::Value = serde_json::from_str(raw)?;
    Ok(value.get("entity_type").and_then(|v| v.as_str()).map(|s| s.to_string()))
}

fn exit_code_for(err: &SubtextError) -> ExitCode {
    match err {
        SubtextError::MissingConfig(_) | SubtextError::GraphLoad(_) | SubtextError::Io(_) => ExitCode::from(1),
        SubtextError::QueryTooLong { .. } | SubtextError::InvalidFilter(_) => ExitCode::from(2),
        SubtextError::VectorStore(_)
        | SubtextError::VectorStoreStatus { .. }
        | SubtextError::Embedding(_)
        | SubtextError::Generation(_)
        | SubtextError::NoRetrievedContext => ExitCode::from(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_without_entity_type_field_yields_none() {
        let parsed = parse_entity_filter(Some(r#"{"foo": "bar"}"#)).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn filter_with_entity_type_field_is_extracted() {
        let parsed = parse_entity_filter(Some(r#"{"entity_type": "las_curve"}"#)).unwrap();
        assert_eq!(parsed.as_deref(), Some("las_curve"));
    }

    #[test]
    fn absent_filter_is_none() {
        assert!(parse_entity_filter(None).unwrap().is_none());
    }

    #[test]
    fn malformed_filter_json_is_an_error() {
        assert!(parse_entity_filter(Some("not json")).is_err());
    }
}

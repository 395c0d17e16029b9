//! Terminal chat over a scripture corpus.
//!
//! Environment:
//! - `SCRIPTURE_CONFIG`: JSON config file (optional)
//! - `SCRIPTURE_CORPUS`, `MAX_TOKENS`: config overrides
//! - `LLM_PROVIDER` (`ollama` | `openai` | `custom`, default `ollama`),
//!   `LLM_MODEL`, `LLM_API_KEY`, `LLM_ENDPOINT`

use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use scripture_rag::{
    ApiProvider, CorpusIndex, ExternalProvider, RoutingEngine, ScriptureConfig, VerseTextIndex,
};

const SYNTHESIS_APOLOGY: &str =
    "Sorry, I couldn't put an answer together just now. Please try again in a moment.";

fn load_config() -> Result<ScriptureConfig> {
    let mut config = match std::env::var("SCRIPTURE_CONFIG") {
        Ok(path) if !path.trim().is_empty() => {
            ScriptureConfig::from_file(&PathBuf::from(path)).map_err(|e| anyhow!(e))?
        }
        _ => ScriptureConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().map_err(|e| anyhow!("invalid config: {}", e))?;
    Ok(config)
}

fn build_provider() -> Result<ExternalProvider> {
    let name = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string());
    let endpoint = std::env::var("LLM_ENDPOINT").ok();
    let provider = ApiProvider::from_name(&name, endpoint)
        .ok_or_else(|| anyhow!("unsupported LLM_PROVIDER '{}' (custom needs LLM_ENDPOINT)", name))?;

    let default_model = match provider {
        ApiProvider::OpenAI => "gpt-4o-mini",
        _ => "llama3.2",
    };
    let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| default_model.to_string());
    let api_key = std::env::var("LLM_API_KEY").unwrap_or_default();

    ExternalProvider::new(provider, api_key, model)
}

fn prompt() -> Result<()> {
    print!("\nYou: ");
    std::io::stdout().flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scripture_rag=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;
    let (corpus, report) = CorpusIndex::load(&config.corpus).context("Failed to load corpus")?;
    if !report.malformed.is_empty() {
        tracing::warn!(malformed = report.malformed.len(), "Corpus loaded with malformed records");
    }

    let corpus = Arc::new(corpus);
    let index = Arc::new(VerseTextIndex::build(&corpus)?);
    let llm = Arc::new(build_provider()?);
    let mut engine = RoutingEngine::new(corpus, index, llm, config);

    println!("Scripture chat ready. Type 'exit' or 'quit' to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            prompt()?;
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match engine.ask(question).await {
            Ok(answer) => println!("\nAssistant: {}", answer),
            Err(e) => {
                tracing::error!(error = %e, "Question could not be answered");
                println!("\nAssistant: {}", SYNTHESIS_APOLOGY);
            }
        }
        prompt()?;
    }

    println!("\nGoodbye, and God bless.");
    Ok(())
}

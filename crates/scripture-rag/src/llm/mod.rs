//! LLM Module - text generation behind a provider trait
//! The routing engine only ever hands a finished prompt to a provider.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod external;

pub use external::ExternalProvider;

/// External API providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApiProvider {
    OpenAI,
    Ollama,
    Custom { endpoint: String },
}

impl ApiProvider {
    /// Parse the `LLM_PROVIDER` style name. `custom` needs an endpoint.
    pub fn from_name(name: &str, endpoint: Option<String>) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            "custom" => endpoint.map(|endpoint| Self::Custom { endpoint }),
            _ => None,
        }
    }
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: usize,
    pub repetition_penalty: f32,
    pub stop_sequences: Vec<String>,
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.33,
            top_p: 0.9,
            top_k: 40,
            repetition_penalty: 1.2,
            stop_sequences: vec![
                "\nUser:".to_string(),
                "\nQ:".to_string(),
                "\nQuestion:".to_string(),
                "Answer format:".to_string(),
            ],
            seed: None,
        }
    }
}

/// Core trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a fully formed prompt.
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;

    /// Short provider label for logs.
    fn name(&self) -> &str;
}

//! OpenAI-compatible chat-completions client (OpenAI, local Ollama, custom gateways)

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ApiProvider, GenerationConfig, LLMProvider};

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: String,
}

pub struct ExternalProvider {
    provider: ApiProvider,
    api_key: String,
    model: String,
    client: Client,
}

impl ExternalProvider {
    pub fn new(provider: ApiProvider, api_key: String, model: String) -> Result<Self> {
        // No overall request timeout: generation on a local model can be slow,
        // and cancellation belongs to whoever drives the provider.
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(15))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;

        tracing::info!(
            provider = ?provider,
            model = %model,
            "Creating ExternalProvider (connect_timeout=15s)"
        );

        Ok(Self {
            provider,
            api_key,
            model,
            client,
        })
    }

    fn endpoint(&self) -> String {
        match &self.provider {
            ApiProvider::OpenAI => "https://api.openai.com/v1/chat/completions".to_string(),
            ApiProvider::Ollama => "http://localhost:11434/v1/chat/completions".to_string(),
            ApiProvider::Custom { endpoint } => endpoint.clone(),
        }
    }

    fn request_body(&self, prompt: &str, config: &GenerationConfig) -> serde_json::Value {
        let mut request = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "frequency_penalty": (config.repetition_penalty - 1.0).max(0.0),
            "stream": false
        });
        if !config.stop_sequences.is_empty() {
            // OpenAI accepts at most four stop sequences.
            let stop: Vec<&String> = config.stop_sequences.iter().take(4).collect();
            request["stop"] = json!(stop);
        }
        if let Some(seed) = config.seed {
            request["seed"] = json!(seed);
        }
        request
    }

    /// First choice's text from a completions body. Gateways sometimes answer
    /// with an HTML page; that is reported as such rather than as bad JSON.
    fn completion_text(body: &str, endpoint: &str) -> Result<String> {
        let snippet = || body.trim().chars().take(200).collect::<String>();
        if body.trim_start().starts_with('<') {
            return Err(anyhow!("{} answered with HTML, not JSON: {}", endpoint, snippet()));
        }

        let parsed: OpenAIResponse = serde_json::from_str(body)
            .map_err(|e| anyhow!("unreadable completion from {} ({}): {}", endpoint, e, snippet()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("{} returned no choices", endpoint))
    }
}

#[async_trait]
impl LLMProvider for ExternalProvider {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let endpoint = self.endpoint();
        tracing::debug!(
            endpoint = %endpoint,
            model = %self.model,
            max_tokens = config.max_tokens,
            prompt_len = prompt.len(),
            "Sending chat-completions request"
        );

        let mut request = self.client.post(&endpoint).json(&self.request_body(prompt, config));
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                tracing::error!(endpoint = %endpoint, error = %e, "Connection failed");
                anyhow!("Failed to connect to {}: {}", endpoint, e)
            } else {
                tracing::error!(endpoint = %endpoint, error = %e, "Request failed");
                anyhow!("Request to {} failed: {}", endpoint, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            tracing::error!(endpoint = %endpoint, status = %status, error = %error, "API returned error");
            return Err(anyhow!("API error ({}): {}", status, error));
        }

        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", endpoint, e))?;
        let text = Self::completion_text(&body, &endpoint)?;

        tracing::debug!(chars = text.len(), "Completion received");
        Ok(text)
    }

    fn name(&self) -> &str {
        match &self.provider {
            ApiProvider::OpenAI => "OpenAI",
            ApiProvider::Ollama => "Ollama",
            ApiProvider::Custom { .. } => "Custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(kind: ApiProvider) -> ExternalProvider {
        ExternalProvider::new(kind, String::new(), "mistral".to_string()).unwrap()
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            provider(ApiProvider::Ollama).endpoint(),
            "http://localhost:11434/v1/chat/completions"
        );
        let custom = provider(ApiProvider::Custom {
            endpoint: "http://gateway/v1/chat/completions".to_string(),
        });
        assert_eq!(custom.endpoint(), "http://gateway/v1/chat/completions");
        assert_eq!(custom.name(), "Custom");
    }

    #[test]
    fn test_request_body_carries_sampling_and_stops() {
        let body = provider(ApiProvider::Ollama).request_body("Question: hi", &GenerationConfig::default());
        assert_eq!(body["model"], "mistral");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["content"], "Question: hi");
        assert_eq!(body["stop"].as_array().unwrap().len(), 4);
        assert!(body.get("seed").is_none());
        let penalty = body["frequency_penalty"].as_f64().unwrap();
        assert!((penalty - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_completion_text() {
        let body = r#"{"choices": [{"message": {"content": "God is love."}}, {"message": {"content": "ignored"}}]}"#;
        assert_eq!(
            ExternalProvider::completion_text(body, "http://x").unwrap(),
            "God is love."
        );

        let html = ExternalProvider::completion_text("  <html>502 Bad Gateway</html>", "http://x").unwrap_err();
        assert!(html.to_string().contains("HTML"));

        let empty = ExternalProvider::completion_text(r#"{"choices": []}"#, "http://x").unwrap_err();
        assert!(empty.to_string().contains("no choices"));

        assert!(ExternalProvider::completion_text("not json", "http://x").is_err());
    }

    #[test]
    fn test_provider_from_name() {
        assert_eq!(ApiProvider::from_name("Ollama", None), Some(ApiProvider::Ollama));
        assert_eq!(ApiProvider::from_name("custom", None), None);
        assert_eq!(
            ApiProvider::from_name("custom", Some("http://x".to_string())),
            Some(ApiProvider::Custom {
                endpoint: "http://x".to_string()
            })
        );
        assert_eq!(ApiProvider::from_name("bogus", None), None);
    }
}

//! LLM gateway used to summarize text chunks.
//!
//! The Ollama-backed client mirrors the embedding adapter by issuing HTTP requests directly to
//! the runtime's `/api/chat` endpoint with streaming disabled.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced while requesting a summary from the LLM.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or the model endpoint was missing.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Fully assembled prompt, sent as a single user message.
    pub prompt: String,
}

/// Interface implemented by chat-capable LLM providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a summary for the prompt using the requested model.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build the summarization client for the configured Ollama runtime.
pub fn get_summarization_client() -> Result<Arc<dyn SummarizationClient>, SummarizationClientError>
{
    let config = get_config();
    Ok(Arc::new(OllamaSummarizationClient::new(
        config.ollama_url.clone(),
    )?))
}

/// Chat client for a local Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
}

impl OllamaSummarizationClient {
    /// Construct a client for the Ollama runtime at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("docsearch/summary")
            .build()
            .map_err(|error| SummarizationClientError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
    #[serde(default = "default_done")]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatMessage {
    #[serde(default)]
    content: String,
}

fn default_done() -> bool {
    true
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": request.model,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
            "stream": false,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404 for model '{}'",
                self.endpoint(),
                request.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaChatResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.message.content)
    }
}

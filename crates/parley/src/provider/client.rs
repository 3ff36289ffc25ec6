//! HTTP client for OpenAI-compatible chat completion APIs.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProviderSettings;

use super::CompletionProvider;
use super::error::{ProviderError, ProviderResult};
use super::types::{ChatTurn, CompletionOutcome, CompletionRequest, decode_completion};

/// Client for a chat completions endpoint (Groq by default).
#[derive(Debug, Clone)]
pub struct CompletionClient {
    /// HTTP client.
    client: Client,
    /// Base URL without trailing slash (e.g., "https://api.groq.com/openai/v1").
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    system_prompt: Option<String>,
}

impl CompletionClient {
    /// Create a new client from provider settings.
    pub fn new(settings: &ProviderSettings) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_prompt: settings.system_prompt.clone().filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for a single, context-free turn.
    fn build_request(&self, prompt: &str) -> CompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.system_prompt {
            messages.push(ChatTurn::system(system.clone()));
        }
        messages.push(ChatTurn::user(prompt));

        CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn complete(&self, api_key: &str, prompt: &str) -> ProviderResult<CompletionOutcome> {
        let url = self.completions_url();
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!(
            %status,
            body = %String::from_utf8_lossy(&body),
            "completion provider response"
        );

        let outcome = decode_completion(&body);
        match &outcome {
            CompletionOutcome::Rejected(message) => {
                warn!(%status, error = %message, "completion provider returned an error");
            }
            CompletionOutcome::Malformed => {
                warn!(%status, "unexpected completion response format");
            }
            CompletionOutcome::Success(_) => {}
        }

        Ok(outcome)
    }
}

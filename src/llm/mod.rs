//! LLM provider behind the reasoning gateway.
//!
//! Wraps AnthropicClient with model aliasing and a fixed token budget.
//! One call per decision; configuration is fixed at construction.

pub mod client;
pub mod types;

use client::{AnthropicClient, LlmError};
use types::{resolve_model, Completion, Message, MessagesRequest};

/// Reasoning provider bound to one model.
#[derive(Debug, Clone)]
pub struct LlmProvider {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl LlmProvider {
    /// Create a provider against the public endpoint.
    pub fn new(api_key: String, model: &str, max_tokens: u32) -> Self {
        Self::with_client(AnthropicClient::new(api_key), model, max_tokens)
    }

    /// Create a provider with a custom base URL.
    pub fn with_base_url(api_key: String, model: &str, max_tokens: u32, base_url: String) -> Self {
        Self::with_client(
            AnthropicClient::with_base_url(api_key, base_url),
            model,
            max_tokens,
        )
    }

    fn with_client(client: AnthropicClient, model: &str, max_tokens: u32) -> Self {
        Self {
            client,
            model: resolve_model(model).to_string(),
            max_tokens,
        }
    }

    /// Send the prompt as a single user message.
    pub async fn complete(&self, prompt: String) -> Result<Completion, LlmError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message::user(prompt)],
            system: None,
            temperature: None,
        };

        self.client.complete(&request).await
    }

    /// The model this provider talks to (resolved to full ID).
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_resolves_alias() {
        let provider = LlmProvider::new("test-key".into(), "opus", 4096);
        assert_eq!(provider.model(), "claude-opus-4-20250514");
    }

    #[test]
    fn provider_keeps_full_model_id() {
        let provider = LlmProvider::new("test-key".into(), "claude-sonnet-4-5-20250514", 4096);
        assert_eq!(provider.model(), "claude-sonnet-4-5-20250514");
    }

    #[test]
    fn provider_with_custom_base_url() {
        let provider =
            LlmProvider::with_base_url("key".into(), "haiku", 1024, "http://localhost:9999".into());
        assert_eq!(provider.model(), "claude-haiku-4-5-20251001");
        assert_eq!(provider.max_tokens, 1024);
    }
}

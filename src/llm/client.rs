//! Raw HTTP client for the Anthropic Messages API.
//!
//! No game awareness here. A call either yields a [`Completion`] or an
//! [`LlmError`]; retrying is the caller's business.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use super::types::{ApiErrorBody, Completion, MessagesRequest, MessagesResponse};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";

/// Errors from the reasoning provider. Every variant ends the session.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status} {}: {message}", kind.as_deref().unwrap_or("error"))]
    Api {
        status: u16,
        kind: Option<String>,
        message: String,
    },

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("could not encode prompt context: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Anthropic Messages API client bound to one key and endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.into())
    }

    /// Client against a proxy or a local stand-in server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
        }
    }

    /// Run one completion and keep only what a decision needs.
    pub async fn complete(&self, request: &MessagesRequest) -> Result<Completion, LlmError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let body = check_status(response).await?.text().await?;
        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::InvalidResponse(format!("{e}; body starts with {:?}", preview(&body))))?;
        Ok(Completion::from(parsed))
    }
}

/// Pass 2xx responses through, turn everything else into an `LlmError`.
async fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(LlmError::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

/// Build an `Api` error, preferring the structured `{"error": {...}}` body.
fn api_error(status: StatusCode, body: &str) -> LlmError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => LlmError::Api {
            status: status.as_u16(),
            kind: Some(parsed.error.kind),
            message: parsed.error.message,
        },
        Err(_) => LlmError::Api {
            status: status.as_u16(),
            kind: None,
            message: if body.is_empty() {
                "(no body)".to_string()
            } else {
                preview(body).to_string()
            },
        },
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

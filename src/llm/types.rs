//! Rust types for the Anthropic Messages API.
//!
//! Only the subset the agent sends and reads. Serde-serializable to JSON.

use serde::{Deserialize, Serialize};

use crate::ledger::TokenUsage;

/// Resolve model aliases to full Anthropic model IDs.
pub fn resolve_model(alias: &str) -> &str {
    match alias {
        "opus" => "claude-opus-4-20250514",
        "sonnet" => "claude-sonnet-4-5-20250514",
        "haiku" => "claude-haiku-4-5-20251001",
        _ => alias, // pass through full model IDs
    }
}

/// Request body for the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Response from the Anthropic Messages API. Only the fields a decision uses.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

/// A content block in the response.
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: Option<String>,
}

/// Token usage from the API response.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage::new(usage.input_tokens, usage.output_tokens)
    }
}

impl MessagesResponse {
    /// Extract the text content from the first text block, if any.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.content_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

/// One finished provider call: the reply text and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// First text block. `None` when the reply held no text at all.
    pub text: Option<String>,
    pub usage: TokenUsage,
    pub stop_reason: Option<String>,
}

impl From<MessagesResponse> for Completion {
    fn from(response: MessagesResponse) -> Self {
        Self {
            text: response.text().map(str::to_string),
            usage: response.usage.into(),
            stop_reason: response.stop_reason,
        }
    }
}

/// Error body: `{"type": "error", "error": {"type": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_model_aliases() {
        assert_eq!(resolve_model("opus"), "claude-opus-4-20250514");
        assert_eq!(resolve_model("sonnet"), "claude-sonnet-4-5-20250514");
        assert_eq!(resolve_model("haiku"), "claude-haiku-4-5-20251001");
        assert_eq!(resolve_model("custom-model-id"), "custom-model-id");
    }

    #[test]
    fn request_serializes_to_json() {
        let req = MessagesRequest {
            model: "claude-opus-4-20250514".into(),
            max_tokens: 8192,
            messages: vec![Message::user("rules + board")],
            system: None,
            temperature: None,
        };

        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"model\":\"claude-opus-4-20250514\""));
        assert!(json.contains("\"max_tokens\":8192"));
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("system"));
        assert!(!json.contains("temperature"));
    }

    #[test]
    fn response_deserializes_from_json() {
        let json = r#"{
            "id": "msg_123",
            "model": "claude-sonnet-4-5-20250514",
            "content": [
                {"type": "text", "text": "{\"command\": \"G@P11+90\", \"reasoning\": \"r\"}"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1200, "output_tokens": 80}
        }"#;

        let resp: MessagesResponse = serde_json::from_str(json).unwrap();
        let completion = Completion::from(resp);
        assert!(completion.text.unwrap().contains("G@P11+90"));
        assert_eq!(completion.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(completion.usage.input, 1200);
        assert_eq!(completion.usage.output, 80);
        assert_eq!(completion.usage.total, 1280);
    }

    #[test]
    fn completion_without_text_still_reports_usage() {
        let json = r#"{
            "content": [],
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 50, "output_tokens": 0}
        }"#;
        let completion = Completion::from(serde_json::from_str::<MessagesResponse>(json).unwrap());
        assert_eq!(completion.text, None);
        assert_eq!(completion.usage.total, 50);
    }

    #[test]
    fn text_skips_non_text_blocks() {
        let json = r#"{
            "id": "msg_1", "model": "m", "stop_reason": null,
            "content": [{"type": "thinking"}, {"type": "text", "text": "hi"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }"#;
        let resp: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text(), Some("hi"));
    }
}

//! Reasoning gateway: one call-and-extract cycle per turn.
//!
//! Packages the state into a prompt, asks the provider, and pulls
//! `command` + `reasoning` out of the reply. Unusable replies come back as a
//! decision with no command; provider failures come back as `LlmError` and
//! are never retried here.

pub mod context;
pub mod instructions;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::ledger::TokenUsage;
use crate::llm::client::LlmError;
use crate::llm::LlmProvider;
use crate::state::GameState;

use instructions::Instructions;

/// Reasoning text used when the provider's reply could not be decoded.
pub const INVALID_FORMAT_REASONING: &str = "Invalid Format";

/// One turn's decision. `command` is `None` when the reply was unusable.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub command: Option<String>,
    pub reasoning: String,
    pub usage: Option<TokenUsage>,
}

impl Decision {
    fn invalid() -> Self {
        Self {
            command: None,
            reasoning: INVALID_FORMAT_REASONING.to_string(),
            usage: None,
        }
    }
}

/// Source of move decisions. Implemented by the gateway; faked in tests.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Decide a move for `state`. `Err` means the provider itself failed.
    async fn decide(&self, state: &GameState) -> Result<Decision, LlmError>;
}

/// Gateway backed by a real LLM provider.
#[derive(Debug, Clone)]
pub struct ReasoningGateway {
    provider: LlmProvider,
    instructions: Instructions,
}

impl ReasoningGateway {
    pub fn new(provider: LlmProvider, instructions: Instructions) -> Self {
        Self {
            provider,
            instructions,
        }
    }
}

#[async_trait]
impl Reasoner for ReasoningGateway {
    async fn decide(&self, state: &GameState) -> Result<Decision, LlmError> {
        let prompt = context::build_prompt(&self.instructions, state).map_err(LlmError::Encode)?;

        debug!(
            model = self.provider.model(),
            prompt_bytes = prompt.len(),
            turn = state.meta.turn,
            "querying reasoning provider"
        );
        let completion = self.provider.complete(prompt).await?;

        let Some(text) = completion.text.as_deref() else {
            warn!(
                stop_reason = completion.stop_reason.as_deref().unwrap_or("unknown"),
                "provider reply has no text content"
            );
            return Ok(Decision::invalid());
        };

        Ok(extract_decision(text, completion.usage))
    }
}

#[derive(Deserialize)]
struct DecisionReply {
    command: String,
    reasoning: String,
}

/// Decode the provider's text reply into a decision.
///
/// Never fails: anything that is not a JSON object with string `command` and
/// `reasoning` fields yields a decision without a command.
pub fn extract_decision(raw: &str, usage: TokenUsage) -> Decision {
    let body = strip_code_fence(raw);
    match serde_json::from_str::<DecisionReply>(&body) {
        Ok(reply) => Decision {
            command: Some(reply.command),
            reasoning: reply.reasoning,
            usage: Some(usage),
        },
        Err(e) => {
            warn!(error = %e, "provider reply is not a decision object");
            Decision::invalid()
        }
    }
}

/// Strip a Markdown code fence from LLM output.
///
/// Handles ```json ... ```, ``` ... ``` and bare text. The opening fence line
/// is dropped whatever its language tag.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().collect();
    lines.remove(0);
    if lines.last().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage() -> TokenUsage {
        TokenUsage::new(900, 100)
    }

    #[test]
    fn extracts_plain_json() {
        let d = extract_decision(
            r#"{"command": "G2@P21(b=0)+90", "reasoning": "opens a route for M1"}"#,
            usage(),
        );
        assert_eq!(d.command.as_deref(), Some("G2@P21(b=0)+90"));
        assert_eq!(d.reasoning, "opens a route for M1");
        assert_eq!(d.usage, Some(usage()));
    }

    #[test]
    fn extracts_fenced_json() {
        let raw = "```json\n{\"command\": \"G@P11-90\", \"reasoning\": \"r\"}\n```";
        let d = extract_decision(raw, usage());
        assert_eq!(d.command.as_deref(), Some("G@P11-90"));
    }

    #[test]
    fn not_json_yields_no_command() {
        let d = extract_decision("not json", usage());
        assert_eq!(d.command, None);
        assert_eq!(d.reasoning, INVALID_FORMAT_REASONING);
        assert_eq!(d.usage, None);
    }

    #[test]
    fn missing_fields_yield_no_command() {
        assert_eq!(extract_decision(r#"{"command": "G@P11-90"}"#, usage()).command, None);
        assert_eq!(extract_decision(r#"{"reasoning": "hmm"}"#, usage()).command, None);
        assert_eq!(
            extract_decision(r#"{"command": null, "reasoning": "x"}"#, usage()).command,
            None
        );
        assert_eq!(extract_decision(r#"["G@P11-90"]"#, usage()).command, None);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let d = extract_decision(
            r#"{"agent_id": "a", "command": "G@P11-90", "reasoning": "r", "meta": {}}"#,
            usage(),
        );
        assert_eq!(d.command.as_deref(), Some("G@P11-90"));
    }

    #[test]
    fn command_text_is_not_altered() {
        // Grammar checks happen later; extraction keeps the text verbatim.
        let d = extract_decision(
            r#"{"command": "G1@P11+90 because I want to win", "reasoning": "r"}"#,
            usage(),
        );
        assert_eq!(d.command.as_deref(), Some("G1@P11+90 because I want to win"));
    }

    #[test]
    fn strip_fence_variants() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn gateway_builds_from_parts() {
        let provider = LlmProvider::new("k".into(), "haiku", 256);
        let gateway = ReasoningGateway::new(provider, Instructions::builtin());
        assert!(!gateway.instructions.as_str().is_empty());
    }
}

//! Per-turn prompt context.
//!
//! Only the fields needed to pick a move are sent: status and scoring stay
//! out of the prompt.

use std::collections::BTreeMap;

use serde::Serialize;

use super::instructions::Instructions;
use crate::state::{GameState, Meta, Mouse};

/// The JSON object the provider sees each turn.
#[derive(Debug, Serialize)]
pub struct PromptContext<'a> {
    pub meta: &'a Meta,
    pub inventory: &'a BTreeMap<String, u32>,
    pub mice: &'a BTreeMap<String, Mouse>,
    pub board_encoding: &'a BTreeMap<String, String>,
    pub history_full: &'a [String],
}

impl<'a> PromptContext<'a> {
    pub fn from_state(state: &'a GameState) -> Self {
        Self {
            meta: &state.meta,
            inventory: &state.data.inventory,
            mice: &state.data.mice,
            board_encoding: &state.data.board_encoding,
            history_full: &state.data.history,
        }
    }
}

/// Build the turn section that follows the instruction document.
pub fn build_turn_message(state: &GameState) -> Result<String, serde_json::Error> {
    let context = serde_json::to_string(&PromptContext::from_state(state))?;
    Ok(format!(
        "--- CURRENT SITUATION (TURN {}) ---\n{context}\nTASK: Generate JSON response with best move.",
        state.meta.turn
    ))
}

/// Instruction document plus this turn's context, as one payload.
pub fn build_prompt(
    instructions: &Instructions,
    state: &GameState,
) -> Result<String, serde_json::Error> {
    let turn = build_turn_message(state)?;
    Ok(format!("{}\n\n{turn}", instructions.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::mid_game;

    #[test]
    fn context_has_exactly_the_move_fields() {
        let state = mid_game();
        let value = serde_json::to_value(PromptContext::from_state(&state)).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys.len(),
            5,
            "unexpected context keys: {keys:?}"
        );
        for key in ["meta", "inventory", "mice", "board_encoding", "history_full"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value.get("status").is_none());
        assert!(value.get("scoring").is_none());
        assert_eq!(value["history_full"][0], "J1: G1@P11(b=2)+90");
        assert_eq!(value["meta"]["dimensions"], "3x3");
    }

    #[test]
    fn turn_message_names_turn() {
        let msg = build_turn_message(&mid_game()).unwrap();
        assert!(msg.starts_with("--- CURRENT SITUATION (TURN 5) ---"));
        assert!(msg.ends_with("TASK: Generate JSON response with best move."));
        assert!(!msg.contains("benchmark_score"));
        assert!(!msg.contains("Rotating P33 frees M2"));
    }

    #[test]
    fn prompt_starts_with_instructions() {
        let instructions = Instructions::builtin();
        let prompt = build_prompt(&instructions, &mid_game()).unwrap();
        assert!(prompt.starts_with(instructions.as_str()));
        assert!(prompt.contains("\"board_encoding\""));
    }
}

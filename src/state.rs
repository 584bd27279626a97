//! The server's authoritative game snapshot. The agent only reads it.
//!
//! Every accepted move returns a fresh snapshot that replaces the previous
//! one in full. Fields the agent does not interpret are kept so they can be
//! forwarded to the reasoning provider unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::command::Phase;

/// History entries carrying this marker report a server-side entropy shuffle.
pub const ENTROPY_MARKER: &str = "[EVENT]";

/// Full snapshot returned by `/start_game` and `/submit_move`.
///
/// The server sends `null` for values it has not computed yet, so every field
/// falls back to its default on a missing key or a `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: Meta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Status,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scoring: Scoring,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: BoardData,
}

/// Match metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, deserialize_with = "string_or_number")]
    pub level_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub turn: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_moves: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ideal_moves: u32,
    /// Anything else the server sends (dimensions, agent id, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default, deserialize_with = "null_as_default")]
    pub game_over: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mice_rescued: u32,
    #[serde(default)]
    pub total_mice: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completion_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoring {
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_points: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub benchmark_score: f64,
}

/// The physical board: inventory, mice, tiles and the move log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardData {
    /// Gear type label (`G1`..`G4`) to remaining count.
    #[serde(default, deserialize_with = "null_as_default")]
    pub inventory: BTreeMap<String, u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mice: BTreeMap<String, Mouse>,
    /// Coordinate token to tile/gear encoding, or `"obstacle"`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub board_encoding: BTreeMap<String, String>,
    /// Append-only, human-readable move log.
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<String>,
    /// Echo of the reasoning text sent with the previous move.
    #[serde(default)]
    pub last_reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mouse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pos: String,
    /// Base index 0..=3 while on a gear; the server sends `null` or `"null"` otherwise.
    #[serde(default)]
    pub on_base: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: MouseStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MouseStatus {
    Waiting,
    InPlay,
    Escaped,
    #[default]
    #[serde(other)]
    Unknown,
}

impl GameState {
    /// Placement while any gear remains in inventory, rotation after.
    pub fn phase(&self) -> Phase {
        if self.data.inventory.values().any(|&count| count > 0) {
            Phase::Placement
        } else {
            Phase::Rotation
        }
    }

    pub fn is_over(&self) -> bool {
        self.status.game_over
    }

    /// Number of entropy events recorded in the history so far.
    pub fn entropy_events(&self) -> usize {
        self.data
            .history
            .iter()
            .filter(|entry| entry.contains(ENTROPY_MARKER))
            .count()
    }

    pub fn mice_escaped(&self) -> usize {
        self.data
            .mice
            .values()
            .filter(|m| m.status == MouseStatus::Escaped)
            .count()
    }
}

/// Read `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `"3"` or `3` for identifiers the server is loose about.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

//! Game transport: the two server operations the agent needs.
//!
//! `GameServer` is the seam the controller drives; `GameClient` is the
//! HTTP implementation.

pub mod client;

use async_trait::async_trait;

use crate::state::GameState;

pub use client::GameClient;

/// Why a session could not be started.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("game server unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("game server refused to start (status {status}): {body}")]
    Refused { status: u16, body: String },

    #[error("invalid start response: {0}")]
    InvalidResponse(String),
}

/// Outcome of one move submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    /// The move was applied. `state` replaces the held snapshot; it is `None`
    /// when the reply carried no state the agent could decode.
    Accepted {
        state: Option<GameState>,
        terminated: bool,
    },
    /// The server refused the move. Some servers still attach a state.
    Rejected {
        message: String,
        state: Option<GameState>,
    },
    /// The move may not have reached the server. Safe to resubmit.
    TransportError { detail: String },
}

/// Game server operations, in submission order.
#[async_trait]
pub trait GameServer: Send + Sync {
    /// Open a session on `level_id` and return the opening state.
    async fn start(&self, level_id: &str) -> Result<GameState, StartError>;

    /// Submit one command with the session-cumulative token total.
    async fn submit(&self, command: &str, reasoning: &str, token_total: u64) -> SubmitResult;
}

//! Turn controller. Drives one game session from start to end.
//!
//! ## State machine
//!
//! `Starting → Playing → (Terminated | Aborted)`. The two end states are
//! absorbing: once reached, no further network call is made.
//!
//! ## Per-iteration cycle
//!
//! 1. Ask the reasoner for a decision against the held state.
//! 2. Add the call's token total to the session ledger.
//! 3. Grammar-check the command, then submit it with the session total.
//! 4. Transport error: resubmit the same command after a fixed delay.
//! 5. Rejection: drop the decision and ask again against the same state.
//! 6. Accepted: replace the held state; stop if the game is over.
//!
//! Every pass through the loop counts toward a ceiling of the server's move
//! budget plus a fixed margin.

pub mod error;

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::config::AgentConfig;
use crate::gateway::Reasoner;
use crate::ledger::TokenLedger;
use crate::state::GameState;
use crate::transport::{GameServer, SubmitResult};

pub use error::ErrorClass;

/// Controller knobs, taken from `AgentConfig`.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub level_id: String,
    pub retry_delay: Duration,
    pub turn_margin: u32,
    pub validate_commands: bool,
}

impl From<&AgentConfig> for ControllerSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            level_id: config.level_id.clone(),
            retry_delay: config.retry_delay,
            turn_margin: config.turn_margin,
            validate_commands: config.validate_commands,
        }
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Starting,
    Playing,
    Terminated,
    Aborted,
}

/// Why a session ended without a declared result.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// `start` failed; no game exists.
    StartFailed { class: ErrorClass, detail: String },
    /// The reasoning provider failed.
    Fatal { detail: String },
    /// The loop ran out of iterations before the game ended.
    IterationCeiling { limit: u32 },
    /// Stopped by an interrupt signal.
    Interrupted,
}

/// Final figures of a finished game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub result: String,
    pub benchmark_score: f64,
    pub raw_points: i64,
    pub mice_rescued: u32,
    pub turns_played: u32,
    pub token_total: u64,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Terminated(GameSummary),
    Aborted {
        reason: AbortReason,
        turns_played: u32,
        token_total: u64,
    },
}

impl SessionOutcome {
    /// Whether the session ended on an infrastructure failure.
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionOutcome::Terminated(_) => false,
            SessionOutcome::Aborted { reason, .. } => matches!(
                reason,
                AbortReason::Fatal { .. } | AbortReason::StartFailed { .. }
            ),
        }
    }
}

/// A validated command waiting to be (re)submitted.
#[derive(Debug)]
struct PendingMove {
    command: String,
    reasoning: String,
}

/// Sequential decision/submit loop over one game session.
pub struct TurnController<R, S> {
    reasoner: R,
    server: S,
    settings: ControllerSettings,
    ledger: TokenLedger,
    phase: SessionPhase,
    turns_played: u32,
    outcome: Option<SessionOutcome>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<R: Reasoner, S: GameServer> TurnController<R, S> {
    pub fn new(reasoner: R, server: S, settings: ControllerSettings) -> Self {
        Self {
            reasoner,
            server,
            settings,
            ledger: TokenLedger::new(),
            phase: SessionPhase::Starting,
            turns_played: 0,
            outcome: None,
            shutdown: None,
        }
    }

    /// Stop at the next check once `true` is sent on this channel.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn reasoner(&self) -> &R {
        &self.reasoner
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Run the session to an end state.
    ///
    /// Calling again after the session ended returns the same outcome
    /// without touching the network.
    pub async fn run(&mut self) -> SessionOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = self.run_session().await;
        self.outcome = Some(outcome.clone());
        outcome
    }

    async fn run_session(&mut self) -> SessionOutcome {
        info!(level = %self.settings.level_id, "starting game session");
        let state = match self.server.start(&self.settings.level_id).await {
            Ok(state) => state,
            Err(e) => {
                let class = ErrorClass::from(&e);
                error!(%class, error = %e, "could not start game session");
                return self.abort(AbortReason::StartFailed {
                    class,
                    detail: e.to_string(),
                });
            }
        };

        info!(
            level = %state.meta.level_id,
            max_moves = state.meta.max_moves,
            ideal_moves = state.meta.ideal_moves,
            "game started"
        );
        self.phase = SessionPhase::Playing;
        self.play(state).await
    }

    async fn play(&mut self, mut state: GameState) -> SessionOutcome {
        if state.is_over() {
            return self.finish(&state);
        }

        let limit = state.meta.max_moves.saturating_add(self.settings.turn_margin);
        let mut iterations: u32 = 0;
        let mut pending: Option<PendingMove> = None;

        loop {
            if self.interrupted() {
                info!("interrupt received, stopping");
                return self.abort(AbortReason::Interrupted);
            }
            if iterations >= limit {
                warn!(limit, "iteration ceiling reached without a result");
                return self.abort(AbortReason::IterationCeiling { limit });
            }
            iterations += 1;

            let mv = match pending.take() {
                Some(mv) => mv,
                None => match self.next_move(&state, iterations).await {
                    Ok(Some(mv)) => mv,
                    Ok(None) => {
                        self.pause().await;
                        continue;
                    }
                    Err(reason) => return self.abort(reason),
                },
            };

            // Stop between the decision and the submission too; the decision
            // has no external effect until it is submitted.
            if self.interrupted() {
                info!("interrupt received, stopping");
                return self.abort(AbortReason::Interrupted);
            }

            match self
                .server
                .submit(&mv.command, &mv.reasoning, self.ledger.total())
                .await
            {
                SubmitResult::TransportError { detail } => {
                    warn!(
                        class = %ErrorClass::RecoverableTransport,
                        %detail,
                        command = %mv.command,
                        "move did not reach the game server, resubmitting"
                    );
                    pending = Some(mv);
                    self.pause().await;
                }
                SubmitResult::Rejected {
                    message,
                    state: echoed,
                } => {
                    warn!(
                        class = %ErrorClass::RecoverableRejection,
                        %message,
                        command = %mv.command,
                        "move rejected, asking for a new decision"
                    );
                    if let Some(echoed) = echoed.filter(GameState::is_over) {
                        return self.finish(&echoed);
                    }
                    self.pause().await;
                }
                SubmitResult::Accepted {
                    state: next,
                    terminated,
                } => {
                    self.turns_played += 1;
                    match next {
                        Some(next) => {
                            if next.entropy_events() > state.entropy_events() {
                                info!(
                                    event = next.data.history.last().map(String::as_str).unwrap_or(""),
                                    "entropy event, board was reshuffled"
                                );
                            }
                            if let Some(echo) = next.data.last_reasoning.as_deref() {
                                debug!(echo, "server echoed reasoning");
                            }
                            state = next;
                        }
                        None => warn!(
                            command = %mv.command,
                            "accepted reply carried no usable state, keeping the previous snapshot"
                        ),
                    }
                    info!(
                        command = %mv.command,
                        turn = state.meta.turn,
                        points = state.scoring.raw_points,
                        rescued = state.status.mice_rescued,
                        "move accepted"
                    );
                    if terminated || state.is_over() {
                        return self.finish(&state);
                    }
                }
            }
        }
    }

    /// Get a submittable move, `Ok(None)` for a recoverable format failure.
    async fn next_move(
        &mut self,
        state: &GameState,
        iteration: u32,
    ) -> Result<Option<PendingMove>, AbortReason> {
        info!(iteration, turn = state.meta.turn, "requesting decision");

        let decision = match self.reasoner.decide(state).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(
                    class = %ErrorClass::from(&e),
                    error = %e,
                    "reasoning provider failed, ending session"
                );
                return Err(AbortReason::Fatal {
                    detail: e.to_string(),
                });
            }
        };

        if let Some(usage) = &decision.usage {
            let session = self.ledger.record(usage);
            info!(call = usage.total, session, "tokens");
        }

        let Some(raw) = decision.command else {
            warn!(
                class = %ErrorClass::RecoverableFormat,
                "provider gave no usable decision, retrying"
            );
            return Ok(None);
        };

        let command = if self.settings.validate_commands {
            match Command::validate(raw.trim(), state.phase()) {
                Ok(command) => command.to_string(),
                Err(e) => {
                    warn!(
                        class = %ErrorClass::RecoverableFormat,
                        error = %e,
                        command = %raw,
                        "command failed the grammar check, retrying"
                    );
                    return Ok(None);
                }
            }
        } else {
            raw.trim().to_string()
        };

        info!(reasoning = %decision.reasoning, %command, "decision");
        Ok(Some(PendingMove {
            command,
            reasoning: decision.reasoning,
        }))
    }

    fn interrupted(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    async fn pause(&self) {
        tokio::time::sleep(self.settings.retry_delay).await;
    }

    fn finish(&mut self, state: &GameState) -> SessionOutcome {
        self.phase = SessionPhase::Terminated;
        let summary = GameSummary {
            result: state.status.result.clone(),
            benchmark_score: state.scoring.benchmark_score,
            raw_points: state.scoring.raw_points,
            mice_rescued: state.status.mice_rescued,
            turns_played: self.turns_played,
            token_total: self.ledger.total(),
        };
        info!(
            result = %summary.result,
            score = summary.benchmark_score,
            points = summary.raw_points,
            rescued = summary.mice_rescued,
            turns = summary.turns_played,
            tokens = summary.token_total,
            "game over"
        );
        SessionOutcome::Terminated(summary)
    }

    fn abort(&mut self, reason: AbortReason) -> SessionOutcome {
        self.phase = SessionPhase::Aborted;
        SessionOutcome::Aborted {
            reason,
            turns_played: self.turns_played,
            token_total: self.ledger.total(),
        }
    }
}

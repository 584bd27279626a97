//! Session-cumulative token usage, reported to the game server with every move.
//!
//! The server wants the running total for the whole match on every
//! submission, not the figure for the last call.

use serde::{Deserialize, Serialize};

/// Per-call usage counters reported by the reasoning provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input,
            output,
            total: input.saturating_add(output),
        }
    }
}

/// Monotonic session total. Only ever added to.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenLedger {
    total: u64,
    calls: u32,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one call's `total` and return the new session total.
    pub fn record(&mut self, usage: &TokenUsage) -> u64 {
        self.total = self.total.saturating_add(usage.total);
        self.calls += 1;
        self.total
    }

    /// Session-cumulative total.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of provider calls that reported usage.
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

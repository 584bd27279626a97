//! LLM-driven agent for the gear-and-mice puzzle benchmark.
//!
//! A [`controller::TurnController`] starts a session on the game server,
//! asks a [`gateway::Reasoner`] for one command per turn, checks it against
//! the command grammar and submits it with the session's running token total.

pub mod command;
pub mod config;
pub mod controller;
pub mod gateway;
pub mod ledger;
pub mod llm;
pub mod state;
pub mod transport;

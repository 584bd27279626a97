//! gear-agent entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gear_agent::config::{default_agent_id, AgentConfig};
use gear_agent::controller::{ControllerSettings, SessionOutcome, TurnController};
use gear_agent::gateway::instructions::Instructions;
use gear_agent::gateway::ReasoningGateway;
use gear_agent::llm::LlmProvider;
use gear_agent::transport::GameClient;

#[derive(Debug, Parser)]
#[command(name = "gear-agent", version, about = "Plays one gear puzzle session with an LLM")]
struct Cli {
    /// Level to play (1-6).
    #[arg(short, long)]
    level: Option<String>,

    /// Model alias (opus, sonnet, haiku) or full model id.
    #[arg(short, long)]
    model: Option<String>,

    /// Game server base URL.
    #[arg(long)]
    server: Option<String>,

    /// Agent id reported to the server.
    #[arg(long)]
    agent_id: Option<String>,

    /// Delay before a recoverable retry, in milliseconds.
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Replace the built-in game instructions with this file.
    #[arg(long)]
    instructions: Option<PathBuf>,

    /// Log filter, e.g. `info` or `gear_agent=debug`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    /// Submit commands without checking the grammar first.
    #[arg(long)]
    no_validate: bool,
}

impl Cli {
    fn apply(self, config: &mut AgentConfig) {
        if let Some(level) = self.level {
            config.level_id = level;
        }
        if let Some(model) = self.model {
            if self.agent_id.is_none() && config.agent_id == default_agent_id(&config.model) {
                config.agent_id = default_agent_id(&model);
            }
            config.model = model;
        }
        if let Some(server) = self.server {
            config.server_url = server;
        }
        if let Some(agent_id) = self.agent_id {
            config.agent_id = agent_id;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(path) = self.instructions {
            config.instructions_path = Some(path);
        }
        if self.no_validate {
            config.validate_commands = false;
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli).await {
        Ok(outcome) if outcome.is_fatal() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<SessionOutcome> {
    let mut config = AgentConfig::from_env().context("loading configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let instructions = match &config.instructions_path {
        Some(path) => Instructions::from_file(path)
            .with_context(|| format!("reading instructions from {}", path.display()))?,
        None => Instructions::builtin(),
    };

    let provider = LlmProvider::with_base_url(
        config.api_key.clone(),
        &config.model,
        config.max_tokens,
        config.llm_base_url.clone(),
    );
    let server = GameClient::new(
        &config.server_url,
        config.agent_id.clone(),
        provider.model().to_string(),
    );
    info!(
        server = %config.server_url,
        model = provider.model(),
        agent = %config.agent_id,
        level = %config.level_id,
        "agent configured"
    );
    let reasoner = ReasoningGateway::new(provider, instructions);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("ctrl-c received, finishing current step");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut controller = TurnController::new(reasoner, server, ControllerSettings::from(&config))
        .with_shutdown(shutdown_rx);
    let outcome = controller.run().await;

    match &outcome {
        SessionOutcome::Terminated(summary) => info!(
            result = %summary.result,
            score = summary.benchmark_score,
            turns = summary.turns_played,
            tokens = summary.token_total,
            "session finished"
        ),
        SessionOutcome::Aborted {
            reason,
            turns_played,
            token_total,
        } => warn!(
            ?reason,
            turns = turns_played,
            tokens = token_total,
            "session aborted"
        ),
    }
    Ok(outcome)
}

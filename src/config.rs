//! Agent configuration, read once at startup and immutable afterwards.
//!
//! Environment first (after `.env` is loaded by the binary), then CLI
//! overrides applied on top by `main`. Nothing else reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::llm::client::DEFAULT_BASE_URL;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:9009";
pub const DEFAULT_MODEL: &str = "sonnet";
pub const DEFAULT_LEVEL: &str = "1";
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
pub const DEFAULT_TURN_MARGIN: u32 = 20;
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Playable levels, lowest difficulty first.
pub const LEVELS: &[&str] = &["1", "2", "3", "4", "5", "6"];

/// Errors building the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing API key: {0}")]
    MissingApiKey(String),

    #[error("unknown level {0:?} (expected one of 1-6)")]
    UnknownLevel(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Everything the agent needs, fixed for the whole session.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: String,
    pub llm_base_url: String,
    pub server_url: String,
    pub level_id: String,
    pub model: String,
    pub agent_id: String,
    pub max_tokens: u32,
    /// Fixed delay before any recoverable retry.
    pub retry_delay: Duration,
    /// Added to the server's move budget to get the loop ceiling.
    pub turn_margin: u32,
    /// Check commands against the grammar before submitting.
    pub validate_commands: bool,
    /// Replacement instruction document, if any.
    pub instructions_path: Option<PathBuf>,
}

impl AgentConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("ANTHROPIC_API_KEY").ok_or_else(|| {
            ConfigError::MissingApiKey("ANTHROPIC_API_KEY environment variable not set".into())
        })?;

        let model = get("GEAR_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());
        let agent_id = get("GEAR_AGENT_ID").unwrap_or_else(|| default_agent_id(&model));

        let config = Self {
            api_key,
            llm_base_url: get("ANTHROPIC_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            server_url: get("SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.into()),
            level_id: get("GEAR_LEVEL").unwrap_or_else(|| DEFAULT_LEVEL.into()),
            model,
            agent_id,
            max_tokens: parse_or("GEAR_MAX_TOKENS", get("GEAR_MAX_TOKENS"), DEFAULT_MAX_TOKENS)?,
            retry_delay: Duration::from_millis(parse_or(
                "GEAR_RETRY_DELAY_MS",
                get("GEAR_RETRY_DELAY_MS"),
                DEFAULT_RETRY_DELAY_MS,
            )?),
            turn_margin: parse_or(
                "GEAR_TURN_MARGIN",
                get("GEAR_TURN_MARGIN"),
                DEFAULT_TURN_MARGIN,
            )?,
            validate_commands: parse_or(
                "GEAR_VALIDATE_COMMANDS",
                get("GEAR_VALIDATE_COMMANDS"),
                true,
            )?,
            instructions_path: get("GEAR_INSTRUCTIONS").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints. Call again after applying overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LEVELS.contains(&self.level_id.as_str()) {
            return Err(ConfigError::UnknownLevel(self.level_id.clone()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "GEAR_MAX_TOKENS",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

/// Agent id the server's leaderboard shows when none is configured.
pub fn default_agent_id(model: &str) -> String {
    format!("Gear-Agent-{model}")
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_only_api_key() {
        let config = AgentConfig::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.llm_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.level_id, "1");
        assert_eq!(config.model, "sonnet");
        assert_eq!(config.agent_id, "Gear-Agent-sonnet");
        assert_eq!(config.retry_delay, Duration::from_millis(2000));
        assert_eq!(config.turn_margin, 20);
        assert!(config.validate_commands);
        assert!(config.instructions_path.is_none());
    }

    #[test]
    fn missing_api_key() {
        let err = AgentConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let err = AgentConfig::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey(_)));
    }

    #[test]
    fn overrides_from_environment() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "k"),
            ("SERVER_URL", "http://green:9009"),
            ("GEAR_LEVEL", "4"),
            ("GEAR_MODEL", "opus"),
            ("GEAR_RETRY_DELAY_MS", "250"),
            ("GEAR_TURN_MARGIN", "5"),
            ("GEAR_VALIDATE_COMMANDS", "false"),
            ("GEAR_INSTRUCTIONS", "/etc/gear/rules.md"),
        ]))
        .unwrap();
        assert_eq!(config.server_url, "http://green:9009");
        assert_eq!(config.level_id, "4");
        assert_eq!(config.agent_id, "Gear-Agent-opus");
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.turn_margin, 5);
        assert!(!config.validate_commands);
        assert_eq!(
            config.instructions_path.as_deref(),
            Some(std::path::Path::new("/etc/gear/rules.md"))
        );
    }

    #[test]
    fn rejects_unknown_level() {
        let err = AgentConfig::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "k"), ("GEAR_LEVEL", "7")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLevel(l) if l == "7"));
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = AgentConfig::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "k"),
            ("GEAR_RETRY_DELAY_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "GEAR_RETRY_DELAY_MS",
                ..
            }
        ));
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_DAILY_BUDGET: u64 = 100_000;
const DEFAULT_INTERVAL_MS: u64 = 5 * 60 * 1000;
const DEFAULT_ESCALATION_THRESHOLD: u32 = 3;
const DEFAULT_CHEAP_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_CAPABLE_MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ANTHROPIC_API_KEY is not set and the test bypass is off")]
    MissingApiKey,
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Seed configuration for the evolution loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvoConfig {
    /// Anthropic API key. Never serialized.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Test bypass: permit a missing API key (simulated transports only).
    pub allow_missing_api_key: bool,
    /// Daily token cap.
    pub daily_budget: u64,
    /// Milliseconds between scheduled cycles.
    pub interval_ms: u64,
    /// Start the periodic schedule at boot.
    pub auto_start: bool,
    /// Consecutive failures before model escalation.
    pub escalation_threshold: u32,
    pub cheap_model_tag: String,
    pub capable_model_tag: String,
    /// Directory holding the evolvable sources.
    pub evolvable_dir: PathBuf,
}

impl Default for EvoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            allow_missing_api_key: false,
            daily_budget: DEFAULT_DAILY_BUDGET,
            interval_ms: DEFAULT_INTERVAL_MS,
            auto_start: false,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            cheap_model_tag: DEFAULT_CHEAP_MODEL.into(),
            capable_model_tag: DEFAULT_CAPABLE_MODEL.into(),
            evolvable_dir: PathBuf::from("evolvable"),
        }
    }
}

impl EvoConfig {
    /// Relaxed configuration for demos: fast ticks, simulated transports.
    pub fn demo() -> Self {
        Self {
            allow_missing_api_key: true,
            daily_budget: 10_000,
            interval_ms: 1_000,
            ..Self::default()
        }
    }

    /// Read configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ..Self::default()
        };
        if let Some(value) = read_env("EVO_DAILY_BUDGET") {
            config.daily_budget = parse_env("EVO_DAILY_BUDGET", &value)?;
        }
        if let Some(value) = read_env("EVO_INTERVAL_MS") {
            config.interval_ms = parse_env("EVO_INTERVAL_MS", &value)?;
        }
        if let Some(value) = read_env("EVO_ESCALATION_THRESHOLD") {
            config.escalation_threshold = parse_env("EVO_ESCALATION_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("EVO_AUTO_START") {
            config.auto_start = matches!(value.as_str(), "1" | "true" | "yes");
        }
        if let Some(value) = read_env("EVO_EVOLVABLE_DIR") {
            config.evolvable_dir = PathBuf::from(value);
        }
        Ok(config)
    }

    /// Startup check: a missing API key is fatal unless bypassed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_none() && !self.allow_missing_api_key {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

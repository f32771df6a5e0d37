//! Engine configuration.
//!
//! Defaults cover every field; a handful can be overridden from the
//! environment (optionally via a `.env` file).

use crate::brain::context::{DEFAULT_CONTEXT_WINDOW, DEFAULT_POSITIVE_TREND};
use crate::brain::crisis::CrisisConfig;
use crate::brain::intent::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::brain::selector::SelectorConfig;
use crate::error::AppError;
use crate::fs_manager::PortablePathManager;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use validator::Validate;

pub const ENV_INTENTS_PATH: &str = "SOLACE_INTENTS_PATH";
pub const ENV_MODEL_DIR: &str = "SOLACE_MODEL_DIR";
pub const ENV_SEED: &str = "SOLACE_SEED";
pub const ENV_MAX_SESSIONS: &str = "SOLACE_MAX_SESSIONS";
pub const ENV_CRISIS_RESET_AFTER: &str = "SOLACE_CRISIS_RESET_AFTER";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    pub intents_path: PathBuf,
    pub model_dir: PathBuf,
    /// Fixed RNG seed; `None` seeds each session from entropy
    pub seed: Option<u64>,
    #[validate(range(min = 1))]
    pub max_sessions: usize,
    /// Turns kept in the orchestrator's per-session history
    #[validate(range(min = 1))]
    pub history_turns: usize,
    /// Messages kept in the dialogue context window
    #[validate(range(min = 1))]
    pub context_window: usize,
    #[validate(range(min = 0.0, max = 1.0))]
    pub pattern_confidence_threshold: f32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub actionable_probability: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub validation_probability: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub resource_probability: f64,
    #[validate(range(min = -1.0, max = 1.0))]
    pub positive_trend_threshold: f32,
    #[validate(nested)]
    pub crisis: CrisisConfig,
    /// Leave CRISIS after this many consecutive crisis-free turns; `None` means manual reset only
    #[validate(range(min = 1))]
    pub crisis_reset_after: Option<u32>,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intents_path: PortablePathManager::intents_file(),
            model_dir: PortablePathManager::models_dir(),
            seed: None,
            max_sessions: 1024,
            history_turns: 4,
            context_window: DEFAULT_CONTEXT_WINDOW,
            pattern_confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            actionable_probability: 0.7,
            validation_probability: 0.4,
            resource_probability: 0.6,
            positive_trend_threshold: DEFAULT_POSITIVE_TREND,
            crisis: CrisisConfig::default(),
            crisis_reset_after: None,
            request_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `SOLACE_*` environment variables, after loading
    /// `.env` if one exists. The result is validated.
    pub fn from_env() -> Result<Self, AppError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }

        let mut config = Self::default();
        if let Some(path) = env_var(ENV_INTENTS_PATH) {
            config.intents_path = PathBuf::from(path);
        }
        if let Some(dir) = env_var(ENV_MODEL_DIR) {
            config.model_dir = PathBuf::from(dir);
        }
        config.seed = parse_env(ENV_SEED)?.or(config.seed);
        config.max_sessions = parse_env(ENV_MAX_SESSIONS)?.unwrap_or(config.max_sessions);
        config.crisis_reset_after = parse_env(ENV_CRISIS_RESET_AFTER)?.or(config.crisis_reset_after);

        config.check()?;
        Ok(config)
    }

    /// Validate field ranges; failures are configuration errors.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::Config(format!("Invalid engine configuration: {}", e)))
    }

    pub fn selector(&self) -> SelectorConfig {
        SelectorConfig {
            actionable_probability: self.actionable_probability,
            validation_probability: self.validation_probability,
            resource_probability: self.resource_probability,
            positive_trend_threshold: self.positive_trend_threshold,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, AppError>
where
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{}='{}': {}", key, raw, e))),
    }
}

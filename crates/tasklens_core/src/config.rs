//! Engine configuration: recommendation policy thresholds and scorer knobs.
//!
//! # Responsibility
//! - Name every policy threshold instead of inlining literals.
//! - Load partial JSON overrides on top of defaults.
//!
//! # Invariants
//! - `EngineConfig::default()` reproduces the shipped product policy.
//! - Loaded configurations are validated before use.

use crate::model::DAY_MS;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Trailing analysis window in days.
pub const ANALYSIS_WINDOW_DAYS: i64 = 7;
/// Completion rates strictly below this emit a productivity recommendation.
pub const MIN_COMPLETION_RATE: f64 = 0.5;
/// Per-day spread strictly above this emits a balance recommendation.
pub const MAX_DAILY_SPREAD: usize = 3;
/// A plan with strictly more steps than this marks a task as complex.
pub const COMPLEX_TASK_MIN_STEPS: usize = 5;
/// Strictly more complex tasks than this emit a complexity recommendation.
pub const MAX_COMPLEX_TASKS: usize = 2;

pub const DEFAULT_TRAINING_EPOCHS: u32 = 200;
pub const DEFAULT_LEARNING_RATE: f64 = 0.5;
pub const DEFAULT_L2_PENALTY: f64 = 0.001;

/// Thresholds used by the heuristic recommendation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationPolicy {
    pub window_days: i64,
    pub min_completion_rate: f64,
    pub max_daily_spread: usize,
    pub complex_task_min_steps: usize,
    pub max_complex_tasks: usize,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            window_days: ANALYSIS_WINDOW_DAYS,
            min_completion_rate: MIN_COMPLETION_RATE,
            max_daily_spread: MAX_DAILY_SPREAD,
            complex_task_min_steps: COMPLEX_TASK_MIN_STEPS,
            max_complex_tasks: MAX_COMPLEX_TASKS,
        }
    }
}

impl RecommendationPolicy {
    /// Inclusive lower bound of the analysis window for `now`.
    pub fn window_start(&self, now: i64) -> i64 {
        now.saturating_sub(self.window_days.saturating_mul(DAY_MS))
    }
}

/// Training and freshness settings for the task scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub epochs: u32,
    pub learning_rate: f64,
    pub l2_penalty: f64,
    /// Snapshots older than this are retrained on the next rank call.
    /// `None` keeps a snapshot until an explicit retrain.
    pub stale_after_ms: Option<i64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_TRAINING_EPOCHS,
            learning_rate: DEFAULT_LEARNING_RATE,
            l2_penalty: DEFAULT_L2_PENALTY,
            stale_after_ms: None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub policy: RecommendationPolicy,
    pub scoring: ScoringConfig,
}

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = &self.policy;
        if policy.window_days <= 0 {
            return Err(ConfigError::Invalid(format!(
                "policy.window_days must be positive, got {}",
                policy.window_days
            )));
        }
        if !(0.0..=1.0).contains(&policy.min_completion_rate) {
            return Err(ConfigError::Invalid(format!(
                "policy.min_completion_rate must be within [0, 1], got {}",
                policy.min_completion_rate
            )));
        }

        let scoring = &self.scoring;
        if scoring.epochs == 0 {
            return Err(ConfigError::Invalid(
                "scoring.epochs must be at least 1".to_string(),
            ));
        }
        if !(scoring.learning_rate > 0.0 && scoring.learning_rate.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "scoring.learning_rate must be positive, got {}",
                scoring.learning_rate
            )));
        }
        if !(scoring.l2_penalty >= 0.0 && scoring.l2_penalty.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "scoring.l2_penalty must be non-negative, got {}",
                scoring.l2_penalty
            )));
        }
        if let Some(age) = scoring.stale_after_ms {
            if age <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "scoring.stale_after_ms must be positive, got {age}"
                )));
            }
        }
        Ok(())
    }
}

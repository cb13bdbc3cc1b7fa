//! Engine configuration.
//!
//! All tunables live in one explicit value constructed at startup (from a
//! TOML file or defaults) and passed into `Orchestrator` construction;
//! there are no process-wide mutable settings. Steps receive their
//! thresholds at construction time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Top-level configuration for the orchestration engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub thresholds: ThresholdSection,
    #[serde(default)]
    pub evaluation: EvalSection,
}

/// Engine identity and per-turn limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    /// Engine instance name, used in logs and reports.
    #[serde(default = "default_engine_name")]
    pub name: String,
    /// Upper bound on dispatched steps per turn; the loop guard of last
    /// resort.
    #[serde(default = "default_max_steps_per_turn")]
    pub max_steps_per_turn: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            max_steps_per_turn: default_max_steps_per_turn(),
        }
    }
}

/// Thresholds threaded to the steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdSection {
    /// Entities below this classifier confidence are treated as absent.
    #[serde(default = "default_entity_confidence")]
    pub entity_confidence: f64,
    /// Documents retrieved per knowledge lookup.
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,
    /// Timeout applied to each external collaborator call, milliseconds.
    /// On expiry the step requests escalation instead of hanging the turn.
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
}

impl ThresholdSection {
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

impl Default for ThresholdSection {
    fn default() -> Self {
        Self {
            entity_confidence: default_entity_confidence(),
            retrieval_top_k: default_retrieval_top_k(),
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
        }
    }
}

/// Evaluation harness settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvalSection {
    /// Cap on queries per configuration; `None` evaluates the full set.
    pub sample_size: Option<usize>,
    /// Path to the JSON query set.
    pub dataset_path: Option<String>,
    /// Where to write the JSON metrics report.
    pub report_path: Option<String>,
}

fn default_engine_name() -> String {
    "deskpilot".to_string()
}

fn default_max_steps_per_turn() -> usize {
    8
}

fn default_entity_confidence() -> f64 {
    0.7
}

fn default_retrieval_top_k() -> usize {
    5
}

fn default_collaborator_timeout_ms() -> u64 {
    5000
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.thresholds.entity_confidence) {
            return Err(ConfigError::InvalidConfig(format!(
                "entity_confidence must be within [0.0, 1.0], got {}",
                self.thresholds.entity_confidence
            )));
        }
        if self.thresholds.retrieval_top_k == 0 {
            return Err(ConfigError::InvalidConfig(
                "retrieval_top_k must be at least 1".to_string(),
            ));
        }
        if self.engine.max_steps_per_turn < 2 {
            // A turn needs at least triage plus one handler.
            return Err(ConfigError::InvalidConfig(format!(
                "max_steps_per_turn must be at least 2, got {}",
                self.engine.max_steps_per_turn
            )));
        }
        if self.thresholds.collaborator_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "collaborator_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

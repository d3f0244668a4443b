//! Tunable parameters and file locations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Parameters of the scoring and selection heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveParams {
    /// Minimum similarity for a neighbor to be suppressed.
    pub sim_threshold: f64,
    /// Weight of the easy-neighbor suppression penalty.
    pub suppress_lambda: f64,
    /// Items at or above this difficulty count as complex.
    pub complex_difficulty_min: u8,
    /// How many neighbors a lookup is expected to return.
    pub topk_neighbors: usize,
    /// Weight of the boost for neighbors of recent mistakes.
    pub boost_lambda: f64,
    /// Ability mean of a fresh session.
    pub ability_init: f64,
    /// Ability variance of a fresh session.
    pub variance_init: f64,
    /// UCB exploration coefficient.
    pub ucb_c: f64,
    /// Step size of the value-table update.
    pub learning_rate: f64,
    /// Discount applied to the bootstrapped next value.
    pub discount: f64,
    /// Cap on the recent-correct-complex and recent-wrong id windows.
    pub recent_window: usize,
    /// Number of past rounds used to warm-start the value table.
    pub history_rounds: usize,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            sim_threshold: 0.70,
            suppress_lambda: 6.0,
            complex_difficulty_min: 3,
            topk_neighbors: 100,
            boost_lambda: 3.0,
            ability_init: 3.0,
            variance_init: 1.0,
            ucb_c: std::f64::consts::SQRT_2,
            learning_rate: 0.1,
            discount: 0.9,
            recent_window: 10,
            history_rounds: 15,
        }
    }
}

impl AdaptiveParams {
    /// Check that every parameter is inside its meaningful range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sim_threshold) {
            return Err(ConfigError::invalid(
                "sim_threshold",
                format!("{} is outside [0, 1]", self.sim_threshold),
            ));
        }
        for (field, value) in [
            ("suppress_lambda", self.suppress_lambda),
            ("boost_lambda", self.boost_lambda),
            ("ucb_c", self.ucb_c),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(field, format!("{value} must be >= 0")));
            }
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ConfigError::invalid(
                "learning_rate",
                format!("{} is outside (0, 1]", self.learning_rate),
            ));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(ConfigError::invalid(
                "discount",
                format!("{} is outside [0, 1]", self.discount),
            ));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.complex_difficulty_min) {
            return Err(ConfigError::invalid(
                "complex_difficulty_min",
                format!("{} is outside 1..=5", self.complex_difficulty_min),
            ));
        }
        Ok(())
    }
}

/// Where the host keeps its files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Precomputed neighbor table (JSONL).
    pub neighbors_path: PathBuf,
    /// Persisted session state (JSON).
    pub state_path: PathBuf,
    /// Past round summaries (JSONL).
    pub history_path: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            neighbors_path: PathBuf::from("data/neighbors.jsonl"),
            state_path: PathBuf::from("data/adaptive_state.json"),
            history_path: PathBuf::from("data/history/rounds.jsonl"),
        }
    }
}

/// Top-level quizpilot configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizpilotConfig {
    pub params: AdaptiveParams,
    pub files: FilesConfig,
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizpilot.toml` in the current directory
/// 2. `~/.config/quizpilot/config.toml`
///
/// Environment variable overrides: `QUIZPILOT_STATE_PATH`, `QUIZPILOT_NEIGHBORS_PATH`.
pub fn load_config() -> Result<QuizpilotConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizpilotConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizpilot.toml");
        if local.exists() {
            Some(local)
        } else {
            config_dir()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config_str(
                &std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?,
                &path,
            )?
        }
        None => QuizpilotConfig::default(),
    };

    if let Ok(state_path) = std::env::var("QUIZPILOT_STATE_PATH") {
        config.files.state_path = PathBuf::from(state_path);
    }
    if let Ok(neighbors_path) = std::env::var("QUIZPILOT_NEIGHBORS_PATH") {
        config.files.neighbors_path = PathBuf::from(neighbors_path);
    }

    Ok(config)
}

/// Parse and validate a TOML config string.
pub fn parse_config_str(content: &str, source_path: &Path) -> Result<QuizpilotConfig> {
    let config: QuizpilotConfig = toml::from_str(content)
        .with_context(|| format!("failed to parse config: {}", source_path.display()))?;
    config
        .params
        .validate()
        .with_context(|| format!("invalid config: {}", source_path.display()))?;
    Ok(config)
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizpilot"))
}

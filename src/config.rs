//! Engine configuration shared by the arena binary and the WASM facade.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Search parameters for the computer strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Plies searched by minimax.
    #[serde(default = "default_minimax_depth")]
    pub minimax_depth: u8,
    /// Iterations run by MCTS per decision.
    #[serde(default = "default_mcts_iterations")]
    pub mcts_iterations: u32,
    /// UCB1 exploration constant.
    #[serde(default = "default_exploration")]
    pub exploration: f64,
    /// Seed for MCTS. Drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_minimax_depth() -> u8 {
    4
}

fn default_mcts_iterations() -> u32 {
    1000
}

fn default_exploration() -> f64 {
    std::f64::consts::SQRT_2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minimax_depth: default_minimax_depth(),
            mcts_iterations: default_mcts_iterations(),
            exploration: default_exploration(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimax_depth == 0 {
            return Err(ConfigError::Invalid("minimax_depth must be at least 1".into()));
        }
        if self.mcts_iterations == 0 {
            return Err(ConfigError::Invalid("mcts_iterations must be at least 1".into()));
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "exploration must be finite and non-negative, got {}",
                self.exploration
            )));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

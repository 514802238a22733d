pub mod mcts;
pub mod minimax;
pub mod neural;

use std::str::FromStr;
use std::sync::Arc;

use crate::board::Board;
use crate::config::EngineConfig;
use crate::error::GameError;
use crate::player::Side;
use crate::types::Decision;

pub use mcts::Mcts;
pub use minimax::Minimax;
pub use neural::{InferenceSession, LinearPolicy, NeuralStrategy};

/// Decision capability bound to a computer player.
///
/// Implementations may copy `board` freely but must not assume the sides'
/// owned lists are anything more than a view of it.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Returns a legal destination for `me`, or `Decision::Pass`.
    fn choose_move(&mut self, board: &Board, me: &Side, opponent: &Side) -> Decision;
}

/// Strategy selected by a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Minimax,
    Mcts,
    Neural,
}

impl FromStr for StrategyKind {
    type Err = GameError;

    /// Keys are matched case-insensitively with whitespace ignored.
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let normalized: String = key
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "minimax" | "alphabeta" => Ok(Self::Minimax),
            "mcts" => Ok(Self::Mcts),
            "neural" | "cnn" => Ok(Self::Neural),
            _ => Err(GameError::UnknownStrategy(key.to_string())),
        }
    }
}

/// Builds the strategy named by `key`.
///
/// Unknown keys are an error; there is no fallback strategy.
pub fn build_strategy(
    key: &str,
    config: &EngineConfig,
    model: Option<Arc<dyn InferenceSession>>,
) -> Result<Box<dyn Strategy>, GameError> {
    let strategy: Box<dyn Strategy> = match key.parse::<StrategyKind>()? {
        StrategyKind::Minimax => Box::new(Minimax::new(config.minimax_depth)),
        StrategyKind::Mcts => Box::new(Mcts::from_config(config)),
        StrategyKind::Neural => {
            let session = model.ok_or(GameError::MissingModel)?;
            Box::new(NeuralStrategy::new(session))
        }
    };
    Ok(strategy)
}

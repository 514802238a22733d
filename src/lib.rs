use wasm_bindgen::prelude::*;

pub mod ai;
pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod player;
pub mod snapshot;
pub mod types;
pub mod wasm;

pub use board::{Board, Move, MoveMap};
pub use config::EngineConfig;
pub use error::{ConfigError, GameError, ModelError, SnapshotError};
pub use game::{Game, Phase, TurnOutcome};
pub use player::{Player, PlayerKind, Side};
pub use snapshot::Snapshot;
pub use types::{Cell, Color, Decision, GameResult, GameView, Position};

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}

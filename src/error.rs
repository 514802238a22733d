use thiserror::Error;

use crate::types::{Color, Position};

/// Errors raised by game construction and the turn state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("players have to have different colors (both are {0})")]
    DuplicateColor(Color),
    #[error("seat {seat} has to play {expected}, got {found}")]
    WrongSeat {
        seat: u8,
        expected: Color,
        found: Color,
    },
    #[error("unknown strategy: {0:?}")]
    UnknownStrategy(String),
    #[error("the neural strategy needs an inference session")]
    MissingModel,
    #[error("{0} is not controlled by a strategy")]
    NotAComputer(Color),
    #[error("game is already over")]
    GameOver,
    #[error("it is not {found}'s turn ({expected} to move)")]
    NotYourTurn { expected: Color, found: Color },
    #[error("{0} has a legal move and cannot pass")]
    PassWithLegalMoves(Color),
    #[error("illegal move at {0}")]
    IllegalMove(Position),
    #[error("strategy {strategy} selected {position}, which is not a legal destination")]
    StrategyContractViolation { strategy: String, position: Position },
}

/// Errors from decoding a saved game.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot data too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("invalid snapshot magic (expected OTSV)")]
    BadMagic,
    #[error("unsupported snapshot version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },
    #[error("snapshot payload length mismatch: header says {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from loading or running an inference model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model data: {0}")]
    Format(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Errors from loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

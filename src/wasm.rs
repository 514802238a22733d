//! Browser-facing wrapper around [`Game`].
//!
//! Values cross the boundary through `serde-wasm-bindgen`; errors become
//! JS strings.

use std::fmt::Display;
use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::ai::{InferenceSession, LinearPolicy, build_strategy};
use crate::config::EngineConfig;
use crate::error::GameError;
use crate::game::Game;
use crate::player::Player;
use crate::snapshot::Snapshot;
use crate::types::{Color, Position};

const HUMAN_KEY: &str = "human";

#[wasm_bindgen]
pub struct WasmGame {
    game: Game,
}

#[wasm_bindgen]
impl WasmGame {
    /// `black_key` and `white_key` are `"human"` or a strategy key.
    #[wasm_bindgen(constructor)]
    pub fn new(black_key: &str, white_key: &str, seed: u64) -> Result<WasmGame, JsValue> {
        let game = build_game(black_key, white_key, seed, None).map_err(to_js)?;
        Ok(Self { game })
    }

    /// Like [`WasmGame::new`], with a policy blob for neural seats.
    #[wasm_bindgen(js_name = withModel)]
    pub fn with_model(black_key: &str, white_key: &str, seed: u64, model: &[u8]) -> Result<WasmGame, JsValue> {
        let policy = LinearPolicy::from_bytes(model).map_err(to_js)?;
        let game = build_game(black_key, white_key, seed, Some(Arc::new(policy))).map_err(to_js)?;
        Ok(Self { game })
    }

    /// Legal destinations of the player to move as `{x, y}` objects.
    #[wasm_bindgen(js_name = legalMoves)]
    pub fn legal_moves(&self) -> Result<JsValue, JsValue> {
        let moves: Vec<Position> = match self.game.current_player() {
            Some(color) => self.game.available_moves(color).destinations().collect(),
            None => Vec::new(),
        };
        serde_wasm_bindgen::to_value(&moves).map_err(JsValue::from)
    }

    /// Plays `(row, col)` for the player to move and returns the new state.
    pub fn play(&mut self, row: u8, col: u8) -> Result<JsValue, JsValue> {
        let destination =
            Position::new(row, col).ok_or_else(|| JsValue::from_str(&format!("({row}, {col}) is off the board")))?;
        let color = self.turn().map_err(to_js)?;
        let moves = self.game.available_moves(color);
        self.game.apply_move(color, &moves, destination).map_err(to_js)?;
        self.state()
    }

    pub fn pass(&mut self) -> Result<JsValue, JsValue> {
        let color = self.turn().map_err(to_js)?;
        self.game.pass(color).map_err(to_js)?;
        self.state()
    }

    /// Lets the computer seat to move play one turn.
    #[wasm_bindgen(js_name = aiMove)]
    pub fn ai_move(&mut self) -> Result<JsValue, JsValue> {
        self.game.play_turn().map_err(to_js)?;
        self.state()
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.game.state()).map_err(JsValue::from)
    }

    pub fn save(&self) -> Vec<u8> {
        self.game.save().to_bytes()
    }

    pub fn load(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        let snapshot = Snapshot::from_bytes(bytes).map_err(to_js)?;
        self.game.restore(snapshot);
        Ok(())
    }
}

impl WasmGame {
    fn turn(&self) -> Result<Color, GameError> {
        self.game.current_player().ok_or(GameError::GameOver)
    }
}

fn build_game(
    black_key: &str,
    white_key: &str,
    seed: u64,
    model: Option<Arc<dyn InferenceSession>>,
) -> Result<Game, GameError> {
    let black = build_player(Color::Black, black_key, seed, model.clone())?;
    let white = build_player(Color::White, white_key, seed.wrapping_add(1), model)?;
    Game::new(black, white)
}

fn build_player(
    color: Color,
    key: &str,
    seed: u64,
    model: Option<Arc<dyn InferenceSession>>,
) -> Result<Player, GameError> {
    if key.trim().eq_ignore_ascii_case(HUMAN_KEY) {
        return Ok(Player::human(color));
    }
    let config = EngineConfig::default().with_seed(seed);
    Ok(Player::computer(color, build_strategy(key, &config, model)?))
}

fn to_js(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

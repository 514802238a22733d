use std::path::Path;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::ai::Strategy;
use crate::board::Board;
use crate::error::ModelError;
use crate::player::Side;
use crate::types::{BOARD_SIZE, Color, Decision, NUM_SQUARES, Position};

const MAGIC: &[u8; 4] = b"OTLP";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 20;

/// One score per square plus the reserved pass slot.
pub const POLICY_OUTPUTS: usize = NUM_SQUARES + 1;
pub const PASS_INDEX: usize = NUM_SQUARES;

/// Board from the mover's view: own disc = 1, opponent = -1, empty = 0.
pub type BoardInput = [[f32; BOARD_SIZE]; BOARD_SIZE];
pub type PolicyScores = [f32; POLICY_OUTPUTS];

/// Opaque move-scoring model. Constructed once and shared between strategies.
pub trait InferenceSession: Send + Sync {
    fn infer(&self, input: &BoardInput) -> Result<PolicyScores, ModelError>;
}

pub fn encode_board(board: &Board, me: Color) -> BoardInput {
    let mut input = [[0.0f32; BOARD_SIZE]; BOARD_SIZE];
    for (x, row) in board.cells().iter().enumerate() {
        for (y, cell) in row.iter().enumerate() {
            input[x][y] = match cell.color() {
                Some(owner) if owner == me => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            };
        }
    }
    input
}

/// Single-layer policy: `scores = W · input + b`, loaded from a
/// checksummed weights blob.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPolicy {
    weights: Vec<[f32; NUM_SQUARES]>,
    biases: Vec<f32>,
}

impl LinearPolicy {
    pub fn new(weights: Vec<[f32; NUM_SQUARES]>, biases: Vec<f32>) -> Result<Self, ModelError> {
        if weights.len() != POLICY_OUTPUTS || biases.len() != POLICY_OUTPUTS {
            return Err(ModelError::Format(format!(
                "expected {POLICY_OUTPUTS} outputs, got {} weight rows and {} biases",
                weights.len(),
                biases.len()
            )));
        }
        Ok(Self { weights, biases })
    }

    /// Deserialize a policy from the `OTLP` blob format.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ModelError> {
        if data.len() < HEADER_SIZE {
            return Err(ModelError::Format(format!(
                "policy data too short: expected at least {HEADER_SIZE} bytes, got {}",
                data.len()
            )));
        }

        if &data[0..4] != MAGIC {
            return Err(ModelError::Format("invalid policy magic (expected OTLP)".to_string()));
        }

        let version = read_u32_le(data, 4)?;
        if version != VERSION {
            return Err(ModelError::Format(format!(
                "unsupported policy version: expected {VERSION}, got {version}"
            )));
        }

        let outputs = read_u32_le(data, 8)? as usize;
        if outputs != POLICY_OUTPUTS {
            return Err(ModelError::Format(format!(
                "policy must have {POLICY_OUTPUTS} outputs, got {outputs}"
            )));
        }

        let expected_crc = read_u32_le(data, 12)?;
        let payload = &data[HEADER_SIZE..];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(ModelError::Format(format!(
                "CRC32 mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"
            )));
        }

        let row_len = (NUM_SQUARES + 1) * 4;
        let expected_len = outputs * row_len;
        if payload.len() < expected_len {
            return Err(ModelError::Format(
                "unexpected EOF while reading policy weights".to_string(),
            ));
        }
        if payload.len() > expected_len {
            return Err(ModelError::Format("policy payload has trailing bytes".to_string()));
        }

        let mut weights = Vec::with_capacity(outputs);
        let mut biases = Vec::with_capacity(outputs);
        for row in payload.chunks_exact(row_len) {
            let mut values = row.chunks_exact(4).map(|chunk| {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(chunk);
                f32::from_le_bytes(bytes)
            });
            let mut row_weights = [0.0f32; NUM_SQUARES];
            for weight in row_weights.iter_mut() {
                *weight = values.next().unwrap_or(0.0);
            }
            weights.push(row_weights);
            biases.push(values.next().unwrap_or(0.0));
        }

        Self::new(weights, biases)
    }

    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Serializes into the format read by [`LinearPolicy::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(POLICY_OUTPUTS * (NUM_SQUARES + 1) * 4);
        for (row, bias) in self.weights.iter().zip(&self.biases) {
            for weight in row {
                payload.extend_from_slice(&weight.to_le_bytes());
            }
            payload.extend_from_slice(&bias.to_le_bytes());
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(self.weights.len() as u32).to_le_bytes());
        out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }
}

impl InferenceSession for LinearPolicy {
    fn infer(&self, input: &BoardInput) -> Result<PolicyScores, ModelError> {
        let mut scores = [0.0f32; POLICY_OUTPUTS];
        for (score, (row, bias)) in scores.iter_mut().zip(self.weights.iter().zip(&self.biases)) {
            let dot: f32 = row
                .iter()
                .zip(input.iter().flatten())
                .map(|(w, x)| w * x)
                .sum();
            *score = dot + bias;
        }
        Ok(scores)
    }
}

/// Picks the legal move the model scores highest.
pub struct NeuralStrategy {
    session: Arc<dyn InferenceSession>,
}

impl NeuralStrategy {
    pub fn new(session: Arc<dyn InferenceSession>) -> Self {
        Self { session }
    }

    pub fn decide(&self, board: &Board, me: Color) -> Decision {
        let moves = board.available_moves(me);
        if moves.is_empty() {
            return Decision::Pass;
        }

        let scores = match self.session.infer(&encode_board(board, me)) {
            Ok(scores) => scores,
            Err(err) => {
                warn!(%err, color = %me, "inference failed, passing");
                return Decision::Pass;
            }
        };

        let mut best: Option<(Position, f32)> = None;
        for destination in moves.destinations() {
            let score = scores[destination.index()];
            if score.is_finite() && best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((destination, score));
            }
        }

        match best {
            Some((_, best_score)) if scores[PASS_INDEX] > best_score => {
                trace!(pass_score = scores[PASS_INDEX], best_score, "model prefers to pass");
                Decision::Pass
            }
            Some((destination, _)) => Decision::Place(destination),
            None => Decision::Pass,
        }
    }
}

impl Strategy for NeuralStrategy {
    fn name(&self) -> &str {
        "neural"
    }

    fn choose_move(&mut self, board: &Board, me: &Side, _opponent: &Side) -> Decision {
        self.decide(board, me.color())
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, ModelError> {
    if offset + 4 > data.len() {
        return Err(ModelError::Format("unexpected EOF while reading u32".to_string()));
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    Ok(u32::from_le_bytes(bytes))
}

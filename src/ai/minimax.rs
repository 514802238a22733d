use tracing::trace;

use crate::ai::Strategy;
use crate::board::Board;
use crate::player::Side;
use crate::types::{BOARD_SIZE, Color, Decision, Position};

pub const DEFAULT_DEPTH: u8 = 4;
const MIN_SCORE: i32 = i32::MIN;
const MAX_SCORE: i32 = i32::MAX;

/// Positional value of each square. Corners dominate, edges beat the centre,
/// and the squares diagonally next to a corner are penalised.
pub const POSITION_WEIGHTS: [[i32; BOARD_SIZE]; BOARD_SIZE] = [
    [100, 10, 20, 15, 15, 20, 10, 100],
    [10, -20, 1, 1, 1, 1, -20, 10],
    [20, 1, 5, 2, 2, 5, 1, 20],
    [15, 1, 2, 1, 1, 2, 1, 15],
    [15, 1, 2, 1, 1, 2, 1, 15],
    [20, 1, 5, 2, 2, 5, 1, 20],
    [10, -20, 1, 1, 1, 1, -20, 10],
    [100, 10, 20, 15, 15, 20, 10, 100],
];

/// Fixed-depth minimax with alpha-beta pruning.
#[derive(Debug, Clone)]
pub struct Minimax {
    depth: u8,
    nodes: u64,
}

impl Minimax {
    /// `depth` is clamped to at least one ply.
    pub fn new(depth: u8) -> Self {
        Self {
            depth: depth.max(1),
            nodes: 0,
        }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Positions visited by the last search.
    pub fn nodes_searched(&self) -> u64 {
        self.nodes
    }

    /// Picks the candidate with the highest score; the first one wins ties.
    pub fn search(&mut self, board: &Board, me: Color) -> Decision {
        self.nodes = 0;

        let moves = board.available_moves(me);
        let mut best: Option<(Position, i32)> = None;

        for mv in &moves {
            let mut next = *board;
            next.apply_move(me, mv.destination, &mv.origins);
            let score = self.minimax(&next, me.opponent(), self.depth - 1, MIN_SCORE, MAX_SCORE, me);

            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((mv.destination, score));
            }
        }

        match best {
            Some((destination, _)) => Decision::Place(destination),
            None => Decision::Pass,
        }
    }

    fn minimax(
        &mut self,
        board: &Board,
        mover: Color,
        depth: u8,
        alpha: i32,
        beta: i32,
        root: Color,
    ) -> i32 {
        self.nodes += 1;

        if depth == 0 || board.is_full() {
            return evaluate(board, root);
        }

        let moves = board.available_moves(mover);
        if moves.is_empty() {
            if !board.has_any_move(mover.opponent()) {
                return evaluate(board, root);
            }
            // A pass still uses up a ply.
            return self.minimax(board, mover.opponent(), depth - 1, alpha, beta, root);
        }

        let mut alpha = alpha;
        let mut beta = beta;

        if mover == root {
            let mut best = MIN_SCORE;
            for mv in &moves {
                let mut next = *board;
                next.apply_move(mover, mv.destination, &mv.origins);
                let score = self.minimax(&next, mover.opponent(), depth - 1, alpha, beta, root);
                best = best.max(score);
                alpha = alpha.max(score);
                if beta <= alpha {
                    break;
                }
            }
            best
        } else {
            let mut best = MAX_SCORE;
            for mv in &moves {
                let mut next = *board;
                next.apply_move(mover, mv.destination, &mv.origins);
                let score = self.minimax(&next, mover.opponent(), depth - 1, alpha, beta, root);
                best = best.min(score);
                beta = beta.min(score);
                if beta <= alpha {
                    break;
                }
            }
            best
        }
    }
}

impl Default for Minimax {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl Strategy for Minimax {
    fn name(&self) -> &str {
        "minimax"
    }

    fn choose_move(&mut self, board: &Board, me: &Side, _opponent: &Side) -> Decision {
        let decision = self.search(board, me.color());
        trace!(depth = self.depth, nodes = self.nodes, ?decision, "minimax search finished");
        decision
    }
}

/// Weighted disc balance from `color`'s point of view.
pub fn evaluate(board: &Board, color: Color) -> i32 {
    let mut score = 0;
    for (x, row) in board.cells().iter().enumerate() {
        for (y, cell) in row.iter().enumerate() {
            match cell.color() {
                Some(owner) if owner == color => score += POSITION_WEIGHTS[x][y],
                Some(_) => score -= POSITION_WEIGHTS[x][y],
                None => {}
            }
        }
    }
    score
}

//! UCT Monte Carlo Tree Search with uniformly random rollouts.
//!
//! Each iteration selects a leaf by UCB1, expands it by one layer, plays a
//! random game out from one new child and backs the result up to the root.
//! The final move is the most visited root child.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::ai::Strategy;
use crate::board::Board;
use crate::config::EngineConfig;
use crate::player::Side;
use crate::types::{Color, Decision, Position};

pub const DEFAULT_ITERATIONS: u32 = 1000;
pub const DEFAULT_EXPLORATION: f64 = std::f64::consts::SQRT_2;

type NodeId = u32;

struct Node {
    board: Board,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    wins: u32,
    visits: u32,
    to_move: Color,
    /// Move that led here from the parent; `None` only at the root.
    mv: Option<Position>,
}

impl Node {
    fn new(board: Board, parent: Option<NodeId>, mv: Option<Position>, to_move: Color) -> Self {
        Self {
            board,
            parent,
            children: Vec::new(),
            wins: 0,
            visits: 0,
            to_move,
            mv,
        }
    }
}

/// Arena-backed node storage; parents and children refer to each other by id.
struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub iterations: u32,
    pub node_count: usize,
    /// Visits of the chosen root child.
    pub best_visits: u32,
}

pub struct Mcts {
    iterations: u32,
    exploration: f64,
    rng: StdRng,
    stats: SearchStats,
}

impl Mcts {
    pub fn new(iterations: u32, exploration: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            iterations,
            exploration,
            rng,
            stats: SearchStats::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.mcts_iterations, config.exploration, config.seed)
    }

    /// Default budget with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(DEFAULT_ITERATIONS, DEFAULT_EXPLORATION, Some(seed))
    }

    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    pub fn search(&mut self, board: &Board, me: Color) -> Decision {
        let (decision, stats) = run(board, me, self.iterations, self.exploration, &mut self.rng);
        self.stats = stats;
        decision
    }

    /// Same as [`Mcts::search`] but draws randomness from `rng`.
    pub fn search_with_rng<R: Rng>(&mut self, board: &Board, me: Color, rng: &mut R) -> Decision {
        let (decision, stats) = run(board, me, self.iterations, self.exploration, rng);
        self.stats = stats;
        decision
    }
}

impl Strategy for Mcts {
    fn name(&self) -> &str {
        "mcts"
    }

    fn choose_move(&mut self, board: &Board, me: &Side, _opponent: &Side) -> Decision {
        let decision = self.search(board, me.color());
        trace!(
            iterations = self.stats.iterations,
            nodes = self.stats.node_count,
            best_visits = self.stats.best_visits,
            ?decision,
            "mcts search finished"
        );
        decision
    }
}

fn run<R: Rng>(
    board: &Board,
    root_color: Color,
    iterations: u32,
    exploration: f64,
    rng: &mut R,
) -> (Decision, SearchStats) {
    if !board.has_any_move(root_color) {
        return (Decision::Pass, SearchStats::default());
    }

    let mut arena = Arena::new();
    let root = arena.push(Node::new(*board, None, None, root_color));

    for _ in 0..iterations {
        let leaf = select(&arena, root, exploration);
        let target = expand(&mut arena, leaf, rng);
        let node = arena.get(target);
        let win = rollout(node.board, node.to_move, root_color, rng);
        backpropagate(&mut arena, target, win, root_color);
    }

    let mut best: Option<&Node> = None;
    for &child in &arena.get(root).children {
        let node = arena.get(child);
        if best.is_none_or(|b| node.visits > b.visits) {
            best = Some(node);
        }
    }

    let stats = SearchStats {
        iterations,
        node_count: arena.len(),
        best_visits: best.map_or(0, |node| node.visits),
    };
    let decision = best
        .and_then(|node| node.mv)
        .map_or(Decision::Pass, Decision::Place);
    (decision, stats)
}

fn select(arena: &Arena, root: NodeId, exploration: f64) -> NodeId {
    let mut current = root;
    loop {
        let node = arena.get(current);
        if node.children.is_empty() {
            return current;
        }

        let mut best_child = node.children[0];
        let mut best_score = f64::NEG_INFINITY;
        for &child in &node.children {
            let c = arena.get(child);
            let score = ucb1(c.wins, c.visits, node.visits, exploration);
            if score > best_score {
                best_score = score;
                best_child = child;
            }
        }
        current = best_child;
    }
}

/// Unvisited children score `+inf` so each is tried once before any repeat.
fn ucb1(wins: u32, visits: u32, parent_visits: u32, exploration: f64) -> f64 {
    if visits == 0 {
        return f64::INFINITY;
    }
    let visits = visits as f64;
    wins as f64 / visits + exploration * ((parent_visits as f64).ln() / visits).sqrt()
}

/// Adds one child per legal move and returns a random new child, or `leaf`
/// itself when its mover has no legal move.
fn expand<R: Rng>(arena: &mut Arena, leaf: NodeId, rng: &mut R) -> NodeId {
    let node = arena.get(leaf);
    let board = node.board;
    let mover = node.to_move;
    let moves = board.available_moves(mover);
    if moves.is_empty() {
        return leaf;
    }

    let mut created = Vec::with_capacity(moves.len());
    for mv in &moves {
        let mut next = board;
        next.apply_move(mover, mv.destination, &mv.origins);
        let child = arena.push(Node::new(next, Some(leaf), Some(mv.destination), mover.opponent()));
        created.push(child);
    }
    arena.get_mut(leaf).children = created.clone();

    created[rng.gen_range(0..created.len())]
}

/// Plays random legal moves until both sides pass in a row. Returns whether
/// `root_color` finished with strictly more discs.
fn rollout<R: Rng>(mut board: Board, mut mover: Color, root_color: Color, rng: &mut R) -> bool {
    let mut passes = 0;
    while passes < 2 {
        let moves = board.available_moves(mover);
        if moves.is_empty() {
            passes += 1;
        } else {
            passes = 0;
            let pick = rng.gen_range(0..moves.len());
            if let Some(mv) = moves.iter().nth(pick) {
                board.apply_move(mover, mv.destination, &mv.origins);
            }
        }
        mover = mover.opponent();
    }
    board.count_of(root_color) > board.count_of(root_color.opponent())
}

/// Every node on the path gets a visit; a win is credited to the nodes
/// reached by a move of `root_color`.
fn backpropagate(arena: &mut Arena, from: NodeId, win: bool, root_color: Color) {
    let mut cursor = Some(from);
    while let Some(id) = cursor {
        let node = arena.get_mut(id);
        node.visits += 1;
        if win && node.parent.is_some() && node.to_move.opponent() == root_color {
            node.wins += 1;
        }
        cursor = node.parent;
    }
}

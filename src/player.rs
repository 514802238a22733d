use crate::ai::Strategy;
use crate::board::Board;
use crate::types::{Color, Position};

/// A colour and the squares it currently owns, in acquisition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Side {
    color: Color,
    owned: Vec<Position>,
}

impl Side {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            owned: Vec::new(),
        }
    }

    /// A side owning every square of its colour on `board`, row-major.
    pub fn from_board(color: Color, board: &Board) -> Self {
        Self {
            color,
            owned: board.positions_of(color),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn owned(&self) -> &[Position] {
        &self.owned
    }

    pub fn owns(&self, pos: Position) -> bool {
        self.owned.contains(&pos)
    }

    pub(crate) fn claim(&mut self, pos: Position) {
        if !self.owns(pos) {
            self.owned.push(pos);
        }
    }

    pub(crate) fn release(&mut self, pos: Position) {
        self.owned.retain(|&owned| owned != pos);
    }

    pub(crate) fn replace_owned(&mut self, owned: Vec<Position>) {
        self.owned = owned;
    }
}

/// Who decides a player's moves.
pub enum PlayerKind {
    /// Driven from outside through [`crate::game::Game::apply_move`].
    Human,
    Computer(Box<dyn Strategy>),
}

impl std::fmt::Debug for PlayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => f.write_str("Human"),
            Self::Computer(strategy) => write!(f, "Computer({})", strategy.name()),
        }
    }
}

#[derive(Debug)]
pub struct Player {
    pub(crate) side: Side,
    pub(crate) kind: PlayerKind,
}

impl Player {
    pub fn human(color: Color) -> Self {
        Self {
            side: Side::new(color),
            kind: PlayerKind::Human,
        }
    }

    pub fn computer(color: Color, strategy: Box<dyn Strategy>) -> Self {
        Self {
            side: Side::new(color),
            kind: PlayerKind::Computer(strategy),
        }
    }

    pub fn color(&self) -> Color {
        self.side.color
    }

    pub fn side(&self) -> &Side {
        &self.side
    }

    pub fn owned(&self) -> &[Position] {
        self.side.owned()
    }

    pub fn kind(&self) -> &PlayerKind {
        &self.kind
    }

    pub fn is_computer(&self) -> bool {
        matches!(self.kind, PlayerKind::Computer(_))
    }
}

use std::fmt;

use crate::types::{BOARD_SIZE, Cell, Color, GameResult, NUM_SQUARES, Position};

const DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One legal move: an empty destination plus every own disc that outflanks
/// towards it, nearest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub destination: Position,
    pub origins: Vec<Position>,
}

/// Legal moves keyed by destination, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveMap {
    moves: Vec<Move>,
}

impl MoveMap {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn contains(&self, destination: Position) -> bool {
        self.get(destination).is_some()
    }

    /// Origins recorded for `destination`, if it is legal.
    pub fn get(&self, destination: Position) -> Option<&[Position]> {
        self.moves
            .iter()
            .find(|mv| mv.destination == destination)
            .map(|mv| mv.origins.as_slice())
    }

    pub fn destinations(&self) -> impl Iterator<Item = Position> + '_ {
        self.moves.iter().map(|mv| mv.destination)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves.iter()
    }

    fn record(&mut self, destination: Position, origin: Position) {
        match self
            .moves
            .iter_mut()
            .find(|mv| mv.destination == destination)
        {
            Some(mv) => mv.origins.push(origin),
            None => self.moves.push(Move {
                destination,
                origins: vec![origin],
            }),
        }
    }
}

impl<'a> IntoIterator for &'a MoveMap {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}

/// Othello board state represented by two bitboards.
///
/// The masks never overlap, so every square is exactly one of empty, black or
/// white. The type is `Copy`: a copy never shares state with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    /// Creates the initial board:
    /// (3,3)=white, (3,4)=black, (4,3)=black, (4,4)=white.
    pub fn new() -> Self {
        Self {
            black: bit(28) | bit(35),
            white: bit(27) | bit(36),
        }
    }

    /// A board with no discs at all.
    pub fn empty() -> Self {
        Self { black: 0, white: 0 }
    }

    /// Builds a board from raw masks. Returns `None` when they overlap.
    pub fn from_bitboards(black: u64, white: u64) -> Option<Self> {
        if black & white != 0 {
            return None;
        }
        Some(Self { black, white })
    }

    pub fn from_cells(cells: &[[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        let mut board = Self::empty();
        for (x, row) in cells.iter().enumerate() {
            for (y, &cell) in row.iter().enumerate() {
                board.set_index(x * BOARD_SIZE + y, cell);
            }
        }
        board
    }

    pub fn bitboards(&self) -> (u64, u64) {
        (self.black, self.white)
    }

    pub fn cell(&self, pos: Position) -> Cell {
        let square = bit(pos.index());
        if self.black & square != 0 {
            Cell::Black
        } else if self.white & square != 0 {
            Cell::White
        } else {
            Cell::Empty
        }
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        self.set_index(pos.index(), cell);
    }

    pub fn cells(&self) -> [[Cell; BOARD_SIZE]; BOARD_SIZE] {
        let mut cells = [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE];
        for (index, cell) in self.to_array().iter().enumerate() {
            cells[index / BOARD_SIZE][index % BOARD_SIZE] = match cell {
                1 => Cell::Black,
                2 => Cell::White,
                _ => Cell::Empty,
            };
        }
        cells
    }

    /// Positions holding `color`, row-major.
    pub fn positions_of(&self, color: Color) -> Vec<Position> {
        mask_to_positions(self.mask(color))
    }

    /// Every legal move for `color`.
    ///
    /// Each disc of `color` is walked outwards in all eight directions; a walk
    /// that crosses at least one opponent disc and lands on an empty square
    /// records the disc as an origin of that square.
    pub fn available_moves(&self, color: Color) -> MoveMap {
        let me = self.mask(color);
        let opp = self.mask(color.opponent());
        let mut moves = MoveMap::default();

        for origin in mask_to_positions(me) {
            for (dx, dy) in DIRECTIONS {
                let mut cursor = origin.offset(dx, dy);
                let mut crossed = false;

                while let Some(pos) = cursor {
                    let square = bit(pos.index());
                    if opp & square != 0 {
                        crossed = true;
                    } else if me & square == 0 && crossed {
                        moves.record(pos, origin);
                        break;
                    } else {
                        break;
                    }
                    cursor = pos.offset(dx, dy);
                }
            }
        }

        for mv in &mut moves.moves {
            let destination = mv.destination;
            mv.origins.sort_by_key(|origin| origin.manhattan(destination));
        }

        moves
    }

    pub fn has_any_move(&self, color: Color) -> bool {
        !self.available_moves(color).is_empty()
    }

    /// Claims `destination` and every square strictly between it and each
    /// origin. Returns the squares that changed owner, destination first.
    ///
    /// No legality check happens here: callers pass a destination and
    /// origins taken from [`Board::available_moves`].
    pub fn apply_move(
        &mut self,
        color: Color,
        destination: Position,
        origins: &[Position],
    ) -> Vec<Position> {
        let mut claimed = Vec::new();
        if self.claim(destination, color) {
            claimed.push(destination);
        }

        for &origin in origins {
            let dx = (destination.x as i8 - origin.x as i8).signum();
            let dy = (destination.y as i8 - origin.y as i8).signum();
            let mut cursor = origin.offset(dx, dy);

            while let Some(pos) = cursor {
                if pos == destination {
                    break;
                }
                if self.claim(pos, color) {
                    claimed.push(pos);
                }
                cursor = pos.offset(dx, dy);
            }
        }

        claimed
    }

    /// Returns `(black_count, white_count)`.
    pub fn count(&self) -> (u8, u8) {
        (self.black.count_ones() as u8, self.white.count_ones() as u8)
    }

    pub fn count_of(&self, color: Color) -> u8 {
        self.mask(color).count_ones() as u8
    }

    /// Returns the number of empty squares.
    pub fn empty_count(&self) -> u8 {
        let (black_count, white_count) = self.count();
        NUM_SQUARES as u8 - black_count - white_count
    }

    pub fn is_full(&self) -> bool {
        self.empty_count() == 0
    }

    /// No empty square left, or neither side can move.
    pub fn is_terminal(&self) -> bool {
        self.is_full() || (!self.has_any_move(Color::Black) && !self.has_any_move(Color::White))
    }

    /// The colour with more discs, `None` on equal counts.
    pub fn winner(&self) -> Option<Color> {
        let (black_count, white_count) = self.count();
        match black_count.cmp(&white_count) {
            std::cmp::Ordering::Greater => Some(Color::Black),
            std::cmp::Ordering::Less => Some(Color::White),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn result(&self) -> GameResult {
        let (black_count, white_count) = self.count();
        GameResult {
            winner: self.winner(),
            black_count,
            white_count,
        }
    }

    /// Converts board to `[u8; 64]` where 0=empty, 1=black, 2=white.
    pub fn to_array(&self) -> [u8; NUM_SQUARES] {
        let mut board = [0u8; NUM_SQUARES];
        for (pos, cell) in board.iter_mut().enumerate() {
            let square = bit(pos);
            *cell = if (self.black & square) != 0 {
                1
            } else if (self.white & square) != 0 {
                2
            } else {
                0
            };
        }
        board
    }

    fn mask(&self, color: Color) -> u64 {
        match color {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }

    fn claim(&mut self, pos: Position, color: Color) -> bool {
        if self.cell(pos) == Cell::from(color) {
            return false;
        }
        self.set(pos, color.into());
        true
    }

    fn set_index(&mut self, index: usize, cell: Cell) {
        let square = bit(index);
        self.black &= !square;
        self.white &= !square;
        match cell {
            Cell::Black => self.black |= square,
            Cell::White => self.white |= square,
            Cell::Empty => {}
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  0 1 2 3 4 5 6 7")?;
        for (x, row) in self.cells().iter().enumerate() {
            write!(f, "{x}")?;
            for cell in row {
                let symbol = match cell {
                    Cell::Empty => '.',
                    Cell::Black => 'X',
                    Cell::White => 'O',
                };
                write!(f, " {symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn bit(pos: usize) -> u64 {
    if pos < NUM_SQUARES { 1u64 << pos } else { 0 }
}

fn mask_to_positions(mut mask: u64) -> Vec<Position> {
    let mut out = Vec::with_capacity(mask.count_ones() as usize);
    while mask != 0 {
        let idx = mask.trailing_zeros() as usize;
        if let Some(pos) = Position::from_index(idx) {
            out.push(pos);
        }
        mask &= mask - 1;
    }
    out
}

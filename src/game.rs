use serde::Serialize;
use tracing::{debug, warn};
use web_time::Instant;

use crate::board::{Board, MoveMap};
use crate::error::GameError;
use crate::player::{Player, PlayerKind};
use crate::snapshot::Snapshot;
use crate::types::{Color, Decision, GameResult, GameView, Position};

/// Turn state machine. Starts at `Turn(Black)`; `GameOver` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Turn(Color),
    GameOver,
}

/// What one driven turn did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Moved {
        color: Color,
        destination: Position,
        /// Squares that changed owner, destination first.
        claimed: Vec<Position>,
    },
    Passed(Color),
}

pub struct Game {
    board: Board,
    black: Player,
    white: Player,
    phase: Phase,
    consecutive_passes: u8,
    last_claimed: Vec<Position>,
    last_was_pass: bool,
}

impl Game {
    /// Seat one must play black and seat two white.
    pub fn new(mut black: Player, mut white: Player) -> Result<Self, GameError> {
        if black.color() == white.color() {
            return Err(GameError::DuplicateColor(black.color()));
        }
        if black.color() != Color::Black {
            return Err(GameError::WrongSeat {
                seat: 1,
                expected: Color::Black,
                found: black.color(),
            });
        }
        if white.color() != Color::White {
            return Err(GameError::WrongSeat {
                seat: 2,
                expected: Color::White,
                found: white.color(),
            });
        }

        let board = Board::new();
        black.side.replace_owned(board.positions_of(Color::Black));
        white.side.replace_owned(board.positions_of(Color::White));

        Ok(Self {
            board,
            black,
            white,
            phase: Phase::Turn(Color::Black),
            consecutive_passes: 0,
            last_claimed: Vec::new(),
            last_was_pass: false,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// `None` once the game is over.
    pub fn current_player(&self) -> Option<Color> {
        match self.phase {
            Phase::Turn(color) => Some(color),
            Phase::GameOver => None,
        }
    }

    pub fn player(&self, color: Color) -> &Player {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    pub fn available_moves(&self, color: Color) -> MoveMap {
        self.board.available_moves(color)
    }

    /// Plays `destination` for `actor` using the origins recorded in `moves`.
    ///
    /// `moves` must be the live move map for `actor`; a destination missing
    /// from it, or a map that no longer matches the board, is rejected.
    pub fn apply_move(
        &mut self,
        actor: Color,
        moves: &MoveMap,
        destination: Position,
    ) -> Result<Vec<Position>, GameError> {
        self.expect_turn(actor)?;

        let origins = moves
            .get(destination)
            .ok_or(GameError::IllegalMove(destination))?;
        let live = self.board.available_moves(actor);
        if live.get(destination) != Some(origins) {
            return Err(GameError::IllegalMove(destination));
        }

        let claimed = self.board.apply_move(actor, destination, origins);
        let (me, opponent) = self.seats_mut(actor);
        for &pos in &claimed {
            me.side.claim(pos);
            opponent.side.release(pos);
        }

        debug!(color = %actor, %destination, flipped = claimed.len() - 1, "move applied");
        self.consecutive_passes = 0;
        self.last_was_pass = false;
        self.last_claimed = claimed.clone();
        self.advance(actor);

        Ok(claimed)
    }

    /// Ends `actor`'s turn without touching the board. Only allowed when
    /// `actor` has no legal move; a strategy's voluntary pass goes through
    /// [`Game::play_turn`].
    pub fn pass(&mut self, actor: Color) -> Result<(), GameError> {
        self.expect_turn(actor)?;
        if self.board.has_any_move(actor) {
            return Err(GameError::PassWithLegalMoves(actor));
        }
        self.record_pass(actor);
        Ok(())
    }

    fn record_pass(&mut self, actor: Color) {
        debug!(color = %actor, "pass");
        self.consecutive_passes = self.consecutive_passes.saturating_add(1);
        self.last_was_pass = true;
        self.last_claimed.clear();
        self.advance(actor);
    }

    /// Asks `color`'s strategy for a move. The answer is returned as is and
    /// nothing is applied.
    pub fn computer_decision(&mut self, color: Color) -> Result<Decision, GameError> {
        let (me, opponent) = match color {
            Color::Black => (&mut self.black, &self.white),
            Color::White => (&mut self.white, &self.black),
        };
        let PlayerKind::Computer(strategy) = &mut me.kind else {
            return Err(GameError::NotAComputer(color));
        };

        let started = Instant::now();
        let decision = strategy.choose_move(&self.board, &me.side, &opponent.side);
        debug!(
            color = %color,
            strategy = strategy.name(),
            ?decision,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "computer decision"
        );
        Ok(decision)
    }

    /// Drives the current player's turn through its strategy.
    ///
    /// A side without legal moves passes without consulting the strategy. A
    /// destination outside the legal moves is a contract violation.
    pub fn play_turn(&mut self) -> Result<TurnOutcome, GameError> {
        let color = self.current_player().ok_or(GameError::GameOver)?;

        let moves = self.board.available_moves(color);
        if moves.is_empty() {
            self.pass(color)?;
            return Ok(TurnOutcome::Passed(color));
        }

        match self.computer_decision(color)? {
            Decision::Pass => {
                self.record_pass(color);
                Ok(TurnOutcome::Passed(color))
            }
            Decision::Place(destination) => {
                if !moves.contains(destination) {
                    return Err(GameError::StrategyContractViolation {
                        strategy: self.strategy_name(color),
                        position: destination,
                    });
                }
                let claimed = self.apply_move(color, &moves, destination)?;
                Ok(TurnOutcome::Moved {
                    color,
                    destination,
                    claimed,
                })
            }
        }
    }

    /// Plays computer turns until the game ends.
    pub fn play_to_end(&mut self) -> Result<GameResult, GameError> {
        while !self.is_over() {
            self.play_turn()?;
        }
        let result = self.result();
        debug!(
            winner = ?result.winner,
            black = result.black_count,
            white = result.white_count,
            "game over"
        );
        Ok(result)
    }

    pub fn result(&self) -> GameResult {
        self.board.result()
    }

    pub fn save(&self) -> Snapshot {
        Snapshot::new(
            self.board,
            self.black.owned(),
            self.white.owned(),
            self.phase,
            self.consecutive_passes,
        )
    }

    /// Replaces board, owned lists and phase with the snapshot's.
    ///
    /// Owned lists that do not match the snapshot's board are rebuilt from
    /// it in row-major order.
    pub fn restore(&mut self, snapshot: Snapshot) {
        let rebuilt = (!snapshot.is_consistent()).then(|| {
            warn!("snapshot owned lists disagree with its board, rebuilding them");
            let board = snapshot.board();
            (board.positions_of(Color::Black), board.positions_of(Color::White))
        });
        self.phase = snapshot.phase();
        self.consecutive_passes = snapshot.consecutive_passes();
        let (board, black_owned, white_owned) = snapshot.into_parts();
        let (black_owned, white_owned) = rebuilt.unwrap_or((black_owned, white_owned));
        self.board = board;
        self.black.side.replace_owned(black_owned);
        self.white.side.replace_owned(white_owned);
        self.last_claimed.clear();
        self.last_was_pass = false;
    }

    pub fn state(&self) -> GameView {
        let (black_count, white_count) = self.board.count();
        GameView {
            board: self.board.to_array().to_vec(),
            current_player: self.current_player().map_or(0, Color::to_u8),
            black_count,
            white_count,
            is_game_over: self.is_over(),
            is_pass: self.last_was_pass,
            flipped: self.last_claimed.iter().map(|pos| pos.index() as u8).collect(),
        }
    }

    fn expect_turn(&self, actor: Color) -> Result<(), GameError> {
        match self.phase {
            Phase::GameOver => Err(GameError::GameOver),
            Phase::Turn(expected) if expected != actor => Err(GameError::NotYourTurn {
                expected,
                found: actor,
            }),
            Phase::Turn(_) => Ok(()),
        }
    }

    fn advance(&mut self, actor: Color) {
        let next = actor.opponent();
        let stuck = !self.board.has_any_move(next) && !self.board.has_any_move(actor);
        self.phase = if self.board.is_full() || self.consecutive_passes >= 2 || stuck {
            Phase::GameOver
        } else {
            Phase::Turn(next)
        };
    }

    fn seats_mut(&mut self, actor: Color) -> (&mut Player, &mut Player) {
        match actor {
            Color::Black => (&mut self.black, &mut self.white),
            Color::White => (&mut self.white, &mut self.black),
        }
    }

    fn strategy_name(&self, color: Color) -> String {
        match self.player(color).kind() {
            PlayerKind::Computer(strategy) => strategy.name().to_string(),
            PlayerKind::Human => "human".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Minimax, Strategy};
    use crate::player::Side;

    const FULL_BOARD: u64 = u64::MAX;

    struct FixedStrategy {
        mv: Decision,
    }

    impl Strategy for FixedStrategy {
        fn name(&self) -> &str {
            "fixed"
        }

        fn choose_move(&mut self, _board: &Board, _me: &Side, _opponent: &Side) -> Decision {
            self.mv
        }
    }

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y).unwrap()
    }

    fn bit(x: u8, y: u8) -> u64 {
        1u64 << pos(x, y).index()
    }

    fn humans() -> Game {
        Game::new(Player::human(Color::Black), Player::human(Color::White)).unwrap()
    }

    fn set_board_for_test(game: &mut Game, black: u64, white: u64, phase: Phase) {
        let board = Board::from_bitboards(black, white).unwrap();
        game.restore(Snapshot::new(
            board,
            &board.positions_of(Color::Black),
            &board.positions_of(Color::White),
            phase,
            0,
        ));
    }

    fn assert_owned_in_sync(game: &Game) {
        for color in [Color::Black, Color::White] {
            let mut owned = game.player(color).owned().to_vec();
            owned.sort();
            assert_eq!(owned, game.board().positions_of(color), "{color} owned list out of sync");
        }
    }

    #[test]
    fn initial_state_is_correct() {
        let game = humans();
        let state = game.state();

        assert_eq!(game.phase(), Phase::Turn(Color::Black));
        assert_eq!(state.current_player, 1);
        assert_eq!(state.black_count, 2);
        assert_eq!(state.white_count, 2);
        assert!(!state.is_game_over);
        assert!(!state.is_pass);
        assert!(state.flipped.is_empty());
        assert_eq!(game.player(Color::Black).owned(), &[pos(3, 4), pos(4, 3)]);
        assert_eq!(game.player(Color::White).owned(), &[pos(3, 3), pos(4, 4)]);
        assert_eq!(game.available_moves(Color::Black).len(), 4);
    }

    #[test]
    fn duplicate_colors_are_rejected() {
        let err = Game::new(Player::human(Color::Black), Player::human(Color::Black))
            .err()
            .unwrap();

        assert_eq!(err, GameError::DuplicateColor(Color::Black));
    }

    #[test]
    fn swapped_seats_are_rejected() {
        let err = Game::new(Player::human(Color::White), Player::human(Color::Black))
            .err()
            .unwrap();

        assert!(matches!(err, GameError::WrongSeat { seat: 1, .. }));
    }

    #[test]
    fn t02_illegal_player_move_returns_error() {
        let mut game = humans();
        let moves = game.available_moves(Color::Black);
        let before = *game.board();

        let err = game.apply_move(Color::Black, &moves, pos(0, 0)).unwrap_err();

        assert_eq!(err, GameError::IllegalMove(pos(0, 0)));
        assert_eq!(*game.board(), before);
        assert_eq!(game.phase(), Phase::Turn(Color::Black));
    }

    #[test]
    fn moving_out_of_turn_is_rejected() {
        let mut game = humans();
        let moves = game.available_moves(Color::White);
        let destination = moves.destinations().next().unwrap();

        let err = game.apply_move(Color::White, &moves, destination).unwrap_err();

        assert!(matches!(err, GameError::NotYourTurn { expected: Color::Black, .. }));
    }

    #[test]
    fn stale_move_map_is_rejected() {
        let mut game = humans();
        let stale = game.available_moves(Color::Black);
        game.apply_move(Color::Black, &stale, pos(2, 3)).unwrap();
        let white_moves = game.available_moves(Color::White);
        game.apply_move(Color::White, &white_moves, pos(2, 2)).unwrap();

        // (2,3) is already occupied.
        let err = game.apply_move(Color::Black, &stale, pos(2, 3)).unwrap_err();

        assert_eq!(err, GameError::IllegalMove(pos(2, 3)));
        assert_eq!(game.phase(), Phase::Turn(Color::Black));
    }

    #[test]
    fn applying_a_move_updates_both_owned_lists() {
        let mut game = humans();
        let moves = game.available_moves(Color::Black);

        let claimed = game.apply_move(Color::Black, &moves, pos(2, 3)).unwrap();

        assert_eq!(claimed, vec![pos(2, 3), pos(3, 3)]);
        assert_eq!(game.player(Color::Black).owned(), &[pos(3, 4), pos(4, 3), pos(2, 3), pos(3, 3)]);
        assert_eq!(game.player(Color::White).owned(), &[pos(4, 4)]);
        assert_eq!(game.phase(), Phase::Turn(Color::White));
        assert_eq!(game.state().flipped, vec![19, 27]);
        assert_owned_in_sync(&game);
    }

    #[test]
    fn t03_pass_occurrence_switches_turn() {
        let mut game = humans();
        let black = bit(0, 1);
        let white = FULL_BOARD ^ bit(0, 0) ^ black;
        set_board_for_test(&mut game, black, white, Phase::Turn(Color::Black));

        assert!(game.available_moves(Color::Black).is_empty());
        game.pass(Color::Black).unwrap();

        let state = game.state();
        assert_eq!(game.phase(), Phase::Turn(Color::White));
        assert!(state.is_pass);
        assert!(state.flipped.is_empty());
        assert!(!state.is_game_over);
        assert!(!game.available_moves(Color::White).is_empty());
    }

    #[test]
    fn pass_with_legal_moves_is_rejected() {
        let mut game = humans();
        let before = game.save();

        let err = game.pass(Color::Black).unwrap_err();

        assert_eq!(err, GameError::PassWithLegalMoves(Color::Black));
        assert_eq!(game.save(), before);
        assert!(!game.state().is_pass);
    }

    #[test]
    fn t04_both_sides_without_moves_end_game() {
        let mut game = Game::new(
            Player::computer(Color::Black, Box::new(Minimax::new(1))),
            Player::computer(Color::White, Box::new(Minimax::new(1))),
        )
        .unwrap();
        set_board_for_test(&mut game, FULL_BOARD ^ bit(0, 0), 0, Phase::Turn(Color::Black));

        let outcome = game.play_turn().unwrap();

        assert_eq!(outcome, TurnOutcome::Passed(Color::Black));
        assert!(game.is_over());
        assert_eq!(game.play_turn().unwrap_err(), GameError::GameOver);
    }

    #[test]
    fn t05_full_board_after_move_sets_game_over() {
        let mut game = Game::new(
            Player::human(Color::Black),
            Player::computer(Color::White, Box::new(FixedStrategy { mv: Decision::Place(pos(0, 0)) })),
        )
        .unwrap();
        let black = bit(0, 1);
        let white = FULL_BOARD ^ bit(0, 0) ^ black;
        set_board_for_test(&mut game, black, white, Phase::Turn(Color::White));

        game.play_turn().unwrap();
        let state = game.state();

        assert!(state.is_game_over);
        assert_eq!(state.current_player, 0);
        assert_eq!(state.black_count, 0);
        assert_eq!(state.white_count, 64);
        assert_eq!(state.flipped, vec![0, 1]);
        assert!(game.player(Color::Black).owned().is_empty());
        assert_eq!(game.result().winner, Some(Color::White));
    }

    #[test]
    fn computer_decision_does_not_mutate_state() {
        let mut game = Game::new(
            Player::computer(Color::Black, Box::new(Minimax::default())),
            Player::human(Color::White),
        )
        .unwrap();
        let before = game.save();

        let decision = game.computer_decision(Color::Black).unwrap();

        assert!(matches!(decision, Decision::Place(_)));
        assert_eq!(game.save(), before);
    }

    #[test]
    fn computer_decision_for_human_is_an_error() {
        let mut game = humans();

        assert_eq!(
            game.computer_decision(Color::White).unwrap_err(),
            GameError::NotAComputer(Color::White)
        );
    }

    #[test]
    fn illegal_strategy_answer_is_a_contract_violation() {
        let mut game = Game::new(
            Player::computer(Color::Black, Box::new(FixedStrategy { mv: Decision::Place(pos(7, 7)) })),
            Player::human(Color::White),
        )
        .unwrap();
        let before = *game.board();

        let err = game.play_turn().unwrap_err();

        assert_eq!(
            err,
            GameError::StrategyContractViolation {
                strategy: "fixed".to_string(),
                position: pos(7, 7),
            }
        );
        assert_eq!(*game.board(), before);
    }

    #[test]
    fn strategy_pass_with_moves_available_is_honoured() {
        let mut game = Game::new(
            Player::computer(Color::Black, Box::new(FixedStrategy { mv: Decision::Pass })),
            Player::computer(Color::White, Box::new(FixedStrategy { mv: Decision::Pass })),
        )
        .unwrap();

        assert_eq!(game.play_turn().unwrap(), TurnOutcome::Passed(Color::Black));
        assert_eq!(game.play_turn().unwrap(), TurnOutcome::Passed(Color::White));
        assert!(game.is_over());
    }

    #[test]
    fn restore_brings_back_saved_position() {
        let mut game = humans();
        let moves = game.available_moves(Color::Black);
        game.apply_move(Color::Black, &moves, pos(5, 4)).unwrap();
        let saved = game.save();

        let moves = game.available_moves(Color::White);
        let destination = moves.destinations().next().unwrap();
        game.apply_move(Color::White, &moves, destination).unwrap();
        assert_ne!(game.save(), saved);

        game.restore(saved.clone());

        assert_eq!(game.save(), saved);
        assert_eq!(game.phase(), Phase::Turn(Color::White));
        assert_owned_in_sync(&game);
    }

    #[test]
    fn restore_rebuilds_owned_lists_that_miss_discs() {
        let mut game = humans();
        let board = Board::new();
        let black = board.positions_of(Color::Black);
        let partial = Snapshot::new(
            board,
            &black[..1],
            &board.positions_of(Color::White),
            Phase::Turn(Color::Black),
            0,
        );

        game.restore(partial);

        assert_eq!(game.player(Color::Black).owned(), black.as_slice());
        assert_owned_in_sync(&game);
    }

    #[test]
    fn computer_game_plays_to_completion() {
        let mut game = Game::new(
            Player::computer(Color::Black, Box::new(Minimax::new(2))),
            Player::computer(Color::White, Box::new(Minimax::new(1))),
        )
        .unwrap();

        let result = game.play_to_end().unwrap();

        assert!(game.is_over());
        assert_eq!(result, game.board().result());
        assert_owned_in_sync(&game);
    }
}

use std::sync::Arc;

use othello::ai::neural::{POLICY_OUTPUTS, PASS_INDEX};
use othello::ai::{LinearPolicy, build_strategy};
use othello::types::NUM_SQUARES;
use othello::{Color, EngineConfig, Game, GameResult, Player, Snapshot, TurnOutcome};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn config(seed: u64) -> EngineConfig {
    EngineConfig {
        minimax_depth: 2,
        mcts_iterations: 150,
        ..EngineConfig::default()
    }
    .with_seed(seed)
}

fn computer_game(black: &str, white: &str, seed: u64) -> Game {
    let black = Player::computer(Color::Black, build_strategy(black, &config(seed), None).unwrap());
    let white = Player::computer(Color::White, build_strategy(white, &config(seed + 1), None).unwrap());
    Game::new(black, white).unwrap()
}

fn assert_consistent(game: &Game) {
    for color in [Color::Black, Color::White] {
        let mut owned = game.player(color).owned().to_vec();
        owned.sort();
        assert_eq!(owned, game.board().positions_of(color), "{color} owned list drifted");
    }
    let state = game.state();
    assert!(state.black_count as usize + state.white_count as usize <= NUM_SQUARES);
}

fn play_checked(game: &mut Game) -> GameResult {
    let mut turns = 0;
    while !game.is_over() {
        let outcome = game.play_turn().unwrap();
        if let TurnOutcome::Moved { claimed, .. } = &outcome {
            assert!(claimed.len() >= 2, "a move must flip at least one disc");
        }
        assert_consistent(game);
        turns += 1;
        assert!(turns <= 2 * NUM_SQUARES, "game did not terminate");
    }
    game.result()
}

#[test]
fn minimax_against_mcts_reaches_a_consistent_end() {
    let mut game = computer_game("minimax", "mcts", 11);

    let result = play_checked(&mut game);

    assert!(game.is_over());
    assert_eq!(game.state().current_player, 0);
    match result.winner {
        Some(Color::Black) => assert!(result.black_count > result.white_count),
        Some(Color::White) => assert!(result.white_count > result.black_count),
        None => assert_eq!(result.black_count, result.white_count),
    }
}

#[test]
fn seeded_games_are_reproducible() {
    let mut first = computer_game("mcts", "minimax", 5);
    let mut second = computer_game("mcts", "minimax", 5);

    assert_eq!(first.play_to_end().unwrap(), second.play_to_end().unwrap());
    assert_eq!(first.board(), second.board());
}

#[test]
fn game_resumes_from_saved_bytes() {
    let mut source = computer_game("minimax", "minimax", 0);
    for _ in 0..10 {
        source.play_turn().unwrap();
    }
    let bytes = source.save().to_bytes();

    let mut resumed = computer_game("minimax", "minimax", 0);
    resumed.restore(Snapshot::from_bytes(&bytes).unwrap());
    assert_eq!(resumed.save(), source.save());
    assert_consistent(&resumed);

    assert_eq!(resumed.play_to_end().unwrap(), source.play_to_end().unwrap());
}

#[test]
fn externally_driven_random_game_keeps_owned_lists_in_sync() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut game = Game::new(Player::human(Color::Black), Player::human(Color::White)).unwrap();

    while let Some(color) = game.current_player() {
        let moves = game.available_moves(color);
        let destinations: Vec<_> = moves.destinations().collect();
        match destinations.choose(&mut rng) {
            Some(&destination) => {
                game.apply_move(color, &moves, destination).unwrap();
            }
            None => game.pass(color).unwrap(),
        }
        assert_consistent(&game);
    }

    assert!(game.board().is_terminal());
}

#[test]
fn neural_player_with_corner_loving_policy_finishes() {
    let mut biases = vec![0.0f32; POLICY_OUTPUTS];
    for corner in [0, 7, 56, 63] {
        biases[corner] = 10.0;
    }
    biases[PASS_INDEX] = -100.0;
    let policy = LinearPolicy::new(vec![[0.0; NUM_SQUARES]; POLICY_OUTPUTS], biases).unwrap();
    let policy = LinearPolicy::from_bytes(&policy.to_bytes()).unwrap();

    let black = build_strategy("neural", &EngineConfig::default(), Some(Arc::new(policy))).unwrap();
    let white = build_strategy("minimax", &config(3), None).unwrap();
    let mut game = Game::new(Player::computer(Color::Black, black), Player::computer(Color::White, white)).unwrap();

    play_checked(&mut game);

    assert!(game.is_over());
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use othello::ai::{InferenceSession, LinearPolicy, build_strategy};
use othello::{Color, EngineConfig, Game, Player};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    /// Strategy key for black: "minimax", "mcts" or "neural"
    #[arg(long, default_value = "minimax")]
    black: String,

    /// Strategy key for white
    #[arg(long, default_value = "mcts")]
    white: String,

    /// How many games to play
    #[arg(short, long, default_value_t = 10)]
    games: usize,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Engine config JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Linear policy blob for neural players
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Default)]
struct MatchScore {
    black_wins: usize,
    white_wins: usize,
    draws: usize,
    black_discs: usize,
    white_discs: usize,
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn seat(
    color: Color,
    key: &str,
    config: &EngineConfig,
    seed: u64,
    model: Option<Arc<dyn InferenceSession>>,
) -> anyhow::Result<Player> {
    let config = config.clone().with_seed(seed);
    let strategy = build_strategy(key, &config, model)
        .with_context(|| format!("cannot build {color} player"))?;
    Ok(Player::computer(color, strategy))
}

fn play_match(
    args: &Args,
    config: &EngineConfig,
    model: Option<Arc<dyn InferenceSession>>,
    rng: &mut StdRng,
) -> anyhow::Result<MatchScore> {
    let mut score = MatchScore::default();

    for game_idx in 0..args.games {
        let black = seat(Color::Black, &args.black, config, rng.r#gen(), model.clone())?;
        let white = seat(Color::White, &args.white, config, rng.r#gen(), model.clone())?;
        let mut game = Game::new(black, white)?;

        let result = game.play_to_end()?;
        match result.winner {
            Some(Color::Black) => score.black_wins += 1,
            Some(Color::White) => score.white_wins += 1,
            None => score.draws += 1,
        }
        score.black_discs += result.black_count as usize;
        score.white_discs += result.white_count as usize;
        debug!(
            game_idx,
            winner = ?result.winner,
            black = result.black_count,
            white = result.white_count
        );
    }

    Ok(score)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.validate()?;

    let model: Option<Arc<dyn InferenceSession>> = match &args.model {
        Some(path) => {
            let policy = LinearPolicy::from_file(path)
                .with_context(|| format!("cannot load model {}", path.display()))?;
            Some(Arc::new(policy))
        }
        None => None,
    };

    let score = play_match(&args, &config, model, &mut rng)?;

    let games = args.games.max(1);
    println!(
        "End result after {} games:\n- {} wins by {} (black)\n- {} wins by {} (white)\n- {} draws\n- average discs {:.1} to {:.1}",
        args.games,
        score.black_wins,
        args.black,
        score.white_wins,
        args.white,
        score.draws,
        score.black_discs as f64 / games as f64,
        score.white_discs as f64 / games as f64,
    );

    Ok(())
}

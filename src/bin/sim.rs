use std::io::Write;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use tracing::{info, warn};
use werewolf_rs::cli::{PlayerInstance, StatisticsAccumulator, create_players, print_player_help};
use werewolf_rs::game::{Game, GameConfig, Party};
use werewolf_rs::logging::{LogFormat, init_tracing};
use werewolf_rs::types::{PlayerId, RevelationMode, Team};

#[derive(Debug, Parser, Clone)]
#[command(name = "werewolf-sim")]
#[command(about = "Werewolf Simulator - play seeded bot games and report win rates")]
struct Args {
    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 20)]
    num: u32,

    /// Seats per game
    #[arg(short = 'p', long, default_value_t = 8)]
    players: usize,

    /// Comma-separated bot codes, one per seat; the last code fills the rest
    #[arg(long, default_value = "R")]
    bots: String,

    /// Base seed; game i uses seed + i, wrapping at u64::MAX
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Revelation mode: FULL, HIDDEN, AURA_ONLY or PROGRESSIVE
    #[arg(long)]
    reveal: Option<String>,

    /// JSON game config; missing keys keep their defaults
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Show bot codes and exit
    #[arg(long)]
    help_players: bool,

    /// Silence console output
    #[arg(long)]
    quiet: bool,

    /// Number of worker threads for parallel execution
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() {
    let args = Args::parse();
    let format = if args.json_logs { LogFormat::Json } else { LogFormat::Human };
    init_tracing(args.verbose, format);

    if args.help_players {
        print_player_help();
        return;
    }

    let mut config = match &args.config {
        Some(path) => GameConfig::from_json_file(path).unwrap_or_else(|err| {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }),
        None => GameConfig::default(),
    };
    if let Some(reveal) = &args.reveal {
        config.revelation_mode = RevelationMode::from_str(reveal).unwrap_or_else(|_| {
            eprintln!("Error: Invalid revelation mode '{reveal}'");
            std::process::exit(1);
        });
    }
    if args.players < config.min_players || args.players > config.max_players {
        eprintln!(
            "Error: Seats must be between {} and {}",
            config.min_players, config.max_players
        );
        std::process::exit(1);
    }

    let players = create_players(&args.bots, args.players).unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        eprintln!("Use --help-players to see available codes");
        std::process::exit(1);
    });

    let mut stats = StatisticsAccumulator::new();
    if args.workers > 1 {
        run_parallel_simulations(&args, &config, &players, &mut stats);
    } else {
        run_sequential_simulations(&args, &config, &players, &mut stats);
    }

    if !args.quiet {
        print_summary(&stats);
    }
}

fn seats(n: usize) -> Vec<PlayerId> {
    (1..=n).map(|i| PlayerId::new(format!("bot{i}"))).collect()
}

/// Seed of game `idx`; wraps instead of overflowing near `u64::MAX`.
fn game_seed(base: u64, idx: usize) -> u64 {
    base.wrapping_add(idx as u64)
}

fn play_one(config: &GameConfig, players: &[PlayerInstance], seed: u64) -> Option<(Game, std::time::Duration)> {
    let config = GameConfig {
        seed: Some(seed),
        ..config.clone()
    };
    let start = Instant::now();
    let mut game = match Game::new(config, &seats(players.len())) {
        Ok(game) => game,
        Err(err) => {
            warn!(%err, seed, "could not seat game");
            return None;
        }
    };
    if let Err(err) = game.play(players) {
        warn!(%err, seed, "game aborted");
    }
    Some((game, start.elapsed()))
}

fn run_sequential_simulations(
    args: &Args,
    config: &GameConfig,
    players: &[PlayerInstance],
    stats: &mut StatisticsAccumulator,
) {
    for game_idx in 0..args.num {
        let Some((game, duration)) = play_one(config, players, game_seed(args.seed, game_idx as usize)) else {
            continue;
        };
        stats.after(&game, duration);
        info!(game = %game.id, days = game.state.day, "game finished");

        if !args.quiet {
            let last_n = 10;
            if game_idx < last_n || game_idx >= args.num.saturating_sub(last_n) {
                let winner = game
                    .victory()
                    .map_or_else(|| "None".to_string(), |v| v.party.to_string());
                println!(
                    "Game {:>4}: Winner={:<14} Days={:>3}, Duration={:?}",
                    game_idx + 1,
                    winner,
                    game.state.day,
                    duration
                );
            } else if (game_idx + 1) % 100 == 0 {
                print!(".");
                let _ = std::io::stdout().flush();
            }
        }
    }
}

fn run_parallel_simulations(
    args: &Args,
    config: &GameConfig,
    players: &[PlayerInstance],
    stats: &mut StatisticsAccumulator,
) {
    use std::sync::Arc;
    use std::thread;

    let players = Arc::new(players.to_vec());
    let config = Arc::new(config.clone());
    let games_per_worker = args.num as usize / args.workers;
    let remainder = args.num as usize % args.workers;

    let mut handles = Vec::new();
    for worker_id in 0..args.workers {
        let players = Arc::clone(&players);
        let config = Arc::clone(&config);
        let base_seed = args.seed;
        let num_games = games_per_worker + usize::from(worker_id < remainder);

        handles.push(thread::spawn(move || {
            let mut local = StatisticsAccumulator::new();
            let start_idx = worker_id * games_per_worker + worker_id.min(remainder);
            for local_idx in 0..num_games {
                let seed = game_seed(base_seed, start_idx + local_idx);
                if let Some((game, duration)) = play_one(&config, &players, seed) {
                    local.after(&game, duration);
                }
            }
            local
        }));
    }

    for handle in handles {
        match handle.join() {
            Ok(worker) => stats.stats.merge(worker.stats),
            Err(_) => warn!("simulation worker panicked"),
        }
    }
}

fn print_summary(stats: &StatisticsAccumulator) {
    let stats = &stats.stats;
    println!("\n{}", "=".repeat(60));
    println!("SIMULATION SUMMARY");
    println!("{}", "=".repeat(60));

    println!("\nParty Summary:");
    println!("{:<16} {:<8} {:<10}", "Party", "Wins", "Win Rate");
    println!("{}", "-".repeat(36));
    let parties = Team::ALL
        .into_iter()
        .map(Party::Team)
        .chain([
            Party::Tanner,
            Party::Lovers,
            Party::Executioner,
            Party::LoneSurvivor,
            Party::Nobody,
        ]);
    for party in parties {
        let wins = stats.wins.get(&party).copied().unwrap_or(0);
        if wins == 0 {
            continue;
        }
        println!("{:<16} {:<8} {:<9.1}%", party.to_string(), wins, stats.win_rate(party));
    }

    println!("\nGame Summary:");
    println!("  Total Games: {}", stats.games);
    println!("  Unfinished: {}", stats.unfinished);
    println!("  Avg Days: {:.2}", stats.get_avg_days());
    println!("  Avg Deaths: {:.2}", stats.get_avg_deaths());
    println!("  Avg Duration: {:.2?}", stats.get_avg_duration());
}

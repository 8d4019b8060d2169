//! Bytewar CLI - command-line interface for running bytewar matches.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Bytewar - a deterministic bytecode-budgeted robot strategy game
#[derive(Parser, Debug)]
#[command(name = "bytewar")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every match-running command.
#[derive(clap::Args, Debug)]
struct MatchArgs {
    /// Strategy for team A
    #[arg(short = 'a', long, default_value = "rush")]
    team_a: String,

    /// Strategy for team B
    #[arg(short = 'b', long, default_value = "idle")]
    team_b: String,

    /// Random seed (default: random)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Maximum rounds (default: 2000)
    #[arg(short, long, default_value = "2000")]
    rounds: u32,

    /// Generated map width
    #[arg(long, default_value = "40")]
    width: i32,

    /// Generated map height
    #[arg(long, default_value = "40")]
    height: i32,

    /// Balance table (JSON); missing fields keep their defaults
    #[arg(long)]
    balance: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single match between two strategies
    Run {
        #[command(flatten)]
        common: MatchArgs,

        /// Map file (JSON) instead of a generated map
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Directory for persistent team memory
        #[arg(long)]
        memory_dir: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Run many matches in parallel and aggregate statistics
    Tournament {
        #[command(flatten)]
        common: MatchArgs,

        /// Number of matches to run (default: 100)
        #[arg(short, long, default_value = "100")]
        games: u64,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::TournamentFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Generate a map and print it as JSON
    Map {
        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Map width
        #[arg(long, default_value = "40")]
        width: i32,

        /// Map height
        #[arg(long, default_value = "40")]
        height: i32,
    },

    /// List built-in strategies
    Strategies,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Run {
            common,
            map,
            memory_dir,
            format,
        } => cli::run::execute(&common.into(), map, memory_dir, format),

        Commands::Tournament {
            common,
            games,
            threads,
            format,
            progress,
        } => cli::tournament::execute(&common.into(), games, threads, format, progress),

        Commands::Map {
            seed,
            width,
            height,
        } => cli::map::execute(seed, width, height),

        Commands::Strategies => {
            for name in bytewar::strategies::BUILTIN_NAMES {
                println!("{name}");
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

impl From<MatchArgs> for cli::MatchOptions {
    fn from(args: MatchArgs) -> Self {
        Self {
            team_a: args.team_a,
            team_b: args.team_b,
            seed: args.seed,
            rounds: args.rounds,
            width: args.width,
            height: args.height,
            balance: args.balance,
        }
    }
}

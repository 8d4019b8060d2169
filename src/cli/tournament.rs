//! Tournament command implementation.

use super::output::{format_series_csv, format_series_text, JsonSeriesResult};
use super::{CliError, MatchOptions, TournamentFormat};
use bytewar::tournament::run_series_with;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

/// Execute the tournament command.
///
/// # Errors
///
/// Returns an error if the options are invalid.
pub(crate) fn execute(
    options: &MatchOptions,
    games: u64,
    threads: Option<usize>,
    format: TournamentFormat,
    progress: bool,
) -> Result<(), CliError> {
    let config = options.config()?;
    let strategies = options.strategies()?;
    let names = [strategies[0].name().to_string(), strategies[1].name().to_string()];
    let base_seed = options.seed();

    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let pb = if progress {
        let pb = ProgressBar::new(games);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})")
            .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
            .progress_chars("=>-");
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let summary = run_series_with(
        base_seed,
        games,
        [strategies[0].as_ref(), strategies[1].as_ref()],
        &config,
        |_| {
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        },
    );
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    let duration = start.elapsed();

    match format {
        TournamentFormat::Text => {
            println!();
            print!("{}", format_series_text(&summary, &names));
            println!();
            #[allow(clippy::cast_precision_loss)]
            let per_sec = if duration.as_secs_f64() > 0.0 {
                summary.games_played as f64 / duration.as_secs_f64()
            } else {
                0.0
            };
            println!("Duration: {:.2}s ({per_sec:.0} games/sec)", duration.as_secs_f64());
        }
        TournamentFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonSeriesResult::new(&summary, &names))?;
            println!("{json}");
        }
        TournamentFormat::Csv => {
            print!("{}", format_series_csv(&summary, &names));
        }
    }

    Ok(())
}

//! Run command implementation.

use super::output::{format_text, JsonMatchResult};
use super::{CliError, MatchOptions, OutputFormat};
use bytewar::game::{InMemoryStore, JsonMemoryStore, TeamMemoryStore};
use bytewar::tournament::{generate_map, load_map_file, run_match_with};
use std::path::PathBuf;

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the match cannot be set up.
pub(crate) fn execute(
    options: &MatchOptions,
    map: Option<PathBuf>,
    memory_dir: Option<PathBuf>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let config = options.config()?;
    let strategies = options.strategies()?;
    let names = [strategies[0].name().to_string(), strategies[1].name().to_string()];
    let seed = options.seed();

    let setup = match &map {
        Some(path) => load_map_file(path)
            .map_err(|e| CliError::new(format!("Failed to load {}: {e}", path.display())))?,
        None => generate_map(seed, config.map_width, config.map_height)?,
    };

    let store: Box<dyn TeamMemoryStore> = match memory_dir {
        Some(dir) => Box::new(JsonMemoryStore::new(dir)),
        None => Box::new(InMemoryStore::default()),
    };

    let result = run_match_with(
        seed,
        [strategies[0].as_ref(), strategies[1].as_ref()],
        &config,
        setup,
        store.as_ref(),
    )?;

    match format {
        OutputFormat::Text => {
            print!("{}", format_text(&result, &names));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonMatchResult::new(&result, &names))?;
            println!("{json}");
        }
    }

    Ok(())
}

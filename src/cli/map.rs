//! Map command implementation.

use super::{random_seed, CliError};
use bytewar::tournament::{generate_map, MapDescription};

/// Execute the map command.
///
/// # Errors
///
/// Returns an error if the dimensions are invalid.
pub(crate) fn execute(seed: Option<u64>, width: i32, height: i32) -> Result<(), CliError> {
    let seed = seed.unwrap_or_else(random_seed);
    let setup = generate_map(seed, width, height)?;
    let description = MapDescription {
        name: Some(format!("generated-{seed}")),
        ..MapDescription::from_setup(&setup)
    };
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

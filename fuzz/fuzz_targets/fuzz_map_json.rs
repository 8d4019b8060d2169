#![no_main]

//! Map description fuzzer.
//!
//! Any string must either be rejected with an error or produce a map that a
//! world accepts.

use bytewar::game::{Balance, WorldState};
use bytewar::tournament::parse_map_json;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if data.len() > 4096 {
        return;
    }
    if let Ok(setup) = parse_map_json(data) {
        // Encampments or mines may still overlap; those are rejected, not panics
        let _ = WorldState::new(setup, Balance::default(), 0);
    }
});

//! Address generalization
//!
//! HL7 XAD addresses generalize to state level: street, city, and ZIP
//! are dropped and only the state component survives. Addresses with no
//! state component get a complete fabricated address instead, so the
//! output stays structurally valid. Both forms are consistent per
//! original through the session store.

use super::{derive_u64, names};

/// Street-type suffixes for fabricated addresses
const STREET_SUFFIXES: &[&str] = &["ST", "AVE", "BLVD", "LN", "DR", "CT"];

/// Generalize an XAD address to state level, or fabricate one
///
/// Returns the replacement value and whether it was a generalization
/// (state kept, everything else removed) or a full fabrication.
pub fn generalize(salt: &str, original: &str, probe: u32) -> (String, bool) {
    let components: Vec<&str> = original.split('^').collect();
    let state = components.get(3).copied().unwrap_or("").trim();

    if !state.is_empty() && state.len() <= 3 && state.chars().all(|c| c.is_ascii_alphabetic()) {
        // Keep only the state: ^^^IL
        (format!("^^^{}", state.to_uppercase()), true)
    } else {
        (fabricate(salt, original, probe), false)
    }
}

/// Complete fabricated address in XAD form
fn fabricate(salt: &str, original: &str, probe: u32) -> String {
    let probe = probe.to_string();
    let seed = derive_u64(salt, &["address", original, &probe]);
    let number = seed % 9000 + 100;
    // Surnames double as street names; they read naturally
    let street = names::surname(seed >> 8);
    let suffix = STREET_SUFFIXES[((seed >> 24) % STREET_SUFFIXES.len() as u64) as usize];
    format!("{number} {street} {suffix}^^CENTERVILLE^XX^00000")
}

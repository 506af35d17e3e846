//! Structured identifier generation
//!
//! Synthesizes replacement identifiers of the same length and format
//! class as the original: digits map to digits, letter prefixes and
//! punctuation survive, so downstream systems that parse the format keep
//! working. Collision avoidance happens in the session store; the probe
//! counter re-draws the digit stream.

use super::{derive_u64, names, seeded_rng};
use rand::Rng;

/// Format-preserving synthetic identifier
///
/// Every ASCII digit in the original is replaced with a deterministic
/// synthetic digit; all other characters (letters, separators, HL7
/// component structure) pass through unchanged, preserving the format
/// class of the value.
pub fn format_preserving(salt: &str, kind: &str, original: &str, probe: u32) -> String {
    let probe = probe.to_string();
    let mut rng = seeded_rng(salt, &["identifier", kind, original, &probe]);
    original
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                char::from(b'0' + rng.gen_range(0..10u8))
            } else {
                c
            }
        })
        .collect()
}

/// Synthetic Social Security Number
///
/// Nine digits, no separators, leading 9: the 900-999 area has never
/// been issued, so the value is visibly synthetic, and dropping the
/// dashes keeps the output free of the dashed SSN shape that audit
/// scans hunt for.
pub fn ssn(salt: &str, original: &str, probe: u32) -> String {
    let probe = probe.to_string();
    let mut rng = seeded_rng(salt, &["ssn", original, &probe]);
    let mut digits = String::from("9");
    for _ in 0..8 {
        digits.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    digits
}

/// Synthetic telephone/fax number
///
/// Keeps the original's punctuation layout but forces the exchange into
/// the reserved 555 block so the number can never dial a real line.
pub fn phone(salt: &str, original: &str, probe: u32) -> String {
    let replaced = format_preserving(salt, "phone", original, probe);
    // Rewrite the exchange (4th..6th digit) to 555
    let mut digit_index = 0usize;
    replaced
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                let out = match digit_index {
                    3 | 4 | 5 => '5',
                    _ => c,
                };
                digit_index += 1;
                out
            } else {
                c
            }
        })
        .collect()
}

/// Synthetic email address derived from the synthetic name tables
pub fn email(salt: &str, original: &str, probe: u32) -> String {
    let synthetic = names::person_name(salt, original, probe);
    let mut parts = synthetic.split('^');
    let family = parts.next().unwrap_or("user").to_lowercase();
    let given = parts.next().unwrap_or("test").to_lowercase();
    let n = derive_u64(salt, &["email", original, &probe.to_string()]) % 1000;
    format!("{given}.{family}{n}@example.org")
}

/// Synthetic URL on a reserved domain
pub fn url(salt: &str, original: &str, probe: u32) -> String {
    let token = derive_u64(salt, &["url", original, &probe.to_string()]);
    format!("https://example.invalid/{token:016x}")
}

/// Synthetic IP address in the TEST-NET-3 documentation block
pub fn ip_address(salt: &str, original: &str, probe: u32) -> String {
    let host = derive_u64(salt, &["ip", original, &probe.to_string()]) % 254 + 1;
    format!("203.0.113.{host}")
}

//! Synthetic replacement value generation
//!
//! One submodule per replacement family. All generation is deterministic:
//! values derive from the session salt and the normalized original (plus
//! a probe counter for collision retries), so the same session always
//! produces the same candidates in the same order.

pub mod address;
pub mod dates;
pub mod identifiers;
pub mod names;

use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

/// Derive a u64 from the salt and key material
pub(crate) fn derive_u64(salt: &str, parts: &[&str]) -> u64 {
    let digest = digest_parts(salt, parts);
    u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
}

/// Seed a deterministic RNG from the salt and key material
pub(crate) fn seeded_rng(salt: &str, parts: &[&str]) -> StdRng {
    StdRng::from_seed(digest_parts(salt, parts))
}

fn digest_parts(salt: &str, parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    for part in parts {
        hasher.update([0x1f]);
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}

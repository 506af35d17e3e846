//! Session-scoped mapping store
//!
//! Owns the original-to-replacement mappings for one processing session
//! (one file, or one batch spanning many files). The store guarantees
//! that the same (category, normalized original) pair always yields the
//! same replacement for the lifetime of the session, under concurrent
//! access from workers processing different files: get-or-insert is
//! atomic, first writer wins, and subsequent lookups return the stored
//! value.
//!
//! A reverse registry of replacements in use backs collision avoidance:
//! a candidate replacement already claimed for a different original is
//! rejected and the generator probes again with the next candidate.
//!
//! Mappings are held in memory and discarded at session end unless
//! export is requested; exports key each entry by a salted hash of the
//! original, never the raw value.

use crate::deidentify::taxonomy::IdentifierCategory;
use crate::domain::errors::DeidentifyError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

/// Probes attempted before a generator gives up on collisions
const MAX_COLLISION_PROBES: u32 = 16;

/// One exported mapping record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Identifier category
    pub category: IdentifierCategory,
    /// Salted SHA-256 of the normalized original value
    pub original_hash: String,
    /// Replacement value
    pub replacement: String,
}

/// Serialized export envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct MappingExport {
    /// Session the mappings belong to
    pub session_id: Uuid,
    /// Number of records
    pub count: usize,
    /// The mapping records
    pub records: Vec<MappingRecord>,
}

/// Concurrent session-scoped mapping store
pub struct SessionMappingStore {
    session_id: Uuid,
    salt: String,
    mappings: DashMap<(IdentifierCategory, String), String>,
    replacements_in_use: DashMap<(IdentifierCategory, String), String>,
}

impl SessionMappingStore {
    /// Create a store for a new session
    ///
    /// When no salt is supplied a random one is generated, making
    /// replacement values unguessable across runs.
    pub fn new(salt: Option<String>) -> Self {
        let salt = salt.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        Self {
            session_id: Uuid::new_v4(),
            salt,
            mappings: DashMap::new(),
            replacements_in_use: DashMap::new(),
        }
    }

    /// Session identifier
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Session salt, mixed into all deterministic derivations
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Number of mappings currently held
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// True when no mappings have been recorded
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Look up an existing mapping
    pub fn lookup(&self, category: IdentifierCategory, normalized: &str) -> Option<String> {
        self.mappings
            .get(&(category, normalized.to_string()))
            .map(|v| v.clone())
    }

    /// Atomic get-or-insert with collision-avoiding generation
    ///
    /// If a mapping already exists for (category, normalized) it is
    /// returned unchanged; inserting twice never changes the stored
    /// value. Otherwise `generate(probe)` is called with increasing probe
    /// numbers until it yields a candidate that neither reproduces the
    /// original, nor is claimed as a replacement for a different
    /// original, nor collides with a value already present as a mapping
    /// key of the same category. The final insert goes through the entry
    /// API, so "first writer wins" holds under concurrency: a racing
    /// writer that loses adopts the stored value.
    pub fn get_or_insert_with<F>(
        &self,
        category: IdentifierCategory,
        normalized: &str,
        mut generate: F,
    ) -> Result<String, DeidentifyError>
    where
        F: FnMut(u32) -> Result<String, DeidentifyError>,
    {
        if let Some(existing) = self.lookup(category, normalized) {
            return Ok(existing);
        }

        for probe in 0..MAX_COLLISION_PROBES {
            let candidate = generate(probe)?;
            let candidate_normalized = candidate.trim().to_uppercase();
            // A candidate that reproduces the original is itself a
            // collision; draw again
            if candidate_normalized == normalized {
                continue;
            }
            // Never reuse a value that exists as a different original's
            // mapping key: the output would alias that subject
            if self
                .mappings
                .contains_key(&(category, candidate_normalized))
            {
                continue;
            }
            if !self.claim_replacement(category, &candidate, normalized) {
                continue;
            }
            return match self.mappings.entry((category, normalized.to_string())) {
                Entry::Occupied(existing) => Ok(existing.get().clone()),
                Entry::Vacant(slot) => {
                    slot.insert(candidate.clone());
                    Ok(candidate)
                }
            };
        }

        Err(DeidentifyError::CollisionExhausted {
            category,
            attempts: MAX_COLLISION_PROBES,
        })
    }

    /// Atomic get-or-insert for many-to-one categories
    ///
    /// Dates truncate and addresses generalize, so distinct originals
    /// legitimately share a replacement; no collision probing applies.
    /// Idempotence and first-writer-wins hold exactly as for
    /// [`get_or_insert_with`](Self::get_or_insert_with).
    pub fn get_or_insert_shared<F>(
        &self,
        category: IdentifierCategory,
        normalized: &str,
        generate: F,
    ) -> Result<String, DeidentifyError>
    where
        F: FnOnce() -> Result<String, DeidentifyError>,
    {
        match self.mappings.entry((category, normalized.to_string())) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                let value = generate()?;
                self.replacements_in_use
                    .entry((category, value.clone()))
                    .or_insert_with(|| normalized.to_string());
                slot.insert(value.clone());
                Ok(value)
            }
        }
    }

    /// True when `value` is a replacement this session produced for the
    /// given category (used to filter re-validation findings)
    pub fn is_replacement(&self, category: IdentifierCategory, value: &str) -> bool {
        self.replacements_in_use
            .contains_key(&(category, value.to_string()))
    }

    /// Register a candidate replacement; false if it is already claimed
    /// for a different original
    fn claim_replacement(
        &self,
        category: IdentifierCategory,
        candidate: &str,
        normalized: &str,
    ) -> bool {
        match self
            .replacements_in_use
            .entry((category, candidate.to_string()))
        {
            Entry::Occupied(existing) => existing.get() == normalized,
            Entry::Vacant(slot) => {
                slot.insert(normalized.to_string());
                true
            }
        }
    }

    /// Salted SHA-256 of a normalized original, the export key
    pub fn hash_original(&self, normalized: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(b":");
        hasher.update(normalized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Snapshot of all mappings with hashed originals
    pub fn snapshot(&self) -> Vec<MappingRecord> {
        let mut records: Vec<MappingRecord> = self
            .mappings
            .iter()
            .map(|entry| {
                let (category, normalized) = entry.key();
                MappingRecord {
                    category: *category,
                    original_hash: self.hash_original(normalized),
                    replacement: entry.value().clone(),
                }
            })
            .collect();
        records.sort_by(|a, b| {
            (a.category, &a.original_hash).cmp(&(b.category, &b.original_hash))
        });
        records
    }

    /// Write the mapping table as JSON
    ///
    /// Only salted hashes of originals are written, never raw values.
    pub fn export_mappings(&self, path: &Path) -> Result<usize, DeidentifyError> {
        let records = self.snapshot();
        let export = MappingExport {
            session_id: self.session_id,
            count: records.len(),
            records,
        };
        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| DeidentifyError::MappingExport(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            DeidentifyError::MappingExport(format!("{}: {e}", path.display()))
        })?;
        Ok(export.count)
    }
}

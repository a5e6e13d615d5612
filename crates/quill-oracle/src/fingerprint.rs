//! Semantic fingerprinting — the dedup key for intent history.
//!
//! Wraps the Oracle's canonicalization call and digests the resulting
//! label, so label normalization (casing, whitespace) can never fragment
//! identity. Degrades to a deterministic local fallback when the Oracle
//! is down: ingestion must stay live.

use quill_core::traits::Oracle;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

/// A stable identity for one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Canonical intent label (Oracle's, or the uppercased text fallback).
    pub label: String,
    /// Lowercase hex SHA-256 of the label — the storage key.
    pub hash: String,
}

/// Turns cleaned atoms into fingerprints.
pub struct Fingerprinter {
    oracle: Arc<dyn Oracle>,
}

impl Fingerprinter {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Fingerprint one cleaned atom.
    ///
    /// Never fails: an Oracle error or empty label falls back to the
    /// uppercased cleaned text. Only a blank atom yields `None`.
    pub async fn fingerprint(&self, cleaned: &str) -> Option<Fingerprint> {
        let trimmed = cleaned.trim();
        if trimmed.is_empty() {
            return None;
        }

        let label = match self.oracle.canonicalize(trimmed).await {
            Ok(label) if !label.trim().is_empty() => label,
            Ok(_) => {
                debug!("oracle returned empty label, falling back to local label");
                trimmed.to_uppercase()
            }
            Err(e) => {
                warn!("canonicalize failed, falling back to local label: {e}");
                trimmed.to_uppercase()
            }
        };

        let hash = hex::encode(Sha256::digest(label.as_bytes()));
        Some(Fingerprint { label, hash })
    }
}

//! Puzzle solution verification
//!
//! Checks a `puzzle_solutions.json` style dataset: each entry states an
//! address and the key material it was derived from, and every stated
//! address must re-derive from that material.

use std::fmt;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::validate;
use crate::codec::base58check;
use crate::crypto::{hash160, Hash160};
use crate::network::Network;
use crate::script::pubkey;

/// Dataset loading errors
#[derive(Debug, Error)]
pub enum SolutionsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid solutions JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SolutionsError {
    pub fn kind(&self) -> &'static str {
        match self {
            SolutionsError::Io { .. } => "Io",
            SolutionsError::Json(_) => "Json",
        }
    }
}

/// One dataset entry; fields not listed here (private keys, ranges) are ignored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleEntry {
    pub bits: u32,
    pub address: String,
    #[serde(default, alias = "hash160", skip_serializing_if = "Option::is_none")]
    pub hash160_compressed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// Verification outcome for one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum EntryStatus {
    Match,
    Mismatch,
    /// Stated address does not decode; carries the taxonomy name
    InvalidAddress(&'static str),
    MissingKeyMaterial,
    MalformedHex(String),
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Match => write!(f, "match"),
            EntryStatus::Mismatch => write!(f, "MISMATCH"),
            EntryStatus::InvalidAddress(kind) => write!(f, "invalid address ({})", kind),
            EntryStatus::MissingKeyMaterial => write!(f, "no key material"),
            EntryStatus::MalformedHex(msg) => write!(f, "malformed hex ({})", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub bits: u32,
    pub stated: String,
    pub derived: Option<String>,
    pub status: EntryStatus,
}

/// Counts over a batch of reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub errors: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries: {} match, {} mismatch, {} error",
            self.total, self.matches, self.mismatches, self.errors
        )
    }
}

/// Load entries from a JSON array on disk
pub fn load(path: impl AsRef<Path>) -> Result<Vec<PuzzleEntry>, SolutionsError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| SolutionsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let entries = parse(&text)?;
    debug!("loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Parse entries from JSON text
pub fn parse(text: &str) -> Result<Vec<PuzzleEntry>, SolutionsError> {
    Ok(serde_json::from_str(text)?)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// hash160 an entry's address should commit to
fn entry_hash(entry: &PuzzleEntry, compress: bool) -> Result<Option<Hash160>, String> {
    if let Some(text) = non_empty(&entry.hash160_compressed) {
        return Hash160::from_hex(text)
            .map(Some)
            .map_err(|e| format!("hash160 {:?}: {}", text, e));
    }
    let Some(text) = non_empty(&entry.public_key) else {
        return Ok(None);
    };
    let key = hex::decode(text).map_err(|e| format!("public key: {}", e))?;
    pubkey::check_shape(&key).map_err(|e| e.to_string())?;
    if compress {
        let compressed = pubkey::compress(&key).map_err(|e| e.to_string())?;
        Ok(Some(hash160(&compressed)))
    } else {
        Ok(Some(hash160(&key)))
    }
}

fn verify_entry(entry: &PuzzleEntry, network: Network, compress: bool) -> EntryReport {
    let report = |derived: Option<String>, status: EntryStatus| EntryReport {
        bits: entry.bits,
        stated: entry.address.clone(),
        derived,
        status,
    };

    let validation = validate(&entry.address);
    if let Some(kind) = validation.error {
        warn!(
            "puzzle {}: stated address {} is invalid: {}",
            entry.bits,
            entry.address,
            validation.diagnostic.unwrap_or_default()
        );
        return report(None, EntryStatus::InvalidAddress(kind));
    }

    let hash = match entry_hash(entry, compress) {
        Ok(Some(hash)) => hash,
        Ok(None) => return report(None, EntryStatus::MissingKeyMaterial),
        Err(msg) => {
            warn!("puzzle {}: {}", entry.bits, msg);
            return report(None, EntryStatus::MalformedHex(msg));
        }
    };

    let derived = base58check::encode(network.p2pkh_version(), hash.as_ref());
    if derived == entry.address.trim() {
        report(Some(derived), EntryStatus::Match)
    } else {
        warn!(
            "puzzle {}: stated {} but key material derives {}",
            entry.bits, entry.address, derived
        );
        report(Some(derived), EntryStatus::Mismatch)
    }
}

/// Re-derive each entry's P2PKH address and compare it with the stated one
pub fn verify(entries: &[PuzzleEntry], network: Network, compress: bool) -> Vec<EntryReport> {
    entries
        .iter()
        .map(|entry| verify_entry(entry, network, compress))
        .collect()
}

pub fn summary(reports: &[EntryReport]) -> Summary {
    let mut summary = Summary {
        total: reports.len(),
        ..Summary::default()
    };
    for report in reports {
        match report.status {
            EntryStatus::Match => summary.matches += 1,
            EntryStatus::Mismatch => summary.mismatches += 1,
            _ => summary.errors += 1,
        }
    }
    summary
}

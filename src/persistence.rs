//! Saving and importing tier lists.
//!
//! A saved document records tier labels and item identities only; media
//! content stays with the file store. Importing rebuilds the board from a
//! document plus the list of files the store still has.
//!
//! # Document shape
//! ```json
//! { "timestamp": "2024-05-01T12:00:00.000Z",
//!   "tiers": [ { "label": "S",
//!                "files": [ { "filename": "cat_1a2b3c4d.png",
//!                             "original_name": "cat.png",
//!                             "is_audio": false } ] } ] }
//! ```
//! Older documents use `images` instead of `files` and omit `is_audio`.

use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::board::{default_tier_label, tier_id, Board, Tier};
use crate::media::{Item, UploadedFile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierListDocument {
    #[serde(default)]
    pub timestamp: String,
    pub tiers: Vec<TierEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, alias = "images")]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub is_audio: bool,
}

/// Reply body of the import endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportResponse {
    pub tierlist: TierListDocument,
    #[serde(default)]
    pub available_files: Vec<UploadedFile>,
    #[serde(default)]
    pub missing_files: Vec<String>,
}

/// What an import could not restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub missing: Vec<String>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_complete() {
            "Tier list imported successfully!".to_string()
        } else {
            format!(
                "Tier list imported with {} missing file(s): {}",
                self.missing.len(),
                self.missing.join(", ")
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    Malformed(String),
    /// The import endpoint answered with an error or could not be reached.
    Rejected(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Malformed(msg) => write!(f, "Invalid tier list file: {}", msg),
            PersistenceError::Rejected(msg) => write!(f, "Import failed: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Malformed(e.to_string())
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Download name for a document saved at `at`.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("tierlist-{}.json", at.format("%Y-%m-%d"))
}

/// Snapshot the tiers of `board`. The pool is not saved.
pub fn serialize(board: &Board, at: DateTime<Utc>) -> TierListDocument {
    TierListDocument {
        timestamp: format_timestamp(at),
        tiers: board
            .tiers()
            .iter()
            .map(|tier| TierEntry {
                label: Some(tier.label.clone()),
                files: tier
                    .items
                    .iter()
                    .map(|item| FileEntry {
                        filename: item.id.clone(),
                        original_name: item.display_name.clone(),
                        is_audio: item.kind.is_audio(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn to_json(document: &TierListDocument) -> Result<String, PersistenceError> {
    serde_json::to_string_pretty(document).map_err(PersistenceError::from)
}

/// Parse a saved document, accepting both the current and legacy shapes.
pub fn parse_document(json: &str) -> Result<TierListDocument, PersistenceError> {
    Ok(serde_json::from_str(json)?)
}

/// Rebuild a board from `document`, using `available` as the authoritative
/// set of files.
///
/// References to unavailable files are dropped and reported. A file
/// referenced twice is placed at its first reference only. Available files
/// the document does not reference become the pool, in their given order.
pub fn reconstruct(document: &TierListDocument, available: Vec<Item>) -> (Board, ImportReport) {
    let mut remaining: Vec<Option<Item>> = available.into_iter().map(Some).collect();
    let mut placed: HashSet<String> = HashSet::new();
    let mut report = ImportReport::default();

    let tiers: Vec<Tier> = document
        .tiers
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut items = Vec::with_capacity(entry.files.len());
            for file in &entry.files {
                if placed.contains(&file.filename) {
                    warn!("'{}' is referenced more than once, keeping the first", file.filename);
                    continue;
                }
                let found = remaining
                    .iter_mut()
                    .find(|slot| slot.as_ref().is_some_and(|item| item.id == file.filename))
                    .and_then(Option::take);
                match found {
                    Some(item) => {
                        placed.insert(item.id.clone());
                        items.push(item);
                    }
                    None => {
                        warn!("Missing file '{}' dropped from import", file.filename);
                        if !report.missing.contains(&file.filename) {
                            report.missing.push(file.filename.clone());
                        }
                    }
                }
            }
            let label = entry
                .label
                .as_deref()
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| default_tier_label(index));
            Tier {
                id: tier_id(index),
                label,
                items,
            }
        })
        .collect();

    let pool: Vec<Item> = remaining.into_iter().flatten().collect();
    info!(
        "Reconstructed {} tier(s), {} item(s) in pool, {} missing",
        document.tiers.len(),
        pool.len(),
        report.missing.len()
    );
    (Board::from_parts(tiers, pool), report)
}

/// Apply an import endpoint reply.
///
/// Misses the server already noticed are merged into the report after the
/// locally detected ones.
pub fn import(response: ImportResponse) -> (Board, ImportReport) {
    let available: Vec<Item> = dedup_available(response.available_files);
    let (board, mut report) = reconstruct(&response.tierlist, available);
    for name in response.missing_files {
        if !report.missing.contains(&name) {
            report.missing.push(name);
        }
    }
    (board, report)
}

fn dedup_available(files: Vec<UploadedFile>) -> Vec<Item> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|file| seen.insert(file.filename.clone()))
        .map(Item::from)
        .collect()
}

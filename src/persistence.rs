//! Persistence for results files and session snapshots.
//!
//! The results file is always a pretty-printed JSON array and is rewritten
//! in full on every save. Session snapshots support both JSON
//! (human-readable) and bincode (efficient binary) formats, chosen by file
//! extension.

use crate::dataset::EvaluationUnit;
use crate::error::{RaterError, Result};
use crate::record::{EvaluationRecord, ResultsLedger};
use crate::session::UnitSelections;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Destination the engine writes the ledger to on every save event.
///
/// A trait seam so the write-failure policy is testable without touching a
/// filesystem.
pub trait ResultsSink {
    fn persist(&mut self, records: &[EvaluationRecord]) -> Result<()>;
}

/// Production sink: full-overwrite JSON file at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultsSink for JsonFileSink {
    fn persist(&mut self, records: &[EvaluationRecord]) -> Result<()> {
        save_records(records, &self.path)
    }
}

/// Write the records as a pretty-printed JSON array, replacing the file.
pub fn save_records(records: &[EvaluationRecord], path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| RaterError::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(records)
        .map_err(|e| RaterError::Serialization(e.to_string()))?;
    fs::write(path, json).map_err(|e| RaterError::io(path, e))?;

    Ok(())
}

/// Load a results file written by [`save_records`].
pub fn load_records(path: &Path) -> Result<Vec<EvaluationRecord>> {
    if !path.exists() {
        return Err(RaterError::ResultsNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| RaterError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| RaterError::Serialization(e.to_string()))
}

/// Save format for session snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SaveFormat::Json,
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json, // Default to JSON
        }
    }
}

/// Complete state of a paused session: the sampled units, the rater's
/// position, every unit's selections, and the ledger so far.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct SessionSnapshot {
    pub units: Vec<EvaluationUnit>,
    pub current_index: usize,
    pub selections: Vec<UnitSelections>,
    pub results: ResultsLedger,
}

/// Save a session snapshot to a file.
pub fn save_session(snapshot: &SessionSnapshot, path: &Path) -> Result<()> {
    let format = SaveFormat::from_path(path);
    save_session_with_format(snapshot, path, format)
}

/// Save a session snapshot with a specific format.
pub fn save_session_with_format(
    snapshot: &SessionSnapshot,
    path: &Path,
    format: SaveFormat,
) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| RaterError::io(parent, e))?;
        }
    }

    let data = match format {
        SaveFormat::Json => serde_json::to_string_pretty(snapshot)
            .map_err(|e| RaterError::Serialization(e.to_string()))?
            .into_bytes(),
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::encode_to_vec(snapshot, config)
                .map_err(|e| RaterError::Serialization(e.to_string()))?
        }
    };

    fs::write(path, &data).map_err(|e| RaterError::io(path, e))?;

    Ok(())
}

/// Load a session snapshot from a file.
pub fn load_session(path: &Path) -> Result<SessionSnapshot> {
    if !path.exists() {
        return Err(RaterError::SnapshotNotFound(path.to_path_buf()));
    }

    let format = SaveFormat::from_path(path);
    load_session_with_format(path, format)
}

/// Load a session snapshot with a specific format.
pub fn load_session_with_format(path: &Path, format: SaveFormat) -> Result<SessionSnapshot> {
    let data = fs::read(path).map_err(|e| RaterError::io(path, e))?;

    let snapshot = match format {
        SaveFormat::Json => {
            let json_str =
                String::from_utf8(data).map_err(|e| RaterError::Serialization(e.to_string()))?;
            serde_json::from_str(&json_str)
                .map_err(|e| RaterError::Serialization(e.to_string()))?
        }
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            let (snapshot, _): (SessionSnapshot, usize) =
                bincode::decode_from_slice(&data, config)
                    .map_err(|e| RaterError::Serialization(e.to_string()))?;
            snapshot
        }
    };

    Ok(snapshot)
}

/// Check if a session snapshot exists at the given path.
pub fn session_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

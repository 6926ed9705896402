//! Append-only dose log.
//!
//! Entries are appended to a JSONL (JSON Lines) file with file locking to
//! ensure safe concurrent access. Entries are never edited or removed once
//! written; a correction is a new entry.

use crate::{DoseLogEntry, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Sink trait for persisting dose log entries
pub trait LogSink {
    fn append(&mut self, entry: &DoseLogEntry) -> Result<()>;
}

/// JSONL-based dose log sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl LogSink for JsonlSink {
    fn append(&mut self, entry: &DoseLogEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Acquire exclusive lock
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(entry)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended dose log entry {} ({})", entry.id, entry.status);
        Ok(())
    }
}

/// Read all dose log entries from a JSONL file
///
/// Unparsable lines are skipped with a warning rather than failing the
/// whole read.
pub fn read_entries(path: &Path) -> Result<Vec<DoseLogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    // Shared lock for reading
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<DoseLogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse dose log line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} dose log entries", entries.len());
    Ok(entries)
}

/// Load the history for one medication, newest first.
///
/// Re-queryable any number of times; always reflects the current file state.
pub fn history_for(path: &Path, medication_id: Uuid) -> Result<Vec<DoseLogEntry>> {
    let mut entries: Vec<_> = read_entries(path)?
        .into_iter()
        .filter(|e| e.medication_id == medication_id)
        .collect();
    entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    Ok(entries)
}

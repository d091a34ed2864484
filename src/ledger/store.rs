//! Append-only ledger export with file-based persistence.
//!
//! Ledgers are stored as newline-delimited JSON (JSONL), one decision per
//! line, under `<base>/<run_id>/ledger.jsonl`. Appends take an exclusive
//! file lock so concurrent batch runs sharing a directory do not interleave
//! lines. The store is an export only; evaluation never reads it back.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{DecisionLedger, StatusCounts};
use crate::domain::Decision;

/// One line of ledger.jsonl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Deterministic entry ID
    pub id: String,

    /// Evaluation run this entry belongs to
    pub run_id: Uuid,

    /// Document the prediction was made for
    pub document_id: String,

    /// Position of the prediction within the document
    pub index: usize,

    /// When the entry was written
    pub ts: DateTime<Utc>,

    /// The decision itself
    pub decision: Decision,
}

impl LedgerEntry {
    pub fn new(run_id: Uuid, document_id: &str, index: usize, decision: Decision) -> Self {
        Self {
            id: compute_entry_id(document_id, index, &decision.text),
            run_id,
            document_id: document_id.to_string(),
            index,
            ts: Utc::now(),
            decision,
        }
    }
}

/// Compute a deterministic entry ID
///
/// sha256(document_id + index + prediction text)[0:16]; the same prediction
/// at the same position always gets the same ID across runs.
pub fn compute_entry_id(document_id: &str, index: usize, prediction_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(index.to_string().as_bytes());
    hasher.update(prediction_text.as_bytes());

    let result = hasher.finalize();
    hex::encode(&result[..8]) // 16 hex chars = 8 bytes
}

/// Status counts over a set of entries, such as one document's replay
pub fn summarize(entries: &[LedgerEntry]) -> StatusCounts {
    StatusCounts::from_decisions(entries.iter().map(|e| &e.decision))
}

/// File-based ledger store using JSONL format
#[derive(Debug, Clone)]
pub struct LedgerStore {
    run_id: Uuid,
    run_dir: PathBuf,
    ledger_path: PathBuf,
}

impl LedgerStore {
    /// Create or open the ledger of a run below `base_dir`
    pub fn open(base_dir: &Path, run_id: Uuid) -> Result<Self> {
        let run_dir = base_dir.join(run_id.to_string());
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create ledger directory: {}", run_dir.display()))?;

        let ledger_path = run_dir.join("ledger.jsonl");

        Ok(Self {
            run_id,
            run_dir,
            ledger_path,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Append a single entry
    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        self.append_entries(std::slice::from_ref(entry))
    }

    /// Append every decision of a document's ledger, in order
    #[instrument(skip(self, ledger), fields(run_id = %self.run_id, decisions = ledger.len()))]
    pub fn append_ledger(&self, document_id: &str, ledger: &DecisionLedger) -> Result<()> {
        let entries: Vec<LedgerEntry> = ledger
            .iter()
            .enumerate()
            .map(|(i, d)| LedgerEntry::new(self.run_id, document_id, i, d.clone()))
            .collect();
        self.append_entries(&entries)?;
        debug!(document_id, "Ledger appended");
        Ok(())
    }

    fn append_entries(&self, entries: &[LedgerEntry]) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .with_context(|| {
                format!("Failed to open ledger file: {}", self.ledger_path.display())
            })?;

        // Acquire exclusive lock
        file.lock_exclusive()
            .context("Failed to acquire file lock on ledger.jsonl")?;

        let mut file = file;
        for entry in entries {
            let json = serde_json::to_string(entry).context("Failed to serialize ledger entry")?;
            writeln!(file, "{}", json).context("Failed to write ledger entry")?;
        }
        file.flush().context("Failed to flush ledger")?;

        // Lock is released when file is dropped
        Ok(())
    }

    /// Replay all entries in append order
    pub fn replay(&self) -> Result<Vec<LedgerEntry>> {
        if !self.ledger_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.ledger_path).with_context(|| {
            format!("Failed to open ledger file: {}", self.ledger_path.display())
        })?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LedgerEntry = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse ledger line: {}", line))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Entries of one document, in order
    pub fn document_entries(&self, document_id: &str) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .replay()?
            .into_iter()
            .filter(|e| e.document_id == document_id)
            .collect())
    }

    /// Status counts over the whole ledger
    pub fn summary(&self) -> Result<StatusCounts> {
        Ok(summarize(&self.replay()?))
    }

    /// List all run IDs in a base directory
    pub fn list_runs(base_dir: &Path) -> Result<Vec<Uuid>> {
        if !base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(base_dir)
            .with_context(|| format!("Failed to read ledger directory: {}", base_dir.display()))?
        {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(id) = Uuid::parse_str(name) {
                    if entry.path().join("ledger.jsonl").exists() {
                        runs.push(id);
                    }
                }
            }
        }

        Ok(runs)
    }
}

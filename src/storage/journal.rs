//! Operation journal for multi-write ledger operations
//!
//! Each operation appends a `begin` line before touching any collection and
//! a `commit` line once every touched collection has been flushed. A
//! `begin` without a matching `commit` or `resolved` marks an operation
//! that may have been partially applied; reconciliation picks those up.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::OperationId;

/// Lifecycle marker of a journaled operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalPhase {
    Begin,
    Commit,
    /// Closed by a reconciliation pass rather than by the operation itself
    Resolved,
}

/// One line of the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub operation_id: OperationId,
    pub timestamp: DateTime<Utc>,
    pub phase: JournalPhase,
    /// Operation name, e.g. `record_income`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Keys of the records the operation intends to write
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<String>,
}

/// Append-only JSONL journal
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn append(&self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Persistence(format!("Failed to open journal: {}", e)))?;

        let json = serde_json::to_string(entry)
            .map_err(|e| LedgerError::Json(format!("Failed to serialize journal entry: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| LedgerError::Persistence(format!("Failed to write journal: {}", e)))?;

        file.sync_data()
            .map_err(|e| LedgerError::Persistence(format!("Failed to sync journal: {}", e)))
    }

    /// Record the start of an operation
    pub fn begin(&self, kind: &str, records: Vec<String>) -> LedgerResult<OperationId> {
        let operation_id = OperationId::new();
        self.append(&JournalEntry {
            operation_id,
            timestamp: Utc::now(),
            phase: JournalPhase::Begin,
            kind: kind.to_string(),
            records,
        })?;
        Ok(operation_id)
    }

    /// Record that an operation completed and was flushed
    pub fn commit(&self, operation_id: OperationId) -> LedgerResult<()> {
        self.append(&JournalEntry {
            operation_id,
            timestamp: Utc::now(),
            phase: JournalPhase::Commit,
            kind: String::new(),
            records: Vec::new(),
        })
    }

    /// Close operations that reconciliation has repaired
    pub fn resolve(&self, operation_ids: &[OperationId]) -> LedgerResult<()> {
        for operation_id in operation_ids {
            self.append(&JournalEntry {
                operation_id: *operation_id,
                timestamp: Utc::now(),
                phase: JournalPhase::Resolved,
                kind: String::new(),
                records: Vec::new(),
            })?;
        }
        Ok(())
    }

    /// Read every entry, oldest first
    pub fn read_all(&self) -> LedgerResult<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| LedgerError::Persistence(format!("Failed to open journal: {}", e)))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                LedgerError::Persistence(format!(
                    "Failed to read journal line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            // A torn final line means the process died mid-append; the
            // operation it belonged to never started writing.
            match serde_json::from_str::<JournalEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(line = line_num + 1, error = %e, "skipping unreadable journal line"),
            }
        }

        Ok(entries)
    }

    /// Operations that began but were neither committed nor resolved
    pub fn pending(&self) -> LedgerResult<Vec<JournalEntry>> {
        let entries = self.read_all()?;
        let closed: HashSet<OperationId> = entries
            .iter()
            .filter(|e| e.phase != JournalPhase::Begin)
            .map(|e| e.operation_id)
            .collect();

        Ok(entries
            .into_iter()
            .filter(|e| e.phase == JournalPhase::Begin && !closed.contains(&e.operation_id))
            .collect())
    }

    /// Drop closed operations, keeping only pending `begin` lines
    pub fn compact(&self) -> LedgerResult<()> {
        let pending = self.pending()?;
        if pending.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|e| {
                    LedgerError::Persistence(format!("Failed to truncate journal: {}", e))
                })?;
            }
            return Ok(());
        }

        let mut contents = String::new();
        for entry in &pending {
            contents.push_str(&serde_json::to_string(entry)?);
            contents.push('\n');
        }

        let temp_path = self.path.with_extension("log.tmp");
        fs::write(&temp_path, contents)
            .map_err(|e| LedgerError::Persistence(format!("Failed to write journal: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| LedgerError::Persistence(format!("Failed to replace journal: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_journal() -> (TempDir, Journal) {
        let temp_dir = TempDir::new().unwrap();
        let journal = Journal::new(temp_dir.path().join("journal.log"));
        (temp_dir, journal)
    }

    #[test]
    fn test_begin_without_commit_is_pending() {
        let (_temp, journal) = create_test_journal();

        let done = journal.begin("record_income", vec!["item-1".into()]).unwrap();
        journal.commit(done).unwrap();
        let torn = journal.begin("record_expense", vec!["item-2".into()]).unwrap();

        let pending = journal.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation_id, torn);
        assert_eq!(pending[0].kind, "record_expense");
    }

    #[test]
    fn test_resolve_closes_pending() {
        let (_temp, journal) = create_test_journal();
        let op = journal.begin("record_transfer", Vec::new()).unwrap();

        journal.resolve(&[op]).unwrap();
        assert!(journal.pending().unwrap().is_empty());
    }

    #[test]
    fn test_compact_keeps_only_pending() {
        let (_temp, journal) = create_test_journal();
        let done = journal.begin("a", Vec::new()).unwrap();
        journal.commit(done).unwrap();
        let open = journal.begin("b", Vec::new()).unwrap();

        journal.compact().unwrap();
        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation_id, open);

        journal.resolve(&[open]).unwrap();
        journal.compact().unwrap();
        assert!(!journal.path().exists());
    }

    #[test]
    fn test_torn_line_is_skipped() {
        let (_temp, journal) = create_test_journal();
        journal.begin("a", Vec::new()).unwrap();
        let mut file = OpenOptions::new().append(true).open(journal.path()).unwrap();
        write!(file, "{{\"operation_id\":").unwrap();

        assert_eq!(journal.read_all().unwrap().len(), 1);
    }
}

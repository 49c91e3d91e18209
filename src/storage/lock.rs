//! Cross-process write lock over the data directory
//!
//! Writers take an exclusive advisory lock on `data/.lock` for the whole of
//! an operation. The file also carries a generation counter that every
//! writer advances, so a process can tell that another one changed the
//! collection files since it last read them.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};

/// The lock file of one data directory
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current generation, read without taking the lock
    pub fn peek_generation(&self) -> LedgerResult<u64> {
        if !self.path.exists() {
            return Ok(0);
        }
        let mut file = File::open(&self.path).map_err(|e| {
            LedgerError::Persistence(format!("Failed to open lock file: {}", e))
        })?;
        read_generation(&mut file)
    }

    /// Block until this process holds the exclusive lock
    pub fn acquire(&self) -> LedgerResult<HeldLock> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| LedgerError::Persistence(format!("Failed to open lock file: {}", e)))?;

        FileExt::lock_exclusive(&file).map_err(|e| {
            LedgerError::Persistence(format!("Failed to lock {}: {}", self.path.display(), e))
        })?;

        let generation = read_generation(&mut file)?;
        Ok(HeldLock { file, generation })
    }
}

/// An acquired lock; released when dropped
pub struct HeldLock {
    file: File,
    generation: u64,
}

impl HeldLock {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Advance the generation, announcing a write to other processes
    pub fn advance(&mut self) -> LedgerResult<u64> {
        let next = self.generation.wrapping_add(1);
        let write = |file: &mut File| -> std::io::Result<()> {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            write!(file, "{}", next)?;
            file.sync_data()
        };
        write(&mut self.file).map_err(|e| {
            LedgerError::Persistence(format!("Failed to write lock file: {}", e))
        })?;
        self.generation = next;
        Ok(next)
    }
}

fn read_generation(file: &mut File) -> LedgerResult<u64> {
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| LedgerError::Persistence(format!("Failed to read lock file: {}", e)))?;

    let contents = contents.trim();
    if contents.is_empty() {
        return Ok(0);
    }
    // A torn write only costs a spurious reload
    Ok(contents.parse().unwrap_or_else(|_| {
        warn!(contents, "unreadable lock generation, treating as 0");
        0
    }))
}

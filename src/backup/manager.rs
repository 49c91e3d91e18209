//! Backup manager for the ledger
//!
//! Writes point-in-time snapshots of every collection as dated JSON
//! archives and prunes them to the configured retention.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audit::EntityType;
use crate::config::paths::LedgerPaths;
use crate::config::settings::BackupRetention;
use crate::error::{LedgerError, LedgerResult};
use crate::models::BackupId;
use crate::storage::{read_json_required, write_json_atomic, LedgerSnapshot, Storage};

/// Current archive layout version
pub const BACKUP_SCHEMA_VERSION: u32 = 1;

/// Metadata about a backup file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Backup filename
    pub filename: String,
    /// Full path to backup
    pub path: PathBuf,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Backup archive format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupArchive {
    /// Schema version for migration support
    pub schema_version: u32,
    pub id: BackupId,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// Every collection at the time of the backup
    pub data: LedgerSnapshot,
}

/// A freshly written backup
#[derive(Debug, Clone)]
pub struct CreatedBackup {
    pub id: BackupId,
    pub info: BackupInfo,
    pub records: usize,
}

/// Manages backup creation and retention
pub struct BackupManager {
    /// Path to backup directory
    backup_dir: PathBuf,
    /// Retention policy
    retention: BackupRetention,
}

impl BackupManager {
    pub fn new(paths: &LedgerPaths, retention: BackupRetention) -> Self {
        Self {
            backup_dir: paths.backup_dir(),
            retention,
        }
    }

    /// Snapshot every collection into a new archive
    pub fn create_backup(&self, storage: &Storage) -> LedgerResult<CreatedBackup> {
        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            LedgerError::Io(format!("Failed to create backup directory: {}", e))
        })?;

        let now = Utc::now();
        let filename = format!(
            "backup-{}-{:03}.json",
            now.format("%Y%m%d-%H%M%S"),
            now.timestamp_subsec_millis()
        );
        let backup_path = self.backup_dir.join(&filename);

        // Under the write lock the snapshot also holds other processes' writes
        let data = {
            let _lock = storage.write_lock()?;
            storage.snapshot()?
        };
        let archive = BackupArchive {
            schema_version: BACKUP_SCHEMA_VERSION,
            id: BackupId::new(),
            created_at: now,
            data,
        };
        let records = archive.data.record_count();
        write_json_atomic(&backup_path, &archive)?;

        let size_bytes = fs::metadata(&backup_path).map(|m| m.len()).unwrap_or(0);
        info!(backup = %archive.id, records, file = %filename, "backup created");

        storage.log_create(
            EntityType::Backup,
            archive.id.key(),
            Some(filename.clone()),
            &serde_json::json!({ "file": filename, "records": records }),
        )?;

        Ok(CreatedBackup {
            id: archive.id,
            info: BackupInfo {
                filename,
                path: backup_path,
                created_at: now,
                size_bytes,
            },
            records,
        })
    }

    /// List all available backups, newest first
    pub fn list_backups(&self) -> LedgerResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir).map_err(|e| {
            LedgerError::Io(format!("Failed to read backup directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                LedgerError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(info) = parse_backup_info(&path) {
                    backups.push(info);
                }
            }
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(backups)
    }

    /// Delete all but the newest `keep` backups
    pub fn enforce_retention(&self) -> LedgerResult<Vec<PathBuf>> {
        let backups = self.list_backups()?;
        let mut deleted = Vec::new();

        for backup in backups.into_iter().skip(self.retention.keep as usize) {
            fs::remove_file(&backup.path).map_err(|e| {
                LedgerError::Io(format!("Failed to delete old backup: {}", e))
            })?;
            debug!(file = %backup.filename, "pruned backup");
            deleted.push(backup.path);
        }

        Ok(deleted)
    }

    /// Create a backup and then enforce retention policy
    pub fn create_backup_with_retention(
        &self,
        storage: &Storage,
    ) -> LedgerResult<(CreatedBackup, Vec<PathBuf>)> {
        let created = self.create_backup(storage)?;
        let deleted = self.enforce_retention()?;
        Ok((created, deleted))
    }

    pub fn backup_dir(&self) -> &PathBuf {
        &self.backup_dir
    }

    /// Get a specific backup by filename
    pub fn get_backup(&self, filename: &str) -> LedgerResult<Option<BackupInfo>> {
        let path = self.backup_dir.join(filename);
        if path.exists() {
            Ok(parse_backup_info(&path))
        } else {
            Ok(None)
        }
    }

    /// Get the most recent backup
    pub fn get_latest_backup(&self) -> LedgerResult<Option<BackupInfo>> {
        Ok(self.list_backups()?.into_iter().next())
    }

    /// Read and check an archive
    pub fn load_archive(&self, path: &Path) -> LedgerResult<BackupArchive> {
        let archive: BackupArchive = read_json_required(path)?;
        if archive.schema_version > BACKUP_SCHEMA_VERSION {
            return Err(LedgerError::Validation(format!(
                "Backup schema version {} is newer than supported version {}",
                archive.schema_version, BACKUP_SCHEMA_VERSION
            )));
        }
        Ok(archive)
    }
}

fn parse_backup_info(path: &Path) -> Option<BackupInfo> {
    let filename = path.file_name()?.to_string_lossy().to_string();

    let date_part = filename.strip_prefix("backup-")?.strip_suffix(".json")?;
    let created_at = parse_backup_timestamp(date_part)?;

    let size_bytes = fs::metadata(path).ok()?.len();

    Some(BackupInfo {
        filename,
        path: path.to_path_buf(),
        created_at,
        size_bytes,
    })
}

/// Parse `YYYYMMDD-HHMMSS` or `YYYYMMDD-HHMMSS-mmm`
fn parse_backup_timestamp(date_str: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = date_str.split('-').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let date_part = parts[0];
    let time_part = parts[1];
    let millis: u32 = match parts.get(2) {
        Some(ms) => ms.parse().ok()?,
        None => 0,
    };

    if date_part.len() != 8 || time_part.len() != 6 {
        return None;
    }

    let year: i32 = date_part.get(0..4)?.parse().ok()?;
    let month: u32 = date_part.get(4..6)?.parse().ok()?;
    let day: u32 = date_part.get(6..8)?.parse().ok()?;
    let hour: u32 = time_part.get(0..2)?.parse().ok()?;
    let minute: u32 = time_part.get(2..4)?.parse().ok()?;
    let second: u32 = time_part.get(4..6)?.parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = chrono::NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;

    Some(DateTime::from_naive_utc_and_offset(
        chrono::NaiveDateTime::new(date, time),
        Utc,
    ))
}

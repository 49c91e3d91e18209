//! Backup system for the ledger
//!
//! - `BackupManager`: writes snapshot archives and applies retention
//! - `RestoreManager`: full replace-restore from an archive
//!
//! # Backup Format
//!
//! Each backup is one JSON file `backups/backup-YYYYMMDD-HHMMSS-mmm.json`:
//! - `schemaVersion`: version for migration support
//! - `id`: backup id
//! - `createdAt`: timestamp when the backup was created
//! - `data`: every collection, as in `LedgerSnapshot`
//!
//! # Example
//!
//! ```rust,ignore
//! use family_ledger::backup::{BackupManager, RestoreManager};
//!
//! let manager = BackupManager::new(storage.paths(), settings.backup_retention.clone());
//! manager.create_backup_with_retention(&storage)?;
//!
//! let result = RestoreManager::new(&storage, &manager).restore_latest(None)?;
//! println!("{}", result.summary());
//! ```

mod manager;
mod restore;

pub use manager::{BackupArchive, BackupInfo, BackupManager, CreatedBackup, BACKUP_SCHEMA_VERSION};
pub use restore::{RestoreManager, RestoreResult};

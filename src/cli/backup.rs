//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use clap::Subcommand;
use std::path::PathBuf;

use crate::backup::{BackupManager, RestoreManager};
use crate::config::settings::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::models::Identity;
use crate::storage::Storage;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create,

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show information about a specific backup
    Info {
        /// Backup filename or path
        backup: String,
    },

    /// Delete old backups according to retention policy
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    storage: &Storage,
    settings: &Settings,
    identity: Option<&Identity>,
    cmd: BackupCommands,
) -> LedgerResult<()> {
    let retention = settings.backup_retention.clone();
    let manager = BackupManager::new(storage.paths(), retention);

    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let (created, pruned) = manager.create_backup_with_retention(storage)?;
            println!("Backup created: {}", created.info.filename);
            println!("Location: {}", created.info.path.display());
            println!("Records: {}", created.records);
            if !pruned.is_empty() {
                println!("Pruned {} old backup(s).", pruned.len());
            }
        }

        BackupCommands::List { verbose } => {
            let backups = manager.list_backups()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: ledger backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                let age = chrono::Utc::now().signed_duration_since(backup.created_at);
                let age_str = format_duration(age);

                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Size: {}\n   Age: {}\n",
                        i + 1,
                        backup.filename,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        format_size(backup.size_bytes),
                        age_str,
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {})",
                        i + 1,
                        backup.filename,
                        age_str,
                        format_size(backup.size_bytes),
                    );
                }
            }

            println!();
            println!("Total: {} backup(s)", backups.len());
        }

        BackupCommands::Restore { backup, force } => {
            // Resolved before the safety backup so 'latest' keeps its meaning
            let backup_path = resolve_backup_path(&manager, &backup)?;
            let archive = manager.load_archive(&backup_path)?;

            println!("Backup Information");
            println!("==================");
            println!("File: {}", backup_path.display());
            println!(
                "Created: {}",
                archive.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Schema version: {}", archive.schema_version);
            println!("Records: {}", archive.data.record_count());
            println!();

            if !force {
                println!("WARNING: This will replace ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  ledger backup restore {} --force", backup);
                return Ok(());
            }

            println!("Creating backup of current data before restore...");
            let pre_restore = manager.create_backup(storage)?;
            println!("Pre-restore backup saved: {}", pre_restore.info.filename);
            println!();

            println!("Restoring from backup...");
            let restore_manager = RestoreManager::new(storage, &manager);
            let result = restore_manager.restore_from_file(&backup_path, identity)?;

            println!("Restore complete!");
            println!("{}", result.summary());
            if result.users_skipped > 0 {
                println!("The signed-in user's record was kept as is.");
            }
        }

        BackupCommands::Info { backup } => {
            let backup_path = resolve_backup_path(&manager, &backup)?;
            let archive = manager.load_archive(&backup_path)?;
            let metadata = std::fs::metadata(&backup_path)?;
            let data = &archive.data;

            println!("Backup Details");
            println!("==============");
            println!("File: {}", backup_path.display());
            println!("ID: {}", archive.id);
            println!("Size: {}", format_size(metadata.len()));
            println!(
                "Created: {}",
                archive.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Schema version: {}", archive.schema_version);
            println!();
            println!("Contents:");
            for (label, count) in [
                ("Bank accounts", data.bank_accounts.len()),
                ("Cash accounts", data.cash_accounts.len()),
                ("Transactions", data.transactions.len()),
                ("Income items", data.income_items.len()),
                ("Expense items", data.expense_items.len()),
                ("Income categories", data.income_categories.len()),
                ("Expense categories", data.expense_categories.len()),
                ("Debt customers", data.debt_customers.len()),
                ("Debt transactions", data.debt_transactions.len()),
                ("Users", data.users.len()),
            ] {
                println!("  {:<20} {}", format!("{}:", label), count);
            }
        }

        BackupCommands::Prune { force } => {
            let backups = manager.list_backups()?;
            let keep = settings.backup_retention.keep as usize;
            let to_delete = backups.len().saturating_sub(keep);

            if to_delete == 0 {
                println!("No backups to prune.");
                println!(
                    "Retention policy keeps {} backup(s); you have {}.",
                    keep,
                    backups.len()
                );
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!("Retention policy: keep {}", keep);
            println!("Current backups: {}", backups.len());
            println!("To be deleted: {}", to_delete);
            println!();

            if !force {
                println!("To delete old backups, run again with --force flag:");
                println!("  ledger backup prune --force");
                return Ok(());
            }

            let deleted = manager.enforce_retention()?;
            println!("Deleted {} backup(s).", deleted.len());
        }
    }

    Ok(())
}

/// Resolve a backup identifier to a full path
fn resolve_backup_path(manager: &BackupManager, backup: &str) -> LedgerResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .get_latest_backup()?
            .map(|b| b.path)
            .ok_or_else(|| LedgerError::backup_not_found("latest"));
    }

    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    if let Some(info) = manager.get_backup(backup)? {
        return Ok(info.path);
    }
    if let Some(info) = manager.get_backup(&format!("{}.json", backup))? {
        return Ok(info.path);
    }

    Err(LedgerError::backup_not_found(backup))
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

//! Family Ledger - personal and family finance ledger
//!
//! This library keeps bank and cash account balances consistent with the
//! income, expense and transfer transactions recorded against them, tracks
//! money owed to and by customers in a separate debt subledger, and makes
//! whole-ledger backups that can be restored with fresh identifiers.
//!
//! Every account holds two independent balances, Yemeni rial (YER) and
//! Saudi riyal (SAR). Amounts are never converted between them; the
//! conversion rate in settings only feeds total-wealth views.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (accounts, transactions, items, debts, users)
//! - `storage`: JSON collection store, operation journal, change notification
//! - `services`: Ledger engine and the other business logic
//! - `audit`: Audit logging system
//! - `backup`: Backup archives and id-remapping restore
//! - `cli`, `display`: Command handlers and plain-text rendering
//!
//! # Example
//!
//! ```rust,ignore
//! use family_ledger::config::LedgerPaths;
//! use family_ledger::services::SummaryService;
//! use family_ledger::storage::Storage;
//!
//! let storage = Storage::open(LedgerPaths::new()?)?;
//! let summary = SummaryService::new(&storage).summarize(140.into())?;
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};

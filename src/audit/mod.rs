//! Audit trail of ledger writes
//!
//! Every create, update and delete is appended to `audit.log` as one JSON
//! line (`AuditEntry`) holding the before/after record and, for updates, a
//! top-level field diff produced by `generate_diff`.

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;

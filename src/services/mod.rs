//! Service layer for the ledger
//!
//! The service layer provides business logic on top of the storage layer,
//! handling validation, balance effects, and cross-entity operations.

pub mod account;
pub mod category;
pub mod debt;
pub mod ledger;
pub mod reconciliation;
pub mod summary;
pub mod user;

pub use account::{AccountService, AccountUpdate};
pub use category::CategoryService;
pub use debt::{CustomerFields, DebtService, DebtTotals};
pub use ledger::{
    DeletedEntry, LedgerService, RecordedItem, TransactionEdit, TransactionFilter, TransferInput,
};
pub use reconciliation::{BalanceDrift, ReconciliationReport, ReconciliationService};
pub use summary::{LedgerSummary, SummaryService};
pub use user::UserService;

use crate::error::{LedgerError, LedgerResult};
use crate::storage::{JsonCollection, Record};

/// Find a record by full key, bare UUID, or a unique short prefix
pub(crate) fn resolve_record<T: Record>(
    collection: &JsonCollection<T>,
    identifier: &str,
    entity_type: &'static str,
) -> LedgerResult<T> {
    let mut matches = collection.find_by_key_prefix(identifier)?;
    match matches.len() {
        0 => Err(LedgerError::NotFound {
            entity_type,
            identifier: identifier.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        n => {
            // A full key matches itself only, so ambiguity means a short prefix
            let exact = identifier.trim().to_lowercase();
            if let Some(pos) = matches.iter().position(|r| r.key() == exact) {
                return Ok(matches.remove(pos));
            }
            Err(LedgerError::Validation(format!(
                "'{}' matches {} {} records, use a longer id",
                identifier,
                n,
                entity_type.to_lowercase()
            )))
        }
    }
}

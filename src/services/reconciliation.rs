//! Reconciliation service
//!
//! Detects and repairs state left behind by interrupted ledger operations:
//! account balances that no longer equal their opening balance plus the
//! effects of their transactions, items without a mirrored transaction, and
//! transactions whose linked item is gone.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::audit::EntityType;
use crate::error::LedgerResult;
use crate::models::{
    AccountRef, Currency, Item, ItemId, ItemKind, Money, OperationId, Transaction,
};
use crate::storage::{ChangeKind, Collection, JournalEntry, Storage};

/// Service for consistency checks and repair
pub struct ReconciliationService<'a> {
    storage: &'a Storage,
}

/// A stored balance that disagrees with the transaction history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDrift {
    pub account: AccountRef,
    pub account_name: String,
    pub currency: Currency,
    pub stored: Money,
    pub expected: Money,
}

impl BalanceDrift {
    /// The delta that brings the stored balance back in line
    pub fn correction(&self) -> Money {
        self.expected - self.stored
    }
}

/// Findings of a consistency check
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    pub drifts: Vec<BalanceDrift>,
    /// Items with no mirrored transaction
    pub orphan_items: Vec<Item>,
    /// Transactions linked to an item that no longer exists
    pub dangling_transactions: Vec<Transaction>,
    /// Journaled operations that never committed
    pub pending_operations: Vec<JournalEntry>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.drifts.is_empty()
            && self.orphan_items.is_empty()
            && self.dangling_transactions.is_empty()
            && self.pending_operations.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.drifts.len() + self.orphan_items.len() + self.dangling_transactions.len()
    }
}

impl<'a> ReconciliationService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Inspect the ledger without changing it
    ///
    /// Expected balances count only the transactions a repair would keep,
    /// so applying every reported correction yields a consistent ledger.
    pub fn check(&self) -> LedgerResult<ReconciliationReport> {
        let pending_operations = self.storage.journal().pending()?;
        self.inspect(pending_operations)
    }

    /// Fix everything `check` reports and close pending journal entries
    pub fn repair(&self) -> LedgerResult<ReconciliationReport> {
        // Read the journal under the lock so a writer that is still running
        // elsewhere is not mistaken for an interrupted one
        let lock = self.storage.write_lock()?;
        let pending = self.storage.journal().pending()?;
        let pending_ids: Vec<OperationId> = pending.iter().map(|e| e.operation_id).collect();

        let op = lock.begin_operation("reconcile", Vec::new())?;
        let report = self.inspect(pending)?;

        for item in &report.orphan_items {
            warn!(item = %item.id, kind = %item.kind, "removing item without transaction");
            self.storage.items(item.kind).remove(item.id)?;
        }
        for txn in &report.dangling_transactions {
            warn!(transaction = %txn.id, "removing transaction whose item is missing");
            self.storage.transactions.remove(txn.id)?;
        }
        for drift in &report.drifts {
            warn!(
                account = %drift.account,
                currency = %drift.currency,
                stored = %drift.stored,
                expected = %drift.expected,
                "correcting balance drift"
            );
            self.storage.accounts.apply_balance_delta(
                drift.account,
                drift.currency,
                drift.correction(),
            )?;
        }
        let lock = op.commit(&Collection::DATA)?;
        self.storage.journal().resolve(&pending_ids)?;
        self.storage.journal().compact()?;
        drop(lock);

        if report.issue_count() > 0 {
            for collection in Collection::DATA {
                self.storage.publish(collection, ChangeKind::Reloaded, None);
            }
        }

        info!(
            drifts = report.drifts.len(),
            orphan_items = report.orphan_items.len(),
            dangling_transactions = report.dangling_transactions.len(),
            resolved_operations = pending_ids.len(),
            "reconciliation finished"
        );

        for item in &report.orphan_items {
            let entity = match item.kind {
                ItemKind::Income => EntityType::IncomeItem,
                ItemKind::Expense => EntityType::ExpenseItem,
            };
            self.storage
                .log_delete(entity, item.id.key(), Some(item.description.clone()), item)?;
        }
        for txn in &report.dangling_transactions {
            self.storage.log_delete(
                EntityType::Transaction,
                txn.id.key(),
                Some(txn.description.clone()),
                txn,
            )?;
        }

        Ok(report)
    }

    fn inspect(&self, pending_operations: Vec<JournalEntry>) -> LedgerResult<ReconciliationReport> {
        let transactions = self.storage.transactions.get_all()?;

        let mirrored: HashSet<(ItemKind, ItemId)> =
            transactions.iter().filter_map(|t| t.item_link()).collect();

        let mut orphan_items = Vec::new();
        for kind in [ItemKind::Income, ItemKind::Expense] {
            orphan_items.extend(
                self.storage
                    .items(kind)
                    .find(|item| !mirrored.contains(&(kind, item.id)))?,
            );
        }

        let mut dangling_transactions = Vec::new();
        let mut kept = Vec::new();
        for txn in transactions {
            let dangling = match txn.item_link() {
                Some((kind, item_id)) => !self.storage.items(kind).exists(item_id)?,
                None => false,
            };
            if dangling {
                dangling_transactions.push(txn);
            } else {
                kept.push(txn);
            }
        }

        let mut effects: HashMap<(AccountRef, Currency), Money> = HashMap::new();
        for effect in kept.iter().flat_map(|t| t.effects()) {
            *effects.entry((effect.account, effect.currency)).or_default() += effect.delta;
        }

        let mut drifts = Vec::new();
        for account in self.storage.accounts.all()? {
            let reference = account.reference();
            for currency in Currency::ALL {
                let applied = effects
                    .get(&(reference, currency))
                    .copied()
                    .unwrap_or_default();
                let expected = account.opening_balances().get(currency) + applied;
                let stored = account.balance(currency);
                if stored != expected {
                    drifts.push(BalanceDrift {
                        account: reference,
                        account_name: account.display_name(),
                        currency,
                        stored,
                        expected,
                    });
                }
            }
        }

        Ok(ReconciliationReport {
            drifts,
            orphan_items,
            dangling_transactions,
            pending_operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{AccountSpec, Balances, CategoryKind, ItemInput};
    use crate::services::{AccountService, CategoryService, LedgerService};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Storage, AccountRef, ItemInput) {
        let temp = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();

        let account = AccountService::new(&storage)
            .create(AccountSpec::Bank {
                name: "Main".into(),
                account_type: "current".into(),
                number: "1".into(),
                opening: Balances::new(Money::from_units(1000), Money::zero()),
                notes: String::new(),
            })
            .unwrap()
            .reference();
        let category = CategoryService::new(&storage)
            .create(CategoryKind::Income, "Salary", None, "")
            .unwrap();
        let input = ItemInput {
            category: category.id,
            description: "Pay".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            currency: Currency::Yer,
            amount: Money::from_units(500),
            account,
            notes: String::new(),
        };
        (temp, storage, account, input)
    }

    #[test]
    fn test_consistent_ledger_reports_nothing() {
        let (_temp, storage, _, input) = setup();
        LedgerService::new(&storage).record_income(&input).unwrap();

        let report = ReconciliationService::new(&storage).check().unwrap();
        assert!(report.is_consistent());
    }

    #[test]
    fn test_drift_detected_and_repaired() {
        let (_temp, storage, account, input) = setup();
        LedgerService::new(&storage).record_income(&input).unwrap();

        // Simulate a lost balance write
        storage
            .accounts
            .apply_balance_delta(account, Currency::Yer, Money::from_units(-500))
            .unwrap();

        let service = ReconciliationService::new(&storage);
        let report = service.check().unwrap();
        assert_eq!(report.drifts.len(), 1);
        assert_eq!(report.drifts[0].correction(), Money::from_units(500));

        service.repair().unwrap();
        let balance = storage.accounts.require(account).unwrap().balance(Currency::Yer);
        assert_eq!(balance, Money::from_units(1500));
        assert!(service.check().unwrap().is_consistent());
    }

    #[test]
    fn test_orphan_item_removed() {
        let (_temp, storage, _, input) = setup();
        let recorded = LedgerService::new(&storage).record_income(&input).unwrap();

        // Transaction write lost, item and balance kept
        storage.transactions.remove(recorded.transaction.id).unwrap();

        let service = ReconciliationService::new(&storage);
        let report = service.repair().unwrap();
        assert_eq!(report.orphan_items.len(), 1);
        assert_eq!(report.drifts.len(), 1);
        assert!(storage.income_items.is_empty().unwrap());
        assert!(service.check().unwrap().is_consistent());
    }

    #[test]
    fn test_dangling_transaction_removed_and_reversed() {
        let (_temp, storage, account, input) = setup();
        let recorded = LedgerService::new(&storage).record_income(&input).unwrap();
        storage.income_items.remove(recorded.item.id).unwrap();

        let report = ReconciliationService::new(&storage).repair().unwrap();
        assert_eq!(report.dangling_transactions.len(), 1);
        assert!(storage.transactions.is_empty().unwrap());
        let balance = storage.accounts.require(account).unwrap().balance(Currency::Yer);
        assert_eq!(balance, Money::from_units(1000));
    }

    #[test]
    fn test_open_repairs_interrupted_operation() {
        let (temp, storage, account, _) = setup();
        {
            // Crash between the balance write and the commit
            let _op = storage.begin_operation("record_income", Vec::new()).unwrap();
            storage
                .accounts
                .apply_balance_delta(account, Currency::Yer, Money::from_units(500))
                .unwrap();
            storage.accounts.save().unwrap();
        }
        drop(storage);

        let paths = LedgerPaths::with_base_dir(temp.path().to_path_buf());
        let reopened = Storage::open(paths).unwrap();

        let balance = reopened
            .accounts
            .require(account)
            .unwrap()
            .balance(Currency::Yer);
        assert_eq!(balance, Money::from_units(1000));
        assert!(reopened.journal().pending().unwrap().is_empty());
    }
}

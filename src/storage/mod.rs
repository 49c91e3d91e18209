//! Storage layer for the ledger
//!
//! One JSON file per collection under `data/`, written atomically, plus the
//! audit log, the operation journal and the change notifier. `Storage` is
//! the single store object every service works against.
//!
//! Every write runs under a `WriteLock`, which serializes writers inside
//! the process and, through `data/.lock`, across `ledger` processes. A
//! writer that finds the data changed by another process reloads its
//! collections before touching anything.

pub mod accounts;
pub mod collection;
pub mod file_io;
pub mod journal;
pub mod lock;
pub mod notify;
pub mod snapshot;

pub use accounts::AccountStore;
pub use collection::{Collection, JsonCollection, Record};
pub use file_io::{read_json, read_json_required, write_json_atomic};
pub use journal::{Journal, JournalEntry, JournalPhase};
pub use lock::{HeldLock, LockFile};
pub use notify::{ChangeEvent, ChangeKind, ChangeNotifier, SubscriptionId};
pub use snapshot::LedgerSnapshot;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, warn};

use crate::audit::{generate_diff, AuditEntry, AuditLogger, EntityType};
use crate::config::paths::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Category, CategoryKind, DebtCustomer, DebtTransaction, Item, ItemKind, OperationId,
    Transaction, User,
};

/// Main storage coordinator that provides access to all collections
pub struct Storage {
    paths: LedgerPaths,
    pub accounts: AccountStore,
    pub transactions: JsonCollection<Transaction>,
    pub income_items: JsonCollection<Item>,
    pub expense_items: JsonCollection<Item>,
    pub income_categories: JsonCollection<Category>,
    pub expense_categories: JsonCollection<Category>,
    pub debt_customers: JsonCollection<DebtCustomer>,
    pub debt_transactions: JsonCollection<DebtTransaction>,
    pub users: JsonCollection<User>,
    audit: AuditLogger,
    journal: Journal,
    notifier: ChangeNotifier,
    revision: AtomicU64,
    op_lock: Mutex<()>,
    lock_file: LockFile,
    /// Lock generation the in-memory collections reflect
    generation: AtomicU64,
}

/// Generation no lock file ever holds; forces a reload on the next write
const STALE: u64 = u64::MAX;

impl Storage {
    /// Create a storage instance without loading anything
    pub fn new(paths: LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        let file = |c: Collection| paths.collection_file(c);
        let lock_file = LockFile::new(paths.lock_file());
        let generation = lock_file.peek_generation()?;
        Ok(Self {
            accounts: AccountStore::new(&paths),
            transactions: JsonCollection::new(
                Collection::Transactions,
                file(Collection::Transactions),
            ),
            income_items: JsonCollection::new(
                Collection::IncomeItems,
                file(Collection::IncomeItems),
            ),
            expense_items: JsonCollection::new(
                Collection::ExpenseItems,
                file(Collection::ExpenseItems),
            ),
            income_categories: JsonCollection::new(
                Collection::IncomeCategories,
                file(Collection::IncomeCategories),
            ),
            expense_categories: JsonCollection::new(
                Collection::ExpenseCategories,
                file(Collection::ExpenseCategories),
            ),
            debt_customers: JsonCollection::new(
                Collection::DebtCustomers,
                file(Collection::DebtCustomers),
            ),
            debt_transactions: JsonCollection::new(
                Collection::DebtTransactions,
                file(Collection::DebtTransactions),
            ),
            users: JsonCollection::new(Collection::Users, file(Collection::Users)),
            audit: AuditLogger::new(paths.audit_log()),
            journal: Journal::new(paths.journal_file()),
            notifier: ChangeNotifier::new(),
            revision: AtomicU64::new(0),
            op_lock: Mutex::new(()),
            lock_file,
            generation: AtomicU64::new(generation),
            paths,
        })
    }

    /// Create, load every collection, and repair any interrupted operation
    pub fn open(paths: LedgerPaths) -> LedgerResult<Self> {
        let storage = Self::new(paths)?;
        storage.load_consistent()?;

        let pending = storage.journal.pending()?;
        if !pending.is_empty() {
            warn!(
                pending = pending.len(),
                "found interrupted ledger operations, reconciling"
            );
            crate::services::ReconciliationService::new(&storage).repair()?;
        }

        Ok(storage)
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Item collection for a kind
    pub fn items(&self, kind: ItemKind) -> &JsonCollection<Item> {
        match kind {
            ItemKind::Income => &self.income_items,
            ItemKind::Expense => &self.expense_items,
        }
    }

    /// Category registry for a kind
    pub fn categories(&self, kind: CategoryKind) -> &JsonCollection<Category> {
        match kind {
            CategoryKind::Income => &self.income_categories,
            CategoryKind::Expense => &self.expense_categories,
        }
    }

    /// Load all data from disk
    pub fn load_all(&self) -> LedgerResult<()> {
        for collection in Collection::DATA {
            self.load_collection(collection)?;
        }
        Ok(())
    }

    /// Load every collection under the file lock, so no writer is halfway
    /// through its files
    fn load_consistent(&self) -> LedgerResult<()> {
        let _guard = self.op_lock.lock().map_err(|e| {
            LedgerError::Persistence(format!("Failed to acquire operation lock: {}", e))
        })?;
        let held = self.lock_file.acquire()?;
        self.load_all()?;
        self.generation.store(held.generation(), Ordering::SeqCst);
        Ok(())
    }

    /// Save all data to disk as one operation
    pub fn save_all(&self) -> LedgerResult<()> {
        self.begin_operation("save_all", Vec::new())?
            .commit(&Collection::DATA)?;
        Ok(())
    }

    fn load_collection(&self, collection: Collection) -> LedgerResult<()> {
        match collection {
            Collection::BankAccounts => self.accounts.bank.load(),
            Collection::CashAccounts => self.accounts.cash.load(),
            Collection::Transactions => self.transactions.load(),
            Collection::IncomeItems => self.income_items.load(),
            Collection::ExpenseItems => self.expense_items.load(),
            Collection::IncomeCategories => self.income_categories.load(),
            Collection::ExpenseCategories => self.expense_categories.load(),
            Collection::DebtCustomers => self.debt_customers.load(),
            Collection::DebtTransactions => self.debt_transactions.load(),
            Collection::Users => self.users.load(),
            // Backup archives live as individual files, see `backup`
            Collection::Backups => Ok(()),
        }
    }

    /// Flush one collection to its file
    pub fn save_collection(&self, collection: Collection) -> LedgerResult<()> {
        match collection {
            Collection::BankAccounts => self.accounts.bank.save(),
            Collection::CashAccounts => self.accounts.cash.save(),
            Collection::Transactions => self.transactions.save(),
            Collection::IncomeItems => self.income_items.save(),
            Collection::ExpenseItems => self.expense_items.save(),
            Collection::IncomeCategories => self.income_categories.save(),
            Collection::ExpenseCategories => self.expense_categories.save(),
            Collection::DebtCustomers => self.debt_customers.save(),
            Collection::DebtTransactions => self.debt_transactions.save(),
            Collection::Users => self.users.save(),
            Collection::Backups => Ok(()),
        }
    }

    /// Re-read one collection from disk and tell its subscribers
    pub fn reload(&self, collection: Collection) -> LedgerResult<()> {
        self.load_collection(collection)?;
        self.publish(collection, ChangeKind::Reloaded, None);
        Ok(())
    }

    /// Take the write lock and bring every collection up to date
    ///
    /// Blocks while another thread or `ledger` process is writing. Checks
    /// made while holding the lock see the data the write will land on.
    /// Never call this while already holding a lock or an operation.
    pub fn write_lock(&self) -> LedgerResult<WriteLock<'_>> {
        let guard = self.op_lock.lock().map_err(|e| {
            LedgerError::Persistence(format!("Failed to acquire operation lock: {}", e))
        })?;
        let held = self.lock_file.acquire()?;

        let reloaded = held.generation() != self.generation.load(Ordering::SeqCst);
        if reloaded {
            debug!(generation = held.generation(), "data changed on disk, reloading");
            for collection in Collection::DATA {
                self.reload(collection)?;
            }
            self.generation.store(held.generation(), Ordering::SeqCst);
        }

        Ok(WriteLock {
            storage: self,
            held,
            reloaded,
            _guard: guard,
        })
    }

    /// Pick up writes made by other processes
    ///
    /// Returns whether anything was reloaded.
    pub fn refresh(&self) -> LedgerResult<bool> {
        Ok(self.write_lock()?.reloaded())
    }

    /// Start a journaled multi-write operation
    ///
    /// Shorthand for `write_lock()?.begin_operation(..)` when there is
    /// nothing to check under the lock first.
    pub fn begin_operation(&self, kind: &str, records: Vec<String>) -> LedgerResult<OperationGuard<'_>> {
        self.write_lock()?.begin_operation(kind, records)
    }

    /// Record a committed change and notify subscribers
    pub fn publish(&self, collection: Collection, kind: ChangeKind, record_id: Option<String>) -> u64 {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.notifier.notify(&ChangeEvent {
            collection,
            kind,
            record_id,
            revision,
        });
        revision
    }

    /// Callbacks may run while the write lock is held; they must not write
    pub fn subscribe<F>(&self, collection: Collection, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(collection, callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Current store revision
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Owned copy of every collection at the current revision
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            revision: self.revision(),
            bank_accounts: self.accounts.bank.get_all()?,
            cash_accounts: self.accounts.cash.get_all()?,
            transactions: self.transactions.get_all()?,
            income_items: self.income_items.get_all()?,
            expense_items: self.expense_items.get_all()?,
            income_categories: self.income_categories.get_all()?,
            expense_categories: self.expense_categories.get_all()?,
            debt_customers: self.debt_customers.get_all()?,
            debt_transactions: self.debt_transactions.get_all()?,
            users: self.users.get_all()?,
        })
    }

    /// Check if the ledger has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    pub fn log_create<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> LedgerResult<()> {
        self.audit
            .log(&AuditEntry::create(entity_type, entity_id, entity_name, entity))
    }

    pub fn log_update<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
    ) -> LedgerResult<()> {
        let diff = match (serde_json::to_value(before), serde_json::to_value(after)) {
            (Ok(b), Ok(a)) => generate_diff(&b, &a),
            _ => None,
        };
        self.audit.log(&AuditEntry::update(
            entity_type,
            entity_id,
            entity_name,
            before,
            after,
            diff,
        ))
    }

    pub fn log_delete<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> LedgerResult<()> {
        self.audit
            .log(&AuditEntry::delete(entity_type, entity_id, entity_name, entity))
    }
}

/// Exclusive right to write, held until dropped or turned into an operation
pub struct WriteLock<'a> {
    storage: &'a Storage,
    held: HeldLock,
    reloaded: bool,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> WriteLock<'a> {
    /// Whether taking the lock reloaded collections written elsewhere
    pub fn reloaded(&self) -> bool {
        self.reloaded
    }

    /// Journal the start of an operation and keep the lock inside it
    pub fn begin_operation(mut self, kind: &str, records: Vec<String>) -> LedgerResult<OperationGuard<'a>> {
        let storage = self.storage;
        let generation = self.held.advance()?;
        storage.generation.store(generation, Ordering::SeqCst);

        let id = storage.journal.begin(kind, records)?;
        debug!(operation = %id, kind, generation, "operation started");

        Ok(OperationGuard {
            storage,
            id,
            kind: kind.to_string(),
            committed: false,
            lock: Some(self),
        })
    }
}

/// An in-flight journaled operation
///
/// Dropping the guard without `commit` leaves the journal entry pending;
/// the next `Storage::open` (or `ledger reconcile`) repairs it. The
/// in-memory collections are reloaded from disk on the next write.
pub struct OperationGuard<'a> {
    storage: &'a Storage,
    id: OperationId,
    kind: String,
    committed: bool,
    lock: Option<WriteLock<'a>>,
}

impl<'a> OperationGuard<'a> {
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Flush the touched collections, then close the journal entry
    ///
    /// Hands back the write lock for follow-up work that must not
    /// interleave with another writer; dropping it releases the lock.
    pub fn commit(mut self, touched: &[Collection]) -> LedgerResult<WriteLock<'a>> {
        for collection in touched {
            self.storage.save_collection(*collection)?;
        }
        self.storage.journal.commit(self.id)?;
        self.committed = true;
        debug!(operation = %self.id, kind = %self.kind, "operation committed");

        self.lock
            .take()
            .ok_or_else(|| LedgerError::Persistence("Operation lock already released".into()))
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.storage.generation.store(STALE, Ordering::SeqCst);
            warn!(
                operation = %self.id,
                kind = %self.kind,
                "operation did not commit, left pending for reconciliation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Balances, BankAccount, DebtCustomer};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_storage_creation() {
        let (temp_dir, storage) = create_test_storage();

        assert!(temp_dir.path().join("data").exists());
        assert!(temp_dir.path().join("backups").exists());
        assert!(!storage.is_initialized());
        assert_eq!(storage.revision(), 0);
    }

    #[test]
    fn test_committed_operation_is_flushed_and_closed() {
        let (temp_dir, storage) = create_test_storage();

        let op = storage.begin_operation("create_customer", Vec::new()).unwrap();
        storage.debt_customers.upsert(DebtCustomer::new("Ali")).unwrap();
        op.commit(&[Collection::DebtCustomers]).unwrap();

        assert!(temp_dir.path().join("data/debtCustomers.json").exists());
        assert!(storage.journal().pending().unwrap().is_empty());
    }

    #[test]
    fn test_dropped_operation_stays_pending() {
        let (_temp, storage) = create_test_storage();
        {
            let _op = storage.begin_operation("record_income", Vec::new()).unwrap();
        }
        assert_eq!(storage.journal().pending().unwrap().len(), 1);
    }

    #[test]
    fn test_write_from_another_store_is_reloaded_and_published() {
        let (temp_dir, storage) = create_test_storage();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        storage.subscribe(Collection::DebtCustomers, move |event| {
            sink.lock().unwrap().push(event.kind);
        });

        let other =
            Storage::open(LedgerPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        let op = other.begin_operation("create_customer", Vec::new()).unwrap();
        other.debt_customers.upsert(DebtCustomer::new("Ali")).unwrap();
        op.commit(&[Collection::DebtCustomers]).unwrap();

        assert!(storage.debt_customers.is_empty().unwrap());
        assert!(storage.refresh().unwrap());
        let customers = storage.debt_customers.get_all().unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name, "Ali");
        assert_eq!(*seen.lock().unwrap(), vec![ChangeKind::Reloaded]);

        // Nothing new on disk
        assert!(!storage.refresh().unwrap());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_dropped_operation_discards_unsaved_changes() {
        let (_temp, storage) = create_test_storage();
        {
            let _op = storage.begin_operation("create_customer", Vec::new()).unwrap();
            storage.debt_customers.upsert(DebtCustomer::new("Ghost")).unwrap();
        }

        assert!(storage.refresh().unwrap());
        assert!(storage.debt_customers.is_empty().unwrap());
    }

    #[test]
    fn test_publish_bumps_revision_and_notifies() {
        let (_temp, storage) = create_test_storage();
        let seen = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&seen);
        storage.subscribe(Collection::Transactions, move |event| {
            sink.store(event.revision, Ordering::SeqCst);
        });

        storage.publish(Collection::BankAccounts, ChangeKind::Updated, None);
        let revision = storage.publish(Collection::Transactions, ChangeKind::Inserted, None);

        assert_eq!(revision, 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_snapshot_is_an_owned_copy() {
        let (_temp, storage) = create_test_storage();
        storage
            .accounts
            .upsert(Account::Bank(BankAccount::new(
                "Main",
                "current",
                "1",
                Balances::default(),
            )))
            .unwrap();

        let snapshot = storage.snapshot().unwrap();
        storage.accounts.bank.clear().unwrap();

        assert_eq!(snapshot.bank_accounts.len(), 1);
        assert_eq!(snapshot.record_count(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, storage) = create_test_storage();
        storage.users.upsert(User::new("a@b.c", "A", Default::default())).unwrap();
        storage.save_all().unwrap();

        let reopened =
            Storage::open(LedgerPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(reopened.users.len().unwrap(), 1);
    }
}

//! Backup restoration
//!
//! A restore is a full replace: every collection is cleared and refilled
//! from the archive. Each restored record gets a fresh id and a
//! `restoredAt` stamp, and references between records are rewritten to the
//! new ids. The signed-in user's own record is left untouched.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AccountRef, BackupId, BankAccountId, CashAccountId, CategoryId, DebtCustomerId,
    DebtTransactionId, Identity, ItemId, TransactionId, TransactionKind, UserId,
};
use crate::storage::{ChangeKind, Collection, LedgerSnapshot, Storage};

use super::manager::{BackupArchive, BackupManager};

/// Handles restoring from backups
pub struct RestoreManager<'a> {
    storage: &'a Storage,
    backups: &'a BackupManager,
}

/// Result of a restore operation
#[derive(Debug, Clone)]
pub struct RestoreResult {
    pub backup_id: BackupId,
    pub backup_file: String,
    /// Date the backup was created
    pub backup_date: DateTime<Utc>,
    pub restored_at: DateTime<Utc>,
    /// Records written per collection
    pub counts: Vec<(Collection, usize)>,
    /// Snapshot users skipped because they are the signed-in user
    pub users_skipped: usize,
}

impl RestoreResult {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .counts
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(c, n)| format!("{} {}", n, c))
            .collect();
        if parts.is_empty() {
            "Restored: nothing (backup was empty)".to_string()
        } else {
            format!("Restored: {}", parts.join(", "))
        }
    }
}

/// Old id to freshly assigned id
struct IdMap<K> {
    ids: HashMap<K, K>,
}

impl<K: Copy + Eq + Hash> IdMap<K> {
    fn new() -> Self {
        Self {
            ids: HashMap::new(),
        }
    }

    fn assign(&mut self, old: K, new: K) -> K {
        self.ids.insert(old, new);
        new
    }

    /// References to records missing from the archive are kept as-is
    fn get(&self, old: K) -> K {
        self.ids.get(&old).copied().unwrap_or(old)
    }
}

struct Remap {
    bank: IdMap<BankAccountId>,
    cash: IdMap<CashAccountId>,
    categories: IdMap<CategoryId>,
    items: IdMap<ItemId>,
    customers: IdMap<DebtCustomerId>,
}

impl Remap {
    fn account(&self, reference: AccountRef) -> AccountRef {
        match reference {
            AccountRef::Bank(id) => AccountRef::Bank(self.bank.get(id)),
            AccountRef::Cash(id) => AccountRef::Cash(self.cash.get(id)),
        }
    }
}

/// Give every record a new id and rewrite references between them
fn remap_snapshot(
    mut data: LedgerSnapshot,
    keep_user: Option<UserId>,
    now: DateTime<Utc>,
) -> (LedgerSnapshot, usize) {
    let mut remap = Remap {
        bank: IdMap::new(),
        cash: IdMap::new(),
        categories: IdMap::new(),
        items: IdMap::new(),
        customers: IdMap::new(),
    };

    for account in &mut data.bank_accounts {
        account.id = remap.bank.assign(account.id, BankAccountId::new());
        account.restored_at = Some(now);
    }
    for account in &mut data.cash_accounts {
        account.id = remap.cash.assign(account.id, CashAccountId::new());
        account.restored_at = Some(now);
    }
    for category in data
        .income_categories
        .iter_mut()
        .chain(data.expense_categories.iter_mut())
    {
        category.id = remap.categories.assign(category.id, CategoryId::new());
        category.restored_at = Some(now);
    }
    for item in data
        .income_items
        .iter_mut()
        .chain(data.expense_items.iter_mut())
    {
        item.id = remap.items.assign(item.id, ItemId::new());
        item.category = remap.categories.get(item.category);
        item.account = remap.account(item.account);
        item.restored_at = Some(now);
    }
    for txn in &mut data.transactions {
        txn.id = TransactionId::new();
        txn.item_id = txn.item_id.map(|id| remap.items.get(id));
        match &mut txn.kind {
            TransactionKind::Income {
                account, category, ..
            }
            | TransactionKind::Expense {
                account, category, ..
            } => {
                *account = remap.account(*account);
                *category = remap.categories.get(*category);
            }
            TransactionKind::Transfer {
                from_account,
                to_account,
            } => {
                *from_account = remap.account(*from_account);
                *to_account = remap.account(*to_account);
            }
        }
        txn.restored_at = Some(now);
    }
    for customer in &mut data.debt_customers {
        customer.id = remap.customers.assign(customer.id, DebtCustomerId::new());
        customer.restored_at = Some(now);
    }
    for entry in &mut data.debt_transactions {
        entry.id = DebtTransactionId::new();
        entry.customer_id = remap.customers.get(entry.customer_id);
        entry.restored_at = Some(now);
    }

    let before = data.users.len();
    data.users.retain(|u| Some(u.id) != keep_user);
    let users_skipped = before - data.users.len();
    for user in &mut data.users {
        user.id = UserId::new();
        user.restored_at = Some(now);
    }

    (data, users_skipped)
}

impl<'a> RestoreManager<'a> {
    pub fn new(storage: &'a Storage, backups: &'a BackupManager) -> Self {
        Self { storage, backups }
    }

    /// Replace the ledger with the most recent backup
    pub fn restore_latest(&self, identity: Option<&Identity>) -> LedgerResult<RestoreResult> {
        let latest = self
            .backups
            .get_latest_backup()?
            .ok_or_else(|| LedgerError::backup_not_found("latest"))?;
        self.restore_from_file(&latest.path, identity)
    }

    /// Replace the ledger with a specific backup file
    pub fn restore_from_file(
        &self,
        path: &Path,
        identity: Option<&Identity>,
    ) -> LedgerResult<RestoreResult> {
        let archive = self.backups.load_archive(path)?;
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        self.restore_archive(archive, file, identity)
    }

    fn restore_archive(
        &self,
        archive: BackupArchive,
        backup_file: String,
        identity: Option<&Identity>,
    ) -> LedgerResult<RestoreResult> {
        let now = Utc::now();
        let keep_user = identity.map(|i| i.user_id);
        let lock = self.storage.write_lock()?;
        let before_count = self.storage.snapshot()?.record_count();

        let (data, users_skipped) = remap_snapshot(archive.data, keep_user, now);
        let counts = vec![
            (Collection::BankAccounts, data.bank_accounts.len()),
            (Collection::CashAccounts, data.cash_accounts.len()),
            (Collection::Transactions, data.transactions.len()),
            (Collection::IncomeItems, data.income_items.len()),
            (Collection::ExpenseItems, data.expense_items.len()),
            (Collection::IncomeCategories, data.income_categories.len()),
            (Collection::ExpenseCategories, data.expense_categories.len()),
            (Collection::DebtCustomers, data.debt_customers.len()),
            (Collection::DebtTransactions, data.debt_transactions.len()),
            (Collection::Users, data.users.len()),
        ];

        let op = lock.begin_operation("restore", vec![archive.id.key()])?;

        let mut users = data.users;
        if let Some(current) = keep_user.map(|id| self.storage.users.get(id)).transpose()? {
            match current {
                Some(user) => users.push(user),
                None => warn!(user = ?keep_user, "signed-in user has no record to keep"),
            }
        }

        self.storage.accounts.bank.replace_all(data.bank_accounts)?;
        self.storage.accounts.cash.replace_all(data.cash_accounts)?;
        self.storage.transactions.replace_all(data.transactions)?;
        self.storage.income_items.replace_all(data.income_items)?;
        self.storage.expense_items.replace_all(data.expense_items)?;
        self.storage
            .income_categories
            .replace_all(data.income_categories)?;
        self.storage
            .expense_categories
            .replace_all(data.expense_categories)?;
        self.storage.debt_customers.replace_all(data.debt_customers)?;
        self.storage
            .debt_transactions
            .replace_all(data.debt_transactions)?;
        self.storage.users.replace_all(users)?;

        op.commit(&Collection::DATA)?;

        for collection in Collection::DATA {
            self.storage.publish(collection, ChangeKind::Reloaded, None);
        }

        let result = RestoreResult {
            backup_id: archive.id,
            backup_file,
            backup_date: archive.created_at,
            restored_at: now,
            counts,
            users_skipped,
        };

        info!(
            backup = %result.backup_id,
            records = result.total(),
            replaced = before_count,
            "ledger restored from backup"
        );

        self.storage.log_update(
            EntityType::Backup,
            result.backup_id.key(),
            Some(result.backup_file.clone()),
            &serde_json::json!({ "records": before_count }),
            &serde_json::json!({ "records": result.total(), "restoredAt": now }),
        )?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::config::settings::BackupRetention;
    use crate::models::{
        AccountSpec, Balances, CashLocation, CategoryKind, Currency, DebtStatus,
        DebtTransactionInput, DebtType, ItemInput, Money, Role,
    };
    use crate::services::{
        AccountService, CategoryService, CustomerFields, DebtService, LedgerService,
        ReconciliationService, TransferInput, UserService,
    };
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Storage, BackupManager) {
        let temp = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp.path().to_path_buf());
        let storage = Storage::new(paths.clone()).unwrap();
        let manager = BackupManager::new(&paths, BackupRetention::default());
        (temp, storage, manager)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn populate(storage: &Storage) {
        let accounts = AccountService::new(storage);
        let main = accounts
            .create(AccountSpec::Bank {
                name: "Main".into(),
                account_type: "current".into(),
                number: "1".into(),
                opening: Balances::new(Money::from_units(1000), Money::zero()),
                notes: String::new(),
            })
            .unwrap()
            .reference();
        let cash = accounts
            .create(AccountSpec::Cash {
                location: CashLocation::Me,
                other_location: None,
                opening: Balances::default(),
                notes: String::new(),
            })
            .unwrap()
            .reference();
        let food = CategoryService::new(storage)
            .create(CategoryKind::Expense, "Food", None, "")
            .unwrap();

        let ledger = LedgerService::new(storage);
        ledger
            .record_expense(&ItemInput {
                category: food.id,
                description: "Groceries".into(),
                date: date(),
                currency: Currency::Yer,
                amount: Money::from_units(200),
                account: main,
                notes: String::new(),
            })
            .unwrap();
        ledger
            .record_transfer(&TransferInput {
                description: "Withdraw".into(),
                date: date(),
                currency: Currency::Yer,
                amount: Money::from_units(300),
                from_account: main,
                to_account: cash,
                notes: String::new(),
            })
            .unwrap();

        let debts = DebtService::new(storage);
        let customer = debts
            .create_customer(&CustomerFields {
                name: Some("X".into()),
                ..Default::default()
            })
            .unwrap();
        debts
            .record(
                customer.id,
                &DebtTransactionInput {
                    debt_type: DebtType::Owed,
                    description: "loan".into(),
                    date: date(),
                    currency: Currency::Yer,
                    amount: Money::from_units(1000),
                    due_date: None,
                    status: DebtStatus::Pending,
                    notes: String::new(),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_restore_without_backup_is_not_found() {
        let (_temp, storage, manager) = setup();
        let err = RestoreManager::new(&storage, &manager)
            .restore_latest(None)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_round_trip_remaps_ids_and_keeps_links() {
        let (_temp, storage, manager) = setup();
        populate(&storage);
        let before = storage.snapshot().unwrap();
        manager.create_backup(&storage).unwrap();

        // Diverge after the backup
        storage.debt_transactions.clear().unwrap();
        storage.accounts.bank.clear().unwrap();

        let result = RestoreManager::new(&storage, &manager)
            .restore_latest(None)
            .unwrap();
        assert_eq!(result.total(), before.record_count());

        let after = storage.snapshot().unwrap();
        assert_eq!(after.bank_accounts.len(), 1);
        assert_ne!(after.bank_accounts[0].id, before.bank_accounts[0].id);
        assert!(after.bank_accounts[0].restored_at.is_some());
        assert_eq!(
            after.bank_accounts[0].balances.yer,
            before.bank_accounts[0].balances.yer
        );

        // Every reference points at a restored record
        let main = after.bank_accounts[0].reference();
        let cash = after.cash_accounts[0].reference();
        let item = &after.expense_items[0];
        assert_eq!(item.account, main);
        assert_eq!(item.category, after.expense_categories[0].id);
        assert!(after
            .transactions
            .iter()
            .any(|t| t.item_id == Some(item.id)));
        assert!(after
            .transactions
            .iter()
            .any(|t| t.touches(main) && t.touches(cash)));
        assert_eq!(
            after.debt_transactions[0].customer_id,
            after.debt_customers[0].id
        );

        assert!(ReconciliationService::new(&storage)
            .check()
            .unwrap()
            .is_consistent());
        let balance = DebtService::new(&storage)
            .customer_balance(after.debt_customers[0].id)
            .unwrap();
        assert_eq!(balance.net, Money::from_units(1000));
    }

    #[test]
    fn test_signed_in_user_is_kept() {
        let (_temp, storage, manager) = setup();
        let users = UserService::new(&storage);
        let me = users.create("me@home", "Me", Role::Admin).unwrap();
        users.create("other@home", "Other", Role::User).unwrap();
        manager.create_backup(&storage).unwrap();

        let result = RestoreManager::new(&storage, &manager)
            .restore_latest(Some(&me.identity()))
            .unwrap();
        assert_eq!(result.users_skipped, 1);

        let restored = users.list().unwrap();
        assert_eq!(restored.len(), 2);
        let kept = users.get(me.id).unwrap().unwrap();
        assert!(kept.restored_at.is_none());
        let other = users.get_by_email("other@home").unwrap().unwrap();
        assert!(other.restored_at.is_some());
    }
}

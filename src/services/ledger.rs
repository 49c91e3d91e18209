//! Ledger service
//!
//! Turns income, expense and transfer operations into balance deltas plus
//! transaction and item records, and applies the exact inverse on edit and
//! delete. Every operation runs inside a journaled `OperationGuard`, so an
//! interrupted one is detected and repaired by reconciliation. Checks run
//! under the same write lock as the writes, and a change that would
//! overflow a balance is refused before anything is written.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AccountRef, BalanceEffect, CategoryId, Currency, Item, ItemId, ItemInput, ItemKind, Money,
    Transaction, TransactionId, TransactionKind, TransactionType,
};
use crate::storage::{AccountStore, ChangeKind, Collection, Storage, WriteLock};

use super::resolve_record;

/// Service applying ledger operations
pub struct LedgerService<'a> {
    storage: &'a Storage,
}

/// Input for a transfer between two accounts
#[derive(Debug, Clone)]
pub struct TransferInput {
    pub description: String,
    pub date: NaiveDate,
    pub currency: Currency,
    pub amount: Money,
    pub from_account: AccountRef,
    pub to_account: AccountRef,
    pub notes: String,
}

/// Field changes for an existing transaction; `None` keeps the old value
#[derive(Debug, Clone, Default)]
pub struct TransactionEdit {
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub currency: Option<Currency>,
    pub amount: Option<Money>,
    pub notes: Option<String>,
    /// Income/expense only
    pub account: Option<AccountRef>,
    /// Income/expense only; refreshes the category name snapshot
    pub category: Option<CategoryId>,
    /// Transfer only
    pub from_account: Option<AccountRef>,
    /// Transfer only
    pub to_account: Option<AccountRef>,
}

/// An item together with its mirrored transaction
#[derive(Debug, Clone)]
pub struct RecordedItem {
    pub item: Item,
    pub transaction: Transaction,
}

/// What a delete removed
#[derive(Debug, Clone)]
pub struct DeletedEntry {
    pub transaction: Option<Transaction>,
    pub item: Option<Item>,
}

/// Criteria for listing transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub account: Option<AccountRef>,
    pub currency: Option<Currency>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn matches(&self, txn: &Transaction) -> bool {
        self.transaction_type
            .map_or(true, |t| txn.transaction_type() == t)
            && self.account.map_or(true, |a| txn.touches(a))
            && self.currency.map_or(true, |c| txn.currency == c)
            && self.from.map_or(true, |from| txn.date >= from)
            && self.to.map_or(true, |to| txn.date <= to)
    }
}

fn item_collection(kind: ItemKind) -> Collection {
    match kind {
        ItemKind::Income => Collection::IncomeItems,
        ItemKind::Expense => Collection::ExpenseItems,
    }
}

fn item_entity(kind: ItemKind) -> EntityType {
    match kind {
        ItemKind::Income => EntityType::IncomeItem,
        ItemKind::Expense => EntityType::ExpenseItem,
    }
}

fn entry_kind(
    kind: ItemKind,
    account: AccountRef,
    category: CategoryId,
    category_name: String,
) -> TransactionKind {
    match kind {
        ItemKind::Income => TransactionKind::Income {
            account,
            category,
            category_name,
        },
        ItemKind::Expense => TransactionKind::Expense {
            account,
            category,
            category_name,
        },
    }
}

fn entry_item_kind(txn: &Transaction) -> Option<ItemKind> {
    match txn.kind {
        TransactionKind::Income { .. } => Some(ItemKind::Income),
        TransactionKind::Expense { .. } => Some(ItemKind::Expense),
        TransactionKind::Transfer { .. } => None,
    }
}

/// Collections a write set touches, without duplicates
fn touched(accounts: &[AccountRef], extra: &[Collection]) -> Vec<Collection> {
    let mut collections: Vec<Collection> = extra.to_vec();
    for account in accounts {
        let collection = AccountStore::collection_of(*account);
        if !collections.contains(&collection) {
            collections.push(collection);
        }
    }
    collections
}

fn validation(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Validation(e.to_string())
}

impl<'a> LedgerService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // === Recording ===

    /// Record an income item and its mirrored transaction
    pub fn record_income(&self, input: &ItemInput) -> LedgerResult<RecordedItem> {
        self.record_item(ItemKind::Income, input)
    }

    /// Record an expense item and its mirrored transaction
    pub fn record_expense(&self, input: &ItemInput) -> LedgerResult<RecordedItem> {
        self.record_item(ItemKind::Expense, input)
    }

    /// Create the item, the mirrored transaction and the balance delta
    pub fn record_item(&self, kind: ItemKind, input: &ItemInput) -> LedgerResult<RecordedItem> {
        let lock = self.storage.write_lock()?;
        let category_name = self.validate_entry(kind, input)?;

        let item = Item::from_input(kind, input, category_name.clone());
        let mut transaction = Transaction::new(
            entry_kind(kind, input.account, input.category, category_name),
            item.description.clone(),
            input.date,
            input.currency,
            input.amount,
        );
        transaction.notes = input.notes.clone();
        transaction.item_id = Some(item.id);
        transaction.validate().map_err(validation)?;
        self.storage.accounts.check_effects(&transaction.effects())?;

        let op = lock.begin_operation(
            &format!("record_{}", kind),
            vec![item.id.key(), transaction.id.key(), input.account.key()],
        )?;
        self.storage.items(kind).upsert(item.clone())?;
        self.storage.transactions.upsert(transaction.clone())?;
        self.apply_effects(&transaction.effects())?;
        op.commit(&touched(
            &[input.account],
            &[item_collection(kind), Collection::Transactions],
        ))?;

        self.publish_accounts(&[input.account]);
        self.storage
            .publish(item_collection(kind), ChangeKind::Inserted, Some(item.id.key()));
        self.storage.publish(
            Collection::Transactions,
            ChangeKind::Inserted,
            Some(transaction.id.key()),
        );

        info!(
            item = %item.id,
            transaction = %transaction.id,
            account = %input.account,
            currency = %input.currency,
            amount = %input.amount,
            "{} recorded",
            kind
        );

        self.storage.log_create(
            item_entity(kind),
            item.id.key(),
            Some(item.description.clone()),
            &item,
        )?;
        self.storage.log_create(
            EntityType::Transaction,
            transaction.id.key(),
            Some(transaction.description.clone()),
            &transaction,
        )?;

        Ok(RecordedItem { item, transaction })
    }

    /// Record an ad hoc income/expense transaction with no item behind it
    pub fn record_entry(&self, kind: ItemKind, input: &ItemInput) -> LedgerResult<Transaction> {
        let lock = self.storage.write_lock()?;
        let category_name = self.validate_entry(kind, input)?;

        let mut transaction = Transaction::new(
            entry_kind(kind, input.account, input.category, category_name),
            input.description.trim(),
            input.date,
            input.currency,
            input.amount,
        );
        transaction.notes = input.notes.clone();
        transaction.validate().map_err(validation)?;

        self.write_new_transaction(lock, &format!("record_{}_entry", kind), transaction)
    }

    /// Move money between two accounts
    pub fn record_transfer(&self, input: &TransferInput) -> LedgerResult<Transaction> {
        let mut transaction = Transaction::new(
            TransactionKind::Transfer {
                from_account: input.from_account,
                to_account: input.to_account,
            },
            input.description.trim(),
            input.date,
            input.currency,
            input.amount,
        );
        transaction.notes = input.notes.clone();
        transaction.validate().map_err(validation)?;

        let lock = self.storage.write_lock()?;
        self.storage.accounts.require(input.from_account)?;
        self.storage.accounts.require(input.to_account)?;

        self.write_new_transaction(lock, "record_transfer", transaction)
    }

    fn write_new_transaction(
        &self,
        lock: WriteLock<'_>,
        kind: &str,
        transaction: Transaction,
    ) -> LedgerResult<Transaction> {
        self.storage.accounts.check_effects(&transaction.effects())?;

        let accounts = transaction.kind.accounts();
        let mut records = vec![transaction.id.key()];
        records.extend(accounts.iter().map(|a| a.key()));

        let op = lock.begin_operation(kind, records)?;
        self.storage.transactions.upsert(transaction.clone())?;
        self.apply_effects(&transaction.effects())?;
        op.commit(&touched(&accounts, &[Collection::Transactions]))?;

        self.publish_accounts(&accounts);
        self.storage.publish(
            Collection::Transactions,
            ChangeKind::Inserted,
            Some(transaction.id.key()),
        );

        info!(
            transaction = %transaction.id,
            r#type = %transaction.transaction_type(),
            currency = %transaction.currency,
            amount = %transaction.amount,
            "transaction recorded"
        );

        self.storage.log_create(
            EntityType::Transaction,
            transaction.id.key(),
            Some(transaction.description.clone()),
            &transaction,
        )?;

        Ok(transaction)
    }

    // === Editing ===

    /// Edit a transaction: reverse its old effect, then apply the new one
    ///
    /// A linked item is kept in sync with the edited fields.
    pub fn edit_transaction(
        &self,
        id: TransactionId,
        edit: &TransactionEdit,
    ) -> LedgerResult<Transaction> {
        let lock = self.storage.write_lock()?;
        let before = self
            .storage
            .transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

        let new_category_name = match (edit.category, entry_item_kind(&before)) {
            (Some(category), Some(kind)) => Some(self.category_name(kind, category)?),
            (Some(_), None) => {
                return Err(LedgerError::Validation(
                    "Transfers have no category".into(),
                ))
            }
            (None, _) => None,
        };

        let mut after = before.clone();
        if let Some(description) = &edit.description {
            after.description = description.trim().to_string();
        }
        if let Some(date) = edit.date {
            after.date = date;
        }
        if let Some(currency) = edit.currency {
            after.currency = currency;
        }
        if let Some(amount) = edit.amount {
            after.amount = amount;
        }
        if let Some(notes) = &edit.notes {
            after.notes.clone_from(notes);
        }

        match &mut after.kind {
            TransactionKind::Income {
                account,
                category,
                category_name,
            }
            | TransactionKind::Expense {
                account,
                category,
                category_name,
            } => {
                if edit.from_account.is_some() || edit.to_account.is_some() {
                    return Err(LedgerError::Validation(
                        "fromAccount/toAccount only apply to transfers".into(),
                    ));
                }
                if let Some(new_account) = edit.account {
                    *account = new_account;
                }
                if let (Some(new_category), Some(name)) = (edit.category, new_category_name) {
                    *category = new_category;
                    *category_name = name;
                }
            }
            TransactionKind::Transfer {
                from_account,
                to_account,
            } => {
                if edit.account.is_some() {
                    return Err(LedgerError::Validation(
                        "Use fromAccount/toAccount to edit a transfer".into(),
                    ));
                }
                if let Some(from) = edit.from_account {
                    *from_account = from;
                }
                if let Some(to) = edit.to_account {
                    *to_account = to;
                }
            }
        }

        after.validate().map_err(validation)?;
        for account in after.kind.accounts() {
            self.storage.accounts.require(account)?;
        }

        let (transaction, _) = self.commit_edit(lock, before, after)?;
        Ok(transaction)
    }

    /// Edit an item and its mirrored transaction as one unit
    pub fn edit_item(
        &self,
        kind: ItemKind,
        id: ItemId,
        input: &ItemInput,
    ) -> LedgerResult<RecordedItem> {
        let lock = self.storage.write_lock()?;
        self.storage
            .items(kind)
            .get(id)?
            .ok_or_else(|| LedgerError::item_not_found(id.to_string()))?;

        let before = self.mirrored_transaction(kind, id)?.ok_or_else(|| {
            LedgerError::transaction_not_found(format!(
                "mirror of {} (run `ledger reconcile`)",
                id
            ))
        })?;

        let category_name = self.validate_entry(kind, input)?;
        let mut after = before.clone();
        after.kind = entry_kind(kind, input.account, input.category, category_name);
        after.description = input.description.trim().to_string();
        after.date = input.date;
        after.currency = input.currency;
        after.amount = input.amount;
        after.notes = input.notes.clone();
        after.validate().map_err(validation)?;

        let (transaction, item) = self.commit_edit(lock, before, after)?;
        let item = item.ok_or_else(|| LedgerError::item_not_found(id.to_string()))?;
        Ok(RecordedItem { item, transaction })
    }

    fn commit_edit(
        &self,
        lock: WriteLock<'_>,
        before: Transaction,
        mut after: Transaction,
    ) -> LedgerResult<(Transaction, Option<Item>)> {
        after.updated_at = Utc::now();

        let mut effects: Vec<BalanceEffect> = before
            .effects()
            .into_iter()
            .map(|effect| effect.reversed())
            .collect();
        effects.extend(after.effects());
        self.storage.accounts.check_effects(&effects)?;

        let linked = match after.item_link() {
            Some((kind, item_id)) => self
                .storage
                .items(kind)
                .get(item_id)?
                .map(|item| (kind, item)),
            None => None,
        };
        let item_before = linked.as_ref().map(|(_, item)| item.clone());
        let linked = linked.map(|(kind, mut item)| {
            sync_item(&mut item, &after);
            (kind, item)
        });

        let mut accounts = before.kind.accounts();
        for account in after.kind.accounts() {
            if !accounts.contains(&account) {
                accounts.push(account);
            }
        }

        let mut records = vec![after.id.key()];
        records.extend(linked.iter().map(|(_, item)| item.id.key()));
        records.extend(accounts.iter().map(|a| a.key()));

        let mut extra = vec![Collection::Transactions];
        extra.extend(linked.iter().map(|(kind, _)| item_collection(*kind)));

        let op = lock.begin_operation("edit_transaction", records)?;
        self.reverse_effects(&before)?;
        self.apply_effects(&after.effects())?;
        self.storage.transactions.upsert(after.clone())?;
        if let Some((kind, item)) = &linked {
            self.storage.items(*kind).upsert(item.clone())?;
        }
        op.commit(&touched(&accounts, &extra))?;

        self.publish_accounts(&accounts);
        self.storage
            .publish(Collection::Transactions, ChangeKind::Updated, Some(after.id.key()));
        if let Some((kind, item)) = &linked {
            self.storage
                .publish(item_collection(*kind), ChangeKind::Updated, Some(item.id.key()));
        }

        info!(
            transaction = %after.id,
            old_amount = %before.amount,
            new_amount = %after.amount,
            "transaction edited"
        );

        self.storage.log_update(
            EntityType::Transaction,
            after.id.key(),
            Some(after.description.clone()),
            &before,
            &after,
        )?;
        if let (Some((kind, item)), Some(item_before)) = (&linked, &item_before) {
            self.storage.log_update(
                item_entity(*kind),
                item.id.key(),
                Some(item.description.clone()),
                item_before,
                item,
            )?;
        }

        Ok((after, linked.map(|(_, item)| item)))
    }

    // === Deleting ===

    /// Reverse a transaction's effect and remove it with its linked item
    pub fn delete_transaction(&self, id: TransactionId) -> LedgerResult<DeletedEntry> {
        let lock = self.storage.write_lock()?;
        self.delete_transaction_locked(lock, id)
    }

    fn delete_transaction_locked(
        &self,
        lock: WriteLock<'_>,
        id: TransactionId,
    ) -> LedgerResult<DeletedEntry> {
        let transaction = self
            .storage
            .transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

        let reversal: Vec<BalanceEffect> = transaction
            .effects()
            .into_iter()
            .map(|effect| effect.reversed())
            .collect();
        self.storage.accounts.check_effects(&reversal)?;

        let accounts = transaction.kind.accounts();
        let link = transaction.item_link();

        let mut records = vec![transaction.id.key()];
        records.extend(link.iter().map(|(_, item_id)| item_id.key()));
        records.extend(accounts.iter().map(|a| a.key()));

        let mut extra = vec![Collection::Transactions];
        extra.extend(link.iter().map(|(kind, _)| item_collection(*kind)));

        let op = lock.begin_operation("delete_transaction", records)?;
        self.reverse_effects(&transaction)?;
        self.storage.transactions.remove(id)?;
        let item = match link {
            Some((kind, item_id)) => self.storage.items(kind).remove(item_id)?,
            None => None,
        };
        op.commit(&touched(&accounts, &extra))?;

        self.publish_accounts(&accounts);
        self.storage
            .publish(Collection::Transactions, ChangeKind::Removed, Some(id.key()));
        if let Some(item) = &item {
            self.storage
                .publish(item_collection(item.kind), ChangeKind::Removed, Some(item.id.key()));
        }

        info!(transaction = %id, "transaction deleted");

        self.storage.log_delete(
            EntityType::Transaction,
            id.key(),
            Some(transaction.description.clone()),
            &transaction,
        )?;
        if let Some(item) = &item {
            self.storage.log_delete(
                item_entity(item.kind),
                item.id.key(),
                Some(item.description.clone()),
                item,
            )?;
        }

        Ok(DeletedEntry {
            transaction: Some(transaction),
            item,
        })
    }

    /// Delete an item together with its mirrored transaction
    pub fn delete_item(&self, kind: ItemKind, id: ItemId) -> LedgerResult<DeletedEntry> {
        let lock = self.storage.write_lock()?;
        let item = self
            .storage
            .items(kind)
            .get(id)?
            .ok_or_else(|| LedgerError::item_not_found(id.to_string()))?;

        if let Some(transaction) = self.mirrored_transaction(kind, id)? {
            return self.delete_transaction_locked(lock, transaction.id);
        }

        // Orphan: nothing was applied to balances through it
        warn!(item = %id, "item has no mirrored transaction, removing item only");
        let op = lock.begin_operation("delete_item", vec![id.key()])?;
        self.storage.items(kind).remove(id)?;
        op.commit(&[item_collection(kind)])?;

        self.storage
            .publish(item_collection(kind), ChangeKind::Removed, Some(id.key()));
        self.storage.log_delete(
            item_entity(kind),
            id.key(),
            Some(item.description.clone()),
            &item,
        )?;

        Ok(DeletedEntry {
            transaction: None,
            item: Some(item),
        })
    }

    // === Queries ===

    pub fn get_transaction(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        self.storage.transactions.get(id)
    }

    /// Resolve a full or short transaction id
    pub fn resolve_transaction(&self, identifier: &str) -> LedgerResult<Transaction> {
        resolve_record(&self.storage.transactions, identifier, "Transaction")
    }

    pub fn get_item(&self, kind: ItemKind, id: ItemId) -> LedgerResult<Option<Item>> {
        self.storage.items(kind).get(id)
    }

    /// Resolve a full or short item id
    pub fn resolve_item(&self, kind: ItemKind, identifier: &str) -> LedgerResult<Item> {
        resolve_record(self.storage.items(kind), identifier, "Item")
    }

    /// Items of a kind, newest first
    pub fn list_items(&self, kind: ItemKind) -> LedgerResult<Vec<Item>> {
        let mut items = self.storage.items(kind).get_all()?;
        items.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(items)
    }

    /// Transactions matching a filter, newest first
    pub fn list_transactions(&self, filter: &TransactionFilter) -> LedgerResult<Vec<Transaction>> {
        let mut transactions = self.storage.transactions.find(|t| filter.matches(t))?;
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        if let Some(limit) = filter.limit {
            transactions.truncate(limit);
        }
        Ok(transactions)
    }

    /// The transaction mirroring an item, if it exists
    pub fn mirrored_transaction(
        &self,
        kind: ItemKind,
        item_id: ItemId,
    ) -> LedgerResult<Option<Transaction>> {
        Ok(self
            .storage
            .transactions
            .find(|t| t.item_link() == Some((kind, item_id)))?
            .into_iter()
            .next())
    }

    // === Internals ===

    /// Check an income/expense input and return the category name snapshot
    fn validate_entry(&self, kind: ItemKind, input: &ItemInput) -> LedgerResult<String> {
        if input.description.trim().is_empty() {
            return Err(LedgerError::Validation("Description is required".into()));
        }
        if !input.amount.is_positive() {
            return Err(LedgerError::Validation(format!(
                "Amount must be greater than zero (got {})",
                input.amount
            )));
        }
        self.storage.accounts.require(input.account)?;
        self.category_name(kind, input.category)
    }

    fn category_name(&self, kind: ItemKind, category: CategoryId) -> LedgerResult<String> {
        self.storage
            .categories(kind.category_kind())
            .get(category)?
            .map(|c| c.name)
            .ok_or_else(|| LedgerError::category_not_found(category.to_string()))
    }

    fn apply_effects(&self, effects: &[BalanceEffect]) -> LedgerResult<()> {
        for effect in effects {
            self.storage
                .accounts
                .apply_balance_delta(effect.account, effect.currency, effect.delta)?;
            debug!(
                account = %effect.account,
                currency = %effect.currency,
                delta = %effect.delta,
                "balance delta applied"
            );
        }
        Ok(())
    }

    /// Undo a transaction's effects on accounts that still exist
    fn reverse_effects(&self, transaction: &Transaction) -> LedgerResult<()> {
        for effect in transaction.effects() {
            if !self.storage.accounts.exists(effect.account)? {
                warn!(
                    account = %effect.account,
                    transaction = %transaction.id,
                    "account no longer exists, skipping reversal"
                );
                continue;
            }
            self.apply_effects(&[effect.reversed()])?;
        }
        Ok(())
    }

    fn publish_accounts(&self, accounts: &[AccountRef]) {
        for account in accounts {
            self.storage.publish(
                AccountStore::collection_of(*account),
                ChangeKind::Updated,
                Some(account.key()),
            );
        }
    }
}

/// Copy the mirrored fields of a transaction onto its item
fn sync_item(item: &mut Item, transaction: &Transaction) {
    if let TransactionKind::Income {
        account,
        category,
        category_name,
    }
    | TransactionKind::Expense {
        account,
        category,
        category_name,
    } = &transaction.kind
    {
        item.account = *account;
        item.category = *category;
        item.category_name.clone_from(category_name);
    }
    item.description.clone_from(&transaction.description);
    item.date = transaction.date;
    item.currency = transaction.currency;
    item.amount = transaction.amount;
    item.notes.clone_from(&transaction.notes);
    item.updated_at = transaction.updated_at;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{
        Account, AccountSpec, Balances, CashLocation, Category, CategoryKind,
    };
    use crate::services::{AccountService, CategoryService, ReconciliationService};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        storage: Storage,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let paths = LedgerPaths::with_base_dir(temp.path().to_path_buf());
            let storage = Storage::new(paths).unwrap();
            Self {
                _temp: temp,
                storage,
            }
        }

        fn bank(&self, name: &str, yer: i64) -> AccountRef {
            AccountService::new(&self.storage)
                .create(AccountSpec::Bank {
                    name: name.into(),
                    account_type: "current".into(),
                    number: "001".into(),
                    opening: Balances::new(Money::from_units(yer), Money::zero()),
                    notes: String::new(),
                })
                .unwrap()
                .reference()
        }

        fn cash(&self) -> AccountRef {
            AccountService::new(&self.storage)
                .create(AccountSpec::Cash {
                    location: CashLocation::Me,
                    other_location: None,
                    opening: Balances::default(),
                    notes: String::new(),
                })
                .unwrap()
                .reference()
        }

        fn category(&self, kind: CategoryKind, name: &str) -> Category {
            CategoryService::new(&self.storage)
                .create(kind, name, None, "")
                .unwrap()
        }

        fn balance(&self, account: AccountRef, currency: Currency) -> Money {
            self.storage
                .accounts
                .require(account)
                .unwrap()
                .balance(currency)
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn input(
        account: AccountRef,
        category: &Category,
        amount: i64,
        currency: Currency,
    ) -> ItemInput {
        ItemInput {
            category: category.id,
            description: format!("{} entry", category.name),
            date: date(1),
            currency,
            amount: Money::from_units(amount),
            account,
            notes: String::new(),
        }
    }

    #[test]
    fn test_income_expense_transfer_delete_scenario() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 1000);
        let cash = fx.cash();
        let salary = fx.category(CategoryKind::Income, "Salary");
        let food = fx.category(CategoryKind::Expense, "Food");

        ledger
            .record_income(&input(main, &salary, 500, Currency::Yer))
            .unwrap();
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(1500));

        let expense = ledger
            .record_expense(&input(main, &food, 200, Currency::Yer))
            .unwrap();
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(1300));

        ledger
            .record_transfer(&TransferInput {
                description: "Withdraw".into(),
                date: date(2),
                currency: Currency::Yer,
                amount: Money::from_units(300),
                from_account: main,
                to_account: cash,
                notes: String::new(),
            })
            .unwrap();
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(1000));
        assert_eq!(fx.balance(cash, Currency::Yer), Money::from_units(300));

        ledger
            .delete_item(ItemKind::Expense, expense.item.id)
            .unwrap();
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(1500));
        assert!(fx.storage.expense_items.is_empty().unwrap());
        assert!(ledger
            .get_transaction(expense.transaction.id)
            .unwrap()
            .is_none());
        assert!(fx.storage.journal().pending().unwrap().is_empty());
    }

    #[test]
    fn test_item_mirrors_transaction() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 0);
        let salary = fx.category(CategoryKind::Income, "Salary");

        let recorded = ledger
            .record_income(&input(main, &salary, 500, Currency::Sar))
            .unwrap();

        assert_eq!(
            recorded.transaction.item_link(),
            Some((ItemKind::Income, recorded.item.id))
        );
        assert_eq!(recorded.transaction.category_name(), Some("Salary"));
        assert_eq!(fx.balance(main, Currency::Sar), Money::from_units(500));
        assert_eq!(fx.balance(main, Currency::Yer), Money::zero());
    }

    #[test]
    fn test_validation_happens_before_any_write() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 1000);
        let food = fx.category(CategoryKind::Expense, "Food");

        let mut bad = input(main, &food, 0, Currency::Yer);
        assert!(ledger.record_expense(&bad).unwrap_err().is_validation());

        bad.amount = Money::from_units(-5);
        assert!(ledger.record_expense(&bad).unwrap_err().is_validation());

        bad.amount = Money::from_units(5);
        bad.description = " ".into();
        assert!(ledger.record_expense(&bad).unwrap_err().is_validation());

        // Income category is not in the expense registry
        let salary = fx.category(CategoryKind::Income, "Salary");
        let wrong_registry = input(main, &salary, 5, Currency::Yer);
        assert!(ledger
            .record_expense(&wrong_registry)
            .unwrap_err()
            .is_not_found());

        assert!(fx.storage.transactions.is_empty().unwrap());
        assert!(fx.storage.expense_items.is_empty().unwrap());
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(1000));
    }

    #[test]
    fn test_transfer_to_same_account_rejected() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 1000);

        let err = ledger
            .record_transfer(&TransferInput {
                description: "Loop".into(),
                date: date(1),
                currency: Currency::Yer,
                amount: Money::from_units(10),
                from_account: main,
                to_account: main,
                notes: String::new(),
            })
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(1000));
    }

    #[test]
    fn test_edit_moves_effect_between_accounts_and_currencies() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let a = fx.bank("A", 1000);
        let b = fx.bank("B", 0);
        let food = fx.category(CategoryKind::Expense, "Food");

        let recorded = ledger
            .record_expense(&input(a, &food, 200, Currency::Yer))
            .unwrap();
        assert_eq!(fx.balance(a, Currency::Yer), Money::from_units(800));

        let edited = ledger
            .edit_item(
                ItemKind::Expense,
                recorded.item.id,
                &input(b, &food, 50, Currency::Sar),
            )
            .unwrap();

        assert_eq!(fx.balance(a, Currency::Yer), Money::from_units(1000));
        assert_eq!(fx.balance(b, Currency::Sar), Money::from_units(-50));
        assert_eq!(edited.item.amount, Money::from_units(50));
        assert_eq!(edited.transaction.id, recorded.transaction.id);
        assert_eq!(edited.item.id, recorded.item.id);
    }

    #[test]
    fn test_edit_same_account_nets_difference() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 1000);
        let salary = fx.category(CategoryKind::Income, "Salary");

        let recorded = ledger
            .record_income(&input(main, &salary, 500, Currency::Yer))
            .unwrap();

        ledger
            .edit_transaction(
                recorded.transaction.id,
                &TransactionEdit {
                    amount: Some(Money::from_units(700)),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(1700));
        let item = ledger
            .get_item(ItemKind::Income, recorded.item.id)
            .unwrap()
            .unwrap();
        assert_eq!(item.amount, Money::from_units(700));
    }

    #[test]
    fn test_edit_transfer_endpoints() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 1000);
        let other = fx.bank("Other", 0);
        let cash = fx.cash();

        let transfer = ledger
            .record_transfer(&TransferInput {
                description: "Move".into(),
                date: date(1),
                currency: Currency::Yer,
                amount: Money::from_units(300),
                from_account: main,
                to_account: cash,
                notes: String::new(),
            })
            .unwrap();

        ledger
            .edit_transaction(
                transfer.id,
                &TransactionEdit {
                    to_account: Some(other),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(700));
        assert_eq!(fx.balance(cash, Currency::Yer), Money::zero());
        assert_eq!(fx.balance(other, Currency::Yer), Money::from_units(300));

        let err = ledger
            .edit_transaction(
                transfer.id,
                &TransactionEdit {
                    to_account: Some(main),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_category_rename_keeps_snapshot() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 0);
        let food = fx.category(CategoryKind::Expense, "Food");

        let recorded = ledger
            .record_expense(&input(main, &food, 10, Currency::Yer))
            .unwrap();
        CategoryService::new(&fx.storage)
            .update(CategoryKind::Expense, food.id, Some("Groceries"), None, None)
            .unwrap();

        let txn = ledger
            .get_transaction(recorded.transaction.id)
            .unwrap()
            .unwrap();
        assert_eq!(txn.category_name(), Some("Food"));
    }

    #[test]
    fn test_delete_transaction_cascades_to_item() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 0);
        let salary = fx.category(CategoryKind::Income, "Salary");

        let recorded = ledger
            .record_income(&input(main, &salary, 100, Currency::Yer))
            .unwrap();
        let deleted = ledger.delete_transaction(recorded.transaction.id).unwrap();

        assert_eq!(deleted.item.unwrap().id, recorded.item.id);
        assert!(fx.storage.income_items.is_empty().unwrap());
        assert_eq!(fx.balance(main, Currency::Yer), Money::zero());
    }

    #[test]
    fn test_delete_after_account_removed_is_tolerated() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 0);
        let cash = fx.cash();

        let transfer = ledger
            .record_transfer(&TransferInput {
                description: "Move".into(),
                date: date(1),
                currency: Currency::Yer,
                amount: Money::from_units(40),
                from_account: main,
                to_account: cash,
                notes: String::new(),
            })
            .unwrap();
        AccountService::new(&fx.storage).delete(cash).unwrap();

        ledger.delete_transaction(transfer.id).unwrap();
        assert_eq!(fx.balance(main, Currency::Yer), Money::zero());
    }

    #[test]
    fn test_generic_entry_has_no_item() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 100);
        let food = fx.category(CategoryKind::Expense, "Food");

        let txn = ledger
            .record_entry(ItemKind::Expense, &input(main, &food, 30, Currency::Yer))
            .unwrap();
        assert!(txn.item_id.is_none());
        assert!(fx.storage.expense_items.is_empty().unwrap());
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(70));
    }

    #[test]
    fn test_list_transactions_filter() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 0);
        let cash = fx.cash();
        let salary = fx.category(CategoryKind::Income, "Salary");

        let mut early = input(main, &salary, 10, Currency::Yer);
        early.date = date(1);
        let mut late = input(main, &salary, 20, Currency::Sar);
        late.date = date(20);
        ledger.record_income(&early).unwrap();
        ledger.record_income(&late).unwrap();
        ledger
            .record_transfer(&TransferInput {
                description: "Move".into(),
                date: date(10),
                currency: Currency::Yer,
                amount: Money::from_units(5),
                from_account: main,
                to_account: cash,
                notes: String::new(),
            })
            .unwrap();

        let all = ledger
            .list_transactions(&TransactionFilter::default())
            .unwrap();
        let dates: Vec<_> = all.iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![date(20), date(10), date(1)]);

        let cash_only = ledger
            .list_transactions(&TransactionFilter {
                account: Some(cash),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cash_only.len(), 1);

        let yer_income = ledger
            .list_transactions(&TransactionFilter {
                transaction_type: Some(TransactionType::Income),
                currency: Some(Currency::Yer),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(yer_income.len(), 1);

        let ranged = ledger
            .list_transactions(&TransactionFilter {
                from: Some(date(5)),
                to: Some(date(15)),
                ..Default::default()
            })
            .unwrap();
        assert!(ranged[0].is_transfer());

        let limited = ledger
            .list_transactions(&TransactionFilter {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited[0].date, date(20));
    }

    #[test]
    fn test_balance_matches_opening_plus_effects() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 250);
        let cash = fx.cash();
        let salary = fx.category(CategoryKind::Income, "Salary");
        let food = fx.category(CategoryKind::Expense, "Food");

        for amount in [100, 40, 75] {
            ledger
                .record_income(&input(main, &salary, amount, Currency::Yer))
                .unwrap();
            ledger
                .record_expense(&input(main, &food, amount / 5, Currency::Yer))
                .unwrap();
        }
        ledger
            .record_transfer(&TransferInput {
                description: "Move".into(),
                date: date(3),
                currency: Currency::Yer,
                amount: Money::from_units(60),
                from_account: main,
                to_account: cash,
                notes: String::new(),
            })
            .unwrap();

        let account = fx.storage.accounts.require(main).unwrap();
        let expected: Money = fx
            .storage
            .transactions
            .get_all()
            .unwrap()
            .iter()
            .flat_map(|t| t.effects())
            .filter(|e| e.account == main && e.currency == Currency::Yer)
            .map(|e| e.delta)
            .sum();
        assert_eq!(
            account.balance(Currency::Yer),
            account.opening_balances().yer + expected
        );
        assert!(matches!(account, Account::Bank(_)));
    }

    #[test]
    fn test_overflowing_amount_is_refused_before_any_write() {
        let fx = Fixture::new();
        let ledger = LedgerService::new(&fx.storage);
        let main = fx.bank("Main", 1);
        let salary = fx.category(CategoryKind::Income, "Salary");

        let mut huge = input(main, &salary, 0, Currency::Yer);
        huge.amount = Money::parse("79228162514264337593543950335").unwrap();

        let err = ledger.record_income(&huge).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(1));
        assert!(fx.storage.transactions.is_empty().unwrap());
        assert!(fx.storage.income_items.is_empty().unwrap());
        assert!(fx.storage.journal().pending().unwrap().is_empty());

        // The store still takes ordinary writes afterwards
        ledger
            .record_income(&input(main, &salary, 5, Currency::Yer))
            .unwrap();
        assert_eq!(fx.balance(main, Currency::Yer), Money::from_units(6));
    }

    #[test]
    fn test_two_stores_on_one_directory_keep_both_writes() {
        let fx = Fixture::new();
        let main = fx.bank("Main", 1000);
        let salary = fx.category(CategoryKind::Income, "Salary");

        let paths = || LedgerPaths::with_base_dir(fx._temp.path().to_path_buf());
        let other = Storage::open(paths()).unwrap();

        LedgerService::new(&fx.storage)
            .record_income(&input(main, &salary, 500, Currency::Yer))
            .unwrap();
        LedgerService::new(&other)
            .record_income(&input(main, &salary, 500, Currency::Yer))
            .unwrap();

        let reopened = Storage::open(paths()).unwrap();
        let balance = reopened.accounts.require(main).unwrap().balance(Currency::Yer);
        assert_eq!(balance, Money::from_units(2000));
        assert_eq!(reopened.transactions.len().unwrap(), 2);
        assert_eq!(reopened.income_items.len().unwrap(), 2);
        assert!(ReconciliationService::new(&reopened)
            .check()
            .unwrap()
            .is_consistent());
    }
}

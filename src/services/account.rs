//! Account service
//!
//! Creation, descriptive edits, deletion and lookup of bank and cash
//! accounts. Balances only move through `apply_balance_delta`.

use chrono::Utc;
use tracing::info;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Account, AccountRef, AccountSpec, BalanceEffect, BankAccount, CashAccount, CashLocation,
    Currency, Money,
};
use crate::storage::{AccountStore, ChangeKind, OperationGuard, Storage};

/// Service for account management
pub struct AccountService<'a> {
    storage: &'a Storage,
}

/// Descriptive fields that may be edited after creation
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub account_type: Option<String>,
    pub number: Option<String>,
    pub location: Option<CashLocation>,
    /// `Some(None)` clears the free-text location
    pub other_location: Option<Option<String>>,
    pub notes: Option<String>,
}

fn entity_type(reference: AccountRef) -> EntityType {
    match reference {
        AccountRef::Bank(_) => EntityType::BankAccount,
        AccountRef::Cash(_) => EntityType::CashAccount,
    }
}

impl<'a> AccountService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create an account with its opening balances
    pub fn create(&self, spec: AccountSpec) -> LedgerResult<Account> {
        let account = match spec {
            AccountSpec::Bank {
                name,
                account_type,
                number,
                opening,
                notes,
            } => {
                let mut account = BankAccount::new(
                    name.trim(),
                    account_type.trim(),
                    number.trim(),
                    opening,
                );
                account.notes = notes;
                account
                    .validate()
                    .map_err(|e| LedgerError::Validation(e.to_string()))?;
                Account::Bank(account)
            }
            AccountSpec::Cash {
                location,
                other_location,
                opening,
                notes,
            } => {
                let other_location = other_location
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                let mut account = CashAccount::new(location, other_location, opening);
                account.notes = notes;
                account
                    .validate()
                    .map_err(|e| LedgerError::Validation(e.to_string()))?;
                Account::Cash(account)
            }
        };

        let reference = account.reference();
        let op = self
            .storage
            .begin_operation("create_account", vec![reference.key()])?;
        self.storage.accounts.upsert(account.clone())?;
        self.commit_and_publish(op, reference, ChangeKind::Inserted)?;

        info!(account = %reference, name = %account.display_name(), "account created");
        self.storage.log_create(
            entity_type(reference),
            reference.key(),
            Some(account.display_name()),
            &account,
        )?;

        Ok(account)
    }

    pub fn get(&self, reference: AccountRef) -> LedgerResult<Option<Account>> {
        self.storage.accounts.get(reference)
    }

    /// Find an account by reference key or by name (case-insensitive)
    ///
    /// Cash accounts match on their holder label, e.g. "Cash (Mom)" or "mom".
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<Account>> {
        if let Ok(reference) = identifier.parse::<AccountRef>() {
            return self.storage.accounts.get(reference);
        }

        let needle = identifier.trim().to_lowercase();
        let accounts = self.storage.accounts.all()?;

        // Short ids as printed in listings
        if needle.starts_with("bank-") || needle.starts_with("cash-") {
            let mut matches = accounts
                .iter()
                .filter(|a| a.reference().key().starts_with(&needle));
            if let (Some(account), None) = (matches.next(), matches.next()) {
                return Ok(Some(account.clone()));
            }
        }

        Ok(accounts.into_iter().find(|account| {
            let label = account.display_name().to_lowercase();
            match account {
                Account::Bank(_) => label == needle,
                Account::Cash(cash) => {
                    label == needle || cash.location.to_string().to_lowercase() == needle
                }
            }
        }))
    }

    /// Resolve an identifier or fail with `NotFound`
    pub fn resolve(&self, identifier: &str) -> LedgerResult<Account> {
        self.find(identifier)?
            .ok_or_else(|| LedgerError::account_not_found(identifier))
    }

    /// All accounts, bank first
    pub fn list(&self) -> LedgerResult<Vec<Account>> {
        self.storage.accounts.all()
    }

    pub fn list_bank(&self) -> LedgerResult<Vec<BankAccount>> {
        self.storage.accounts.bank.get_all()
    }

    pub fn list_cash(&self) -> LedgerResult<Vec<CashAccount>> {
        self.storage.accounts.cash.get_all()
    }

    /// Add a signed delta to one currency balance and persist it
    pub fn apply_balance_delta(
        &self,
        reference: AccountRef,
        currency: Currency,
        delta: Money,
    ) -> LedgerResult<Account> {
        let lock = self.storage.write_lock()?;
        self.storage.accounts.require(reference)?;
        self.storage
            .accounts
            .check_effects(&[BalanceEffect::new(reference, currency, delta)])?;

        let op = lock.begin_operation("adjust_balance", vec![reference.key()])?;
        let account = self
            .storage
            .accounts
            .apply_balance_delta(reference, currency, delta)?;
        self.commit_and_publish(op, reference, ChangeKind::Updated)?;

        info!(account = %reference, %currency, %delta, "balance adjusted");
        Ok(account)
    }

    /// Edit descriptive fields; balances are left alone
    pub fn update(&self, reference: AccountRef, update: AccountUpdate) -> LedgerResult<Account> {
        let lock = self.storage.write_lock()?;
        let before = self.storage.accounts.require(reference)?;

        let after = match before.clone() {
            Account::Bank(mut account) => {
                if update.location.is_some() || update.other_location.is_some() {
                    return Err(LedgerError::Validation(
                        "Bank accounts have no location".into(),
                    ));
                }
                if let Some(name) = update.name {
                    account.name = name.trim().to_string();
                }
                if let Some(account_type) = update.account_type {
                    account.account_type = account_type.trim().to_string();
                }
                if let Some(number) = update.number {
                    account.number = number.trim().to_string();
                }
                if let Some(notes) = update.notes {
                    account.notes = notes;
                }
                account
                    .validate()
                    .map_err(|e| LedgerError::Validation(e.to_string()))?;
                account.updated_at = Utc::now();
                Account::Bank(account)
            }
            Account::Cash(mut account) => {
                if update.name.is_some() || update.account_type.is_some() || update.number.is_some()
                {
                    return Err(LedgerError::Validation(
                        "Cash accounts have no name, type or number".into(),
                    ));
                }
                if let Some(location) = update.location {
                    account.location = location;
                    if location != CashLocation::Other && update.other_location.is_none() {
                        account.other_location = None;
                    }
                }
                if let Some(other_location) = update.other_location {
                    account.other_location = other_location
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty());
                }
                if let Some(notes) = update.notes {
                    account.notes = notes;
                }
                account
                    .validate()
                    .map_err(|e| LedgerError::Validation(e.to_string()))?;
                account.updated_at = Utc::now();
                Account::Cash(account)
            }
        };

        // Write only the descriptive fields so a concurrent delta is kept
        let op = lock.begin_operation("update_account", vec![reference.key()])?;
        let after = self.write_descriptive_fields(&after)?;
        self.commit_and_publish(op, reference, ChangeKind::Updated)?;

        self.storage.log_update(
            entity_type(reference),
            reference.key(),
            Some(after.display_name()),
            &before,
            &after,
        )?;

        Ok(after)
    }

    fn write_descriptive_fields(&self, edited: &Account) -> LedgerResult<Account> {
        let updated = match edited {
            Account::Bank(edited) => self
                .storage
                .accounts
                .bank
                .update(edited.id, |account| {
                    account.name.clone_from(&edited.name);
                    account.account_type.clone_from(&edited.account_type);
                    account.number.clone_from(&edited.number);
                    account.notes.clone_from(&edited.notes);
                    account.updated_at = edited.updated_at;
                })?
                .map(Account::Bank),
            Account::Cash(edited) => self
                .storage
                .accounts
                .cash
                .update(edited.id, |account| {
                    account.location = edited.location;
                    account.other_location.clone_from(&edited.other_location);
                    account.notes.clone_from(&edited.notes);
                    account.updated_at = edited.updated_at;
                })?
                .map(Account::Cash),
        };
        updated.ok_or_else(|| LedgerError::account_not_found(edited.reference().key()))
    }

    /// Remove an account
    ///
    /// Transactions that reference it are kept as history.
    pub fn delete(&self, reference: AccountRef) -> LedgerResult<Account> {
        let lock = self.storage.write_lock()?;
        self.storage.accounts.require(reference)?;

        let op = lock.begin_operation("delete_account", vec![reference.key()])?;
        let account = self
            .storage
            .accounts
            .remove(reference)?
            .ok_or_else(|| LedgerError::account_not_found(reference.key()))?;
        self.commit_and_publish(op, reference, ChangeKind::Removed)?;

        info!(account = %reference, "account deleted");
        self.storage.log_delete(
            entity_type(reference),
            reference.key(),
            Some(account.display_name()),
            &account,
        )?;

        Ok(account)
    }

    fn commit_and_publish(
        &self,
        op: OperationGuard<'_>,
        reference: AccountRef,
        kind: ChangeKind,
    ) -> LedgerResult<()> {
        let collection = AccountStore::collection_of(reference);
        op.commit(&[collection])?;
        self.storage.publish(collection, kind, Some(reference.key()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::Balances;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn bank_spec(name: &str, number: &str) -> AccountSpec {
        AccountSpec::Bank {
            name: name.into(),
            account_type: "current".into(),
            number: number.into(),
            opening: Balances::new(Money::from_units(1000), Money::zero()),
            notes: String::new(),
        }
    }

    #[test]
    fn test_create_bank_account() {
        let (_temp, storage) = create_test_storage();
        let service = AccountService::new(&storage);

        let account = service.create(bank_spec("Main", "001")).unwrap();
        assert_eq!(account.balance(Currency::Yer), Money::from_units(1000));
        assert_eq!(account.opening_balances(), account.balances());
        assert!(service.get(account.reference()).unwrap().is_some());
    }

    #[test]
    fn test_create_rejects_missing_fields() {
        let (_temp, storage) = create_test_storage();
        let service = AccountService::new(&storage);

        let err = service.create(bank_spec("Main", "  ")).unwrap_err();
        assert!(err.is_validation());

        let err = service
            .create(AccountSpec::Cash {
                location: CashLocation::Other,
                other_location: Some("   ".into()),
                opening: Balances::default(),
                notes: String::new(),
            })
            .unwrap_err();
        assert!(err.is_validation());
        assert!(storage.accounts.is_empty().unwrap());
    }

    #[test]
    fn test_apply_balance_delta_persists() {
        let (temp, storage) = create_test_storage();
        let service = AccountService::new(&storage);
        let account = service.create(bank_spec("Main", "001")).unwrap();

        service
            .apply_balance_delta(account.reference(), Currency::Sar, Money::from_units(50))
            .unwrap();

        let reopened =
            Storage::open(LedgerPaths::with_base_dir(temp.path().to_path_buf())).unwrap();
        let reloaded = reopened.accounts.require(account.reference()).unwrap();
        assert_eq!(reloaded.balance(Currency::Sar), Money::from_units(50));
    }

    #[test]
    fn test_update_keeps_balances() {
        let (_temp, storage) = create_test_storage();
        let service = AccountService::new(&storage);
        let account = service.create(bank_spec("Main", "001")).unwrap();

        let updated = service
            .update(
                account.reference(),
                AccountUpdate {
                    name: Some("Kuraimi".into()),
                    notes: Some("salary account".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.display_name(), "Kuraimi");
        assert_eq!(updated.notes(), "salary account");
        assert_eq!(updated.balance(Currency::Yer), Money::from_units(1000));
    }

    #[test]
    fn test_update_cash_location_clears_other() {
        let (_temp, storage) = create_test_storage();
        let service = AccountService::new(&storage);
        let account = service
            .create(AccountSpec::Cash {
                location: CashLocation::Other,
                other_location: Some("Uncle".into()),
                opening: Balances::default(),
                notes: String::new(),
            })
            .unwrap();

        let updated = service
            .update(
                account.reference(),
                AccountUpdate {
                    location: Some(CashLocation::Wife),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.display_name(), "Cash (Wife)");
    }

    #[test]
    fn test_find_by_key_and_name() {
        let (_temp, storage) = create_test_storage();
        let service = AccountService::new(&storage);
        let bank = service.create(bank_spec("Main", "001")).unwrap();
        let cash = service
            .create(AccountSpec::Cash {
                location: CashLocation::Mom,
                other_location: None,
                opening: Balances::default(),
                notes: String::new(),
            })
            .unwrap();

        let key = bank.reference().key();
        assert_eq!(
            service.find(&key).unwrap().unwrap().reference(),
            bank.reference()
        );
        assert_eq!(
            service.find("main").unwrap().unwrap().reference(),
            bank.reference()
        );
        assert_eq!(
            service.find("mom").unwrap().unwrap().reference(),
            cash.reference()
        );
        assert!(service.resolve("nowhere").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_account() {
        let (_temp, storage) = create_test_storage();
        let service = AccountService::new(&storage);
        let account = service.create(bank_spec("Main", "001")).unwrap();

        service.delete(account.reference()).unwrap();
        assert!(service.get(account.reference()).unwrap().is_none());
        assert!(service.delete(account.reference()).unwrap_err().is_not_found());
    }
}

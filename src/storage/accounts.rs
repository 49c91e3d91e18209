//! Account store over the bank and cash collections
//!
//! Dispatches on `AccountRef` so callers never need to know which
//! collection an account lives in.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::Utc;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Account, AccountRef, BalanceEffect, Balances, BankAccount, CashAccount, Currency, Money,
};

use super::collection::{Collection, JsonCollection};
use crate::config::paths::LedgerPaths;

/// Bank and cash accounts behind one interface
pub struct AccountStore {
    pub bank: JsonCollection<BankAccount>,
    pub cash: JsonCollection<CashAccount>,
}

impl AccountStore {
    pub fn new(paths: &LedgerPaths) -> Self {
        Self {
            bank: JsonCollection::new(
                Collection::BankAccounts,
                paths.collection_file(Collection::BankAccounts),
            ),
            cash: JsonCollection::new(
                Collection::CashAccounts,
                paths.collection_file(Collection::CashAccounts),
            ),
        }
    }

    pub fn load(&self) -> LedgerResult<()> {
        self.bank.load()?;
        self.cash.load()
    }

    pub fn save(&self) -> LedgerResult<()> {
        self.bank.save()?;
        self.cash.save()
    }

    /// Collection backing a reference
    pub fn collection_of(reference: AccountRef) -> Collection {
        match reference {
            AccountRef::Bank(_) => Collection::BankAccounts,
            AccountRef::Cash(_) => Collection::CashAccounts,
        }
    }

    pub fn get(&self, reference: AccountRef) -> LedgerResult<Option<Account>> {
        Ok(match reference {
            AccountRef::Bank(id) => self.bank.get(id)?.map(Account::Bank),
            AccountRef::Cash(id) => self.cash.get(id)?.map(Account::Cash),
        })
    }

    /// Fetch an account or fail with `NotFound`
    pub fn require(&self, reference: AccountRef) -> LedgerResult<Account> {
        self.get(reference)?
            .ok_or_else(|| LedgerError::account_not_found(reference.key()))
    }

    pub fn exists(&self, reference: AccountRef) -> LedgerResult<bool> {
        match reference {
            AccountRef::Bank(id) => self.bank.exists(id),
            AccountRef::Cash(id) => self.cash.exists(id),
        }
    }

    /// Bank accounts first, then cash, each oldest first
    pub fn all(&self) -> LedgerResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .bank
            .get_all()?
            .into_iter()
            .map(Account::Bank)
            .collect();
        accounts.extend(self.cash.get_all()?.into_iter().map(Account::Cash));
        Ok(accounts)
    }

    /// Add a signed delta to one currency balance
    ///
    /// The increment happens under the collection write lock, so two deltas
    /// against the same account can never lose an update. This is the only
    /// place balances change after creation. A delta that would overflow the
    /// balance is a `Validation` error and leaves the account unchanged.
    pub fn apply_balance_delta(
        &self,
        reference: AccountRef,
        currency: Currency,
        delta: Money,
    ) -> LedgerResult<Account> {
        let now = Utc::now();
        let updated = match reference {
            AccountRef::Bank(id) => self
                .bank
                .try_update(id, |account| {
                    account.balances.apply(currency, delta)?;
                    account.updated_at = now;
                    Ok(())
                })?
                .map(Account::Bank),
            AccountRef::Cash(id) => self
                .cash
                .try_update(id, |account| {
                    account.balances.apply(currency, delta)?;
                    account.updated_at = now;
                    Ok(())
                })?
                .map(Account::Cash),
        };

        updated.ok_or_else(|| LedgerError::account_not_found(reference.key()))
    }

    /// Fail with `Validation` if applying the effects in order would
    /// overflow a balance; nothing is written
    ///
    /// Effects on accounts that do not exist are skipped.
    pub fn check_effects(&self, effects: &[BalanceEffect]) -> LedgerResult<()> {
        let mut projected: HashMap<AccountRef, Balances> = HashMap::new();
        for effect in effects {
            let balances = match projected.entry(effect.account) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => match self.get(effect.account)? {
                    Some(account) => entry.insert(account.balances()),
                    None => continue,
                },
            };
            balances.apply(effect.currency, effect.delta)?;
        }
        Ok(())
    }

    pub fn remove(&self, reference: AccountRef) -> LedgerResult<Option<Account>> {
        Ok(match reference {
            AccountRef::Bank(id) => self.bank.remove(id)?.map(Account::Bank),
            AccountRef::Cash(id) => self.cash.remove(id)?.map(Account::Cash),
        })
    }

    /// Store an account record as-is
    pub fn upsert(&self, account: Account) -> LedgerResult<()> {
        match account {
            Account::Bank(a) => self.bank.upsert(a),
            Account::Cash(a) => self.cash.upsert(a),
        }
    }

    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.bank.len()? + self.cash.len()?)
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }
}

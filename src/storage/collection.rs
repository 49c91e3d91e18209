//! Generic JSON-backed record collection
//!
//! Each collection is held in memory behind a `RwLock` and persisted as a
//! single JSON file. Writes go to memory first; `save` flushes atomically.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    BankAccount, BankAccountId, CashAccount, CashAccountId, Category, CategoryId, DebtCustomer,
    DebtCustomerId, DebtTransaction, DebtTransactionId, Item, ItemId, Transaction, TransactionId,
    User, UserId,
};

use super::file_io::{read_json, write_json_atomic};

/// Named collections of the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    BankAccounts,
    CashAccounts,
    Transactions,
    IncomeItems,
    ExpenseItems,
    IncomeCategories,
    ExpenseCategories,
    DebtCustomers,
    DebtTransactions,
    Backups,
    Users,
}

impl Collection {
    /// Collections stored under the data directory
    pub const DATA: [Collection; 10] = [
        Collection::BankAccounts,
        Collection::CashAccounts,
        Collection::Transactions,
        Collection::IncomeItems,
        Collection::ExpenseItems,
        Collection::IncomeCategories,
        Collection::ExpenseCategories,
        Collection::DebtCustomers,
        Collection::DebtTransactions,
        Collection::Users,
    ];

    /// External collection name
    pub fn name(&self) -> &'static str {
        match self {
            Self::BankAccounts => "bankAccounts",
            Self::CashAccounts => "cashAccounts",
            Self::Transactions => "transactions",
            Self::IncomeItems => "incomeItems",
            Self::ExpenseItems => "expenseItems",
            Self::IncomeCategories => "incomeCategories",
            Self::ExpenseCategories => "expenseCategories",
            Self::DebtCustomers => "debtCustomers",
            Self::DebtTransactions => "debtTransactions",
            Self::Backups => "backups",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A storable record with a stable identity
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    /// Full external key, e.g. `txn-550e8400-...`
    fn key(&self) -> String;

    fn created_at(&self) -> DateTime<Utc>;
}

macro_rules! impl_record {
    ($record:ty, $id:ty) => {
        impl Record for $record {
            type Id = $id;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn key(&self) -> String {
                self.id.key()
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }
    };
}

impl_record!(BankAccount, BankAccountId);
impl_record!(CashAccount, CashAccountId);
impl_record!(Transaction, TransactionId);
impl_record!(Item, ItemId);
impl_record!(Category, CategoryId);
impl_record!(DebtCustomer, DebtCustomerId);
impl_record!(DebtTransaction, DebtTransactionId);
impl_record!(User, UserId);

/// On-disk layout of a collection file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionData<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
}

impl<T> Default for CollectionData<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

/// In-memory collection persisted to one JSON file
pub struct JsonCollection<T: Record> {
    collection: Collection,
    path: PathBuf,
    data: RwLock<HashMap<T::Id, T>>,
}

impl<T: Record> JsonCollection<T> {
    pub fn new(collection: Collection, path: PathBuf) -> Self {
        Self {
            collection,
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, HashMap<T::Id, T>>> {
        self.data.read().map_err(|e| {
            LedgerError::Persistence(format!(
                "Failed to acquire read lock on {}: {}",
                self.collection, e
            ))
        })
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, HashMap<T::Id, T>>> {
        self.data.write().map_err(|e| {
            LedgerError::Persistence(format!(
                "Failed to acquire write lock on {}: {}",
                self.collection, e
            ))
        })
    }

    /// Replace the in-memory state with the file contents
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: CollectionData<T> = read_json(&self.path)?;
        let mut data = self.write()?;
        data.clear();
        for record in file_data.records {
            data.insert(record.id(), record);
        }
        Ok(())
    }

    /// Flush the in-memory state to disk
    pub fn save(&self) -> LedgerResult<()> {
        let records = self.get_all()?;
        write_json_atomic(&self.path, &CollectionData { records })
    }

    pub fn get(&self, id: T::Id) -> LedgerResult<Option<T>> {
        Ok(self.read()?.get(&id).cloned())
    }

    pub fn exists(&self, id: T::Id) -> LedgerResult<bool> {
        Ok(self.read()?.contains_key(&id))
    }

    /// All records, oldest first
    pub fn get_all(&self) -> LedgerResult<Vec<T>> {
        let mut records: Vec<T> = self.read()?.values().cloned().collect();
        records.sort_by_key(|r| r.created_at());
        Ok(records)
    }

    /// Records matching a predicate, oldest first
    pub fn find<F>(&self, predicate: F) -> LedgerResult<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        let mut records: Vec<T> = self
            .read()?
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at());
        Ok(records)
    }

    /// Insert or replace a record
    pub fn upsert(&self, record: T) -> LedgerResult<()> {
        self.write()?.insert(record.id(), record);
        Ok(())
    }

    /// Mutate one record in place while holding the write lock
    ///
    /// Returns `None` if the record does not exist.
    pub fn update<F>(&self, id: T::Id, f: F) -> LedgerResult<Option<T>>
    where
        F: FnOnce(&mut T),
    {
        let mut data = self.write()?;
        Ok(data.get_mut(&id).map(|record| {
            f(record);
            record.clone()
        }))
    }

    /// Like `update`, but the mutation may fail
    ///
    /// The closure works on a copy; the stored record only changes when it
    /// returns `Ok`.
    pub fn try_update<F>(&self, id: T::Id, f: F) -> LedgerResult<Option<T>>
    where
        F: FnOnce(&mut T) -> LedgerResult<()>,
    {
        let mut data = self.write()?;
        let Some(record) = data.get_mut(&id) else {
            return Ok(None);
        };
        let mut updated = record.clone();
        f(&mut updated)?;
        *record = updated.clone();
        Ok(Some(updated))
    }

    pub fn remove(&self, id: T::Id) -> LedgerResult<Option<T>> {
        Ok(self.write()?.remove(&id))
    }

    /// Remove every record matching a predicate, returning what was removed
    pub fn remove_where<F>(&self, predicate: F) -> LedgerResult<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        let mut data = self.write()?;
        let ids: Vec<T::Id> = data
            .values()
            .filter(|r| predicate(r))
            .map(|r| r.id())
            .collect();
        Ok(ids.into_iter().filter_map(|id| data.remove(&id)).collect())
    }

    pub fn clear(&self) -> LedgerResult<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Swap the entire contents in one step
    pub fn replace_all(&self, records: Vec<T>) -> LedgerResult<()> {
        let mut data = self.write()?;
        data.clear();
        for record in records {
            data.insert(record.id(), record);
        }
        Ok(())
    }

    /// Records whose key, or key without its prefix, starts with `needle`
    ///
    /// Lets users type the short ids shown in listings.
    pub fn find_by_key_prefix(&self, needle: &str) -> LedgerResult<Vec<T>> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        self.find(|r| {
            let key = r.key();
            key.starts_with(&needle)
                || key
                    .split_once('-')
                    .is_some_and(|(_, uuid)| uuid.starts_with(&needle))
        })
    }

    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.read()?.is_empty())
    }
}

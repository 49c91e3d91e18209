//! Owned point-in-time copy of every collection
//!
//! Handed to presentation code instead of shared references into the store,
//! and used as the payload of backup archives.

use serde::{Deserialize, Serialize};

use crate::models::{
    BankAccount, CashAccount, Category, DebtCustomer, DebtTransaction, Item, Transaction, User,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    /// Store revision the snapshot was taken at
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub bank_accounts: Vec<BankAccount>,
    #[serde(default)]
    pub cash_accounts: Vec<CashAccount>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub income_items: Vec<Item>,
    #[serde(default)]
    pub expense_items: Vec<Item>,
    #[serde(default)]
    pub income_categories: Vec<Category>,
    #[serde(default)]
    pub expense_categories: Vec<Category>,
    #[serde(default)]
    pub debt_customers: Vec<DebtCustomer>,
    #[serde(default)]
    pub debt_transactions: Vec<DebtTransaction>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl LedgerSnapshot {
    /// Total number of records across all collections
    pub fn record_count(&self) -> usize {
        self.bank_accounts.len()
            + self.cash_accounts.len()
            + self.transactions.len()
            + self.income_items.len()
            + self.expense_items.len()
            + self.income_categories.len()
            + self.expense_categories.len()
            + self.debt_customers.len()
            + self.debt_transactions.len()
            + self.users.len()
    }
}

//! Core data models
//!
//! This module contains the data structures of the ledger domain:
//! accounts, categories, transactions, income/expense items, debts and users.

pub mod account;
pub mod category;
pub mod debt;
pub mod ids;
pub mod item;
pub mod money;
pub mod transaction;
pub mod user;

pub use account::{
    Account, AccountRef, AccountSpec, BankAccount, CashAccount, CashLocation,
};
pub use category::{Category, CategoryKind, DEFAULT_CATEGORY_COLOR};
pub use debt::{
    CustomerBalance, DebtCustomer, DebtStatus, DebtTransaction, DebtTransactionInput, DebtType,
};
pub use ids::{
    BackupId, BankAccountId, CashAccountId, CategoryId, DebtCustomerId, DebtTransactionId, ItemId,
    OperationId, TransactionId, UserId,
};
pub use item::{Item, ItemInput, ItemKind};
pub use money::{Balances, Currency, Money};
pub use transaction::{BalanceEffect, Transaction, TransactionKind, TransactionType};
pub use user::{Identity, Role, User};

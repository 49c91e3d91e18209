//! Income and expense items
//!
//! An item records what the user meant ("salary from X", "rent"), while its
//! mirrored transaction is what moves balances. The ledger service keeps
//! exactly one transaction per item.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::AccountRef;
use super::category::CategoryKind;
use super::ids::{CategoryId, ItemId};
use super::money::{Currency, Money};

/// Whether an item is income or expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Income,
    Expense,
}

impl ItemKind {
    /// The category registry items of this kind draw from
    pub fn category_kind(&self) -> CategoryKind {
        match self {
            Self::Income => CategoryKind::Income,
            Self::Expense => CategoryKind::Expense,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
        }
    }
}

/// An income or expense item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,

    /// Income source or expense category
    pub category: CategoryId,

    /// Category name captured when the item was written
    #[serde(default)]
    pub category_name: String,

    pub description: String,
    pub date: NaiveDate,
    pub currency: Currency,
    #[serde(default)]
    pub amount: Money,
    pub account: AccountRef,
    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the record was re-created by a backup restore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
}

/// User input for creating or editing an item
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub category: CategoryId,
    pub description: String,
    pub date: NaiveDate,
    pub currency: Currency,
    pub amount: Money,
    pub account: AccountRef,
    pub notes: String,
}

impl Item {
    /// Build an item from validated input and the category name snapshot
    pub fn from_input(kind: ItemKind, input: &ItemInput, category_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            kind,
            category: input.category,
            category_name: category_name.into(),
            description: input.description.trim().to_string(),
            date: input.date,
            currency: input.currency,
            amount: input.amount,
            account: input.account,
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
            restored_at: None,
        }
    }

    /// Overwrite the editable fields, keeping identity and creation time
    pub fn apply_input(&mut self, input: &ItemInput, category_name: impl Into<String>) {
        self.category = input.category;
        self.category_name = category_name.into();
        self.description = input.description.trim().to_string();
        self.date = input.date;
        self.currency = input.currency;
        self.amount = input.amount;
        self.account = input.account;
        self.notes = input.notes.clone();
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} ({})",
            self.date, self.amount, self.currency, self.description, self.category_name
        )
    }
}

//! Transaction model
//!
//! A transaction is the canonical ledger entry. Its balance effect is a
//! pure function of its fields (see [`Transaction::effects`]), which is what
//! lets edits and deletes reverse exactly what was applied.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::AccountRef;
use super::ids::{CategoryId, ItemId, TransactionId};
use super::item::ItemKind;
use super::money::{Currency, Money};

/// The three kinds of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

/// Type-specific fields of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionKind {
    Income {
        account: AccountRef,
        category: CategoryId,
        /// Category name captured when the entry was written
        #[serde(rename = "categoryName", default)]
        category_name: String,
    },
    Expense {
        account: AccountRef,
        category: CategoryId,
        #[serde(rename = "categoryName", default)]
        category_name: String,
    },
    Transfer {
        #[serde(rename = "fromAccount")]
        from_account: AccountRef,
        #[serde(rename = "toAccount")]
        to_account: AccountRef,
    },
}

impl TransactionKind {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Self::Income { .. } => TransactionType::Income,
            Self::Expense { .. } => TransactionType::Expense,
            Self::Transfer { .. } => TransactionType::Transfer,
        }
    }

    /// Every account this entry touches
    pub fn accounts(&self) -> Vec<AccountRef> {
        match self {
            Self::Income { account, .. } | Self::Expense { account, .. } => vec![*account],
            Self::Transfer {
                from_account,
                to_account,
            } => vec![*from_account, *to_account],
        }
    }
}

/// One signed change to one account's balance in one currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEffect {
    pub account: AccountRef,
    pub currency: Currency,
    pub delta: Money,
}

impl BalanceEffect {
    pub fn new(account: AccountRef, currency: Currency, delta: Money) -> Self {
        Self {
            account,
            currency,
            delta,
        }
    }

    /// The effect that undoes this one
    pub fn reversed(&self) -> Self {
        Self {
            delta: -self.delta,
            ..*self
        }
    }
}

/// A ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,

    #[serde(flatten)]
    pub kind: TransactionKind,

    pub description: String,

    pub date: NaiveDate,

    pub currency: Currency,

    /// Always positive for entries written by the engine. Older records may
    /// lack it, in which case it reads as zero.
    #[serde(default)]
    pub amount: Money,

    #[serde(default)]
    pub notes: String,

    /// The income/expense item this entry mirrors, if any. The item's kind
    /// follows from the transaction type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the record was re-created by a backup restore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        description: impl Into<String>,
        date: NaiveDate,
        currency: Currency,
        amount: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            kind,
            description: description.into(),
            date,
            currency,
            amount,
            notes: String::new(),
            item_id: None,
            created_at: now,
            updated_at: now,
            restored_at: None,
        }
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.kind.transaction_type()
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self.kind, TransactionKind::Transfer { .. })
    }

    /// Linked item, with its kind
    pub fn item_link(&self) -> Option<(ItemKind, ItemId)> {
        let id = self.item_id?;
        match self.kind {
            TransactionKind::Income { .. } => Some((ItemKind::Income, id)),
            TransactionKind::Expense { .. } => Some((ItemKind::Expense, id)),
            TransactionKind::Transfer { .. } => None,
        }
    }

    /// Category name snapshot, for income/expense entries
    pub fn category_name(&self) -> Option<&str> {
        match &self.kind {
            TransactionKind::Income { category_name, .. }
            | TransactionKind::Expense { category_name, .. } => Some(category_name),
            TransactionKind::Transfer { .. } => None,
        }
    }

    pub fn touches(&self, account: AccountRef) -> bool {
        self.kind.accounts().contains(&account)
    }

    /// Signed balance effects of this entry
    ///
    /// income: +amount on the account; expense: -amount; transfer: -amount
    /// on the source and +amount on the destination.
    pub fn effects(&self) -> Vec<BalanceEffect> {
        let amount = self.amount;
        match &self.kind {
            TransactionKind::Income { account, .. } => {
                vec![BalanceEffect::new(*account, self.currency, amount)]
            }
            TransactionKind::Expense { account, .. } => {
                vec![BalanceEffect::new(*account, self.currency, -amount)]
            }
            TransactionKind::Transfer {
                from_account,
                to_account,
            } => vec![
                BalanceEffect::new(*from_account, self.currency, -amount),
                BalanceEffect::new(*to_account, self.currency, amount),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        if self.description.trim().is_empty() {
            return Err(TransactionValidationError::MissingDescription);
        }
        if !self.amount.is_positive() {
            return Err(TransactionValidationError::NonPositiveAmount(self.amount));
        }
        if let TransactionKind::Transfer {
            from_account,
            to_account,
        } = &self.kind
        {
            if from_account == to_account {
                return Err(TransactionValidationError::SameAccountTransfer);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.date,
            self.transaction_type(),
            self.amount,
            self.currency,
            self.description
        )
    }
}

/// Validation errors for transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    MissingDescription,
    NonPositiveAmount(Money),
    SameAccountTransfer,
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDescription => write!(f, "Description is required"),
            Self::NonPositiveAmount(amount) => {
                write!(f, "Amount must be greater than zero (got {})", amount)
            }
            Self::SameAccountTransfer => write!(f, "Cannot transfer to the same account"),
        }
    }
}

impl std::error::Error for TransactionValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BankAccountId, CashAccountId};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn bank() -> AccountRef {
        AccountRef::Bank(BankAccountId::new())
    }

    #[test]
    fn test_income_and_expense_effects() {
        let account = bank();
        let category = CategoryId::new();

        let income = Transaction::new(
            TransactionKind::Income {
                account,
                category,
                category_name: "Salary".into(),
            },
            "March salary",
            date(),
            Currency::Yer,
            Money::from_units(500),
        );
        assert_eq!(
            income.effects(),
            vec![BalanceEffect::new(account, Currency::Yer, Money::from_units(500))]
        );

        let expense = Transaction::new(
            TransactionKind::Expense {
                account,
                category,
                category_name: "Food".into(),
            },
            "Groceries",
            date(),
            Currency::Sar,
            Money::from_units(20),
        );
        assert_eq!(expense.effects()[0].delta, Money::from_units(-20));
        assert_eq!(expense.effects()[0].currency, Currency::Sar);
    }

    #[test]
    fn test_transfer_effects_and_reversal() {
        let from = bank();
        let to = AccountRef::Cash(CashAccountId::new());
        let transfer = Transaction::new(
            TransactionKind::Transfer {
                from_account: from,
                to_account: to,
            },
            "Withdraw",
            date(),
            Currency::Yer,
            Money::from_units(300),
        );

        let effects = transfer.effects();
        assert_eq!(effects[0], BalanceEffect::new(from, Currency::Yer, Money::from_units(-300)));
        assert_eq!(effects[1], BalanceEffect::new(to, Currency::Yer, Money::from_units(300)));
        assert_eq!(effects[0].reversed().delta, Money::from_units(300));
        assert!(transfer.item_link().is_none());
    }

    #[test]
    fn test_validation() {
        let account = bank();
        let mut txn = Transaction::new(
            TransactionKind::Transfer {
                from_account: account,
                to_account: account,
            },
            "Loop",
            date(),
            Currency::Yer,
            Money::from_units(1),
        );
        assert_eq!(
            txn.validate(),
            Err(TransactionValidationError::SameAccountTransfer)
        );

        txn.kind = TransactionKind::Transfer {
            from_account: account,
            to_account: bank(),
        };
        txn.amount = Money::zero();
        assert!(matches!(
            txn.validate(),
            Err(TransactionValidationError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_serialized_shape() {
        let txn = Transaction::new(
            TransactionKind::Income {
                account: bank(),
                category: CategoryId::new(),
                category_name: "Salary".into(),
            },
            "Pay",
            date(),
            Currency::Yer,
            Money::from_units(10),
        );
        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["type"], "income");
        assert_eq!(json["categoryName"], "Salary");
        assert_eq!(json["currency"], "YER");

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, txn.kind);
    }

    #[test]
    fn test_missing_amount_reads_as_zero() {
        let json = serde_json::json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "transfer",
            "fromAccount": format!("bank-{}", uuid::Uuid::new_v4()),
            "toAccount": format!("cash-{}", uuid::Uuid::new_v4()),
            "description": "legacy",
            "date": "2024-01-01",
            "currency": "SAR",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        });
        let txn: Transaction = serde_json::from_value(json).unwrap();
        assert!(txn.amount.is_zero());
    }
}

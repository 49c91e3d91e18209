//! Debt subledger models
//!
//! Customers and their owed/owe transactions. Nothing here touches
//! account balances.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{DebtCustomerId, DebtTransactionId};
use super::money::{Currency, Money};

/// A person or business with a running debt position
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtCustomer {
    pub id: DebtCustomerId,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the record was re-created by a backup restore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
}

impl DebtCustomer {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DebtCustomerId::new(),
            name: name.into(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
            restored_at: None,
        }
    }
}

/// Direction of a debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtType {
    /// The customer owes the ledger owner
    Owed,
    /// The ledger owner owes the customer
    Owe,
}

impl DebtType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "owed" => Some(Self::Owed),
            "owe" => Some(Self::Owe),
            _ => None,
        }
    }
}

impl fmt::Display for DebtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owed => write!(f, "owed"),
            Self::Owe => write!(f, "owe"),
        }
    }
}

/// Descriptive settlement state, set by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
}

impl DebtStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Overdue => write!(f, "overdue"),
        }
    }
}

/// One owed/owe entry for a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtTransaction {
    pub id: DebtTransactionId,
    pub customer_id: DebtCustomerId,
    #[serde(rename = "type")]
    pub debt_type: DebtType,
    pub description: String,
    pub date: NaiveDate,
    pub currency: Currency,
    #[serde(default)]
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: DebtStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the record was re-created by a backup restore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
}

/// User input for a debt transaction
#[derive(Debug, Clone)]
pub struct DebtTransactionInput {
    pub debt_type: DebtType,
    pub description: String,
    pub date: NaiveDate,
    pub currency: Currency,
    pub amount: Money,
    pub due_date: Option<NaiveDate>,
    pub status: DebtStatus,
    pub notes: String,
}

impl DebtTransaction {
    pub fn from_input(customer_id: DebtCustomerId, input: &DebtTransactionInput) -> Self {
        let now = Utc::now();
        Self {
            id: DebtTransactionId::new(),
            customer_id,
            debt_type: input.debt_type,
            description: input.description.trim().to_string(),
            date: input.date,
            currency: input.currency,
            amount: input.amount,
            due_date: input.due_date,
            status: input.status,
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
            restored_at: None,
        }
    }
}

/// A customer's position, recomputed on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CustomerBalance {
    /// Sum of amounts the customer owes
    pub owed: Money,
    /// Sum of amounts owed to the customer
    pub owe: Money,
    /// `owed - owe`
    pub net: Money,
}

impl CustomerBalance {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a DebtTransaction>) -> Self {
        let (owed, owe) = transactions
            .into_iter()
            .fold((Money::zero(), Money::zero()), |(owed, owe), t| match t.debt_type {
                DebtType::Owed => (owed + t.amount, owe),
                DebtType::Owe => (owed, owe + t.amount),
            });
        Self {
            owed,
            owe,
            net: owed - owe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(customer: DebtCustomerId, debt_type: DebtType, amount: i64) -> DebtTransaction {
        DebtTransaction::from_input(
            customer,
            &DebtTransactionInput {
                debt_type,
                description: "loan".into(),
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                currency: Currency::Yer,
                amount: Money::from_units(amount),
                due_date: None,
                status: DebtStatus::Pending,
                notes: String::new(),
            },
        )
    }

    #[test]
    fn test_customer_balance() {
        let customer = DebtCustomerId::new();
        let entries = vec![
            entry(customer, DebtType::Owed, 1000),
            entry(customer, DebtType::Owe, 400),
        ];
        let balance = CustomerBalance::from_transactions(&entries);
        assert_eq!(balance.owed, Money::from_units(1000));
        assert_eq!(balance.owe, Money::from_units(400));
        assert_eq!(balance.net, Money::from_units(600));
    }

    #[test]
    fn test_balance_of_extreme_amounts_saturates() {
        let customer = DebtCustomerId::new();
        let mut huge = entry(customer, DebtType::Owed, 0);
        huge.amount = Money::parse("79228162514264337593543950335").unwrap();
        let entries = vec![huge.clone(), huge, entry(customer, DebtType::Owe, 1)];

        let balance = CustomerBalance::from_transactions(&entries);
        assert_eq!(balance.owed.amount(), rust_decimal::Decimal::MAX);
        assert_eq!(balance.owe, Money::from_units(1));
    }

    #[test]
    fn test_empty_balance_is_zero() {
        let none: Vec<DebtTransaction> = Vec::new();
        let balance = CustomerBalance::from_transactions(&none);
        assert_eq!(balance, CustomerBalance::default());
    }

    #[test]
    fn test_serialized_type_field() {
        let t = entry(DebtCustomerId::new(), DebtType::Owe, 5);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "owe");
        assert_eq!(json["status"], "pending");
        assert!(json.get("customerId").is_some());
    }
}

//! Account models
//!
//! Bank and cash accounts live in separate collections but share the
//! dual-currency balance pair. `AccountRef` is the tagged reference used
//! everywhere else in the ledger to point at one of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::ids::{BankAccountId, CashAccountId};
use super::money::{Balances, Currency, Money};

/// Reference to an account of either class
///
/// The external form is a class-tagged key (`bank-<uuid>` or
/// `cash-<uuid>`). It is parsed once at the boundary; downstream code
/// matches on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountRef {
    Bank(BankAccountId),
    Cash(CashAccountId),
}

impl AccountRef {
    /// Full composite key, e.g. `bank-550e8400-e29b-...`
    pub fn key(&self) -> String {
        match self {
            Self::Bank(id) => id.key(),
            Self::Cash(id) => id.key(),
        }
    }

    pub fn is_bank(&self) -> bool {
        matches!(self, Self::Bank(_))
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bank(id) => write!(f, "{}", id),
            Self::Cash(id) => write!(f, "{}", id),
        }
    }
}

/// Error parsing an account reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRefParseError(pub String);

impl fmt::Display for AccountRefParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid account reference '{}': expected bank-<id> or cash-<id>",
            self.0
        )
    }
}

impl std::error::Error for AccountRefParseError {}

impl FromStr for AccountRef {
    type Err = AccountRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || AccountRefParseError(s.to_string());
        if let Some(rest) = s.strip_prefix(BankAccountId::PREFIX) {
            rest.parse().map(Self::Bank).map_err(|_| err())
        } else if let Some(rest) = s.strip_prefix(CashAccountId::PREFIX) {
            rest.parse().map(Self::Cash).map_err(|_| err())
        } else {
            Err(err())
        }
    }
}

impl Serialize for AccountRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

impl<'de> Deserialize<'de> for AccountRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: BankAccountId,

    /// Bank name (e.g., "Kuraimi")
    pub name: String,

    /// Account type as written by the user (e.g., "current", "savings")
    #[serde(rename = "type")]
    pub account_type: String,

    /// Account number
    pub number: String,

    #[serde(flatten)]
    pub balances: Balances,

    /// Balances at creation, used by reconciliation
    #[serde(default)]
    pub opening_balances: Balances,

    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the record was re-created by a backup restore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
}

impl BankAccount {
    /// Create a new bank account with an opening balance
    pub fn new(
        name: impl Into<String>,
        account_type: impl Into<String>,
        number: impl Into<String>,
        opening: Balances,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BankAccountId::new(),
            name: name.into(),
            account_type: account_type.into(),
            number: number.into(),
            balances: opening,
            opening_balances: opening,
            notes: String::new(),
            created_at: now,
            updated_at: now,
            restored_at: None,
        }
    }

    pub fn reference(&self) -> AccountRef {
        AccountRef::Bank(self.id)
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        if self.name.trim().is_empty() {
            return Err(AccountValidationError::MissingField("name"));
        }
        if self.account_type.trim().is_empty() {
            return Err(AccountValidationError::MissingField("type"));
        }
        if self.number.trim().is_empty() {
            return Err(AccountValidationError::MissingField("number"));
        }
        Ok(())
    }
}

/// Who physically holds a cash account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashLocation {
    Me,
    Mom,
    Wife,
    Other,
}

impl CashLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "me" => Some(Self::Me),
            "mom" => Some(Self::Mom),
            "wife" => Some(Self::Wife),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for CashLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Me => write!(f, "Me"),
            Self::Mom => write!(f, "Mom"),
            Self::Wife => write!(f, "Wife"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A cash holding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashAccount {
    pub id: CashAccountId,

    pub location: CashLocation,

    /// Free-text holder, required iff `location` is `Other`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_location: Option<String>,

    #[serde(flatten)]
    pub balances: Balances,

    #[serde(default)]
    pub opening_balances: Balances,

    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the record was re-created by a backup restore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
}

impl CashAccount {
    /// Create a new cash account with an opening balance
    pub fn new(location: CashLocation, other_location: Option<String>, opening: Balances) -> Self {
        let now = Utc::now();
        Self {
            id: CashAccountId::new(),
            location,
            other_location,
            balances: opening,
            opening_balances: opening,
            notes: String::new(),
            created_at: now,
            updated_at: now,
            restored_at: None,
        }
    }

    pub fn reference(&self) -> AccountRef {
        AccountRef::Cash(self.id)
    }

    /// Human-readable holder name
    pub fn location_label(&self) -> String {
        match (&self.location, &self.other_location) {
            (CashLocation::Other, Some(other)) => other.clone(),
            (location, _) => format!("Cash ({})", location),
        }
    }

    /// Validate the location pair
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        let has_other = self
            .other_location
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());

        match (self.location, has_other) {
            (CashLocation::Other, false) => {
                Err(AccountValidationError::MissingField("otherLocation"))
            }
            (CashLocation::Other, true) => Ok(()),
            (_, true) => Err(AccountValidationError::UnexpectedOtherLocation),
            (_, false) => Ok(()),
        }
    }
}

/// Either class of account, for code that treats them uniformly
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum Account {
    Bank(BankAccount),
    Cash(CashAccount),
}

impl Account {
    pub fn reference(&self) -> AccountRef {
        match self {
            Self::Bank(a) => a.reference(),
            Self::Cash(a) => a.reference(),
        }
    }

    pub fn balances(&self) -> Balances {
        match self {
            Self::Bank(a) => a.balances,
            Self::Cash(a) => a.balances,
        }
    }

    pub fn opening_balances(&self) -> Balances {
        match self {
            Self::Bank(a) => a.opening_balances,
            Self::Cash(a) => a.opening_balances,
        }
    }

    pub fn balance(&self, currency: Currency) -> Money {
        self.balances().get(currency)
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Bank(a) => a.name.clone(),
            Self::Cash(a) => a.location_label(),
        }
    }

    pub fn notes(&self) -> &str {
        match self {
            Self::Bank(a) => &a.notes,
            Self::Cash(a) => &a.notes,
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.reference())
    }
}

/// Input for creating an account
#[derive(Debug, Clone)]
pub enum AccountSpec {
    Bank {
        name: String,
        account_type: String,
        number: String,
        opening: Balances,
        notes: String,
    },
    Cash {
        location: CashLocation,
        other_location: Option<String>,
        opening: Balances,
        notes: String,
    },
}

/// Validation errors for accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    MissingField(&'static str),
    UnexpectedOtherLocation,
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "Account {} is required", field),
            Self::UnexpectedOtherLocation => {
                write!(f, "otherLocation is only allowed when location is 'other'")
            }
        }
    }
}

impl std::error::Error for AccountValidationError {}

//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod account;
pub mod backup;
pub mod category;
pub mod debt;
pub mod entry;
pub mod reconcile;
pub mod summary;
pub mod transaction;
pub mod transfer;
pub mod user;

pub use account::{handle_account_command, AccountCommands};
pub use backup::{handle_backup_command, BackupCommands};
pub use category::{handle_category_command, CategoryCommands};
pub use debt::{handle_debt_command, DebtCommands};
pub use entry::{handle_entry_command, EntryCommands};
pub use reconcile::handle_reconcile_command;
pub use summary::handle_summary_command;
pub use transaction::{handle_transaction_command, TransactionCommands};
pub use transfer::{handle_transfer_command, TransferArgs};
pub use user::{handle_user_command, UserCommands};

use chrono::NaiveDate;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Balances, CategoryKind, Currency, Money};

/// Parse a user-entered amount
pub(crate) fn parse_amount(input: &str) -> LedgerResult<Money> {
    Money::parse(input).map_err(|e| {
        LedgerError::Validation(format!(
            "Invalid amount format: '{}'. Use format like '100.50' or '100'. Error: {}",
            input, e
        ))
    })
}

/// Parse a YYYY-MM-DD date
pub(crate) fn parse_date(input: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        LedgerError::Validation(format!("Invalid date format: '{}'. Use YYYY-MM-DD", input))
    })
}

/// Parse an optional date, defaulting to today
pub(crate) fn date_or_today(input: Option<&str>) -> LedgerResult<NaiveDate> {
    match input {
        Some(date) => parse_date(date),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub(crate) fn parse_currency(input: &str) -> LedgerResult<Currency> {
    Currency::parse(input).ok_or_else(|| {
        LedgerError::Validation(format!(
            "Invalid currency: '{}'. Valid currencies: YER, SAR",
            input
        ))
    })
}

pub(crate) fn parse_category_kind(input: &str) -> LedgerResult<CategoryKind> {
    match input.trim().to_lowercase().as_str() {
        "income" => Ok(CategoryKind::Income),
        "expense" => Ok(CategoryKind::Expense),
        _ => Err(LedgerError::Validation(format!(
            "Invalid category kind: '{}'. Valid kinds: income, expense",
            input
        ))),
    }
}

/// Parse an opening balance pair
pub(crate) fn parse_balances(yer: &str, sar: &str) -> LedgerResult<Balances> {
    Ok(Balances::new(parse_amount(yer)?, parse_amount(sar)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_amount("1,100.50").unwrap().to_string(), "1100.5");
        assert!(parse_amount("abc").unwrap_err().is_validation());

        assert_eq!(
            parse_date("2025-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert!(parse_date("03/01/2025").is_err());
        assert!(date_or_today(None).is_ok());

        assert_eq!(parse_currency("sar").unwrap(), Currency::Sar);
        assert!(parse_currency("USD").is_err());
        assert_eq!(parse_category_kind("Expense").unwrap(), CategoryKind::Expense);
    }
}

//! Transaction CLI commands
//!
//! Works on the ledger side: listing with filters, and edits or deletes that
//! cascade to a linked income/expense item.

use clap::Subcommand;

use crate::display::transaction::{
    format_transaction_details, format_transaction_register, AccountNames,
};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CategoryKind, TransactionKind, TransactionType};
use crate::services::{
    AccountService, CategoryService, LedgerService, TransactionEdit, TransactionFilter,
};
use crate::storage::Storage;

use super::{parse_amount, parse_currency, parse_date};

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// List transactions, newest first
    List {
        /// Filter by type (income, expense, transfer)
        #[arg(short = 't', long = "type")]
        transaction_type: Option<String>,
        /// Filter by account name or ID
        #[arg(short, long)]
        account: Option<String>,
        /// Filter by currency
        #[arg(short, long)]
        currency: Option<String>,
        /// Earliest date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Number of transactions to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show transaction details
    Show {
        /// Transaction ID
        id: String,
    },

    /// Edit a transaction; balances are corrected
    Edit {
        /// Transaction ID
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// New account (income/expense)
        #[arg(short, long)]
        account: Option<String>,
        /// New category name or ID (income/expense)
        #[arg(long)]
        category: Option<String>,
        /// New source account (transfer)
        #[arg(long)]
        from_account: Option<String>,
        /// New destination account (transfer)
        #[arg(long)]
        to_account: Option<String>,
    },

    /// Delete a transaction and reverse its effect
    Delete {
        /// Transaction ID
        id: String,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(
    storage: &Storage,
    cmd: TransactionCommands,
) -> LedgerResult<()> {
    let ledger = LedgerService::new(storage);
    let accounts = AccountService::new(storage);

    match cmd {
        TransactionCommands::List {
            transaction_type,
            account,
            currency,
            from,
            to,
            limit,
        } => {
            let transaction_type = transaction_type
                .as_deref()
                .map(|t| {
                    TransactionType::parse(t).ok_or_else(|| {
                        LedgerError::Validation(format!(
                            "Invalid transaction type: '{}'. Valid types: income, expense, transfer",
                            t
                        ))
                    })
                })
                .transpose()?;

            let filter = TransactionFilter {
                transaction_type,
                account: account
                    .as_deref()
                    .map(|a| accounts.resolve(a).map(|a| a.reference()))
                    .transpose()?,
                currency: currency.as_deref().map(parse_currency).transpose()?,
                from: from.as_deref().map(parse_date).transpose()?,
                to: to.as_deref().map(parse_date).transpose()?,
                limit: Some(limit),
            };

            let transactions = ledger.list_transactions(&filter)?;
            let names = AccountNames::new(&accounts.list()?);
            print!("{}", format_transaction_register(&transactions, &names));
        }

        TransactionCommands::Show { id } => {
            let transaction = ledger.resolve_transaction(&id)?;
            let names = AccountNames::new(&accounts.list()?);
            print!("{}", format_transaction_details(&transaction, &names));
        }

        TransactionCommands::Edit {
            id,
            description,
            amount,
            currency,
            date,
            notes,
            account,
            category,
            from_account,
            to_account,
        } => {
            let transaction = ledger.resolve_transaction(&id)?;

            let category = match (category, &transaction.kind) {
                (Some(category), TransactionKind::Income { .. }) => Some(
                    CategoryService::new(storage)
                        .resolve(CategoryKind::Income, &category)?
                        .id,
                ),
                (Some(category), TransactionKind::Expense { .. }) => Some(
                    CategoryService::new(storage)
                        .resolve(CategoryKind::Expense, &category)?
                        .id,
                ),
                (Some(_), TransactionKind::Transfer { .. }) => {
                    return Err(LedgerError::Validation(
                        "Transfers have no category".into(),
                    ))
                }
                (None, _) => None,
            };

            let resolve = |a: Option<String>| -> LedgerResult<_> {
                a.as_deref()
                    .map(|a| accounts.resolve(a).map(|a| a.reference()))
                    .transpose()
            };

            let edit = TransactionEdit {
                description,
                date: date.as_deref().map(parse_date).transpose()?,
                currency: currency.as_deref().map(parse_currency).transpose()?,
                amount: amount.as_deref().map(parse_amount).transpose()?,
                notes,
                account: resolve(account)?,
                category,
                from_account: resolve(from_account)?,
                to_account: resolve(to_account)?,
            };

            let edited = ledger.edit_transaction(transaction.id, &edit)?;
            println!("Updated transaction: {}", edited);
        }

        TransactionCommands::Delete { id } => {
            let transaction = ledger.resolve_transaction(&id)?;
            let deleted = ledger.delete_transaction(transaction.id)?;
            println!("Deleted transaction: {}", transaction);
            if let Some(item) = deleted.item {
                println!("  Linked {} removed: {}", item.kind, item.id);
            }
        }
    }

    Ok(())
}

//! CLI command handler for account transfers
//!
//! A transfer is a single transaction that debits one account and credits
//! another in the same currency.

use clap::Args;

use crate::display::transaction::{format_transaction_details, AccountNames};
use crate::error::LedgerResult;
use crate::services::{AccountService, LedgerService, TransferInput};
use crate::storage::Storage;

use super::{date_or_today, parse_amount, parse_currency};

/// Arguments of the transfer command
#[derive(Args)]
pub struct TransferArgs {
    /// Source account name or ID
    pub from: String,
    /// Destination account name or ID
    pub to: String,
    /// Amount to move
    pub amount: String,
    /// Currency (YER or SAR)
    #[arg(long, default_value = "YER")]
    pub currency: String,
    /// Date (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,
    /// Description
    #[arg(long, default_value = "Transfer")]
    pub description: String,
    /// Notes
    #[arg(short, long)]
    pub notes: Option<String>,
}

/// Handle the transfer command
pub fn handle_transfer_command(storage: &Storage, args: TransferArgs) -> LedgerResult<()> {
    let account_service = AccountService::new(storage);
    let ledger = LedgerService::new(storage);

    let from_account = account_service.resolve(&args.from)?;
    let to_account = account_service.resolve(&args.to)?;

    let input = TransferInput {
        description: args.description,
        date: date_or_today(args.date.as_deref())?,
        currency: parse_currency(&args.currency)?,
        amount: parse_amount(&args.amount)?,
        from_account: from_account.reference(),
        to_account: to_account.reference(),
        notes: args.notes.unwrap_or_default(),
    };

    let transaction = ledger.record_transfer(&input)?;
    let names = AccountNames::new(&account_service.list()?);

    println!("Transfer created:");
    print!("{}", format_transaction_details(&transaction, &names));

    Ok(())
}

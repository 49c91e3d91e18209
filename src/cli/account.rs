//! Account CLI commands
//!
//! Implements CLI commands for bank and cash account management.

use clap::Subcommand;

use crate::display::account::{format_account_details, format_account_list};
use crate::display::transaction::{format_transaction_register, AccountNames};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountSpec, CashLocation};
use crate::services::{AccountService, AccountUpdate, LedgerService, TransactionFilter};
use crate::storage::Storage;

use super::parse_balances;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a bank account
    CreateBank {
        /// Bank name
        name: String,
        /// Account type (e.g., current, savings)
        #[arg(short = 't', long, default_value = "current")]
        account_type: String,
        /// Account number
        #[arg(short, long)]
        number: String,
        /// Opening YER balance
        #[arg(long, default_value = "0")]
        yer: String,
        /// Opening SAR balance
        #[arg(long, default_value = "0")]
        sar: String,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Create a cash account
    CreateCash {
        /// Holder (me, mom, wife, other)
        location: String,
        /// Holder name when the location is 'other'
        #[arg(short, long)]
        other: Option<String>,
        /// Opening YER balance
        #[arg(long, default_value = "0")]
        yer: String,
        /// Opening SAR balance
        #[arg(long, default_value = "0")]
        sar: String,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List accounts
    List {
        /// Only bank accounts
        #[arg(long, conflicts_with = "cash")]
        bank: bool,
        /// Only cash accounts
        #[arg(long)]
        cash: bool,
    },
    /// Show account details and recent transactions
    Show {
        /// Account name or ID
        account: String,
    },
    /// Edit an account's descriptive fields
    Edit {
        /// Account name or ID
        account: String,
        /// New bank name
        #[arg(short, long)]
        name: Option<String>,
        /// New bank account type
        #[arg(short = 't', long)]
        account_type: Option<String>,
        /// New bank account number
        #[arg(long)]
        number: Option<String>,
        /// New cash location
        #[arg(short, long)]
        location: Option<String>,
        /// New holder name for 'other' cash
        #[arg(short, long)]
        other: Option<String>,
        /// New notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete an account (transactions that reference it are kept)
    Delete {
        /// Account name or ID
        account: String,
    },
}

fn parse_location(input: &str) -> LedgerResult<CashLocation> {
    CashLocation::parse(input).ok_or_else(|| {
        LedgerError::Validation(format!(
            "Invalid cash location: '{}'. Valid locations: me, mom, wife, other",
            input
        ))
    })
}

/// Handle an account command
pub fn handle_account_command(storage: &Storage, cmd: AccountCommands) -> LedgerResult<()> {
    let service = AccountService::new(storage);

    match cmd {
        AccountCommands::CreateBank {
            name,
            account_type,
            number,
            yer,
            sar,
            notes,
        } => {
            let opening = parse_balances(&yer, &sar)?;
            let account = service.create(AccountSpec::Bank {
                name,
                account_type,
                number,
                opening,
                notes: notes.unwrap_or_default(),
            })?;

            println!("Created bank account: {}", account.display_name());
            println!("  YER: {}", account.balances().yer);
            println!("  SAR: {}", account.balances().sar);
            println!("  ID:  {}", account.reference());
        }

        AccountCommands::CreateCash {
            location,
            other,
            yer,
            sar,
            notes,
        } => {
            let location = parse_location(&location)?;
            let opening = parse_balances(&yer, &sar)?;
            let account = service.create(AccountSpec::Cash {
                location,
                other_location: other,
                opening,
                notes: notes.unwrap_or_default(),
            })?;

            println!("Created cash account: {}", account.display_name());
            println!("  YER: {}", account.balances().yer);
            println!("  SAR: {}", account.balances().sar);
            println!("  ID:  {}", account.reference());
        }

        AccountCommands::List { bank, cash } => {
            let accounts: Vec<Account> = if bank {
                service.list_bank()?.into_iter().map(Account::Bank).collect()
            } else if cash {
                service.list_cash()?.into_iter().map(Account::Cash).collect()
            } else {
                service.list()?
            };
            print!("{}", format_account_list(&accounts));
        }

        AccountCommands::Show { account } => {
            let found = service.resolve(&account)?;
            print!("{}", format_account_details(&found));

            let recent = LedgerService::new(storage).list_transactions(&TransactionFilter {
                account: Some(found.reference()),
                limit: Some(10),
                ..Default::default()
            })?;
            if !recent.is_empty() {
                let names = AccountNames::new(&service.list()?);
                println!();
                println!("Recent transactions:");
                print!("{}", format_transaction_register(&recent, &names));
            }
        }

        AccountCommands::Edit {
            account,
            name,
            account_type,
            number,
            location,
            other,
            notes,
        } => {
            let found = service.resolve(&account)?;

            let location = location.as_deref().map(parse_location).transpose()?;
            let update = AccountUpdate {
                name,
                account_type,
                number,
                location,
                other_location: other.map(Some),
                notes,
            };

            if update.name.is_none()
                && update.account_type.is_none()
                && update.number.is_none()
                && update.location.is_none()
                && update.other_location.is_none()
                && update.notes.is_none()
            {
                println!("No changes specified.");
                return Ok(());
            }

            let updated = service.update(found.reference(), update)?;
            println!("Updated account: {}", updated.display_name());
        }

        AccountCommands::Delete { account } => {
            let found = service.resolve(&account)?;
            let deleted = service.delete(found.reference())?;
            println!("Deleted account: {}", deleted.display_name());
        }
    }

    Ok(())
}

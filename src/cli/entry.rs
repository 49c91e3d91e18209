//! Income and expense CLI commands
//!
//! The same subcommands serve both `ledger income` and `ledger expense`;
//! the item kind decides which registry and collection are used.

use clap::Subcommand;

use crate::display::transaction::{format_item_list, AccountNames};
use crate::error::LedgerResult;
use crate::models::{ItemInput, ItemKind};
use crate::services::{AccountService, CategoryService, LedgerService};
use crate::storage::Storage;

use super::{date_or_today, parse_amount, parse_currency, parse_date};

/// Income/expense subcommands
#[derive(Subcommand)]
pub enum EntryCommands {
    /// Record an entry and its ledger transaction
    Add {
        /// Description
        description: String,
        /// Amount (e.g., "1500" or "1500.50")
        amount: String,
        /// Account name or ID
        #[arg(short, long)]
        account: String,
        /// Category name or ID
        #[arg(short, long)]
        category: String,
        /// Currency (YER or SAR)
        #[arg(long, default_value = "YER")]
        currency: String,
        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List entries, newest first
    List {
        /// Number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Edit an entry; the account balances are corrected
    Edit {
        /// Entry ID
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        /// Account name or ID
        #[arg(short, long)]
        account: Option<String>,
        /// Category name or ID
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete an entry and reverse its effect
    Delete {
        /// Entry ID
        id: String,
    },
}

/// Handle an income or expense command
pub fn handle_entry_command(
    storage: &Storage,
    kind: ItemKind,
    cmd: EntryCommands,
) -> LedgerResult<()> {
    let ledger = LedgerService::new(storage);
    let accounts = AccountService::new(storage);
    let categories = CategoryService::new(storage);

    match cmd {
        EntryCommands::Add {
            description,
            amount,
            account,
            category,
            currency,
            date,
            notes,
        } => {
            let account = accounts.resolve(&account)?;
            let category = categories.resolve(kind.category_kind(), &category)?;
            let input = ItemInput {
                category: category.id,
                description,
                date: date_or_today(date.as_deref())?,
                currency: parse_currency(&currency)?,
                amount: parse_amount(&amount)?,
                account: account.reference(),
                notes: notes.unwrap_or_default(),
            };

            let recorded = ledger.record_item(kind, &input)?;
            let balance = accounts
                .get(account.reference())?
                .map(|a| a.balance(input.currency))
                .unwrap_or_default();

            println!("Recorded {}: {}", kind, recorded.item);
            println!("  Account: {}", account.display_name());
            println!("  Balance: {} {}", balance, input.currency);
            println!("  ID:      {}", recorded.item.id);
        }

        EntryCommands::List { limit } => {
            let mut items = ledger.list_items(kind)?;
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            let names = AccountNames::new(&accounts.list()?);
            print!("{}", format_item_list(&items, &names));
        }

        EntryCommands::Edit {
            id,
            description,
            amount,
            account,
            category,
            currency,
            date,
            notes,
        } => {
            let item = ledger.resolve_item(kind, &id)?;

            let mut input = ItemInput {
                category: item.category,
                description: item.description.clone(),
                date: item.date,
                currency: item.currency,
                amount: item.amount,
                account: item.account,
                notes: item.notes.clone(),
            };
            if let Some(description) = description {
                input.description = description;
            }
            if let Some(amount) = amount {
                input.amount = parse_amount(&amount)?;
            }
            if let Some(account) = account {
                input.account = accounts.resolve(&account)?.reference();
            }
            if let Some(category) = category {
                input.category = categories.resolve(kind.category_kind(), &category)?.id;
            }
            if let Some(currency) = currency {
                input.currency = parse_currency(&currency)?;
            }
            if let Some(date) = date {
                input.date = parse_date(&date)?;
            }
            if let Some(notes) = notes {
                input.notes = notes;
            }

            let edited = ledger.edit_item(kind, item.id, &input)?;
            println!("Updated {}: {}", kind, edited.item);
        }

        EntryCommands::Delete { id } => {
            let item = ledger.resolve_item(kind, &id)?;
            ledger.delete_item(kind, item.id)?;
            println!("Deleted {}: {}", kind, item);
        }
    }

    Ok(())
}

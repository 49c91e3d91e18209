//! Debt subledger CLI commands
//!
//! Customers and the debts recorded against them. Debts never touch
//! account balances.

use clap::Subcommand;

use crate::display::debt::{format_customer_details, format_customer_list, format_debt_list};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{DebtStatus, DebtTransactionInput, DebtType};
use crate::services::{CustomerFields, DebtService};
use crate::storage::Storage;

use super::{date_or_today, parse_amount, parse_currency, parse_date};

/// Debt subcommands
#[derive(Subcommand)]
pub enum DebtCommands {
    /// Add a customer
    AddCustomer {
        /// Customer name
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// List customers with their balances
    Customers,

    /// Show a customer, their balance and debts
    Customer {
        /// Customer name or ID
        customer: String,
    },

    /// Edit a customer
    EditCustomer {
        /// Customer name or ID
        customer: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a customer and all of their debts
    DeleteCustomer {
        /// Customer name or ID
        customer: String,
    },

    /// Record a debt
    Record {
        /// Customer name or ID
        customer: String,
        /// Direction: 'owed' (they owe you) or 'owe' (you owe them)
        debt_type: String,
        /// Amount
        amount: String,
        /// Description
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "YER")]
        currency: String,
        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Status (pending, paid, overdue)
        #[arg(long, default_value = "pending")]
        status: String,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List debts, newest first
    List {
        /// Only debts of this customer
        #[arg(short, long)]
        customer: Option<String>,
    },

    /// Edit a debt
    Edit {
        /// Debt ID
        id: String,
        #[arg(short = 't', long = "type")]
        debt_type: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Set a debt's status
    Status {
        /// Debt ID
        id: String,
        /// New status (pending, paid, overdue)
        status: String,
    },

    /// Delete a debt
    Delete {
        /// Debt ID
        id: String,
    },

    /// Show the debt position across all customers
    Totals,
}

fn parse_debt_type(input: &str) -> LedgerResult<DebtType> {
    DebtType::parse(input).ok_or_else(|| {
        LedgerError::Validation(format!(
            "Invalid debt type: '{}'. Valid types: owed, owe",
            input
        ))
    })
}

fn parse_status(input: &str) -> LedgerResult<DebtStatus> {
    DebtStatus::parse(input).ok_or_else(|| {
        LedgerError::Validation(format!(
            "Invalid status: '{}'. Valid statuses: pending, paid, overdue",
            input
        ))
    })
}

/// Handle a debt command
pub fn handle_debt_command(storage: &Storage, cmd: DebtCommands) -> LedgerResult<()> {
    let service = DebtService::new(storage);

    match cmd {
        DebtCommands::AddCustomer {
            name,
            phone,
            email,
            address,
            notes,
        } => {
            let customer = service.create_customer(&CustomerFields {
                name: Some(name),
                phone,
                email,
                address,
                notes,
            })?;
            println!("Created customer: {}", customer.name);
            println!("  ID: {}", customer.id);
        }

        DebtCommands::Customers => {
            let rows = service
                .list_customers()?
                .into_iter()
                .map(|c| {
                    let balance = service.customer_balance(c.id)?;
                    Ok::<_, LedgerError>((c, balance))
                })
                .collect::<LedgerResult<Vec<_>>>()?;
            print!("{}", format_customer_list(&rows));
        }

        DebtCommands::Customer { customer } => {
            let customer = service.resolve_customer(&customer)?;
            let balance = service.customer_balance(customer.id)?;
            print!("{}", format_customer_details(&customer, &balance));
            println!();
            print!("{}", format_debt_list(&service.list(Some(customer.id))?));
        }

        DebtCommands::EditCustomer {
            customer,
            name,
            phone,
            email,
            address,
            notes,
        } => {
            let found = service.resolve_customer(&customer)?;
            let fields = CustomerFields {
                name,
                phone,
                email,
                address,
                notes,
            };
            let updated = service.update_customer(found.id, &fields)?;
            println!("Updated customer: {}", updated.name);
        }

        DebtCommands::DeleteCustomer { customer } => {
            let found = service.resolve_customer(&customer)?;
            let (deleted, debts) = service.delete_customer(found.id)?;
            println!(
                "Deleted customer: {} ({} debt(s) removed)",
                deleted.name,
                debts.len()
            );
        }

        DebtCommands::Record {
            customer,
            debt_type,
            amount,
            description,
            currency,
            date,
            due,
            status,
            notes,
        } => {
            let customer = service.resolve_customer(&customer)?;
            let input = DebtTransactionInput {
                debt_type: parse_debt_type(&debt_type)?,
                description,
                date: date_or_today(date.as_deref())?,
                currency: parse_currency(&currency)?,
                amount: parse_amount(&amount)?,
                due_date: due.as_deref().map(parse_date).transpose()?,
                status: parse_status(&status)?,
                notes: notes.unwrap_or_default(),
            };

            let entry = service.record(customer.id, &input)?;
            let balance = service.customer_balance(customer.id)?;

            println!(
                "Recorded debt: {} {} {} ({})",
                entry.debt_type, entry.amount, entry.currency, customer.name
            );
            println!("  Net balance: {}", balance.net);
            println!("  ID: {}", entry.id);
        }

        DebtCommands::List { customer } => {
            let customer = customer
                .as_deref()
                .map(|c| service.resolve_customer(c).map(|c| c.id))
                .transpose()?;
            print!("{}", format_debt_list(&service.list(customer)?));
        }

        DebtCommands::Edit {
            id,
            debt_type,
            amount,
            description,
            currency,
            date,
            due,
            clear_due,
            notes,
        } => {
            let entry = service.resolve(&id)?;

            let mut input = DebtTransactionInput {
                debt_type: entry.debt_type,
                description: entry.description.clone(),
                date: entry.date,
                currency: entry.currency,
                amount: entry.amount,
                due_date: entry.due_date,
                status: entry.status,
                notes: entry.notes.clone(),
            };
            if let Some(debt_type) = debt_type {
                input.debt_type = parse_debt_type(&debt_type)?;
            }
            if let Some(amount) = amount {
                input.amount = parse_amount(&amount)?;
            }
            if let Some(description) = description {
                input.description = description;
            }
            if let Some(currency) = currency {
                input.currency = parse_currency(&currency)?;
            }
            if let Some(date) = date {
                input.date = parse_date(&date)?;
            }
            if let Some(due) = due {
                input.due_date = Some(parse_date(&due)?);
            }
            if clear_due {
                input.due_date = None;
            }
            if let Some(notes) = notes {
                input.notes = notes;
            }

            let edited = service.edit(entry.id, &input)?;
            println!(
                "Updated debt: {} {} {} {}",
                edited.id, edited.debt_type, edited.amount, edited.currency
            );
        }

        DebtCommands::Status { id, status } => {
            let entry = service.resolve(&id)?;
            let updated = service.set_status(entry.id, parse_status(&status)?)?;
            println!("Debt {} is now {}", updated.id, updated.status);
        }

        DebtCommands::Delete { id } => {
            let entry = service.resolve(&id)?;
            let deleted = service.delete(entry.id)?;
            println!(
                "Deleted debt: {} {} {}",
                deleted.description, deleted.amount, deleted.currency
            );
        }

        DebtCommands::Totals => {
            let totals = service.totals()?;
            println!("Debt Position ({} customers)", totals.customers);
            println!("{:<8}  {:>14}  {:>14}  {:>14}", "", "Owed", "Owe", "Net");
            for (label, balance) in [
                ("YER", totals.yer),
                ("SAR", totals.sar),
                ("All", totals.overall),
            ] {
                println!(
                    "{:<8}  {:>14}  {:>14}  {:>14}",
                    label,
                    balance.owed.to_string(),
                    balance.owe.to_string(),
                    balance.net.to_string()
                );
            }
        }
    }

    Ok(())
}

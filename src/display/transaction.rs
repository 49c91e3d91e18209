//! Transaction and item display formatting
//!
//! Account columns show the account's name when it still exists and the
//! short reference otherwise, since deleted accounts may still be referenced.

use std::collections::HashMap;

use crate::models::{Account, AccountRef, Item, Transaction, TransactionKind};

use super::truncate;

/// Account names by reference, for table rendering
pub struct AccountNames {
    names: HashMap<AccountRef, String>,
}

impl AccountNames {
    pub fn new(accounts: &[Account]) -> Self {
        Self {
            names: accounts
                .iter()
                .map(|a| (a.reference(), a.display_name()))
                .collect(),
        }
    }

    pub fn name(&self, reference: AccountRef) -> String {
        self.names
            .get(&reference)
            .cloned()
            .unwrap_or_else(|| format!("{} (deleted)", reference))
    }
}

/// Format a single transaction as one register row
pub fn format_transaction_row(txn: &Transaction, names: &AccountNames) -> String {
    let (target, category) = match &txn.kind {
        TransactionKind::Income {
            account,
            category_name,
            ..
        }
        | TransactionKind::Expense {
            account,
            category_name,
            ..
        } => (names.name(*account), category_name.clone()),
        TransactionKind::Transfer {
            from_account,
            to_account,
        } => (
            format!("{} -> {}", names.name(*from_account), names.name(*to_account)),
            String::new(),
        ),
    };

    let sign = match txn.kind {
        TransactionKind::Income { .. } => "+",
        TransactionKind::Expense { .. } => "-",
        TransactionKind::Transfer { .. } => " ",
    };

    format!(
        "{:<12}  {}  {:<8}  {:<24}  {:<28}  {:<14}  {}{:>12} {}",
        txn.id.to_string(),
        txn.date.format("%Y-%m-%d"),
        txn.transaction_type().to_string(),
        truncate(&txn.description, 24),
        truncate(&target, 28),
        truncate(&category, 14),
        sign,
        txn.amount.to_string(),
        txn.currency,
    )
}

/// Format a list of transactions as a register
pub fn format_transaction_register(transactions: &[Transaction], names: &AccountNames) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<10}  {:<8}  {:<24}  {:<28}  {:<14}  {:>17}\n",
        "ID", "Date", "Type", "Description", "Account", "Category", "Amount"
    ));
    output.push_str(&"-".repeat(133));
    output.push('\n');

    for txn in transactions {
        output.push_str(&format_transaction_row(txn, names));
        output.push('\n');
    }

    output
}

/// Format transaction details
pub fn format_transaction_details(txn: &Transaction, names: &AccountNames) -> String {
    let mut output = String::new();

    output.push_str(&format!("Transaction: {}\n", txn.id.key()));
    output.push_str(&format!("  Type:        {}\n", txn.transaction_type()));
    output.push_str(&format!("  Date:        {}\n", txn.date));
    output.push_str(&format!("  Description: {}\n", txn.description));
    output.push_str(&format!("  Amount:      {} {}\n", txn.amount, txn.currency));

    match &txn.kind {
        TransactionKind::Income {
            account,
            category_name,
            ..
        }
        | TransactionKind::Expense {
            account,
            category_name,
            ..
        } => {
            output.push_str(&format!("  Account:     {}\n", names.name(*account)));
            output.push_str(&format!("  Category:    {}\n", category_name));
        }
        TransactionKind::Transfer {
            from_account,
            to_account,
        } => {
            output.push_str(&format!("  From:        {}\n", names.name(*from_account)));
            output.push_str(&format!("  To:          {}\n", names.name(*to_account)));
        }
    }

    if let Some(item_id) = txn.item_id {
        output.push_str(&format!("  Item:        {}\n", item_id));
    }
    if !txn.notes.is_empty() {
        output.push_str(&format!("  Notes:       {}\n", txn.notes));
    }

    output
}

/// Format income or expense items as a table
pub fn format_item_list(items: &[Item], names: &AccountNames) -> String {
    if items.is_empty() {
        return "No entries found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<13}  {:<10}  {:<24}  {:<16}  {:<20}  {:>16}\n",
        "ID", "Date", "Description", "Category", "Account", "Amount"
    ));
    output.push_str(&"-".repeat(108));
    output.push('\n');

    for item in items {
        output.push_str(&format!(
            "{:<13}  {}  {:<24}  {:<16}  {:<20}  {:>12} {}\n",
            item.id.to_string(),
            item.date.format("%Y-%m-%d"),
            truncate(&item.description, 24),
            truncate(&item.category_name, 16),
            truncate(&names.name(item.account), 20),
            item.amount.to_string(),
            item.currency,
        ));
    }

    output
}

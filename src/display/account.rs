//! Account display formatting
//!
//! Formats accounts for terminal output in table and detail views.

use crate::models::{Account, Balances};

/// Format accounts with both currency balances as a table
pub fn format_account_list(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts found.\n".to_string();
    }

    let name_width = accounts
        .iter()
        .map(|a| a.display_name().chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<14}  {:<5}  {:<name_width$}  {:>14}  {:>14}\n",
        "ID",
        "Class",
        "Name",
        "YER",
        "SAR",
        name_width = name_width,
    ));
    output.push_str(&separator(name_width));

    for account in accounts {
        let class = match account {
            Account::Bank(_) => "bank",
            Account::Cash(_) => "cash",
        };
        let balances = account.balances();
        output.push_str(&format!(
            "{:<14}  {:<5}  {:<name_width$}  {:>14}  {:>14}\n",
            account.reference().to_string(),
            class,
            account.display_name(),
            balances.yer.to_string(),
            balances.sar.to_string(),
            name_width = name_width,
        ));
    }

    let total = accounts
        .iter()
        .fold(Balances::default(), |sum, a| sum + a.balances());

    output.push_str(&separator(name_width));
    output.push_str(&format!(
        "{:<14}  {:<5}  {:<name_width$}  {:>14}  {:>14}\n",
        "TOTAL",
        "",
        "",
        total.yer.to_string(),
        total.sar.to_string(),
        name_width = name_width,
    ));

    output
}

fn separator(name_width: usize) -> String {
    format!(
        "{:-<14}  {:-<5}  {:-<name_width$}  {:->14}  {:->14}\n",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
    )
}

/// Format a single account's details
pub fn format_account_details(account: &Account) -> String {
    let mut output = String::new();

    output.push_str(&format!("Account: {}\n", account.display_name()));
    output.push_str(&format!("  ID:             {}\n", account.reference().key()));

    match account {
        Account::Bank(bank) => {
            output.push_str(&format!("  Type:           {}\n", bank.account_type));
            output.push_str(&format!("  Number:         {}\n", bank.number));
        }
        Account::Cash(cash) => {
            output.push_str(&format!("  Location:       {}\n", cash.location));
            if let Some(other) = &cash.other_location {
                output.push_str(&format!("  Held by:        {}\n", other));
            }
        }
    }

    let balances = account.balances();
    let opening = account.opening_balances();
    output.push_str(&format!("  Balance YER:    {}\n", balances.yer));
    output.push_str(&format!("  Balance SAR:    {}\n", balances.sar));
    output.push_str(&format!(
        "  Opening:        {} YER / {} SAR\n",
        opening.yer, opening.sar
    ));

    if !account.notes().is_empty() {
        output.push_str(&format!("  Notes:          {}\n", account.notes()));
    }

    output
}

//! Debt subledger display formatting

use crate::models::{CustomerBalance, DebtCustomer, DebtTransaction};

use super::truncate;

/// Format customers with their recomputed balances
pub fn format_customer_list(customers: &[(DebtCustomer, CustomerBalance)]) -> String {
    if customers.is_empty() {
        return "No customers found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<20}  {:<14}  {:>12}  {:>12}  {:>12}\n",
        "ID", "Name", "Phone", "Owed", "Owe", "Net"
    ));
    output.push_str(&"-".repeat(90));
    output.push('\n');

    for (customer, balance) in customers {
        output.push_str(&format!(
            "{:<12}  {:<20}  {:<14}  {:>12}  {:>12}  {:>12}\n",
            customer.id.to_string(),
            truncate(&customer.name, 20),
            truncate(&customer.phone, 14),
            balance.owed.to_string(),
            balance.owe.to_string(),
            balance.net.to_string(),
        ));
    }

    output
}

/// Format a customer's details and balance
pub fn format_customer_details(customer: &DebtCustomer, balance: &CustomerBalance) -> String {
    let mut output = String::new();
    output.push_str(&format!("Customer: {}\n", customer.name));
    output.push_str(&format!("  ID:      {}\n", customer.id.key()));
    for (label, value) in [
        ("Phone", &customer.phone),
        ("Email", &customer.email),
        ("Address", &customer.address),
        ("Notes", &customer.notes),
    ] {
        if !value.is_empty() {
            output.push_str(&format!("  {:<8} {}\n", format!("{}:", label), value));
        }
    }
    output.push_str(&format!("  Owed:    {}\n", balance.owed));
    output.push_str(&format!("  Owe:     {}\n", balance.owe));
    output.push_str(&format!("  Net:     {}\n", balance.net));
    output
}

/// Format debt transactions as a table
pub fn format_debt_list(entries: &[DebtTransaction]) -> String {
    if entries.is_empty() {
        return "No debt transactions found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<10}  {:<5}  {:<24}  {:>16}  {:<10}  {:<8}\n",
        "ID", "Date", "Type", "Description", "Amount", "Due", "Status"
    ));
    output.push_str(&"-".repeat(98));
    output.push('\n');

    for entry in entries {
        let due = entry
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        output.push_str(&format!(
            "{:<12}  {}  {:<5}  {:<24}  {:>12} {}  {:<10}  {:<8}\n",
            entry.id.to_string(),
            entry.date.format("%Y-%m-%d"),
            entry.debt_type.to_string(),
            truncate(&entry.description, 24),
            entry.amount.to_string(),
            entry.currency,
            due,
            entry.status.to_string(),
        ));
    }

    output
}

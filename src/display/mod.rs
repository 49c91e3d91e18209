//! Display formatting for terminal output
//!
//! Plain-text tables and detail views for the CLI.

pub mod account;
pub mod category;
pub mod debt;
pub mod summary;
pub mod transaction;

pub use account::{format_account_details, format_account_list};
pub use category::format_category_list;
pub use debt::{format_customer_details, format_customer_list, format_debt_list};
pub use summary::{format_reconciliation_report, format_summary};
pub use transaction::{
    format_item_list, format_transaction_details, format_transaction_register, AccountNames,
};

/// Cut a string to `max_len` characters, marking the cut with "..."
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

//! Dashboard and reconciliation report formatting

use crate::services::{LedgerSummary, ReconciliationReport};

/// Format the dashboard summary
pub fn format_summary(summary: &LedgerSummary) -> String {
    let mut output = String::new();
    let total = summary.total();
    let flow = summary.net_flow();

    output.push_str("Ledger Summary\n");
    output.push_str("==============\n");
    output.push_str(&format!("{:<22}  {:>14}  {:>14}\n", "", "YER", "SAR"));
    for (label, balances) in [
        (format!("Bank ({})", summary.bank_accounts), summary.bank),
        (format!("Cash ({})", summary.cash_accounts), summary.cash),
        ("Total".to_string(), total),
        ("Income".to_string(), summary.income),
        ("Expense".to_string(), summary.expense),
        ("Net flow".to_string(), flow),
    ] {
        output.push_str(&format!(
            "{:<22}  {:>14}  {:>14}\n",
            label,
            balances.yer.to_string(),
            balances.sar.to_string()
        ));
    }
    output.push('\n');
    output.push_str(&format!(
        "Total wealth:  {} YER (1 SAR = {} YER)\n",
        summary.wealth_yer, summary.rate
    ));
    output.push_str(&format!(
        "Debts:         owed {} / owe {} / net {}\n",
        summary.debt.owed, summary.debt.owe, summary.debt.net
    ));
    output.push_str(&format!("Transactions:  {}\n", summary.transactions));

    output
}

/// Format a reconciliation report
pub fn format_reconciliation_report(report: &ReconciliationReport) -> String {
    if report.is_consistent() {
        return "Ledger is consistent.\n".to_string();
    }

    let mut output = String::new();

    if !report.pending_operations.is_empty() {
        output.push_str(&format!(
            "Interrupted operations: {}\n",
            report.pending_operations.len()
        ));
        for entry in &report.pending_operations {
            output.push_str(&format!(
                "  {} {} at {}\n",
                entry.operation_id,
                entry.kind,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S")
            ));
        }
    }

    if !report.drifts.is_empty() {
        output.push_str("Balance drift:\n");
        for drift in &report.drifts {
            output.push_str(&format!(
                "  {} ({}) {}: stored {}, expected {} (correction {})\n",
                drift.account_name,
                drift.account,
                drift.currency,
                drift.stored,
                drift.expected,
                drift.correction()
            ));
        }
    }

    if !report.orphan_items.is_empty() {
        output.push_str("Items without a transaction:\n");
        for item in &report.orphan_items {
            output.push_str(&format!("  {} {} {}\n", item.id, item.kind, item));
        }
    }

    if !report.dangling_transactions.is_empty() {
        output.push_str("Transactions whose item is missing:\n");
        for txn in &report.dangling_transactions {
            output.push_str(&format!("  {} {}\n", txn.id, txn));
        }
    }

    output
}

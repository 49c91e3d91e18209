//! Reconciliation command
//!
//! Checks stored balances and item/transaction links against the
//! transaction history, and repairs them on request.

use crate::display::summary::format_reconciliation_report;
use crate::error::LedgerResult;
use crate::services::ReconciliationService;
use crate::storage::Storage;

/// Run a consistency check, repairing when asked
pub fn handle_reconcile_command(storage: &Storage, repair: bool) -> LedgerResult<()> {
    let service = ReconciliationService::new(storage);

    let report = service.check()?;
    print!("{}", format_reconciliation_report(&report));
    if report.is_consistent() {
        return Ok(());
    }

    if !repair {
        println!();
        println!("{} issue(s) found.", report.issue_count());
        println!("To fix them, run: ledger reconcile --repair");
        return Ok(());
    }

    let repaired = service.repair()?;
    println!();
    println!("Repaired {} issue(s).", repaired.issue_count());
    Ok(())
}

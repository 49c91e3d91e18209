//! Dashboard summary
//!
//! Read-only totals over the current ledger. The SAR to YER rate is applied
//! only to the reported wealth figure, never to stored balances.

use rust_decimal::Decimal;

use crate::error::LedgerResult;
use crate::models::{Balances, CustomerBalance, Money, TransactionKind};
use crate::storage::Storage;

use super::debt::DebtService;

/// Totals shown on the dashboard
#[derive(Debug, Clone)]
pub struct LedgerSummary {
    pub bank: Balances,
    pub cash: Balances,
    pub bank_accounts: usize,
    pub cash_accounts: usize,
    /// All income and expense entries, per currency
    pub income: Balances,
    pub expense: Balances,
    /// Bank plus cash, with SAR converted at `rate`
    pub wealth_yer: Money,
    pub rate: Decimal,
    /// Owed minus owe over all customers
    pub debt: CustomerBalance,
    pub transactions: usize,
}

impl LedgerSummary {
    pub fn total(&self) -> Balances {
        self.bank + self.cash
    }

    /// Income minus expense, per currency
    pub fn net_flow(&self) -> Balances {
        Balances::new(
            self.income.yer - self.expense.yer,
            self.income.sar - self.expense.sar,
        )
    }
}

/// Service computing dashboard totals
pub struct SummaryService<'a> {
    storage: &'a Storage,
}

impl<'a> SummaryService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Compute every dashboard total; `rate` is SAR to YER
    pub fn summarize(&self, rate: Decimal) -> LedgerResult<LedgerSummary> {
        let bank_accounts = self.storage.accounts.bank.get_all()?;
        let cash_accounts = self.storage.accounts.cash.get_all()?;

        let bank = bank_accounts
            .iter()
            .fold(Balances::default(), |sum, a| sum + a.balances);
        let cash = cash_accounts
            .iter()
            .fold(Balances::default(), |sum, a| sum + a.balances);

        let transactions = self.storage.transactions.get_all()?;
        let mut income = Balances::default();
        let mut expense = Balances::default();
        for txn in &transactions {
            // Legacy records without an amount deserialize as zero
            match txn.kind {
                TransactionKind::Income { .. } => *income.get_mut(txn.currency) += txn.amount,
                TransactionKind::Expense { .. } => *expense.get_mut(txn.currency) += txn.amount,
                TransactionKind::Transfer { .. } => {}
            }
        }

        let total = bank + cash;
        let wealth_yer = total.yer + total.sar.scaled(rate);

        Ok(LedgerSummary {
            bank,
            cash,
            bank_accounts: bank_accounts.len(),
            cash_accounts: cash_accounts.len(),
            income,
            expense,
            wealth_yer,
            rate,
            debt: DebtService::new(self.storage).totals()?.overall,
            transactions: transactions.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{AccountSpec, CashLocation, CategoryKind, Currency, ItemInput};
    use crate::services::{AccountService, CategoryService, LedgerService};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_summary_totals() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(LedgerPaths::with_base_dir(temp.path().to_path_buf())).unwrap();
        let accounts = AccountService::new(&storage);

        let main = accounts
            .create(AccountSpec::Bank {
                name: "Main".into(),
                account_type: "current".into(),
                number: "1".into(),
                opening: Balances::new(Money::from_units(1000), Money::from_units(10)),
                notes: String::new(),
            })
            .unwrap()
            .reference();
        accounts
            .create(AccountSpec::Cash {
                location: CashLocation::Mom,
                other_location: None,
                opening: Balances::new(Money::from_units(200), Money::zero()),
                notes: String::new(),
            })
            .unwrap();

        let salary = CategoryService::new(&storage)
            .create(CategoryKind::Income, "Salary", None, "")
            .unwrap();
        LedgerService::new(&storage)
            .record_income(&ItemInput {
                category: salary.id,
                description: "Pay".into(),
                date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                currency: Currency::Sar,
                amount: Money::from_units(5),
                account: main,
                notes: String::new(),
            })
            .unwrap();

        let summary = SummaryService::new(&storage)
            .summarize(Decimal::from(140))
            .unwrap();

        assert_eq!(summary.bank.yer, Money::from_units(1000));
        assert_eq!(summary.bank.sar, Money::from_units(15));
        assert_eq!(summary.cash.yer, Money::from_units(200));
        assert_eq!(summary.income.sar, Money::from_units(5));
        assert!(summary.expense.yer.is_zero());
        // 1200 YER + 15 SAR * 140
        assert_eq!(summary.wealth_yer, Money::from_units(3300));
        assert_eq!(summary.total().yer, Money::from_units(1200));
        assert_eq!(summary.net_flow().sar, Money::from_units(5));
        assert_eq!(summary.transactions, 1);
    }
}

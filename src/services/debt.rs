//! Debt subledger service
//!
//! Customers and their owed/owe entries. Balances are recomputed from the
//! entries on every call and nothing here touches account balances.
//! Every write holds the storage write lock from its first check to its
//! commit, so a debt can never be recorded against a customer that a
//! concurrent delete is removing.

use chrono::Utc;
use tracing::info;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Currency, CustomerBalance, DebtCustomer, DebtCustomerId, DebtStatus, DebtTransaction,
    DebtTransactionId, DebtTransactionInput,
};
use crate::storage::{ChangeKind, Collection, Storage, WriteLock};

use super::resolve_record;

/// Service for customers and debt transactions
pub struct DebtService<'a> {
    storage: &'a Storage,
}

/// Customer fields; on create `name` is required, on update `None` keeps
/// the old value
#[derive(Debug, Clone, Default)]
pub struct CustomerFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Debt position over all customers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebtTotals {
    /// Amounts summed as written, regardless of currency
    pub overall: CustomerBalance,
    pub yer: CustomerBalance,
    pub sar: CustomerBalance,
    pub customers: usize,
}

impl DebtTotals {
    pub fn for_currency(&self, currency: Currency) -> CustomerBalance {
        match currency {
            Currency::Yer => self.yer,
            Currency::Sar => self.sar,
        }
    }
}

impl CustomerFields {
    fn apply(&self, customer: &mut DebtCustomer) {
        let trimmed = |s: &String| s.trim().to_string();
        if let Some(name) = &self.name {
            customer.name = trimmed(name);
        }
        if let Some(phone) = &self.phone {
            customer.phone = trimmed(phone);
        }
        if let Some(email) = &self.email {
            customer.email = trimmed(email);
        }
        if let Some(address) = &self.address {
            customer.address = trimmed(address);
        }
        if let Some(notes) = &self.notes {
            customer.notes.clone_from(notes);
        }
    }
}

fn validate_customer(customer: &DebtCustomer) -> LedgerResult<()> {
    if customer.name.is_empty() {
        return Err(LedgerError::Validation("Customer name is required".into()));
    }
    Ok(())
}

fn validate_entry(input: &DebtTransactionInput) -> LedgerResult<()> {
    if input.description.trim().is_empty() {
        return Err(LedgerError::Validation("Description is required".into()));
    }
    if !input.amount.is_positive() {
        return Err(LedgerError::Validation(format!(
            "Amount must be greater than zero (got {})",
            input.amount
        )));
    }
    Ok(())
}

impl<'a> DebtService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // === Customers ===

    pub fn create_customer(&self, fields: &CustomerFields) -> LedgerResult<DebtCustomer> {
        let mut customer = DebtCustomer::new("");
        fields.apply(&mut customer);
        validate_customer(&customer)?;

        let op = self
            .storage
            .begin_operation("create_customer", vec![customer.id.key()])?;
        self.storage.debt_customers.upsert(customer.clone())?;
        op.commit(&[Collection::DebtCustomers])?;
        self.storage.publish(
            Collection::DebtCustomers,
            ChangeKind::Inserted,
            Some(customer.id.key()),
        );

        info!(customer = %customer.id, name = %customer.name, "customer created");

        self.storage.log_create(
            EntityType::DebtCustomer,
            customer.id.key(),
            Some(customer.name.clone()),
            &customer,
        )?;

        Ok(customer)
    }

    pub fn get_customer(&self, id: DebtCustomerId) -> LedgerResult<Option<DebtCustomer>> {
        self.storage.debt_customers.get(id)
    }

    /// Find a customer by id or exact name (case-insensitive)
    pub fn resolve_customer(&self, identifier: &str) -> LedgerResult<DebtCustomer> {
        let needle = identifier.trim().to_lowercase();
        let mut by_name = self
            .storage
            .debt_customers
            .find(|c| c.name.to_lowercase() == needle)?;
        if by_name.len() == 1 {
            return Ok(by_name.remove(0));
        }
        resolve_record(&self.storage.debt_customers, identifier, "Customer")
    }

    /// Customers sorted by name
    pub fn list_customers(&self) -> LedgerResult<Vec<DebtCustomer>> {
        let mut customers = self.storage.debt_customers.get_all()?;
        customers.sort_by_key(|c| c.name.to_lowercase());
        Ok(customers)
    }

    pub fn update_customer(
        &self,
        id: DebtCustomerId,
        fields: &CustomerFields,
    ) -> LedgerResult<DebtCustomer> {
        let lock = self.storage.write_lock()?;
        let before = self
            .storage
            .debt_customers
            .get(id)?
            .ok_or_else(|| LedgerError::customer_not_found(id.to_string()))?;

        let mut customer = before.clone();
        fields.apply(&mut customer);
        validate_customer(&customer)?;
        customer.updated_at = Utc::now();

        let op = lock.begin_operation("update_customer", vec![id.key()])?;
        self.storage.debt_customers.upsert(customer.clone())?;
        op.commit(&[Collection::DebtCustomers])?;
        self.storage
            .publish(Collection::DebtCustomers, ChangeKind::Updated, Some(id.key()));

        self.storage.log_update(
            EntityType::DebtCustomer,
            id.key(),
            Some(customer.name.clone()),
            &before,
            &customer,
        )?;

        Ok(customer)
    }

    /// Delete a customer and every debt transaction that belongs to them
    pub fn delete_customer(
        &self,
        id: DebtCustomerId,
    ) -> LedgerResult<(DebtCustomer, Vec<DebtTransaction>)> {
        let lock = self.storage.write_lock()?;
        if !self.storage.debt_customers.exists(id)? {
            return Err(LedgerError::customer_not_found(id.to_string()));
        }

        let op = lock.begin_operation("delete_customer", vec![id.key()])?;
        let removed = self
            .storage
            .debt_transactions
            .remove_where(|t| t.customer_id == id)?;
        let customer = self
            .storage
            .debt_customers
            .remove(id)?
            .ok_or_else(|| LedgerError::customer_not_found(id.to_string()))?;
        op.commit(&[Collection::DebtTransactions, Collection::DebtCustomers])?;

        for entry in &removed {
            self.storage.publish(
                Collection::DebtTransactions,
                ChangeKind::Removed,
                Some(entry.id.key()),
            );
        }
        self.storage
            .publish(Collection::DebtCustomers, ChangeKind::Removed, Some(id.key()));

        info!(
            customer = %id,
            transactions = removed.len(),
            "customer deleted"
        );

        self.storage.log_delete(
            EntityType::DebtCustomer,
            id.key(),
            Some(customer.name.clone()),
            &customer,
        )?;
        for entry in &removed {
            self.storage.log_delete(
                EntityType::DebtTransaction,
                entry.id.key(),
                Some(entry.description.clone()),
                entry,
            )?;
        }

        Ok((customer, removed))
    }

    // === Debt transactions ===

    pub fn record(
        &self,
        customer_id: DebtCustomerId,
        input: &DebtTransactionInput,
    ) -> LedgerResult<DebtTransaction> {
        validate_entry(input)?;
        let lock = self.storage.write_lock()?;
        if !self.storage.debt_customers.exists(customer_id)? {
            return Err(LedgerError::customer_not_found(customer_id.to_string()));
        }

        let entry = DebtTransaction::from_input(customer_id, input);
        let op = lock.begin_operation("record_debt", vec![entry.id.key(), customer_id.key()])?;
        self.storage.debt_transactions.upsert(entry.clone())?;
        op.commit(&[Collection::DebtTransactions])?;
        self.storage.publish(
            Collection::DebtTransactions,
            ChangeKind::Inserted,
            Some(entry.id.key()),
        );

        info!(
            customer = %customer_id,
            entry = %entry.id,
            r#type = %entry.debt_type,
            currency = %entry.currency,
            amount = %entry.amount,
            "debt recorded"
        );

        self.storage.log_create(
            EntityType::DebtTransaction,
            entry.id.key(),
            Some(entry.description.clone()),
            &entry,
        )?;

        Ok(entry)
    }

    pub fn get(&self, id: DebtTransactionId) -> LedgerResult<Option<DebtTransaction>> {
        self.storage.debt_transactions.get(id)
    }

    pub fn resolve(&self, identifier: &str) -> LedgerResult<DebtTransaction> {
        resolve_record(&self.storage.debt_transactions, identifier, "Debt transaction")
    }

    /// Replace the editable fields of a debt transaction
    pub fn edit(
        &self,
        id: DebtTransactionId,
        input: &DebtTransactionInput,
    ) -> LedgerResult<DebtTransaction> {
        validate_entry(input)?;
        let lock = self.storage.write_lock()?;
        let before = self.require(id)?;

        let mut entry = DebtTransaction::from_input(before.customer_id, input);
        entry.id = before.id;
        entry.created_at = before.created_at;
        self.write_update(lock, &before, entry)
    }

    /// Change only the status; it is never derived from the due date
    pub fn set_status(
        &self,
        id: DebtTransactionId,
        status: DebtStatus,
    ) -> LedgerResult<DebtTransaction> {
        let lock = self.storage.write_lock()?;
        let before = self.require(id)?;
        let mut entry = before.clone();
        entry.status = status;
        entry.updated_at = Utc::now();
        self.write_update(lock, &before, entry)
    }

    pub fn delete(&self, id: DebtTransactionId) -> LedgerResult<DebtTransaction> {
        let lock = self.storage.write_lock()?;
        self.require(id)?;

        let op = lock.begin_operation("delete_debt", vec![id.key()])?;
        let entry = self
            .storage
            .debt_transactions
            .remove(id)?
            .ok_or_else(|| debt_not_found(id))?;
        op.commit(&[Collection::DebtTransactions])?;
        self.storage
            .publish(Collection::DebtTransactions, ChangeKind::Removed, Some(id.key()));

        info!(entry = %id, "debt transaction deleted");

        self.storage.log_delete(
            EntityType::DebtTransaction,
            id.key(),
            Some(entry.description.clone()),
            &entry,
        )?;

        Ok(entry)
    }

    /// Debt transactions, optionally for one customer, newest first
    pub fn list(&self, customer: Option<DebtCustomerId>) -> LedgerResult<Vec<DebtTransaction>> {
        let mut entries = self
            .storage
            .debt_transactions
            .find(|t| customer.map_or(true, |c| t.customer_id == c))?;
        entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(entries)
    }

    /// `{owed, owe, net}` for one customer, recomputed from their entries
    pub fn customer_balance(&self, customer_id: DebtCustomerId) -> LedgerResult<CustomerBalance> {
        if !self.storage.debt_customers.exists(customer_id)? {
            return Err(LedgerError::customer_not_found(customer_id.to_string()));
        }
        let entries = self
            .storage
            .debt_transactions
            .find(|t| t.customer_id == customer_id)?;
        Ok(CustomerBalance::from_transactions(&entries))
    }

    pub fn totals(&self) -> LedgerResult<DebtTotals> {
        let entries = self.storage.debt_transactions.get_all()?;
        let in_currency = |currency: Currency| {
            CustomerBalance::from_transactions(entries.iter().filter(|t| t.currency == currency))
        };
        Ok(DebtTotals {
            overall: CustomerBalance::from_transactions(&entries),
            yer: in_currency(Currency::Yer),
            sar: in_currency(Currency::Sar),
            customers: self.storage.debt_customers.len()?,
        })
    }

    fn require(&self, id: DebtTransactionId) -> LedgerResult<DebtTransaction> {
        self.storage
            .debt_transactions
            .get(id)?
            .ok_or_else(|| debt_not_found(id))
    }

    fn write_update(
        &self,
        lock: WriteLock<'_>,
        before: &DebtTransaction,
        entry: DebtTransaction,
    ) -> LedgerResult<DebtTransaction> {
        let op = lock.begin_operation("update_debt", vec![entry.id.key()])?;
        self.storage.debt_transactions.upsert(entry.clone())?;
        op.commit(&[Collection::DebtTransactions])?;
        self.storage.publish(
            Collection::DebtTransactions,
            ChangeKind::Updated,
            Some(entry.id.key()),
        );

        self.storage.log_update(
            EntityType::DebtTransaction,
            entry.id.key(),
            Some(entry.description.clone()),
            before,
            &entry,
        )?;

        Ok(entry)
    }
}

fn debt_not_found(id: DebtTransactionId) -> LedgerError {
    LedgerError::NotFound {
        entity_type: "Debt transaction",
        identifier: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{DebtType, Money};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn named(name: &str) -> CustomerFields {
        CustomerFields {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    fn input(debt_type: DebtType, amount: i64, currency: Currency) -> DebtTransactionInput {
        DebtTransactionInput {
            debt_type,
            description: "loan".into(),
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            currency,
            amount: Money::from_units(amount),
            due_date: None,
            status: DebtStatus::Pending,
            notes: String::new(),
        }
    }

    #[test]
    fn test_customer_balance_scenario() {
        let (_temp, storage) = create_test_storage();
        let service = DebtService::new(&storage);
        let x = service.create_customer(&named("X")).unwrap();

        service
            .record(x.id, &input(DebtType::Owed, 1000, Currency::Yer))
            .unwrap();
        service
            .record(x.id, &input(DebtType::Owe, 400, Currency::Yer))
            .unwrap();

        let balance = service.customer_balance(x.id).unwrap();
        assert_eq!(balance.owed, Money::from_units(1000));
        assert_eq!(balance.owe, Money::from_units(400));
        assert_eq!(balance.net, Money::from_units(600));
    }

    #[test]
    fn test_balance_only_counts_own_entries() {
        let (_temp, storage) = create_test_storage();
        let service = DebtService::new(&storage);
        let a = service.create_customer(&named("A")).unwrap();
        let b = service.create_customer(&named("B")).unwrap();

        service
            .record(a.id, &input(DebtType::Owed, 100, Currency::Yer))
            .unwrap();
        service
            .record(b.id, &input(DebtType::Owe, 30, Currency::Sar))
            .unwrap();

        assert_eq!(
            service.customer_balance(a.id).unwrap().net,
            Money::from_units(100)
        );
        assert_eq!(
            service.customer_balance(b.id).unwrap().net,
            Money::from_units(-30)
        );

        let totals = service.totals().unwrap();
        assert_eq!(totals.overall.net, Money::from_units(70));
        assert_eq!(totals.yer.owed, Money::from_units(100));
        assert_eq!(totals.for_currency(Currency::Sar).owe, Money::from_units(30));
        assert_eq!(totals.customers, 2);
    }

    #[test]
    fn test_validation() {
        let (_temp, storage) = create_test_storage();
        let service = DebtService::new(&storage);

        assert!(service
            .create_customer(&CustomerFields::default())
            .unwrap_err()
            .is_validation());

        let customer = service.create_customer(&named("Ali")).unwrap();
        assert!(service
            .record(customer.id, &input(DebtType::Owed, 0, Currency::Yer))
            .unwrap_err()
            .is_validation());
        assert!(service
            .record(DebtCustomerId::new(), &input(DebtType::Owed, 5, Currency::Yer))
            .unwrap_err()
            .is_not_found());
        assert!(storage.debt_transactions.is_empty().unwrap());
    }

    #[test]
    fn test_delete_customer_cascades() {
        let (_temp, storage) = create_test_storage();
        let service = DebtService::new(&storage);
        let gone = service.create_customer(&named("Gone")).unwrap();
        let kept = service.create_customer(&named("Kept")).unwrap();

        service
            .record(gone.id, &input(DebtType::Owed, 10, Currency::Yer))
            .unwrap();
        service
            .record(gone.id, &input(DebtType::Owe, 5, Currency::Yer))
            .unwrap();
        service
            .record(kept.id, &input(DebtType::Owed, 7, Currency::Yer))
            .unwrap();

        let (_, removed) = service.delete_customer(gone.id).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(service.list(None).unwrap().len(), 1);
        assert!(service.get_customer(gone.id).unwrap().is_none());
        assert!(storage.journal().pending().unwrap().is_empty());
    }

    #[test]
    fn test_record_against_customer_deleted_elsewhere_is_rejected() {
        let (temp, storage) = create_test_storage();
        let service = DebtService::new(&storage);
        let customer = service.create_customer(&named("Ali")).unwrap();

        let paths = || LedgerPaths::with_base_dir(temp.path().to_path_buf());
        let other = Storage::open(paths()).unwrap();
        DebtService::new(&other).delete_customer(customer.id).unwrap();

        let err = service
            .record(customer.id, &input(DebtType::Owed, 5, Currency::Yer))
            .unwrap_err();
        assert!(err.is_not_found());

        let reopened = Storage::open(paths()).unwrap();
        assert!(reopened.debt_customers.is_empty().unwrap());
        assert!(reopened.debt_transactions.is_empty().unwrap());
        assert!(reopened.journal().pending().unwrap().is_empty());
    }

    #[test]
    fn test_edit_and_status() {
        let (_temp, storage) = create_test_storage();
        let service = DebtService::new(&storage);
        let customer = service.create_customer(&named("Sara")).unwrap();
        let entry = service
            .record(customer.id, &input(DebtType::Owed, 50, Currency::Sar))
            .unwrap();

        let edited = service
            .edit(entry.id, &input(DebtType::Owe, 20, Currency::Sar))
            .unwrap();
        assert_eq!(edited.id, entry.id);
        assert_eq!(edited.customer_id, customer.id);
        assert_eq!(
            service.customer_balance(customer.id).unwrap().net,
            Money::from_units(-20)
        );

        let paid = service.set_status(entry.id, DebtStatus::Paid).unwrap();
        assert_eq!(paid.status, DebtStatus::Paid);
        assert_eq!(paid.amount, Money::from_units(20));
    }

    #[test]
    fn test_resolve_customer_by_name() {
        let (_temp, storage) = create_test_storage();
        let service = DebtService::new(&storage);
        let customer = service.create_customer(&named("Omar")).unwrap();

        assert_eq!(service.resolve_customer("omar").unwrap().id, customer.id);
        assert_eq!(
            service
                .resolve_customer(&customer.id.to_string())
                .unwrap()
                .id,
            customer.id
        );
    }
}

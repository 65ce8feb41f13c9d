//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

type Table<T> = Arc<RwLock<HashMap<Uuid, T>>>;

/// Records that belong to a single owner
trait Owned: Clone {
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;

    fn owner_id(&self) -> &str;
}

macro_rules! owned {
    ($ty:ty, $entity:literal) => {
        impl Owned for $ty {
            const ENTITY: &'static str = $entity;

            fn id(&self) -> Uuid {
                self.id
            }

            fn owner_id(&self) -> &str {
                &self.owner_id
            }
        }
    };
}

owned!(Client, "client");
owned!(Quote, "quote");
owned!(Invoice, "invoice");
owned!(RecurringTemplate, "recurring template");
owned!(Expense, "expense");
owned!(RentTenant, "rent tenant");
owned!(RentPayment, "rent payment");

fn read<T>(lock: &RwLock<T>) -> BillingResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| BillingError::Storage("storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> BillingResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| BillingError::Storage("storage lock poisoned".to_string()))
}

fn insert<T: Owned>(table: &Table<T>, record: &T) -> BillingResult<()> {
    let mut rows = write(table)?;
    if rows.contains_key(&record.id()) {
        return Err(BillingError::Storage(format!(
            "{} {} already exists",
            T::ENTITY,
            record.id()
        )));
    }
    rows.insert(record.id(), record.clone());
    Ok(())
}

fn get<T: Owned>(table: &Table<T>, owner_id: &str, id: Uuid) -> BillingResult<Option<T>> {
    Ok(read(table)?
        .get(&id)
        .filter(|row| row.owner_id() == owner_id)
        .cloned())
}

fn list<T: Owned>(table: &Table<T>, owner_id: &str, keep: impl Fn(&T) -> bool) -> BillingResult<Vec<T>> {
    Ok(read(table)?
        .values()
        .filter(|row| row.owner_id() == owner_id && keep(*row))
        .cloned()
        .collect())
}

fn replace<T: Owned>(table: &Table<T>, record: &T) -> BillingResult<()> {
    let mut rows = write(table)?;
    match rows.get(&record.id()) {
        Some(existing) if existing.owner_id() == record.owner_id() => {
            rows.insert(record.id(), record.clone());
            Ok(())
        }
        _ => Err(BillingError::not_found(T::ENTITY, record.id())),
    }
}

fn remove<T: Owned>(table: &Table<T>, owner_id: &str, id: Uuid) -> BillingResult<()> {
    let mut rows = write(table)?;
    match rows.get(&id) {
        Some(existing) if existing.owner_id() == owner_id => {
            rows.remove(&id);
            Ok(())
        }
        _ => Err(BillingError::not_found(T::ENTITY, id)),
    }
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    clients: Table<Client>,
    quotes: Table<Quote>,
    invoices: Table<Invoice>,
    templates: Table<RecurringTemplate>,
    expenses: Table<Expense>,
    rent_tenants: Table<RentTenant>,
    rent_payments: Table<RentPayment>,
    settings: Arc<RwLock<HashMap<String, BusinessSettings>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> BillingResult<()> {
        write(&self.clients)?.clear();
        write(&self.quotes)?.clear();
        write(&self.invoices)?.clear();
        write(&self.templates)?.clear();
        write(&self.expenses)?.clear();
        write(&self.rent_tenants)?.clear();
        write(&self.rent_payments)?.clear();
        write(&self.settings)?.clear();
        Ok(())
    }
}

#[async_trait]
impl BillingStorage for MemoryStorage {
    async fn save_client(&mut self, client: &Client) -> BillingResult<()> {
        insert(&self.clients, client)
    }

    async fn get_client(&self, owner_id: &str, client_id: Uuid) -> BillingResult<Option<Client>> {
        get(&self.clients, owner_id, client_id)
    }

    async fn list_clients(&self, owner_id: &str) -> BillingResult<Vec<Client>> {
        list(&self.clients, owner_id, |_| true)
    }

    async fn update_client(&mut self, client: &Client) -> BillingResult<()> {
        replace(&self.clients, client)
    }

    async fn delete_client(&mut self, owner_id: &str, client_id: Uuid) -> BillingResult<()> {
        remove(&self.clients, owner_id, client_id)
    }

    async fn save_quote(&mut self, quote: &Quote) -> BillingResult<()> {
        insert(&self.quotes, quote)
    }

    async fn get_quote(&self, owner_id: &str, quote_id: Uuid) -> BillingResult<Option<Quote>> {
        get(&self.quotes, owner_id, quote_id)
    }

    async fn find_quote_by_token(&self, token: &str) -> BillingResult<Option<Quote>> {
        Ok(read(&self.quotes)?
            .values()
            .find(|quote| quote.acceptance_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list_quotes(&self, owner_id: &str) -> BillingResult<Vec<Quote>> {
        list(&self.quotes, owner_id, |_| true)
    }

    async fn update_quote(&mut self, quote: &Quote) -> BillingResult<()> {
        replace(&self.quotes, quote)
    }

    async fn save_invoice(&mut self, invoice: &Invoice) -> BillingResult<()> {
        insert(&self.invoices, invoice)
    }

    async fn get_invoice(
        &self,
        owner_id: &str,
        invoice_id: Uuid,
    ) -> BillingResult<Option<Invoice>> {
        get(&self.invoices, owner_id, invoice_id)
    }

    async fn list_invoices(
        &self,
        owner_id: &str,
        filter: &InvoiceFilter,
    ) -> BillingResult<Vec<Invoice>> {
        list(&self.invoices, owner_id, |invoice| filter.matches(invoice))
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> BillingResult<()> {
        replace(&self.invoices, invoice)
    }

    async fn delete_invoice(&mut self, owner_id: &str, invoice_id: Uuid) -> BillingResult<()> {
        remove(&self.invoices, owner_id, invoice_id)
    }

    async fn save_template(&mut self, template: &RecurringTemplate) -> BillingResult<()> {
        insert(&self.templates, template)
    }

    async fn get_template(
        &self,
        owner_id: &str,
        template_id: Uuid,
    ) -> BillingResult<Option<RecurringTemplate>> {
        get(&self.templates, owner_id, template_id)
    }

    async fn list_templates(&self, owner_id: &str) -> BillingResult<Vec<RecurringTemplate>> {
        list(&self.templates, owner_id, |_| true)
    }

    async fn list_due_templates(&self, as_of: NaiveDate) -> BillingResult<Vec<RecurringTemplate>> {
        Ok(read(&self.templates)?
            .values()
            .filter(|template| template.active && template.next_run_date <= as_of)
            .cloned()
            .collect())
    }

    async fn update_template(&mut self, template: &RecurringTemplate) -> BillingResult<()> {
        replace(&self.templates, template)
    }

    async fn delete_template(&mut self, owner_id: &str, template_id: Uuid) -> BillingResult<()> {
        remove(&self.templates, owner_id, template_id)
    }

    async fn save_expense(&mut self, expense: &Expense) -> BillingResult<()> {
        insert(&self.expenses, expense)
    }

    async fn get_expense(
        &self,
        owner_id: &str,
        expense_id: Uuid,
    ) -> BillingResult<Option<Expense>> {
        get(&self.expenses, owner_id, expense_id)
    }

    async fn list_expenses(
        &self,
        owner_id: &str,
        filter: &ExpenseFilter,
    ) -> BillingResult<Vec<Expense>> {
        list(&self.expenses, owner_id, |expense| filter.matches(expense))
    }

    async fn update_expense(&mut self, expense: &Expense) -> BillingResult<()> {
        replace(&self.expenses, expense)
    }

    async fn delete_expense(&mut self, owner_id: &str, expense_id: Uuid) -> BillingResult<()> {
        remove(&self.expenses, owner_id, expense_id)
    }

    async fn get_settings(&self, owner_id: &str) -> BillingResult<Option<BusinessSettings>> {
        Ok(read(&self.settings)?.get(owner_id).cloned())
    }

    async fn save_settings(&mut self, settings: &BusinessSettings) -> BillingResult<()> {
        write(&self.settings)?.insert(settings.owner_id.clone(), settings.clone());
        Ok(())
    }

    async fn save_rent_tenant(&mut self, tenant: &RentTenant) -> BillingResult<()> {
        insert(&self.rent_tenants, tenant)
    }

    async fn get_rent_tenant(
        &self,
        owner_id: &str,
        tenant_id: Uuid,
    ) -> BillingResult<Option<RentTenant>> {
        get(&self.rent_tenants, owner_id, tenant_id)
    }

    async fn list_rent_tenants(&self, owner_id: &str) -> BillingResult<Vec<RentTenant>> {
        list(&self.rent_tenants, owner_id, |_| true)
    }

    async fn update_rent_tenant(&mut self, tenant: &RentTenant) -> BillingResult<()> {
        replace(&self.rent_tenants, tenant)
    }

    async fn save_rent_payment(&mut self, payment: &RentPayment) -> BillingResult<()> {
        insert(&self.rent_payments, payment)
    }

    async fn list_rent_payments(
        &self,
        owner_id: &str,
        tenant_id: Option<Uuid>,
    ) -> BillingResult<Vec<RentPayment>> {
        list(&self.rent_payments, owner_id, |payment| {
            tenant_id.is_none_or(|id| payment.tenant_id == id)
        })
    }

    async fn find_rent_payment_by_entry(
        &self,
        owner_id: &str,
        entry_id: &str,
    ) -> BillingResult<Option<RentPayment>> {
        Ok(read(&self.rent_payments)?
            .values()
            .find(|payment| {
                payment.owner_id == owner_id && payment.source_entry_id.as_deref() == Some(entry_id)
            })
            .cloned())
    }
}

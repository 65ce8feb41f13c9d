//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for the billing system
///
/// Every query takes the `owner_id` of the SaaS account making the request and
/// must only ever return that owner's records. Lookups of another owner's id
/// behave exactly like lookups of an id that does not exist.
#[async_trait]
pub trait BillingStorage: Send + Sync {
    // Clients
    async fn save_client(&mut self, client: &Client) -> BillingResult<()>;

    async fn get_client(&self, owner_id: &str, client_id: Uuid) -> BillingResult<Option<Client>>;

    async fn list_clients(&self, owner_id: &str) -> BillingResult<Vec<Client>>;

    async fn update_client(&mut self, client: &Client) -> BillingResult<()>;

    async fn delete_client(&mut self, owner_id: &str, client_id: Uuid) -> BillingResult<()>;

    // Quotes
    async fn save_quote(&mut self, quote: &Quote) -> BillingResult<()>;

    async fn get_quote(&self, owner_id: &str, quote_id: Uuid) -> BillingResult<Option<Quote>>;

    /// Find a quote by its customer-facing acceptance token, across all owners
    async fn find_quote_by_token(&self, token: &str) -> BillingResult<Option<Quote>>;

    async fn list_quotes(&self, owner_id: &str) -> BillingResult<Vec<Quote>>;

    async fn update_quote(&mut self, quote: &Quote) -> BillingResult<()>;

    // Invoices
    async fn save_invoice(&mut self, invoice: &Invoice) -> BillingResult<()>;

    async fn get_invoice(&self, owner_id: &str, invoice_id: Uuid)
        -> BillingResult<Option<Invoice>>;

    async fn list_invoices(
        &self,
        owner_id: &str,
        filter: &InvoiceFilter,
    ) -> BillingResult<Vec<Invoice>>;

    async fn update_invoice(&mut self, invoice: &Invoice) -> BillingResult<()>;

    async fn delete_invoice(&mut self, owner_id: &str, invoice_id: Uuid) -> BillingResult<()>;

    // Recurring templates
    async fn save_template(&mut self, template: &RecurringTemplate) -> BillingResult<()>;

    async fn get_template(
        &self,
        owner_id: &str,
        template_id: Uuid,
    ) -> BillingResult<Option<RecurringTemplate>>;

    async fn list_templates(&self, owner_id: &str) -> BillingResult<Vec<RecurringTemplate>>;

    /// Active templates of every owner whose next run is on or before `as_of`
    async fn list_due_templates(&self, as_of: NaiveDate) -> BillingResult<Vec<RecurringTemplate>>;

    async fn update_template(&mut self, template: &RecurringTemplate) -> BillingResult<()>;

    async fn delete_template(&mut self, owner_id: &str, template_id: Uuid) -> BillingResult<()>;

    // Expenses
    async fn save_expense(&mut self, expense: &Expense) -> BillingResult<()>;

    async fn get_expense(&self, owner_id: &str, expense_id: Uuid)
        -> BillingResult<Option<Expense>>;

    async fn list_expenses(
        &self,
        owner_id: &str,
        filter: &ExpenseFilter,
    ) -> BillingResult<Vec<Expense>>;

    async fn update_expense(&mut self, expense: &Expense) -> BillingResult<()>;

    async fn delete_expense(&mut self, owner_id: &str, expense_id: Uuid) -> BillingResult<()>;

    // Settings
    async fn get_settings(&self, owner_id: &str) -> BillingResult<Option<BusinessSettings>>;

    async fn save_settings(&mut self, settings: &BusinessSettings) -> BillingResult<()>;

    // Rent tenants and payments
    async fn save_rent_tenant(&mut self, tenant: &RentTenant) -> BillingResult<()>;

    async fn get_rent_tenant(
        &self,
        owner_id: &str,
        tenant_id: Uuid,
    ) -> BillingResult<Option<RentTenant>>;

    async fn list_rent_tenants(&self, owner_id: &str) -> BillingResult<Vec<RentTenant>>;

    async fn update_rent_tenant(&mut self, tenant: &RentTenant) -> BillingResult<()>;

    async fn save_rent_payment(&mut self, payment: &RentPayment) -> BillingResult<()>;

    /// Payments for one tenant, or for all of the owner's tenants
    async fn list_rent_payments(
        &self,
        owner_id: &str,
        tenant_id: Option<Uuid>,
    ) -> BillingResult<Vec<RentPayment>>;

    async fn find_rent_payment_by_entry(
        &self,
        owner_id: &str,
        entry_id: &str,
    ) -> BillingResult<Option<RentPayment>>;
}

/// Criteria for listing invoices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
    /// Earliest issue date, inclusive
    pub from: Option<NaiveDate>,
    /// Latest issue date, inclusive
    pub to: Option<NaiveDate>,
}

impl InvoiceFilter {
    pub fn status(status: InvoiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn client(client_id: Uuid) -> Self {
        Self {
            client_id: Some(client_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.status.is_none_or(|s| invoice.status == s)
            && self.client_id.is_none_or(|c| invoice.client_id == c)
            && self.from.is_none_or(|from| invoice.issue_date >= from)
            && self.to.is_none_or(|to| invoice.issue_date <= to)
    }
}

/// Criteria for listing expenses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseFilter {
    pub status: Option<ExpenseStatus>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        self.status.is_none_or(|s| expense.status == s)
            && self
                .category
                .as_deref()
                .is_none_or(|c| expense.category.eq_ignore_ascii_case(c))
            && self.from.is_none_or(|from| expense.expense_date >= from)
            && self.to.is_none_or(|to| expense.expense_date <= to)
    }
}

/// Trait for implementing custom client validation rules
pub trait ClientValidator: Send + Sync {
    /// Validate a client before saving
    fn validate_client(&self, client: &Client) -> BillingResult<()>;
}

/// Trait for implementing custom document validation rules
pub trait DocumentValidator: Send + Sync {
    /// Validate a quote before saving
    fn validate_quote(&self, quote: &Quote) -> BillingResult<()>;

    /// Validate an invoice before saving
    fn validate_invoice(&self, invoice: &Invoice) -> BillingResult<()>;
}

/// One set of rules shared by every manager that creates documents
impl<V: DocumentValidator + ?Sized> DocumentValidator for Arc<V> {
    fn validate_quote(&self, quote: &Quote) -> BillingResult<()> {
        (**self).validate_quote(quote)
    }

    fn validate_invoice(&self, invoice: &Invoice) -> BillingResult<()> {
        (**self).validate_invoice(invoice)
    }
}

/// Default client validator with basic rules
pub struct DefaultClientValidator;

impl ClientValidator for DefaultClientValidator {
    fn validate_client(&self, client: &Client) -> BillingResult<()> {
        if client.owner_id.trim().is_empty() {
            return Err(BillingError::Validation(
                "Owner ID cannot be empty".to_string(),
            ));
        }

        if client.name.trim().is_empty() {
            return Err(BillingError::Validation(
                "Client name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default document validator with basic structural rules
pub struct DefaultDocumentValidator;

impl DocumentValidator for DefaultDocumentValidator {
    fn validate_quote(&self, quote: &Quote) -> BillingResult<()> {
        if quote.items.is_empty() {
            return Err(BillingError::Validation(
                "Quote must have at least one line item".to_string(),
            ));
        }

        if quote.valid_until < quote.issue_date {
            return Err(BillingError::Validation(format!(
                "Quote validity date {} precedes issue date {}",
                quote.valid_until, quote.issue_date
            )));
        }

        Ok(())
    }

    fn validate_invoice(&self, invoice: &Invoice) -> BillingResult<()> {
        if invoice.items.is_empty() {
            return Err(BillingError::Validation(
                "Invoice must have at least one line item".to_string(),
            ));
        }

        if invoice.due_date < invoice.issue_date {
            return Err(BillingError::Validation(format!(
                "Invoice due date {} precedes issue date {}",
                invoice.due_date, invoice.issue_date
            )));
        }

        Ok(())
    }
}

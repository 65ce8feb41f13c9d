//! Invoice processing and management

use bigdecimal::BigDecimal;
use chrono::{Days, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use crate::billing::numbering;
use crate::billing::settings::load_settings;
use crate::config::BillingConfig;
use crate::tax::{round_money, LineItem};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

/// Input for creating an invoice
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    /// Defaults to the issue date plus the owner's payment terms
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub discount_percent: BigDecimal,
    pub notes: Option<String>,
}

impl NewInvoice {
    pub fn new(client_id: Uuid, issue_date: NaiveDate, items: Vec<LineItem>) -> Self {
        Self {
            client_id,
            issue_date,
            due_date: None,
            items,
            discount_percent: BigDecimal::from(0),
            notes: None,
        }
    }
}

/// Payment received against an invoice
#[derive(Debug, Clone)]
pub struct PaymentInput {
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

impl PaymentInput {
    pub fn new(amount: BigDecimal, date: NaiveDate, method: PaymentMethod) -> Self {
        Self {
            amount,
            date,
            method,
            reference: None,
        }
    }
}

/// Next free invoice number for the owner in the issue date's year
pub(crate) async fn next_invoice_number<S: BillingStorage>(
    storage: &S,
    owner_id: &str,
    prefix: &str,
    issue_date: NaiveDate,
) -> BillingResult<String> {
    let invoices = storage
        .list_invoices(owner_id, &InvoiceFilter::default())
        .await?;
    Ok(numbering::next_number(
        invoices.iter().map(|i| i.number.as_str()),
        prefix,
        issue_date,
    ))
}

pub(crate) fn due_date_for(issue_date: NaiveDate, terms_days: u32) -> BillingResult<NaiveDate> {
    issue_date
        .checked_add_days(Days::new(u64::from(terms_days)))
        .ok_or_else(|| BillingError::Validation(format!("Due date out of range for {}", issue_date)))
}

/// Invoice manager for handling the invoice lifecycle
pub struct InvoiceManager<S: BillingStorage> {
    pub(crate) storage: S,
    config: BillingConfig,
    validator: Box<dyn DocumentValidator>,
}

impl<S: BillingStorage> InvoiceManager<S> {
    /// Create a new invoice manager
    pub fn new(storage: S, config: BillingConfig) -> Self {
        Self {
            storage,
            config,
            validator: Box::new(DefaultDocumentValidator),
        }
    }

    /// Create a new invoice manager with custom validator
    pub fn with_validator(
        storage: S,
        config: BillingConfig,
        validator: Box<dyn DocumentValidator>,
    ) -> Self {
        Self {
            storage,
            config,
            validator,
        }
    }

    /// Create a draft invoice with the next number in sequence
    pub async fn create_invoice(&mut self, owner_id: &str, input: NewInvoice) -> BillingResult<Invoice> {
        if self.storage.get_client(owner_id, input.client_id).await?.is_none() {
            return Err(BillingError::not_found("client", input.client_id));
        }

        let settings = load_settings(&self.storage, &self.config, owner_id).await?;
        let due_date = match input.due_date {
            Some(due) => due,
            None => due_date_for(input.issue_date, settings.payment_terms_days)?,
        };
        let number = next_invoice_number(
            &self.storage,
            owner_id,
            &settings.invoice_prefix,
            input.issue_date,
        )
        .await?;

        let mut invoice = Invoice::new(
            owner_id.to_string(),
            input.client_id,
            number,
            input.issue_date,
            due_date,
            input.items,
            input.discount_percent,
        )?;
        invoice.notes = input.notes;

        self.validator.validate_invoice(&invoice)?;
        self.storage.save_invoice(&invoice).await?;

        info!(owner_id, number = %invoice.number, total = %invoice.totals.total, "invoice created");
        Ok(invoice)
    }

    /// Get an invoice by ID
    pub async fn get_invoice(&self, owner_id: &str, invoice_id: Uuid) -> BillingResult<Option<Invoice>> {
        self.storage.get_invoice(owner_id, invoice_id).await
    }

    /// Get an invoice by ID, returning an error if not found
    pub async fn get_invoice_required(&self, owner_id: &str, invoice_id: Uuid) -> BillingResult<Invoice> {
        self.storage
            .get_invoice(owner_id, invoice_id)
            .await?
            .ok_or_else(|| BillingError::not_found("invoice", invoice_id))
    }

    /// List invoices matching `filter`, oldest first
    pub async fn list_invoices(&self, owner_id: &str, filter: &InvoiceFilter) -> BillingResult<Vec<Invoice>> {
        let mut invoices = self.storage.list_invoices(owner_id, filter).await?;
        invoices.sort_by(|a, b| {
            a.issue_date
                .cmp(&b.issue_date)
                .then_with(|| a.number.cmp(&b.number))
        });
        Ok(invoices)
    }

    /// Replace the items and discount of a draft invoice
    pub async fn update_items(
        &mut self,
        owner_id: &str,
        invoice_id: Uuid,
        items: Vec<LineItem>,
        discount_percent: BigDecimal,
    ) -> BillingResult<Invoice> {
        let mut invoice = self.get_invoice_required(owner_id, invoice_id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::Validation(format!(
                "Invoice {} is {} and can no longer be edited",
                invoice.number, invoice.status
            )));
        }

        invoice.items = items;
        invoice.discount_percent = discount_percent;
        invoice.recalculate_totals()?;
        self.validator.validate_invoice(&invoice)?;
        self.storage.update_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Write the invoice category and one category per line.
    ///
    /// Only the category fields change; items, totals, payments and status
    /// are left as stored. Cancelled invoices are refused.
    pub async fn set_categories(
        &mut self,
        owner_id: &str,
        invoice_id: Uuid,
        invoice_category: Option<String>,
        line_categories: Vec<Option<String>>,
    ) -> BillingResult<Invoice> {
        let mut invoice = self.get_invoice_required(owner_id, invoice_id).await?;
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(BillingError::Validation(format!(
                "Invoice {} is cancelled and cannot be categorized",
                invoice.number
            )));
        }
        if line_categories.len() != invoice.items.len() {
            return Err(BillingError::Validation(format!(
                "Invoice {} has {} lines but {} categories were given",
                invoice.number,
                invoice.items.len(),
                line_categories.len()
            )));
        }

        for (item, category) in invoice.items.iter_mut().zip(line_categories) {
            item.category = category;
        }
        invoice.category = invoice_category;
        invoice.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_invoice(&invoice).await?;

        debug!(owner_id, number = %invoice.number, category = ?invoice.category, "invoice categorized");
        Ok(invoice)
    }

    /// Delete a draft invoice
    pub async fn delete_invoice(&mut self, owner_id: &str, invoice_id: Uuid) -> BillingResult<()> {
        let invoice = self.get_invoice_required(owner_id, invoice_id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::Validation(format!(
                "Only draft invoices can be deleted; {} is {}",
                invoice.number, invoice.status
            )));
        }
        self.storage.delete_invoice(owner_id, invoice_id).await
    }

    /// Issue a draft invoice to the client
    pub async fn send_invoice(&mut self, owner_id: &str, invoice_id: Uuid) -> BillingResult<Invoice> {
        let mut invoice = self.get_invoice_required(owner_id, invoice_id).await?;
        invoice.transition(InvoiceStatus::Sent)?;
        invoice.sent_at = Some(chrono::Utc::now().naive_utc());
        self.storage.update_invoice(&invoice).await?;

        info!(owner_id, number = %invoice.number, "invoice sent");
        Ok(invoice)
    }

    /// Cancel an invoice that has not been paid
    pub async fn cancel_invoice(&mut self, owner_id: &str, invoice_id: Uuid) -> BillingResult<Invoice> {
        let mut invoice = self.get_invoice_required(owner_id, invoice_id).await?;
        invoice.transition(InvoiceStatus::Cancelled)?;
        self.storage.update_invoice(&invoice).await?;

        info!(owner_id, number = %invoice.number, "invoice cancelled");
        Ok(invoice)
    }

    /// Record a payment and move the invoice to `PartiallyPaid` or `Paid`.
    ///
    /// Overpayments are rejected. A partial payment on an overdue invoice leaves
    /// it overdue.
    pub async fn record_payment(
        &mut self,
        owner_id: &str,
        invoice_id: Uuid,
        payment: PaymentInput,
    ) -> BillingResult<Invoice> {
        let mut invoice = self.get_invoice_required(owner_id, invoice_id).await?;

        if !invoice.status.is_open() {
            return Err(BillingError::Validation(format!(
                "Invoice {} is {} and cannot take payments",
                invoice.number, invoice.status
            )));
        }

        let amount = round_money(&payment.amount);
        validate_positive_amount(&amount)?;

        let balance = invoice.balance_due();
        if amount > balance {
            return Err(BillingError::Validation(format!(
                "Payment of {} exceeds balance due of {} on {}",
                amount, balance, invoice.number
            )));
        }

        invoice.payments.push(InvoicePayment {
            id: Uuid::new_v4(),
            amount,
            date: payment.date,
            method: payment.method,
            reference: payment.reference,
            recorded_at: chrono::Utc::now().naive_utc(),
        });

        if invoice.balance_due() == BigDecimal::from(0) {
            invoice.transition(InvoiceStatus::Paid)?;
            invoice.paid_at = Some(payment.date);
        } else if invoice.status == InvoiceStatus::Sent {
            invoice.transition(InvoiceStatus::PartiallyPaid)?;
        }

        self.storage.update_invoice(&invoice).await?;
        info!(
            owner_id,
            number = %invoice.number,
            balance_due = %invoice.balance_due(),
            status = %invoice.status,
            "payment recorded"
        );
        Ok(invoice)
    }

    /// Flag open invoices whose due date has passed; returns the invoices changed
    pub async fn mark_overdue(&mut self, owner_id: &str, today: NaiveDate) -> BillingResult<Vec<Invoice>> {
        let open = self
            .storage
            .list_invoices(owner_id, &InvoiceFilter::default())
            .await?;

        let mut changed = Vec::new();
        for mut invoice in open {
            if invoice.status == InvoiceStatus::Overdue || !invoice.is_overdue_on(today) {
                continue;
            }
            invoice.transition(InvoiceStatus::Overdue)?;
            self.storage.update_invoice(&invoice).await?;
            debug!(owner_id, number = %invoice.number, due_date = %invoice.due_date, "invoice overdue");
            changed.push(invoice);
        }

        if !changed.is_empty() {
            info!(owner_id, count = changed.len(), "invoices marked overdue");
        }
        Ok(changed)
    }
}

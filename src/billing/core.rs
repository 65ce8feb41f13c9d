//! Main billing orchestrator that coordinates clients, documents and expenses

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::billing::{
    ClientManager, ExpenseManager, InvoiceManager, NewClient, NewExpense, NewInvoice, NewQuote,
    NewTemplate, PaymentInput, QuoteManager, RecurringExpander, RecurringManager, RunReport,
    SettingsManager,
};
use crate::categorization::CategorizationService;
use crate::config::BillingConfig;
use crate::traits::*;
use crate::types::*;

/// Headline figures for an owner's home screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub as_of: NaiveDate,
    /// Balance due across all open invoices
    pub outstanding: BigDecimal,
    pub overdue_count: usize,
    pub overdue_amount: BigDecimal,
    /// Payments received in the calendar month of `as_of`
    pub paid_this_month: BigDecimal,
    pub draft_count: usize,
    pub unpaid_bills_count: usize,
    pub unpaid_bills_amount: BigDecimal,
}

/// Main billing system over one shared storage handle
pub struct Billing<S: BillingStorage> {
    config: BillingConfig,
    client_manager: ClientManager<S>,
    quote_manager: QuoteManager<S>,
    invoice_manager: InvoiceManager<S>,
    recurring_manager: RecurringManager<S>,
    expense_manager: ExpenseManager<S>,
    settings_manager: SettingsManager<S>,
    expander: RecurringExpander<S>,
}

impl<S: BillingStorage + Clone> Billing<S> {
    /// Create a new billing system with the given storage backend
    pub fn new(storage: S, config: BillingConfig) -> Self {
        Self {
            client_manager: ClientManager::new(storage.clone()),
            quote_manager: QuoteManager::new(storage.clone(), config.clone()),
            invoice_manager: InvoiceManager::new(storage.clone(), config.clone()),
            recurring_manager: RecurringManager::new(storage.clone(), config.clone()),
            expense_manager: ExpenseManager::new(storage.clone()),
            settings_manager: SettingsManager::new(storage.clone(), config.clone()),
            expander: RecurringExpander::new(storage, config.clone()),
            config,
        }
    }

    /// Create a new billing system with custom validators
    pub fn with_validators(
        storage: S,
        config: BillingConfig,
        client_validator: Box<dyn ClientValidator>,
        quote_validator: Box<dyn DocumentValidator>,
        invoice_validator: Box<dyn DocumentValidator>,
    ) -> Self {
        let invoice_validator: Arc<dyn DocumentValidator> = Arc::from(invoice_validator);
        let mut billing = Self::new(storage.clone(), config.clone());
        billing.client_manager = ClientManager::with_validator(storage.clone(), client_validator);
        billing.quote_manager = QuoteManager::with_validators(
            storage.clone(),
            config.clone(),
            quote_validator,
            Box::new(invoice_validator.clone()),
        );
        billing.invoice_manager = InvoiceManager::with_validator(
            storage.clone(),
            config.clone(),
            Box::new(invoice_validator.clone()),
        );
        billing.expander = RecurringExpander::with_validator(storage, config, Box::new(invoice_validator));
        billing
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn clients(&mut self) -> &mut ClientManager<S> {
        &mut self.client_manager
    }

    pub fn quotes(&mut self) -> &mut QuoteManager<S> {
        &mut self.quote_manager
    }

    pub fn invoices(&mut self) -> &mut InvoiceManager<S> {
        &mut self.invoice_manager
    }

    pub fn recurring(&mut self) -> &mut RecurringManager<S> {
        &mut self.recurring_manager
    }

    pub fn expenses(&mut self) -> &mut ExpenseManager<S> {
        &mut self.expense_manager
    }

    pub fn settings(&mut self) -> &mut SettingsManager<S> {
        &mut self.settings_manager
    }

    // Client operations
    /// Create a new client
    pub async fn create_client(&mut self, owner_id: &str, input: NewClient) -> BillingResult<Client> {
        self.client_manager.create_client(owner_id, input).await
    }

    /// List an owner's clients
    pub async fn list_clients(&self, owner_id: &str) -> BillingResult<Vec<Client>> {
        self.client_manager.list_clients(owner_id).await
    }

    // Quote operations
    /// Create a draft quote
    pub async fn create_quote(&mut self, owner_id: &str, input: NewQuote) -> BillingResult<Quote> {
        self.quote_manager.create_quote(owner_id, input).await
    }

    /// Send a quote to the customer
    pub async fn send_quote(&mut self, owner_id: &str, quote_id: Uuid) -> BillingResult<Quote> {
        self.quote_manager.send_quote(owner_id, quote_id).await
    }

    /// Customer acceptance through the quote token
    pub async fn accept_quote(&mut self, token: &str, today: NaiveDate) -> BillingResult<Quote> {
        self.quote_manager.accept_by_token(token, today).await
    }

    /// Customer refusal through the quote token
    pub async fn decline_quote(&mut self, token: &str, today: NaiveDate) -> BillingResult<Quote> {
        self.quote_manager.decline_by_token(token, today).await
    }

    /// Convert an accepted quote into an invoice
    pub async fn convert_quote(
        &mut self,
        owner_id: &str,
        quote_id: Uuid,
        issue_date: NaiveDate,
    ) -> BillingResult<(Quote, Invoice)> {
        self.quote_manager
            .convert_to_invoice(owner_id, quote_id, issue_date)
            .await
    }

    // Invoice operations
    /// Create a draft invoice
    pub async fn create_invoice(&mut self, owner_id: &str, input: NewInvoice) -> BillingResult<Invoice> {
        self.invoice_manager.create_invoice(owner_id, input).await
    }

    /// Issue an invoice
    pub async fn send_invoice(&mut self, owner_id: &str, invoice_id: Uuid) -> BillingResult<Invoice> {
        self.invoice_manager.send_invoice(owner_id, invoice_id).await
    }

    /// Record a customer payment
    pub async fn record_payment(
        &mut self,
        owner_id: &str,
        invoice_id: Uuid,
        payment: PaymentInput,
    ) -> BillingResult<Invoice> {
        self.invoice_manager
            .record_payment(owner_id, invoice_id, payment)
            .await
    }

    /// Categorize a stored invoice's lines and save only the categories
    pub async fn categorize_invoice(
        &mut self,
        owner_id: &str,
        invoice_id: Uuid,
        service: &CategorizationService,
    ) -> BillingResult<Invoice> {
        let mut invoice = self.invoice_manager.get_invoice_required(owner_id, invoice_id).await?;
        service.categorize_invoice(&mut invoice).await;
        let lines = invoice.items.iter().map(|item| item.category.clone()).collect();
        self.invoice_manager
            .set_categories(owner_id, invoice_id, invoice.category, lines)
            .await
    }

    /// List invoices
    pub async fn list_invoices(&self, owner_id: &str, filter: &InvoiceFilter) -> BillingResult<Vec<Invoice>> {
        self.invoice_manager.list_invoices(owner_id, filter).await
    }

    // Recurring operations
    /// Create a recurring template
    pub async fn create_template(
        &mut self,
        owner_id: &str,
        input: NewTemplate,
    ) -> BillingResult<RecurringTemplate> {
        self.recurring_manager.create_template(owner_id, input).await
    }

    /// Run the recurring expansion job for all owners
    pub async fn run_recurring(&mut self, today: NaiveDate) -> BillingResult<RunReport> {
        self.expander.run(today).await
    }

    // Expense operations
    /// Record an expense
    pub async fn create_expense(&mut self, owner_id: &str, input: NewExpense) -> BillingResult<Expense> {
        self.expense_manager.create_expense(owner_id, input).await
    }

    // Housekeeping
    /// Daily status sweep for one owner: overdue invoices and stale quotes
    pub async fn refresh_statuses(&mut self, owner_id: &str, today: NaiveDate) -> BillingResult<(usize, usize)> {
        let overdue = self.invoice_manager.mark_overdue(owner_id, today).await?;
        let expired = self.quote_manager.expire_stale(owner_id, today).await?;
        Ok((overdue.len(), expired.len()))
    }

    // Reporting
    /// Receivables and payables summary as of `today`
    pub async fn dashboard(&self, owner_id: &str, today: NaiveDate) -> BillingResult<Dashboard> {
        let invoices = self
            .invoice_manager
            .storage
            .list_invoices(owner_id, &InvoiceFilter::default())
            .await?;
        let unpaid_bills = self
            .expense_manager
            .storage
            .list_expenses(
                owner_id,
                &ExpenseFilter {
                    status: Some(ExpenseStatus::Unpaid),
                    ..ExpenseFilter::default()
                },
            )
            .await?;

        let this_month = YearMonth::from_date(today);
        let zero = BigDecimal::from(0);
        let mut dashboard = Dashboard {
            as_of: today,
            outstanding: zero.clone(),
            overdue_count: 0,
            overdue_amount: zero.clone(),
            paid_this_month: zero.clone(),
            draft_count: 0,
            unpaid_bills_count: unpaid_bills.len(),
            unpaid_bills_amount: unpaid_bills.iter().map(|e| &e.amount).sum(),
        };

        for invoice in &invoices {
            if invoice.status == InvoiceStatus::Draft {
                dashboard.draft_count += 1;
            }

            if invoice.status.is_open() {
                let balance = invoice.balance_due();
                if invoice.status == InvoiceStatus::Overdue || invoice.is_overdue_on(today) {
                    dashboard.overdue_count += 1;
                    dashboard.overdue_amount += &balance;
                }
                dashboard.outstanding += balance;
            }

            for payment in invoice.payments.iter().filter(|p| this_month.contains(p.date)) {
                dashboard.paid_this_month += &payment.amount;
            }
        }

        Ok(dashboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{LineItem, TaxRate};
    use crate::utils::MemoryStorage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(price: i64) -> Vec<LineItem> {
        vec![LineItem::new(
            "Consulting".to_string(),
            BigDecimal::from(1),
            BigDecimal::from(price),
            TaxRate::zero(),
        )
        .unwrap()]
    }

    #[tokio::test]
    async fn test_dashboard_summary() {
        let mut billing = Billing::new(MemoryStorage::new(), BillingConfig::default());
        let client = billing
            .create_client("owner", NewClient::named("Acme"))
            .await
            .unwrap();

        let late = billing
            .create_invoice("owner", NewInvoice::new(client.id, date(2024, 1, 1), item(300)))
            .await
            .unwrap();
        let current = billing
            .create_invoice("owner", NewInvoice::new(client.id, date(2024, 2, 20), item(200)))
            .await
            .unwrap();
        billing
            .create_invoice("owner", NewInvoice::new(client.id, date(2024, 2, 21), item(50)))
            .await
            .unwrap();
        billing.send_invoice("owner", late.id).await.unwrap();
        billing.send_invoice("owner", current.id).await.unwrap();
        billing
            .record_payment(
                "owner",
                current.id,
                PaymentInput::new(BigDecimal::from(80), date(2024, 3, 2), PaymentMethod::Card),
            )
            .await
            .unwrap();

        let mut bill = NewExpense::new("Landlord", "Rent", date(2024, 3, 1), BigDecimal::from(900));
        bill.due_date = Some(date(2024, 3, 5));
        billing.create_expense("owner", bill).await.unwrap();

        let dashboard = billing.dashboard("owner", date(2024, 3, 10)).await.unwrap();
        assert_eq!(dashboard.outstanding, BigDecimal::from(420));
        assert_eq!(dashboard.overdue_count, 1);
        assert_eq!(dashboard.overdue_amount, BigDecimal::from(300));
        assert_eq!(dashboard.paid_this_month, BigDecimal::from(80));
        assert_eq!(dashboard.draft_count, 1);
        assert_eq!(dashboard.unpaid_bills_count, 1);

        let other = billing.dashboard("someone-else", date(2024, 3, 10)).await.unwrap();
        assert_eq!(other.outstanding, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn test_refresh_statuses() {
        let mut billing = Billing::new(MemoryStorage::new(), BillingConfig::default());
        let client = billing
            .create_client("owner", NewClient::named("Acme"))
            .await
            .unwrap();
        let invoice = billing
            .create_invoice("owner", NewInvoice::new(client.id, date(2024, 1, 1), item(100)))
            .await
            .unwrap();
        billing.send_invoice("owner", invoice.id).await.unwrap();
        let quote = billing
            .create_quote("owner", NewQuote::new(client.id, date(2024, 1, 1), item(100)))
            .await
            .unwrap();
        billing.send_quote("owner", quote.id).await.unwrap();

        let (overdue, expired) = billing.refresh_statuses("owner", date(2024, 3, 1)).await.unwrap();
        assert_eq!((overdue, expired), (1, 1));

        let (overdue, expired) = billing.refresh_statuses("owner", date(2024, 3, 2)).await.unwrap();
        assert_eq!((overdue, expired), (0, 0));
    }
}

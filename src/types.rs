//! Core types and data structures for the billing system

use bigdecimal::BigDecimal;
use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::tax::{round_money, DocumentTotals, LineItem, TaxCalculation, TaxError, TaxRate};

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Customer billed by a business owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    /// SaaS account that owns this record
    pub owner_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// VAT / GST / EIN registration shown on documents
    pub tax_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Client {
    /// Create a new client with only the required fields set
    pub fn new(owner_id: String, name: String) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            email: None,
            phone: None,
            address: None,
            tax_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    /// Shared with the customer; the acceptance token is live
    Sent,
    Accepted,
    Declined,
    Expired,
    /// Turned into an invoice
    Converted,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Declined => "declined",
            QuoteStatus::Expired => "expired",
            QuoteStatus::Converted => "converted",
        }
    }

    /// Whether a quote may move from this status to `next`
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self, next),
            (QuoteStatus::Draft, QuoteStatus::Sent)
                | (QuoteStatus::Sent, QuoteStatus::Accepted)
                | (QuoteStatus::Sent, QuoteStatus::Declined)
                | (QuoteStatus::Sent, QuoteStatus::Expired)
                | (QuoteStatus::Accepted, QuoteStatus::Converted)
        )
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-sale document offered to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub owner_id: String,
    pub client_id: Uuid,
    /// Human-facing number, e.g. `QUO-2024-0007`
    pub number: String,
    pub issue_date: NaiveDate,
    /// Last day the customer may accept
    pub valid_until: NaiveDate,
    pub items: Vec<LineItem>,
    pub discount_percent: BigDecimal,
    pub notes: Option<String>,
    pub status: QuoteStatus,
    /// Secret handed to the customer for sign-off; set when the quote is sent
    pub acceptance_token: Option<String>,
    pub accepted_at: Option<NaiveDateTime>,
    pub declined_at: Option<NaiveDateTime>,
    pub converted_invoice_id: Option<Uuid>,
    pub totals: DocumentTotals,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Quote {
    /// Create a draft quote and compute its totals
    pub fn new(
        owner_id: String,
        client_id: Uuid,
        number: String,
        issue_date: NaiveDate,
        valid_until: NaiveDate,
        items: Vec<LineItem>,
        discount_percent: BigDecimal,
    ) -> Result<Self, TaxError> {
        let totals = DocumentTotals::from_items(&items, &discount_percent)?;
        let now = now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            client_id,
            number,
            issue_date,
            valid_until,
            items,
            discount_percent,
            notes: None,
            status: QuoteStatus::Draft,
            acceptance_token: None,
            accepted_at: None,
            declined_at: None,
            converted_invoice_id: None,
            totals,
            created_at: now,
            updated_at: now,
        })
    }

    /// Recompute totals after the items or discount changed
    pub fn recalculate_totals(&mut self) -> Result<(), TaxError> {
        self.totals = DocumentTotals::from_items(&self.items, &self.discount_percent)?;
        self.updated_at = now();
        Ok(())
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.valid_until
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: QuoteStatus) -> BillingResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(BillingError::InvalidTransition {
                entity: "quote",
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = now();
        Ok(())
    }
}

/// Lifecycle of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Whether an invoice may move from this status to `next`
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Sent)
                | (Draft, Cancelled)
                | (Sent, PartiallyPaid)
                | (Sent, Paid)
                | (Sent, Overdue)
                | (Sent, Cancelled)
                | (PartiallyPaid, Paid)
                | (PartiallyPaid, Overdue)
                | (Overdue, PartiallyPaid)
                | (Overdue, Paid)
                | (Overdue, Cancelled)
        )
    }

    /// Issued and still awaiting money
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a customer settled (part of) an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    Cash,
    Cheque,
    Other,
}

/// Payment applied to an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePayment {
    pub id: Uuid,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub recorded_at: NaiveDateTime,
}

/// Billable document with a payment status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub owner_id: String,
    pub client_id: Uuid,
    /// Human-facing number, e.g. `INV-2024-0042`
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub discount_percent: BigDecimal,
    pub notes: Option<String>,
    pub status: InvoiceStatus,
    pub payments: Vec<InvoicePayment>,
    /// Quote this invoice was converted from
    pub quote_id: Option<Uuid>,
    /// Recurring template that produced this invoice
    pub template_id: Option<Uuid>,
    /// Occurrence index within the template schedule
    pub occurrence_index: Option<u32>,
    /// Sales category assigned by categorization
    pub category: Option<String>,
    pub totals: DocumentTotals,
    pub sent_at: Option<NaiveDateTime>,
    pub paid_at: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Invoice {
    /// Create a draft invoice and compute its totals
    pub fn new(
        owner_id: String,
        client_id: Uuid,
        number: String,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        items: Vec<LineItem>,
        discount_percent: BigDecimal,
    ) -> Result<Self, TaxError> {
        let totals = DocumentTotals::from_items(&items, &discount_percent)?;
        let now = now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            client_id,
            number,
            issue_date,
            due_date,
            items,
            discount_percent,
            notes: None,
            status: InvoiceStatus::Draft,
            payments: Vec::new(),
            quote_id: None,
            template_id: None,
            occurrence_index: None,
            category: None,
            totals,
            sent_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Recompute totals after the items or discount changed
    pub fn recalculate_totals(&mut self) -> Result<(), TaxError> {
        self.totals = DocumentTotals::from_items(&self.items, &self.discount_percent)?;
        self.updated_at = now();
        Ok(())
    }

    /// Sum of all payments received
    pub fn amount_paid(&self) -> BigDecimal {
        self.payments.iter().map(|p| &p.amount).sum()
    }

    /// Amount still owed
    pub fn balance_due(&self) -> BigDecimal {
        &self.totals.total - self.amount_paid()
    }

    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date < today
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: InvoiceStatus) -> BillingResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(BillingError::InvalidTransition {
                entity: "invoice",
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = now();
        Ok(())
    }
}

/// Schedule step of a recurring template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Date of the `index`-th occurrence counted from `start` (index 0 is `start`).
    ///
    /// Monthly and yearly schedules keep the start day-of-month and clamp to the
    /// end of shorter months, so a Jan 31 start yields Feb 28/29, then Mar 31.
    pub fn occurrence(&self, start: NaiveDate, index: u32) -> Option<NaiveDate> {
        match self {
            Frequency::Weekly => start.checked_add_days(Days::new(7 * u64::from(index))),
            Frequency::Monthly => start.checked_add_months(Months::new(index)),
            Frequency::Yearly => start.checked_add_months(Months::new(index.checked_mul(12)?)),
        }
    }
}

/// Stored item list and schedule expanded into invoices by the recurring job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: Uuid,
    pub owner_id: String,
    pub client_id: Uuid,
    pub name: String,
    pub items: Vec<LineItem>,
    pub discount_percent: BigDecimal,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    /// Last date an occurrence may fall on
    pub end_date: Option<NaiveDate>,
    /// Date of the next occurrence still to be invoiced
    pub next_run_date: NaiveDate,
    /// Number of occurrences already invoiced
    pub occurrences_generated: u32,
    pub payment_terms_days: u32,
    /// Generated invoices go straight to `Sent` instead of `Draft`
    pub auto_send: bool,
    pub active: bool,
    pub last_run_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RecurringTemplate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: String,
        client_id: Uuid,
        name: String,
        items: Vec<LineItem>,
        frequency: Frequency,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        payment_terms_days: u32,
    ) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            client_id,
            name,
            items,
            discount_percent: BigDecimal::from(0),
            frequency,
            start_date,
            end_date,
            next_run_date: start_date,
            occurrences_generated: 0,
            payment_terms_days,
            auto_send: false,
            active: true,
            last_run_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payment state of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Unpaid,
    Paid,
}

/// Business expense or supplier bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub owner_id: String,
    pub vendor: String,
    pub category: String,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    /// Set for bills payable later
    pub due_date: Option<NaiveDate>,
    /// Gross amount including tax, as printed on the receipt
    pub amount: BigDecimal,
    pub tax_rate: TaxRate,
    pub net_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub status: ExpenseStatus,
    pub paid_date: Option<NaiveDate>,
    /// Key of the receipt in object storage
    pub receipt_ref: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Expense {
    /// Create an unpaid expense, splitting the gross amount into net and tax
    pub fn new(
        owner_id: String,
        vendor: String,
        category: String,
        expense_date: NaiveDate,
        amount: BigDecimal,
        tax_rate: TaxRate,
    ) -> Result<Self, TaxError> {
        let split = TaxCalculation::reverse_calculate(amount, tax_rate)?;
        let now = now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            vendor,
            category,
            description: None,
            expense_date,
            due_date: None,
            amount: split.total_amount,
            tax_rate: split.tax_rate,
            net_amount: split.base_amount,
            tax_amount: split.tax_amount,
            status: ExpenseStatus::Unpaid,
            paid_date: None,
            receipt_ref: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.status == ExpenseStatus::Unpaid && self.due_date.is_some_and(|due| due < today)
    }
}

/// Per-owner document and tax preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSettings {
    pub owner_id: String,
    pub company_name: String,
    pub invoice_prefix: String,
    pub quote_prefix: String,
    pub payment_terms_days: u32,
    pub quote_validity_days: u32,
    pub default_tax_rate: TaxRate,
    /// ISO 4217 code
    pub currency: String,
}

/// Rent-paying party tracked for monthly payment matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentTenant {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    /// Other names the tenant pays under (partner, company, nickname)
    pub aliases: Vec<String>,
    pub unit: Option<String>,
    pub monthly_rent: BigDecimal,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl RentTenant {
    pub fn new(owner_id: String, name: String, monthly_rent: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            aliases: Vec::new(),
            unit: None,
            monthly_rent: round_money(&monthly_rent),
            active: true,
            created_at: now(),
        }
    }

    /// Primary name followed by aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Row from an imported bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankEntry {
    /// Bank-provided identifier, used to avoid recording a row twice
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Positive for deposits, negative for withdrawals
    pub amount: BigDecimal,
    pub reference: Option<String>,
}

/// Rent received from a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentPayment {
    pub id: Uuid,
    pub owner_id: String,
    pub tenant_id: Uuid,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    /// Month the payment covers when it differs from the payment date's month
    pub period: Option<YearMonth>,
    /// Bank entry the payment was reconciled from
    pub source_entry_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl RentPayment {
    pub fn new(owner_id: String, tenant_id: Uuid, date: NaiveDate, amount: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            tenant_id,
            date,
            amount: round_money(&amount),
            period: None,
            source_entry_id: None,
            created_at: now(),
        }
    }

    /// Month this payment counts towards
    pub fn applies_to(&self) -> YearMonth {
        self.period.unwrap_or_else(|| YearMonth::from_date(self.date))
    }
}

/// Calendar month, formatted `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.succ().first_day()?.pred_opt()
    }

    /// Following month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// All months from `self` to `end`, inclusive
    pub fn through(self, end: YearMonth) -> impl Iterator<Item = YearMonth> {
        std::iter::successors(Some(self), move |current| {
            let next = current.succ();
            (next <= end).then_some(next)
        })
        .take_while(move |month| *month <= end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = BillingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || BillingError::Validation(format!("Invalid month '{}', expected YYYY-MM", value));
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Errors that can occur in the billing system
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
    #[error("Quote {0} is past its validity date")]
    QuoteExpired(String),
    #[error("Acceptance token is invalid or no longer active")]
    InvalidToken,
    #[error(transparent)]
    Tax(#[from] TaxError),
    #[error("Categorization error: {0}")]
    Categorization(String),
    #[error("Export error: {0}")]
    Export(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BillingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BillingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for billing operations
pub type BillingResult<T> = Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_invoice_transitions() {
        use InvoiceStatus::*;
        assert!(Draft.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Overdue));
        assert!(Overdue.can_transition_to(Paid));
        assert!(!Draft.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Sent));
        assert!(!PartiallyPaid.can_transition_to(Cancelled));
    }

    #[test]
    fn test_quote_transitions() {
        assert!(QuoteStatus::Draft.can_transition_to(QuoteStatus::Sent));
        assert!(QuoteStatus::Accepted.can_transition_to(QuoteStatus::Converted));
        assert!(!QuoteStatus::Draft.can_transition_to(QuoteStatus::Accepted));
        assert!(!QuoteStatus::Declined.can_transition_to(QuoteStatus::Accepted));
    }

    #[test]
    fn test_monthly_occurrence_clamps_to_month_end() {
        let start = date(2024, 1, 31);
        let monthly = Frequency::Monthly;
        assert_eq!(monthly.occurrence(start, 1), Some(date(2024, 2, 29)));
        assert_eq!(monthly.occurrence(start, 2), Some(date(2024, 3, 31)));
        assert_eq!(monthly.occurrence(start, 3), Some(date(2024, 4, 30)));
    }

    #[test]
    fn test_weekly_and_yearly_occurrences() {
        let start = date(2024, 2, 29);
        assert_eq!(Frequency::Weekly.occurrence(start, 2), Some(date(2024, 3, 14)));
        assert_eq!(Frequency::Yearly.occurrence(start, 1), Some(date(2025, 2, 28)));
        assert_eq!(Frequency::Yearly.occurrence(start, 4), Some(date(2028, 2, 29)));
    }

    #[test]
    fn test_year_month_parsing_and_iteration() {
        let start: YearMonth = "2023-11".parse().unwrap();
        let end = YearMonth::new(2024, 2).unwrap();
        let months: Vec<String> = start.through(end).map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);

        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("202401".parse::<YearMonth>().is_err());
        assert_eq!(end.last_day(), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_year_month_serializes_as_string() {
        let month = YearMonth::new(2024, 3).unwrap();
        let json = serde_json::to_string(&month).unwrap();
        assert_eq!(json, "\"2024-03\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, month);
    }

    #[test]
    fn test_rent_payment_period_attribution() {
        let mut payment = RentPayment::new(
            "owner".to_string(),
            Uuid::new_v4(),
            date(2024, 3, 2),
            BigDecimal::from(900),
        );
        assert_eq!(payment.applies_to(), YearMonth::new(2024, 3).unwrap());

        payment.period = YearMonth::new(2024, 2);
        assert_eq!(payment.applies_to(), YearMonth::new(2024, 2).unwrap());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap();
        assert_eq!(json, "\"partially_paid\"");
    }
}

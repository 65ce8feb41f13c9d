//! Quotes and customer sign-off

use bigdecimal::BigDecimal;
use chrono::{Days, NaiveDate};
use tracing::{info, warn};
use uuid::Uuid;

use crate::billing::invoice::{due_date_for, next_invoice_number};
use crate::billing::numbering;
use crate::billing::settings::load_settings;
use crate::config::BillingConfig;
use crate::tax::LineItem;
use crate::traits::*;
use crate::types::*;

/// Input for creating a quote
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    /// Defaults to the issue date plus the owner's quote validity
    pub valid_until: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub discount_percent: BigDecimal,
    pub notes: Option<String>,
}

impl NewQuote {
    pub fn new(client_id: Uuid, issue_date: NaiveDate, items: Vec<LineItem>) -> Self {
        Self {
            client_id,
            issue_date,
            valid_until: None,
            items,
            discount_percent: BigDecimal::from(0),
            notes: None,
        }
    }
}

fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Quote manager covering drafting, sign-off and conversion
pub struct QuoteManager<S: BillingStorage> {
    pub(crate) storage: S,
    config: BillingConfig,
    validator: Box<dyn DocumentValidator>,
    /// Rules for invoices created by conversion
    invoice_validator: Box<dyn DocumentValidator>,
}

impl<S: BillingStorage> QuoteManager<S> {
    pub fn new(storage: S, config: BillingConfig) -> Self {
        Self {
            storage,
            config,
            validator: Box::new(DefaultDocumentValidator),
            invoice_validator: Box::new(DefaultDocumentValidator),
        }
    }

    pub fn with_validator(
        storage: S,
        config: BillingConfig,
        validator: Box<dyn DocumentValidator>,
    ) -> Self {
        Self {
            storage,
            config,
            validator,
            invoice_validator: Box::new(DefaultDocumentValidator),
        }
    }

    /// Custom rules for quotes and for the invoices converted from them
    pub fn with_validators(
        storage: S,
        config: BillingConfig,
        quote_validator: Box<dyn DocumentValidator>,
        invoice_validator: Box<dyn DocumentValidator>,
    ) -> Self {
        Self {
            storage,
            config,
            validator: quote_validator,
            invoice_validator,
        }
    }

    /// Create a draft quote with the next quote number
    pub async fn create_quote(&mut self, owner_id: &str, input: NewQuote) -> BillingResult<Quote> {
        if self.storage.get_client(owner_id, input.client_id).await?.is_none() {
            return Err(BillingError::not_found("client", input.client_id));
        }

        let settings = load_settings(&self.storage, &self.config, owner_id).await?;
        let valid_until = match input.valid_until {
            Some(date) => date,
            None => input
                .issue_date
                .checked_add_days(Days::new(u64::from(settings.quote_validity_days)))
                .ok_or_else(|| {
                    BillingError::Validation(format!(
                        "Validity date out of range for {}",
                        input.issue_date
                    ))
                })?,
        };

        let existing = self.storage.list_quotes(owner_id).await?;
        let number = numbering::next_number(
            existing.iter().map(|q| q.number.as_str()),
            &settings.quote_prefix,
            input.issue_date,
        );

        let mut quote = Quote::new(
            owner_id.to_string(),
            input.client_id,
            number,
            input.issue_date,
            valid_until,
            input.items,
            input.discount_percent,
        )?;
        quote.notes = input.notes;

        self.validator.validate_quote(&quote)?;
        self.storage.save_quote(&quote).await?;

        info!(owner_id, number = %quote.number, total = %quote.totals.total, "quote created");
        Ok(quote)
    }

    pub async fn get_quote(&self, owner_id: &str, quote_id: Uuid) -> BillingResult<Option<Quote>> {
        self.storage.get_quote(owner_id, quote_id).await
    }

    pub async fn get_quote_required(&self, owner_id: &str, quote_id: Uuid) -> BillingResult<Quote> {
        self.storage
            .get_quote(owner_id, quote_id)
            .await?
            .ok_or_else(|| BillingError::not_found("quote", quote_id))
    }

    /// Quotes of an owner, newest first
    pub async fn list_quotes(&self, owner_id: &str) -> BillingResult<Vec<Quote>> {
        let mut quotes = self.storage.list_quotes(owner_id).await?;
        quotes.sort_by(|a, b| {
            b.issue_date
                .cmp(&a.issue_date)
                .then_with(|| b.number.cmp(&a.number))
        });
        Ok(quotes)
    }

    /// Replace the items and discount of a draft quote
    pub async fn update_items(
        &mut self,
        owner_id: &str,
        quote_id: Uuid,
        items: Vec<LineItem>,
        discount_percent: BigDecimal,
    ) -> BillingResult<Quote> {
        let mut quote = self.get_quote_required(owner_id, quote_id).await?;
        if quote.status != QuoteStatus::Draft {
            return Err(BillingError::Validation(format!(
                "Quote {} is {} and can no longer be edited",
                quote.number, quote.status
            )));
        }

        quote.items = items;
        quote.discount_percent = discount_percent;
        quote.recalculate_totals()?;
        self.validator.validate_quote(&quote)?;
        self.storage.update_quote(&quote).await?;
        Ok(quote)
    }

    /// Send a draft quote, issuing a fresh acceptance token
    pub async fn send_quote(&mut self, owner_id: &str, quote_id: Uuid) -> BillingResult<Quote> {
        let mut quote = self.get_quote_required(owner_id, quote_id).await?;
        quote.transition(QuoteStatus::Sent)?;
        quote.acceptance_token = Some(generate_token());
        self.storage.update_quote(&quote).await?;

        info!(owner_id, number = %quote.number, "quote sent");
        Ok(quote)
    }

    /// Customer accepts a quote through its token.
    ///
    /// A quote found past its validity date is moved to `Expired` and
    /// `QuoteExpired` is returned instead.
    pub async fn accept_by_token(&mut self, token: &str, today: NaiveDate) -> BillingResult<Quote> {
        self.respond(token, today, QuoteStatus::Accepted).await
    }

    /// Customer declines a quote through its token
    pub async fn decline_by_token(&mut self, token: &str, today: NaiveDate) -> BillingResult<Quote> {
        self.respond(token, today, QuoteStatus::Declined).await
    }

    async fn respond(
        &mut self,
        token: &str,
        today: NaiveDate,
        response: QuoteStatus,
    ) -> BillingResult<Quote> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BillingError::InvalidToken);
        }

        let mut quote = match self.storage.find_quote_by_token(token).await? {
            Some(quote) if quote.status == QuoteStatus::Sent => quote,
            _ => {
                warn!("quote response with unknown or inactive token");
                return Err(BillingError::InvalidToken);
            }
        };

        if quote.is_expired(today) {
            quote.transition(QuoteStatus::Expired)?;
            self.storage.update_quote(&quote).await?;
            info!(owner_id = %quote.owner_id, number = %quote.number, "quote expired on response");
            return Err(BillingError::QuoteExpired(quote.number));
        }

        quote.transition(response)?;
        let now = chrono::Utc::now().naive_utc();
        match response {
            QuoteStatus::Accepted => quote.accepted_at = Some(now),
            _ => quote.declined_at = Some(now),
        }
        self.storage.update_quote(&quote).await?;

        info!(owner_id = %quote.owner_id, number = %quote.number, status = %quote.status, "quote answered");
        Ok(quote)
    }

    /// Expire sent quotes past their validity date; returns the quotes changed
    pub async fn expire_stale(&mut self, owner_id: &str, today: NaiveDate) -> BillingResult<Vec<Quote>> {
        let quotes = self.storage.list_quotes(owner_id).await?;
        let mut expired = Vec::new();
        for mut quote in quotes {
            if quote.status != QuoteStatus::Sent || !quote.is_expired(today) {
                continue;
            }
            quote.transition(QuoteStatus::Expired)?;
            self.storage.update_quote(&quote).await?;
            expired.push(quote);
        }

        if !expired.is_empty() {
            info!(owner_id, count = expired.len(), "quotes expired");
        }
        Ok(expired)
    }

    /// Turn an accepted quote into a draft invoice carrying the same items.
    ///
    /// Returns the converted quote and the new invoice.
    pub async fn convert_to_invoice(
        &mut self,
        owner_id: &str,
        quote_id: Uuid,
        issue_date: NaiveDate,
    ) -> BillingResult<(Quote, Invoice)> {
        let mut quote = self.get_quote_required(owner_id, quote_id).await?;
        if !quote.status.can_transition_to(QuoteStatus::Converted) {
            return Err(BillingError::InvalidTransition {
                entity: "quote",
                from: quote.status.to_string(),
                to: QuoteStatus::Converted.to_string(),
            });
        }

        let settings = load_settings(&self.storage, &self.config, owner_id).await?;
        let number =
            next_invoice_number(&self.storage, owner_id, &settings.invoice_prefix, issue_date)
                .await?;

        let mut invoice = Invoice::new(
            owner_id.to_string(),
            quote.client_id,
            number,
            issue_date,
            due_date_for(issue_date, settings.payment_terms_days)?,
            quote.items.clone(),
            quote.discount_percent.clone(),
        )?;
        invoice.notes = quote.notes.clone();
        invoice.quote_id = Some(quote.id);

        self.invoice_validator.validate_invoice(&invoice)?;
        self.storage.save_invoice(&invoice).await?;

        quote.transition(QuoteStatus::Converted)?;
        quote.converted_invoice_id = Some(invoice.id);
        self.storage.update_quote(&quote).await?;

        info!(
            owner_id,
            quote = %quote.number,
            invoice = %invoice.number,
            "quote converted to invoice"
        );
        Ok((quote, invoice))
    }
}

//! Recurring templates and the daily expansion job

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::billing::invoice::{due_date_for, next_invoice_number};
use crate::billing::settings::load_settings;
use crate::config::BillingConfig;
use crate::tax::LineItem;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_name;

/// Input for creating a recurring template
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub client_id: Uuid,
    pub name: String,
    pub items: Vec<LineItem>,
    pub discount_percent: BigDecimal,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Defaults to the owner's payment terms
    pub payment_terms_days: Option<u32>,
    pub auto_send: bool,
}

impl NewTemplate {
    pub fn new(
        client_id: Uuid,
        name: impl Into<String>,
        items: Vec<LineItem>,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            client_id,
            name: name.into(),
            items,
            discount_percent: BigDecimal::from(0),
            frequency,
            start_date,
            end_date: None,
            payment_terms_days: None,
            auto_send: false,
        }
    }
}

fn validate_template(template: &RecurringTemplate) -> BillingResult<()> {
    validate_name("Template name", &template.name)?;

    if template.items.is_empty() {
        return Err(BillingError::Validation(
            "Template must have at least one line item".to_string(),
        ));
    }
    for item in &template.items {
        item.validate()?;
    }

    if template.end_date.is_some_and(|end| end < template.start_date) {
        return Err(BillingError::Validation(format!(
            "Template end date precedes start date {}",
            template.start_date
        )));
    }

    if template.payment_terms_days > 365 {
        return Err(BillingError::Validation(
            "Payment terms cannot exceed 365 days".to_string(),
        ));
    }

    Ok(())
}

fn occurrence_date(template: &RecurringTemplate, index: u32) -> BillingResult<NaiveDate> {
    template
        .frequency
        .occurrence(template.start_date, index)
        .ok_or_else(|| {
            BillingError::Validation(format!(
                "Occurrence {} of template {} is out of range",
                index, template.id
            ))
        })
}

fn past_end(template: &RecurringTemplate, date: NaiveDate) -> bool {
    template.end_date.is_some_and(|end| date > end)
}

/// Manager for recurring template records
pub struct RecurringManager<S: BillingStorage> {
    pub(crate) storage: S,
    config: BillingConfig,
}

impl<S: BillingStorage> RecurringManager<S> {
    pub fn new(storage: S, config: BillingConfig) -> Self {
        Self { storage, config }
    }

    /// Create an active template; its first run is on the start date
    pub async fn create_template(
        &mut self,
        owner_id: &str,
        input: NewTemplate,
    ) -> BillingResult<RecurringTemplate> {
        if self.storage.get_client(owner_id, input.client_id).await?.is_none() {
            return Err(BillingError::not_found("client", input.client_id));
        }

        let terms = match input.payment_terms_days {
            Some(days) => days,
            None => {
                load_settings(&self.storage, &self.config, owner_id)
                    .await?
                    .payment_terms_days
            }
        };

        let mut template = RecurringTemplate::new(
            owner_id.to_string(),
            input.client_id,
            input.name.trim().to_string(),
            input.items,
            input.frequency,
            input.start_date,
            input.end_date,
            terms,
        );
        template.discount_percent = input.discount_percent;
        template.auto_send = input.auto_send;

        validate_template(&template)?;
        self.storage.save_template(&template).await?;

        info!(owner_id, template_id = %template.id, frequency = ?template.frequency, "recurring template created");
        Ok(template)
    }

    pub async fn get_template(
        &self,
        owner_id: &str,
        template_id: Uuid,
    ) -> BillingResult<Option<RecurringTemplate>> {
        self.storage.get_template(owner_id, template_id).await
    }

    pub async fn get_template_required(
        &self,
        owner_id: &str,
        template_id: Uuid,
    ) -> BillingResult<RecurringTemplate> {
        self.storage
            .get_template(owner_id, template_id)
            .await?
            .ok_or_else(|| BillingError::not_found("recurring template", template_id))
    }

    pub async fn list_templates(&self, owner_id: &str) -> BillingResult<Vec<RecurringTemplate>> {
        let mut templates = self.storage.list_templates(owner_id).await?;
        templates.sort_by(|a, b| a.next_run_date.cmp(&b.next_run_date));
        Ok(templates)
    }

    /// Replace the items and discount used for future occurrences
    pub async fn update_items(
        &mut self,
        owner_id: &str,
        template_id: Uuid,
        items: Vec<LineItem>,
        discount_percent: BigDecimal,
    ) -> BillingResult<RecurringTemplate> {
        let mut template = self.get_template_required(owner_id, template_id).await?;
        template.items = items;
        template.discount_percent = discount_percent;
        template.updated_at = chrono::Utc::now().naive_utc();
        validate_template(&template)?;
        self.storage.update_template(&template).await?;
        Ok(template)
    }

    /// Stop generating invoices until resumed
    pub async fn pause_template(
        &mut self,
        owner_id: &str,
        template_id: Uuid,
    ) -> BillingResult<RecurringTemplate> {
        let mut template = self.get_template_required(owner_id, template_id).await?;
        template.active = false;
        template.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_template(&template).await?;

        info!(owner_id, %template_id, "recurring template paused");
        Ok(template)
    }

    /// Reactivate a paused template.
    ///
    /// Occurrences that fell before `today` while paused are skipped rather
    /// than billed retroactively.
    pub async fn resume_template(
        &mut self,
        owner_id: &str,
        template_id: Uuid,
        today: NaiveDate,
    ) -> BillingResult<RecurringTemplate> {
        let mut template = self.get_template_required(owner_id, template_id).await?;
        if template.active {
            return Ok(template);
        }

        let mut skipped = 0;
        while template.next_run_date < today {
            template.occurrences_generated += 1;
            template.next_run_date = occurrence_date(&template, template.occurrences_generated)?;
            skipped += 1;
        }

        if past_end(&template, template.next_run_date) {
            return Err(BillingError::Validation(format!(
                "Template {} has no occurrences left before its end date",
                template.name
            )));
        }

        template.active = true;
        template.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_template(&template).await?;

        info!(owner_id, %template_id, skipped, next_run = %template.next_run_date, "recurring template resumed");
        Ok(template)
    }

    /// Delete a template; invoices it already produced are kept
    pub async fn delete_template(&mut self, owner_id: &str, template_id: Uuid) -> BillingResult<()> {
        self.get_template_required(owner_id, template_id).await?;
        self.storage.delete_template(owner_id, template_id).await?;
        info!(owner_id, %template_id, "recurring template deleted");
        Ok(())
    }
}

/// Template that could not be expanded during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFailure {
    pub template_id: Uuid,
    pub owner_id: String,
    pub error: String,
}

/// Outcome of one expansion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_date: NaiveDate,
    pub templates_processed: usize,
    pub invoices_created: Vec<Uuid>,
    /// Templates switched off because their schedule ended
    pub deactivated: Vec<Uuid>,
    pub failures: Vec<TemplateFailure>,
}

impl RunReport {
    fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            templates_processed: 0,
            invoices_created: Vec::new(),
            deactivated: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Daily batch job turning due templates into invoices, across all owners
pub struct RecurringExpander<S: BillingStorage> {
    storage: S,
    config: BillingConfig,
    validator: Box<dyn DocumentValidator>,
}

impl<S: BillingStorage> RecurringExpander<S> {
    pub fn new(storage: S, config: BillingConfig) -> Self {
        Self {
            storage,
            config,
            validator: Box::new(DefaultDocumentValidator),
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
        }
    }

    /// Generate the invoices due on or before `today`.
    ///
    /// Each template catches up on missed occurrences, up to the configured
    /// per-run limit. One template failing does not stop the others. A rerun on
    /// the same day only continues a catch-up the limit cut short; no
    /// occurrence is ever billed twice, and once a template is caught up a
    /// rerun generates nothing.
    #[instrument(skip(self), fields(run_date = %today))]
    pub async fn run(&mut self, today: NaiveDate) -> BillingResult<RunReport> {
        let due = self.storage.list_due_templates(today).await?;
        let mut report = RunReport::new(today);

        for template in due {
            report.templates_processed += 1;
            let template_id = template.id;
            let owner_id = template.owner_id.clone();

            match self.expand_template(template, today).await {
                Ok((created, deactivated)) => {
                    report.invoices_created.extend(created);
                    if deactivated {
                        report.deactivated.push(template_id);
                    }
                }
                Err(error) => {
                    warn!(%template_id, owner_id, %error, "recurring template failed");
                    report.failures.push(TemplateFailure {
                        template_id,
                        owner_id,
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            templates = report.templates_processed,
            invoices = report.invoices_created.len(),
            deactivated = report.deactivated.len(),
            failures = report.failures.len(),
            "recurring run finished"
        );
        Ok(report)
    }

    async fn expand_template(
        &mut self,
        mut template: RecurringTemplate,
        today: NaiveDate,
    ) -> BillingResult<(Vec<Uuid>, bool)> {
        let owner_id = template.owner_id.clone();
        let settings = load_settings(&self.storage, &self.config, &owner_id).await?;

        // Occurrences already billed by an earlier, interrupted run
        let already_billed: HashSet<u32> = self
            .storage
            .list_invoices(&owner_id, &InvoiceFilter::client(template.client_id))
            .await?
            .into_iter()
            .filter(|invoice| invoice.template_id == Some(template.id))
            .filter_map(|invoice| invoice.occurrence_index)
            .collect();

        let mut created = Vec::new();
        let limit = self.config.recurring.max_catch_up.max(1) as usize;

        while created.len() < limit {
            let index = template.occurrences_generated;
            let occurrence = occurrence_date(&template, index)?;
            if occurrence > today || past_end(&template, occurrence) {
                break;
            }

            if already_billed.contains(&index) {
                debug!(template_id = %template.id, index, "occurrence already billed");
            } else {
                let invoice = self
                    .materialize(&template, &settings.invoice_prefix, index, occurrence)
                    .await?;
                created.push(invoice.id);
            }

            template.occurrences_generated += 1;
            template.next_run_date = occurrence_date(&template, template.occurrences_generated)?;
        }

        let deactivated = past_end(&template, template.next_run_date);
        if deactivated {
            template.active = false;
            info!(template_id = %template.id, owner_id, "recurring template reached its end date");
        }

        template.last_run_date = Some(today);
        template.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_template(&template).await?;
        Ok((created, deactivated))
    }

    async fn materialize(
        &mut self,
        template: &RecurringTemplate,
        prefix: &str,
        index: u32,
        occurrence: NaiveDate,
    ) -> BillingResult<Invoice> {
        let number = next_invoice_number(&self.storage, &template.owner_id, prefix, occurrence).await?;
        let mut invoice = Invoice::new(
            template.owner_id.clone(),
            template.client_id,
            number,
            occurrence,
            due_date_for(occurrence, template.payment_terms_days)?,
            template.items.clone(),
            template.discount_percent.clone(),
        )?;
        invoice.template_id = Some(template.id);
        invoice.occurrence_index = Some(index);

        if template.auto_send {
            invoice.transition(InvoiceStatus::Sent)?;
            invoice.sent_at = Some(chrono::Utc::now().naive_utc());
        }

        self.validator.validate_invoice(&invoice)?;
        self.storage.save_invoice(&invoice).await?;
        debug!(template_id = %template.id, number = %invoice.number, %occurrence, "recurring invoice generated");
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::TaxRate;
    use crate::utils::MemoryStorage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn items() -> Vec<LineItem> {
        vec![LineItem::new(
            "Monthly retainer".to_string(),
            BigDecimal::from(1),
            BigDecimal::from(500),
            TaxRate::zero(),
        )
        .unwrap()]
    }

    async fn setup() -> (MemoryStorage, RecurringManager<MemoryStorage>, Uuid) {
        let mut storage = MemoryStorage::new();
        let client = Client::new("owner".to_string(), "Acme".to_string());
        storage.save_client(&client).await.unwrap();
        let manager = RecurringManager::new(storage.clone(), BillingConfig::default());
        (storage, manager, client.id)
    }

    async fn invoices(storage: &MemoryStorage) -> Vec<Invoice> {
        let mut invoices = storage
            .list_invoices("owner", &InvoiceFilter::default())
            .await
            .unwrap();
        invoices.sort_by_key(|i| i.issue_date);
        invoices
    }

    #[tokio::test]
    async fn test_run_generates_due_occurrence_once() {
        let (storage, mut manager, client_id) = setup().await;
        let template = manager
            .create_template(
                "owner",
                NewTemplate::new(client_id, "Retainer", items(), Frequency::Monthly, date(2024, 1, 31)),
            )
            .await
            .unwrap();
        assert_eq!(template.next_run_date, date(2024, 1, 31));

        let mut expander = RecurringExpander::new(storage.clone(), BillingConfig::default());
        let report = expander.run(date(2024, 1, 31)).await.unwrap();
        assert_eq!(report.invoices_created.len(), 1);
        assert!(report.is_clean());

        let again = expander.run(date(2024, 1, 31)).await.unwrap();
        assert_eq!(again.templates_processed, 0);
        assert!(again.invoices_created.is_empty());

        let stored = manager.get_template_required("owner", template.id).await.unwrap();
        assert_eq!(stored.next_run_date, date(2024, 2, 29));
        assert_eq!(stored.occurrences_generated, 1);

        let generated = invoices(&storage).await;
        assert_eq!(generated[0].due_date, date(2024, 3, 1));
        assert_eq!(generated[0].template_id, Some(template.id));
        assert_eq!(generated[0].occurrence_index, Some(0));
    }

    #[tokio::test]
    async fn test_catch_up_keeps_month_end_anchor() {
        let (storage, mut manager, client_id) = setup().await;
        manager
            .create_template(
                "owner",
                NewTemplate::new(client_id, "Retainer", items(), Frequency::Monthly, date(2024, 1, 31)),
            )
            .await
            .unwrap();

        let mut expander = RecurringExpander::new(storage.clone(), BillingConfig::default());
        let report = expander.run(date(2024, 4, 30)).await.unwrap();
        assert_eq!(report.invoices_created.len(), 4);

        let dates: Vec<NaiveDate> = invoices(&storage).await.iter().map(|i| i.issue_date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]
        );

        let numbers: HashSet<String> = invoices(&storage).await.into_iter().map(|i| i.number).collect();
        assert_eq!(numbers.len(), 4);
    }

    #[tokio::test]
    async fn test_catch_up_is_capped_per_run() {
        let (storage, mut manager, client_id) = setup().await;
        manager
            .create_template(
                "owner",
                NewTemplate::new(client_id, "Weekly", items(), Frequency::Weekly, date(2024, 1, 1)),
            )
            .await
            .unwrap();

        let mut config = BillingConfig::default();
        config.recurring.max_catch_up = 3;
        let mut expander = RecurringExpander::new(storage.clone(), config);

        // Nine Mondays from Jan 1 to Feb 26, three per run
        for _ in 0..3 {
            let run = expander.run(date(2024, 3, 1)).await.unwrap();
            assert_eq!(run.invoices_created.len(), 3);
        }
        let caught_up = expander.run(date(2024, 3, 1)).await.unwrap();
        assert!(caught_up.invoices_created.is_empty());

        let billed: HashSet<Option<u32>> = invoices(&storage)
            .await
            .iter()
            .map(|i| i.occurrence_index)
            .collect();
        assert_eq!(billed.len(), 9);
        assert!(invoices(&storage).await.iter().all(|i| i.issue_date <= date(2024, 2, 26)));
    }

    #[tokio::test]
    async fn test_end_date_deactivates_template() {
        let (storage, mut manager, client_id) = setup().await;
        let mut input = NewTemplate::new(client_id, "Short", items(), Frequency::Monthly, date(2024, 1, 15));
        input.end_date = Some(date(2024, 2, 20));
        input.auto_send = true;
        let template = manager.create_template("owner", input).await.unwrap();

        let mut expander = RecurringExpander::new(storage.clone(), BillingConfig::default());
        let report = expander.run(date(2024, 6, 1)).await.unwrap();
        assert_eq!(report.invoices_created.len(), 2);
        assert_eq!(report.deactivated, vec![template.id]);

        let stored = manager.get_template_required("owner", template.id).await.unwrap();
        assert!(!stored.active);
        assert!(invoices(&storage).await.iter().all(|i| i.status == InvoiceStatus::Sent));
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_fatal() {
        let (mut storage, mut manager, client_id) = setup().await;
        manager
            .create_template(
                "owner",
                NewTemplate::new(client_id, "Good", items(), Frequency::Weekly, date(2024, 1, 1)),
            )
            .await
            .unwrap();

        // Stored directly so template validation is bypassed
        let broken = RecurringTemplate::new(
            "owner".to_string(),
            client_id,
            "Broken".to_string(),
            Vec::new(),
            Frequency::Weekly,
            date(2024, 1, 1),
            None,
            30,
        );
        storage.save_template(&broken).await.unwrap();

        let mut expander = RecurringExpander::new(storage.clone(), BillingConfig::default());
        let report = expander.run(date(2024, 1, 1)).await.unwrap();
        assert_eq!(report.templates_processed, 2);
        assert_eq!(report.invoices_created.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].template_id, broken.id);

        let stored = storage.get_template("owner", broken.id).await.unwrap().unwrap();
        assert_eq!(stored.next_run_date, date(2024, 1, 1));
    }

    #[tokio::test]
    async fn test_pause_and_resume_skip_missed() {
        let (storage, mut manager, client_id) = setup().await;
        let template = manager
            .create_template(
                "owner",
                NewTemplate::new(client_id, "Retainer", items(), Frequency::Monthly, date(2024, 1, 10)),
            )
            .await
            .unwrap();

        manager.pause_template("owner", template.id).await.unwrap();
        let mut expander = RecurringExpander::new(storage.clone(), BillingConfig::default());
        assert_eq!(expander.run(date(2024, 3, 1)).await.unwrap().templates_processed, 0);

        let resumed = manager
            .resume_template("owner", template.id, date(2024, 3, 15))
            .await
            .unwrap();
        assert!(resumed.active);
        assert_eq!(resumed.next_run_date, date(2024, 4, 10));
        assert_eq!(resumed.occurrences_generated, 3);
    }
}

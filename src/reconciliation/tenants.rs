//! Rent tenants, recorded payments and statement reconciliation

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::config::MatcherConfig;
use crate::reconciliation::matcher::*;
use crate::reconciliation::status::PaymentLedger;
use crate::traits::BillingStorage;
use crate::tax::round_money;
use crate::types::*;
use crate::utils::validation::{validate_name, validate_positive_amount};

fn clean_aliases(aliases: Vec<String>) -> Vec<String> {
    aliases
        .into_iter()
        .map(|alias| alias.trim().to_string())
        .filter(|alias| !alias.is_empty())
        .collect()
}

/// Manual rent payment entry
#[derive(Debug, Clone)]
pub struct NewRentPayment {
    pub tenant_id: Uuid,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub period: Option<YearMonth>,
}

/// Manager for rent tenants and their payments
pub struct RentManager<S: BillingStorage> {
    storage: S,
    matcher: PaymentMatcher,
}

impl<S: BillingStorage> RentManager<S> {
    pub fn new(storage: S, config: MatcherConfig) -> Self {
        Self {
            storage,
            matcher: PaymentMatcher::new(config),
        }
    }

    /// Register a tenant
    pub async fn create_tenant(
        &mut self,
        owner_id: &str,
        name: &str,
        monthly_rent: BigDecimal,
        aliases: Vec<String>,
    ) -> BillingResult<RentTenant> {
        validate_name("Tenant name", name)?;
        validate_positive_amount(&monthly_rent)?;

        let mut tenant = RentTenant::new(owner_id.to_string(), name.trim().to_string(), monthly_rent);
        tenant.aliases = clean_aliases(aliases);

        self.storage.save_rent_tenant(&tenant).await?;
        info!(owner_id, tenant_id = %tenant.id, "rent tenant created");
        Ok(tenant)
    }

    pub async fn get_tenant_required(&self, owner_id: &str, tenant_id: Uuid) -> BillingResult<RentTenant> {
        self.storage
            .get_rent_tenant(owner_id, tenant_id)
            .await?
            .ok_or_else(|| BillingError::not_found("rent tenant", tenant_id))
    }

    /// Tenants sorted by name
    pub async fn list_tenants(&self, owner_id: &str) -> BillingResult<Vec<RentTenant>> {
        let mut tenants = self.storage.list_rent_tenants(owner_id).await?;
        tenants.sort_by_key(|t| t.name.to_lowercase());
        Ok(tenants)
    }

    /// Save edits to a tenant under the same rules as `create_tenant`
    pub async fn update_tenant(&mut self, tenant: &RentTenant) -> BillingResult<RentTenant> {
        validate_name("Tenant name", &tenant.name)?;
        validate_positive_amount(&tenant.monthly_rent)?;
        self.get_tenant_required(&tenant.owner_id, tenant.id).await?;

        let mut tenant = tenant.clone();
        tenant.name = tenant.name.trim().to_string();
        tenant.monthly_rent = round_money(&tenant.monthly_rent);
        tenant.aliases = clean_aliases(tenant.aliases);
        self.storage.update_rent_tenant(&tenant).await?;
        Ok(tenant)
    }

    /// Stop matching and tracking a tenant who moved out; history is kept
    pub async fn deactivate_tenant(&mut self, owner_id: &str, tenant_id: Uuid) -> BillingResult<RentTenant> {
        let mut tenant = self.get_tenant_required(owner_id, tenant_id).await?;
        tenant.active = false;
        self.storage.update_rent_tenant(&tenant).await?;
        info!(owner_id, %tenant_id, "rent tenant deactivated");
        Ok(tenant)
    }

    /// Record a payment typed in by hand
    pub async fn record_payment(&mut self, owner_id: &str, input: NewRentPayment) -> BillingResult<RentPayment> {
        self.get_tenant_required(owner_id, input.tenant_id).await?;
        validate_positive_amount(&input.amount)?;

        let mut payment = RentPayment::new(owner_id.to_string(), input.tenant_id, input.date, input.amount);
        payment.period = input.period;
        self.storage.save_rent_payment(&payment).await?;
        Ok(payment)
    }

    /// Match a statement against the owner's active tenants.
    ///
    /// Entries already booked by an earlier reconciliation come back as
    /// `Ignored` with `AlreadyRecorded`.
    pub async fn reconcile(
        &self,
        owner_id: &str,
        entries: &[BankEntry],
    ) -> BillingResult<(Vec<MatchResult>, ReconciliationSummary)> {
        let tenants = self.storage.list_rent_tenants(owner_id).await?;

        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            if self
                .storage
                .find_rent_payment_by_entry(owner_id, &entry.id)
                .await?
                .is_some()
            {
                results.push(MatchResult::Ignored {
                    entry: entry.clone(),
                    reason: IgnoreReason::AlreadyRecorded,
                });
            } else {
                results.push(self.matcher.match_entry(entry, &tenants));
            }
        }

        let summary = ReconciliationSummary::from_results(&results);
        info!(
            owner_id,
            entries = entries.len(),
            matched = summary.matched,
            ambiguous = summary.ambiguous,
            amount_only = summary.amount_only,
            unmatched = summary.unmatched,
            ignored = summary.ignored,
            "statement reconciled"
        );
        Ok((results, summary))
    }

    /// Book a bank entry against a tenant, e.g. after a manual pick.
    ///
    /// Returns `None` when a payment from this entry already exists.
    pub async fn confirm(
        &mut self,
        owner_id: &str,
        entry: &BankEntry,
        tenant_id: Uuid,
        period: Option<YearMonth>,
    ) -> BillingResult<Option<RentPayment>> {
        self.get_tenant_required(owner_id, tenant_id).await?;
        validate_positive_amount(&entry.amount)?;

        if self
            .storage
            .find_rent_payment_by_entry(owner_id, &entry.id)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let mut payment = payment_from_entry(owner_id, entry, tenant_id);
        payment.period = period;
        self.storage.save_rent_payment(&payment).await?;
        Ok(Some(payment))
    }

    /// Book every decisive match; returns the payments created
    pub async fn confirm_matches(
        &mut self,
        owner_id: &str,
        results: &[MatchResult],
    ) -> BillingResult<Vec<RentPayment>> {
        let mut recorded = Vec::new();
        for result in results {
            if let Some(tenant_id) = result.matched_tenant() {
                if let Some(payment) = self.confirm(owner_id, result.entry(), tenant_id, None).await? {
                    recorded.push(payment);
                }
            }
        }
        info!(owner_id, count = recorded.len(), "rent matches confirmed");
        Ok(recorded)
    }

    pub async fn list_payments(
        &self,
        owner_id: &str,
        tenant_id: Option<Uuid>,
    ) -> BillingResult<Vec<RentPayment>> {
        let mut payments = self.storage.list_rent_payments(owner_id, tenant_id).await?;
        payments.sort_by_key(|p| p.date);
        Ok(payments)
    }

    /// Payment grid of the owner's active tenants
    pub async fn payment_ledger(
        &self,
        owner_id: &str,
        from: YearMonth,
        to: YearMonth,
    ) -> BillingResult<PaymentLedger> {
        let tenants: Vec<RentTenant> = self
            .list_tenants(owner_id)
            .await?
            .into_iter()
            .filter(|t| t.active)
            .collect();
        let payments = self.storage.list_rent_payments(owner_id, None).await?;
        Ok(PaymentLedger::build(&tenants, &payments, from, to))
    }
}

//! Per-owner business settings

use tracing::info;

use crate::config::BillingConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_name, validate_prefix};

/// Stored settings for `owner_id`, or the configured defaults when none were saved
pub(crate) async fn load_settings<S: BillingStorage>(
    storage: &S,
    config: &BillingConfig,
    owner_id: &str,
) -> BillingResult<BusinessSettings> {
    Ok(storage
        .get_settings(owner_id)
        .await?
        .unwrap_or_else(|| config.default_settings(owner_id)))
}

/// Validate settings before saving
pub fn validate_settings(settings: &BusinessSettings) -> BillingResult<()> {
    if settings.owner_id.trim().is_empty() {
        return Err(BillingError::Validation(
            "Owner ID cannot be empty".to_string(),
        ));
    }

    if !settings.company_name.is_empty() {
        validate_name("Company name", &settings.company_name)?;
    }

    validate_prefix(&settings.invoice_prefix)?;
    validate_prefix(&settings.quote_prefix)?;

    if settings.invoice_prefix == settings.quote_prefix {
        return Err(BillingError::Validation(
            "Invoice and quote prefixes must differ".to_string(),
        ));
    }

    if settings.payment_terms_days > 365 || settings.quote_validity_days > 365 {
        return Err(BillingError::Validation(
            "Payment terms and quote validity cannot exceed 365 days".to_string(),
        ));
    }

    if settings.currency.len() != 3 || !settings.currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(BillingError::Validation(format!(
            "Currency '{}' must be a three-letter ISO code",
            settings.currency
        )));
    }

    settings.default_tax_rate.validate()?;
    Ok(())
}

/// Settings manager for reading and updating owner preferences
pub struct SettingsManager<S: BillingStorage> {
    storage: S,
    config: BillingConfig,
}

impl<S: BillingStorage> SettingsManager<S> {
    pub fn new(storage: S, config: BillingConfig) -> Self {
        Self { storage, config }
    }

    /// Current settings for an owner
    pub async fn get_settings(&self, owner_id: &str) -> BillingResult<BusinessSettings> {
        load_settings(&self.storage, &self.config, owner_id).await
    }

    /// Validate and persist settings
    pub async fn update_settings(&mut self, settings: BusinessSettings) -> BillingResult<BusinessSettings> {
        validate_settings(&settings)?;
        self.storage.save_settings(&settings).await?;
        info!(owner_id = %settings.owner_id, "business settings updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;

    #[tokio::test]
    async fn test_defaults_until_saved() {
        let mut manager = SettingsManager::new(MemoryStorage::new(), BillingConfig::default());
        let settings = manager.get_settings("owner").await.unwrap();
        assert_eq!(settings.invoice_prefix, "INV");

        let mut custom = settings.clone();
        custom.company_name = "Acme Studio".to_string();
        custom.invoice_prefix = "AS".to_string();
        manager.update_settings(custom).await.unwrap();

        let reloaded = manager.get_settings("owner").await.unwrap();
        assert_eq!(reloaded.invoice_prefix, "AS");
        assert_eq!(manager.get_settings("other").await.unwrap().invoice_prefix, "INV");
    }

    #[test]
    fn test_rejects_bad_settings() {
        let config = BillingConfig::default();

        let mut settings = config.default_settings("owner");
        settings.quote_prefix = settings.invoice_prefix.clone();
        assert!(validate_settings(&settings).is_err());

        let mut settings = config.default_settings("owner");
        settings.currency = "usd".to_string();
        assert!(validate_settings(&settings).is_err());

        let mut settings = config.default_settings("owner");
        settings.payment_terms_days = 400;
        assert!(validate_settings(&settings).is_err());
    }
}

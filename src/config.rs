//! Environment-driven configuration

use bigdecimal::BigDecimal;
use std::env;
use std::str::FromStr;

use crate::tax::TaxRate;
use crate::types::BusinessSettings;
use crate::utils::validation::validate_prefix;

/// Top-level configuration for the billing core.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingConfig {
    pub documents: DocumentDefaults,
    pub matcher: MatcherConfig,
    pub recurring: RecurringConfig,
    pub telemetry: TelemetryConfig,
}

impl BillingConfig {
    /// Load configuration from the process environment, reading `.env` first if present
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let documents = DocumentDefaults {
            invoice_prefix: prefix_or(&lookup, "BILLING_INVOICE_PREFIX", defaults.documents.invoice_prefix)?,
            quote_prefix: prefix_or(&lookup, "BILLING_QUOTE_PREFIX", defaults.documents.quote_prefix)?,
            payment_terms_days: parse_or(
                &lookup,
                "BILLING_PAYMENT_TERMS_DAYS",
                defaults.documents.payment_terms_days,
            )?,
            quote_validity_days: parse_or(
                &lookup,
                "BILLING_QUOTE_VALIDITY_DAYS",
                defaults.documents.quote_validity_days,
            )?,
            default_tax_rate: match lookup("BILLING_DEFAULT_TAX_RATE") {
                Some(value) => BigDecimal::from_str(value.trim())
                    .ok()
                    .and_then(|percent| TaxRate::new(percent).ok())
                    .ok_or(ConfigError::Invalid {
                        key: "BILLING_DEFAULT_TAX_RATE",
                        value,
                    })?,
                None => defaults.documents.default_tax_rate,
            },
            currency: lookup("BILLING_CURRENCY")
                .map(|c| c.trim().to_ascii_uppercase())
                .unwrap_or(defaults.documents.currency),
        };

        let matcher = MatcherConfig {
            name_threshold: parse_or(
                &lookup,
                "RECON_NAME_THRESHOLD",
                defaults.matcher.name_threshold,
            )?,
            amount_tolerance: match lookup("RECON_AMOUNT_TOLERANCE") {
                Some(value) => BigDecimal::from_str(value.trim())
                    .ok()
                    .filter(|tolerance| *tolerance >= BigDecimal::from(0))
                    .ok_or(ConfigError::Invalid {
                        key: "RECON_AMOUNT_TOLERANCE",
                        value,
                    })?,
                None => defaults.matcher.amount_tolerance,
            },
        };

        if !(0.0..=1.0).contains(&matcher.name_threshold) {
            return Err(ConfigError::Invalid {
                key: "RECON_NAME_THRESHOLD",
                value: matcher.name_threshold.to_string(),
            });
        }

        let recurring = RecurringConfig {
            max_catch_up: parse_or(
                &lookup,
                "RECURRING_MAX_CATCH_UP",
                defaults.recurring.max_catch_up,
            )?,
        };

        let telemetry = TelemetryConfig {
            log_level: lookup("BILLING_LOG_LEVEL").unwrap_or(defaults.telemetry.log_level),
        };

        Ok(Self {
            documents,
            matcher,
            recurring,
            telemetry,
        })
    }

    /// Settings used for an owner who has not saved any of their own
    pub fn default_settings(&self, owner_id: &str) -> BusinessSettings {
        BusinessSettings {
            owner_id: owner_id.to_string(),
            company_name: String::new(),
            invoice_prefix: self.documents.invoice_prefix.clone(),
            quote_prefix: self.documents.quote_prefix.clone(),
            payment_terms_days: self.documents.payment_terms_days,
            quote_validity_days: self.documents.quote_validity_days,
            default_tax_rate: self.documents.default_tax_rate.clone(),
            currency: self.documents.currency.clone(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            documents: DocumentDefaults {
                invoice_prefix: "INV".to_string(),
                quote_prefix: "QUO".to_string(),
                payment_terms_days: 30,
                quote_validity_days: 30,
                default_tax_rate: TaxRate::zero(),
                currency: "USD".to_string(),
            },
            matcher: MatcherConfig::default(),
            recurring: RecurringConfig::default(),
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn prefix_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: String,
) -> Result<String, ConfigError> {
    match lookup(key) {
        Some(value) => {
            let prefix = value.trim().to_string();
            validate_prefix(&prefix).map_err(|_| ConfigError::Invalid { key, value })?;
            Ok(prefix)
        }
        None => Ok(default),
    }
}

/// Defaults applied to new documents
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentDefaults {
    pub invoice_prefix: String,
    pub quote_prefix: String,
    pub payment_terms_days: u32,
    pub quote_validity_days: u32,
    pub default_tax_rate: TaxRate,
    pub currency: String,
}

/// Thresholds for bank-entry matching
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Minimum name similarity (0.0..=1.0) for a tenant to be a candidate
    pub name_threshold: f64,
    /// Largest difference from the monthly rent still counted as an exact amount
    pub amount_tolerance: BigDecimal,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            name_threshold: 0.6,
            amount_tolerance: BigDecimal::new(1.into(), 2),
        }
    }
}

/// Limits for the recurring-invoice job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringConfig {
    /// Most occurrences a single template may materialize in one run
    pub max_catch_up: u32,
}

impl Default for RecurringConfig {
    fn default() -> Self {
        Self { max_catch_up: 12 }
    }
}

/// Tracing controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

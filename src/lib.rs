//! # Invoicing Core
//!
//! A multi-tenant billing library: clients, quotes, invoices, recurring
//! invoices, expenses, rent reconciliation and sales categorization.
//!
//! ## Features
//!
//! - **Documents**: Quotes with customer sign-off tokens, invoices with payment tracking
//! - **Numbering**: Sequential `PREFIX-YEAR-0001` numbers per owner and year
//! - **Tax**: Per-line rounding, discounts spread across lines, tax-inclusive expenses
//! - **Recurring billing**: Daily job expanding weekly, monthly and yearly templates
//! - **Rent reconciliation**: Fuzzy matching of bank deposits to tenants and a monthly payment grid
//! - **Categorization**: Pluggable categorizer with keyword fallback and sales reports
//! - **Storage abstraction**: Every record scoped to an `owner_id` behind a storage trait
//!
//! ## Quick Start
//!
//! ```rust
//! use invoicing_core::{Billing, BillingConfig, MemoryStorage, NewClient};
//!
//! # async fn demo() -> invoicing_core::BillingResult<()> {
//! let mut billing = Billing::new(MemoryStorage::new(), BillingConfig::default());
//! let client = billing.create_client("owner-1", NewClient::named("Acme Ltd")).await?;
//! assert_eq!(client.owner_id, "owner-1");
//! # Ok(())
//! # }
//! ```

pub mod billing;
pub mod categorization;
pub mod config;
pub mod export;
pub mod reconciliation;
pub mod tax;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use billing::*;
pub use categorization::*;
pub use config::{BillingConfig, ConfigError, DocumentDefaults, MatcherConfig, RecurringConfig, TelemetryConfig};
pub use reconciliation::*;
pub use tax::*;
pub use traits::*;
pub use types::*;
pub use utils::MemoryStorage;

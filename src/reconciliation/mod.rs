//! Rent reconciliation: bank statement matching and monthly payment status
//!
//! Deposits from an imported statement are matched to rent tenants by fuzzy
//! name similarity and amount, confirmed into [`RentPayment`](crate::types::RentPayment)
//! records, and summarised per tenant and month in a [`PaymentLedger`].

pub mod matcher;
pub mod similarity;
pub mod statement;
pub mod status;
pub mod tenants;

pub use matcher::*;
pub use similarity::*;
pub use statement::*;
pub use status::*;
pub use tenants::*;

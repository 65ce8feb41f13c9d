//! Billing module: clients, quotes, invoices, recurring templates and expenses

pub mod client;
pub mod core;
pub mod expense;
pub mod invoice;
pub mod numbering;
pub mod quote;
pub mod recurring;
pub mod settings;

pub use client::*;
pub use self::core::*;
pub use expense::*;
pub use invoice::*;
pub use quote::*;
pub use recurring::*;
pub use settings::*;

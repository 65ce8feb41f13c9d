//! Sales categorization
//!
//! Categorizing is best-effort. A [`Categorizer`] backed by a language model
//! can be plugged in from outside this crate; the [`KeywordCategorizer`] covers
//! for it when it is absent or misbehaves.

use async_trait::async_trait;

use crate::types::BillingResult;

pub mod keyword;
pub mod report;
pub mod service;

pub use keyword::*;
pub use report::*;
pub use service::*;

/// Category given when nothing else applies
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Assigns one of `categories` to each description.
///
/// Implementations return exactly one answer per description, in order, with
/// `None` where they have no opinion.
#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn categorize(
        &self,
        descriptions: &[String],
        categories: &[String],
    ) -> BillingResult<Vec<Option<String>>>;
}

//! Best-effort categorization with keyword fallback

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::categorization::{Categorizer, KeywordCategorizer, UNCATEGORIZED};
use crate::types::*;

/// Categorizes sales lines against a fixed category list.
///
/// Never fails: model errors, malformed answers and unknown categories fall
/// back to the keyword rules and finally to [`UNCATEGORIZED`].
pub struct CategorizationService {
    primary: Option<Box<dyn Categorizer>>,
    fallback: KeywordCategorizer,
    categories: Vec<String>,
}

impl CategorizationService {
    /// Service using only keyword rules
    pub fn new(categories: Vec<String>, fallback: KeywordCategorizer) -> Self {
        let mut allowed: Vec<String> = Vec::new();
        for category in categories {
            let category = category.trim().to_string();
            if !category.is_empty() && !allowed.iter().any(|c| c.eq_ignore_ascii_case(&category)) {
                allowed.push(category);
            }
        }

        Self {
            primary: None,
            fallback,
            categories: allowed,
        }
    }

    /// Put a model-backed categorizer in front of the keyword rules
    pub fn with_primary(mut self, primary: Box<dyn Categorizer>) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Map a raw answer onto the allowed list
    fn sanitize(&self, answer: &str) -> Option<String> {
        let answer = answer.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '.');
        self.categories
            .iter()
            .find(|allowed| allowed.eq_ignore_ascii_case(answer))
            .cloned()
    }

    /// One category per description, in order
    pub async fn categorize(&self, descriptions: &[String]) -> Vec<String> {
        if descriptions.is_empty() {
            return Vec::new();
        }

        let answers = match &self.primary {
            Some(primary) => match primary.categorize(descriptions, &self.categories).await {
                Ok(answers) if answers.len() == descriptions.len() => answers,
                Ok(answers) => {
                    warn!(
                        expected = descriptions.len(),
                        received = answers.len(),
                        "categorizer returned wrong number of answers, using keyword rules"
                    );
                    vec![None; descriptions.len()]
                }
                Err(error) => {
                    warn!(%error, "categorizer failed, using keyword rules");
                    vec![None; descriptions.len()]
                }
            },
            None => vec![None; descriptions.len()],
        };

        descriptions
            .iter()
            .zip(answers)
            .map(|(description, answer)| {
                answer
                    .as_deref()
                    .and_then(|answer| self.sanitize(answer))
                    .or_else(|| {
                        let fallback = self.fallback.categorize_one(description, &self.categories);
                        if fallback.is_some() {
                            debug!(description = %description, "category taken from keyword rules");
                        }
                        fallback
                    })
                    .unwrap_or_else(|| UNCATEGORIZED.to_string())
            })
            .collect()
    }

    /// Set the category of every line and of the invoice itself.
    ///
    /// The invoice takes the category carrying the largest line subtotal.
    pub async fn categorize_invoice(&self, invoice: &mut Invoice) {
        let descriptions: Vec<String> = invoice.items.iter().map(|i| i.description.clone()).collect();
        let categories = self.categorize(&descriptions).await;

        let mut weight: HashMap<&str, BigDecimal> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();
        for (item, category) in invoice.items.iter().zip(&categories) {
            let slot = weight.entry(category.as_str()).or_insert_with(|| {
                first_seen.push(category.as_str());
                BigDecimal::from(0)
            });
            *slot += item.subtotal();
        }

        let mut best: Option<(&str, &BigDecimal)> = None;
        for category in &first_seen {
            if let Some(amount) = weight.get(category) {
                if best.is_none_or(|(_, top)| amount > top) {
                    best = Some((*category, amount));
                }
            }
        }
        let invoice_category = best.map(|(category, _)| category.to_string());

        for (item, category) in invoice.items.iter_mut().zip(categories.iter()) {
            item.category = Some(category.clone());
        }
        invoice.category = invoice_category;
        invoice.updated_at = chrono::Utc::now().naive_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{LineItem, TaxRate};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use uuid::Uuid;

    struct FixedCategorizer(Vec<Option<String>>);

    #[async_trait]
    impl Categorizer for FixedCategorizer {
        async fn categorize(
            &self,
            _descriptions: &[String],
            _categories: &[String],
        ) -> BillingResult<Vec<Option<String>>> {
            Ok(self.0.clone())
        }
    }

    struct FailingCategorizer;

    #[async_trait]
    impl Categorizer for FailingCategorizer {
        async fn categorize(
            &self,
            _descriptions: &[String],
            _categories: &[String],
        ) -> BillingResult<Vec<Option<String>>> {
            Err(BillingError::Categorization("upstream timeout".to_string()))
        }
    }

    fn service() -> CategorizationService {
        CategorizationService::new(
            vec!["Consulting".to_string(), "Design".to_string(), " design ".to_string()],
            KeywordCategorizer::with_default_rules(),
        )
    }

    fn descriptions(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_categories_deduplicated() {
        assert_eq!(service().categories(), ["Consulting", "Design"]);
    }

    #[tokio::test]
    async fn test_primary_answers_are_sanitized() {
        let service = service().with_primary(Box::new(FixedCategorizer(vec![
            Some(" \"design\". ".to_string()),
            Some("Astrology".to_string()),
            None,
        ])));

        let result = service
            .categorize(&descriptions(&["Brand refresh", "Consulting call", "Snacks"]))
            .await;
        assert_eq!(result, vec!["Design", "Consulting", UNCATEGORIZED]);
    }

    #[tokio::test]
    async fn test_failure_and_length_mismatch_fall_back() {
        let failing = service().with_primary(Box::new(FailingCategorizer));
        assert_eq!(
            failing.categorize(&descriptions(&["Logo design"])).await,
            vec!["Design"]
        );

        let short = service().with_primary(Box::new(FixedCategorizer(vec![Some("Design".to_string())])));
        assert_eq!(
            short.categorize(&descriptions(&["Advisory retainer", "Misc"])).await,
            vec!["Consulting", UNCATEGORIZED]
        );
    }

    #[tokio::test]
    async fn test_invoice_category_follows_largest_line() {
        let line = |description: &str, price: i64| {
            LineItem::new(
                description.to_string(),
                BigDecimal::from(1),
                BigDecimal::from(price),
                TaxRate::zero(),
            )
            .unwrap()
        };
        let mut invoice = Invoice::new(
            "owner".to_string(),
            Uuid::new_v4(),
            "INV-2024-0001".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            vec![line("Logo design", 300), line("Consulting", 200), line("Advisory", 200)],
            BigDecimal::from(0),
        )
        .unwrap();

        service().categorize_invoice(&mut invoice).await;
        assert_eq!(invoice.category.as_deref(), Some("Consulting"));
        assert_eq!(invoice.items[0].category.as_deref(), Some("Design"));
    }
}

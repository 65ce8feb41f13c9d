//! Rule-based categorizer used when no model is configured or it fails

use async_trait::async_trait;

use crate::categorization::Categorizer;
use crate::types::BillingResult;

/// Maps descriptions to categories by case-insensitive keyword containment.
///
/// Rules are tried in insertion order; the first keyword found wins.
#[derive(Debug, Clone, Default)]
pub struct KeywordCategorizer {
    rules: Vec<(String, String)>,
}

impl KeywordCategorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; the keyword is matched case-insensitively
    pub fn with_rule(mut self, keyword: impl Into<String>, category: impl Into<String>) -> Self {
        let keyword = keyword.into().trim().to_lowercase();
        if !keyword.is_empty() {
            self.rules.push((keyword, category.into()));
        }
        self
    }

    /// Rules covering common freelance and agency services
    pub fn with_default_rules() -> Self {
        Self::new()
            .with_rule("consult", "Consulting")
            .with_rule("advisory", "Consulting")
            .with_rule("design", "Design")
            .with_rule("logo", "Design")
            .with_rule("develop", "Development")
            .with_rule("website", "Development")
            .with_rule("hosting", "Hosting")
            .with_rule("domain", "Hosting")
            .with_rule("maintenance", "Support")
            .with_rule("support", "Support")
            .with_rule("training", "Training")
            .with_rule("workshop", "Training")
            .with_rule("licen", "Software")
            .with_rule("subscription", "Software")
    }

    /// Category for one description, restricted to `categories`.
    ///
    /// Returns the allowed category's own spelling.
    pub fn categorize_one(&self, description: &str, categories: &[String]) -> Option<String> {
        let text = description.to_lowercase();
        self.rules
            .iter()
            .filter(|(keyword, _)| text.contains(keyword.as_str()))
            .find_map(|(_, category)| {
                categories
                    .iter()
                    .find(|allowed| allowed.eq_ignore_ascii_case(category))
                    .cloned()
            })
    }
}

#[async_trait]
impl Categorizer for KeywordCategorizer {
    async fn categorize(
        &self,
        descriptions: &[String],
        categories: &[String],
    ) -> BillingResult<Vec<Option<String>>> {
        Ok(descriptions
            .iter()
            .map(|description| self.categorize_one(description, categories))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<String> {
        vec!["Consulting".to_string(), "design".to_string()]
    }

    #[test]
    fn test_first_allowed_rule_wins() {
        let rules = KeywordCategorizer::with_default_rules();
        assert_eq!(
            rules.categorize_one("Strategy CONSULTING, March", &categories()),
            Some("Consulting".to_string())
        );
        // Allowed spelling is returned
        assert_eq!(
            rules.categorize_one("Logo design", &categories()),
            Some("design".to_string())
        );
        // Development is not an allowed category here
        assert_eq!(rules.categorize_one("Website build", &categories()), None);
    }

    #[tokio::test]
    async fn test_batch_keeps_order() {
        let rules = KeywordCategorizer::new().with_rule("audit", "Consulting");
        let answers = rules
            .categorize(
                &["Security audit".to_string(), "Coffee".to_string()],
                &categories(),
            )
            .await
            .unwrap();
        assert_eq!(answers, vec![Some("Consulting".to_string()), None]);
    }
}

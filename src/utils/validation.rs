//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> BillingResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(BillingError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate a display name (client, vendor, tenant)
pub fn validate_name(field: &str, name: &str) -> BillingResult<()> {
    if name.trim().is_empty() {
        return Err(BillingError::Validation(format!("{} cannot be empty", field)));
    }

    if name.chars().count() > 200 {
        return Err(BillingError::Validation(format!(
            "{} cannot exceed 200 characters",
            field
        )));
    }

    Ok(())
}

/// Loose shape check: one `@`, a non-empty local part, and a dotted domain
pub fn validate_email(email: &str) -> BillingResult<()> {
    let invalid = || BillingError::Validation(format!("Invalid email address '{}'", email));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validate a document number prefix such as `INV`
pub fn validate_prefix(prefix: &str) -> BillingResult<()> {
    if prefix.is_empty() || prefix.len() > 10 {
        return Err(BillingError::Validation(
            "Document prefix must be 1 to 10 characters".to_string(),
        ));
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BillingError::Validation(format!(
            "Document prefix '{}' can only contain letters and digits",
            prefix
        )));
    }

    Ok(())
}

fn validate_notes(notes: Option<&str>) -> BillingResult<()> {
    if notes.is_some_and(|n| n.chars().count() > 2000) {
        return Err(BillingError::Validation(
            "Notes cannot exceed 2000 characters".to_string(),
        ));
    }
    Ok(())
}

/// Enhanced client validator with detailed checks
pub struct EnhancedClientValidator;

impl ClientValidator for EnhancedClientValidator {
    fn validate_client(&self, client: &Client) -> BillingResult<()> {
        DefaultClientValidator.validate_client(client)?;
        validate_name("Client name", &client.name)?;

        if let Some(email) = client.email.as_deref() {
            validate_email(email)?;
        }

        validate_notes(client.notes.as_deref())
    }
}

/// Enhanced document validator with detailed checks
pub struct EnhancedDocumentValidator;

impl DocumentValidator for EnhancedDocumentValidator {
    fn validate_quote(&self, quote: &Quote) -> BillingResult<()> {
        DefaultDocumentValidator.validate_quote(quote)?;
        validate_notes(quote.notes.as_deref())?;

        if quote.totals.total < BigDecimal::from(0) {
            return Err(BillingError::Validation(
                "Quote total cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_invoice(&self, invoice: &Invoice) -> BillingResult<()> {
        DefaultDocumentValidator.validate_invoice(invoice)?;
        validate_notes(invoice.notes.as_deref())?;

        if invoice.totals.total <= BigDecimal::from(0) {
            return Err(BillingError::Validation(
                "Invoice total must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("billing@acme.co.uk").is_ok());
        assert!(validate_email("billing@acme").is_err());
        assert!(validate_email("@acme.com").is_err());
        assert!(validate_email("a b@acme.com").is_err());
        assert!(validate_email("a@@acme.com").is_err());
        assert!(validate_email("a@acme..com").is_err());
    }

    #[test]
    fn test_validate_prefix() {
        assert!(validate_prefix("INV").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("IN-V").is_err());
    }

    #[test]
    fn test_enhanced_client_validator() {
        let mut client = Client::new("owner".to_string(), "Acme".to_string());
        assert!(EnhancedClientValidator.validate_client(&client).is_ok());

        client.email = Some("not-an-email".to_string());
        assert!(EnhancedClientValidator.validate_client(&client).is_err());
    }
}

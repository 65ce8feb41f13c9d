//! Tax calculation engine with per-line rounding

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of decimal places every stored money value carries
pub const MONEY_SCALE: i64 = 2;

/// Round a money amount half-up (away from zero) to two decimal places
pub fn round_money(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(MONEY_SCALE, RoundingMode::HalfUp)
}

/// Percentage tax rate applied to a line or document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate {
    /// Rate as a percentage (e.g., 20 for 20%)
    pub percent: BigDecimal,
}

impl TaxRate {
    /// Create a validated tax rate
    pub fn new(percent: BigDecimal) -> Result<Self, TaxError> {
        let rate = Self { percent };
        rate.validate()?;
        Ok(rate)
    }

    /// A zero rate for untaxed items
    pub fn zero() -> Self {
        Self {
            percent: BigDecimal::from(0),
        }
    }

    /// Validate that the rate is within 0..=100
    pub fn validate(&self) -> Result<(), TaxError> {
        if self.percent < BigDecimal::from(0) {
            return Err(TaxError::InvalidRate(format!(
                "Tax rate cannot be negative: {}",
                self.percent
            )));
        }

        if self.percent > BigDecimal::from(100) {
            return Err(TaxError::InvalidRate(format!(
                "Tax rate cannot exceed 100%: {}",
                self.percent
            )));
        }

        Ok(())
    }

    pub fn is_zero(&self) -> bool {
        self.percent == BigDecimal::from(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self::zero()
    }
}

/// Tax breakdown for a single base amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCalculation {
    /// Base amount (before tax)
    pub base_amount: BigDecimal,
    /// Rate used for calculation
    pub tax_rate: TaxRate,
    /// Calculated tax amount
    pub tax_amount: BigDecimal,
    /// Total amount including tax
    pub total_amount: BigDecimal,
}

impl TaxCalculation {
    /// Calculate tax on a tax-exclusive base amount
    pub fn calculate(base_amount: BigDecimal, tax_rate: TaxRate) -> Result<Self, TaxError> {
        tax_rate.validate()?;

        let base_amount = round_money(&base_amount);
        let tax_amount = round_money(&(&base_amount * &tax_rate.percent / BigDecimal::from(100)));
        let total_amount = &base_amount + &tax_amount;

        Ok(Self {
            base_amount,
            tax_rate,
            tax_amount,
            total_amount,
        })
    }

    /// Split a tax-inclusive gross amount into base and tax.
    ///
    /// The tax is the remainder after rounding the base, so
    /// `base_amount + tax_amount == total_amount` always holds.
    pub fn reverse_calculate(total_amount: BigDecimal, tax_rate: TaxRate) -> Result<Self, TaxError> {
        tax_rate.validate()?;

        let total_amount = round_money(&total_amount);
        let divisor = BigDecimal::from(100) + &tax_rate.percent;
        let base_amount = round_money(&(&total_amount * BigDecimal::from(100) / divisor));
        let tax_amount = &total_amount - &base_amount;

        Ok(Self {
            base_amount,
            tax_rate,
            tax_amount,
            total_amount,
        })
    }
}

/// Billable line on a quote, invoice or recurring template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: BigDecimal,
    /// Unit price before tax
    pub unit_price: BigDecimal,
    pub tax_rate: TaxRate,
    /// Sales category, filled in by categorization
    pub category: Option<String>,
}

impl LineItem {
    /// Create a validated line item
    pub fn new(
        description: String,
        quantity: BigDecimal,
        unit_price: BigDecimal,
        tax_rate: TaxRate,
    ) -> Result<Self, TaxError> {
        let item = Self {
            description,
            quantity,
            unit_price,
            tax_rate,
            category: None,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<(), TaxError> {
        if self.description.trim().is_empty() {
            return Err(TaxError::InvalidLine(
                "Line description cannot be empty".to_string(),
            ));
        }
        if self.quantity <= BigDecimal::from(0) {
            return Err(TaxError::InvalidLine(format!(
                "Quantity must be positive for '{}'",
                self.description
            )));
        }
        if self.unit_price < BigDecimal::from(0) {
            return Err(TaxError::InvalidLine(format!(
                "Unit price cannot be negative for '{}'",
                self.description
            )));
        }
        self.tax_rate.validate()
    }

    /// Line amount before tax and discount
    pub fn subtotal(&self) -> BigDecimal {
        round_money(&(&self.quantity * &self.unit_price))
    }
}

/// Tax collected at one rate across a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub rate: BigDecimal,
    /// Taxable amount after discount
    pub taxable_amount: BigDecimal,
    pub tax_amount: BigDecimal,
}

/// Computed totals for a set of line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// Sum of line subtotals before discount
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
    /// Tax grouped by rate, ascending
    pub tax_breakdown: Vec<TaxSummary>,
}

impl DocumentTotals {
    /// Totals for an empty document
    pub fn zero() -> Self {
        Self {
            subtotal: BigDecimal::from(0),
            discount: BigDecimal::from(0),
            tax: BigDecimal::from(0),
            total: BigDecimal::from(0),
            tax_breakdown: Vec::new(),
        }
    }

    /// Compute totals from line items and a document-level discount.
    ///
    /// The discount is spread over the lines in proportion to their subtotal
    /// (the last line absorbs the rounding remainder), and tax is rounded per
    /// line before summing.
    pub fn from_items(items: &[LineItem], discount_percent: &BigDecimal) -> Result<Self, TaxError> {
        validate_discount(discount_percent)?;
        for item in items {
            item.validate()?;
        }

        if items.is_empty() {
            return Ok(Self::zero());
        }

        let subtotals: Vec<BigDecimal> = items.iter().map(LineItem::subtotal).collect();
        let subtotal: BigDecimal = subtotals.iter().sum();
        let discount = round_money(&(&subtotal * discount_percent / BigDecimal::from(100)));

        let mut remaining_discount = discount.clone();
        let mut tax = BigDecimal::from(0);
        let mut by_rate: BTreeMap<BigDecimal, (BigDecimal, BigDecimal)> = BTreeMap::new();

        for (index, (item, line_subtotal)) in items.iter().zip(subtotals.iter()).enumerate() {
            let line_discount = if index + 1 == items.len() {
                remaining_discount.clone()
            } else if subtotal == BigDecimal::from(0) {
                BigDecimal::from(0)
            } else {
                round_money(&(&discount * line_subtotal / &subtotal))
            };
            remaining_discount -= &line_discount;

            let taxable = line_subtotal - &line_discount;
            let calculation = TaxCalculation::calculate(taxable, item.tax_rate.clone())?;
            tax += &calculation.tax_amount;

            let entry = by_rate
                .entry(item.tax_rate.percent.normalized())
                .or_insert_with(|| (BigDecimal::from(0), BigDecimal::from(0)));
            entry.0 += &calculation.base_amount;
            entry.1 += &calculation.tax_amount;
        }

        let total = &subtotal - &discount + &tax;
        let tax_breakdown = by_rate
            .into_iter()
            .map(|(rate, (taxable_amount, tax_amount))| TaxSummary {
                rate,
                taxable_amount,
                tax_amount,
            })
            .collect();

        Ok(Self {
            subtotal,
            discount,
            tax,
            total,
            tax_breakdown,
        })
    }
}

fn validate_discount(discount_percent: &BigDecimal) -> Result<(), TaxError> {
    if *discount_percent < BigDecimal::from(0) || *discount_percent > BigDecimal::from(100) {
        return Err(TaxError::InvalidDiscount(discount_percent.to_string()));
    }
    Ok(())
}

/// Tax-related errors
#[derive(Debug, thiserror::Error)]
pub enum TaxError {
    #[error("Invalid tax rate: {0}")]
    InvalidRate(String),
    #[error("Invalid discount percentage: {0}")]
    InvalidDiscount(String),
    #[error("Invalid line item: {0}")]
    InvalidLine(String),
}

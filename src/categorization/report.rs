//! Sales totals grouped by category

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::categorization::UNCATEGORIZED;
use crate::types::*;

/// Sales in one category over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySales {
    pub category: String,
    pub invoice_count: usize,
    /// Subtotal after discount
    pub net_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
}

/// Issued invoices dated between `from` and `to` inclusive, grouped by their
/// category and sorted by total, largest first.
///
/// Drafts and cancelled invoices are left out.
pub fn sales_by_category(invoices: &[Invoice], from: NaiveDate, to: NaiveDate) -> Vec<CategorySales> {
    let mut groups: HashMap<&str, CategorySales> = HashMap::new();

    for invoice in invoices.iter().filter(|invoice| {
        !matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Cancelled)
            && invoice.issue_date >= from
            && invoice.issue_date <= to
    }) {
        let category = invoice.category.as_deref().unwrap_or(UNCATEGORIZED);
        let group = groups.entry(category).or_insert_with(|| CategorySales {
            category: category.to_string(),
            invoice_count: 0,
            net_amount: BigDecimal::from(0),
            tax_amount: BigDecimal::from(0),
            total_amount: BigDecimal::from(0),
        });
        group.invoice_count += 1;
        group.net_amount += &invoice.totals.subtotal - &invoice.totals.discount;
        group.tax_amount += &invoice.totals.tax;
        group.total_amount += &invoice.totals.total;
    }

    let mut sales: Vec<CategorySales> = groups.into_values().collect();
    sales.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    sales
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{LineItem, TaxRate};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(day: u32, price: i64, category: Option<&str>, status: InvoiceStatus) -> Invoice {
        let mut invoice = Invoice::new(
            "owner".to_string(),
            Uuid::new_v4(),
            format!("INV-2024-{:04}", day),
            date(2024, 5, day),
            date(2024, 6, 30),
            vec![LineItem::new(
                "Work".to_string(),
                BigDecimal::from(1),
                BigDecimal::from(price),
                TaxRate::new(BigDecimal::from(10)).unwrap(),
            )
            .unwrap()],
            BigDecimal::from(0),
        )
        .unwrap();
        invoice.category = category.map(str::to_string);
        invoice.status = status;
        invoice
    }

    #[test]
    fn test_groups_issued_invoices_in_range() {
        let invoices = vec![
            invoice(1, 100, Some("Design"), InvoiceStatus::Paid),
            invoice(2, 300, Some("Consulting"), InvoiceStatus::Sent),
            invoice(3, 50, Some("Design"), InvoiceStatus::Overdue),
            invoice(4, 999, Some("Design"), InvoiceStatus::Draft),
            invoice(5, 999, Some("Design"), InvoiceStatus::Cancelled),
            invoice(6, 20, None, InvoiceStatus::PartiallyPaid),
            invoice(30, 999, Some("Design"), InvoiceStatus::Paid),
        ];

        let sales = sales_by_category(&invoices, date(2024, 5, 1), date(2024, 5, 29));
        let names: Vec<&str> = sales.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(names, vec!["Consulting", "Design", UNCATEGORIZED]);

        assert_eq!(sales[1].invoice_count, 2);
        assert_eq!(sales[1].net_amount, BigDecimal::from(150));
        assert_eq!(sales[1].tax_amount, BigDecimal::from(15));
        assert_eq!(sales[1].total_amount, BigDecimal::from(165));
    }
}

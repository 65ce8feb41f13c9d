//! CSV export of invoices, expenses and reports
//!
//! Every export writes its header row even when there are no records. Money is
//! written with exactly two decimals.

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::io::Write;
use uuid::Uuid;

use crate::billing::CategoryTotal;
use crate::categorization::CategorySales;
use crate::reconciliation::PaymentLedger;
use crate::tax::{round_money, MONEY_SCALE};
use crate::types::*;

/// Format an amount as `1234.50`, zero included (`0.00`)
pub fn format_money(amount: &BigDecimal) -> String {
    let (cents, _) = round_money(amount).with_scale(MONEY_SCALE).into_bigint_and_exponent();
    let digits = cents.to_string();
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };
    let padded = format!("{:0>width$}", digits, width = MONEY_SCALE as usize + 1);
    let (whole, fraction) = padded.split_at(padded.len() - MONEY_SCALE as usize);
    format!("{}{}.{}", sign, whole, fraction)
}

fn optional_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn writer<W: Write>(sink: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().has_headers(false).from_writer(sink)
}

/// Invoice register; client names are looked up in `clients`
pub fn write_invoices<W: Write>(sink: W, invoices: &[Invoice], clients: &[Client]) -> BillingResult<()> {
    let names: HashMap<Uuid, &str> = clients.iter().map(|c| (c.id, c.name.as_str())).collect();
    let mut out = writer(sink);

    out.write_record([
        "number",
        "client",
        "issue_date",
        "due_date",
        "status",
        "subtotal",
        "discount",
        "tax",
        "total",
        "paid",
        "balance_due",
        "category",
    ])?;

    for invoice in invoices {
        out.write_record([
            invoice.number.clone(),
            names.get(&invoice.client_id).copied().unwrap_or_default().to_string(),
            invoice.issue_date.to_string(),
            invoice.due_date.to_string(),
            invoice.status.to_string(),
            format_money(&invoice.totals.subtotal),
            format_money(&invoice.totals.discount),
            format_money(&invoice.totals.tax),
            format_money(&invoice.totals.total),
            format_money(&invoice.amount_paid()),
            format_money(&invoice.balance_due()),
            invoice.category.clone().unwrap_or_default(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

/// Expense register
pub fn write_expenses<W: Write>(sink: W, expenses: &[Expense]) -> BillingResult<()> {
    let mut out = writer(sink);
    out.write_record([
        "date",
        "vendor",
        "category",
        "description",
        "net",
        "tax_rate",
        "tax",
        "gross",
        "status",
        "due_date",
        "paid_date",
    ])?;

    for expense in expenses {
        let status = match expense.status {
            ExpenseStatus::Unpaid => "unpaid",
            ExpenseStatus::Paid => "paid",
        };
        out.write_record([
            expense.expense_date.to_string(),
            expense.vendor.clone(),
            expense.category.clone(),
            expense.description.clone().unwrap_or_default(),
            format_money(&expense.net_amount),
            expense.tax_rate.percent.normalized().to_string(),
            format_money(&expense.tax_amount),
            format_money(&expense.amount),
            status.to_string(),
            optional_date(expense.due_date),
            optional_date(expense.paid_date),
        ])?;
    }

    out.flush()?;
    Ok(())
}

/// Payment grid, one row per tenant and month
pub fn write_payment_ledger<W: Write>(sink: W, ledger: &PaymentLedger) -> BillingResult<()> {
    let mut out = writer(sink);
    out.write_record(["tenant", "period", "expected", "paid", "status"])?;

    for row in ledger.statuses() {
        out.write_record([
            row.tenant_name.clone(),
            row.period.to_string(),
            format_money(&row.expected),
            format_money(&row.paid),
            row.status.to_string(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

/// Sales by category report
pub fn write_sales_by_category<W: Write>(sink: W, sales: &[CategorySales]) -> BillingResult<()> {
    let mut out = writer(sink);
    out.write_record(["category", "invoices", "net", "tax", "total"])?;
    for line in sales {
        out.write_record([
            line.category.clone(),
            line.invoice_count.to_string(),
            format_money(&line.net_amount),
            format_money(&line.tax_amount),
            format_money(&line.total_amount),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Expense totals by category
pub fn write_expense_totals<W: Write>(sink: W, totals: &[CategoryTotal]) -> BillingResult<()> {
    let mut out = writer(sink);
    out.write_record(["category", "count", "net", "tax", "gross"])?;
    for line in totals {
        out.write_record([
            line.category.clone(),
            line.count.to_string(),
            format_money(&line.net_amount),
            format_money(&line.tax_amount),
            format_money(&line.gross_amount),
        ])?;
    }
    out.flush()?;
    Ok(())
}

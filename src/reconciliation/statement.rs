//! Bank statement CSV import

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use crate::reconciliation::similarity::normalize_name;
use crate::types::*;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y"];

#[derive(Debug, Deserialize)]
struct StatementRow {
    #[serde(rename = "Id", alias = "ID", alias = "Transaction Id", default, deserialize_with = "empty_string_as_none")]
    id: Option<String>,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Reference", default, deserialize_with = "empty_string_as_none")]
    reference: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
}

/// Whether every group after the first has exactly three digits
fn thousands_groups(body: &str, separator: char) -> bool {
    let mut groups = body.trim_start_matches('-').split(separator);
    let leading_ok = groups
        .next()
        .is_some_and(|first| (1..=3).contains(&first.len()));
    leading_ok && groups.all(|group| group.len() == 3)
}

/// Parse `1,234.50`, `1.234,50`, `950,00`, `-£950.00` or `(20.00)` into a
/// signed amount.
///
/// The right-most of `,` and `.` is the decimal separator when both appear. A
/// lone comma followed by one or two digits is a decimal comma; commas or dots
/// that neither form a decimal part nor three-digit groups make the amount
/// unreadable.
fn parse_amount(value: &str) -> Option<BigDecimal> {
    let trimmed = value.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let body: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let normalized = match (body.rfind(','), body.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => body.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => body.replace(',', ""),
        (Some(comma), None) => {
            let decimals = body.len() - comma - 1;
            if body.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                body.replace(',', ".")
            } else if thousands_groups(&body, ',') {
                body.replace(',', "")
            } else {
                return None;
            }
        }
        (None, Some(_)) if body.matches('.').count() > 1 => {
            if !thousands_groups(&body, '.') {
                return None;
            }
            body.replace('.', "")
        }
        _ => body,
    };

    let amount = BigDecimal::from_str(&normalized).ok()?;
    Some(if negative { -amount } else { amount })
}

/// Read a statement with `Date`, `Description` and `Amount` columns and
/// optional `Id` and `Reference` columns.
///
/// Rows without an `Id` get one derived from their content, so importing the
/// same file twice yields the same ids.
pub fn parse_statement<R: Read>(reader: R) -> BillingResult<Vec<BankEntry>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, record) in csv_reader.deserialize::<StatementRow>().enumerate() {
        let line = index + 2;
        let row = record
            .map_err(|error| BillingError::Validation(format!("Line {}: {}", line, error)))?;

        let date = parse_date(&row.date).ok_or_else(|| {
            BillingError::Validation(format!("Line {}: unreadable date '{}'", line, row.date))
        })?;
        let amount = parse_amount(&row.amount).ok_or_else(|| {
            BillingError::Validation(format!("Line {}: unreadable amount '{}'", line, row.amount))
        })?;

        let id = match row.id {
            Some(id) => id,
            None => {
                let key = format!("{}|{}|{}", date, amount.normalized(), normalize_name(&row.description));
                let count = seen.entry(key.clone()).or_insert(0);
                *count += 1;
                format!("{}#{}", key, count)
            }
        };

        entries.push(BankEntry {
            id,
            date,
            description: row.description,
            amount,
            reference: row.reference,
        });
    }

    Ok(entries)
}

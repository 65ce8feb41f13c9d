//! Sequential document numbering: `{PREFIX}-{YEAR}-{SEQ}`

use chrono::{Datelike, NaiveDate};

/// Minimum digits of the sequence part; longer sequences are never truncated
const SEQUENCE_WIDTH: usize = 4;

/// Format a document number
pub fn format_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}-{}-{:0width$}", prefix, year, sequence, width = SEQUENCE_WIDTH)
}

/// Parse the sequence out of a number issued under `prefix` in `year`.
///
/// Returns `None` for numbers from another prefix or year, or numbers that were
/// typed in by hand and don't follow the pattern.
pub fn parse_sequence(number: &str, prefix: &str, year: i32) -> Option<u32> {
    let rest = number.strip_prefix(prefix)?.strip_prefix('-')?;
    let (year_part, sequence_part) = rest.split_once('-')?;
    if year_part.parse::<i32>().ok()? != year {
        return None;
    }
    if sequence_part.is_empty() || !sequence_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    sequence_part.parse().ok()
}

/// Next number after the highest sequence already used for this prefix and year.
///
/// Gaps left by deleted drafts are not refilled.
pub fn next_number<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    prefix: &str,
    issue_date: NaiveDate,
) -> String {
    let year = issue_date.year();
    let highest = existing
        .into_iter()
        .filter_map(|number| parse_sequence(number, prefix, year))
        .max()
        .unwrap_or(0);
    format_number(prefix, year, highest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_number_of_year() {
        assert_eq!(next_number([], "INV", date(2024, 3, 1)), "INV-2024-0001");
    }

    #[test]
    fn test_continues_after_highest() {
        let existing = ["INV-2024-0001", "INV-2024-0007", "INV-2024-0003"];
        assert_eq!(next_number(existing, "INV", date(2024, 6, 1)), "INV-2024-0008");
    }

    #[test]
    fn test_sequence_restarts_each_year() {
        let existing = ["INV-2023-0041"];
        assert_eq!(next_number(existing, "INV", date(2024, 1, 2)), "INV-2024-0001");
    }

    #[test]
    fn test_ignores_foreign_numbers() {
        let existing = ["QUO-2024-0009", "INVX-2024-0050", "INV-2024-12a", "manual-1"];
        assert_eq!(next_number(existing, "INV", date(2024, 1, 2)), "INV-2024-0001");
    }

    #[test]
    fn test_sequence_grows_past_width() {
        let existing = ["INV-2024-9999"];
        assert_eq!(next_number(existing, "INV", date(2024, 1, 2)), "INV-2024-10000");
    }
}

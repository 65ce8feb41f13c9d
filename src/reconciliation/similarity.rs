//! Fuzzy name comparison between payees and bank statement text

use std::collections::HashMap;

/// Lowercase, turn punctuation into spaces and collapse runs of whitespace
pub fn normalize_name(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn bigrams(value: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = value.chars().filter(|c| !c.is_whitespace()).collect();
    let mut counts = HashMap::new();
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

/// Sørensen–Dice coefficient over character bigrams, in `0.0..=1.0`.
///
/// Both sides are normalized and spaces are ignored, so `"J. Smith"` and
/// `"j smith"` compare as identical.
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    let a: String = normalize_name(a).split(' ').collect();
    let b: String = normalize_name(b).split(' ').collect();

    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }
    if a.chars().count() < 2 || b.chars().count() < 2 {
        return 0.0;
    }

    let left = bigrams(&a);
    let right = bigrams(&b);
    let left_total: usize = left.values().sum();
    let right_total: usize = right.values().sum();

    let shared: usize = left
        .iter()
        .map(|(pair, count)| right.get(pair).map_or(0, |other| (*count).min(*other)))
        .sum();

    (2 * shared) as f64 / (left_total + right_total) as f64
}

/// How well `payee` appears in a statement `description`.
///
/// Takes the best of the whole-description score and the score of every run of
/// description words as long as the payee name, so a name buried in
/// `"TRANSFER FROM JOHN SMITH REF 1234"` still scores high.
pub fn name_similarity(payee: &str, description: &str) -> f64 {
    let payee = normalize_name(payee);
    let description = normalize_name(description);
    if payee.is_empty() || description.is_empty() {
        return 0.0;
    }

    let whole = dice_coefficient(&payee, &description);

    let width = payee.split(' ').count();
    let words: Vec<&str> = description.split(' ').collect();
    if words.len() <= width {
        return whole;
    }

    words
        .windows(width)
        .map(|window| dice_coefficient(&payee, &window.join(" ")))
        .fold(whole, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  O'Brien,   J.  "), "o brien j");
        assert_eq!(normalize_name("ACME-LTD/Payroll"), "acme ltd payroll");
        assert_eq!(normalize_name("***"), "");
    }

    #[test]
    fn test_dice_identical_and_disjoint() {
        assert_eq!(dice_coefficient("John Smith", "john  smith"), 1.0);
        assert_eq!(dice_coefficient("abc", "xyz"), 0.0);
        assert_eq!(dice_coefficient("a", "b"), 0.0);
        assert_eq!(dice_coefficient("", ""), 0.0);
    }

    #[test]
    fn test_dice_partial_overlap() {
        // night: ni ig gh ht / nacht: na ac ch ht
        assert!((dice_coefficient("night", "nacht") - 0.25).abs() < 1e-9);
        assert!(dice_coefficient("Smith John", "John Smith") > 0.8);
    }

    #[test]
    fn test_name_found_inside_description() {
        let score = name_similarity("John Smith", "TRANSFER FROM JOHN SMITH REF 1234");
        assert_eq!(score, 1.0);

        let typo = name_similarity("Jon Smith", "FPS CREDIT JOHN SMITH RENT");
        assert!(typo > 0.6, "score was {typo}");

        let unrelated = name_similarity("Maria Garcia", "TRANSFER FROM JOHN SMITH");
        assert!(unrelated < 0.4, "score was {unrelated}");
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(name_similarity("", "anything"), 0.0);
        assert_eq!(name_similarity("John", "--"), 0.0);
    }
}

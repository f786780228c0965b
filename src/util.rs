//! Small shared helpers: percentage math, currency formatting, numeric
//! extraction from scraped text.

use std::sync::LazyLock;

use regex::Regex;

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:,\d{3})*(?:\.\d+)?").unwrap());

/// Percentage change from `old` to `new`; positive for an increase. A zero
/// base reports 100% when the new value is positive, else 0.
pub fn percentage_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return if new > 0.0 { 100.0 } else { 0.0 };
    }
    (new - old) / old * 100.0
}

/// First numeric value found in free text ("$1,299.00 was $1,499" → 1299.0).
pub fn extract_numeric(text: &str) -> Option<f64> {
    let m = NUMERIC_RE.find(text)?;
    m.as_str().replace(',', "").parse::<f64>().ok()
}

/// Display formatting for a currency amount. JPY amounts carry no decimals.
pub fn format_currency(amount: f64, currency: &str) -> String {
    let decimals = if currency == "JPY" { 0 } else { 2 };
    let formatted = format!("{amount:.decimals$}");
    match currency {
        "USD" => format!("${formatted}"),
        "GBP" => format!("£{formatted}"),
        "EUR" => format!("{formatted} €"),
        "JPY" | "CNY" => format!("{formatted} ¥"),
        other => format!("{formatted} {other}"),
    }
}

/// Truncate display text, appending an ellipsis when something was cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_change_handles_zero_base() {
        assert_eq!(percentage_change(0.0, 50.0), 100.0);
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
        assert!((percentage_change(100.0, 150.0) - 50.0).abs() < 1e-12);
        assert!((percentage_change(100.0, 50.0) + 50.0).abs() < 1e-12);
    }

    #[test]
    fn extract_numeric_skips_currency_noise() {
        assert_eq!(extract_numeric("$1,299.00 was $1,499"), Some(1299.0));
        assert_eq!(extract_numeric("¥59.90 起"), Some(59.9));
        assert_eq!(extract_numeric("out of stock"), None);
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(1234.5, "USD"), "$1234.50");
        assert_eq!(format_currency(88.0, "CNY"), "88.00 ¥");
        assert_eq!(format_currency(1500.0, "JPY"), "1500 ¥");
    }
}

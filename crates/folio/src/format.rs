//! Display formatting for summary statistics.

/// Placeholder shown when a statistic is undefined.
pub const NOT_AVAILABLE: &str = "N/A";

/// Format a dollar amount with thousands separators, e.g. `$1,234.56` or `-$12.00`.
#[must_use]
pub fn currency(value: f64) -> String {
    let formatted = add_thousands_separator(&format!("{:.2}", value.abs()));
    if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-${formatted}")
    } else {
        format!("${formatted}")
    }
}

/// Format a percentage with the given number of decimals, e.g. `12.34%`.
#[must_use]
pub fn percent(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}%")
}

/// Format a plain quantity with two decimals.
#[must_use]
pub fn fixed(value: f64) -> String {
    format!("{value:.2}")
}

/// Format an optional statistic, falling back to [`NOT_AVAILABLE`].
#[must_use]
pub fn or_na(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), format)
}

fn add_thousands_separator(s: &str) -> String {
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s, ""));

    let chars: Vec<char> = integer_part.chars().rev().collect();
    let formatted: String = chars
        .chunks(3)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<String>>()
        .join(",")
        .chars()
        .rev()
        .collect();

    if decimal_part.is_empty() {
        formatted
    } else {
        format!("{formatted}.{decimal_part}")
    }
}

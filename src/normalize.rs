// src/normalize.rs

/// Sentinel strings that spreadsheet readers emit for empty cells.
const NULL_SENTINELS: &[&str] = &["nan", "none", "null"];

/// Clean a raw cell value: `""` for null-like sentinels, trimmed otherwise.
pub fn normalize_text(value: &str) -> String {
    let trimmed = value.trim();
    if NULL_SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
        return String::new();
    }
    trimmed.to_string()
}

/// Parse a number out of a noisy cell value. Handles currency prefixes
/// (`$`, `€`, `MXN`), thousands separators, and comma decimals.
///
/// Unparseable input yields `0.0` — this function never fails.
pub fn parse_number(value: &str) -> f64 {
    let cleaned = normalize_text(value);
    if cleaned.is_empty() {
        return 0.0;
    }

    // Strip currency markers and keep only digits, separators, and sign.
    let stripped: String = cleaned
        .trim_start_matches("MX$")
        .trim_start_matches("MXN")
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if stripped.is_empty() {
        return 0.0;
    }

    let dot = stripped.rfind('.');
    let comma = stripped.rfind(',');

    let candidate = match (dot, comma) {
        // "1,234.56" — commas group thousands. "1.234,56" — the reverse.
        (Some(d), Some(c)) => {
            if d > c {
                stripped.replace(',', "")
            } else {
                stripped.replace('.', "").replace(',', ".")
            }
        }
        // "45,50" decimal comma, "1,234,567" grouped thousands.
        (None, Some(_)) => {
            if stripped.matches(',').count() > 1 {
                stripped.replace(',', "")
            } else {
                stripped.replace(',', ".")
            }
        }
        (Some(_), None) if stripped.matches('.').count() > 1 => stripped.replace('.', ""),
        _ => stripped,
    };

    candidate.parse::<f64>().unwrap_or(0.0)
}

/// True when a cell holds nothing but a number (used by the name-column
/// fallback, which must skip purely numeric columns).
pub fn is_numeric_text(value: &str) -> bool {
    let cleaned = normalize_text(value);
    !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '$' | ' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_sentinels() {
        assert_eq!(normalize_text("  Leche  "), "Leche");
        assert_eq!(normalize_text("nan"), "");
        assert_eq!(normalize_text("None"), "");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number("45.50"), 45.5);
        assert_eq!(parse_number("10"), 10.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("abc"), 0.0);
    }

    #[test]
    fn test_parse_number_currency_and_separators() {
        assert_eq!(parse_number("$1,234.56"), 1234.56);
        assert_eq!(parse_number("€ 99.90"), 99.9);
        assert_eq!(parse_number("MX$ 150"), 150.0);
        assert_eq!(parse_number("45,50"), 45.5);
        assert_eq!(parse_number("1.234,56"), 1234.56);
    }

    #[test]
    fn test_parse_number_never_panics_on_garbage() {
        for s in ["$", "..,,", "-", "1.2.3.4,5", "∞"] {
            let _ = parse_number(s);
        }
    }

    #[test]
    fn test_is_numeric_text() {
        assert!(is_numeric_text("123"));
        assert!(is_numeric_text("45.50"));
        assert!(!is_numeric_text("Leche"));
        assert!(!is_numeric_text(""));
    }
}

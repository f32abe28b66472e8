// src/extract/pdf_lines.rs

use super::{clamp_quantity, Product, MAX_COST, MAX_QUANTITY};
use crate::fields;
use crate::normalize::{is_numeric_text, parse_number};
use crate::pdf_doc::Page;
use regex::Regex;
use std::sync::OnceLock;
use tracing::info;

/// Trailing unit abbreviations stripped from captured names in the
/// structured report grammar.
const UNIT_SUFFIXES: &[&str] = &[
    "pzas", "pza", "pz", "kg", "grs", "gr", "lts", "lt", "ml", "cja", "cj", "paq", "lb", "un",
];

/// Leading tokens that mark a non-data line in report layouts.
const SKIP_PREFIXES: &[&str] = &[
    "fecha", "pagina", "página", "page", "hoja", "tel", "telefono", "teléfono", "reporte",
    "inventario", "sucursal",
];

/// Report line grammar: `<name tokens> <qty> <unit cost> $<total>`.
fn report_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>.+?)\s+(?P<qty>\d{1,6})\s+(?P<cost>[\d][\d.,]*)\s+\$\s*(?P<total>[\d][\d.,]*)\s*$")
            .unwrap()
    })
}

/// Per page: the structured report matcher first, the generic
/// name-plus-numbers splitter only when the page yields nothing.
pub fn extract(pages: &[Page]) -> Vec<Product> {
    let mut products = Vec::new();
    for page in pages {
        let mut found: Vec<Product> = page
            .lines
            .iter()
            .filter_map(|line| extract_report_line(line))
            .collect();
        if found.is_empty() {
            found = page
                .lines
                .iter()
                .filter_map(|line| extract_generic_line(line))
                .collect();
        }
        products.append(&mut found);
    }
    info!(products = products.len(), "PDF text extraction finished");
    products
}

fn is_skippable(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    if lower.is_empty() {
        return true;
    }
    // Date stamps like 12/05/2026 or 12-05-26.
    static DATE: OnceLock<Regex> = OnceLock::new();
    let date = DATE.get_or_init(|| Regex::new(r"^\d{1,2}[/-]\d{1,2}[/-]\d{2,4}").unwrap());
    if date.is_match(&lower) {
        return true;
    }
    if SKIP_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    fields::is_header_echo(&lower)
}

/// Strategy 1: fixed two-number-plus-currency-amount grammar.
/// Out-of-range quantity resets to 1; out-of-range cost drops the line.
fn extract_report_line(line: &str) -> Option<Product> {
    if is_skippable(line) {
        return None;
    }
    let caps = report_line_re().captures(line.trim())?;

    let name = strip_unit_suffix(caps["name"].trim());
    if name.chars().count() < 2 || fields::is_header_echo(&name) {
        return None;
    }

    let qty: i64 = caps["qty"].parse().unwrap_or(1);
    let qty = if qty <= 0 || qty > MAX_QUANTITY { 1 } else { qty };

    let cost = parse_number(&caps["cost"]);
    if cost <= 0.0 || cost >= MAX_COST {
        return None;
    }

    Some(Product::new(name, None, qty, cost))
}

fn strip_unit_suffix(name: &str) -> String {
    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        let lower = last.trim_matches('.').to_lowercase();
        if tokens.len() > 1 && UNIT_SUFFIXES.contains(&lower.as_str()) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

/// Strategy 2: generic name-plus-numbers line. The name is everything
/// before the first numeric token; numbers are assigned positionally
/// (one ⇒ cost, two ⇒ quantity+cost, three or more ⇒ quantity+cost+total,
/// the total being ignored). Zero-cost products are kept here.
fn extract_generic_line(line: &str) -> Option<Product> {
    if is_skippable(line) {
        return None;
    }

    if line.contains('|') {
        return extract_delimited_line(line);
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 || !tokens.iter().any(|t| t.chars().any(|c| c.is_ascii_digit())) {
        return None;
    }

    let boundary = tokens.iter().position(|t| is_numeric_text(t))?;
    if boundary == 0 {
        return None;
    }

    let name = tokens[..boundary]
        .join(" ")
        .trim_end_matches([':', '-', '.', ','])
        .trim()
        .to_string();
    if name.chars().count() < 3 || fields::is_header_echo(&name) {
        return None;
    }

    let numbers: Vec<f64> = tokens[boundary..]
        .iter()
        .filter(|t| is_numeric_text(t))
        .map(|t| parse_number(t))
        .collect();

    let (quantity, cost) = assign_numbers(&numbers);
    Some(Product::new(name, None, quantity, cost))
}

/// Pipe-delimited rows (`Nombre | Código | Costo`) — the join format the
/// original table extraction emitted into plain text.
fn extract_delimited_line(line: &str) -> Option<Product> {
    let parts: Vec<&str> = line.split('|').map(str::trim).collect();
    if parts.len() < 2 {
        return None;
    }

    let name = parts[0].trim_end_matches([':', '-', '.', ',']).trim().to_string();
    if name.chars().count() < 3 || fields::is_header_echo(&name) {
        return None;
    }

    let mut barcode = None;
    let mut numbers = Vec::new();
    for part in &parts[1..] {
        let digits_only = part.chars().all(|c| c.is_ascii_digit());
        if digits_only && part.len() > 5 {
            // Long all-digit cells are barcodes, not amounts.
            if barcode.is_none() {
                barcode = Some(part.to_string());
            }
            continue;
        }
        if is_numeric_text(part) {
            numbers.push(parse_number(part));
        }
    }

    let (quantity, cost) = assign_numbers(&numbers);
    Some(Product::new(name, barcode, quantity, cost))
}

fn assign_numbers(numbers: &[f64]) -> (i64, f64) {
    match numbers {
        [] => (1, 0.0),
        [cost] => (1, *cost),
        [qty, cost, ..] => (clamp_quantity(qty.round() as i64), *cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(lines: &[&str]) -> Page {
        Page {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            tables: Vec::new(),
        }
    }

    #[test]
    fn test_report_line() {
        let p = extract_report_line("Leche Entera 1L PZA 10 45.50 $455.00").unwrap();
        assert_eq!(p.name, "Leche Entera 1L");
        assert_eq!(p.quantity, 10);
        assert_eq!(p.unit_cost, 45.5);
    }

    #[test]
    fn test_report_line_quantity_reset() {
        let p = extract_report_line("Azucar 999999 30.00 $30.00").unwrap();
        assert_eq!(p.quantity, 1);
    }

    #[test]
    fn test_report_line_bad_cost_drops_line() {
        assert!(extract_report_line("Oro 1 2000000.00 $2000000.00").is_none());
    }

    #[test]
    fn test_report_skips_non_data_lines() {
        assert!(extract_report_line("Fecha: 12/05/2026 1 2 $3").is_none());
        assert!(extract_report_line("12/05/2026 1 2 $3").is_none());
        assert!(extract_report_line("Pagina 1 1 $1").is_none());
    }

    #[test]
    fn test_generic_line_two_numbers() {
        let p = extract_generic_line("Pan Blanco 5 22.00").unwrap();
        assert_eq!(p.name, "Pan Blanco");
        assert_eq!(p.quantity, 5);
        assert_eq!(p.unit_cost, 22.0);
    }

    #[test]
    fn test_generic_line_single_number_is_cost() {
        let p = extract_generic_line("Cafe Soluble 80.50").unwrap();
        assert_eq!(p.quantity, 1);
        assert_eq!(p.unit_cost, 80.5);
    }

    #[test]
    fn test_generic_line_keeps_zero_cost() {
        let p = extract_generic_line("Bolsa Grande 0").unwrap();
        assert_eq!(p.unit_cost, 0.0);
    }

    #[test]
    fn test_generic_line_rejects_short_names() {
        assert!(extract_generic_line("XY 10 5.00").is_none());
        assert!(extract_generic_line("Nombre 10 5.00").is_none());
    }

    #[test]
    fn test_delimited_line_with_barcode() {
        let p = extract_generic_line("Queso Oaxaca | 7501001234567 | 99.90").unwrap();
        assert_eq!(p.name, "Queso Oaxaca");
        assert_eq!(p.barcode.as_deref(), Some("7501001234567"));
        assert_eq!(p.unit_cost, 99.9);
    }

    #[test]
    fn test_generic_only_runs_when_report_pattern_fails() {
        // Page where strategy 1 matches: generic must not double-extract.
        let structured = page(&["Leche Entera 10 45.50 $455.00", "Pan Blanco 5 22.00"]);
        let products = extract(&[structured]);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Leche Entera");

        let loose = page(&["Pan Blanco 5 22.00"]);
        let products = extract(&[loose]);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].quantity, 5);
    }
}

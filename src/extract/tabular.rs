// src/extract/tabular.rs

use super::{derive_quantity_cost, Product, MAX_COST};
use crate::fields::{self, FieldMapping};
use crate::normalize::{normalize_text, parse_number};
use tracing::info;

/// How many leading rows to scan for a header. Real inventory sheets bury
/// the header under title/date banner rows.
const HEADER_SCAN_ROWS: usize = 10;

/// Extract products from one sheet's rows.
pub fn extract(rows: &[Vec<String>]) -> Vec<Product> {
    if rows.is_empty() {
        return Vec::new();
    }

    let header_idx = find_header_row(rows).unwrap_or(0);
    let labels = &rows[header_idx];
    let data = &rows[header_idx + 1..];

    let mut mapping = fields::resolve(labels);
    if mapping.name.is_none() {
        let cols = labels.len().max(data.iter().map(Vec::len).max().unwrap_or(0));
        mapping.name = Some(fields::fallback_name_column(data, cols));
    }
    info!(header_row = header_idx, mapping = ?mapping, "Resolved sheet fields");

    data.iter()
        .filter_map(|row| extract_row(row, &mapping))
        .collect()
}

/// Look for the first leading row where at least two canonical fields
/// match — that row is the header, everything above it is banner noise.
fn find_header_row(rows: &[Vec<String>]) -> Option<usize> {
    for (idx, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let mapping = fields::resolve(row);
        if resolved_count(&mapping) >= 2 {
            return Some(idx);
        }
    }
    None
}

fn resolved_count(m: &FieldMapping) -> usize {
    [m.name, m.barcode, m.quantity, m.cost, m.total, m.category]
        .iter()
        .filter(|c| c.is_some())
        .count()
}

fn cell<'a>(row: &'a [String], col: Option<usize>) -> Option<&'a str> {
    col.and_then(|c| row.get(c)).map(String::as_str)
}

pub(super) fn extract_row(row: &[String], mapping: &FieldMapping) -> Option<Product> {
    let name = normalize_text(cell(row, mapping.name)?);
    if name.chars().count() < 2 || fields::is_header_echo(&name) {
        return None;
    }

    let barcode = cell(row, mapping.barcode)
        .map(normalize_text)
        .filter(|b| !b.is_empty());

    let quantity = cell(row, mapping.quantity)
        .map(normalize_text)
        .filter(|v| !v.is_empty())
        .map(|v| parse_number(&v));
    let cost = cell(row, mapping.cost)
        .map(normalize_text)
        .filter(|v| !v.is_empty())
        .map(|v| parse_number(&v));
    let total = cell(row, mapping.total)
        .map(normalize_text)
        .filter(|v| !v.is_empty())
        .map(|v| parse_number(&v));

    // Last-resort cost candidates: every unclaimed column, in order.
    let claimed = [
        mapping.name,
        mapping.barcode,
        mapping.quantity,
        mapping.cost,
        mapping.total,
        mapping.category,
    ];
    let other_numerics: Vec<f64> = row
        .iter()
        .enumerate()
        .filter(|(i, _)| !claimed.contains(&Some(*i)))
        .map(|(_, v)| parse_number(v))
        .filter(|&v| v > 0.0 && v < MAX_COST)
        .collect();

    let (quantity, cost) = derive_quantity_cost(quantity, cost, total, &other_numerics);

    let mut product = Product::new(name, barcode, quantity, cost);
    if let Some(cat) = cell(row, mapping.category).map(normalize_text) {
        if !cat.is_empty() {
            product.category = cat;
        }
    }
    Some(product)
}

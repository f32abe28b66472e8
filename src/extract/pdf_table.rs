// src/extract/pdf_table.rs

use super::{derive_quantity_cost, tabular, Product, MAX_COST};
use crate::fields;
use crate::normalize::{normalize_text, parse_number};
use crate::pdf_doc::{Page, Table};
use tracing::info;

/// Extract products from every reconstructed table on every page.
pub fn extract(pages: &[Page]) -> Vec<Product> {
    let mut products = Vec::new();
    for page in pages {
        for table in &page.tables {
            let mut found = extract_table(table);
            products.append(&mut found);
        }
    }
    info!(products = products.len(), "PDF table extraction finished");
    products
}

fn extract_table(table: &Table) -> Vec<Product> {
    let Some(first) = table.rows.first() else {
        return Vec::new();
    };

    // The first row is a header iff any cell matches a field synonym.
    let has_header = first.iter().any(|cell| {
        fields::FIELD_ORDER
            .iter()
            .any(|&f| fields::label_matches(f, cell))
    });

    if has_header {
        let mapping = fields::resolve(first);
        table.rows[1..]
            .iter()
            .filter_map(|row| tabular::extract_row(row, &mapping))
            .collect()
    } else {
        table
            .rows
            .iter()
            .filter_map(|row| extract_ordinal_row(row))
            .collect()
    }
}

/// Headerless table: column 1 is the name when a second column exists,
/// else column 0. Cost comes from the remaining cells in the documented
/// order — there is no dedicated cost or total column to prefer.
fn extract_ordinal_row(row: &[String]) -> Option<Product> {
    let name_col = if row.len() > 1 { 1 } else { 0 };
    let name = normalize_text(row.get(name_col)?);
    if name.chars().count() < 2 || fields::is_header_echo(&name) {
        return None;
    }

    let numerics: Vec<f64> = row
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != name_col)
        .map(|(_, v)| parse_number(v))
        .filter(|&v| v > 0.0 && v < MAX_COST)
        .collect();

    let (quantity, cost) = derive_quantity_cost(None, None, None, &numerics);
    Some(Product::new(name, None, quantity, cost))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_doc::Table;

    fn table(data: &[&[&str]]) -> Table {
        Table {
            rows: data
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_table_with_header() {
        let t = table(&[
            &["Producto", "Cantidad", "Costo"],
            &["Leche", "10", "45.50"],
            &["Pan", "5", "22.00"],
        ]);
        let products = extract_table(&t);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Leche");
        assert_eq!(products[0].quantity, 10);
        assert_eq!(products[1].unit_cost, 22.0);
    }

    #[test]
    fn test_headerless_table_ordinal_fallback() {
        let t = table(&[
            &["7501001234567", "Leche Entera", "45.50"],
            &["7501007654321", "Pan Blanco", "22.00"],
        ]);
        let products = extract_table(&t);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Leche Entera");
        // Barcode column numeric value exceeds the cost cap, so the
        // remaining numeric cell becomes the cost.
        assert_eq!(products[0].unit_cost, 45.5);
    }

    #[test]
    fn test_header_echo_rows_skipped() {
        let t = table(&[
            &["123", "Nombre", "10"],
            &["456", "Queso", "99.0"],
        ]);
        let products = extract_table(&t);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Queso");
    }
}

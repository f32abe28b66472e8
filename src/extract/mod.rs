// src/extract/mod.rs

mod financial;
mod pdf_lines;
mod pdf_table;
mod tabular;

pub use financial::{BalanceSheet, FundDistribution};

use crate::config::GuardSection;
use crate::pdf_doc::Page;
use crate::sheet::Sheet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Quantities above this are treated as noise and reset to the default.
pub const MAX_QUANTITY: i64 = 100_000;

/// Costs at or above this are treated as unknown (0.0).
pub const MAX_COST: f64 = 1_000_000.0;

/// A normalized product row. Never mutated after creation; duplicates are
/// discarded whole by the final dedup pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "codigoBarras")]
    pub barcode: Option<String>,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
    /// Same value as `unit_cost` — the upstream upsert endpoint reads either.
    #[serde(rename = "precio")]
    pub price: f64,
    #[serde(rename = "costoBase")]
    pub unit_cost: f64,
    #[serde(rename = "categoria")]
    pub category: String,
}

impl Product {
    pub fn new(name: String, barcode: Option<String>, quantity: i64, unit_cost: f64) -> Self {
        let quantity = clamp_quantity(quantity);
        let unit_cost = clamp_cost(unit_cost);
        Product {
            name,
            barcode,
            quantity,
            price: unit_cost,
            unit_cost,
            category: "General".to_string(),
        }
    }
}

/// Out-of-range quantities reset to the default of 1.
pub fn clamp_quantity(q: i64) -> i64 {
    if q <= 0 || q > MAX_QUANTITY { 1 } else { q }
}

/// Out-of-range costs are unknown, not errors.
pub fn clamp_cost(c: f64) -> f64 {
    if !c.is_finite() || c < 0.0 || c >= MAX_COST {
        0.0
    } else {
        c
    }
}

/// Shared quantity/cost/total cross-derivation used by the tabular and PDF
/// table extractors. Order is load-bearing: resolved cost → total-derived
/// cost → quantity back-derived from total/cost → any other numeric cell.
pub fn derive_quantity_cost(
    quantity: Option<f64>,
    cost: Option<f64>,
    total: Option<f64>,
    other_numerics: &[f64],
) -> (i64, f64) {
    let mut qty = clamp_quantity(quantity.unwrap_or(1.0).round() as i64);
    let mut cost = clamp_cost(cost.unwrap_or(0.0));
    let total = total.unwrap_or(0.0);

    if cost == 0.0 && total > 0.0 && qty > 0 {
        cost = clamp_cost(total / qty as f64);
    }

    if qty == 1 && cost > 0.0 && total > 0.0 {
        let derived = (total / cost).round() as i64;
        qty = clamp_quantity(derived.max(1));
    }

    if cost == 0.0 {
        for &v in other_numerics {
            if v > 0.0 && v < MAX_COST {
                cost = v;
                break;
            }
        }
    }

    (qty, cost)
}

/// The final structured payload, printed as one JSON document on stdout.
#[derive(Debug, Serialize)]
pub struct ImportOutput {
    pub exito: bool,
    pub productos: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
    #[serde(rename = "balanceGeneral", skip_serializing_if = "Option::is_none")]
    pub balance: Option<BalanceSheet>,
    #[serde(rename = "distribucionSaldo", skip_serializing_if = "Option::is_none")]
    pub distribution: Option<FundDistribution>,
}

impl ImportOutput {
    pub fn failure(mensaje: impl Into<String>) -> Self {
        ImportOutput {
            exito: false,
            productos: Vec::new(),
            total: None,
            mensaje: Some(mensaje.into()),
            balance: None,
            distribution: None,
        }
    }
}

/// Product extraction from a workbook: every sheet contributes.
pub fn extract_from_sheets(sheets: &[Sheet]) -> Vec<Product> {
    let mut products = Vec::new();
    for sheet in sheets {
        let span = tracing::info_span!("sheet", name = %sheet.name);
        let _guard = span.enter();
        let mut found = tabular::extract(&sheet.rows);
        info!(products = found.len(), "Sheet processed");
        products.append(&mut found);
    }
    products
}

/// Deterministic PDF cascade: an ordered list of strategies, evaluated
/// until one yields at least one record. The financial extractor runs
/// afterwards regardless of product extraction.
pub fn extract_from_pages(
    pages: &[Page],
) -> (Vec<Product>, Option<BalanceSheet>, Option<FundDistribution>) {
    type Strategy = (&'static str, fn(&[Page]) -> Vec<Product>);
    const STRATEGIES: &[Strategy] = &[
        ("pdf_tables", pdf_table::extract),
        ("pdf_lines", pdf_lines::extract),
    ];

    let mut products = Vec::new();
    for (name, strategy) in STRATEGIES {
        let span = tracing::info_span!("strategy", name = *name);
        let _guard = span.enter();
        products = strategy(pages);
        info!(products = products.len(), "Strategy finished");
        if !products.is_empty() {
            break;
        }
    }

    let (balance, distribution) = financial::extract(pages);
    (products, balance, distribution)
}

/// Financial scan alone — used when the AI fallback already produced the
/// product list but the summary figures still come from the heuristics.
pub fn extract_financial(pages: &[Page]) -> (Option<BalanceSheet>, Option<FundDistribution>) {
    financial::extract(pages)
}

/// Vocabulary that marks a "product" name as a misparsed financial
/// statement line.
const FINANCIAL_VOCAB: &[&str] = &[
    "activo",
    "pasivo",
    "capital",
    "utilidad",
    "balance",
    "efectivo",
    "cuentas por cobrar",
    "cuentas por pagar",
    "deuda",
    "gastos generales",
    "ventas del mes",
    "patrimonio",
];

fn is_financial_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    FINANCIAL_VOCAB.iter().any(|kw| lower.contains(kw))
}

/// False-positive guard: when financial data was found and enough product
/// names read like balance-sheet line items, the document is a financial
/// statement and the product list is noise.
pub fn is_financial_only(
    products: &[Product],
    has_financial_data: bool,
    guard: &GuardSection,
) -> bool {
    if !has_financial_data || products.is_empty() {
        return false;
    }
    let matches = products.iter().filter(|p| is_financial_name(&p.name)).count();
    let threshold = if products.len() <= guard.small_list_len {
        guard.small_list_matches
    } else {
        guard.min_matches
    };
    matches >= threshold
}

/// Dedup by case-folded trimmed name. First occurrence wins; order of
/// first appearance is preserved.
pub fn dedup_products(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.name.trim().to_lowercase()))
        .collect()
}

/// Final assembly: guard, dedup, wrap. A run with zero products and no
/// financial data is a terminal extraction failure.
pub fn assemble(
    products: Vec<Product>,
    balance: Option<BalanceSheet>,
    distribution: Option<FundDistribution>,
    guard: &GuardSection,
) -> ImportOutput {
    let has_financial = balance.is_some() || distribution.is_some();

    let products = if is_financial_only(&products, has_financial, guard) {
        info!(
            discarded = products.len(),
            "Financial statement detected — discarding extracted product names"
        );
        Vec::new()
    } else {
        dedup_products(products)
    };

    if products.is_empty() && !has_financial {
        return ImportOutput::failure("No se encontraron productos en el documento");
    }

    ImportOutput {
        exito: true,
        total: Some(products.len()),
        productos: products,
        mensaje: None,
        balance,
        distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardSection;

    fn product(name: &str) -> Product {
        Product::new(name.to_string(), None, 1, 10.0)
    }

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(150_000), 1);
        assert_eq!(clamp_quantity(0), 1);
        assert_eq!(clamp_quantity(-5), 1);
        assert_eq!(clamp_quantity(99_999), 99_999);
    }

    #[test]
    fn test_clamp_cost() {
        assert_eq!(clamp_cost(-1.0), 0.0);
        assert_eq!(clamp_cost(1_000_000.0), 0.0);
        assert_eq!(clamp_cost(45.5), 45.5);
    }

    #[test]
    fn test_derive_cost_from_total() {
        // qty=2, total=10, no cost column ⇒ cost = 5
        let (qty, cost) = derive_quantity_cost(Some(2.0), None, Some(10.0), &[]);
        assert_eq!(qty, 2);
        assert_eq!(cost, 5.0);
    }

    #[test]
    fn test_derive_quantity_from_total_and_cost() {
        let (qty, cost) = derive_quantity_cost(None, Some(5.0), Some(20.0), &[]);
        assert_eq!(qty, 4);
        assert_eq!(cost, 5.0);
    }

    #[test]
    fn test_last_resort_cost_scan() {
        let (_, cost) = derive_quantity_cost(Some(3.0), None, None, &[0.0, 12.5, 99.0]);
        assert_eq!(cost, 12.5);
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let products = vec![product("Widget"), product("  widget  "), product("Otro")];
        let deduped = dedup_products(products);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "Widget");
    }

    #[test]
    fn test_guard_threshold() {
        let guard = GuardSection::default();
        let financial = vec![
            product("Total Activos"),
            product("Capital Contable"),
            product("Utilidad Neta"),
        ];
        assert!(is_financial_only(&financial, true, &guard));
        // No financial bag produced — never triggers.
        assert!(!is_financial_only(&financial, false, &guard));

        let normal = vec![product("Leche"), product("Pan")];
        assert!(!is_financial_only(&normal, true, &guard));
    }

    #[test]
    fn test_guard_small_list_single_match() {
        let guard = GuardSection::default();
        let mut products = vec![product("Capital Contable")];
        products.extend((0..10).map(|i| product(&format!("Producto {i}"))));
        assert!(is_financial_only(&products, true, &guard));
    }

    #[test]
    fn test_pdf_cascade_is_deterministic() {
        let pages = vec![Page {
            lines: vec![
                "BALANCE GENERAL".to_string(),
                "Efectivo en Caja y Banco $12,500.00".to_string(),
                "Leche Entera 10 45.50 $455.00".to_string(),
                "Pan Blanco 5 22.00 $110.00".to_string(),
            ],
            tables: Vec::new(),
        }];
        let first = extract_from_pages(&pages);
        let second = extract_from_pages(&pages);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_assemble_terminal_failure() {
        let guard = GuardSection::default();
        let out = assemble(Vec::new(), None, None, &guard);
        assert!(!out.exito);
        assert!(out.mensaje.is_some());
    }

    #[test]
    fn test_assemble_financial_only_document() {
        let guard = GuardSection::default();
        let products = vec![
            product("Total Activos"),
            product("Capital Contable"),
            product("Utilidad Neta"),
        ];
        let balance = Some(BalanceSheet {
            total_activos: Some(1000.0),
            ..Default::default()
        });
        let out = assemble(products, balance, None, &guard);
        assert!(out.exito);
        assert!(out.productos.is_empty());
        assert!(out.balance.is_some());
    }
}

// src/extract/financial.rs

use crate::normalize::parse_number;
use crate::pdf_doc::Page;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::info;

/// Balance-sheet figures. Field names are the wire names the upstream
/// consumers read; absent fields are omitted from the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efectivo_caja_banco: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuentas_por_cobrar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valor_inventario: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activos_fijos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deuda_a_negocio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_corrientes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_fijos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_activos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuentas_por_pagar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pasivos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_contable: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pasivos_mas_capital: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ventas_del_mes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gastos_generales: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilidad_neta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub porcentaje_neto: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub porcentaje_bruto: Option<f64>,
}

impl BalanceSheet {
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| v.as_object().is_some_and(|m| m.is_empty()))
            .unwrap_or(true)
    }
}

/// Fund-distribution figures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundDistribution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efectivo_caja_banco: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventario_mercancia: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activos_fijos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuentas_por_cobrar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuentas_por_pagar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otros: Option<f64>,
}

impl FundDistribution {
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| v.as_object().is_some_and(|m| m.is_empty()))
            .unwrap_or(true)
    }
}

#[derive(Clone, Copy)]
enum Section {
    Balance,
    Distribution,
}

/// Scan every page line for balance-sheet / fund-distribution figures.
/// Runs independently of product extraction. First match per field wins.
/// Classification starts only after a section heading has been seen, so
/// ordinary inventory listings never produce a bag.
pub fn extract(pages: &[Page]) -> (Option<BalanceSheet>, Option<FundDistribution>) {
    let mut balance = BalanceSheet::default();
    let mut distribution = FundDistribution::default();
    let mut section: Option<Section> = None;

    for page in pages {
        for line in &page.lines {
            let lower = fold_accents(&line.to_lowercase());

            if lower.contains("balance general") {
                section = Some(Section::Balance);
                continue;
            }
            if lower.contains("distribucion de saldo") || lower.contains("distribucion de fondos") {
                section = Some(Section::Distribution);
                continue;
            }

            match section {
                Some(Section::Balance) => classify_balance(&lower, &mut balance),
                Some(Section::Distribution) => classify_distribution(&lower, &mut distribution),
                None => {}
            }
        }
    }

    // A report with only a balance section still gets a distribution:
    // the corresponding balance figures carry over.
    if distribution.is_empty() && !balance.is_empty() {
        distribution = FundDistribution {
            efectivo_caja_banco: balance.efectivo_caja_banco,
            inventario_mercancia: balance.valor_inventario,
            activos_fijos: balance.activos_fijos,
            cuentas_por_cobrar: balance.cuentas_por_cobrar,
            cuentas_por_pagar: balance.cuentas_por_pagar,
            otros: None,
        };
    }

    let balance = (!balance.is_empty()).then_some(balance);
    let distribution = (!distribution.is_empty()).then_some(distribution);
    info!(
        balance = balance.is_some(),
        distribution = distribution.is_some(),
        "Financial section scan finished"
    );
    (balance, distribution)
}

fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// First `$`-formatted amount on a line. Monetary fields take nothing
/// else; a bare number next to a keyword (a year, a page count) is not
/// an amount.
fn first_currency_amount(line: &str) -> Option<f64> {
    static CURRENCY: OnceLock<Regex> = OnceLock::new();
    let currency = CURRENCY.get_or_init(|| Regex::new(r"\$\s*([\d][\d,]*(?:\.\d+)?)").unwrap());
    currency.captures(line).map(|caps| parse_number(&caps[1]))
}

/// First plain number on a line — only the percent fields use this,
/// since margins are never written with a currency symbol.
fn first_number(line: &str) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let number = NUMBER.get_or_init(|| Regex::new(r"([\d][\d,]*(?:\.\d+)?)").unwrap());
    number.captures(line).map(|caps| parse_number(&caps[1]))
}

fn set(slot: &mut Option<f64>, line: &str) {
    if slot.is_none() {
        if let Some(v) = first_currency_amount(line) {
            *slot = Some(v);
        }
    }
}

fn set_percent(slot: &mut Option<f64>, line: &str) {
    if slot.is_none() {
        if let Some(v) = first_number(line) {
            *slot = Some(v);
        }
    }
}

/// Keyword classification, most-specific phrases first so that e.g.
/// "total pasivos mas capital" never lands on the plain capital field.
fn classify_balance(line: &str, bag: &mut BalanceSheet) {
    let has = |kws: &[&str]| kws.iter().any(|kw| line.contains(kw));

    if has(&["pasivos mas capital", "pasivo mas capital"]) {
        set(&mut bag.total_pasivos_mas_capital, line);
    } else if has(&["total activos", "total de activos", "total activo"]) {
        set(&mut bag.total_activos, line);
    } else if has(&["total pasivos", "total pasivo"]) {
        set(&mut bag.total_pasivos, line);
    } else if has(&["total corrientes", "total circulante"]) {
        set(&mut bag.total_corrientes, line);
    } else if has(&["total fijos"]) {
        set(&mut bag.total_fijos, line);
    } else if has(&["activos fijos", "activo fijo"]) {
        set(&mut bag.activos_fijos, line);
    } else if has(&["cuentas por cobrar", "por cobrar"]) {
        set(&mut bag.cuentas_por_cobrar, line);
    } else if has(&["cuentas por pagar", "por pagar"]) {
        set(&mut bag.cuentas_por_pagar, line);
    } else if has(&["inventario"]) {
        set(&mut bag.valor_inventario, line);
    } else if has(&["efectivo", "caja y banco"]) {
        set(&mut bag.efectivo_caja_banco, line);
    } else if has(&["deuda"]) {
        set(&mut bag.deuda_a_negocio, line);
    } else if has(&["capital contable", "capital"]) {
        set(&mut bag.capital_contable, line);
    } else if has(&["utilidad neta"]) {
        set(&mut bag.utilidad_neta, line);
    } else if has(&["porcentaje neto", "margen neto", "% neto"]) {
        set_percent(&mut bag.porcentaje_neto, line);
    } else if has(&["porcentaje bruto", "margen bruto", "% bruto"]) {
        set_percent(&mut bag.porcentaje_bruto, line);
    } else if has(&["ventas del mes", "ventas"]) {
        set(&mut bag.ventas_del_mes, line);
    } else if has(&["gastos generales", "gastos"]) {
        set(&mut bag.gastos_generales, line);
    }
}

fn classify_distribution(line: &str, bag: &mut FundDistribution) {
    let has = |kws: &[&str]| kws.iter().any(|kw| line.contains(kw));

    if has(&["inventario", "mercancia"]) {
        set(&mut bag.inventario_mercancia, line);
    } else if has(&["activos fijos", "activo fijo"]) {
        set(&mut bag.activos_fijos, line);
    } else if has(&["cuentas por cobrar", "por cobrar"]) {
        set(&mut bag.cuentas_por_cobrar, line);
    } else if has(&["cuentas por pagar", "por pagar"]) {
        set(&mut bag.cuentas_por_pagar, line);
    } else if has(&["efectivo", "caja y banco"]) {
        set(&mut bag.efectivo_caja_banco, line);
    } else if has(&["otros"]) {
        set(&mut bag.otros, line);
    }
}

// src/fields.rs

use crate::normalize::{is_numeric_text, normalize_text};

/// Canonical target attributes that raw column labels are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Barcode,
    Quantity,
    Cost,
    Total,
    Category,
}

/// Fixed iteration order for resolution. Name first so later fields never
/// steal the name column on labels like "nombre del producto".
pub const FIELD_ORDER: &[Field] = &[
    Field::Name,
    Field::Barcode,
    Field::Quantity,
    Field::Cost,
    Field::Total,
    Field::Category,
];

/// Priority-ordered synonym substrings per canonical field. Spanish first —
/// that is what the source documents use — with English fallbacks.
pub fn synonyms(field: Field) -> &'static [&'static str] {
    match field {
        Field::Name => &[
            "nombre",
            "producto",
            "descripcion",
            "description",
            "name",
            "item",
            "articulo",
        ],
        Field::Barcode => &["codigo", "barras", "barcode", "sku", "ean", "clave"],
        Field::Quantity => &[
            "cantidad", "cant", "quantity", "stock", "unidades", "units", "qty",
        ],
        Field::Cost => &[
            "costo",
            "cost",
            "precio",
            "price",
            "unit price",
            "costo unitario",
        ],
        Field::Total => &["total", "importe"],
        Field::Category => &["categoria", "category", "depto", "departamento"],
    }
}

/// Per-document mapping from canonical field to the column index that
/// satisfied it. Built once per sheet or table, read-only afterward.
#[derive(Debug, Default, Clone)]
pub struct FieldMapping {
    pub name: Option<usize>,
    pub barcode: Option<usize>,
    pub quantity: Option<usize>,
    pub cost: Option<usize>,
    pub total: Option<usize>,
    pub category: Option<usize>,
}

impl FieldMapping {
    fn set(&mut self, field: Field, col: usize) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Barcode => &mut self.barcode,
            Field::Quantity => &mut self.quantity,
            Field::Cost => &mut self.cost,
            Field::Total => &mut self.total,
            Field::Category => &mut self.category,
        };
        if slot.is_none() {
            *slot = Some(col);
        }
    }
}

/// Does a single label refer to the given canonical field?
pub fn label_matches(field: Field, label: &str) -> bool {
    let lower = label.to_lowercase();
    synonyms(field).iter().any(|syn| lower.contains(syn))
}

/// True when a cell value is a repeated column label rather than data
/// (a header-echo row misplaced inside the data region).
pub fn is_header_echo(value: &str) -> bool {
    let lower = normalize_text(value).to_lowercase();
    if lower.is_empty() {
        return false;
    }
    FIELD_ORDER
        .iter()
        .any(|&f| synonyms(f).iter().any(|&syn| lower == syn))
}

/// Resolve canonical fields against a header row. For each field in the
/// fixed order, the first synonym that matches the first label wins — no
/// scoring, no tie-breaks beyond order. A column already claimed by an
/// earlier field is not reconsidered.
pub fn resolve(labels: &[String]) -> FieldMapping {
    let lowered: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    let mut mapping = FieldMapping::default();
    let mut claimed = vec![false; labels.len()];

    for &field in FIELD_ORDER {
        'syns: for syn in synonyms(field) {
            for (col, label) in lowered.iter().enumerate() {
                if !claimed[col] && label.contains(syn) {
                    mapping.set(field, col);
                    claimed[col] = true;
                    break 'syns;
                }
            }
        }
    }

    mapping
}

/// Fallback when no label satisfied `name`: the first column where at least
/// half of the sampled values are non-empty and not purely numeric, else
/// column 0 outright.
pub fn fallback_name_column(rows: &[Vec<String>], columns: usize) -> usize {
    for col in 0..columns {
        let mut seen = 0usize;
        let mut texty = 0usize;
        for row in rows {
            let Some(cell) = row.get(col) else { continue };
            seen += 1;
            let cleaned = normalize_text(cell);
            if !cleaned.is_empty() && !is_numeric_text(&cleaned) {
                texty += 1;
            }
        }
        if seen > 0 && texty * 2 >= seen {
            return col;
        }
    }
    0
}

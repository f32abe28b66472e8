// src/sheet.rs

use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::info;

/// One worksheet flattened to string cells. The extractor works on strings
/// only; numeric cells are formatted the way they would print.
#[derive(Debug)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Load every sheet of an XLSX/XLS workbook.
pub fn load_workbook(path: &Path) -> Result<Vec<Sheet>, Box<dyn std::error::Error>> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    let mut sheets = Vec::new();
    for name in &sheet_names {
        let Ok(range) = workbook.worksheet_range(name) else {
            continue;
        };
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        info!(sheet = %name, rows = rows.len(), "Loaded worksheet");
        sheets.push(Sheet {
            name: name.clone(),
            rows,
        });
    }

    if sheets.is_empty() {
        return Err("El libro no contiene hojas".into());
    }
    Ok(sheets)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}

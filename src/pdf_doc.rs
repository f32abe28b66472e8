// src/pdf_doc.rs

use lopdf::Document;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Result of attempting to extract text from a PDF.
#[derive(Debug)]
pub enum PdfContent {
    /// The PDF contains extractable text, split per page.
    Pages(Vec<Page>),
    /// The PDF appears to be scanned / image-only — needs OCR.
    ScannedImage,
    /// Something went wrong during extraction.
    Error(String),
}

/// One page of extracted text: the raw lines plus any tables reconstructed
/// from delimiter or column alignment.
#[derive(Debug, Default)]
pub struct Page {
    pub lines: Vec<String>,
    pub tables: Vec<Table>,
}

/// Rows of cells recovered from aligned or delimited text lines.
#[derive(Debug)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// Minimum number of non-whitespace characters we expect from a
/// "real" text PDF. Below this threshold we treat it as scanned.
const MIN_TEXT_CHARS: usize = 30;

/// A table needs at least this many rows to be treated as one.
const MIN_TABLE_ROWS: usize = 2;

/// Main entry point: takes raw PDF bytes and returns `PdfContent`.
pub fn extract_pages(pdf_bytes: &[u8]) -> PdfContent {
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => return PdfContent::Error(format!("No se pudo leer el PDF: {e}")),
    };

    if looks_like_scanned(&doc) {
        info!("PDF structural check: likely scanned / image-only");
        return PdfContent::ScannedImage;
    }

    match pdf_extract::extract_text_from_mem(pdf_bytes) {
        Ok(text) => {
            let meaningful: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            if meaningful.len() < MIN_TEXT_CHARS {
                info!(
                    chars = meaningful.len(),
                    "Extracted text too short — treating as scanned"
                );
                PdfContent::ScannedImage
            } else {
                let pages = split_pages(&text);
                info!(chars = meaningful.len(), pages = pages.len(), "Text extracted");
                PdfContent::Pages(pages)
            }
        }
        Err(e) => {
            warn!(error = %e, "pdf-extract failed — may be scanned or corrupted");
            PdfContent::ScannedImage
        }
    }
}

/// Split extracted text on form feeds into pages, and each page into lines
/// plus reconstructed tables. Documents without form feeds are one page.
pub fn split_pages(text: &str) -> Vec<Page> {
    text.split('\u{c}')
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| {
            let lines: Vec<String> = chunk
                .lines()
                .map(|l| l.trim_end().to_string())
                .filter(|l| !l.trim().is_empty())
                .collect();
            let tables = reconstruct_tables(&lines);
            Page { lines, tables }
        })
        .collect()
}

/// Split a line into table cells. Pipe-delimited rows take precedence
/// (that is how upstream table extractors join cells); otherwise runs of
/// two or more spaces act as column boundaries.
fn split_cells(line: &str) -> Vec<String> {
    static GAP: OnceLock<Regex> = OnceLock::new();
    let gap = GAP.get_or_init(|| Regex::new(r"\s{2,}").unwrap());

    let cells: Vec<String> = if line.contains('|') {
        line.split('|').map(|c| c.trim().to_string()).collect()
    } else {
        gap.split(line.trim()).map(|c| c.trim().to_string()).collect()
    };
    cells.into_iter().filter(|c| !c.is_empty()).collect()
}

/// Group consecutive multi-cell lines into tables. A run of lines that each
/// split into two or more cells is a table candidate; shorter runs stay as
/// plain text for the line-based extractor.
fn reconstruct_tables(lines: &[String]) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in lines {
        let cells = split_cells(line);
        if cells.len() >= 2 {
            current.push(cells);
        } else {
            if current.len() >= MIN_TABLE_ROWS {
                tables.push(Table {
                    rows: std::mem::take(&mut current),
                });
            }
            current.clear();
        }
    }
    if current.len() >= MIN_TABLE_ROWS {
        tables.push(Table { rows: current });
    }
    tables
}

/// Heuristic: inspect the PDF object tree for signs that every page
/// is just a single image with no text operators.
///
/// We look at each page's `Resources` dictionary. If a page has
/// XObject images but **no** Font resources, it's almost certainly
/// a scanned page.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false; // Can't tell — let text extraction try
    }

    let mut image_only_pages = 0;

    for (_page_num, object_id) in &pages {
        let Ok(page_obj) = doc.get_object(*object_id) else {
            continue;
        };
        let Some(page_dict) = page_obj.as_dict().ok() else {
            continue;
        };

        let has_fonts = page_dict
            .get(b"Resources")
            .ok()
            .and_then(|r| doc.dereference(r).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok())
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|f| doc.dereference(f).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok())
            .is_some_and(|fonts| !fonts.is_empty());

        let has_images = page_dict
            .get(b"Resources")
            .ok()
            .and_then(|r| doc.dereference(r).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok())
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|x| doc.dereference(x).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok())
            .is_some_and(|xobjs| !xobjs.is_empty());

        if has_images && !has_fonts {
            image_only_pages += 1;
        }
    }

    let total = pages.len();
    let ratio = image_only_pages as f64 / total as f64;
    info!(
        total_pages = total,
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );

    // If ≥80% of pages are image-only, treat the whole PDF as scanned
    ratio >= 0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes() {
        let result = extract_pages(b"this is not a pdf");
        assert!(matches!(result, PdfContent::Error(_)));
    }

    #[test]
    fn test_split_cells_pipes_and_gaps() {
        assert_eq!(split_cells("Leche | 123 | 45.50"), vec!["Leche", "123", "45.50"]);
        assert_eq!(split_cells("Pan Blanco   10   22.00"), vec!["Pan Blanco", "10", "22.00"]);
        assert_eq!(split_cells("una sola celda"), vec!["una sola celda"]);
    }

    #[test]
    fn test_reconstruct_tables_groups_runs() {
        let lines: Vec<String> = [
            "INVENTARIO GENERAL",
            "Producto | Cantidad | Costo",
            "Leche | 10 | 45.50",
            "Pan | 5 | 22.00",
            "fin del reporte",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let tables = reconstruct_tables(&lines);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[1][0], "Leche");
    }

    #[test]
    fn test_single_multicell_line_is_not_a_table() {
        let lines = vec!["Leche | 45.50".to_string()];
        assert!(reconstruct_tables(&lines).is_empty());
    }

    #[test]
    fn test_split_pages_form_feed() {
        let pages = split_pages("pagina uno\nlinea dos\u{c}pagina dos");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 2);
    }
}

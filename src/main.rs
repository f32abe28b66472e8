mod ai_extract;
mod config;
mod extract;
mod fields;
mod normalize;
mod pdf_doc;
mod sheet;

use config::Config;
use extract::ImportOutput;
use std::path::Path;
use tracing::{info, warn};

const USAGE: &str = "Uso: inventory-import <tipo> <archivo> [api_key]";

#[tokio::main]
async fn main() {
    // init tracing — stderr only, stdout carries the JSON payload
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let output = run(&args).await;

    let json = serde_json::to_string(&output)
        .unwrap_or_else(|_| r#"{"exito":false,"productos":[],"mensaje":"Error interno"}"#.into());
    println!("{json}");

    std::process::exit(if output.exito { 0 } else { 1 });
}

/// Outermost boundary: every failure below this point becomes a
/// structured payload, never an escaped error.
async fn run(args: &[String]) -> ImportOutput {
    if args.len() < 3 {
        return ImportOutput::failure(USAGE);
    }

    let doc_type = args[1].to_lowercase();
    let path = Path::new(&args[2]);
    let api_key = args
        .get(3)
        .cloned()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .filter(|k| !k.trim().is_empty());

    if !path.exists() {
        return ImportOutput::failure(format!("Archivo no encontrado: {}", path.display()));
    }

    let cfg = match Config::load("import.toml") {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "Config file unreadable — using defaults");
            Config::default()
        }
    };

    match doc_type.as_str() {
        "xlsx" | "xls" => process_workbook(path, &cfg),
        "pdf" => process_pdf(path, api_key.as_deref(), &cfg).await,
        other => ImportOutput::failure(format!("Tipo de archivo no soportado: {other}")),
    }
}

fn process_workbook(path: &Path, cfg: &Config) -> ImportOutput {
    let sheets = match sheet::load_workbook(path) {
        Ok(sheets) => sheets,
        Err(e) => return ImportOutput::failure(format!("Error al procesar Excel: {e}")),
    };

    let products = extract::extract_from_sheets(&sheets);
    extract::assemble(products, None, None, &cfg.guard)
}

async fn process_pdf(path: &Path, api_key: Option<&str>, cfg: &Config) -> ImportOutput {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => return ImportOutput::failure(format!("No se pudo leer el archivo: {e}")),
    };

    let pages = match pdf_doc::extract_pages(&bytes) {
        pdf_doc::PdfContent::Pages(pages) => pages,
        pdf_doc::PdfContent::ScannedImage => {
            return ImportOutput::failure("PDF escaneado o sin texto extraíble");
        }
        pdf_doc::PdfContent::Error(e) => return ImportOutput::failure(e),
    };

    // AI first when a credential exists; its output is all-or-nothing and
    // never merged with the deterministic strategies.
    if let Some(key) = api_key {
        let text: String = pages
            .iter()
            .flat_map(|p| p.lines.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        match ai_extract::extract_products(&cfg.ai, key, &text).await {
            Ok(products) => {
                info!(products = products.len(), "AI extraction succeeded");
                let (balance, distribution) = extract::extract_financial(&pages);
                return extract::assemble(products, balance, distribution, &cfg.guard);
            }
            Err(e) => {
                warn!(error = %e, "AI extraction failed — falling back to heuristics");
            }
        }
    }

    let (products, balance, distribution) = extract::extract_from_pages(&pages);
    extract::assemble(products, balance, distribution, &cfg.guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_arguments() {
        let out = run(&args(&["inventory-import"])).await;
        assert!(!out.exito);
        assert_eq!(out.mensaje.as_deref(), Some(USAGE));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let out = run(&args(&["inventory-import", "pdf", "/no/existe.pdf"])).await;
        assert!(!out.exito);
        assert_eq!(
            out.mensaje.as_deref(),
            Some("Archivo no encontrado: /no/existe.pdf")
        );
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let out = run(&args(&["inventory-import", "docx", "Cargo.toml"])).await;
        assert!(!out.exito);
        assert_eq!(
            out.mensaje.as_deref(),
            Some("Tipo de archivo no soportado: docx")
        );
    }
}

// src/ai_extract.rs

use crate::config::AiSection;
use crate::extract::Product;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

/// The instruction that demands a strict JSON array back. The model gets
/// the document text inline; any deviation from the contract is treated
/// as a recoverable failure.
const PROMPT_HEADER: &str = r#"Analiza el siguiente texto extraído de un inventario.
Extrae todos los productos y devuélvelos en formato JSON array.

Para cada producto identifica:
- nombre: el nombre del producto
- codigoBarras: el código de barras o SKU (si existe, si no null)
- cantidad: la cantidad en inventario (entero, 1 si no existe)
- costoBase: el costo o precio unitario (solo el número, 0 si no existe)

Formato de respuesta (SOLO JSON, sin markdown, sin explicaciones):
[
  {"nombre": "Nombre del producto", "codigoBarras": "123456789", "cantidad": 10, "costoBase": 10.50}
]

Texto del inventario:
"#;

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// One record of the model's JSON contract. Absent fields get defaults.
#[derive(Debug, Deserialize)]
struct AiProduct {
    #[serde(default)]
    nombre: String,
    #[serde(default, rename = "codigoBarras")]
    codigo_barras: Option<String>,
    #[serde(default)]
    cantidad: Option<f64>,
    #[serde(default, rename = "costoBase")]
    costo_base: Option<f64>,
}

/// Send bounded document text to the generative model and parse the
/// response. Every failure here is recoverable — the caller falls back
/// to the deterministic cascade.
pub async fn extract_products(
    cfg: &AiSection,
    api_key: &str,
    document_text: &str,
) -> Result<Vec<Product>, Box<dyn std::error::Error>> {
    let text = truncate_chars(document_text, cfg.max_chars);
    info!(
        chars = text.len(),
        model = %cfg.model,
        "Sending document text to generative model"
    );

    let request = GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: format!("{PROMPT_HEADER}{text}"),
            }],
        }],
    };

    let url = format!(
        "{}/models/{}:generateContent?key={}",
        cfg.base_url, cfg.model, api_key
    );
    let client = Client::new();
    let response = client.post(&url).json(&request).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Error del servicio de IA {status}: {body}").into());
    }

    let generated: GenerateResponse = response.json().await?;
    let content = generated
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .map(|p| p.text.as_str())
        .ok_or("Respuesta vacía del servicio de IA")?;

    parse_products(content)
}

/// Parse the model's reply into validated products. Fails if the reply is
/// not a JSON array or contains no record with a non-empty name.
fn parse_products(reply: &str) -> Result<Vec<Product>, Box<dyn std::error::Error>> {
    // Strip markdown fences if the model added them despite instructions
    let stripped = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json_str = extract_json_array(stripped)?;
    let raw: Vec<AiProduct> = serde_json::from_str(json_str)
        .map_err(|e| format!("Respuesta de IA no es un JSON array válido: {e}"))?;

    let products: Vec<Product> = raw
        .into_iter()
        .filter_map(|p| {
            let name = p.nombre.trim().to_string();
            if name.chars().count() < 2 {
                return None;
            }
            let barcode = p
                .codigo_barras
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty());
            let quantity = p.cantidad.unwrap_or(1.0).round() as i64;
            Some(Product::new(name, barcode, quantity, p.costo_base.unwrap_or(0.0)))
        })
        .collect();

    if products.is_empty() {
        return Err("La IA no devolvió productos con nombre".into());
    }
    info!(products = products.len(), "AI extraction parsed");
    Ok(products)
}

/// Extract the outermost JSON array from a string that may contain
/// surrounding prose.
fn extract_json_array(s: &str) -> Result<&str, Box<dyn std::error::Error>> {
    let start = s.find('[').ok_or("No se encontró '[' en la respuesta de IA")?;
    let end = s.rfind(']').ok_or("No se encontró ']' en la respuesta de IA")?;
    if end <= start {
        return Err("JSON malformado en la respuesta de IA".into());
    }
    Ok(&s[start..=end])
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_products_with_fences() {
        let reply = "```json\n[{\"nombre\": \"Leche\", \"cantidad\": 10, \"costoBase\": 45.5}]\n```";
        let products = parse_products(reply).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Leche");
        assert_eq!(products[0].quantity, 10);
        assert_eq!(products[0].unit_cost, 45.5);
    }

    #[test]
    fn test_parse_products_with_surrounding_prose() {
        let reply = "Aquí está el resultado: [{\"nombre\": \"Pan\"}] espero que sirva";
        let products = parse_products(reply).unwrap();
        assert_eq!(products[0].name, "Pan");
        assert_eq!(products[0].quantity, 1);
        assert_eq!(products[0].unit_cost, 0.0);
        assert!(products[0].barcode.is_none());
    }

    #[test]
    fn test_parse_products_rejects_non_array() {
        assert!(parse_products("{\"nombre\": \"Pan\"}").is_err());
        assert!(parse_products("no hay json aqui").is_err());
    }

    #[test]
    fn test_parse_products_rejects_all_nameless() {
        assert!(parse_products("[{\"cantidad\": 5}, {\"nombre\": \"\"}]").is_err());
        assert!(parse_products("[]").is_err());
    }

    #[test]
    fn test_parse_products_applies_clamps() {
        let reply = "[{\"nombre\": \"Azucar\", \"cantidad\": 150000, \"costoBase\": -3}]";
        let products = parse_products(reply).unwrap();
        assert_eq!(products[0].quantity, 1);
        assert_eq!(products[0].unit_cost, 0.0);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hola", 10), "hola");
        assert_eq!(truncate_chars("hola mundo", 4), "hola");
        // Multibyte boundary safety.
        assert_eq!(truncate_chars("áéí", 2), "áé");
    }
}

use serde::Deserialize;
use std::{fs, path::Path};

/// Runtime configuration. Every field has a default, so the config file
/// (`import.toml` in the working directory) is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub guard: GuardSection,
    #[serde(default)]
    pub ai: AiSection,
}

/// Thresholds for the financial false-positive guard. Empirically chosen
/// constants — configuration, not law.
#[derive(Debug, Deserialize)]
pub struct GuardSection {
    #[serde(default = "default_min_matches")]
    pub min_matches: usize,
    #[serde(default = "default_small_list_len")]
    pub small_list_len: usize,
    #[serde(default = "default_small_list_matches")]
    pub small_list_matches: usize,
}

fn default_min_matches() -> usize {
    3
}

fn default_small_list_len() -> usize {
    40
}

fn default_small_list_matches() -> usize {
    1
}

impl Default for GuardSection {
    fn default() -> Self {
        GuardSection {
            min_matches: default_min_matches(),
            small_list_len: default_small_list_len(),
            small_list_matches: default_small_list_matches(),
        }
    }
}

/// Generative-model fallback settings.
#[derive(Debug, Deserialize)]
pub struct AiSection {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Character budget for document text sent to the model.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_max_chars() -> usize {
    30_000
}

impl Default for AiSection {
    fn default() -> Self {
        AiSection {
            model: default_model(),
            base_url: default_base_url(),
            max_chars: default_max_chars(),
        }
    }
}

impl Config {
    /// Load from a TOML file, or fall back to defaults when it is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.as_ref().exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

//! Model catalogue: entry type and catalogue-file parsing.
//!
//! The catalogue is a semicolon-separated text file, one model per line:
//!
//! ```text
//! id;shortcode;endpoint;apikey_env;max_input;max_output;input_cost;output_cost;min_temp;max_temp[;requires_completion_tokens]
//! ```
//!
//! Blank lines and `#` comments are skipped. Rows with fewer than ten
//! columns are warned about and dropped; unparseable numeric fields fall
//! back to zero.

mod ollama;
mod registry;

pub use ollama::discover_ollama_models;
pub use registry::ModelRegistry;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One catalogue record. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Canonical provider-side model identifier.
    pub id: String,

    /// Human-facing alias; may equal `id`.
    pub shortcode: String,

    /// Full chat-completions endpoint URL.
    pub endpoint: String,

    /// Name of the environment variable holding the API credential.
    /// Empty for keyless providers (Ollama).
    #[serde(rename = "apikey")]
    pub apikey_env: String,

    pub max_input_tokens: u64,
    pub max_output_tokens: u64,

    /// $ per million input tokens.
    pub input_cost: f64,
    /// $ per million output tokens.
    pub output_cost: f64,

    pub min_temperature: f64,
    pub max_temperature: f64,

    /// Provider wants `max_completion_tokens` instead of `max_tokens`.
    pub requires_completion_tokens: bool,
}

impl ModelEntry {
    /// Midpoint of the allowed temperature range, or 1.0 for degenerate
    /// ranges. Used when the client leaves temperature unset.
    pub fn default_temperature(&self) -> f64 {
        if self.min_temperature < self.max_temperature {
            (self.min_temperature + self.max_temperature) / 2.0
        } else {
            1.0
        }
    }
}

/// Parse a catalogue file into entries keyed by canonical id.
pub fn parse_catalog(content: &str) -> Vec<ModelEntry> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split(';').collect();
        if parts.len() < 10 {
            warn!(line = %line, "catalogue row has fewer than 10 columns, skipping");
            continue;
        }

        entries.push(ModelEntry {
            id: parts[0].trim().to_string(),
            shortcode: parts[1].trim().to_string(),
            endpoint: parts[2].trim().to_string(),
            apikey_env: parts[3].trim().to_string(),
            max_input_tokens: parts[4].trim().parse().unwrap_or(0),
            max_output_tokens: parts[5].trim().parse().unwrap_or(0),
            input_cost: parts[6].trim().parse().unwrap_or(0.0),
            output_cost: parts[7].trim().parse().unwrap_or(0.0),
            min_temperature: parts[8].trim().parse().unwrap_or(0.0),
            max_temperature: parts[9].trim().parse().unwrap_or(0.0),
            requires_completion_tokens: parts.get(10).map(|v| v.trim() == "true").unwrap_or(false),
        });
    }

    info!(count = entries.len(), "catalogue parsed");
    entries
}

/// Load the catalogue, preferring the on-disk file over the embedded default.
pub fn load_catalog(path: &std::path::Path, embedded_default: &str) -> Vec<ModelEntry> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            info!(path = %path.display(), "catalogue loaded from disk");
            parse_catalog(&content)
        }
        Err(_) => {
            info!("catalogue file not found, using embedded default");
            parse_catalog(embedded_default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# comment line
gpt-4.1;gpt41;https://api.example.com/v1/chat/completions;EXAMPLE_KEY;128000;8192;2.0;8.0;0.0;2.0

gpt-5-mini;gpt5m;https://api.example.com/v1/chat/completions;EXAMPLE_KEY;128000;4096;0.25;2.0;0.0;2.0;true
bad-row;too;few;columns
garbage-numbers;g;https://api.example.com;KEY;abc;xyz;n;n;n;n
";

    #[test]
    fn test_parse_catalog_skips_comments_and_short_rows() {
        let entries = parse_catalog(SAMPLE);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.id != "bad-row"));
    }

    #[test]
    fn test_parse_catalog_fields() {
        let entries = parse_catalog(SAMPLE);
        let gpt = entries.iter().find(|e| e.id == "gpt-4.1").unwrap();
        assert_eq!(gpt.shortcode, "gpt41");
        assert_eq!(gpt.apikey_env, "EXAMPLE_KEY");
        assert_eq!(gpt.max_input_tokens, 128_000);
        assert_eq!(gpt.max_output_tokens, 8_192);
        assert_eq!(gpt.input_cost, 2.0);
        assert!(!gpt.requires_completion_tokens);
    }

    #[test]
    fn test_parse_catalog_completion_tokens_flag() {
        let entries = parse_catalog(SAMPLE);
        let mini = entries.iter().find(|e| e.id == "gpt-5-mini").unwrap();
        assert!(mini.requires_completion_tokens);
    }

    #[test]
    fn test_parse_catalog_garbage_numerics_default_to_zero() {
        let entries = parse_catalog(SAMPLE);
        let garbage = entries.iter().find(|e| e.id == "garbage-numbers").unwrap();
        assert_eq!(garbage.max_input_tokens, 0);
        assert_eq!(garbage.input_cost, 0.0);
        assert_eq!(garbage.min_temperature, 0.0);
    }

    #[test]
    fn test_default_temperature_midpoint() {
        let entries = parse_catalog(SAMPLE);
        let gpt = entries.iter().find(|e| e.id == "gpt-4.1").unwrap();
        assert_eq!(gpt.default_temperature(), 1.0);

        let degenerate = ModelEntry {
            min_temperature: 0.0,
            max_temperature: 0.0,
            ..gpt.clone()
        };
        assert_eq!(degenerate.default_temperature(), 1.0);

        let narrow = ModelEntry {
            min_temperature: 0.0,
            max_temperature: 1.0,
            ..gpt.clone()
        };
        assert_eq!(narrow.default_temperature(), 0.5);
    }

    #[test]
    fn test_embedded_default_catalog_parses() {
        let entries = parse_catalog(include_str!("../../models.csv"));
        assert!(!entries.is_empty());
        // The embedded catalogue carries at least one Anthropic-format entry.
        assert!(entries.iter().any(|e| e.endpoint.contains("anthropic")));
    }
}

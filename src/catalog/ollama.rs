//! Startup discovery of locally installed Ollama models.
//!
//! Queries the daemon's `/api/tags` endpoint once; an unreachable daemon is
//! not an error, it just yields an empty set. Discovered models register
//! under a derived shortcode (`gemma3:12b` becomes `ollama-gemma3-12b`) with
//! the shortcode doubling as the canonical id.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ModelEntry;

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct OllamaTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaTag>,
}

/// Derive a registry shortcode from an Ollama model name: `:` becomes `-`,
/// a trailing `-latest` is dropped.
fn derive_shortcode(name: &str) -> String {
    let shortcode = format!("ollama-{}", name.replace(':', "-"));
    shortcode
        .strip_suffix("-latest")
        .map(str::to_string)
        .unwrap_or(shortcode)
}

fn ollama_entry(name: &str, chat_endpoint: &str) -> ModelEntry {
    let shortcode = derive_shortcode(name);
    ModelEntry {
        id: shortcode.clone(),
        shortcode,
        endpoint: chat_endpoint.to_string(),
        apikey_env: String::new(),
        max_input_tokens: 0,
        max_output_tokens: 0,
        input_cost: 0.0,
        output_cost: 0.0,
        min_temperature: 0.0,
        max_temperature: 2.0,
        requires_completion_tokens: false,
    }
}

/// Query the Ollama daemon at `endpoint` (e.g. `http://localhost:11434`)
/// for installed models. Returns an empty list if the daemon is down or
/// answers with garbage.
pub async fn discover_ollama_models(client: &reqwest::Client, endpoint: &str) -> Vec<ModelEntry> {
    let url = format!("{}/api/tags", endpoint.trim_end_matches('/'));

    let response = match client.get(&url).timeout(DISCOVERY_TIMEOUT).send().await {
        Ok(resp) => resp,
        Err(_) => {
            info!(endpoint = %endpoint, "Ollama not reachable, skipping discovery");
            return Vec::new();
        }
    };

    let tags: OllamaTagsResponse = match response.json().await {
        Ok(tags) => tags,
        Err(err) => {
            warn!(error = %err, "failed to parse Ollama /api/tags response");
            return Vec::new();
        }
    };

    let chat_endpoint = format!(
        "{}/v1/chat/completions",
        endpoint.trim_end_matches('/')
    );

    let entries: Vec<ModelEntry> = tags
        .models
        .iter()
        .map(|tag| {
            let entry = ollama_entry(&tag.name, &chat_endpoint);
            debug!(shortcode = %entry.shortcode, model = %tag.name, "registered Ollama model");
            entry
        })
        .collect();

    info!(endpoint = %endpoint, models = entries.len(), "Ollama discovery finished");
    entries
}

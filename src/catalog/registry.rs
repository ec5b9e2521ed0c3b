//! In-memory model registry with shortcode resolution.
//!
//! Built once at startup from the catalogue plus discovered Ollama entries,
//! then shared immutably. Resolution tries the canonical id first and falls
//! back to a linear shortcode scan, so an id always wins over a colliding
//! shortcode.

use std::collections::HashMap;

use super::ModelEntry;

/// Read-only map from canonical id to [`ModelEntry`].
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelEntry>,
}

impl ModelRegistry {
    /// Build a registry from catalogue entries. Later duplicates of an id
    /// replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = ModelEntry>) -> Self {
        let models = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self { models }
    }

    /// Resolve a client-supplied model token: direct id lookup, then a
    /// shortcode scan. Returns `None` for unknown tokens.
    pub fn resolve(&self, token: &str) -> Option<&ModelEntry> {
        if let Some(entry) = self.models.get(token) {
            return Some(entry);
        }
        self.models.values().find(|e| e.shortcode == token)
    }

    /// All entries, in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = &ModelEntry> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, shortcode: &str) -> ModelEntry {
        ModelEntry {
            id: id.to_string(),
            shortcode: shortcode.to_string(),
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            apikey_env: "EXAMPLE_KEY".to_string(),
            max_input_tokens: 128_000,
            max_output_tokens: 8_192,
            input_cost: 1.0,
            output_cost: 2.0,
            min_temperature: 0.0,
            max_temperature: 2.0,
            requires_completion_tokens: false,
        }
    }

    #[test]
    fn test_resolve_by_id() {
        let registry = ModelRegistry::from_entries([entry("gpt-4.1", "gpt41")]);
        assert_eq!(registry.resolve("gpt-4.1").unwrap().id, "gpt-4.1");
    }

    #[test]
    fn test_resolve_by_shortcode_matches_id_lookup() {
        let registry = ModelRegistry::from_entries([entry("gpt-4.1", "gpt41")]);
        let by_id = registry.resolve("gpt-4.1").unwrap();
        let by_shortcode = registry.resolve("gpt41").unwrap();
        assert_eq!(by_id, by_shortcode);
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let registry = ModelRegistry::from_entries([entry("gpt-4.1", "gpt41")]);
        assert!(registry.resolve("nope").is_none());
    }

    #[test]
    fn test_id_wins_over_colliding_shortcode() {
        // A model whose id equals another model's shortcode: direct id
        // lookup must win the ambiguity.
        let registry = ModelRegistry::from_entries([
            entry("gpt41", "g41"),
            entry("gpt-4.1", "gpt41"),
        ]);
        assert_eq!(registry.resolve("gpt41").unwrap().id, "gpt41");
    }
}

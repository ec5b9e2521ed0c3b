//! Process-wide memory block.
//!
//! A single system-role preamble spliced onto every outgoing message list.
//! Loaded once at startup (disk preferred over the embedded default),
//! mutated through `PUT /api/memory`, and written back to disk on every
//! mutation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// The shared preamble. `cache` flags the content for upstream prompt
/// caching where a provider supports it; the gateway only passes it along.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cache: bool,
}

/// Load the memory block, preferring the on-disk file over the embedded
/// default. Parse failures log a warning and yield an empty block.
pub fn load_memory(path: &Path, embedded_default: &str) -> MemoryBlock {
    let content = match std::fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "memory block loaded from disk");
            data
        }
        Err(_) => {
            info!("memory file not found, using embedded default");
            embedded_default.to_string()
        }
    };

    match serde_json::from_str(&content) {
        Ok(block) => block,
        Err(err) => {
            warn!(error = %err, "memory block unparseable, starting empty");
            MemoryBlock::default()
        }
    }
}

/// Persist the memory block to disk.
pub fn persist_memory(path: &Path, block: &MemoryBlock) -> std::io::Result<()> {
    let data = serde_json::to_string_pretty(block)?;
    std::fs::write(path, data)
}

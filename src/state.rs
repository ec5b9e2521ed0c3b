//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::ModelRegistry;
use crate::config::{CircuitBreakerConfig, RetryConfig};
use crate::memory::MemoryBlock;
use crate::providers::CircuitBreakerRegistry;
use crate::session::SessionStore;

/// Handles shared by every request handler. Cloning is cheap; everything
/// mutable sits behind its own lock.
#[derive(Clone)]
pub struct AppState {
    /// Immutable after startup (catalogue + discovered Ollama entries).
    pub registry: Arc<ModelRegistry>,

    /// Shared memory preamble; the hot path takes a read lock to copy it.
    pub memory: Arc<RwLock<MemoryBlock>>,

    /// Where `PUT /api/memory` persists the block.
    pub memory_path: Arc<PathBuf>,

    pub sessions: Arc<SessionStore>,

    /// Per-model breakers, created lazily on first use.
    pub breakers: CircuitBreakerRegistry,
    pub breaker_config: CircuitBreakerConfig,

    pub retry_config: RetryConfig,

    /// Shared outbound client; reqwest pools connections per host.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        registry: ModelRegistry,
        memory: MemoryBlock,
        memory_path: PathBuf,
        sessions: SessionStore,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            memory: Arc::new(RwLock::new(memory)),
            memory_path: Arc::new(memory_path),
            sessions: Arc::new(sessions),
            breakers: CircuitBreakerRegistry::new(),
            breaker_config: CircuitBreakerConfig::default(),
            retry_config: RetryConfig::default(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Share an already-built outbound client (e.g. the one used for
    /// startup discovery).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }
}

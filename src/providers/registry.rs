//! Registry of per-model circuit breakers.
//!
//! Breakers must persist across requests to accumulate failure history, so
//! they live in a process-wide map keyed by the model token the client
//! used. Breakers are created lazily on first use and never removed.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use super::circuit_breaker::CircuitBreaker;
use crate::config::CircuitBreakerConfig;

/// Thread-safe, cheaply clonable map of model key to breaker.
#[derive(Clone, Default)]
pub struct CircuitBreakerRegistry {
    breakers: Arc<RwLock<HashMap<String, Arc<CircuitBreaker>>>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the breaker for a model, installing a fresh one on first use.
    pub fn get_or_create(&self, model: &str, config: &CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        {
            let breakers = self.breakers.read();
            if let Some(breaker) = breakers.get(model) {
                return breaker.clone();
            }
        }

        let mut breakers = self.breakers.write();
        // Double-check after taking the write lock.
        if let Some(breaker) = breakers.get(model) {
            return breaker.clone();
        }

        let breaker = Arc::new(CircuitBreaker::new(model, config));
        breakers.insert(model.to_string(), breaker.clone());
        breaker
    }

    /// Snapshot of all installed breakers, for the health endpoint.
    pub fn snapshot(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers.read().values().cloned().collect()
    }
}

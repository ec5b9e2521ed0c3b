//! File-backed session store.
//!
//! A session is a ring of the most recent turns for one (model, session id)
//! pair, stored as `<dir>/<model>-<session_id>.json`. Loads never fail:
//! missing or corrupt files come back as an empty session. Saves are
//! best-effort and log on error.
//!
//! Concurrent requests for the same session serialise their
//! read-modify-write through a per-key async mutex, so an interleaving
//! cannot drop a turn.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api_types::ChatMessage;

/// Maximum turns kept per session; oldest are discarded on overflow.
pub const MAX_TURNS: usize = 20;

/// Persisted conversation history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl Session {
    /// Append a turn, enforcing the ring cap.
    pub fn push(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.history.push(ChatMessage::new(role, content));
        if self.history.len() > MAX_TURNS {
            let excess = self.history.len() - MAX_TURNS;
            self.history.drain(..excess);
        }
    }
}

/// Store of session files under one directory.
pub struct SessionStore {
    dir: PathBuf,
    locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Keep file names inside the store directory: anything outside
/// `[A-Za-z0-9._-]` becomes `-`.
fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn file_path(&self, model: &str, session_id: &str) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.json",
            sanitize_component(model),
            sanitize_component(session_id)
        ))
    }

    fn key_lock(&self, model: &str, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let key = format!("{model}\u{0}{session_id}");
        let mut locks = self.locks.lock();
        locks.entry(key).or_default().clone()
    }

    /// Load a session. Empty session id, missing file, or a parse error all
    /// yield an empty session.
    pub fn load(&self, model: &str, session_id: &str) -> Session {
        if session_id.is_empty() {
            return Session::default();
        }
        let path = self.file_path(model, session_id);
        match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_default(),
            Err(_) => Session::default(),
        }
    }

    /// Write a session back to disk. Empty session id is a no-op; I/O
    /// failures are logged, not raised.
    pub fn save(&self, model: &str, session_id: &str, session: &Session) {
        if session_id.is_empty() {
            return;
        }
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            warn!(error = %err, "could not create session directory");
            return;
        }
        let path = self.file_path(model, session_id);
        let data = match serde_json::to_vec(session) {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, "could not serialize session");
                return;
            }
        };
        if let Err(err) = std::fs::write(&path, data) {
            warn!(path = %path.display(), error = %err, "could not save session");
        }
    }

    /// Record one user/assistant exchange. Loads fresh under the per-key
    /// lock so concurrent writers to the same session cannot lose turns.
    pub async fn append_exchange(
        &self,
        model: &str,
        session_id: &str,
        user_prompt: &str,
        assistant_reply: &str,
    ) {
        if session_id.is_empty() {
            return;
        }

        let lock = self.key_lock(model, session_id);
        let _guard = lock.lock().await;

        let mut session = self.load(model, session_id);
        session.push("user", user_prompt);
        session.push("assistant", assistant_reply);
        self.save(model, session_id, &session);
    }
}

//! In-memory conversation sessions: `Turn`, `ConnId`, and `SessionStore`.
//!
//! Every open WebSocket owns exactly one history entry in the store.
//! Nothing is written to disk; an entry lives from connection open to
//! connection close and is dropped with it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

// ── Turn ─────────────────────────────────────────────────────

/// One utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum Turn {
    User(String),
    Assistant(String),
}

impl Turn {
    /// OpenAI chat role for this turn.
    pub fn role(&self) -> &'static str {
        match self {
            Turn::User(_) => "user",
            Turn::Assistant(_) => "assistant",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Turn::User(t) | Turn::Assistant(t) => t,
        }
    }
}

// ── ConnId ───────────────────────────────────────────────────

/// Opaque identity of one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "{}", &self.0.simple().to_string()[..12])
    }
}

// ── SessionStore ─────────────────────────────────────────────

/// Process-wide map from connection to its conversation history.
///
/// Cloning yields another handle to the same map.  Locks are held only
/// for the duration of a single operation and never across `.await`,
/// so handlers for different connections never wait on each other for
/// longer than a map insert or remove.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<ConnId, Vec<Turn>>>>,
    /// Maximum turns kept per history.  `None` means unbounded.
    max_turns: Option<usize>,
}

impl SessionStore {
    /// Create an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that keeps at most `max_turns` turns per history,
    /// dropping the oldest first.  `None` disables the cap.
    pub fn with_max_turns(max_turns: Option<usize>) -> Self {
        Self {
            inner: Arc::default(),
            max_turns,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConnId, Vec<Turn>>> {
        // A poisoned lock only means another handler panicked mid-insert;
        // the map itself is still structurally valid.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnId, Vec<Turn>>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an empty history for `id`.  An existing history is kept.
    pub fn create(&self, id: ConnId) {
        self.write().entry(id).or_default();
        debug!(conn = %id, "session created");
    }

    /// Append `turns` to the history of `id`.
    ///
    /// Returns `false` when no session exists for `id` (the connection
    /// already closed), in which case nothing is recorded.
    pub fn append(&self, id: ConnId, turns: impl IntoIterator<Item = Turn>) -> bool {
        let mut map = self.write();
        let Some(history) = map.get_mut(&id) else {
            return false;
        };
        history.extend(turns);
        if let Some(max) = self.max_turns {
            if history.len() > max {
                let excess = history.len() - max;
                history.drain(..excess);
            }
        }
        true
    }

    /// Snapshot of the history for `id`.
    pub fn get(&self, id: ConnId) -> Option<Vec<Turn>> {
        self.read().get(&id).cloned()
    }

    /// Remove the session for `id`.  Returns whether an entry existed.
    pub fn remove(&self, id: ConnId) -> bool {
        let removed = self.write().remove(&id).is_some();
        if removed {
            debug!(conn = %id, "session removed");
        }
        removed
    }

    /// Copy of every live session.
    pub fn snapshot(&self) -> Vec<(ConnId, Vec<Turn>)> {
        self.read()
            .iter()
            .map(|(id, history)| (*id, history.clone()))
            .collect()
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.read().contains_key(&id)
    }

    /// Number of live sessions (equals the number of open connections).
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Create the session for `id` and return a guard that removes it
    /// when dropped, whichever way the owning task ends.
    pub fn open(&self, id: ConnId) -> SessionGuard {
        self.create(id);
        SessionGuard {
            store: self.clone(),
            id,
        }
    }
}

/// Owns a session entry for the lifetime of one connection.
pub struct SessionGuard {
    store: SessionStore,
    id: ConnId,
}

impl SessionGuard {
    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn history(&self) -> Vec<Turn> {
        self.store.get(self.id).unwrap_or_default()
    }

    pub fn append(&self, turns: impl IntoIterator<Item = Turn>) -> bool {
        self.store.append(self.id, turns)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.store.remove(self.id);
    }
}

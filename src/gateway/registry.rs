//! Registry of automation sessions currently believed open.
//!
//! The registry is an injected, thread-safe keyed store exposing insert and
//! snapshot-read only. Entries are never removed when a session's connection
//! closes — the listing reflects sessions *started*, matching the observed
//! lifecycle of the service this fronts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::fingerprint::FingerprintDescriptor;

/// One recorded session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEntry {
    /// The session's unique identifier.
    pub session_id: String,
    /// User agent the session presents.
    pub user_agent: String,
    /// When the session was recorded.
    pub created_at: DateTime<Utc>,
}

/// Concurrent session store shared across gateway handlers.
#[derive(Debug, Clone, Default)]
pub struct ActiveSessionRegistry {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl ActiveSessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a session for the descriptor. Session identifiers are unique
    /// for the registry's lifetime, so an insert never displaces an entry in
    /// practice.
    pub fn insert(&self, descriptor: &FingerprintDescriptor) {
        let entry = SessionEntry {
            session_id: descriptor.session_id.clone(),
            user_agent: descriptor.user_agent().to_string(),
            created_at: Utc::now(),
        };
        self.inner.write().insert(entry.session_id.clone(), entry);
    }

    /// A point-in-time copy of all recorded sessions, oldest first.
    pub fn snapshot(&self) -> Vec<SessionEntry> {
        let mut entries: Vec<SessionEntry> = self.inner.read().values().cloned().collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        entries
    }

    /// Number of recorded sessions.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether any session has been recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

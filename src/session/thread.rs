//! Conversation thread and session storage.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::llm::Content;

/// Length of generated session identifiers.
///
/// 62^12 possible ids. Generation does not check for an existing entry, so a
/// collision replaces the older session.
pub const SESSION_ID_LEN: usize = 12;

/// A single conversational context.
///
/// Holds the ordered turn history that is replayed to the provider on every
/// follow-up. Sessions are plain values; the [`SessionStore`] decides who may
/// mutate one and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    history: Vec<Content>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            history: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Turns so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Append one completed exchange.
    pub fn record_exchange(&mut self, user: Content, model: Content) {
        self.history.push(user);
        self.history.push(model);
        self.last_activity = Utc::now();
    }

    /// Number of user/model exchanges recorded.
    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.history.len() / 2
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }
}

type SessionSlot = Arc<Mutex<Session>>;

/// Thread-safe store for sessions.
///
/// The id map sits behind an `RwLock`; every session sits behind its own
/// `Mutex`, so callers that [`checkout`](Self::checkout) a session serialize
/// with each other per key without blocking unrelated sessions. Nothing is
/// evicted and nothing survives a restart.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Generate a fresh session identifier.
    ///
    /// The id is not reserved; it takes effect on [`put`](Self::put).
    #[must_use]
    pub fn create(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect()
    }

    /// Get a snapshot of a session by ID.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let slot = self.slot(id).await?;
        let session = slot.lock().await.clone();
        Some(session)
    }

    /// Store a session under `id`, replacing whatever was there.
    pub async fn put(&self, id: impl Into<String>, session: Session) {
        let id = id.into();
        if let Some(slot) = self.slot(&id).await {
            *slot.lock().await = session;
            return;
        }
        let mut guard = self.inner.sessions.write().await;
        guard.insert(id, Arc::new(Mutex::new(session)));
    }

    /// Take exclusive hold of a session for a read-modify-write cycle.
    ///
    /// Writes through the returned guard are the stored session; dropping the
    /// guard releases the next waiter on the same id.
    pub async fn checkout(&self, id: &str) -> Option<OwnedMutexGuard<Session>> {
        let slot = self.slot(id).await?;
        Some(slot.lock_owned().await)
    }

    /// Get the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Check if there are no sessions.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn slot(&self, id: &str) -> Option<SessionSlot> {
        let guard = self.inner.sessions.read().await;
        guard.get(id).cloned()
    }
}

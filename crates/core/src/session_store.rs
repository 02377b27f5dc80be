//! Session Store
//!
//! Maps a session identifier to its conversation history. The trait is the
//! seam for alternate backings (an external cache, for example); the
//! in-memory implementation lives for the process lifetime and never evicts.

use crate::{
    error::SessionStoreError,
    turn::{History, SessionId, Turn},
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored history, or `None` for a session never written.
    async fn get(&self, id: &SessionId) -> Result<Option<History>, SessionStoreError>;

    /// Unconditionally replaces the history of `id`.
    async fn put(&self, id: &SessionId, history: History) -> Result<(), SessionStoreError>;

    /// Replaces the history of `id` with `new` only if the current value
    /// equals `expected` (an absent session equals an empty history).
    ///
    /// Returns `false` without writing when the current value differs.
    async fn compare_and_swap(
        &self,
        id: &SessionId,
        expected: &[Turn],
        new: History,
    ) -> Result<bool, SessionStoreError>;
}

/// Process-wide, unbounded in-memory store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, History>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<History>, SessionStoreError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn put(&self, id: &SessionId, history: History) -> Result<(), SessionStoreError> {
        self.sessions.write().await.insert(id.clone(), history);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        id: &SessionId,
        expected: &[Turn],
        new: History,
    ) -> Result<bool, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let current = sessions.get(id).map(Vec::as_slice).unwrap_or(&[]);
        if current != expected {
            return Ok(false);
        }
        sessions.insert(id.clone(), new);
        Ok(true)
    }
}

//! Conversation Adapter
//!
//! Wraps the language model and owns every write to the session store. A
//! turn reads the session's history, asks the model for a reply, and commits
//! the history extended by the user and assistant turns. Nothing is written
//! unless the model call succeeds.
//!
//! Turns for the same session are serialized by a per-session async lock, so
//! concurrent requests on one session cannot lose each other's updates. The
//! commit itself goes through `compare_and_swap` so a store shared with other
//! writers still refuses a stale update.

use crate::{
    error::ConversationError,
    llm_client::LLMClient,
    session_store::SessionStore,
    turn::{SessionId, Turn},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

pub struct ConversationAdapter {
    llm: Arc<dyn LLMClient>,
    store: Arc<dyn SessionStore>,
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl ConversationAdapter {
    pub fn new(llm: Arc<dyn LLMClient>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            llm,
            store,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn session_lock(&self, session_id: &SessionId) -> Arc<Mutex<()>> {
        self.session_locks
            .lock()
            .await
            .entry(session_id.clone())
            .or_default()
            .clone()
    }

    /// Produces the next assistant utterance for `session_id`.
    ///
    /// A session that has never been seen starts with an empty history.
    #[instrument(name = "converse", skip_all, fields(session_id = %session_id))]
    pub async fn converse(
        &self,
        session_id: &SessionId,
        user_text: &str,
    ) -> Result<String, ConversationError> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let prior = self.store.get(session_id).await?.unwrap_or_default();
        debug!(prior_turns = prior.len(), "Loaded session history");

        let reply = self.llm.reply(&prior, user_text).await?;

        let mut updated = Vec::with_capacity(prior.len() + 2);
        updated.extend_from_slice(&prior);
        updated.push(Turn::user(user_text));
        updated.push(Turn::assistant(reply.clone()));

        if !self
            .store
            .compare_and_swap(session_id, &prior, updated)
            .await?
        {
            warn!("Session history changed during the model call; discarding this turn");
            return Err(ConversationError::Conflict);
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionStoreError;
    use crate::llm_client::MockLLMClient;
    use crate::session_store::{InMemorySessionStore, MockSessionStore};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn sid(s: &str) -> SessionId {
        SessionId::try_from(s).unwrap()
    }

    #[tokio::test]
    async fn test_first_turn_starts_from_empty_history() {
        let mut llm = MockLLMClient::new();
        llm.expect_reply()
            .withf(|history, text| {
                history.is_empty() && text.to_string() == "What is the weather today?"
            })
            .times(1)
            .returning(|_, _| Ok("I don't have real-time weather access.".to_string()));

        let store = Arc::new(InMemorySessionStore::new());
        let adapter = ConversationAdapter::new(Arc::new(llm), store.clone());

        let reply = adapter
            .converse(&sid("new-session"), "What is the weather today?")
            .await
            .unwrap();

        assert_eq!(reply, "I don't have real-time weather access.");
        assert_eq!(
            store.get(&sid("new-session")).await.unwrap().unwrap(),
            vec![
                Turn::user("What is the weather today?"),
                Turn::assistant("I don't have real-time weather access."),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_turn_receives_first_exchange() {
        let mut llm = MockLLMClient::new();
        let mut seq = mockall::Sequence::new();
        llm.expect_reply()
            .withf(|history, _| history.is_empty())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("Paris.".to_string()));
        llm.expect_reply()
            .withf(|history, text| {
                history.to_vec()
                    == vec![Turn::user("Capital of France?"), Turn::assistant("Paris.")]
                    && text.to_string() == "And of Italy?"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("Rome.".to_string()));

        let store = Arc::new(InMemorySessionStore::new());
        let adapter = ConversationAdapter::new(Arc::new(llm), store.clone());
        let id = sid("geo");

        adapter.converse(&id, "Capital of France?").await.unwrap();
        let reply = adapter.converse(&id, "And of Italy?").await.unwrap();

        assert_eq!(reply, "Rome.");
        assert_eq!(store.get(&id).await.unwrap().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_model_call_leaves_history_untouched() {
        let mut llm = MockLLMClient::new();
        llm.expect_reply()
            .returning(|_, _| Err(ConversationError::EmptyReply));

        let store = Arc::new(InMemorySessionStore::new());
        let id = sid("stable");
        let before = vec![Turn::user("hi"), Turn::assistant("hello")];
        store.put(&id, before.clone()).await.unwrap();

        let adapter = ConversationAdapter::new(Arc::new(llm), store.clone());
        let err = adapter.converse(&id, "again").await.unwrap_err();

        assert!(matches!(err, ConversationError::EmptyReply));
        assert_eq!(store.get(&id).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_store_read_failure_skips_model_call() {
        let mut llm = MockLLMClient::new();
        llm.expect_reply().times(0);

        let mut store = MockSessionStore::new();
        store
            .expect_get()
            .returning(|_| Err(SessionStoreError::Backend("connection refused".to_string())));

        let adapter = ConversationAdapter::new(Arc::new(llm), Arc::new(store));
        let err = adapter.converse(&sid("s"), "hello").await.unwrap_err();
        assert!(matches!(err, ConversationError::Store(_)));
    }

    #[tokio::test]
    async fn test_lost_swap_is_conflict() {
        let mut llm = MockLLMClient::new();
        llm.expect_reply().returning(|_, _| Ok("reply".to_string()));

        let mut store = MockSessionStore::new();
        store.expect_get().returning(|_| Ok(None));
        store
            .expect_compare_and_swap()
            .times(1)
            .returning(|_, _, _| Ok(false));
        store.expect_put().times(0);

        let adapter = ConversationAdapter::new(Arc::new(llm), Arc::new(store));
        let err = adapter.converse(&sid("s"), "hello").await.unwrap_err();
        assert!(matches!(err, ConversationError::Conflict));
    }

    /// Records the history length each call observed and answers slowly.
    struct SlowEcho {
        seen: StdMutex<Vec<usize>>,
    }

    #[async_trait]
    impl LLMClient for SlowEcho {
        async fn reply(
            &self,
            history: &[Turn],
            user_text: &str,
        ) -> Result<String, ConversationError> {
            self.seen.lock().unwrap().push(history.len());
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(format!("echo: {}", user_text))
        }
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_session_are_serialized() {
        let llm = Arc::new(SlowEcho {
            seen: StdMutex::new(Vec::new()),
        });
        let store = Arc::new(InMemorySessionStore::new());
        let adapter = Arc::new(ConversationAdapter::new(llm.clone(), store.clone()));
        let id = sid("shared");

        let a = {
            let adapter = adapter.clone();
            let id = id.clone();
            tokio::spawn(async move { adapter.converse(&id, "one").await })
        };
        let b = {
            let adapter = adapter.clone();
            let id = id.clone();
            tokio::spawn(async move { adapter.converse(&id, "two").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let mut seen = llm.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![0, 2]);
        assert_eq!(store.get(&id).await.unwrap().unwrap().len(), 4);
    }
}

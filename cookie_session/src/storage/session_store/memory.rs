use async_trait::async_trait;
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use crate::session::Session;
use crate::storage::errors::StorageError;

use super::types::{InMemorySessionStore, SessionIndex, SessionStore};

impl InMemorySessionStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session store");
        Self {
            inner: Mutex::new(SessionIndex::default()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIndex {
    fn insert(&mut self, session: Session) {
        self.user_sessions
            .entry(session.user_id().to_string())
            .or_default()
            .push(session.token().to_string());
        self.sessions.insert(session.token().to_string(), session);
    }

    fn remove_token(&mut self, user_id: &str, token: &str) -> bool {
        let removed = self.sessions.remove(token).is_some();
        if let Some(tokens) = self.user_sessions.get_mut(user_id) {
            tokens.retain(|t| t != token);
            if tokens.is_empty() {
                self.user_sessions.remove(user_id);
            }
        }
        removed
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn store_session(&self, session: Session) -> Result<(), StorageError> {
        let mut index = self.inner.lock().await;
        index.insert(session);
        Ok(())
    }

    async fn replace_session(&self, old: &Session, new: Session) -> Result<(), StorageError> {
        let mut index = self.inner.lock().await;
        if !index.remove_token(old.user_id(), old.token()) {
            // Another request already rotated this session; last write wins.
            tracing::debug!(
                "Replaced session for user {} was already retired",
                old.user_id()
            );
        }
        index.insert(new);
        Ok(())
    }

    async fn delete_sessions(&self, user_id: &str) -> Result<(), StorageError> {
        let mut index = self.inner.lock().await;
        if let Some(tokens) = index.user_sessions.remove(user_id) {
            for token in tokens {
                index.sessions.remove(&token);
            }
        }
        Ok(())
    }

    async fn verify_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StorageError> {
        let index = self.inner.lock().await;
        Ok(index
            .sessions
            .get(token)
            .filter(|session| session.is_live(now))
            .cloned())
    }

    async fn verify_csrf_token(
        &self,
        user_id: &str,
        csrf_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        if csrf_token.is_empty() {
            return Ok(false);
        }
        let index = self.inner.lock().await;
        let Some(tokens) = index.user_sessions.get(user_id) else {
            return Ok(false);
        };
        Ok(tokens
            .iter()
            .filter_map(|token| index.sessions.get(token))
            .any(|session| {
                session.is_live(now)
                    && bool::from(session.csrf_token().as_bytes().ct_eq(csrf_token.as_bytes()))
            }))
    }

    async fn gc(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut index = self.inner.lock().await;
        let before = index.sessions.len();
        index.sessions.retain(|_, session| session.is_live(now));
        let SessionIndex {
            sessions,
            user_sessions,
        } = &mut *index;
        user_sessions.retain(|_, tokens| {
            tokens.retain(|token| sessions.contains_key(token));
            !tokens.is_empty()
        });
        Ok((before - index.sessions.len()) as u64)
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::session::Session;
use crate::storage::data_store::DataStore;
use crate::storage::errors::StorageError;

/// Single-process store: both indexes live behind one lock.
pub struct InMemorySessionStore {
    pub(super) inner: Mutex<SessionIndex>,
}

#[derive(Default)]
pub(super) struct SessionIndex {
    /// token -> session
    pub(super) sessions: HashMap<String, Session>,
    /// user_id -> tokens
    pub(super) user_sessions: HashMap<String, Vec<String>>,
}

/// Durable store over a SQLite or PostgreSQL table.
pub struct DbSessionStore {
    pub(super) data_store: Box<dyn DataStore>,
    pub(super) table: String,
}

// Trait
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Insert a newly issued session.
    async fn store_session(&self, session: Session) -> Result<(), StorageError>;

    /// Retire `old` and install `new` in one atomic step.
    async fn replace_session(&self, old: &Session, new: Session) -> Result<(), StorageError>;

    /// Remove every session owned by `user_id`.
    async fn delete_sessions(&self, user_id: &str) -> Result<(), StorageError>;

    /// Look up a live session by token. `None` when absent or expired at `now`.
    async fn verify_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StorageError>;

    /// True when a live session of `user_id` carries exactly `csrf_token`.
    async fn verify_csrf_token(
        &self,
        user_id: &str,
        csrf_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Remove sessions with `expires_at <= now`, returning how many went.
    async fn gc(&self, now: DateTime<Utc>) -> Result<u64, StorageError>;
}

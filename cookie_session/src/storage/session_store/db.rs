use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::session::Session;
use crate::storage::data_store::{DataStore, connect_data_store};
use crate::storage::errors::StorageError;

use super::postgres::*;
use super::sqlite::*;
use super::types::{DbSessionStore, SessionStore};

pub(super) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(super) fn from_millis(millis: i64) -> Result<DateTime<Utc>, StorageError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StorageError::Storage(format!("Invalid expires_at value: {millis}")))
}

impl DbSessionStore {
    pub fn new(data_store: Box<dyn DataStore>, table: impl Into<String>) -> Self {
        Self {
            data_store,
            table: table.into(),
        }
    }

    /// Open a pool for `store_type` ("sqlite" or "postgres") and bind it to `table`.
    pub fn connect(
        store_type: &str,
        store_url: &str,
        table: impl Into<String>,
    ) -> Result<Self, StorageError> {
        Ok(Self::new(connect_data_store(store_type, store_url)?, table))
    }

    /// Create the session table if needed and check its schema.
    pub async fn init(&self) -> Result<(), StorageError> {
        let table = self.table.as_str();
        match (self.data_store.as_sqlite(), self.data_store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool, table).await?;
                validate_session_table_sqlite(pool, table).await?;
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool, table).await?;
                validate_session_table_postgres(pool, table).await?;
            }
            _ => {
                return Err(StorageError::Config(
                    "Unsupported database type".to_string(),
                ));
            }
        }
        tracing::info!("Session table {} ready", table);
        Ok(())
    }

    fn unsupported() -> StorageError {
        StorageError::Config("Unsupported database type".to_string())
    }
}

#[async_trait]
impl SessionStore for DbSessionStore {
    async fn store_session(&self, session: Session) -> Result<(), StorageError> {
        if let Some(pool) = self.data_store.as_sqlite() {
            insert_session_sqlite(pool, &self.table, &session).await
        } else if let Some(pool) = self.data_store.as_postgres() {
            insert_session_postgres(pool, &self.table, &session).await
        } else {
            Err(Self::unsupported())
        }
    }

    async fn replace_session(&self, old: &Session, new: Session) -> Result<(), StorageError> {
        if let Some(pool) = self.data_store.as_sqlite() {
            replace_session_sqlite(pool, &self.table, old, &new).await
        } else if let Some(pool) = self.data_store.as_postgres() {
            replace_session_postgres(pool, &self.table, old, &new).await
        } else {
            Err(Self::unsupported())
        }
    }

    async fn delete_sessions(&self, user_id: &str) -> Result<(), StorageError> {
        if let Some(pool) = self.data_store.as_sqlite() {
            delete_sessions_by_user_sqlite(pool, &self.table, user_id).await
        } else if let Some(pool) = self.data_store.as_postgres() {
            delete_sessions_by_user_postgres(pool, &self.table, user_id).await
        } else {
            Err(Self::unsupported())
        }
    }

    async fn verify_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StorageError> {
        if let Some(pool) = self.data_store.as_sqlite() {
            get_live_session_sqlite(pool, &self.table, token, now).await
        } else if let Some(pool) = self.data_store.as_postgres() {
            get_live_session_postgres(pool, &self.table, token, now).await
        } else {
            Err(Self::unsupported())
        }
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
        if let Some(pool) = self.data_store.as_sqlite() {
            has_live_csrf_token_sqlite(pool, &self.table, user_id, csrf_token, now).await
        } else if let Some(pool) = self.data_store.as_postgres() {
            has_live_csrf_token_postgres(pool, &self.table, user_id, csrf_token, now).await
        } else {
            Err(Self::unsupported())
        }
    }

    async fn gc(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        if let Some(pool) = self.data_store.as_sqlite() {
            delete_expired_sqlite(pool, &self.table, now).await
        } else if let Some(pool) = self.data_store.as_postgres() {
            delete_expired_postgres(pool, &self.table, now).await
        } else {
            Err(Self::unsupported())
        }
    }
}

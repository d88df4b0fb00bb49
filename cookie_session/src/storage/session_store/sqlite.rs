use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

use crate::session::Session;
use crate::storage::errors::StorageError;
use crate::storage::schema_validation::validate_sqlite_table_schema;

use super::db::{from_millis, to_millis};

// SQLite implementations
pub(super) async fn create_tables_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
) -> Result<(), StorageError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            token TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            csrf_token TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    // Logout and CSRF checks look sessions up by user
    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{}_user_id ON {}(user_id)
        "#,
        table.replace(".", "_"),
        table
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn validate_session_table_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
) -> Result<(), StorageError> {
    let expected_columns = [
        ("token", "TEXT"),
        ("user_id", "TEXT"),
        ("csrf_token", "TEXT"),
        ("expires_at", "INTEGER"),
    ];

    validate_sqlite_table_schema(pool, table, &expected_columns, StorageError::Config).await
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session, StorageError> {
    let expires_at: i64 = row.try_get("expires_at")?;
    Ok(Session::new(
        row.try_get::<String, _>("user_id")?,
        row.try_get::<String, _>("token")?,
        row.try_get::<String, _>("csrf_token")?,
        from_millis(expires_at)?,
    ))
}

pub(super) async fn insert_session_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    session: &Session,
) -> Result<(), StorageError> {
    sqlx::query(&format!(
        "INSERT INTO {table} (token, user_id, csrf_token, expires_at) VALUES (?, ?, ?, ?)"
    ))
    .bind(session.token())
    .bind(session.user_id())
    .bind(session.csrf_token())
    .bind(to_millis(session.expires_at()))
    .execute(pool)
    .await?;
    Ok(())
}

pub(super) async fn replace_session_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    old: &Session,
    new: &Session,
) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;

    let retired = sqlx::query(&format!("DELETE FROM {table} WHERE token = ?"))
        .bind(old.token())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if retired == 0 {
        tracing::debug!(
            "Replaced session for user {} was already retired",
            old.user_id()
        );
    }

    sqlx::query(&format!(
        "INSERT INTO {table} (token, user_id, csrf_token, expires_at) VALUES (?, ?, ?, ?)"
    ))
    .bind(new.token())
    .bind(new.user_id())
    .bind(new.csrf_token())
    .bind(to_millis(new.expires_at()))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

pub(super) async fn delete_sessions_by_user_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    user_id: &str,
) -> Result<(), StorageError> {
    sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?"))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(super) async fn get_live_session_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>, StorageError> {
    let row = sqlx::query(&format!(
        "SELECT token, user_id, csrf_token, expires_at FROM {table} WHERE token = ? AND expires_at > ?"
    ))
    .bind(token)
    .bind(to_millis(now))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_session).transpose()
}

pub(super) async fn has_live_csrf_token_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    user_id: &str,
    csrf_token: &str,
    now: DateTime<Utc>,
) -> Result<bool, StorageError> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE user_id = ? AND csrf_token = ? AND expires_at > ?"
    ))
    .bind(user_id)
    .bind(csrf_token)
    .bind(to_millis(now))
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub(super) async fn delete_expired_sqlite(
    pool: &Pool<Sqlite>,
    table: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE expires_at <= ?"))
        .bind(to_millis(now))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

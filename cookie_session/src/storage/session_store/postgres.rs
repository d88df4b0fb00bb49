use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::session::Session;
use crate::storage::errors::StorageError;
use crate::storage::schema_validation::validate_postgres_table_schema;

use super::db::{from_millis, to_millis};

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(
    pool: &Pool<Postgres>,
    table: &str,
) -> Result<(), StorageError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            token TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            csrf_token TEXT NOT NULL,
            expires_at BIGINT NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

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

pub(super) async fn validate_session_table_postgres(
    pool: &Pool<Postgres>,
    table: &str,
) -> Result<(), StorageError> {
    let expected_columns = [
        ("token", "text"),
        ("user_id", "text"),
        ("csrf_token", "text"),
        ("expires_at", "bigint"),
    ];

    validate_postgres_table_schema(pool, table, &expected_columns, StorageError::Config).await
}

fn row_to_session(row: &sqlx::postgres::PgRow) -> Result<Session, StorageError> {
    let expires_at: i64 = row.try_get("expires_at")?;
    Ok(Session::new(
        row.try_get::<String, _>("user_id")?,
        row.try_get::<String, _>("token")?,
        row.try_get::<String, _>("csrf_token")?,
        from_millis(expires_at)?,
    ))
}

pub(super) async fn insert_session_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    session: &Session,
) -> Result<(), StorageError> {
    sqlx::query(&format!(
        "INSERT INTO {table} (token, user_id, csrf_token, expires_at) VALUES ($1, $2, $3, $4)"
    ))
    .bind(session.token())
    .bind(session.user_id())
    .bind(session.csrf_token())
    .bind(to_millis(session.expires_at()))
    .execute(pool)
    .await?;
    Ok(())
}

pub(super) async fn replace_session_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    old: &Session,
    new: &Session,
) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;

    let retired = sqlx::query(&format!("DELETE FROM {table} WHERE token = $1"))
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
        "INSERT INTO {table} (token, user_id, csrf_token, expires_at) VALUES ($1, $2, $3, $4)"
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

pub(super) async fn delete_sessions_by_user_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    user_id: &str,
) -> Result<(), StorageError> {
    sqlx::query(&format!("DELETE FROM {table} WHERE user_id = $1"))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(super) async fn get_live_session_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>, StorageError> {
    let row = sqlx::query(&format!(
        "SELECT token, user_id, csrf_token, expires_at FROM {table} WHERE token = $1 AND expires_at > $2"
    ))
    .bind(token)
    .bind(to_millis(now))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_session).transpose()
}

pub(super) async fn has_live_csrf_token_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    user_id: &str,
    csrf_token: &str,
    now: DateTime<Utc>,
) -> Result<bool, StorageError> {
    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE user_id = $1 AND csrf_token = $2 AND expires_at > $3)"
    ))
    .bind(user_id)
    .bind(csrf_token)
    .bind(to_millis(now))
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

pub(super) async fn delete_expired_postgres(
    pool: &Pool<Postgres>,
    table: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE expires_at <= $1"))
        .bind(to_millis(now))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

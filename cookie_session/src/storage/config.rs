//! Database table configuration

use std::env;
use std::sync::LazyLock;

/// Table prefix from environment variable
pub static DB_TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("DB_TABLE_PREFIX").unwrap_or_else(|_| "cs_".to_string()));

/// Access-tier sessions table name
pub static DB_TABLE_ACCESS_SESSIONS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_ACCESS_SESSIONS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "access_sessions"))
});

/// Refresh-tier sessions table name
pub static DB_TABLE_REFRESH_SESSIONS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_REFRESH_SESSIONS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "refresh_sessions"))
});

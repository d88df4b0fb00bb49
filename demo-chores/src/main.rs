use std::sync::Arc;
use std::time::Duration;

use cookie_session_axum::cookie_session::{
    AUTH_GC_INTERVAL, AuthConfig, DB_TABLE_REFRESH_SESSIONS, DbSessionStore,
    InMemorySessionStore, spawn_gc_task,
};
use cookie_session_axum::session_router;

mod chores;
mod provider;
mod server;

use crate::{
    provider::PasswordProvider,
    server::{init_tracing, serve_http},
};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing(env!("CARGO_CRATE_NAME"));

    let provider = PasswordProvider::from_env()?;

    // Access sessions are short-lived and stay in memory; refresh sessions
    // must survive a restart.
    let refresh_store = DbSessionStore::connect(
        &env_or("SESSION_DATA_STORE_TYPE", "sqlite"),
        &env_or("SESSION_DATA_STORE_URL", "sqlite:./sessions.db"),
        DB_TABLE_REFRESH_SESSIONS.as_str(),
    )?;
    refresh_store.init().await?;

    let config = AuthConfig::from_env(
        Arc::new(provider),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(refresh_store),
    );
    config.validate()?;

    let _gc = spawn_gc_task(config.clone(), Duration::from_secs(*AUTH_GC_INTERVAL));

    let config = Arc::new(config);
    let app = chores::router(config.clone()).merge(session_router(config));

    let port = env_or("PORT", "3001").parse::<u16>()?;
    serve_http(port, app).await?;
    Ok(())
}

//! Test utilities for session module tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

use crate::session::config::{AuthConfig, CookieConfig};
use crate::session::resume::ResumeTickets;
use crate::session::types::{AuthProvider, LoginRequest, ProviderError};
use crate::session::types::Session;
use crate::storage::{InMemorySessionStore, SessionStore, StorageError};

pub(crate) const TEST_PASSWORD: &str = "correct horse";

/// Accepts any username together with `TEST_PASSWORD`.
pub(crate) struct StubProvider;

#[async_trait]
impl AuthProvider for StubProvider {
    async fn authenticate_user(&self, request: &LoginRequest) -> Result<String, ProviderError> {
        match (
            request.form_value("username"),
            request.form_value("password"),
        ) {
            (Some(user), Some(TEST_PASSWORD)) => Ok(user.to_string()),
            _ => Err(ProviderError::InvalidCredentials),
        }
    }
}

/// Default configuration over fresh in-memory stores, independent of the environment.
pub(crate) fn memory_config() -> AuthConfig {
    AuthConfig {
        sessions_path: "/sessions".to_string(),
        redirect_param: "redirect".to_string(),
        csrf_field_name: "csrf_token".to_string(),
        resume_ticket_param: "csrf_ticket".to_string(),
        remember_me_field: "rememberMe".to_string(),
        unauthorized_redirect: "/login".to_string(),
        login_failed_redirect: "/login".to_string(),
        default_login_success_redirect: "/".to_string(),
        default_logout_redirect: "/login".to_string(),
        access: CookieConfig::new(
            "access_session",
            Duration::minutes(30),
            Duration::minutes(5),
            32,
            Arc::new(InMemorySessionStore::new()),
        ),
        refresh: CookieConfig::new(
            "refresh_session",
            Duration::days(30),
            Duration::days(1),
            64,
            Arc::new(InMemorySessionStore::new()),
        ),
        provider: Arc::new(StubProvider),
        resume_tickets: Arc::new(ResumeTickets::new(Duration::seconds(60))),
    }
}

/// Store whose every operation fails, as a lost database connection would.
pub(crate) struct FailingStore;

fn unavailable() -> StorageError {
    StorageError::Storage("database unavailable".to_string())
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn store_session(&self, _session: Session) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn replace_session(&self, _old: &Session, _new: Session) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn delete_sessions(&self, _user_id: &str) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn verify_session(
        &self,
        _token: &str,
        _now: DateTime<Utc>,
    ) -> Result<Option<Session>, StorageError> {
        Err(unavailable())
    }

    async fn verify_csrf_token(
        &self,
        _user_id: &str,
        _csrf_token: &str,
        _now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Err(unavailable())
    }

    async fn gc(&self, _now: DateTime<Utc>) -> Result<u64, StorageError> {
        Err(unavailable())
    }
}

/// `memory_config` with both tiers backed by [`FailingStore`].
pub(crate) fn failing_config() -> AuthConfig {
    let mut config = memory_config();
    config.access.store = Arc::new(FailingStore);
    config.refresh.store = Arc::new(FailingStore);
    config
}

/// Cookies set (not deleted) by a response, by name.
pub(crate) fn session_cookie_values(headers: &HeaderMap) -> HashMap<String, String> {
    set_cookies(headers)
        .into_iter()
        .filter(|(_, value, max_age)| !value.is_empty() && *max_age != "0")
        .map(|(name, value, _)| (name, value))
        .collect()
}

/// Names of cookies a response deletes.
pub(crate) fn deleted_cookie_names(headers: &HeaderMap) -> Vec<String> {
    set_cookies(headers)
        .into_iter()
        .filter(|(_, value, max_age)| value.is_empty() && *max_age == "0")
        .map(|(name, _, _)| name)
        .collect()
}

fn set_cookies(headers: &HeaderMap) -> Vec<(String, String, String)> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| {
            let (pair, attrs) = cookie.split_once(';')?;
            let (name, value) = pair.split_once('=')?;
            let max_age = attrs
                .split(';')
                .filter_map(|a| a.trim().strip_prefix("Max-Age="))
                .next()?
                .to_string();
            Some((name.to_string(), value.to_string(), max_age))
        })
        .collect()
}

/// Request headers carrying the given cookies.
pub(crate) fn cookie_header(cookies: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    if !value.is_empty() {
        headers.insert(COOKIE, HeaderValue::from_str(&value).unwrap());
    }
    headers
}

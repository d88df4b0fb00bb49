//! Central configuration for the cookie_session crate
//!
//! Every value is read once from the environment, falling back to a default.
//! `AuthConfig::from_env` assembles them; callers may still override fields.

use std::env;
use std::str::FromStr;
use std::sync::LazyLock;

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, value);
            default
        }),
        Err(_) => default,
    }
}

/// Base path under which the session endpoints are mounted.
/// Default: "/sessions"
pub static AUTH_SESSIONS_PATH: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_SESSIONS_PATH", "/sessions"));

pub static AUTH_REDIRECT_PARAM: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_REDIRECT_PARAM", "redirect"));

pub static AUTH_CSRF_FIELD_NAME: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_CSRF_FIELD_NAME", "csrf_token"));

pub static AUTH_RESUME_TICKET_PARAM: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_RESUME_TICKET_PARAM", "csrf_ticket"));

/// Seconds a resume ticket stays redeemable. Default: 60
pub static AUTH_RESUME_TICKET_TTL: LazyLock<i64> =
    LazyLock::new(|| env_parse_or("AUTH_RESUME_TICKET_TTL", 60));

pub static AUTH_REMEMBER_ME_FIELD: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_REMEMBER_ME_FIELD", "rememberMe"));

pub static AUTH_UNAUTHORIZED_REDIRECT: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_UNAUTHORIZED_REDIRECT", "/login"));

pub static AUTH_LOGIN_FAILED_REDIRECT: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_LOGIN_FAILED_REDIRECT", "/login"));

pub static AUTH_DEFAULT_LOGIN_SUCCESS_REDIRECT: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_DEFAULT_LOGIN_SUCCESS_REDIRECT", "/"));

pub static AUTH_DEFAULT_LOGOUT_REDIRECT: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_DEFAULT_LOGOUT_REDIRECT", "/login"));

// Access tier
pub static AUTH_ACCESS_COOKIE_NAME: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_ACCESS_COOKIE_NAME", "access_session"));

pub static AUTH_ACCESS_COOKIE_MAX_AGE: LazyLock<i64> =
    LazyLock::new(|| env_parse_or("AUTH_ACCESS_COOKIE_MAX_AGE", 1800));

pub static AUTH_ACCESS_REFRESH_MARGIN: LazyLock<i64> =
    LazyLock::new(|| env_parse_or("AUTH_ACCESS_REFRESH_MARGIN", 300));

pub static AUTH_ACCESS_TOKEN_LENGTH: LazyLock<usize> =
    LazyLock::new(|| env_parse_or("AUTH_ACCESS_TOKEN_LENGTH", 32));

// Refresh tier
pub static AUTH_REFRESH_COOKIE_NAME: LazyLock<String> =
    LazyLock::new(|| env_or("AUTH_REFRESH_COOKIE_NAME", "refresh_session"));

/// Default: 30 days
pub static AUTH_REFRESH_COOKIE_MAX_AGE: LazyLock<i64> =
    LazyLock::new(|| env_parse_or("AUTH_REFRESH_COOKIE_MAX_AGE", 30 * 24 * 60 * 60));

/// Default: 1 day
pub static AUTH_REFRESH_REFRESH_MARGIN: LazyLock<i64> =
    LazyLock::new(|| env_parse_or("AUTH_REFRESH_REFRESH_MARGIN", 24 * 60 * 60));

pub static AUTH_REFRESH_TOKEN_LENGTH: LazyLock<usize> =
    LazyLock::new(|| env_parse_or("AUTH_REFRESH_TOKEN_LENGTH", 64));

/// Seconds between GC sweeps. Default: 300
pub static AUTH_GC_INTERVAL: LazyLock<u64> =
    LazyLock::new(|| env_parse_or("AUTH_GC_INTERVAL", 300));

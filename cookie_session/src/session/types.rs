use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single issued session of either tier.
///
/// Sessions are immutable once issued. Rotation creates a new record instead
/// of editing an existing one, so no setters are exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user_id: String,
    token: String,
    csrf_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// `expires_at` is truncated to whole milliseconds, the precision every
    /// store persists.
    pub fn new(
        user_id: impl Into<String>,
        token: impl Into<String>,
        csrf_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
            csrf_token: csrf_token.into(),
            expires_at: expires_at.trunc_subsecs(3),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The cookie secret. Only stores and the cookie writer need this.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Valid strictly before `expires_at`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// What the login endpoint received, handed to the [`AuthProvider`].
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub headers: HeaderMap,
    pub form: HashMap<String, String>,
}

impl LoginRequest {
    pub fn new(headers: HeaderMap, form: HashMap<String, String>) -> Self {
        Self { headers, form }
    }

    /// Non-empty form value for `name`.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Provider backend error: {0}")]
    Backend(String),
}

/// External credential check. Returns the authenticated user's id.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    async fn authenticate_user(&self, request: &LoginRequest) -> Result<String, ProviderError>;
}

/// How a guard treats callers on a given route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardOptions {
    /// Let callers without a valid access cookie through as anonymous.
    pub allow_unauthenticated: bool,
    /// Send an authenticated caller to the redirect parameter instead of the page.
    pub redirect_authenticated: bool,
}

impl GuardOptions {
    pub fn required() -> Self {
        Self::default()
    }

    pub fn optional() -> Self {
        Self {
            allow_unauthenticated: true,
            redirect_authenticated: false,
        }
    }

    pub fn redirect_authenticated(mut self) -> Self {
        self.redirect_authenticated = true;
        self
    }
}

/// The request facts the guard needs, independent of the web framework.
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    pub method: &'a http::Method,
    pub headers: &'a HeaderMap,
    /// Path and query of the request as received.
    pub request_uri: &'a str,
    /// Raw query string, undecoded.
    pub query: Option<&'a str>,
}

/// Outcome of resolving a request against the access tier.
#[derive(Debug, Clone)]
pub enum GuardOutcome {
    /// Caller is authenticated; `headers` holds any reissued access cookie.
    Authenticated { session: Session, headers: HeaderMap },
    /// No valid credential and the route allows anonymous callers.
    Anonymous,
    /// No valid credential: the browser must round-trip through refresh.
    NeedsRefresh { location: String },
    /// Authenticated caller on a route that sends such callers elsewhere.
    RedirectAway { location: String, headers: HeaderMap },
    /// Mutating request without a valid CSRF proof.
    CsrfRejected,
}

/// CSRF proof submitted with a mutating request.
#[derive(Debug, Clone, Default)]
pub struct CsrfSubmission {
    pub token: Option<String>,
    pub resume_ticket: Option<String>,
}

/// Redirect produced by the refresh, login and logout flows.
#[derive(Debug, Clone)]
pub struct FlowRedirect {
    pub location: String,
    /// Keep the request method on redirect (307) instead of switching to GET (303).
    pub preserve_method: bool,
    pub headers: HeaderMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_is_live_boundary() {
        // Given a session expiring at a fixed instant
        let expires_at = Utc::now();
        let session = Session::new("user", "token", "csrf", expires_at);

        // Then it is live strictly before expiry and dead at and after it
        assert!(session.is_live(expires_at - Duration::milliseconds(1)));
        assert!(!session.is_live(expires_at));
        assert!(!session.is_live(expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_session_new_truncates_expiry_to_millis() {
        // Given an expiry with sub-millisecond precision
        let base = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let expires_at = base + Duration::microseconds(900);

        // When a session is created
        let session = Session::new("user", "token", "csrf", expires_at);

        // Then the stored expiry is the enclosing millisecond
        assert_eq!(session.expires_at(), base);
        assert!(session.is_live(base - Duration::microseconds(1)));
        assert!(!session.is_live(base + Duration::microseconds(100)));
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let session = Session::new("user", "token", "csrf", Utc::now());
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session, back);
    }

    #[test]
    fn test_login_request_form_value() {
        let mut form = HashMap::new();
        form.insert("username".to_string(), "alice".to_string());
        form.insert("password".to_string(), String::new());
        let request = LoginRequest::new(HeaderMap::new(), form);

        assert_eq!(request.form_value("username"), Some("alice"));
        assert_eq!(request.form_value("password"), None);
        assert_eq!(request.form_value("missing"), None);
    }

    #[test]
    fn test_guard_options_builders() {
        assert!(!GuardOptions::required().allow_unauthenticated);
        assert!(GuardOptions::optional().allow_unauthenticated);
        let opts = GuardOptions::optional().redirect_authenticated();
        assert!(opts.allow_unauthenticated && opts.redirect_authenticated);
    }
}

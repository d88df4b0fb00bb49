use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use http::{StatusCode, request::Parts};

use cookie_session::Session;

/// The caller's access session, placed in request extensions by the session guard.
///
/// Use it as an extractor on routes behind [`session_guard`](crate::session_guard).
/// `Option<AuthSession>` works on routes guarded with
/// [`GuardOptions::optional`](cookie_session::GuardOptions::optional).
///
/// # Example
///
/// ```no_run
/// use cookie_session_axum::AuthSession;
///
/// async fn whoami(session: AuthSession) -> String {
///     format!("Hello, {}!", session.user_id())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AuthSession {
    session: Session,
}

impl AuthSession {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub fn user_id(&self) -> &str {
        self.session.user_id()
    }

    /// CSRF token to embed in forms or send as `X-CSRF-Token`.
    pub fn csrf_token(&self) -> &str {
        self.session.csrf_token()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.session.expires_at()
    }
}

/// Rejection for an [`AuthSession`] extractor on a route the guard let through anonymously.
#[derive(Debug)]
pub struct MissingSession;

impl IntoResponse for MissingSession {
    fn into_response(self) -> Response {
        tracing::debug!("AuthSession requested but no session was resolved");
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .ok_or(MissingSession)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthSession>().cloned())
    }
}

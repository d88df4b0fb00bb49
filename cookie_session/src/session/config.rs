use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use http::HeaderMap;

use crate::config::{
    AUTH_ACCESS_COOKIE_MAX_AGE, AUTH_ACCESS_COOKIE_NAME, AUTH_ACCESS_REFRESH_MARGIN,
    AUTH_ACCESS_TOKEN_LENGTH, AUTH_CSRF_FIELD_NAME, AUTH_DEFAULT_LOGIN_SUCCESS_REDIRECT,
    AUTH_DEFAULT_LOGOUT_REDIRECT, AUTH_LOGIN_FAILED_REDIRECT, AUTH_REDIRECT_PARAM,
    AUTH_REFRESH_COOKIE_MAX_AGE, AUTH_REFRESH_COOKIE_NAME, AUTH_REFRESH_REFRESH_MARGIN,
    AUTH_REFRESH_TOKEN_LENGTH, AUTH_REMEMBER_ME_FIELD, AUTH_RESUME_TICKET_PARAM,
    AUTH_RESUME_TICKET_TTL, AUTH_SESSIONS_PATH, AUTH_UNAUTHORIZED_REDIRECT,
};
use crate::session::errors::SessionError;
use crate::session::resume::ResumeTickets;
use crate::session::types::{AuthProvider, Session};
use crate::storage::SessionStore;
use crate::utils::{
    gen_random_string, get_cookie_from_headers, header_delete_cookie, header_set_cookie,
};

/// Policy for one cookie tier (access or refresh).
#[derive(Clone)]
pub struct CookieConfig {
    pub name: String,
    /// Absolute lifetime of an issued session and `Max-Age` of its cookie.
    pub max_age: Duration,
    /// Window before expiry in which the session is proactively reissued.
    pub refresh_margin: Duration,
    /// Random bytes per token, before base64url encoding.
    pub token_length: usize,
    pub store: Arc<dyn SessionStore>,
}

impl fmt::Debug for CookieConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieConfig")
            .field("name", &self.name)
            .field("max_age", &self.max_age)
            .field("refresh_margin", &self.refresh_margin)
            .field("token_length", &self.token_length)
            .finish_non_exhaustive()
    }
}

impl CookieConfig {
    pub fn new(
        name: impl Into<String>,
        max_age: Duration,
        refresh_margin: Duration,
        token_length: usize,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            name: name.into(),
            max_age,
            refresh_margin,
            token_length,
            store,
        }
    }

    /// Fresh session for `user_id` with independent random token and CSRF token.
    pub fn generate_session(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let token = gen_random_string(self.token_length)
            .map_err(|e| SessionError::Crypto(e.to_string()))?;
        let csrf_token = gen_random_string(self.token_length)
            .map_err(|e| SessionError::Crypto(e.to_string()))?;
        Ok(Session::new(user_id, token, csrf_token, now + self.max_age))
    }

    pub fn needs_reissue(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now + self.refresh_margin > session.expires_at()
    }

    pub(crate) fn set_cookie(
        &self,
        headers: &mut HeaderMap,
        session: &Session,
        path: &str,
    ) -> Result<(), SessionError> {
        header_set_cookie(
            headers,
            &self.name,
            session.token(),
            path,
            self.max_age.num_seconds(),
        )?;
        Ok(())
    }

    pub(crate) fn delete_cookie(
        &self,
        headers: &mut HeaderMap,
        path: &str,
    ) -> Result<(), SessionError> {
        header_delete_cookie(headers, &self.name, path)?;
        Ok(())
    }

    /// Generate, store and set a new session for `user_id`.
    pub(crate) async fn issue(
        &self,
        user_id: &str,
        path: &str,
        now: DateTime<Utc>,
        headers: &mut HeaderMap,
    ) -> Result<Session, SessionError> {
        let session = self.generate_session(user_id, now)?;
        self.store.store_session(session.clone()).await?;
        self.set_cookie(headers, &session, path)?;
        Ok(session)
    }

    /// Generate a replacement for `old`, swap it in and set the new cookie.
    pub(crate) async fn rotate(
        &self,
        old: &Session,
        path: &str,
        now: DateTime<Utc>,
        headers: &mut HeaderMap,
    ) -> Result<Session, SessionError> {
        let session = self.generate_session(old.user_id(), now)?;
        self.store.replace_session(old, session.clone()).await?;
        self.set_cookie(headers, &session, path)?;
        Ok(session)
    }

    /// Look up the session named by this tier's cookie.
    ///
    /// A missing, malformed or expired cookie is `Ok(None)`; only store
    /// failures are errors.
    pub(crate) async fn verify_token(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, SessionError> {
        let Some(token) = get_cookie_from_headers(headers, &self.name) else {
            return Ok(None);
        };
        let session = self.store.verify_session(&token, now).await.inspect_err(|e| {
            tracing::error!("Failed to verify {} session: {}", self.name, e);
        })?;
        if session.is_none() {
            tracing::debug!("{} cookie did not match a live session", self.name);
        }
        Ok(session)
    }
}

/// Everything the guard and the session flows need.
///
/// `from_env` fills the fields from the environment; every field is public
/// and may be overridden before use.
#[derive(Clone)]
pub struct AuthConfig {
    /// Base path of the session endpoints, e.g. "/sessions".
    pub sessions_path: String,
    pub redirect_param: String,
    pub csrf_field_name: String,
    pub resume_ticket_param: String,
    pub remember_me_field: String,
    pub unauthorized_redirect: String,
    pub login_failed_redirect: String,
    pub default_login_success_redirect: String,
    pub default_logout_redirect: String,
    pub access: CookieConfig,
    pub refresh: CookieConfig,
    pub provider: Arc<dyn AuthProvider>,
    pub resume_tickets: Arc<ResumeTickets>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("sessions_path", &self.sessions_path)
            .field("redirect_param", &self.redirect_param)
            .field("csrf_field_name", &self.csrf_field_name)
            .field("access", &self.access)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    pub fn from_env(
        provider: Arc<dyn AuthProvider>,
        access_store: Arc<dyn SessionStore>,
        refresh_store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            sessions_path: AUTH_SESSIONS_PATH.clone(),
            redirect_param: AUTH_REDIRECT_PARAM.clone(),
            csrf_field_name: AUTH_CSRF_FIELD_NAME.clone(),
            resume_ticket_param: AUTH_RESUME_TICKET_PARAM.clone(),
            remember_me_field: AUTH_REMEMBER_ME_FIELD.clone(),
            unauthorized_redirect: AUTH_UNAUTHORIZED_REDIRECT.clone(),
            login_failed_redirect: AUTH_LOGIN_FAILED_REDIRECT.clone(),
            default_login_success_redirect: AUTH_DEFAULT_LOGIN_SUCCESS_REDIRECT.clone(),
            default_logout_redirect: AUTH_DEFAULT_LOGOUT_REDIRECT.clone(),
            access: CookieConfig::new(
                AUTH_ACCESS_COOKIE_NAME.as_str(),
                Duration::seconds(*AUTH_ACCESS_COOKIE_MAX_AGE),
                Duration::seconds(*AUTH_ACCESS_REFRESH_MARGIN),
                *AUTH_ACCESS_TOKEN_LENGTH,
                access_store,
            ),
            refresh: CookieConfig::new(
                AUTH_REFRESH_COOKIE_NAME.as_str(),
                Duration::seconds(*AUTH_REFRESH_COOKIE_MAX_AGE),
                Duration::seconds(*AUTH_REFRESH_REFRESH_MARGIN),
                *AUTH_REFRESH_TOKEN_LENGTH,
                refresh_store,
            ),
            provider,
            resume_tickets: Arc::new(ResumeTickets::new(Duration::seconds(
                *AUTH_RESUME_TICKET_TTL,
            ))),
        }
    }

    /// Reject configurations the flows cannot operate with.
    pub fn validate(&self) -> Result<(), SessionError> {
        let base = self.sessions_base();
        if base.is_empty() || !base.starts_with('/') {
            return Err(SessionError::Config(format!(
                "Sessions path must be an absolute path, got {:?}",
                self.sessions_path
            )));
        }
        for (name, value) in [
            ("redirect_param", &self.redirect_param),
            ("csrf_field_name", &self.csrf_field_name),
            ("resume_ticket_param", &self.resume_ticket_param),
            ("remember_me_field", &self.remember_me_field),
        ] {
            if value.is_empty() {
                return Err(SessionError::Config(format!("{name} must not be empty")));
            }
        }
        for (tier, cookie) in [("access", &self.access), ("refresh", &self.refresh)] {
            if cookie.name.is_empty() {
                return Err(SessionError::Config(format!(
                    "{tier} cookie name must not be empty"
                )));
            }
            if cookie.token_length == 0 {
                return Err(SessionError::Config(format!(
                    "{tier} token length must be positive"
                )));
            }
            if cookie.max_age <= Duration::zero() {
                return Err(SessionError::Config(format!(
                    "{tier} cookie lifetime must be positive"
                )));
            }
            if cookie.refresh_margin < Duration::zero() || cookie.refresh_margin >= cookie.max_age
            {
                return Err(SessionError::Config(format!(
                    "{tier} refresh margin must be non-negative and shorter than the lifetime"
                )));
            }
        }
        if self.access.name == self.refresh.name {
            return Err(SessionError::Config(
                "access and refresh cookies must have different names".to_string(),
            ));
        }
        Ok(())
    }

    fn sessions_base(&self) -> &str {
        self.sessions_path.trim_end_matches('/')
    }

    /// Path of the refresh endpoint, also the refresh cookie's path.
    pub fn refresh_path(&self) -> String {
        format!("{}/refresh", self.sessions_base())
    }

    /// Path of the login (POST) and logout (DELETE) endpoint.
    pub fn login_path(&self) -> String {
        self.sessions_base().to_string()
    }

    pub fn logout_path(&self) -> String {
        format!("{}/logout", self.sessions_base())
    }

    pub fn csrf_token_path(&self) -> String {
        format!("{}/csrf_token", self.sessions_base())
    }

    pub(crate) fn access_cookie_path(&self) -> &'static str {
        "/"
    }
}

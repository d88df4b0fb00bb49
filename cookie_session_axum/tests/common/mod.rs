//! Shared fixtures for the axum integration tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, Response, header},
    middleware::from_fn_with_state,
    routing::get,
};
use chrono::{DateTime, Duration, Utc};
use tower::ServiceExt;

use cookie_session_axum::cookie_session::{
    AuthConfig, AuthProvider, CookieConfig, InMemorySessionStore, LoginRequest, ProviderError,
    ResumeTickets, Session, SessionStore, StorageError,
};
use cookie_session_axum::{AuthSession, SessionGuard, session_guard, session_router_no_trace};

pub const TEST_USER: &str = "alice";
pub const TEST_PASSWORD: &str = "correct-horse";

/// Accepts `TEST_USER` with `TEST_PASSWORD`.
pub struct StubProvider;

#[async_trait]
impl AuthProvider for StubProvider {
    async fn authenticate_user(&self, request: &LoginRequest) -> Result<String, ProviderError> {
        match (
            request.form_value("username"),
            request.form_value("password"),
        ) {
            (Some(TEST_USER), Some(TEST_PASSWORD)) => Ok(TEST_USER.to_string()),
            _ => Err(ProviderError::InvalidCredentials),
        }
    }
}

/// Default configuration over in-memory stores, independent of the environment.
pub fn test_config() -> Arc<AuthConfig> {
    Arc::new(AuthConfig {
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
    })
}

/// Store whose every operation fails, as a lost database connection would.
pub struct FailingStore;

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

/// `test_config` with both tiers backed by [`FailingStore`].
pub fn failing_config() -> Arc<AuthConfig> {
    let mut config = Arc::unwrap_or_clone(test_config());
    config.access.store = Arc::new(FailingStore);
    config.refresh.store = Arc::new(FailingStore);
    Arc::new(config)
}

/// Session endpoints plus a guarded `/chores` page and an optional `/login` page.
pub fn test_app(config: Arc<AuthConfig>) -> Router {
    let chores = Router::new()
        .route(
            "/chores",
            get(|s: AuthSession| async move { format!("chores of {}", s.user_id()) })
                .post(|s: AuthSession| async move { format!("added for {}", s.user_id()) }),
        )
        .route_layer(from_fn_with_state(
            SessionGuard::required(config.clone()),
            session_guard,
        ));
    let login = Router::new()
        .route(
            "/login",
            get(|s: Option<AuthSession>| async move {
                match s {
                    Some(s) => format!("already {}", s.user_id()),
                    None => "login form".to_string(),
                }
            }),
        )
        .route_layer(from_fn_with_state(
            SessionGuard::new(
                config.clone(),
                cookie_session_axum::cookie_session::GuardOptions::optional()
                    .redirect_authenticated(),
            ),
            session_guard,
        ));

    session_router_no_trace(config).merge(chores).merge(login)
}

/// Cookie-keeping client that drives the router without a socket.
///
/// Cookies are only sent to paths under their `Path` attribute, as a
/// browser would.
pub struct MockBrowser {
    app: Router,
    cookies: HashMap<String, (String, String)>,
}

impl MockBrowser {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|(value, _)| value.as_str())
    }

    pub fn set_cookie(&mut self, name: &str, value: &str, path: &str) {
        self.cookies
            .insert(name.to_string(), (value.to_string(), path.to_string()));
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Method::GET, uri, None, &[]).await
    }

    pub async fn post_form(&mut self, uri: &str, form: &[(&str, &str)]) -> Response<Body> {
        let body = form
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        self.send(Method::POST, uri, Some(body), &[]).await
    }

    pub async fn send(
        &mut self,
        method: Method,
        uri: &str,
        form: Option<String>,
        extra_headers: &[(&str, &str)],
    ) -> Response<Body> {
        let path = uri.split('?').next().unwrap_or(uri);
        let mut builder = Request::builder().method(method).uri(uri);
        let cookie = self
            .cookies
            .iter()
            .filter(|(_, (_, cookie_path))| path_matches(path, cookie_path))
            .map(|(name, (value, _))| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if !cookie.is_empty() {
            builder = builder.header(header::COOKIE, cookie);
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                );
                Body::from(form)
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        self.store_cookies(response.headers().get_all(header::SET_COOKIE).iter());
        response
    }

    fn store_cookies<'a>(&mut self, set_cookies: impl Iterator<Item = &'a HeaderValue>) {
        for value in set_cookies {
            let value = value.to_str().unwrap();
            let mut parts = value.split(';').map(str::trim);
            let (name, cookie_value) = parts.next().unwrap().split_once('=').unwrap();
            let mut path = "/".to_string();
            let mut max_age = None;
            for attr in parts {
                if let Some(p) = attr.strip_prefix("Path=") {
                    path = p.to_string();
                } else if let Some(m) = attr.strip_prefix("Max-Age=") {
                    max_age = Some(m.to_string());
                }
            }
            if max_age.as_deref() == Some("0") {
                self.cookies.remove(name);
            } else {
                self.cookies
                    .insert(name.to_string(), (cookie_value.to_string(), path));
            }
        }
    }
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    cookie_path == "/"
        || request_path == cookie_path
        || request_path.starts_with(&format!("{}/", cookie_path.trim_end_matches('/')))
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// Names of the cookies a response sets with a non-empty value.
pub fn issued_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| !v.contains("Max-Age=0"))
        .filter_map(|v| v.split_once('=').map(|(name, _)| name.to_string()))
        .collect()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

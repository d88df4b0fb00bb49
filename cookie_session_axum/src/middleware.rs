use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use http::{HeaderMap, header::CONTENT_TYPE, request::Parts};

use cookie_session::{
    AuthConfig, CsrfSubmission, GuardOptions, GuardOutcome, RequestInfo, is_state_changing,
};

use super::config::AUTH_FORM_BODY_LIMIT;
use super::error::IntoResponseError;
use super::session::AuthSession;

/// State for [`session_guard`]: the shared configuration plus per-route options.
#[derive(Clone, Debug)]
pub struct SessionGuard {
    config: Arc<AuthConfig>,
    options: GuardOptions,
}

impl SessionGuard {
    pub fn new(config: Arc<AuthConfig>, options: GuardOptions) -> Self {
        Self { config, options }
    }

    /// Callers without a valid access session are sent through refresh.
    pub fn required(config: Arc<AuthConfig>) -> Self {
        Self::new(config, GuardOptions::required())
    }

    /// Callers without a valid access session continue anonymously.
    pub fn optional(config: Arc<AuthConfig>) -> Self {
        Self::new(config, GuardOptions::optional())
    }
}

/// Resolve the caller's session before the handler runs.
///
/// Use with `axum::middleware::from_fn_with_state`:
///
/// ```no_run
/// # use std::sync::Arc;
/// # use axum::{Router, middleware::from_fn_with_state, routing::get};
/// # use cookie_session::AuthConfig;
/// use cookie_session_axum::{AuthSession, SessionGuard, session_guard};
///
/// # fn app(config: Arc<AuthConfig>) -> Router {
/// Router::new()
///     .route("/", get(|s: AuthSession| async move { s.user_id().to_string() }))
///     .route_layer(from_fn_with_state(SessionGuard::required(config), session_guard))
/// # }
/// ```
///
/// Authenticated callers get an [`AuthSession`] in the request extensions and
/// any reissued access cookie on the response. Mutating requests need a
/// valid CSRF proof or get 403.
pub async fn session_guard(
    State(guard): State<SessionGuard>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let existing = parts
        .extensions
        .get::<AuthSession>()
        .map(|s| s.session().clone());

    let (body, form_body) = match buffer_form_body(&parts, body, existing.is_none()).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    let config = &guard.config;
    let request_uri = original_request_uri(&parts);
    let submission = CsrfSubmission::from_request(
        config,
        parts.uri.query(),
        form_body.as_deref(),
        &parts.headers,
    );
    let info = RequestInfo {
        method: &parts.method,
        headers: &parts.headers,
        request_uri: &request_uri,
        query: parts.uri.query(),
    };

    let outcome = match config
        .resolve_request(info, existing.as_ref(), &submission, guard.options, Utc::now())
        .await
        .into_response_error()
    {
        Ok(outcome) => outcome,
        Err(e) => return e.into_response(),
    };

    let mut req = Request::from_parts(parts, body);
    match outcome {
        GuardOutcome::Authenticated { session, headers } => {
            req.extensions_mut().insert(AuthSession::new(session));
            let mut response = next.run(req).await;
            append_headers(&mut response, headers);
            response
        }
        GuardOutcome::Anonymous => next.run(req).await,
        GuardOutcome::NeedsRefresh { location } => Redirect::temporary(&location).into_response(),
        GuardOutcome::RedirectAway { location, headers } => {
            let mut response = Redirect::to(&location).into_response();
            append_headers(&mut response, headers);
            response
        }
        GuardOutcome::CsrfRejected => {
            (StatusCode::FORBIDDEN, "invalid csrf token").into_response()
        }
    }
}

pub(crate) fn append_headers(response: &mut Response, headers: HeaderMap) {
    let target = response.headers_mut();
    let mut last_name = None;
    for (name, value) in headers {
        if let Some(name) = name {
            last_name = Some(name);
        }
        if let Some(name) = &last_name {
            target.append(name.clone(), value);
        }
    }
}

/// Path and query as the client sent them, before any `nest` stripped a prefix.
pub(crate) fn original_request_uri(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|o| &o.0)
        .unwrap_or(&parts.uri);
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn is_form_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Read a urlencoded body of a mutating request so the CSRF field can be
/// checked, handing back an equivalent body for the handler.
async fn buffer_form_body(
    parts: &Parts,
    body: Body,
    needs_check: bool,
) -> Result<(Body, Option<String>), Response> {
    if !needs_check || !is_state_changing(&parts.method) || !is_form_urlencoded(&parts.headers) {
        return Ok((body, None));
    }
    let bytes = axum::body::to_bytes(body, *AUTH_FORM_BODY_LIMIT)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to read form body: {}", e);
            (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response()
        })?;
    let form = String::from_utf8_lossy(&bytes).into_owned();
    Ok((Body::from(bytes), Some(form)))
}

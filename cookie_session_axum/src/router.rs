//! Router for the session endpoints

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, header},
    middleware::{from_fn_with_state, map_response},
    response::Response,
    routing::{any, delete, get, post},
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use cookie_session::AuthConfig;

use super::handlers::{csrf_token, login, logout, refresh};
use super::middleware::{SessionGuard, session_guard};

/// Create a router for the login, logout, refresh and CSRF token endpoints.
///
/// Routes are registered with their full paths under `config.sessions_path`,
/// so the router is meant to be merged into the application, not nested:
/// - `POST {base}` login
/// - `DELETE {base}` and `POST {base}/logout` logout
/// - `{base}/refresh` refresh, any method
/// - `GET {base}/csrf_token` CSRF token as JSON
pub fn session_router(config: Arc<AuthConfig>) -> Router {
    session_router_no_trace(config).layer(
        TraceLayer::new_for_http()
            .make_span_with(
                DefaultMakeSpan::new()
                    .level(Level::INFO)
                    .include_headers(false),
            )
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`session_router`] without the HTTP tracing middleware.
pub fn session_router_no_trace(config: Arc<AuthConfig>) -> Router {
    let optional = from_fn_with_state(SessionGuard::optional(config.clone()), session_guard);
    let required = from_fn_with_state(SessionGuard::required(config.clone()), session_guard);

    Router::new()
        .route(
            &config.login_path(),
            post(login).merge(delete(logout).route_layer(optional.clone())),
        )
        .route(&config.logout_path(), post(logout).route_layer(optional))
        .route(&config.refresh_path(), any(refresh))
        .route(&config.csrf_token_path(), get(csrf_token).route_layer(required))
        .layer(map_response(no_cache))
        .with_state(config)
}

async fn no_cache(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate, max-age=0"),
    );
    response
}

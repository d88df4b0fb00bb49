use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Form, OriginalUri, RawQuery, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Serialize;

use cookie_session::{AuthConfig, FlowRedirect, LoginRequest, RequestInfo};

use super::error::IntoResponseError;
use super::middleware::append_headers;
use super::session::AuthSession;

pub(crate) async fn login(
    State(config): State<Arc<AuthConfig>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, (axum::http::StatusCode, String)> {
    let request = LoginRequest::new(headers, form);
    let redirect = config
        .create_session(&request, query.as_deref(), Utc::now())
        .await
        .into_response_error()?;
    Ok(flow_response(redirect))
}

pub(crate) async fn logout(
    State(config): State<Arc<AuthConfig>>,
    session: Option<AuthSession>,
    RawQuery(query): RawQuery,
) -> Result<Response, (axum::http::StatusCode, String)> {
    let redirect = config
        .delete_sessions(session.as_ref().map(AuthSession::session), query.as_deref())
        .await
        .into_response_error()?;
    Ok(flow_response(redirect))
}

pub(crate) async fn refresh(
    State(config): State<Arc<AuthConfig>>,
    method: Method,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Response, (axum::http::StatusCode, String)> {
    let request_uri = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let info = RequestInfo {
        method: &method,
        headers: &headers,
        request_uri,
        query: query.as_deref(),
    };
    let redirect = config
        .refresh_session(info, Utc::now())
        .await
        .into_response_error()?;
    Ok(flow_response(redirect))
}

#[derive(Serialize)]
pub(crate) struct CsrfTokenResponse {
    csrf_token: String,
}

pub(crate) async fn csrf_token(session: AuthSession) -> Json<CsrfTokenResponse> {
    Json(CsrfTokenResponse {
        csrf_token: session.csrf_token().to_string(),
    })
}

/// 307 when the flow keeps the method, 303 otherwise.
fn flow_response(redirect: FlowRedirect) -> Response {
    let mut response = if redirect.preserve_method {
        Redirect::temporary(&redirect.location).into_response()
    } else {
        Redirect::to(&redirect.location).into_response()
    };
    append_headers(&mut response, redirect.headers);
    response
}

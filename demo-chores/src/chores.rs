use std::collections::HashMap;
use std::sync::Arc;

use askama::Template;
use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use cookie_session_axum::cookie_session::{AuthConfig, GuardOptions};
use cookie_session_axum::{AuthSession, SessionGuard, session_guard};

#[derive(Debug, Clone)]
pub(crate) struct Chore {
    id: Uuid,
    title: String,
}

#[derive(Clone)]
pub(crate) struct AppState {
    config: Arc<AuthConfig>,
    chores: Arc<Mutex<HashMap<String, Vec<Chore>>>>,
}

pub(crate) fn router(config: Arc<AuthConfig>) -> Router {
    let state = AppState {
        config: config.clone(),
        chores: Arc::new(Mutex::new(HashMap::new())),
    };

    let protected = Router::new()
        .route("/", get(index))
        .route("/chores", post(add_chore))
        .route("/chores/{id}/delete", post(delete_chore))
        .route_layer(from_fn_with_state(
            SessionGuard::required(config.clone()),
            session_guard,
        ));

    let login = Router::new().route("/login", get(login_page)).route_layer(
        from_fn_with_state(
            SessionGuard::new(config, GuardOptions::optional().redirect_authenticated()),
            session_guard,
        ),
    );

    protected.merge(login).with_state(state)
}

fn render(template: impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    login_path: String,
    redirect_param: &'a str,
    redirect: Option<String>,
    remember_me_field: &'a str,
}

async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let config = &state.config;
    render(LoginTemplate {
        login_path: config.login_path(),
        redirect_param: &config.redirect_param,
        redirect: query.get(&config.redirect_param).cloned(),
        remember_me_field: &config.remember_me_field,
    })
}

#[derive(Template)]
#[template(path = "chores.html")]
struct ChoresTemplate<'a> {
    user_id: &'a str,
    chores: Vec<Chore>,
    csrf_field_name: &'a str,
    csrf_token: &'a str,
    logout_path: String,
}

async fn index(State(state): State<AppState>, session: AuthSession) -> Response {
    let chores = state
        .chores
        .lock()
        .await
        .get(session.user_id())
        .cloned()
        .unwrap_or_default();
    render(ChoresTemplate {
        user_id: session.user_id(),
        chores,
        csrf_field_name: &state.config.csrf_field_name,
        csrf_token: session.csrf_token(),
        logout_path: state.config.logout_path(),
    })
}

#[derive(Deserialize, Debug)]
struct NewChore {
    title: String,
}

async fn add_chore(
    State(state): State<AppState>,
    session: AuthSession,
    Form(form): Form<NewChore>,
) -> Redirect {
    let title = form.title.trim();
    if !title.is_empty() {
        tracing::debug!("Adding chore for {}", session.user_id());
        state
            .chores
            .lock()
            .await
            .entry(session.user_id().to_string())
            .or_default()
            .push(Chore {
                id: Uuid::new_v4(),
                title: title.to_string(),
            });
    }
    Redirect::to("/")
}

async fn delete_chore(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Redirect {
    if let Some(chores) = state.chores.lock().await.get_mut(session.user_id()) {
        chores.retain(|chore| chore.id != id);
    }
    Redirect::to("/")
}

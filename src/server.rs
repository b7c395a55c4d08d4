//!
//! droplog HTTP server
//! -------------------
//! Axum-based HTTP surface for registration, login, and data submission.
//!
//! Responsibilities:
//! - Session management with an HttpOnly cookie issued on first request.
//! - Login/register endpoints backed by the `auth` module.
//! - Submission and history endpoints delegating to the `submit` module.
//! - Background sweeping of expired sessions and optional store snapshots.
//!
//! Handlers are thin glue around the pure page functions in `pages`: they
//! resolve the session from the cookie, call the page function, enqueue the
//! returned flash, and apply the action.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::{AuthService, CredentialStore};
use crate::config::Config;
use crate::session::{Flash, SessionManager};
use crate::store::{MemoryStore, SharedKv};
use crate::submit::SubmissionService;

pub mod pages;

use pages::Action;

const SESSION_COOKIE: &str = "droplog_session";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub auth: AuthService,
    pub submissions: SubmissionService,
}

impl AppState {
    pub fn new(kv: SharedKv, config: &Config) -> Self {
        Self {
            sessions: SessionManager::new(config.session_ttl),
            auth: AuthService::new(CredentialStore::new(kv.clone(), config.store_timeout)),
            submissions: SubmissionService::new(kv, config.store_timeout),
        }
    }
}

/// Mount all routes onto a router bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "droplog ok" }))
        .route("/home", get(home).post(submit))
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Start the droplog HTTP server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = match &config.snapshot_path {
        Some(path) => Arc::new(MemoryStore::with_snapshot(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let kv: SharedKv = store.clone();
    let state = AppState::new(kv, &config);

    // Background sweeper for expired sessions
    {
        let sessions = state.sessions.clone();
        let interval = config.sweep_interval;
        tokio::spawn(async move {
            loop {
                let removed = sessions.sweep();
                if removed > 0 {
                    debug!(removed = removed, "session_sweep");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    // Periodic store snapshots when a snapshot path is configured
    if config.snapshot_path.is_some() {
        let store_for_snap = store.clone();
        let interval = config.snapshot_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = store_for_snap.save_snapshot() {
                    warn!("snapshot failed: {}", e);
                }
            }
        });
    }

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct SubmitPayload {
    input_data: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    password: String,
    confirm_password: String,
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn set_session_cookie(token: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/",
        SESSION_COOKIE, token
    ))
    .unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Strict; Path=/",
        SESSION_COOKIE
    ))
    .unwrap()
}

/// Resolve the request's session, issuing a new one when the cookie is missing
/// or names an expired session.
fn resolve_session(state: &AppState, headers: &HeaderMap) -> (String, bool) {
    let existing = parse_cookie(headers, SESSION_COOKIE);
    state.sessions.ensure(existing.as_deref())
}

/// Enqueue the flash (if any), apply the action, and set the session cookie on
/// freshly issued sessions.
fn apply(
    state: &AppState,
    token: &str,
    fresh: bool,
    action: Action,
    flash: Option<Flash>,
) -> Response {
    if let Some(f) = flash {
        state.sessions.flash(token, f.severity, f.text);
    }
    let mut resp = match action {
        Action::Redirect(path) => Redirect::to(path).into_response(),
        Action::Render(value) => Json(value).into_response(),
    };
    if fresh {
        resp.headers_mut().insert(header::SET_COOKIE, set_session_cookie(token));
    }
    resp
}

async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (token, fresh) = resolve_session(&state, &headers);
    let username = state.sessions.username_for(&token);
    let messages = state.sessions.drain_flash(&token);
    let action = pages::home_page(&state.submissions, username.as_deref(), messages).await;
    apply(&state, &token, fresh, action, None)
}

async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<SubmitPayload>,
) -> Response {
    let (token, fresh) = resolve_session(&state, &headers);
    let username = state.sessions.username_for(&token);
    let (action, flash) =
        pages::submit_data(&state.submissions, username.as_deref(), &payload.input_data).await;
    apply(&state, &token, fresh, action, flash)
}

async fn login_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (token, fresh) = resolve_session(&state, &headers);
    apply(&state, &token, fresh, Action::Render(json!({"page": "login"})), None)
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<LoginPayload>,
) -> Response {
    let (token, fresh) = resolve_session(&state, &headers);
    let (action, flash) = pages::login_user(
        &state.auth,
        &state.sessions,
        &token,
        &payload.username,
        &payload.password,
    )
    .await;
    apply(&state, &token, fresh, action, flash)
}

async fn register_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (token, fresh) = resolve_session(&state, &headers);
    apply(
        &state,
        &token,
        fresh,
        Action::Render(json!({"page": "register", "errors": []})),
        None,
    )
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<RegisterPayload>,
) -> Response {
    let (token, fresh) = resolve_session(&state, &headers);
    let (action, flash) = pages::register_user(
        &state.auth,
        &payload.username,
        &payload.password,
        &payload.confirm_password,
    )
    .await;
    apply(&state, &token, fresh, action, flash)
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = parse_cookie(&headers, SESSION_COOKIE) {
        state.sessions.destroy(&token);
    }
    let mut resp = Redirect::to("/login").into_response();
    resp.headers_mut().insert(header::SET_COOKIE, clear_session_cookie());
    resp
}

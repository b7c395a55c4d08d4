//! Page-flow logic, kept free of framework types: each operation maps the
//! session view and request fields to an `Action` plus an optional `Flash`.
//! The axum handlers in the parent module apply the action, set cookies, and
//! enqueue the flash, so everything here is directly unit-testable.

use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::auth::AuthService;
use crate::error::{LoginError, RegisterError, SubmitError};
use crate::session::{Flash, SessionManager, Severity};
use crate::submit::SubmissionService;

/// What the boundary should do with the response.
#[derive(Debug, PartialEq)]
pub enum Action {
    Redirect(&'static str),
    Render(serde_json::Value),
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HomeView {
    pub username: Option<String>,
    pub messages: Vec<Flash>,
    pub history: Vec<String>,
}

/// GET /home: current flash messages, bound username, and the results history.
/// A store failure while reading history is logged and degrades to an empty
/// list so the page always renders.
pub async fn home_page(
    submissions: &SubmissionService,
    username: Option<&str>,
    messages: Vec<Flash>,
) -> Action {
    let history = match submissions.fetch_history(username).await {
        Ok(items) => items,
        Err(e) => {
            error!("history fetch failed: {}", e);
            Vec::new()
        }
    };
    let view = HomeView { username: username.map(|s| s.to_string()), messages, history };
    Action::Render(json!(view))
}

/// POST /home: append the submission to the caller's data list.
pub async fn submit_data(
    submissions: &SubmissionService,
    username: Option<&str>,
    input_data: &str,
) -> (Action, Option<Flash>) {
    match submissions.submit(username, input_data).await {
        Ok(()) => (
            Action::Redirect("/home"),
            Some(Flash { severity: Severity::Success, text: "Data submitted successfully.".into() }),
        ),
        Err(SubmitError::Unauthenticated) => (
            Action::Redirect("/login"),
            Some(Flash { severity: Severity::Warning, text: "Please log in to submit data.".into() }),
        ),
        Err(SubmitError::Store(e)) => {
            error!("submit failed: {}", e);
            (
                Action::Redirect("/home"),
                Some(Flash { severity: Severity::Error, text: "Failed to submit data.".into() }),
            )
        }
    }
}

/// POST /login: verify credentials and bind the session. Failures redirect
/// back to /login with no message, so unknown usernames and wrong passwords
/// look identical to the client.
pub async fn login_user(
    auth: &AuthService,
    sessions: &SessionManager,
    token: &str,
    username: &str,
    password: &str,
) -> (Action, Option<Flash>) {
    match auth.login(sessions, token, username, password).await {
        Ok(()) => (Action::Redirect("/home"), None),
        Err(LoginError::InvalidCredentials) => (Action::Redirect("/login"), None),
        Err(LoginError::Store(e)) => {
            error!("login failed: {}", e);
            (Action::Redirect("/login"), None)
        }
    }
}

/// POST /register: validate, then atomically claim the username.
/// A taken username redirects back with no explicit message.
pub async fn register_user(
    auth: &AuthService,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> (Action, Option<Flash>) {
    match auth.register(username, password, confirm_password).await {
        Ok(()) => (Action::Redirect("/login"), None),
        Err(e @ (RegisterError::TooShort | RegisterError::Mismatch)) => (
            Action::Render(json!({"page": "register", "errors": [e.to_string()]})),
            None,
        ),
        Err(RegisterError::AlreadyExists) => (Action::Redirect("/register"), None),
        Err(e) => {
            error!("register failed: {}", e);
            (
                Action::Redirect("/register"),
                Some(Flash { severity: Severity::Error, text: "Registration failed.".into() }),
            )
        }
    }
}

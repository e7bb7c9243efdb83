//! Login, registration and logout.
//!
//! Authentication itself happens on the remote backend; this module owns the
//! forms, the password-confirmation pre-check (no network call on mismatch),
//! the session cookie, and the clear-all logout.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::RegisterPayload;
use crate::app::AppState;
use crate::guard::SESSION_COOKIE;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub dob: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthPageQuery {
    pub error: Option<String>,
    pub registered: Option<String>,
}

/// Serve the login page, with any redirect message injected
pub async fn serve_login(Query(query): Query<AuthPageQuery>) -> Html<String> {
    let mut page = include_str!("./static/login.html").to_string();
    let notice = if query.registered.is_some() {
        r#"<p class="success">Registration successful. Please log in.</p>"#.to_string()
    } else {
        message_fragment(&query.error)
    };
    page = page.replace("<!--MESSAGE-->", &notice);
    Html(page)
}

/// Serve the registration page
pub async fn serve_register(Query(query): Query<AuthPageQuery>) -> Html<String> {
    let page = include_str!("./static/register.html")
        .replace("<!--MESSAGE-->", &message_fragment(&query.error));
    Html(page)
}

/// Handle a login submission: authenticate against the backend, persist the
/// user record and a fresh session token, set the cookie, go to the
/// dashboard.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<LoginForm>,
) -> Response {
    match state.api.login(&credentials.email, &credentials.password).await {
        Ok(user) => {
            let token = Uuid::new_v4().to_string();
            state.store.set_user(&user);
            state.store.set_session_token(&token);
            tracing::info!("user {} logged in", user.email);

            let cookie = Cookie::new(SESSION_COOKIE, token);
            (jar.add(cookie), Redirect::to("/dashboard")).into_response()
        }
        Err(e) => {
            tracing::warn!("login failed for {}: {}", credentials.email, e);
            redirect_with_error("/login", &e.to_string())
        }
    }
}

/// Handle a registration submission. The confirmation mismatch is caught
/// here, before any network call.
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.confirm_password {
        return redirect_with_error("/register", "Passwords do not match");
    }

    let payload = RegisterPayload {
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        dob: form.dob,
        password: form.password,
    };

    match state.api.register(&payload).await {
        Ok(()) => Redirect::to("/login?registered=true").into_response(),
        Err(e) => redirect_with_error("/register", &e.to_string()),
    }
}

/// Log out: wipe the whole store (session AND workflow artifacts) and drop
/// the cookie.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    state.store.clear();
    let cookie = Cookie::new(SESSION_COOKIE, "");
    (jar.add(cookie), Redirect::to("/login"))
}

/// Redirect back to `path` with an urlencoded inline error message
pub fn redirect_with_error(path: &str, message: &str) -> Response {
    Redirect::to(&format!("{}?error={}", path, urlencoding::encode(message))).into_response()
}

/// Inline error fragment for page shells
pub fn message_fragment(error: &Option<String>) -> String {
    match error {
        Some(message) => format!(r#"<p class="error">{}</p>"#, escape_html(message)),
        None => String::new(),
    }
}

/// Minimal HTML escaping for user-visible text injected into page shells
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

//! Route guard: decides, once per navigation, whether the requested route is
//! accessible given the session state, and where to redirect otherwise.
//!
//! A session going stale mid-view is only noticed on the next navigation;
//! that window is accepted.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::app::AppState;

/// Name of the session cookie issued at login
pub const SESSION_COOKIE: &str = "session";

/// Access class of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Landing, login, register: for unauthenticated visitors
    Public,
    /// Everything behind the dashboard
    Private,
}

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    ToLogin,
    ToDashboard,
}

/// The guard's transition rule. Private without a session goes to login;
/// Public with a session goes to the dashboard.
pub fn decide(access: RouteAccess, authenticated: bool) -> GuardDecision {
    match (access, authenticated) {
        (RouteAccess::Private, false) => GuardDecision::ToLogin,
        (RouteAccess::Public, true) => GuardDecision::ToDashboard,
        _ => GuardDecision::Allow,
    }
}

/// A request is authenticated when its session cookie matches the stored
/// token and a user record is present.
fn session_is_valid(state: &AppState, jar: &CookieJar) -> bool {
    let cookie_token = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return false,
    };
    match state.store.session_token() {
        Some(token) => token == cookie_token && state.store.authenticated(),
        None => false,
    }
}

/// Middleware for the private sub-router
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    match decide(RouteAccess::Private, session_is_valid(&state, &jar)) {
        GuardDecision::Allow => next.run(request).await,
        _ => Redirect::to("/login").into_response(),
    }
}

/// Middleware for the public sub-router
pub async fn redirect_authenticated(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    match decide(RouteAccess::Public, session_is_valid(&state, &jar)) {
        GuardDecision::Allow => next.run(request).await,
        _ => Redirect::to("/dashboard").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_without_session_goes_to_login() {
        assert_eq!(
            decide(RouteAccess::Private, false),
            GuardDecision::ToLogin
        );
    }

    #[test]
    fn private_with_session_is_allowed() {
        assert_eq!(decide(RouteAccess::Private, true), GuardDecision::Allow);
    }

    #[test]
    fn public_with_session_goes_to_dashboard() {
        assert_eq!(
            decide(RouteAccess::Public, true),
            GuardDecision::ToDashboard
        );
    }

    #[test]
    fn public_without_session_is_allowed() {
        assert_eq!(decide(RouteAccess::Public, false), GuardDecision::Allow);
    }
}

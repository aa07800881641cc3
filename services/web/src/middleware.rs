//! Session gate middleware
//!
//! Runs once per incoming request, before any handler: resolves the
//! current identity from the cookie carrier and applies the route
//! protection policy. The gate is stateless across requests; identity
//! is re-resolved from the carrier every time rather than cached
//! server-side, so a revoked session stops working on the next request.

use axum::{
    body::Body,
    extract::State,
    http::{Request, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::error;

use crate::identity::{Identity, TokenPair};
use crate::state::AppState;

/// Cookie carrying the provider's access token
pub const ACCESS_COOKIE: &str = "sl_access_token";
/// Cookie carrying the provider's refresh token
pub const REFRESH_COOKIE: &str = "sl_refresh_token";

/// Protection class of a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// Requires a resolved identity
    Protected,
    /// Login entry point; authenticated users are bounced home
    Public,
    /// Passed through untouched
    Unclassified,
}

impl RoutePolicy {
    /// Classify a request path
    pub fn classify(path: &str) -> Self {
        if path == "/" || path == "/history" || path.starts_with("/history/") {
            RoutePolicy::Protected
        } else if path == "/login" {
            RoutePolicy::Public
        } else {
            RoutePolicy::Unclassified
        }
    }
}

/// Gate outcome for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateDecision {
    RedirectToLogin,
    RedirectToHome,
    PassThrough,
}

fn decide(policy: RoutePolicy, authenticated: bool) -> GateDecision {
    match policy {
        RoutePolicy::Protected if !authenticated => GateDecision::RedirectToLogin,
        RoutePolicy::Public if authenticated => GateDecision::RedirectToHome,
        _ => GateDecision::PassThrough,
    }
}

/// Session gate, applied to the whole router
///
/// Resolved identity is inserted into the request extensions for
/// handlers. Rotated credentials are attached to the outgoing response
/// on every path through the gate, redirects included, so the session
/// stays alive across requests.
pub async fn session_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let policy = RoutePolicy::classify(req.uri().path());
    let (identity, rotated) = resolve_identity(&state, &jar).await;

    let response = match decide(policy, identity.is_some()) {
        GateDecision::RedirectToLogin => {
            Redirect::temporary(&rewrite_path(req.uri(), "/login")).into_response()
        }
        GateDecision::RedirectToHome => {
            Redirect::temporary(&rewrite_path(req.uri(), "/")).into_response()
        }
        GateDecision::PassThrough => {
            if let Some(identity) = identity {
                req.extensions_mut().insert(identity);
            }
            next.run(req).await
        }
    };

    match rotated {
        Some(pair) => {
            let jar = CookieJar::new()
                .add(session_cookie(ACCESS_COOKIE, pair.access_token.clone()))
                .add(session_cookie(REFRESH_COOKIE, pair.refresh_token.clone()));
            (jar, response).into_response()
        }
        None => response,
    }
}

/// Resolve the identity behind the request's cookies
///
/// Tries the access token first; when it no longer resolves and a
/// refresh token is present, exchanges it and reports the rotated pair
/// so the gate can re-attach it. Provider failures resolve to
/// unauthenticated rather than failing the request.
async fn resolve_identity(
    state: &AppState,
    jar: &CookieJar,
) -> (Option<Identity>, Option<TokenPair>) {
    if let Some(access) = jar.get(ACCESS_COOKIE) {
        match state.identity.current_user(access.value()).await {
            Ok(Some(identity)) => return (Some(identity), None),
            Ok(None) => {}
            Err(e) => {
                error!("Failed to resolve identity: {}", e);
                return (None, None);
            }
        }
    }

    if let Some(refresh) = jar.get(REFRESH_COOKIE) {
        match state.identity.refresh(refresh.value()).await {
            Ok(pair) => {
                let identity = pair.user.clone();
                return (Some(identity), Some(pair));
            }
            Err(e) => {
                error!("Failed to refresh session: {}", e);
            }
        }
    }

    (None, None)
}

/// Build a session cookie for token material
pub fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie removals for sign-out
pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/").build())
        .remove(Cookie::build(REFRESH_COOKIE).path("/").build())
}

/// Rewrite the path of a request URI, preserving the query
fn rewrite_path(uri: &Uri, path: &str) -> String {
    match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    }
}

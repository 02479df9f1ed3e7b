use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use cookie::{Cookie, SameSite};
use tracing::warn;

use sprintspace_auth::{Identity, JwtValidator};

use crate::app::errors::ApiError;
use crate::app::services::Clock;
use crate::config::AuthTransport;
use crate::context::PrincipalContext;

/// Name of the session cookie in cookie transport.
pub const TOKEN_COOKIE: &str = "token";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub transport: AuthTransport,
    /// Same clock the token endpoints issue with.
    pub clock: Clock,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match state.transport {
        AuthTransport::Cookie => extract_cookie(req.headers(), TOKEN_COOKIE),
        AuthTransport::Header => extract_bearer(req.headers()).map(str::to_owned),
    }
    .ok_or(ApiError::Unauthenticated)?;

    let claims = state.jwt.validate(&token, state.clock.now()).map_err(|e| {
        warn!(error = %e, path = %req.uri().path(), "rejected token");
        ApiError::from(e)
    })?;

    let identity = Identity::new(claims.email).map_err(|e| ApiError::InvalidToken(e.to_string()))?;
    req.extensions_mut().insert(PrincipalContext::new(identity));

    Ok(next.run(req).await)
}

/// `Authorization: Bearer <token>`, or the bare token.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!token.is_empty()).then_some(token)
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(token: &str, max_age: chrono::Duration, secure: bool) -> Option<HeaderValue> {
    token_cookie(token.to_string(), max_age.num_seconds(), secure)
}

/// `Set-Cookie` value that expires the session cookie.
pub fn cleared_cookie(secure: bool) -> Option<HeaderValue> {
    token_cookie(String::new(), 0, secure)
}

/// Cross-site deployments need `SameSite=None`, which browsers only accept
/// together with `Secure`.
fn token_cookie(value: String, max_age_secs: i64, secure: bool) -> Option<HeaderValue> {
    let same_site = if secure { SameSite::None } else { SameSite::Strict };
    let cookie = Cookie::build((TOKEN_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(same_site)
        .secure(secure)
        .max_age(cookie::time::Duration::seconds(max_age_secs))
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

//! Token issuing and session cookie handling.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{info, warn};

use sprintspace_auth::Identity;

use crate::app::dto::LoginRequest;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::config::AuthTransport;
use crate::middleware;

/// `POST /jwt`: sign a token for `{email}` or `{user: {email}}`.
pub async fn issue_token(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let email = body
        .get("email")
        .or_else(|| body.get("user").and_then(|user| user.get("email")))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Validation("email is required".to_string()))?;

    let identity = Identity::new(email)?;
    token_response(&services, &identity)
}

/// `POST /login`: exchange the configured credential pair for a token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;

    let accepted = services
        .config
        .login
        .as_ref()
        .is_some_and(|creds| creds.verify(&body.email, &body.password));
    if !accepted {
        warn!(email = %body.email, "login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let identity = Identity::new(body.email)?;
    token_response(&services, &identity)
}

pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = middleware::cleared_cookie(services.config.cookie_secure) {
        headers.insert(header::SET_COOKIE, cookie);
    }
    (StatusCode::OK, headers, Json(json!({ "success": "Logged out" }))).into_response()
}

fn token_response(services: &AppServices, identity: &Identity) -> Result<Response, ApiError> {
    let issued = services.tokens.issue(identity, services.clock.now())?;
    info!(email = %identity, exp = issued.claims.exp, "token issued");

    let mut headers = HeaderMap::new();
    if services.config.auth_transport == AuthTransport::Cookie {
        let cookie = middleware::session_cookie(&issued.token, services.tokens.ttl(), services.config.cookie_secure)
            .ok_or_else(|| ApiError::Internal("token is not a valid cookie value".to_string()))?;
        headers.insert(header::SET_COOKIE, cookie);
    }

    Ok((
        StatusCode::OK,
        headers,
        Json(json!({ "success": "Token sent", "token": issued.token })),
    )
        .into_response())
}

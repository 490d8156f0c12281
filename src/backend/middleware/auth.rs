/**
 * Authentication Middleware
 *
 * This module protects routes that require a signed-in user. It verifies
 * the bearer token, resolves the token identifier to a user row and attaches
 * the `User` to the request extensions.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::backend::users::db as user_db;
use crate::shared::messaging::User;

/// Extract the bearer token from an `Authorization` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
///
/// 1. Extracts the JWT from the Authorization header
/// 2. Verifies it
/// 3. Looks up the user by token identifier
/// 4. Attaches the user to the request extensions
///
/// Returns 401 when the token is missing or invalid, or the user is unknown.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Authorization header");
            BackendError::unauthorized("Unauthorized")
        })?;

    let token = bearer_token(header).ok_or_else(|| {
        tracing::warn!("Invalid Authorization header format");
        BackendError::unauthorized("Unauthorized")
    })?;

    let claims = app_state.verifier.verify(token).map_err(|e| {
        tracing::warn!("Invalid token: {:?}", e);
        BackendError::unauthorized("Unauthorized")
    })?;

    let user = user_db::get_user_by_token(&app_state.pool, &claims.token_identifier())
        .await?
        .ok_or_else(|| {
            tracing::warn!(sub = %claims.sub, "token is valid but user is unknown");
            BackendError::unauthorized("User not found")
        })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Axum extractor for the authenticated user
///
/// Only valid on routes behind `auth_middleware`.
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                tracing::warn!("User not found in request extensions");
                BackendError::unauthorized("Unauthorized")
            })
    }
}

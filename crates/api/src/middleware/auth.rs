//! Optional bearer authentication.
//!
//! Expense reads are open to anonymous requesters, who simply get the most
//! redacted view. A request without an `Authorization` header passes
//! through unauthenticated; a request with a bad token is rejected.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{AppState, error::ApiError};
use hostfund_shared::{AppError, Claims, JwtError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Validates a bearer token when one is present and stores its claims in
/// the request extensions.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return next.run(request).await;
    };

    let Some(token) = header.to_str().ok().and_then(extract_bearer_token) else {
        return ApiError(AppError::Unauthorized(
            "Authorization header must use the Bearer scheme".to_string(),
        ))
        .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(JwtError::Expired) => {
            ApiError(AppError::Unauthorized("Token has expired".to_string())).into_response()
        }
        Err(_) => ApiError(AppError::Unauthorized(
            "Invalid or malformed token".to_string(),
        ))
        .into_response(),
    }
}

/// Claims of the requester, if the request was authenticated.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Claims>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Claims>().cloned()))
    }
}

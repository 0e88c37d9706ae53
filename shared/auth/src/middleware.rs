use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use workup_common::AppError;

use crate::jwt::{Claims, JwtService};

/// Requires a valid `Authorization: Bearer <token>` header.
#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    JwtService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token_from_headers(&parts.headers).ok_or_else(|| {
            AppError::Authentication("Missing or invalid authorization header".to_string())
        })?;

        JwtService::from_ref(state)
            .validate_token(token)
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))
    }
}

/// Session claims when a token is presented. A missing header yields `None`;
/// a header carrying a bad token is still rejected with 401.
#[derive(Debug, Clone)]
pub struct OptionalClaims(pub Option<Claims>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalClaims
where
    JwtService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalClaims(None));
        }
        Claims::from_request_parts(parts, state).await.map(|claims| OptionalClaims(Some(claims)))
    }
}

impl OptionalClaims {
    /// Rejects the request when a session is present but belongs to another user.
    pub fn ensure_user(&self, user_id: i32) -> Result<(), AppError> {
        match &self.0 {
            Some(claims) if claims.user_id()? != user_id => Err(AppError::Authorization(
                "Session does not match the acting user".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Subject of the session, if one was presented.
    pub fn user_id(&self) -> Result<Option<i32>, AppError> {
        self.0.as_ref().map(Claims::user_id).transpose()
    }
}

/// Extract JWT token from Authorization header
pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

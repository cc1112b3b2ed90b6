//! Authentication middleware.
//!
//! Document routes take a Bearer token. When `AUTH_SECRET` is configured the
//! token must equal it; otherwise requests are accepted anonymously.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::AppState;

/// Authenticated caller extracted from request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    Anonymous,
    Token,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.auth_secret.as_deref() else {
            return Ok(AuthUser::Anonymous);
        };

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth_header {
            Some(header) => match header.strip_prefix("Bearer ") {
                Some(token) if token.is_empty() => {
                    Err((StatusCode::UNAUTHORIZED, "Empty bearer token"))
                }
                Some(token) if token == secret => Ok(AuthUser::Token),
                Some(_) => Err((StatusCode::UNAUTHORIZED, "Invalid bearer token")),
                None => Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid authorization header format",
                )),
            },
            None => Err((StatusCode::UNAUTHORIZED, "Missing authorization header")),
        }
    }
}

//! User JWT authentication middleware.
//!
//! Tokens are issued by the external auth provider; the `sub` claim is the
//! user id every profile, emergency and assignment is keyed by.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::jwt::{extract_user_id, JwtConfig, JwtError};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Query parameter accepted in place of the Authorization header.
/// `EventSource` cannot set headers, so the SSE endpoint relies on it.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Authenticated user information extracted from JWT.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// User ID from the JWT subject claim.
    pub user_id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl UserAuth {
    /// Validates an access token and returns user authentication info.
    pub fn validate(jwt_config: &JwtConfig, token: &str) -> Result<Self, JwtError> {
        let claims = jwt_config.validate_token(token)?;
        let user_id = extract_user_id(&claims)?;

        Ok(UserAuth {
            user_id,
            email: claims.email,
            name: claims.name,
        })
    }
}

/// Bearer token from the Authorization header, or the `access_token` query parameter.
pub fn find_token<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> Option<&'a str> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    from_header.or_else(|| {
        uri.query()?.split('&').find_map(|pair| {
            pair.strip_prefix(ACCESS_TOKEN_PARAM)
                .and_then(|rest| rest.strip_prefix('='))
                .filter(|t| !t.is_empty())
        })
    })
}

/// Middleware that requires JWT user authentication.
///
/// Validated user information is stored in request extensions for the
/// [`UserAuth`] extractor.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match find_token(req.headers(), req.uri()) {
        Some(token) => token,
        None => {
            return ApiError::Unauthorized("Missing or invalid Authorization header".into())
                .into_response()
        }
    };

    match UserAuth::validate(&state.jwt, token) {
        Ok(auth) => {
            tracing::debug!(user_id = %auth.user_id, "Request authenticated");
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::from(e).into_response()
        }
    }
}

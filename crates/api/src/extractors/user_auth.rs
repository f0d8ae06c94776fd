//! User JWT authentication extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::{find_token, UserAuth};

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already validated by `require_user_auth`
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(auth.clone());
        }

        let token = find_token(&parts.headers, &parts.uri)
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        Ok(UserAuth::validate(&state.jwt, token)?)
    }
}

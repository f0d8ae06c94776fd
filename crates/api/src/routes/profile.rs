//! Profile endpoint handlers.

use axum::{extract::State, Json};
use domain::models::profile::{ProfileResponse, UpsertProfileRequest};
use domain::models::{location::UpdateLocationRequest, UserProfile};
use persistence::repositories::ProfileRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;

/// Loads the caller's profile; reporting and operating both require one.
pub(crate) async fn require_profile(
    state: &AppState,
    user_id: Uuid,
) -> Result<UserProfile, ApiError> {
    ProfileRepository::new(state.pool.clone())
        .find_by_user_id(user_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))
}

/// Get the caller's profile.
///
/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = require_profile(&state, auth.user_id).await?;
    Ok(Json(profile.into()))
}

/// Create or update the caller's profile.
///
/// PUT /api/v1/profile
pub async fn upsert_profile(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<UpsertProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    request.validate()?;

    // Fall back to the email the identity provider vouched for
    let email = request.email.as_deref().or(auth.email.as_deref());

    let entity = ProfileRepository::new(state.pool.clone())
        .upsert(
            auth.user_id,
            request.display_name.trim(),
            email,
            request.is_operator,
        )
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(
                "Cannot drop the operator role while an assignment is active".to_string(),
            )
        })?;

    let profile: UserProfile = entity.into();
    info!(
        user_id = %profile.user_id,
        is_operator = profile.is_operator,
        "Profile saved"
    );

    Ok(Json(profile.into()))
}

/// Store the caller's last-known position, used for proximity dispatch.
///
/// PUT /api/v1/profile/location
pub async fn update_location(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    request.validate()?;
    let point = request.point();

    let entity = ProfileRepository::new(state.pool.clone())
        .update_location(auth.user_id, point.latitude, point.longitude)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    let profile: UserProfile = entity.into();
    Ok(Json(profile.into()))
}

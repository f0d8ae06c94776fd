//! User profile domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::location::GeoPoint;

/// Application profile of an authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    /// Subject of the auth provider's token
    pub user_id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub is_operator: bool,
    pub last_location: Option<GeoPoint>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub active_emergency_id: Option<Uuid>,
    pub active_assignment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating or replacing the caller's profile.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileRequest {
    #[validate(
        length(min = 1, max = 50, message = "Display name must be 1-50 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub display_name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[serde(default)]
    pub is_operator: bool,
}

/// Response payload for profile operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_operator: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_emergency_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_assignment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(p: UserProfile) -> Self {
        Self {
            user_id: p.user_id,
            display_name: p.display_name,
            email: p.email,
            is_operator: p.is_operator,
            last_location: p.last_location,
            location_updated_at: p.location_updated_at,
            active_emergency_id: p.active_emergency_id,
            active_assignment_id: p.active_assignment_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

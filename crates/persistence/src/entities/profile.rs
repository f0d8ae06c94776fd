//! User profile database entity.

use chrono::{DateTime, Utc};
use domain::models::GeoPoint;
use domain::services::OperatorCandidate;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for user_profiles table.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileEntity {
    pub id: i64,
    pub user_id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub is_operator: bool,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub active_emergency_id: Option<Uuid>,
    pub active_assignment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileEntity> for domain::models::UserProfile {
    fn from(entity: ProfileEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            display_name: entity.display_name,
            email: entity.email,
            is_operator: entity.is_operator,
            last_location: GeoPoint::from_parts(entity.last_latitude, entity.last_longitude),
            location_updated_at: entity.location_updated_at,
            active_emergency_id: entity.active_emergency_id,
            active_assignment_id: entity.active_assignment_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Projection of an operator's last-known position.
#[derive(Debug, Clone, FromRow)]
pub struct OperatorLocationEntity {
    pub user_id: Uuid,
    pub last_latitude: f64,
    pub last_longitude: f64,
}

impl From<OperatorLocationEntity> for OperatorCandidate {
    fn from(entity: OperatorLocationEntity) -> Self {
        Self {
            user_id: entity.user_id,
            location: GeoPoint::new(entity.last_latitude, entity.last_longitude),
        }
    }
}

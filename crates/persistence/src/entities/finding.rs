//! Finding database entity.

use chrono::{DateTime, Utc};
use domain::models::GeoPoint;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for findings table.
#[derive(Debug, Clone, FromRow)]
pub struct FindingEntity {
    pub id: i64,
    pub finding_id: Uuid,
    pub assignment_id: Uuid,
    pub emergency_id: Uuid,
    pub operator_id: Uuid,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FindingEntity> for domain::models::Finding {
    fn from(entity: FindingEntity) -> Self {
        Self {
            id: entity.id,
            finding_id: entity.finding_id,
            assignment_id: entity.assignment_id,
            emergency_id: entity.emergency_id,
            operator_id: entity.operator_id,
            description: entity.description,
            location: GeoPoint::from_parts(entity.latitude, entity.longitude),
            image: entity.image,
            created_at: entity.created_at,
        }
    }
}

//! Emergency database entity.

use chrono::{DateTime, Utc};
use domain::models::{EmergencyStatus, EmergencyType, GeoPoint};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for emergencies table.
#[derive(Debug, Clone, FromRow)]
pub struct EmergencyEntity {
    pub id: i64,
    pub emergency_id: Uuid,
    pub reporter_id: Uuid,
    pub emergency_type: String,
    pub details: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<EmergencyEntity> for domain::models::Emergency {
    fn from(entity: EmergencyEntity) -> Self {
        let status = EmergencyStatus::parse(&entity.status).unwrap_or_else(|| {
            tracing::warn!(
                emergency_id = %entity.emergency_id,
                status = %entity.status,
                "Unknown emergency status in database"
            );
            EmergencyStatus::Active
        });

        Self {
            id: entity.id,
            emergency_id: entity.emergency_id,
            reporter_id: entity.reporter_id,
            emergency_type: EmergencyType::parse(&entity.emergency_type),
            details: entity.details,
            location: GeoPoint::new(entity.latitude, entity.longitude),
            address: entity.address,
            status,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            resolved_at: entity.resolved_at,
        }
    }
}

//! Search assignment database entity.

use chrono::{DateTime, Utc};
use domain::models::{AssignmentStatus, GeoPoint, SearchArea};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for search_assignments table.
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentEntity {
    pub id: i64,
    pub assignment_id: Uuid,
    pub emergency_id: Uuid,
    pub operator_id: Uuid,
    pub status: String,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub area_north: f64,
    pub area_south: f64,
    pub area_east: f64,
    pub area_west: f64,
    pub drone_latitude: Option<f64>,
    pub drone_longitude: Option<f64>,
    pub drone_accuracy: Option<f64>,
    pub drone_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<AssignmentEntity> for domain::models::SearchAssignment {
    fn from(entity: AssignmentEntity) -> Self {
        let status = AssignmentStatus::parse(&entity.status).unwrap_or(AssignmentStatus::Active);

        Self {
            id: entity.id,
            assignment_id: entity.assignment_id,
            emergency_id: entity.emergency_id,
            operator_id: entity.operator_id,
            status,
            start_location: GeoPoint::new(entity.start_latitude, entity.start_longitude),
            search_area: SearchArea {
                north: entity.area_north,
                south: entity.area_south,
                east: entity.area_east,
                west: entity.area_west,
            },
            drone_location: GeoPoint::from_parts(entity.drone_latitude, entity.drone_longitude),
            drone_updated_at: entity.drone_updated_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            completed_at: entity.completed_at,
        }
    }
}

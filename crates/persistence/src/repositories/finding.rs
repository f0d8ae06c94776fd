//! Finding repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::FindingEntity;

/// Repository for finding database operations.
#[derive(Clone)]
pub struct FindingRepository {
    pool: PgPool,
}

impl FindingRepository {
    /// Creates a new finding repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a finding against an assignment.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        assignment_id: Uuid,
        emergency_id: Uuid,
        operator_id: Uuid,
        description: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
        image: Option<&str>,
    ) -> Result<FindingEntity, sqlx::Error> {
        sqlx::query_as::<_, FindingEntity>(
            r#"
            INSERT INTO findings (
                assignment_id,
                emergency_id,
                operator_id,
                description,
                latitude,
                longitude,
                image
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(emergency_id)
        .bind(operator_id)
        .bind(description)
        .bind(latitude)
        .bind(longitude)
        .bind(image)
        .fetch_one(&self.pool)
        .await
    }

    /// Findings on an emergency, newest first.
    pub async fn list_for_emergency(
        &self,
        emergency_id: Uuid,
    ) -> Result<Vec<FindingEntity>, sqlx::Error> {
        sqlx::query_as::<_, FindingEntity>(
            r#"
            SELECT * FROM findings
            WHERE emergency_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(emergency_id)
        .fetch_all(&self.pool)
        .await
    }
}

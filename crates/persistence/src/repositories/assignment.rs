//! Search assignment repository implementation.

use chrono::{DateTime, Utc};
use domain::models::SearchAssignment;
use sqlx::PgPool;
use uuid::Uuid;

use super::emergency::close_assignment;
use crate::entities::AssignmentEntity;
use crate::error::WorkflowError;
use crate::metrics::QueryTimer;

/// Repository for search assignment database operations.
#[derive(Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    /// Creates a new assignment repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds an assignment by its public id.
    pub async fn find_by_assignment_id(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<AssignmentEntity>, sqlx::Error> {
        sqlx::query_as::<_, AssignmentEntity>(
            r#"
            SELECT * FROM search_assignments
            WHERE assignment_id = $1
            "#,
        )
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Lists an operator's assignments, newest first.
    pub async fn list_for_operator(
        &self,
        operator_id: Uuid,
        status: Option<&str>,
        emergency_id: Option<Uuid>,
    ) -> Result<Vec<AssignmentEntity>, sqlx::Error> {
        sqlx::query_as::<_, AssignmentEntity>(
            r#"
            SELECT * FROM search_assignments
            WHERE operator_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::UUID IS NULL OR emergency_id = $3)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(operator_id)
        .bind(status)
        .bind(emergency_id)
        .fetch_all(&self.pool)
        .await
    }

    /// All assignments on an emergency.
    pub async fn list_for_emergency(
        &self,
        emergency_id: Uuid,
    ) -> Result<Vec<AssignmentEntity>, sqlx::Error> {
        sqlx::query_as::<_, AssignmentEntity>(
            r#"
            SELECT * FROM search_assignments
            WHERE emergency_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(emergency_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Number of active assignments on an emergency.
    pub async fn count_active_for_emergency(&self, emergency_id: Uuid) -> Result<i64, sqlx::Error> {
        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM search_assignments
            WHERE emergency_id = $1 AND status = 'active'
            "#,
        )
        .bind(emergency_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(result.0)
    }

    /// The operator's active assignment, if any.
    pub async fn find_active_for_operator(
        &self,
        operator_id: Uuid,
    ) -> Result<Option<AssignmentEntity>, sqlx::Error> {
        sqlx::query_as::<_, AssignmentEntity>(
            r#"
            SELECT * FROM search_assignments
            WHERE operator_id = $1 AND status = 'active'
            "#,
        )
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Records the latest drone fix. Last write wins; closed assignments are left untouched.
    pub async fn update_drone_location(
        &self,
        assignment_id: Uuid,
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
        fixed_at: DateTime<Utc>,
    ) -> Result<Option<AssignmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_drone_location");
        let result = sqlx::query_as::<_, AssignmentEntity>(
            r#"
            UPDATE search_assignments
            SET
                drone_latitude = $2,
                drone_longitude = $3,
                drone_accuracy = $4,
                drone_updated_at = $5,
                updated_at = NOW()
            WHERE assignment_id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(latitude)
        .bind(longitude)
        .bind(accuracy)
        .bind(fixed_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Operator closes their assignment. The emergency status is not touched.
    pub async fn complete(
        &self,
        assignment_id: Uuid,
        operator_id: Uuid,
    ) -> Result<AssignmentEntity, WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let assignment: SearchAssignment = sqlx::query_as::<_, AssignmentEntity>(
            r#"
            SELECT * FROM search_assignments
            WHERE assignment_id = $1
            FOR UPDATE
            "#,
        )
        .bind(assignment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::AssignmentNotFound)?
        .into();

        assignment.check_writable_by(operator_id)?;

        let closed = close_assignment(&mut tx, &assignment).await?;
        tx.commit().await?;
        Ok(closed)
    }
}

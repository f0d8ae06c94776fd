//! Emergency repository implementation.
//!
//! Status changes that touch more than one table (accept, complete, resolve)
//! run in a single transaction with the emergency row locked, so concurrent
//! requests against the same emergency are serialized.

use domain::models::{
    Emergency, EmergencyAction, EmergencyStatus, SearchArea, SearchAssignment, UserProfile,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{AssignmentEntity, EmergencyEntity, ProfileEntity};
use crate::error::WorkflowError;
use crate::metrics::QueryTimer;

/// Result of an operator accepting an emergency.
#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    pub emergency: EmergencyEntity,
    pub assignment: AssignmentEntity,
    /// True when this acceptance moved the emergency out of `active`.
    pub first_acceptance: bool,
}

/// Result of an operator completing an emergency.
#[derive(Debug, Clone)]
pub struct CompleteOutcome {
    pub emergency: EmergencyEntity,
    pub assignment: AssignmentEntity,
}

/// Result of the reporter resolving an emergency.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub emergency: EmergencyEntity,
    /// Assignments that were still active and got closed.
    pub closed_assignments: Vec<AssignmentEntity>,
    /// Every operator who ever held an assignment on the emergency.
    pub operator_ids: Vec<Uuid>,
}

/// Repository for emergency database operations.
#[derive(Clone)]
pub struct EmergencyRepository {
    pool: PgPool,
}

impl EmergencyRepository {
    /// Creates a new emergency repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a new emergency and links it to the reporter's profile.
    pub async fn create(
        &self,
        reporter_id: Uuid,
        emergency_type: &str,
        details: &str,
        latitude: f64,
        longitude: f64,
        address: Option<&str>,
    ) -> Result<EmergencyEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_emergency");
        let mut tx = self.pool.begin().await?;

        let emergency = sqlx::query_as::<_, EmergencyEntity>(
            r#"
            INSERT INTO emergencies (reporter_id, emergency_type, details, latitude, longitude, address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(reporter_id)
        .bind(emergency_type)
        .bind(details)
        .bind(latitude)
        .bind(longitude)
        .bind(address)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET active_emergency_id = $2, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(reporter_id)
        .bind(emergency.emergency_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(emergency)
    }

    /// Finds an emergency by its public id.
    pub async fn find_by_emergency_id(
        &self,
        emergency_id: Uuid,
    ) -> Result<Option<EmergencyEntity>, sqlx::Error> {
        sqlx::query_as::<_, EmergencyEntity>(
            r#"
            SELECT * FROM emergencies
            WHERE emergency_id = $1
            "#,
        )
        .bind(emergency_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// The reporter's emergency that is not yet resolved, if any.
    pub async fn find_open_by_reporter(
        &self,
        reporter_id: Uuid,
    ) -> Result<Option<EmergencyEntity>, sqlx::Error> {
        sqlx::query_as::<_, EmergencyEntity>(
            r#"
            SELECT * FROM emergencies
            WHERE reporter_id = $1 AND status <> 'resolved'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(reporter_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Lists emergencies, newest first.
    pub async fn list(
        &self,
        status: Option<&str>,
        reporter_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<EmergencyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_emergencies");
        let result = sqlx::query_as::<_, EmergencyEntity>(
            r#"
            SELECT * FROM emergencies
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR reporter_id = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(status)
        .bind(reporter_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Operator takes on an emergency.
    ///
    /// Locks the emergency and the operator's profile, validates the transition,
    /// inserts the assignment with its search area and links it to the profile.
    pub async fn accept(
        &self,
        emergency_id: Uuid,
        operator_id: Uuid,
        search_half_width_m: f64,
    ) -> Result<AcceptOutcome, WorkflowError> {
        let timer = QueryTimer::new("accept_emergency");
        let result = self
            .try_accept(emergency_id, operator_id, search_half_width_m)
            .await;
        timer.finish(&result);
        result
    }

    /// Operator finishes the search on an emergency they are assigned to.
    pub async fn complete(
        &self,
        emergency_id: Uuid,
        operator_id: Uuid,
    ) -> Result<CompleteOutcome, WorkflowError> {
        let timer = QueryTimer::new("complete_emergency");
        let result = self.try_complete(emergency_id, operator_id).await;
        timer.finish(&result);
        result
    }

    /// Reporter closes their emergency. Remaining active assignments are closed with it.
    pub async fn resolve(
        &self,
        emergency_id: Uuid,
        actor_id: Uuid,
    ) -> Result<ResolveOutcome, WorkflowError> {
        let timer = QueryTimer::new("resolve_emergency");
        let result = self.try_resolve(emergency_id, actor_id).await;
        timer.finish(&result);
        result
    }

    async fn try_accept(
        &self,
        emergency_id: Uuid,
        operator_id: Uuid,
        search_half_width_m: f64,
    ) -> Result<AcceptOutcome, WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let locked = lock_emergency(&mut tx, emergency_id).await?;
        let emergency: Emergency = locked.clone().into();

        let profile: UserProfile = sqlx::query_as::<_, ProfileEntity>(
            r#"
            SELECT * FROM user_profiles
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(operator_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::ProfileNotFound)?
        .into();

        let next_status = emergency.check_accept(operator_id, profile.is_operator)?;

        let (already_assigned,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM search_assignments
                WHERE operator_id = $1 AND status = 'active'
            )
            "#,
        )
        .bind(operator_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_assigned {
            return Err(WorkflowError::AlreadyAssigned);
        }

        let start = profile.last_location.unwrap_or(emergency.location);
        let area = SearchArea::around(emergency.location, search_half_width_m);

        let assignment = sqlx::query_as::<_, AssignmentEntity>(
            r#"
            INSERT INTO search_assignments (
                emergency_id,
                operator_id,
                start_latitude,
                start_longitude,
                area_north,
                area_south,
                area_east,
                area_west
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(emergency_id)
        .bind(operator_id)
        .bind(start.latitude)
        .bind(start.longitude)
        .bind(area.north)
        .bind(area.south)
        .bind(area.east)
        .bind(area.west)
        .fetch_one(&mut *tx)
        .await?;

        let first_acceptance = emergency.status != next_status;
        let updated = if first_acceptance {
            set_status(&mut tx, emergency_id, next_status).await?
        } else {
            locked
        };

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET active_assignment_id = $2, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(operator_id)
        .bind(assignment.assignment_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AcceptOutcome {
            emergency: updated,
            assignment,
            first_acceptance,
        })
    }

    async fn try_complete(
        &self,
        emergency_id: Uuid,
        operator_id: Uuid,
    ) -> Result<CompleteOutcome, WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let emergency: Emergency = lock_emergency(&mut tx, emergency_id).await?.into();

        let assignment = sqlx::query_as::<_, AssignmentEntity>(
            r#"
            SELECT * FROM search_assignments
            WHERE emergency_id = $1 AND operator_id = $2 AND status = 'active'
            FOR UPDATE
            "#,
        )
        .bind(emergency_id)
        .bind(operator_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(domain::models::TransitionError::NotAssignedOperator)?;

        let next_status = emergency.status.apply(EmergencyAction::Complete)?;
        let updated = set_status(&mut tx, emergency_id, next_status).await?;
        let assignment = close_assignment(&mut tx, &assignment.into()).await?;

        tx.commit().await?;

        Ok(CompleteOutcome {
            emergency: updated,
            assignment,
        })
    }

    async fn try_resolve(
        &self,
        emergency_id: Uuid,
        actor_id: Uuid,
    ) -> Result<ResolveOutcome, WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let emergency: Emergency = lock_emergency(&mut tx, emergency_id).await?.into();
        let next_status = emergency.check_resolve(actor_id)?;
        let updated = set_status(&mut tx, emergency_id, next_status).await?;

        let open: Vec<AssignmentEntity> = sqlx::query_as(
            r#"
            SELECT * FROM search_assignments
            WHERE emergency_id = $1 AND status = 'active'
            FOR UPDATE
            "#,
        )
        .bind(emergency_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut closed_assignments = Vec::with_capacity(open.len());
        for entity in open {
            closed_assignments.push(close_assignment(&mut tx, &entity.into()).await?);
        }

        let operator_ids: Vec<Uuid> = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT DISTINCT operator_id FROM search_assignments
            WHERE emergency_id = $1
            "#,
        )
        .bind(emergency_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|(id,)| id)
        .collect();

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET active_emergency_id = NULL, updated_at = NOW()
            WHERE user_id = $1 AND active_emergency_id = $2
            "#,
        )
        .bind(actor_id)
        .bind(emergency_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ResolveOutcome {
            emergency: updated,
            closed_assignments,
            operator_ids,
        })
    }
}

/// Loads the emergency row with `FOR UPDATE`.
async fn lock_emergency(
    conn: &mut PgConnection,
    emergency_id: Uuid,
) -> Result<EmergencyEntity, WorkflowError> {
    sqlx::query_as::<_, EmergencyEntity>(
        r#"
        SELECT * FROM emergencies
        WHERE emergency_id = $1
        FOR UPDATE
        "#,
    )
    .bind(emergency_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(WorkflowError::EmergencyNotFound)
}

async fn set_status(
    conn: &mut PgConnection,
    emergency_id: Uuid,
    status: EmergencyStatus,
) -> Result<EmergencyEntity, sqlx::Error> {
    sqlx::query_as::<_, EmergencyEntity>(
        r#"
        UPDATE emergencies
        SET
            status = $2,
            resolved_at = CASE WHEN $2 = 'resolved' THEN NOW() ELSE resolved_at END,
            updated_at = NOW()
        WHERE emergency_id = $1
        RETURNING *
        "#,
    )
    .bind(emergency_id)
    .bind(status.as_str())
    .fetch_one(&mut *conn)
    .await
}

/// Marks a locked assignment completed and unlinks it from the operator's profile.
pub(crate) async fn close_assignment(
    conn: &mut PgConnection,
    assignment: &SearchAssignment,
) -> Result<AssignmentEntity, WorkflowError> {
    let next_status = assignment.status.complete()?;

    let closed = sqlx::query_as::<_, AssignmentEntity>(
        r#"
        UPDATE search_assignments
        SET status = $2, completed_at = NOW(), updated_at = NOW()
        WHERE assignment_id = $1
        RETURNING *
        "#,
    )
    .bind(assignment.assignment_id)
    .bind(next_status.as_str())
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE user_profiles
        SET active_assignment_id = NULL, updated_at = NOW()
        WHERE user_id = $1 AND active_assignment_id = $2
        "#,
    )
    .bind(assignment.operator_id)
    .bind(assignment.assignment_id)
    .execute(&mut *conn)
    .await?;

    Ok(closed)
}

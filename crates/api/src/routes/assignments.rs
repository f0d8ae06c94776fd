//! Search assignment and finding endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::assignment::{
    AssignmentResponse, ListAssignmentsQuery, ListAssignmentsResponse,
};
use domain::models::finding::{CreateFindingRequest, FindingResponse, ListFindingsResponse};
use domain::models::location::DroneLocationRequest;
use domain::models::{Finding, SearchAssignment, TransitionError};
use domain::services::{finding_notification, ChangeEvent, ChangeKind};
use persistence::repositories::{AssignmentRepository, FindingRepository};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;
use crate::routes::emergencies::{find_emergency, publish_assignment};
use crate::services::dispatch;

async fn find_assignment(
    state: &AppState,
    assignment_id: Uuid,
) -> Result<SearchAssignment, ApiError> {
    AssignmentRepository::new(state.pool.clone())
        .find_by_assignment_id(assignment_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))
}

/// List the caller's assignments.
///
/// GET /api/v1/assignments?status=<status>&emergencyId=<uuid>
pub async fn list_assignments(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<ListAssignmentsQuery>,
) -> Result<Json<ListAssignmentsResponse>, ApiError> {
    let entities = AssignmentRepository::new(state.pool.clone())
        .list_for_operator(
            auth.user_id,
            query.status.map(|s| s.as_str()),
            query.emergency_id,
        )
        .await?;

    let assignments: Vec<AssignmentResponse> = entities
        .into_iter()
        .map(|e| {
            let assignment: SearchAssignment = e.into();
            assignment.into()
        })
        .collect();
    let total = assignments.len();

    Ok(Json(ListAssignmentsResponse { assignments, total }))
}

/// Assignment detail. Visible to its operator and the emergency's reporter.
///
/// GET /api/v1/assignments/:assignment_id
pub async fn get_assignment(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = find_assignment(&state, assignment_id).await?;

    if assignment.operator_id != auth.user_id {
        let emergency = find_emergency(&state, assignment.emergency_id).await?;
        if emergency.reporter_id != auth.user_id {
            return Err(ApiError::NotFound("Assignment not found".to_string()));
        }
    }

    Ok(Json(assignment.into()))
}

/// Record the drone's current position. Last write wins.
///
/// PUT /api/v1/assignments/:assignment_id/location
pub async fn update_drone_location(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(assignment_id): Path<Uuid>,
    Json(request): Json<DroneLocationRequest>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    request.validate()?;

    let assignment = find_assignment(&state, assignment_id).await?;
    assignment.check_writable_by(auth.user_id)?;

    let fixed_at = request
        .timestamp
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);
    let point = request.point();

    let updated: SearchAssignment = AssignmentRepository::new(state.pool.clone())
        .update_drone_location(
            assignment_id,
            point.latitude,
            point.longitude,
            request.accuracy,
            fixed_at,
        )
        .await?
        // Closed between the check and the write
        .ok_or(TransitionError::AssignmentClosed)?
        .into();

    debug!(
        assignment_id = %assignment_id,
        in_area = ?updated.drone_in_area(),
        "Drone position updated"
    );

    let emergency = find_emergency(&state, updated.emergency_id).await?;
    publish_assignment(&state, ChangeKind::DroneMoved, &updated, emergency.reporter_id);

    Ok(Json(updated.into()))
}

/// Close the caller's assignment. The emergency status is unchanged.
///
/// POST /api/v1/assignments/:assignment_id/complete
pub async fn complete_assignment(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment: SearchAssignment = AssignmentRepository::new(state.pool.clone())
        .complete(assignment_id, auth.user_id)
        .await?
        .into();

    info!(
        assignment_id = %assignment.assignment_id,
        emergency_id = %assignment.emergency_id,
        "Assignment completed"
    );

    let emergency = find_emergency(&state, assignment.emergency_id).await?;
    publish_assignment(
        &state,
        ChangeKind::AssignmentUpdated,
        &assignment,
        emergency.reporter_id,
    );

    Ok(Json(assignment.into()))
}

/// Report a finding on the caller's active assignment.
///
/// POST /api/v1/assignments/:assignment_id/findings
pub async fn create_finding(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(assignment_id): Path<Uuid>,
    Json(request): Json<CreateFindingRequest>,
) -> Result<(StatusCode, Json<FindingResponse>), ApiError> {
    request.validate()?;
    let location = request
        .location()
        .map_err(|msg| ApiError::Validation(msg.to_string()))?;

    let assignment = find_assignment(&state, assignment_id).await?;
    assignment.check_writable_by(auth.user_id)?;
    let emergency = find_emergency(&state, assignment.emergency_id).await?;

    let finding: Finding = FindingRepository::new(state.pool.clone())
        .create(
            assignment.assignment_id,
            assignment.emergency_id,
            auth.user_id,
            request.description.trim(),
            location.map(|p| p.latitude),
            location.map(|p| p.longitude),
            request.image.as_deref(),
        )
        .await?
        .into();

    info!(
        finding_id = %finding.finding_id,
        emergency_id = %finding.emergency_id,
        has_image = finding.image.is_some(),
        "Finding reported"
    );

    let response = FindingResponse::from(finding.clone());
    state.events.publish(
        ChangeEvent::new(ChangeKind::FindingCreated, Some(finding.emergency_id), &response)
            .with_assignment(finding.assignment_id)
            .for_users([emergency.reporter_id, finding.operator_id]),
    );
    dispatch::deliver(&state, vec![finding_notification(&emergency, &finding)]).await;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Findings on an emergency, newest first.
///
/// GET /api/v1/emergencies/:emergency_id/findings
pub async fn list_findings(
    State(state): State<AppState>,
    Path(emergency_id): Path<Uuid>,
) -> Result<Json<ListFindingsResponse>, ApiError> {
    find_emergency(&state, emergency_id).await?;

    let entities = FindingRepository::new(state.pool.clone())
        .list_for_emergency(emergency_id)
        .await?;

    let findings: Vec<FindingResponse> = entities
        .into_iter()
        .map(|e| {
            let finding: Finding = e.into();
            finding.into()
        })
        .collect();
    let total = findings.len();

    Ok(Json(ListFindingsResponse { findings, total }))
}

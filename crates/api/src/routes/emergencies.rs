//! Emergency endpoint handlers.
//!
//! Reporting triggers proximity dispatch; accept, complete and resolve drive
//! the emergency state machine inside repository transactions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::assignment::AssignmentResponse;
use domain::models::emergency::{
    CreateEmergencyRequest, CreateEmergencyResponse, EmergencyDetailResponse, EmergencyResponse,
    ListEmergenciesQuery, ListEmergenciesResponse,
};
use domain::models::{Emergency, SearchAssignment};
use domain::services::{
    accepted_notification, completed_notification, resolved_notifications, ChangeEvent, ChangeKind,
};
use persistence::repositories::{
    AssignmentRepository, EmergencyRepository, FindingRepository, ProfileRepository,
};
use shared::pagination::clamp_page_size;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_assignment_accepted, record_emergency_reported};
use crate::middleware::UserAuth;
use crate::routes::profile::require_profile;
use crate::services::{dispatch, CurrentWeather, WeatherError};

pub(crate) async fn find_emergency(
    state: &AppState,
    emergency_id: Uuid,
) -> Result<Emergency, ApiError> {
    EmergencyRepository::new(state.pool.clone())
        .find_by_emergency_id(emergency_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ApiError::NotFound("Emergency not found".to_string()))
}

/// Publishes an emergency change to the reporter, the given operators and,
/// when `broadcast` is set, every operator.
fn publish_emergency(
    state: &AppState,
    kind: ChangeKind,
    emergency: &Emergency,
    operators: &[Uuid],
    broadcast: bool,
) {
    let mut event = ChangeEvent::new(
        kind,
        Some(emergency.emergency_id),
        &EmergencyResponse::from(emergency.clone()),
    )
    .for_users([emergency.reporter_id])
    .for_users(operators.iter().copied());
    if broadcast {
        event = event.for_operators();
    }
    state.events.publish(event);
}

pub(crate) fn publish_assignment(
    state: &AppState,
    kind: ChangeKind,
    assignment: &SearchAssignment,
    reporter_id: Uuid,
) {
    let event = ChangeEvent::new(
        kind,
        Some(assignment.emergency_id),
        &AssignmentResponse::from(assignment.clone()),
    )
    .with_assignment(assignment.assignment_id)
    .for_users([assignment.operator_id, reporter_id]);
    state.events.publish(event);
}

/// Report an emergency and notify operators in range.
///
/// POST /api/v1/emergencies
pub async fn create_emergency(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateEmergencyRequest>,
) -> Result<(StatusCode, Json<CreateEmergencyResponse>), ApiError> {
    request.validate()?;
    require_profile(&state, auth.user_id).await?;

    let repo = EmergencyRepository::new(state.pool.clone());
    if let Some(open) = repo.find_open_by_reporter(auth.user_id).await? {
        return Err(ApiError::Conflict(format!(
            "Emergency {} is still open; resolve it before reporting another",
            open.emergency_id
        )));
    }

    let location = request.location();
    let mut address = request
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    if address.is_none() {
        if let Some(geocoder) = &state.geocoder {
            // Reported without an address; the emergency is stored either way
            address = geocoder.reverse(location).await.unwrap_or_else(|e| {
                warn!(error = %e, "Reverse geocoding skipped");
                None
            });
        }
    }

    let emergency: Emergency = repo
        .create(
            auth.user_id,
            request.emergency_type.as_str(),
            request.details.trim(),
            location.latitude,
            location.longitude,
            address.as_deref(),
        )
        .await?
        .into();

    record_emergency_reported(emergency.emergency_type.as_str());
    info!(
        emergency_id = %emergency.emergency_id,
        reporter_id = %emergency.reporter_id,
        emergency_type = emergency.emergency_type.as_str(),
        "Emergency reported"
    );

    publish_emergency(&state, ChangeKind::EmergencyCreated, &emergency, &[], true);
    let operators_notified = dispatch::notify_nearby_operators(&state, &emergency).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateEmergencyResponse {
            emergency: emergency.into(),
            operators_notified,
        }),
    ))
}

/// List emergencies, newest first.
///
/// GET /api/v1/emergencies?status=<status>&mine=<bool>&limit=<n>
pub async fn list_emergencies(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<ListEmergenciesQuery>,
) -> Result<Json<ListEmergenciesResponse>, ApiError> {
    let reporter = query.mine.then_some(auth.user_id);
    let entities = EmergencyRepository::new(state.pool.clone())
        .list(
            query.status.map(|s| s.as_str()),
            reporter,
            clamp_page_size(query.limit),
        )
        .await?;

    let emergencies: Vec<EmergencyResponse> = entities
        .into_iter()
        .map(|e| {
            let emergency: Emergency = e.into();
            emergency.into()
        })
        .collect();
    let count = emergencies.len();

    Ok(Json(ListEmergenciesResponse { emergencies, count }))
}

/// Emergency detail with findings and the actions open to the caller.
///
/// GET /api/v1/emergencies/:emergency_id
pub async fn get_emergency(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(emergency_id): Path<Uuid>,
) -> Result<Json<EmergencyDetailResponse>, ApiError> {
    let emergency = find_emergency(&state, emergency_id).await?;

    let findings = FindingRepository::new(state.pool.clone())
        .list_for_emergency(emergency_id)
        .await?;

    let assignment_repo = AssignmentRepository::new(state.pool.clone());
    let active_assignments = assignment_repo
        .count_active_for_emergency(emergency_id)
        .await?;
    let holds_active = assignment_repo
        .find_active_for_operator(auth.user_id)
        .await?
        .is_some_and(|a| a.emergency_id == emergency_id);

    let is_operator = ProfileRepository::new(state.pool.clone())
        .find_by_user_id(auth.user_id)
        .await?
        .is_some_and(|p| p.is_operator);

    let actions = emergency.available_actions(auth.user_id, is_operator, holds_active);

    Ok(Json(EmergencyDetailResponse {
        emergency: emergency.into(),
        findings: findings
            .into_iter()
            .map(|f| {
                let finding: domain::models::Finding = f.into();
                finding.into()
            })
            .collect(),
        active_assignments,
        actions,
    }))
}

/// Operator takes on an emergency and receives a search assignment.
///
/// POST /api/v1/emergencies/:emergency_id/accept
pub async fn accept_emergency(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(emergency_id): Path<Uuid>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let outcome = EmergencyRepository::new(state.pool.clone())
        .accept(
            emergency_id,
            auth.user_id,
            state.config.dispatch.search_half_width_m,
        )
        .await?;

    let emergency: Emergency = outcome.emergency.into();
    let assignment: SearchAssignment = outcome.assignment.into();

    record_assignment_accepted();
    info!(
        emergency_id = %emergency.emergency_id,
        assignment_id = %assignment.assignment_id,
        operator_id = %assignment.operator_id,
        first_acceptance = outcome.first_acceptance,
        "Emergency accepted"
    );

    publish_assignment(
        &state,
        ChangeKind::AssignmentCreated,
        &assignment,
        emergency.reporter_id,
    );
    if outcome.first_acceptance {
        publish_emergency(
            &state,
            ChangeKind::EmergencyUpdated,
            &emergency,
            &[assignment.operator_id],
            true,
        );
    }

    let operator_name = match require_profile(&state, auth.user_id).await {
        Ok(profile) => profile.display_name,
        Err(_) => "A drone operator".to_string(),
    };
    dispatch::deliver(&state, vec![accepted_notification(&emergency, &operator_name)]).await;

    Ok((StatusCode::CREATED, Json(assignment.into())))
}

/// Operator finishes the search; the reporter is asked to resolve.
///
/// POST /api/v1/emergencies/:emergency_id/complete
pub async fn complete_emergency(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(emergency_id): Path<Uuid>,
) -> Result<Json<EmergencyResponse>, ApiError> {
    let outcome = EmergencyRepository::new(state.pool.clone())
        .complete(emergency_id, auth.user_id)
        .await?;

    let emergency: Emergency = outcome.emergency.into();
    let assignment: SearchAssignment = outcome.assignment.into();

    info!(
        emergency_id = %emergency.emergency_id,
        operator_id = %auth.user_id,
        "Emergency search completed"
    );

    publish_assignment(
        &state,
        ChangeKind::AssignmentUpdated,
        &assignment,
        emergency.reporter_id,
    );
    publish_emergency(
        &state,
        ChangeKind::EmergencyUpdated,
        &emergency,
        &[assignment.operator_id],
        true,
    );
    dispatch::deliver(&state, vec![completed_notification(&emergency)]).await;

    Ok(Json(emergency.into()))
}

/// Reporter closes their emergency.
///
/// POST /api/v1/emergencies/:emergency_id/resolve
pub async fn resolve_emergency(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(emergency_id): Path<Uuid>,
) -> Result<Json<EmergencyResponse>, ApiError> {
    let outcome = EmergencyRepository::new(state.pool.clone())
        .resolve(emergency_id, auth.user_id)
        .await?;

    let emergency: Emergency = outcome.emergency.into();

    info!(
        emergency_id = %emergency.emergency_id,
        closed_assignments = outcome.closed_assignments.len(),
        "Emergency resolved"
    );

    for entity in outcome.closed_assignments {
        let assignment: SearchAssignment = entity.into();
        publish_assignment(
            &state,
            ChangeKind::AssignmentUpdated,
            &assignment,
            emergency.reporter_id,
        );
    }
    publish_emergency(
        &state,
        ChangeKind::EmergencyUpdated,
        &emergency,
        &outcome.operator_ids,
        true,
    );
    dispatch::deliver(
        &state,
        resolved_notifications(&emergency, &outcome.operator_ids),
    )
    .await;

    Ok(Json(emergency.into()))
}

/// Current weather at the emergency location.
///
/// GET /api/v1/emergencies/:emergency_id/weather
pub async fn get_weather(
    State(state): State<AppState>,
    Path(emergency_id): Path<Uuid>,
) -> Result<Json<CurrentWeather>, ApiError> {
    let emergency = find_emergency(&state, emergency_id).await?;

    let client = state
        .weather
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Weather service is not enabled".into()))?;

    let weather = client
        .current(emergency.location)
        .await
        .map_err(|e| match e {
            WeatherError::Disabled => {
                ApiError::ServiceUnavailable("Weather service is not enabled".into())
            }
            other => ApiError::ServiceUnavailable(other.to_string()),
        })?;

    Ok(Json(weather))
}

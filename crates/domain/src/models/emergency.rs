//! Emergency domain model and its status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::finding::FindingResponse;
use super::location::GeoPoint;

/// Represents an emergency reported by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emergency {
    pub id: i64,
    pub emergency_id: Uuid,
    pub reporter_id: Uuid,
    pub emergency_type: EmergencyType,
    pub details: String,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub status: EmergencyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Kind of emergency being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyType {
    Fire,
    Flood,
    Earthquake,
    MissingPerson,
    Medical,
    Accident,
    Other,
}

impl EmergencyType {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyType::Fire => "fire",
            EmergencyType::Flood => "flood",
            EmergencyType::Earthquake => "earthquake",
            EmergencyType::MissingPerson => "missing_person",
            EmergencyType::Medical => "medical",
            EmergencyType::Accident => "accident",
            EmergencyType::Other => "other",
        }
    }

    /// Parses from database string representation. Unknown values map to `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "fire" => EmergencyType::Fire,
            "flood" => EmergencyType::Flood,
            "earthquake" => EmergencyType::Earthquake,
            "missing_person" => EmergencyType::MissingPerson,
            "medical" => EmergencyType::Medical,
            "accident" => EmergencyType::Accident,
            _ => EmergencyType::Other,
        }
    }

    /// Human readable label used in notification titles.
    pub fn label(&self) -> &'static str {
        match self {
            EmergencyType::Fire => "Fire",
            EmergencyType::Flood => "Flood",
            EmergencyType::Earthquake => "Earthquake",
            EmergencyType::MissingPerson => "Missing person",
            EmergencyType::Medical => "Medical emergency",
            EmergencyType::Accident => "Accident",
            EmergencyType::Other => "Emergency",
        }
    }
}

/// Lifecycle of an emergency.
///
/// `active -> in-progress -> completed -> resolved`, with the reporter also
/// allowed to resolve straight from `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "resolved")]
    Resolved,
}

/// Something a user can do to an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyAction {
    Accept,
    Complete,
    Resolve,
}

impl std::fmt::Display for EmergencyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmergencyAction::Accept => write!(f, "accept"),
            EmergencyAction::Complete => write!(f, "complete"),
            EmergencyAction::Resolve => write!(f, "resolve"),
        }
    }
}

/// Rejected state change or actor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot {action} an emergency that is {from}")]
    InvalidTransition {
        from: EmergencyStatus,
        action: EmergencyAction,
    },

    #[error("Assignment is already completed")]
    AssignmentClosed,

    #[error("Only the reporter can resolve this emergency")]
    NotReporter,

    #[error("Only operators can accept emergencies")]
    NotOperator,

    #[error("Reporters cannot accept their own emergency")]
    OwnEmergency,

    #[error("Assignment belongs to another operator")]
    NotAssignedOperator,
}

impl TransitionError {
    /// True when the actor, not the record state, is the problem.
    pub fn is_permission(&self) -> bool {
        matches!(
            self,
            TransitionError::NotReporter
                | TransitionError::NotOperator
                | TransitionError::OwnEmergency
                | TransitionError::NotAssignedOperator
        )
    }
}

impl EmergencyStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyStatus::Active => "active",
            EmergencyStatus::InProgress => "in-progress",
            EmergencyStatus::Completed => "completed",
            EmergencyStatus::Resolved => "resolved",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(EmergencyStatus::Active),
            "in-progress" => Some(EmergencyStatus::InProgress),
            "completed" => Some(EmergencyStatus::Completed),
            "resolved" => Some(EmergencyStatus::Resolved),
            _ => None,
        }
    }

    /// Returns the status after `action`, or why it is not allowed.
    pub fn apply(self, action: EmergencyAction) -> Result<EmergencyStatus, TransitionError> {
        use EmergencyAction::*;
        use EmergencyStatus::*;

        match (self, action) {
            // Further operators may join a search already under way.
            (Active | InProgress, Accept) => Ok(InProgress),
            (InProgress, Complete) => Ok(Completed),
            (Active | Completed, Resolve) => Ok(Resolved),
            (from, action) => Err(TransitionError::InvalidTransition { from, action }),
        }
    }

    pub fn allows(self, action: EmergencyAction) -> bool {
        self.apply(action).is_ok()
    }

    /// Whether the emergency still needs responders.
    pub fn is_open(self) -> bool {
        matches!(self, EmergencyStatus::Active | EmergencyStatus::InProgress)
    }
}

impl std::fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Emergency {
    /// Checks that `actor_id` may resolve this emergency and returns the new status.
    pub fn check_resolve(&self, actor_id: Uuid) -> Result<EmergencyStatus, TransitionError> {
        if actor_id != self.reporter_id {
            return Err(TransitionError::NotReporter);
        }
        self.status.apply(EmergencyAction::Resolve)
    }

    /// Checks that `operator_id` may accept this emergency and returns the new status.
    pub fn check_accept(
        &self,
        operator_id: Uuid,
        is_operator: bool,
    ) -> Result<EmergencyStatus, TransitionError> {
        if !is_operator {
            return Err(TransitionError::NotOperator);
        }
        if operator_id == self.reporter_id {
            return Err(TransitionError::OwnEmergency);
        }
        self.status.apply(EmergencyAction::Accept)
    }

    /// Actions the given user may take right now; drives button gating in clients.
    pub fn available_actions(
        &self,
        user_id: Uuid,
        is_operator: bool,
        holds_active_assignment: bool,
    ) -> AvailableActions {
        AvailableActions {
            accept: self.check_accept(user_id, is_operator).is_ok() && !holds_active_assignment,
            complete: holds_active_assignment && self.status.allows(EmergencyAction::Complete),
            resolve: self.check_resolve(user_id).is_ok(),
        }
    }
}

/// Request payload for reporting an emergency.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmergencyRequest {
    pub emergency_type: EmergencyType,

    #[validate(
        length(min = 1, max = 2000, message = "Details must be 1-2000 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub details: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(length(max = 300, message = "Address must be at most 300 characters"))]
    pub address: Option<String>,
}

impl CreateEmergencyRequest {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Query parameters for listing emergencies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEmergenciesQuery {
    pub status: Option<EmergencyStatus>,
    /// Only emergencies reported by the caller
    #[serde(default)]
    pub mine: bool,
    pub limit: Option<i64>,
}

/// Response payload for emergency operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyResponse {
    pub emergency_id: Uuid,
    pub reporter_id: Uuid,
    pub emergency_type: EmergencyType,
    pub details: String,
    pub location: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub status: EmergencyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<Emergency> for EmergencyResponse {
    fn from(e: Emergency) -> Self {
        Self {
            emergency_id: e.emergency_id,
            reporter_id: e.reporter_id,
            emergency_type: e.emergency_type,
            details: e.details,
            location: e.location,
            address: e.address,
            status: e.status,
            created_at: e.created_at,
            updated_at: e.updated_at,
            resolved_at: e.resolved_at,
        }
    }
}

/// Which actions the caller may take on an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableActions {
    pub accept: bool,
    pub complete: bool,
    pub resolve: bool,
}

/// Emergency with its findings and the caller's available actions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyDetailResponse {
    #[serde(flatten)]
    pub emergency: EmergencyResponse,
    pub findings: Vec<FindingResponse>,
    pub active_assignments: i64,
    pub actions: AvailableActions,
}

/// Response for reporting an emergency.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmergencyResponse {
    #[serde(flatten)]
    pub emergency: EmergencyResponse,
    /// Number of nearby operators that were notified
    pub operators_notified: usize,
}

/// Response for listing emergencies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEmergenciesResponse {
    pub emergencies: Vec<EmergencyResponse>,
    /// Number of emergencies on this page, at most the requested limit
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emergency(status: EmergencyStatus) -> Emergency {
        Emergency {
            id: 1,
            emergency_id: Uuid::new_v4(),
            reporter_id: Uuid::new_v4(),
            emergency_type: EmergencyType::Fire,
            details: "Smoke over the ridge".to_string(),
            location: GeoPoint::new(46.0, 7.0),
            address: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            EmergencyStatus::Active,
            EmergencyStatus::InProgress,
            EmergencyStatus::Completed,
            EmergencyStatus::Resolved,
        ] {
            assert_eq!(EmergencyStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EmergencyStatus::parse("closed"), None);
    }

    #[test]
    fn test_status_serializes_with_hyphen() {
        assert_eq!(
            serde_json::to_string(&EmergencyStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }

    #[test]
    fn test_accept_transitions() {
        assert_eq!(
            EmergencyStatus::Active.apply(EmergencyAction::Accept),
            Ok(EmergencyStatus::InProgress)
        );
        assert_eq!(
            EmergencyStatus::InProgress.apply(EmergencyAction::Accept),
            Ok(EmergencyStatus::InProgress)
        );
        assert!(!EmergencyStatus::Completed.allows(EmergencyAction::Accept));
        assert!(!EmergencyStatus::Resolved.allows(EmergencyAction::Accept));
    }

    #[test]
    fn test_complete_only_from_in_progress() {
        assert_eq!(
            EmergencyStatus::InProgress.apply(EmergencyAction::Complete),
            Ok(EmergencyStatus::Completed)
        );
        assert_eq!(
            EmergencyStatus::Active.apply(EmergencyAction::Complete),
            Err(TransitionError::InvalidTransition {
                from: EmergencyStatus::Active,
                action: EmergencyAction::Complete,
            })
        );
        assert!(!EmergencyStatus::Resolved.allows(EmergencyAction::Complete));
    }

    #[test]
    fn test_resolve_only_from_active_or_completed() {
        assert!(EmergencyStatus::Active.allows(EmergencyAction::Resolve));
        assert!(EmergencyStatus::Completed.allows(EmergencyAction::Resolve));
        assert!(!EmergencyStatus::InProgress.allows(EmergencyAction::Resolve));
        assert!(!EmergencyStatus::Resolved.allows(EmergencyAction::Resolve));
    }

    #[test]
    fn test_resolve_requires_reporter() {
        let e = emergency(EmergencyStatus::Active);
        assert_eq!(e.check_resolve(Uuid::new_v4()), Err(TransitionError::NotReporter));
        assert_eq!(e.check_resolve(e.reporter_id), Ok(EmergencyStatus::Resolved));
    }

    #[test]
    fn test_accept_gating() {
        let e = emergency(EmergencyStatus::Active);
        let operator = Uuid::new_v4();

        assert_eq!(
            e.check_accept(operator, false),
            Err(TransitionError::NotOperator)
        );
        assert_eq!(
            e.check_accept(e.reporter_id, true),
            Err(TransitionError::OwnEmergency)
        );
        assert_eq!(
            e.check_accept(operator, true),
            Ok(EmergencyStatus::InProgress)
        );
    }

    #[test]
    fn test_available_actions_for_reporter() {
        let e = emergency(EmergencyStatus::Active);
        let actions = e.available_actions(e.reporter_id, false, false);
        assert_eq!(
            actions,
            AvailableActions {
                accept: false,
                complete: false,
                resolve: true
            }
        );

        let in_progress = emergency(EmergencyStatus::InProgress);
        let actions = in_progress.available_actions(in_progress.reporter_id, false, false);
        assert!(!actions.resolve);
    }

    #[test]
    fn test_available_actions_for_operator() {
        let e = emergency(EmergencyStatus::InProgress);
        let operator = Uuid::new_v4();

        let fresh = e.available_actions(operator, true, false);
        assert!(fresh.accept);
        assert!(!fresh.complete);
        assert!(!fresh.resolve);

        let assigned = e.available_actions(operator, true, true);
        assert!(!assigned.accept);
        assert!(assigned.complete);
    }

    #[test]
    fn test_permission_errors() {
        assert!(TransitionError::NotReporter.is_permission());
        assert!(TransitionError::OwnEmergency.is_permission());
        assert!(!TransitionError::AssignmentClosed.is_permission());
        assert!(!TransitionError::InvalidTransition {
            from: EmergencyStatus::Resolved,
            action: EmergencyAction::Accept
        }
        .is_permission());
    }

    #[test]
    fn test_transition_error_display() {
        let err = TransitionError::InvalidTransition {
            from: EmergencyStatus::Resolved,
            action: EmergencyAction::Accept,
        };
        assert_eq!(err.to_string(), "Cannot accept an emergency that is resolved");
    }

    #[test]
    fn test_create_request_deserialization() {
        let json = r#"{
            "emergencyType": "missing_person",
            "details": "Hiker overdue since noon",
            "latitude": 46.5,
            "longitude": 7.9
        }"#;

        let request: CreateEmergencyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.emergency_type, EmergencyType::MissingPerson);
        assert!(request.address.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_blank_details() {
        let json = r#"{
            "emergencyType": "fire",
            "details": "   ",
            "latitude": 46.5,
            "longitude": 7.9
        }"#;

        let request: CreateEmergencyRequest = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_emergency_type_parse_unknown() {
        assert_eq!(EmergencyType::parse("avalanche"), EmergencyType::Other);
        assert_eq!(
            EmergencyType::parse(EmergencyType::Flood.as_str()),
            EmergencyType::Flood
        );
    }
}

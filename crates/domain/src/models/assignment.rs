//! Search assignment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::emergency::TransitionError;
use super::location::GeoPoint;
pub use crate::services::search_area::SearchArea;

/// An operator's commitment to search for a given emergency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAssignment {
    pub id: i64,
    pub assignment_id: Uuid,
    pub emergency_id: Uuid,
    pub operator_id: Uuid,
    pub status: AssignmentStatus,
    pub start_location: GeoPoint,
    pub search_area: SearchArea,
    pub drone_location: Option<GeoPoint>,
    pub drone_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Assignment lifecycle. `active -> completed`, one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Completed,
}

impl AssignmentStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Completed => "completed",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AssignmentStatus::Active),
            "completed" => Some(AssignmentStatus::Completed),
            _ => None,
        }
    }

    /// Completed assignments reject every further write.
    pub fn ensure_open(self) -> Result<(), TransitionError> {
        match self {
            AssignmentStatus::Active => Ok(()),
            AssignmentStatus::Completed => Err(TransitionError::AssignmentClosed),
        }
    }

    pub fn complete(self) -> Result<AssignmentStatus, TransitionError> {
        self.ensure_open()?;
        Ok(AssignmentStatus::Completed)
    }
}

impl SearchAssignment {
    /// Ensures `operator_id` owns this assignment and it still accepts updates.
    pub fn check_writable_by(&self, operator_id: Uuid) -> Result<(), TransitionError> {
        if self.operator_id != operator_id {
            return Err(TransitionError::NotAssignedOperator);
        }
        self.status.ensure_open()
    }

    /// Whether the last drone fix lies inside the assigned rectangle.
    pub fn drone_in_area(&self) -> Option<bool> {
        self.drone_location.map(|p| self.search_area.contains(p))
    }
}

/// Query parameters for listing assignments.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssignmentsQuery {
    pub status: Option<AssignmentStatus>,
    pub emergency_id: Option<Uuid>,
}

/// Response payload for assignment operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub assignment_id: Uuid,
    pub emergency_id: Uuid,
    pub operator_id: Uuid,
    pub status: AssignmentStatus,
    pub start_location: GeoPoint,
    pub search_area: SearchArea,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drone_location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drone_updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drone_in_area: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SearchAssignment> for AssignmentResponse {
    fn from(a: SearchAssignment) -> Self {
        let drone_in_area = a.drone_in_area();
        Self {
            assignment_id: a.assignment_id,
            emergency_id: a.emergency_id,
            operator_id: a.operator_id,
            status: a.status,
            start_location: a.start_location,
            search_area: a.search_area,
            drone_location: a.drone_location,
            drone_updated_at: a.drone_updated_at,
            drone_in_area,
            created_at: a.created_at,
            updated_at: a.updated_at,
            completed_at: a.completed_at,
        }
    }
}

/// Response for listing assignments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssignmentsResponse {
    pub assignments: Vec<AssignmentResponse>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(status: AssignmentStatus) -> SearchAssignment {
        let center = GeoPoint::new(47.37, 8.54);
        SearchAssignment {
            id: 1,
            assignment_id: Uuid::new_v4(),
            emergency_id: Uuid::new_v4(),
            operator_id: Uuid::new_v4(),
            status,
            start_location: center,
            search_area: SearchArea::standard(center),
            drone_location: None,
            drone_updated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_complete_is_one_way() {
        assert_eq!(
            AssignmentStatus::Active.complete(),
            Ok(AssignmentStatus::Completed)
        );
        assert_eq!(
            AssignmentStatus::Completed.complete(),
            Err(TransitionError::AssignmentClosed)
        );
    }

    #[test]
    fn test_ensure_open() {
        assert!(AssignmentStatus::Active.ensure_open().is_ok());
        assert_eq!(
            AssignmentStatus::Completed.ensure_open(),
            Err(TransitionError::AssignmentClosed)
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(AssignmentStatus::parse("active"), Some(AssignmentStatus::Active));
        assert_eq!(
            AssignmentStatus::parse("completed"),
            Some(AssignmentStatus::Completed)
        );
        assert_eq!(AssignmentStatus::parse("paused"), None);
    }

    #[test]
    fn test_check_writable_by() {
        let a = assignment(AssignmentStatus::Active);
        assert!(a.check_writable_by(a.operator_id).is_ok());
        assert_eq!(
            a.check_writable_by(Uuid::new_v4()),
            Err(TransitionError::NotAssignedOperator)
        );

        let done = assignment(AssignmentStatus::Completed);
        assert_eq!(
            done.check_writable_by(done.operator_id),
            Err(TransitionError::AssignmentClosed)
        );
    }

    #[test]
    fn test_drone_in_area() {
        let mut a = assignment(AssignmentStatus::Active);
        assert_eq!(a.drone_in_area(), None);

        a.drone_location = Some(GeoPoint::new(47.3705, 8.5405));
        assert_eq!(a.drone_in_area(), Some(true));

        a.drone_location = Some(GeoPoint::new(47.40, 8.54));
        assert_eq!(a.drone_in_area(), Some(false));
    }

    #[test]
    fn test_response_skips_missing_drone() {
        let response: AssignmentResponse = assignment(AssignmentStatus::Active).into();
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"active\""));
        assert!(json.contains("\"searchArea\""));
        assert!(!json.contains("droneLocation"));
        assert!(!json.contains("droneInArea"));
    }
}

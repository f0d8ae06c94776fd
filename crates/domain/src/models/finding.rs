//! Finding domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::location::GeoPoint;

/// An observation reported by an operator during a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: i64,
    pub finding_id: Uuid,
    pub assignment_id: Uuid,
    pub emergency_id: Uuid,
    pub operator_id: Uuid,
    pub description: String,
    pub location: Option<GeoPoint>,
    /// Base64 image payload as uploaded
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for reporting a finding.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFindingRequest {
    #[validate(
        length(min = 1, max = 2000, message = "Description must be 1-2000 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub description: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_image_payload"))]
    pub image: Option<String>,
}

impl CreateFindingRequest {
    /// The finding position; latitude and longitude must come together.
    pub fn location(&self) -> Result<Option<GeoPoint>, &'static str> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon))),
            (None, None) => Ok(None),
            _ => Err("latitude and longitude must be provided together"),
        }
    }
}

/// Response payload for finding operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingResponse {
    pub finding_id: Uuid,
    pub assignment_id: Uuid,
    pub emergency_id: Uuid,
    pub operator_id: Uuid,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Finding> for FindingResponse {
    fn from(f: Finding) -> Self {
        Self {
            finding_id: f.finding_id,
            assignment_id: f.assignment_id,
            emergency_id: f.emergency_id,
            operator_id: f.operator_id,
            description: f.description,
            location: f.location,
            image: f.image,
            created_at: f.created_at,
        }
    }
}

/// Response for listing findings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFindingsResponse {
    pub findings: Vec<FindingResponse>,
    pub total: usize,
}

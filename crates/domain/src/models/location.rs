//! Geographic coordinates and position update payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a point from nullable columns; both halves must be present.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Some(Self::new(lat, lon)),
            _ => None,
        }
    }

    /// Whether both components are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        geo::Point::new(p.longitude, p.latitude)
    }
}

/// Request payload for updating a user's last-known location.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
}

impl UpdateLocationRequest {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Request payload for a drone position report on an active assignment.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DroneLocationRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy: Option<f64>,

    /// Fix time in milliseconds since epoch; server time when absent.
    #[validate(custom(function = "shared::validation::validate_fix_timestamp"))]
    pub timestamp: Option<i64>,
}

impl DroneLocationRequest {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_serialization() {
        let json = serde_json::to_string(&GeoPoint::new(52.52, 13.405)).unwrap();
        assert_eq!(json, r#"{"latitude":52.52,"longitude":13.405}"#);
    }

    #[test]
    fn test_from_parts_requires_both() {
        assert_eq!(
            GeoPoint::from_parts(Some(1.0), Some(2.0)),
            Some(GeoPoint::new(1.0, 2.0))
        );
        assert_eq!(GeoPoint::from_parts(Some(1.0), None), None);
        assert_eq!(GeoPoint::from_parts(None, Some(2.0)), None);
    }

    #[test]
    fn test_is_valid() {
        assert!(GeoPoint::new(90.0, -180.0).is_valid());
        assert!(!GeoPoint::new(90.5, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_geo_point_axis_order() {
        let p: geo::Point<f64> = GeoPoint::new(10.0, 20.0).into();
        assert_eq!(p.x(), 20.0);
        assert_eq!(p.y(), 10.0);
    }

    #[test]
    fn test_drone_location_request_validation() {
        let request: DroneLocationRequest =
            serde_json::from_str(r#"{"latitude": 95.0, "longitude": 10.0}"#).unwrap();
        assert!(request.validate().is_err());

        let request: DroneLocationRequest =
            serde_json::from_str(r#"{"latitude": 45.0, "longitude": 10.0, "accuracy": 4.5}"#)
                .unwrap();
        assert!(request.validate().is_ok());
        assert!(request.timestamp.is_none());
    }
}

//! Search-area generation for accepted assignments.
//!
//! The policy is static: every assignment gets the same square, centered on the
//! emergency, regardless of terrain or how many operators are searching.

use serde::{Deserialize, Serialize};

use crate::models::GeoPoint;

/// Default half-width of the search square in metres.
pub const DEFAULT_HALF_WIDTH_M: f64 = 300.0;

/// Metres per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Lower bound for cos(latitude) so the longitude span stays finite at the poles.
const MIN_COS_LAT: f64 = 0.01;

/// Axis-aligned bounding rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArea {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl SearchArea {
    /// Square of `half_width_m` metres on each side of `center`, clamped to WGS84 bounds.
    pub fn around(center: GeoPoint, half_width_m: f64) -> Self {
        let half_width_m = half_width_m.abs();
        let lat_offset = half_width_m / METERS_PER_DEGREE;
        let cos_lat = center.latitude.to_radians().cos().abs().max(MIN_COS_LAT);
        let lon_offset = half_width_m / (METERS_PER_DEGREE * cos_lat);

        Self {
            north: (center.latitude + lat_offset).min(90.0),
            south: (center.latitude - lat_offset).max(-90.0),
            east: (center.longitude + lon_offset).min(180.0),
            west: (center.longitude - lon_offset).max(-180.0),
        }
    }

    /// Square with the default 300 m half-width.
    pub fn standard(center: GeoPoint) -> Self {
        Self::around(center, DEFAULT_HALF_WIDTH_M)
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }
}

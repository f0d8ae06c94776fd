//! Great-circle distance helpers.

use geo::HaversineDistance;

use crate::models::GeoPoint;

/// Smallest distance ever reported between two points (10 m), in kilometres.
/// Identical or near-identical coordinates never yield zero.
pub const MIN_DISTANCE_KM: f64 = 0.01;

/// Haversine distance between two points in kilometres, floored at [`MIN_DISTANCE_KM`].
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let a: geo::Point<f64> = a.into();
    let b: geo::Point<f64> = b.into();
    let km = a.haversine_distance(&b) / 1000.0;

    if km.is_nan() {
        return MIN_DISTANCE_KM;
    }
    km.max(MIN_DISTANCE_KM)
}

/// Whether `b` lies within `radius_km` of `a`.
pub fn within_radius(a: GeoPoint, b: GeoPoint, radius_km: f64) -> bool {
    haversine_km(a, b) <= radius_km
}

//! Haversine distance calculation.
//!
//! Great-circle distance between two points on a sphere given their
//! longitudes and latitudes. Used to fill in venue distances from the
//! meeting center when the backend leaves them out.

use crate::GeoPoint;

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculates the great-circle distance between two points in kilometers.
///
/// # Example
/// ```
/// use meetpoint_geo::{haversine_distance, GeoPoint};
///
/// let berlin = GeoPoint::new(13.4050, 52.5200).unwrap();
/// let paris = GeoPoint::new(2.3522, 48.8566).unwrap();
///
/// let distance = haversine_distance(&berlin, &paris);
/// assert!((distance - 878.0).abs() < 10.0);
/// ```
#[inline]
pub fn haversine_distance(from: &GeoPoint, to: &GeoPoint) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_KM)
}

/// Calculates the great-circle distance between two points in meters.
#[inline]
pub fn haversine_distance_meters(from: &GeoPoint, to: &GeoPoint) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_M)
}

#[inline]
fn haversine_distance_with_radius(from: &GeoPoint, to: &GeoPoint, radius: f64) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    radius * c
}

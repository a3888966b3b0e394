//! Coordinate order conversion and validation.
//!
//! Two wire conventions meet in this system:
//! - geo order `[longitude, latitude]` (backend, GeoJSON)
//! - map order `[latitude, longitude]` (map rendering libraries)
//!
//! Every swap between the two happens in this module. Callers that hold raw
//! pairs use [`to_map_order`] / [`to_geo_order`]; typed code holds
//! [`GeoPoint`](crate::GeoPoint) / [`MapPoint`](crate::MapPoint), which can
//! only be built through [`validate`].

use crate::error::{InvalidCoordinateError, InvalidReason};
use crate::CoordinateOrder;

/// Both axes closer to zero than this (degrees) mark an unset `(0, 0)` default.
pub const SENTINEL_EPSILON_DEG: f64 = 0.001;

/// Validates a latitude/longitude pair.
///
/// `order` only labels the error so it can echo the pair as received.
pub fn validate(lat: f64, lng: f64, order: CoordinateOrder) -> Result<(), InvalidCoordinateError> {
    let reason = if !lat.is_finite() || !lng.is_finite() {
        Some(InvalidReason::NonFinite)
    } else if !(-90.0..=90.0).contains(&lat) {
        Some(InvalidReason::LatitudeOutOfRange)
    } else if !(-180.0..=180.0).contains(&lng) {
        Some(InvalidReason::LongitudeOutOfRange)
    } else if is_sentinel(lat, lng) {
        Some(InvalidReason::Sentinel)
    } else {
        None
    };

    match reason {
        None => Ok(()),
        Some(reason) => {
            let (first, second) = match order {
                CoordinateOrder::Geo => (lng, lat),
                CoordinateOrder::Map => (lat, lng),
            };
            Err(InvalidCoordinateError {
                first,
                second,
                order,
                reason,
            })
        }
    }
}

/// Returns true for the `(0, 0)` "never set" signature.
#[inline]
pub fn is_sentinel(lat: f64, lng: f64) -> bool {
    lat.abs() < SENTINEL_EPSILON_DEG && lng.abs() < SENTINEL_EPSILON_DEG
}

/// Pure range/type predicate for a raw pair in the given order.
pub fn is_valid(coord: [f64; 2], order: CoordinateOrder) -> bool {
    let (lat, lng) = split(coord, order);
    validate(lat, lng, order).is_ok()
}

/// Converts a raw geo-order pair `[lng, lat]` to map order `[lat, lng]`.
///
/// Returns `None` when the pair is out of range, non-finite or the sentinel.
pub fn to_map_order(coord: [f64; 2]) -> Option<[f64; 2]> {
    let [lng, lat] = coord;
    validate(lat, lng, CoordinateOrder::Geo).ok()?;
    Some([lat, lng])
}

/// Converts a raw map-order pair `[lat, lng]` to geo order `[lng, lat]`.
///
/// Returns `None` when the pair is out of range, non-finite or the sentinel.
pub fn to_geo_order(coord: [f64; 2]) -> Option<[f64; 2]> {
    let [lat, lng] = coord;
    validate(lat, lng, CoordinateOrder::Map).ok()?;
    Some([lng, lat])
}

/// Splits a pair into `(lat, lng)` according to its order.
#[inline]
pub(crate) fn split(coord: [f64; 2], order: CoordinateOrder) -> (f64, f64) {
    match order {
        CoordinateOrder::Geo => (coord[1], coord[0]),
        CoordinateOrder::Map => (coord[0], coord[1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_swaps_axes() {
        assert_eq!(to_map_order([-74.0, 40.71]), Some([40.71, -74.0]));
        assert_eq!(to_geo_order([40.71, -74.0]), Some([-74.0, 40.71]));
    }

    #[test]
    fn test_transposed_pair_is_caught() {
        // San Francisco in geo order handed over as map order: latitude -122.4
        assert!(!is_valid([-122.4, 37.77], CoordinateOrder::Map));
        assert_eq!(to_geo_order([-122.4, 37.77]), None);
        assert_eq!(to_map_order([-122.4, 37.77]), Some([37.77, -122.4]));
    }

    #[test]
    fn test_rejects_non_finite() {
        assert_eq!(to_map_order([f64::NAN, 10.0]), None);
        assert_eq!(to_geo_order([10.0, f64::INFINITY]), None);
        assert!(!is_valid([f64::NEG_INFINITY, 0.5], CoordinateOrder::Geo));
    }

    #[test]
    fn test_rejects_sentinel() {
        assert_eq!(to_map_order([0.0, 0.0]), None);
        assert_eq!(to_map_order([0.0005, -0.0009]), None);
        // Only one axis near zero is a real place (equator or prime meridian)
        assert!(to_map_order([0.0005, 51.48]).is_some());
        assert!(to_map_order([32.5, 0.0]).is_some());
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert!(is_valid([180.0, 90.0], CoordinateOrder::Geo));
        assert!(is_valid([-90.0, -180.0], CoordinateOrder::Map));
        assert!(!is_valid([180.0001, 10.0], CoordinateOrder::Geo));
    }

    #[test]
    fn test_error_reason() {
        let err = validate(95.0, 10.0, CoordinateOrder::Map).unwrap_err();
        assert_eq!(err.reason, InvalidReason::LatitudeOutOfRange);
        assert_eq!((err.first, err.second), (95.0, 10.0));

        let err = validate(40.0, 200.0, CoordinateOrder::Geo).unwrap_err();
        assert_eq!(err.reason, InvalidReason::LongitudeOutOfRange);
        assert_eq!((err.first, err.second), (200.0, 40.0));
    }

    fn valid_geo() -> impl Strategy<Value = [f64; 2]> {
        (-180.0f64..=180.0, -90.0f64..=90.0)
            .prop_filter("sentinel", |(lng, lat)| !is_sentinel(*lat, *lng))
            .prop_map(|(lng, lat)| [lng, lat])
    }

    proptest! {
        #[test]
        fn prop_round_trip_is_stable(c in valid_geo()) {
            let map = to_map_order(c).unwrap();
            let again = to_geo_order(map).and_then(to_map_order);
            prop_assert_eq!(again, Some(map));
        }

        #[test]
        fn prop_out_of_range_latitude_rejected(
            lng in -180.0f64..=180.0,
            lat in prop_oneof![90.000_001f64..1.0e6, -1.0e6f64..-90.000_001],
        ) {
            prop_assert!(!is_valid([lng, lat], CoordinateOrder::Geo));
            prop_assert!(to_map_order([lng, lat]).is_none());
            prop_assert!(to_geo_order([lat, lng]).is_none());
        }

        #[test]
        fn prop_out_of_range_longitude_rejected(
            lat in -90.0f64..=90.0,
            lng in prop_oneof![180.000_001f64..1.0e6, -1.0e6f64..-180.000_001],
        ) {
            prop_assert!(!is_valid([lat, lng], CoordinateOrder::Map));
            prop_assert!(to_map_order([lng, lat]).is_none());
            prop_assert!(to_geo_order([lat, lng]).is_none());
        }
    }
}

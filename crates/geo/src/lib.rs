//! Geospatial primitives for Meetpoint.
//!
//! This crate provides:
//! - Typed coordinates in both wire orders ([`GeoPoint`] is `[lng, lat]`,
//!   [`MapPoint`] is `[lat, lng]`) that can only hold validated values
//! - The coordinate normalizer: the one place axis order is swapped
//! - Spherical centroid of attendee positions
//! - Haversine distance calculations
//! - Coalescing of heterogeneous backend location payloads
//!
//! # Example
//!
//! ```
//! use meetpoint_geo::{compute_centroid, GeoPoint};
//!
//! let a = GeoPoint::new(-74.0, 40.71).unwrap();
//! let b = GeoPoint::new(-73.9, 40.75).unwrap();
//!
//! let center = compute_centroid(&[a, b]).unwrap();
//! assert!((center.lng() - -73.95).abs() < 0.01);
//! assert!((center.lat() - 40.73).abs() < 0.01);
//! ```

mod centroid;
mod error;
mod haversine;
pub mod normalize;
pub mod payload;

pub use centroid::compute_centroid;
pub use error::{GeoError, GeoErrorCode, InvalidCoordinateError, InvalidReason, Result};
pub use haversine::{EARTH_RADIUS_KM, EARTH_RADIUS_M, haversine_distance, haversine_distance_meters};
pub use normalize::{is_valid, to_geo_order, to_map_order};
pub use payload::coalesce_point;

use serde::{Deserialize, Serialize};

/// The two positional conventions for a coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateOrder {
    /// `[longitude, latitude]`, backend and GeoJSON convention
    Geo,
    /// `[latitude, longitude]`, map library convention
    Map,
}

impl std::fmt::Display for CoordinateOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateOrder::Geo => f.write_str("geo order [lng, lat]"),
            CoordinateOrder::Map => f.write_str("map order [lat, lng]"),
        }
    }
}

/// A validated point in geo order, serialized as `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    lng: f64,
    lat: f64,
}

impl GeoPoint {
    /// Creates a point from longitude and latitude, rejecting invalid or sentinel values.
    pub fn new(lng: f64, lat: f64) -> std::result::Result<Self, InvalidCoordinateError> {
        normalize::validate(lat, lng, CoordinateOrder::Geo)?;
        Ok(Self { lng, lat })
    }

    /// For derived values such as a computed centroid: rounding overshoot is
    /// clamped, then the usual rules apply. `None` for the `(0, 0)` sentinel.
    pub(crate) fn from_computed(lng: f64, lat: f64) -> Option<Self> {
        Self::new(lng.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0)).ok()
    }

    /// Longitude in degrees
    #[inline]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees
    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Same point in map order.
    #[inline]
    pub fn to_map(self) -> MapPoint {
        MapPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Raw `[lng, lat]` pair.
    #[inline]
    pub fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Converts degrees to radians for internal calculations, as `(lat, lng)`.
    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.lat.to_radians(), self.lng.to_radians())
    }
}

impl TryFrom<[f64; 2]> for GeoPoint {
    type Error = InvalidCoordinateError;

    fn try_from([lng, lat]: [f64; 2]) -> std::result::Result<Self, Self::Error> {
        Self::new(lng, lat)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        point.to_array()
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.lng, self.lat)
    }
}

/// A validated point in map order, serialized as `[latitude, longitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct MapPoint {
    lat: f64,
    lng: f64,
}

impl MapPoint {
    /// Creates a point from latitude and longitude, rejecting invalid or sentinel values.
    pub fn new(lat: f64, lng: f64) -> std::result::Result<Self, InvalidCoordinateError> {
        normalize::validate(lat, lng, CoordinateOrder::Map)?;
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees
    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees
    #[inline]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Same point in geo order.
    #[inline]
    pub fn to_geo(self) -> GeoPoint {
        GeoPoint {
            lng: self.lng,
            lat: self.lat,
        }
    }

    /// Raw `[lat, lng]` pair.
    #[inline]
    pub fn to_array(self) -> [f64; 2] {
        [self.lat, self.lng]
    }
}

impl TryFrom<[f64; 2]> for MapPoint {
    type Error = InvalidCoordinateError;

    fn try_from([lat, lng]: [f64; 2]) -> std::result::Result<Self, Self::Error> {
        Self::new(lat, lng)
    }
}

impl From<MapPoint> for [f64; 2] {
    fn from(point: MapPoint) -> Self {
        point.to_array()
    }
}

impl std::fmt::Display for MapPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.lat, self.lng)
    }
}

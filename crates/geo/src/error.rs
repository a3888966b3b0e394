//! Error types for the geo crate.

use crate::CoordinateOrder;
use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Why a coordinate pair was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// One of the components is `NaN` or infinite
    NonFinite,
    /// Latitude outside `-90..=90`
    LatitudeOutOfRange,
    /// Longitude outside `-180..=180`
    LongitudeOutOfRange,
    /// Both components within 0.001° of zero, the signature of an unset default
    Sentinel,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            InvalidReason::NonFinite => "component is not a finite number",
            InvalidReason::LatitudeOutOfRange => "latitude outside -90..=90",
            InvalidReason::LongitudeOutOfRange => "longitude outside -180..=180",
            InvalidReason::Sentinel => "(0, 0) sentinel, location was never set",
        };
        f.write_str(text)
    }
}

/// A coordinate pair failed validation.
///
/// Carries the pair exactly as received, in the order it was received, so
/// the caller can report what was wrong without guessing at axis order.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid coordinate [{first}, {second}] in {order}: {reason}")]
pub struct InvalidCoordinateError {
    /// First element of the pair as received
    pub first: f64,
    /// Second element of the pair as received
    pub second: f64,
    /// Order the pair was interpreted in
    pub order: CoordinateOrder,
    /// What was wrong with it
    pub reason: InvalidReason,
}

/// Errors that can occur during geo operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Range, finiteness or sentinel violation
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinateError),

    /// Payload does not contain a recognisable point shape
    #[error("Malformed location payload: {0}")]
    MalformedPayload(String),

    /// Invalid WKT format
    #[error("Invalid WKT format: {0}")]
    InvalidWkt(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Error code for integration with meetpoint-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Invalid WKT format
    InvalidWkt = 10001,
    /// Invalid coordinate values
    InvalidCoordinate = 10002,
    /// JSON parsing error
    JsonParsing = 10003,
    /// Sentinel (0, 0) coordinate
    SentinelCoordinate = 10004,
    /// Unrecognised payload shape
    MalformedPayload = 10005,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::InvalidCoordinate(e) if e.reason == InvalidReason::Sentinel => {
                GeoErrorCode::SentinelCoordinate
            }
            GeoError::InvalidCoordinate(_) => GeoErrorCode::InvalidCoordinate,
            GeoError::MalformedPayload(_) => GeoErrorCode::MalformedPayload,
            GeoError::InvalidWkt(_) => GeoErrorCode::InvalidWkt,
            GeoError::JsonError(_) => GeoErrorCode::JsonParsing,
        }
    }
}

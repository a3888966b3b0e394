//! Error types for the engine
//!
//! Validation failures are reported to whoever handed in the bad value.
//! Backend failures carry the meeting and operation they belong to.

use meetpoint_api_client::{ApiError, SelectLocationRequest, SuggestionFilter};
use meetpoint_core::ErrorCode;
use meetpoint_geo::InvalidCoordinateError;
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// A coordinate was rejected by the normalizer
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinateError),

    /// Suggestion lookup failed or was superseded
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    /// Venue commit failed
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Device positioning failed
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    /// Attendee refresh failed
    #[error("failed to refresh locations for meeting {meeting_id}: {source}")]
    Refresh {
        /// Meeting being viewed
        meeting_id: String,
        /// Underlying client error
        #[source]
        source: ApiError,
    },

    /// Neither the server nor the attendee set yields a center
    #[error("meeting {0} has no central location yet")]
    NoCentralLocation(String),

    /// The map provider could not render
    #[error(transparent)]
    Map(#[from] crate::map::MapError),
}

impl EngineError {
    /// Map to the workspace-wide error code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCoordinate(_) => ErrorCode::InvalidCoordinate,
            Self::Suggestion(e) => e.code(),
            Self::Commit(e) => e.code(),
            Self::Geolocation(e) => e.code(),
            Self::Refresh { source, .. } => source.code(),
            Self::NoCentralLocation(_) => ErrorCode::ValidationError,
            Self::Map(_) => ErrorCode::Internal,
        }
    }
}

impl From<EngineError> for meetpoint_core::Error {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Refresh { meeting_id, source } => {
                Self::from(source).with_context(format!("refreshing locations of meeting {meeting_id}"))
            }
            EngineError::Suggestion(SuggestionError::Fetch(SuggestionFetchError {
                meeting_id,
                filter,
                source,
            })) => Self::from(source).with_context(format!("suggesting {filter} for meeting {meeting_id}")),
            EngineError::Commit(CommitError::Failed(LocationCommitError {
                meeting_id,
                attempted,
                source,
            })) => Self::from(source).with_context(format!(
                "selecting {:?} for meeting {meeting_id}",
                attempted.name
            )),
            EngineError::Geolocation(GeolocationError::PermissionDenied) => Self::geolocation_denied(),
            other => {
                let error = Self::new(other.code(), other.to_string());
                match other {
                    EngineError::NoCentralLocation(_) => {
                        error.with_suggestion("Wait until at least one attendee shares a location")
                    }
                    EngineError::InvalidCoordinate(_)
                    | EngineError::Suggestion(SuggestionError::InvalidCenter(_))
                    | EngineError::Commit(CommitError::InvalidCoordinate(_)) => error.with_suggestion(
                        "Coordinates are [longitude, latitude] with lat in -90..=90 and lng in -180..=180",
                    ),
                    EngineError::Commit(CommitError::NotOrganizer) => {
                        error.with_suggestion("Ask the meeting organizer to select the location")
                    }
                    _ => error,
                }
            }
        }
    }
}

/// Backend or network failure on a suggestion query
#[derive(Debug, Error)]
#[error("suggestion lookup for meeting {meeting_id} ({filter}) failed: {source}")]
pub struct SuggestionFetchError {
    /// Meeting being viewed
    pub meeting_id: String,
    /// Filter the failed request was issued for
    pub filter: SuggestionFilter,
    /// Underlying client error
    #[source]
    pub source: ApiError,
}

/// Outcome of a suggestion request that produced no list
#[derive(Debug, Error)]
pub enum SuggestionError {
    /// The center was rejected before any backend call
    #[error("invalid suggestion center: {0}")]
    InvalidCenter(#[from] InvalidCoordinateError),

    /// The filter is outside the accepted bounds
    #[error("invalid suggestion filter: {0}")]
    InvalidFilter(String),

    /// A newer request replaced this one; its result was not applied
    #[error("suggestion request superseded by a newer one")]
    Superseded,

    /// The lookup itself failed
    #[error(transparent)]
    Fetch(#[from] SuggestionFetchError),
}

impl SuggestionError {
    /// Whether the caller simply lost the race to a newer request
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }

    fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCenter(_) => ErrorCode::InvalidCoordinate,
            Self::InvalidFilter(_) => ErrorCode::InvalidInput,
            Self::Superseded => ErrorCode::Cancelled,
            Self::Fetch(e) => e.source.code(),
        }
    }
}

/// The organizer's commit was rejected by the backend
#[derive(Debug, Error)]
#[error("failed to select {:?} for meeting {meeting_id}: {source}", .attempted.name)]
pub struct LocationCommitError {
    /// Meeting being viewed
    pub meeting_id: String,
    /// What was sent
    pub attempted: SelectLocationRequest,
    /// Underlying client error
    #[source]
    pub source: ApiError,
}

/// Reasons a commit did not happen
#[derive(Debug, Error)]
pub enum CommitError {
    /// The chosen point is not a valid coordinate; nothing was sent
    #[error("cannot select location: {0}")]
    InvalidCoordinate(#[from] InvalidCoordinateError),

    /// Only the organizer may commit
    #[error("only the meeting organizer can select the location")]
    NotOrganizer,

    /// The backend call failed
    #[error(transparent)]
    Failed(#[from] LocationCommitError),
}

impl CommitError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCoordinate(_) => ErrorCode::InvalidCoordinate,
            Self::NotOrganizer => ErrorCode::ValidationError,
            Self::Failed(e) => e.source.code(),
        }
    }
}

/// Platform positioning failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The user denied (or revoked) location permission
    #[error("location permission denied")]
    PermissionDenied,

    /// The device cannot produce a position
    #[error("location unavailable")]
    Unavailable,

    /// No fix arrived within the configured timeout
    #[error("location request timed out")]
    Timeout,
}

impl GeolocationError {
    /// Whether the watcher must stop until explicitly restarted
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Timeout)
    }

    fn code(self) -> ErrorCode {
        match self {
            Self::PermissionDenied => ErrorCode::GeolocationPermissionDenied,
            Self::Unavailable => ErrorCode::GeolocationUnavailable,
            Self::Timeout => ErrorCode::GeolocationTimeout,
        }
    }
}

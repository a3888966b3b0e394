//! Error types for the API client

use meetpoint_core::ErrorCode;
use meetpoint_geo::GeoError;
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// A required location in a response could not be read
    #[error("Invalid location in response: {0}")]
    InvalidLocation(#[from] GeoError),

    /// Circuit breaker is open
    #[error("Circuit breaker is open - service temporarily unavailable")]
    CircuitOpen,

    /// Request timeout
    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// All retry attempts exhausted
    #[error("All {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error message
        last_error: String,
        /// Whether the last error was transient, so a later retry may succeed
        transient: bool,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing env var error
    pub fn missing_env(var: impl Into<String>) -> Self {
        Self::MissingEnvVar(var.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => {
                // Retry on connection errors, timeouts
                e.is_connect() || e.is_timeout()
            }
            Self::ApiResponse { status, .. } => {
                // Retry on 5xx errors and 429 (rate limited)
                *status >= 500 || *status == 429
            }
            Self::Timeout(_) => true,
            Self::RetriesExhausted { transient, .. } => *transient,
            Self::CircuitOpen
            | Self::Config(_)
            | Self::MissingEnvVar(_)
            | Self::Json(_)
            | Self::InvalidLocation(_)
            | Self::InvalidUrl(_) => false,
        }
    }

    /// Check if the backend refused the caller (401/403)
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::ApiResponse { status: 401 | 403, .. })
    }

    /// Map to the workspace-wide error code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Request(e) if e.is_timeout() => ErrorCode::Timeout,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Request(_) => ErrorCode::NetworkError,
            Self::Json(_) => ErrorCode::InvalidFormat,
            Self::Config(_) | Self::InvalidUrl(_) => ErrorCode::ConfigError,
            Self::MissingEnvVar(_) => ErrorCode::ConfigNotFound,
            Self::ApiResponse { .. } => ErrorCode::BackendError,
            Self::InvalidLocation(_) => ErrorCode::InvalidCoordinate,
            Self::CircuitOpen => ErrorCode::CircuitOpen,
            Self::RetriesExhausted { .. } => ErrorCode::RetriesExhausted,
        }
    }
}

impl From<ApiError> for meetpoint_core::Error {
    fn from(e: ApiError) -> Self {
        let error = match &e {
            ApiError::RetriesExhausted { attempts, .. } => Self::retries_exhausted("Backend request", *attempts),
            ApiError::Request(r) if !r.is_timeout() => {
                Self::network(e.to_string()).with_suggestion("Check MEETPOINT_API_URL and your connection")
            }
            ApiError::CircuitOpen => Self::new(ErrorCode::CircuitOpen, e.to_string())
                .with_suggestion("The backend kept failing; wait a moment before retrying"),
            _ if e.is_forbidden() => {
                Self::new(e.code(), e.to_string()).with_suggestion("Set MEETPOINT_API_TOKEN to a valid token")
            }
            _ => Self::new(e.code(), e.to_string()),
        };
        error.with_source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::api_response(503, "unavailable").is_retryable());
        assert!(ApiError::api_response(429, "slow down").is_retryable());
        assert!(!ApiError::api_response(404, "no such meeting").is_retryable());
        assert!(!ApiError::CircuitOpen.is_retryable());
        assert!(ApiError::Timeout(std::time::Duration::from_secs(5)).is_retryable());
    }

    #[test]
    fn test_exhausted_retries_keep_last_retryability() {
        let transient = ApiError::RetriesExhausted {
            attempts: 3,
            last_error: "API error (503): unavailable".into(),
            transient: true,
        };
        assert!(transient.is_retryable());

        let permanent = ApiError::RetriesExhausted {
            attempts: 2,
            last_error: "API error (404): no such meeting".into(),
            transient: false,
        };
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn test_forbidden() {
        assert!(ApiError::api_response(403, "organizer only").is_forbidden());
        assert!(ApiError::api_response(401, "login").is_forbidden());
        assert!(!ApiError::api_response(400, "bad").is_forbidden());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::CircuitOpen.code(), ErrorCode::CircuitOpen);
        assert_eq!(ApiError::api_response(500, "x").code(), ErrorCode::BackendError);
    }

    #[test]
    fn test_into_core_error() {
        let core = meetpoint_core::Error::from(ApiError::RetriesExhausted {
            attempts: 3,
            last_error: "503".into(),
            transient: true,
        });
        assert_eq!(core.code, ErrorCode::RetriesExhausted);
        assert!(core.suggestion.is_some());

        let core = meetpoint_core::Error::from(ApiError::api_response(403, "organizer only"));
        assert_eq!(core.code, ErrorCode::BackendError);
        assert!(core.suggestion.unwrap().contains("MEETPOINT_API_TOKEN"));
    }
}

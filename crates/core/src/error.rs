//! Error handling with codes, context and recovery suggestions
//!
//! Every crate in the workspace keeps its own typed errors; this type is the
//! common currency when an error has to cross a crate boundary or be shown
//! to a user:
//! - Error codes for programmatic handling
//! - Detailed context (which meeting, which operation)
//! - Recovery suggestions
//! - Serializable error reports

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable numeric codes, grouped by category in the thousands digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General errors (1xxx)
    Unknown = 1000,
    Internal = 1001,
    Timeout = 1003,
    Cancelled = 1004,

    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,

    // Configuration errors (3xxx)
    ConfigError = 3000,
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    ConfigValidationError = 3003,

    // Validation errors (6xxx)
    ValidationError = 6000,
    InvalidInput = 6001,
    InvalidFormat = 6002,

    // Network errors (9xxx)
    NetworkError = 9000,
    BackendError = 9001,
    RetriesExhausted = 9002,
    CircuitOpen = 9003,

    // Geo errors (10xxx)
    InvalidCoordinate = 10002,
    SentinelCoordinate = 10004,

    // Geolocation errors (11xxx)
    GeolocationUnavailable = 11001,
    GeolocationPermissionDenied = 11002,
    GeolocationTimeout = 11003,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            1 => "General",
            2 => "IO",
            3 => "Configuration",
            6 => "Validation",
            9 => "Network",
            10 => "Geo",
            11 => "Geolocation",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// A user-facing error: code, message and optional recovery hints
#[derive(Error, Debug)]
pub struct Error {
    /// Stable code, also used to pick the CLI exit code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Where it happened, e.g. the meeting and operation
    pub context: Option<String>,
    /// What the user can do about it
    pub suggestion: Option<String>,
    /// Underlying cause, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {ctx}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

impl Error {
    /// Error with just a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Set the context line
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Keep the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Flattened form for `--format json` output
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(ToString::to_string),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a .meetpoint.toml file or pass --config to specify a path")
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigValidationError, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn invalid_coordinate(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidCoordinate, message)
            .with_suggestion("Coordinates are [longitude, latitude] with lat in -90..=90 and lng in -180..=180")
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    pub fn retries_exhausted(operation: &str, attempts: u32) -> Self {
        Self::new(
            ErrorCode::RetriesExhausted,
            format!("{operation} failed after {attempts} attempts"),
        )
        .with_suggestion("Check your connection and try again")
    }

    pub fn geolocation_denied() -> Self {
        Self::new(
            ErrorCode::GeolocationPermissionDenied,
            "Location permission was denied",
        )
        .with_suggestion("Allow location access for this site and retry")
    }
}

/// Serializable snapshot of an [`Error`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const NETWORK_ERROR: i32 = 4;
    pub const TIMEOUT: i32 = 124;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::InvalidFormat, format!("JSON parse error: {err}")).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {err}"))
            .with_source(err)
    }
}

/// Attach context or a suggestion to the error side of a [`Result`]
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::InvalidInput.to_string(), "E6001");
        assert_eq!(ErrorCode::InvalidCoordinate.to_string(), "E10002");
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::ConfigParseError.category(), "Configuration");
        assert_eq!(ErrorCode::BackendError.category(), "Network");
        assert_eq!(ErrorCode::SentinelCoordinate.category(), "Geo");
        assert_eq!(ErrorCode::GeolocationTimeout.category(), "Geolocation");
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::invalid_coordinate("longitude 200 out of range")
            .with_context("While committing the meeting location");

        assert_eq!(err.code, ErrorCode::InvalidCoordinate);
        assert!(err.context.is_some());
        assert!(err.suggestion.is_some());
        assert!(err.to_string().starts_with("[E10002]"));
    }

    #[test]
    fn test_result_ext_adds_context() {
        let result: Result<()> = Err(Error::network("connection reset"));
        let err = result.context("meeting m-1: suggestions").unwrap_err();
        assert_eq!(err.context.as_deref(), Some("meeting m-1: suggestions"));
    }

    #[test]
    fn test_error_report_serialization() {
        let err = Error::retries_exhausted("location push", 3).with_context("meeting m-42");

        let report = err.to_report();
        let json = serde_json::to_string(&report).unwrap();

        assert!(json.contains("E9002"));
        assert!(json.contains("Network"));
        assert!(json.contains("meeting m-42"));
    }
}

//! Configuration for the Meetpoint API client
//!
//! Supports environment-based configuration with sensible defaults.

use crate::error::{ApiError, ApiResult};
use meetpoint_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default production API URL
const DEFAULT_API_URL: &str = "https://api.meetpoint.app/v1";

/// Environment types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development against a backend on localhost
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    #[default]
    Production,
}

impl Environment {
    /// Parse from the `MEETPOINT_ENV` environment variable
    pub fn from_env() -> Self {
        Self::parse(&env::var("MEETPOINT_ENV").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }

    /// Retry profile used when nothing else is configured
    #[must_use]
    pub fn retry_profile(self) -> RetryConfig {
        match self {
            Self::Development => RetryConfig::quick(),
            Self::Staging => RetryConfig::default(),
            Self::Production => RetryConfig::patient(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the meetings API
    pub base_url: String,
    /// Bearer token identifying the signed-in attendee
    pub bearer_token: Option<String>,
    /// Key handed to the map provider, never sent to the meetings API
    pub maps_api_key: Option<String>,
    /// Request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retry configuration for idempotent calls
    pub retry: RetryConfig,
    /// Current environment
    pub environment: Environment,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            bearer_token: None,
            maps_api_key: None,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            environment: Environment::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `MEETPOINT_API_URL`: Base URL of the meetings API
    /// - `MEETPOINT_API_TOKEN`: Bearer token for the signed-in attendee
    /// - `MEETPOINT_MAPS_API_KEY`: Key for the map provider
    /// - `MEETPOINT_ENV`: Environment (development/staging/production)
    /// - `MEETPOINT_TIMEOUT_SECS`: Request timeout in seconds
    pub fn from_env() -> ApiResult<Self> {
        let environment = Environment::from_env();

        let base_url = match env::var("MEETPOINT_API_URL") {
            Ok(url) => url,
            Err(env::VarError::NotPresent) => match environment {
                Environment::Development => "http://localhost:8787/v1".to_string(),
                Environment::Staging | Environment::Production => DEFAULT_API_URL.to_string(),
            },
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ApiError::config("MEETPOINT_API_URL is not valid UTF-8"));
            }
        };

        let bearer_token = env::var("MEETPOINT_API_TOKEN").ok().filter(|t| !t.is_empty());
        let maps_api_key = env::var("MEETPOINT_MAPS_API_KEY").ok().filter(|k| !k.is_empty());

        let timeout = match env::var("MEETPOINT_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ApiError::config(format!("MEETPOINT_TIMEOUT_SECS is not a number: {raw}")))?,
            Err(_) => Duration::from_secs(30),
        };

        Ok(Self {
            base_url,
            bearer_token,
            maps_api_key,
            timeout,
            retry: environment.retry_profile(),
            environment,
        })
    }

    /// Create development configuration (local backend)
    #[must_use]
    pub fn development() -> Self {
        Self {
            base_url: "http://localhost:8787/v1".to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::quick(),
            environment: Environment::Development,
            ..Self::default()
        }
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set the bearer token
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Builder-style method to set the map provider key
    #[must_use]
    pub fn with_maps_api_key(mut self, key: impl Into<String>) -> Self {
        self.maps_api_key = Some(key.into());
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        if self.retry.max_attempts == 0 {
            return Err(ApiError::config("retry.max_attempts must be at least 1"));
        }

        Ok(())
    }

    /// The map provider key, or an error naming the variable to set
    pub fn require_maps_api_key(&self) -> ApiResult<&str> {
        self.maps_api_key
            .as_deref()
            .ok_or_else(|| ApiError::missing_env("MEETPOINT_MAPS_API_KEY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = ClientConfig::development();
        assert!(config.base_url.contains("localhost"));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.retry, RetryConfig::quick());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::parse("dev"), Environment::Development);
        assert_eq!(Environment::parse(" Staging "), Environment::Staging);
        assert_eq!(Environment::parse(""), Environment::Production);
        assert_eq!(Environment::Production.retry_profile(), RetryConfig::patient());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::default()
            .with_base_url("https://staging.meetpoint.app/v1")
            .with_bearer_token("tok")
            .with_timeout(Duration::from_secs(60));

        assert_eq!(config.base_url, "https://staging.meetpoint.app/v1");
        assert_eq!(config.bearer_token.as_deref(), Some("tok"));
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(ClientConfig::default().with_base_url("").validate().is_err());
        assert!(ClientConfig::default().with_base_url("ftp://x").validate().is_err());
        assert!(ClientConfig::default().with_timeout(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_maps_key_required() {
        let err = ClientConfig::default().require_maps_api_key().unwrap_err();
        assert!(matches!(err, ApiError::MissingEnvVar(ref v) if v == "MEETPOINT_MAPS_API_KEY"));
        let config = ClientConfig::default().with_maps_api_key("k");
        assert_eq!(config.require_maps_api_key().unwrap(), "k");
    }
}

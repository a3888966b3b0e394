//! Configuration schema definitions
//!
//! Engine settings shared by the library crates and the CLI. Every field has
//! a default, so an empty file (or no file at all) is a valid configuration.

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest search radius accepted for suggestion queries, in meters
pub const MIN_RADIUS_METERS: u32 = 1;

/// Largest search radius accepted for suggestion queries, in meters
pub const MAX_RADIUS_METERS: u32 = 50_000;

/// Root configuration schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineSettings {
    #[serde(default)]
    pub suggestions: SuggestionSettings,

    #[serde(default)]
    pub geolocation: GeolocationSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl EngineSettings {
    /// Validate value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.suggestions.debounce_ms == 0 {
            return Err(Error::config_invalid("suggestions.debounce_ms must be greater than zero"));
        }
        if !(MIN_RADIUS_METERS..=MAX_RADIUS_METERS).contains(&self.suggestions.default_radius_m) {
            return Err(Error::config_invalid(format!(
                "suggestions.default_radius_m must be within {MIN_RADIUS_METERS}..={MAX_RADIUS_METERS}"
            )));
        }
        if self.suggestions.default_place_type.trim().is_empty() {
            return Err(Error::config_invalid("suggestions.default_place_type cannot be empty"));
        }
        if self.geolocation.poll_interval_secs == 0 {
            return Err(Error::config_invalid("geolocation.poll_interval_secs must be greater than zero"));
        }
        if self.geolocation.timeout_secs == 0 {
            return Err(Error::config_invalid("geolocation.timeout_secs must be greater than zero"));
        }
        if self.store.stale_after_secs == 0 {
            return Err(Error::config_invalid("store.stale_after_secs must be greater than zero"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config_invalid("retry.max_attempts must be at least 1"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config_invalid("retry.backoff_multiplier must be >= 1.0"));
        }
        Ok(())
    }
}

/// Suggestion query settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSettings {
    /// Quiet period before a filter change triggers a backend call
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Radius used when the caller does not pick one
    #[serde(default = "default_radius_m")]
    pub default_radius_m: u32,

    /// Place type used when the caller does not pick one
    #[serde(default = "default_place_type")]
    pub default_place_type: String,
}

impl SuggestionSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            default_radius_m: default_radius_m(),
            default_place_type: default_place_type(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_radius_m() -> u32 {
    1500
}

fn default_place_type() -> String {
    "restaurant".to_string()
}

/// Device geolocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationSettings {
    /// Periodic re-poll interval alongside the continuous watch
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound for a single position request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Oldest cached fix the platform may hand back
    #[serde(default = "default_maximum_age_secs")]
    pub maximum_age_secs: u64,

    /// Ask the platform for GPS-grade fixes
    #[serde(default = "default_true")]
    pub high_accuracy: bool,
}

impl GeolocationSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn maximum_age(&self) -> Duration {
        Duration::from_secs(self.maximum_age_secs)
    }
}

impl Default for GeolocationSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
            maximum_age_secs: default_maximum_age_secs(),
            high_accuracy: true,
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_maximum_age_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Attendee location store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Age after which an attendee's location is flagged as stale
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl StoreSettings {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_stale_after_secs() -> u64 {
    60
}

/// Backoff policy for suggestion fetches and location pushes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: settings.backoff_multiplier,
            jitter: settings.jitter,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

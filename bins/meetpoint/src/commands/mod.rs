//! CLI command implementations

pub mod centroid;
pub mod locations;
pub mod select;
pub mod suggest;
pub mod track;

use crate::output::OutputFormat;
use anyhow::Result;
use meetpoint_api_client::{ClientConfig, MeetpointClient};
use meetpoint_core::config::{Config, EngineSettings};
use meetpoint_core::retry::RetryConfig;
use meetpoint_engine::SessionConfig;
use std::sync::Arc;
use tracing::debug;

/// Shared command inputs
pub struct Context {
    pub format: OutputFormat,
    pub settings: EngineSettings,
    /// Retry policy from a settings file; the environment profile otherwise
    retry: Option<RetryConfig>,
}

impl Context {
    pub fn new(format: OutputFormat, config: Config) -> Self {
        let retry = config.path.is_some().then(|| RetryConfig::from(&config.settings.retry));
        Self {
            format,
            settings: config.settings,
            retry,
        }
    }

    /// Backend client from the environment
    pub fn client(&self) -> Result<Arc<MeetpointClient>> {
        let mut config = ClientConfig::from_env()?;
        if let Some(retry) = &self.retry {
            config = config.with_retry(retry.clone());
        }
        debug!(base_url = %config.base_url, environment = ?config.environment, "Backend client configured");
        Ok(Arc::new(MeetpointClient::with_config(config)?))
    }

    /// Session settings for one meeting
    pub fn session(&self, meeting_id: &str, attendee_id: &str) -> SessionConfig {
        SessionConfig::new(meeting_id, attendee_id).with_settings(self.settings.clone())
    }
}

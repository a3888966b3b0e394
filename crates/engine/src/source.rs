//! Device position sources.
//!
//! A [`PositionSource`] is the platform positioning API: one-shot fixes plus
//! a continuous watch identified by a handle that must be cleared when the
//! consumer goes away.

use crate::error::GeolocationError;
use chrono::{DateTime, Utc};
use meetpoint_core::config::GeolocationSettings;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Identifies an active platform watch
pub type WatchId = u64;

/// How fixes should be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Give up on a fix after this long
    pub timeout: Duration,
    /// Oldest cached fix the platform may hand back
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::from(&GeolocationSettings::default())
    }
}

impl From<&GeolocationSettings> for PositionOptions {
    fn from(settings: &GeolocationSettings) -> Self {
        Self {
            high_accuracy: settings.high_accuracy,
            timeout: settings.timeout(),
            maximum_age: settings.maximum_age(),
        }
    }
}

impl PositionOptions {
    /// Same options, but refusing any cached fix
    #[must_use]
    pub fn fresh(self) -> Self {
        Self {
            maximum_age: Duration::ZERO,
            ..self
        }
    }
}

/// A raw, unvalidated fix as the platform reports it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    /// A fix observed now
    #[must_use]
    pub fn now(latitude: f64, longitude: f64, accuracy: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp: Utc::now(),
        }
    }

    /// Age relative to `now`; fixes stamped in the future count as brand new
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }
}

/// A running platform watch: its handle and the stream of updates
#[derive(Debug)]
pub struct PlatformWatch {
    pub id: WatchId,
    pub updates: mpsc::Receiver<Result<PositionFix, GeolocationError>>,
}

/// Platform positioning API
pub trait PositionSource: Send + Sync + 'static {
    /// One fix, honoring `options`
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<PositionFix, GeolocationError>> + Send;

    /// Start a continuous watch
    fn watch_position(&self, options: &PositionOptions) -> Result<PlatformWatch, GeolocationError>;

    /// Release a watch handle; unknown ids are ignored
    fn clear_watch(&self, id: WatchId);
}

/// For hosts without positioning hardware
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl PositionSource for Unsupported {
    async fn current_position(&self, _options: &PositionOptions) -> Result<PositionFix, GeolocationError> {
        Err(GeolocationError::Unavailable)
    }

    fn watch_position(&self, _options: &PositionOptions) -> Result<PlatformWatch, GeolocationError> {
        Err(GeolocationError::Unavailable)
    }

    fn clear_watch(&self, _id: WatchId) {}
}

/// One recorded step of a position track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayStep {
    /// A fix; restamped with the replay time when `timestamp` is missing
    Fix {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        accuracy: Option<f64>,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
    /// A platform error
    Error { error: ReplayError },
}

/// Errors that can appear in a recorded track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayError {
    PermissionDenied,
    Unavailable,
    Timeout,
}

impl From<ReplayError> for GeolocationError {
    fn from(e: ReplayError) -> Self {
        match e {
            ReplayError::PermissionDenied => Self::PermissionDenied,
            ReplayError::Unavailable => Self::Unavailable,
            ReplayError::Timeout => Self::Timeout,
        }
    }
}

impl ReplayStep {
    fn resolve(&self) -> Result<PositionFix, GeolocationError> {
        match *self {
            Self::Fix {
                latitude,
                longitude,
                accuracy,
                timestamp,
            } => Ok(PositionFix {
                latitude,
                longitude,
                accuracy,
                timestamp: timestamp.unwrap_or_else(Utc::now),
            }),
            Self::Error { error } => Err(error.into()),
        }
    }
}

/// Replays a recorded track: the first step answers the initial
/// `current_position`, the rest are streamed through the watch at a fixed
/// pace. Once the track is used up, one-shot requests time out.
#[derive(Debug)]
pub struct ReplaySource {
    steps: Mutex<VecDeque<ReplayStep>>,
    pace: Duration,
    next_id: AtomicU64,
    watches: Mutex<HashMap<WatchId, JoinHandle<()>>>,
}

impl ReplaySource {
    /// Create a replay over `steps`, emitting one step per `pace`
    #[must_use]
    pub fn new(steps: Vec<ReplayStep>, pace: Duration) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            pace,
            next_id: AtomicU64::new(1),
            watches: Mutex::new(HashMap::new()),
        }
    }

    /// Parse a JSON array of steps
    pub fn from_json(json: &str, pace: Duration) -> serde_json::Result<Self> {
        let steps: Vec<ReplayStep> = serde_json::from_str(json)?;
        Ok(Self::new(steps, pace))
    }

    /// Steps not yet delivered
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of watches that have not been cleared
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether every step has been delivered
    #[must_use]
    pub fn finished(&self) -> bool {
        self.remaining() == 0
            && self
                .watches
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .all(JoinHandle::is_finished)
    }

    fn next_step(&self) -> Option<ReplayStep> {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }
}

impl PositionSource for ReplaySource {
    async fn current_position(&self, _options: &PositionOptions) -> Result<PositionFix, GeolocationError> {
        match self.next_step() {
            Some(step) => step.resolve(),
            None => Err(GeolocationError::Timeout),
        }
    }

    fn watch_position(&self, _options: &PositionOptions) -> Result<PlatformWatch, GeolocationError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let steps: Vec<ReplayStep> = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let (tx, updates) = mpsc::channel(steps.len().max(1));
        let pace = self.pace;

        let task = tokio::spawn(async move {
            for step in steps {
                tokio::time::sleep(pace).await;
                if tx.send(step.resolve()).await.is_err() {
                    break;
                }
            }
            debug!(watch_id = id, "Replay finished");
        });

        self.watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, task);
        Ok(PlatformWatch { id, updates })
    }

    fn clear_watch(&self, id: WatchId) {
        if let Some(task) = self
            .watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
        {
            task.abort();
            debug!(watch_id = id, "Replay watch cleared");
        }
    }
}

//! Geolocation Watcher
//!
//! Wraps a [`PositionSource`] for the attendee using this device:
//!
//! ```text
//! Idle -> Requesting -> Watching
//!                    -> PermissionDenied
//!                    -> Unavailable
//! ```
//!
//! Every fix, whether from the continuous watch, the periodic poll or the
//! initial request, goes through the same pipeline: reject if older than the
//! maximum age (and ask for a fresh one), validate, record locally, then push
//! to the backend in the background. A failed push is logged; the local
//! record stays.

use crate::backend::MeetingBackend;
use crate::error::GeolocationError;
use crate::hub::LocationHub;
use crate::source::{PositionFix, PositionOptions, PositionSource, WatchId};
use chrono::Utc;
use meetpoint_api_client::LocationUpdate;
use meetpoint_core::config::GeolocationSettings;
use meetpoint_geo::GeoPoint;
use meetpoint_telemetry::metrics;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Watcher lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    Idle,
    Requesting,
    Watching,
    PermissionDenied,
    Unavailable,
}

impl WatcherState {
    fn from_error(error: GeolocationError) -> Self {
        match error {
            GeolocationError::PermissionDenied => Self::PermissionDenied,
            GeolocationError::Unavailable | GeolocationError::Timeout => Self::Unavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Initial,
    Watch,
    Poll,
    Refetch,
}

impl Origin {
    fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Watch => "watch",
            Self::Poll => "poll",
            Self::Refetch => "refetch",
        }
    }
}

enum Sample {
    Accepted,
    Dropped,
    TooOld,
}

#[derive(Debug, Default)]
struct Handles {
    watch_id: Option<WatchId>,
    tasks: Vec<JoinHandle<()>>,
}

struct Shared<B, S> {
    backend: Arc<B>,
    source: Arc<S>,
    hub: Arc<LocationHub>,
    meeting_id: String,
    attendee_id: String,
    options: PositionOptions,
    poll_interval: Duration,
    state: watch::Sender<WatcherState>,
    handles: Mutex<Handles>,
}

/// Feeds this device's position into the store and the backend
pub struct GeolocationWatcher<B: MeetingBackend, S: PositionSource> {
    shared: Arc<Shared<B, S>>,
}

impl<B: MeetingBackend, S: PositionSource> GeolocationWatcher<B, S> {
    /// Create an idle watcher for `attendee_id` in `meeting_id`
    pub fn new(
        backend: Arc<B>,
        source: Arc<S>,
        hub: Arc<LocationHub>,
        meeting_id: impl Into<String>,
        attendee_id: impl Into<String>,
        settings: &GeolocationSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                source,
                hub,
                meeting_id: meeting_id.into(),
                attendee_id: attendee_id.into(),
                options: PositionOptions::from(settings),
                poll_interval: settings.poll_interval(),
                state: watch::channel(WatcherState::Idle).0,
                handles: Mutex::new(Handles::default()),
            }),
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> WatcherState {
        *self.shared.state.borrow()
    }

    /// Subscribe to lifecycle changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WatcherState> {
        self.shared.state.subscribe()
    }

    /// Request an initial fix and start the watch and poll loops.
    ///
    /// Calling this while watching is a no-op; calling it after a permission
    /// or availability failure retries from scratch.
    pub async fn start(&self) -> Result<(), GeolocationError> {
        let shared = &self.shared;
        if self.state() == WatcherState::Watching {
            return Ok(());
        }
        shared.halt(WatcherState::Requesting);
        info!(meeting_id = %shared.meeting_id, "Requesting device location");

        match shared.fetch(shared.options).await {
            Ok(fix) => {
                shared.ingest(fix, Origin::Initial).await;
            }
            Err(GeolocationError::Timeout) => {
                warn!(meeting_id = %shared.meeting_id, "Initial fix timed out, continuing with watch");
            }
            Err(e) => {
                shared.halt(WatcherState::from_error(e));
                return Err(e);
            }
        }
        // A refetch during the initial fix may already have stopped us
        match self.state() {
            WatcherState::Requesting => {}
            WatcherState::PermissionDenied => return Err(GeolocationError::PermissionDenied),
            _ => return Err(GeolocationError::Unavailable),
        }

        let platform = match shared.source.watch_position(&shared.options) {
            Ok(platform) => platform,
            Err(e) => {
                shared.halt(WatcherState::from_error(e));
                return Err(e);
            }
        };

        let watch_task = tokio::spawn(Arc::clone(shared).run_watch(platform.updates));
        let poll_task = tokio::spawn(Arc::clone(shared).run_poll());
        {
            let mut handles = shared.handles.lock().unwrap_or_else(PoisonError::into_inner);
            handles.watch_id = Some(platform.id);
            handles.tasks.push(watch_task);
            handles.tasks.push(poll_task);
        }
        shared.state.send_replace(WatcherState::Watching);
        info!(meeting_id = %shared.meeting_id, watch_id = platform.id, "Watching device location");
        Ok(())
    }

    /// Stop watching: clears the platform watch and cancels polling and pending pushes
    pub fn stop(&self) {
        self.shared.halt(WatcherState::Idle);
    }
}

impl<B: MeetingBackend, S: PositionSource> Drop for GeolocationWatcher<B, S> {
    fn drop(&mut self) {
        self.shared.halt(WatcherState::Idle);
    }
}

impl<B: MeetingBackend, S: PositionSource> Shared<B, S> {
    /// Release everything and move to `next`
    fn halt(&self, next: WatcherState) {
        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(id) = handles.watch_id {
            self.source.clear_watch(id);
            debug!(meeting_id = %self.meeting_id, watch_id = id, "Platform watch cleared");
        }
        for task in handles.tasks {
            task.abort();
        }
        self.state.send_replace(next);
    }

    async fn fetch(&self, options: PositionOptions) -> Result<PositionFix, GeolocationError> {
        match tokio::time::timeout(options.timeout, self.source.current_position(&options)).await {
            Ok(result) => result,
            Err(_) => Err(GeolocationError::Timeout),
        }
    }

    /// Returns whether the watcher has to stop
    fn on_error(&self, error: GeolocationError, origin: Origin) -> bool {
        if error.is_terminal() {
            warn!(meeting_id = %self.meeting_id, origin = origin.as_str(), %error, "Location lost, stopping watcher");
            metrics().increment("geolocation.terminal_errors");
            self.halt(WatcherState::from_error(error));
            true
        } else {
            debug!(meeting_id = %self.meeting_id, origin = origin.as_str(), %error, "Location request timed out");
            metrics().increment("geolocation.timeouts");
            false
        }
    }

    async fn ingest(self: &Arc<Self>, fix: PositionFix, origin: Origin) {
        if let Sample::TooOld = self.accept(fix, origin) {
            if origin == Origin::Refetch {
                return;
            }
            match self.fetch(self.options.fresh()).await {
                Ok(fresh) => {
                    if let Sample::TooOld = self.accept(fresh, Origin::Refetch) {
                        debug!(meeting_id = %self.meeting_id, "Fresh fix still too old, dropping");
                    }
                }
                Err(e) => {
                    self.on_error(e, Origin::Refetch);
                }
            }
        }
    }

    fn accept(self: &Arc<Self>, fix: PositionFix, origin: Origin) -> Sample {
        let age = fix.age(Utc::now());
        if age > self.options.maximum_age {
            metrics().increment("geolocation.samples_too_old");
            debug!(
                meeting_id = %self.meeting_id,
                origin = origin.as_str(),
                age_secs = age.as_secs(),
                "Fix older than maximum age"
            );
            return Sample::TooOld;
        }

        let point = match GeoPoint::new(fix.longitude, fix.latitude) {
            Ok(point) => point,
            Err(e) => {
                metrics().increment("geolocation.samples_dropped");
                warn!(meeting_id = %self.meeting_id, origin = origin.as_str(), error = %e, "Dropping invalid fix");
                return Sample::Dropped;
            }
        };

        let outcome = self
            .hub
            .record_local(&self.attendee_id, point, fix.accuracy, fix.timestamp);
        if !outcome.changed() {
            return Sample::Dropped;
        }
        metrics().increment("geolocation.samples_accepted");
        self.spawn_push(LocationUpdate::new(point, fix.accuracy));
        Sample::Accepted
    }

    fn spawn_push(self: &Arc<Self>, update: LocationUpdate) {
        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            match shared.backend.push_location(&shared.meeting_id, &update).await {
                Ok(locations) => shared.hub.apply_remote(&locations, Utc::now()),
                Err(e) => {
                    metrics().increment("geolocation.push_failed");
                    warn!(meeting_id = %shared.meeting_id, error = %e, "Location push failed, keeping local position");
                }
            }
        });

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.tasks.retain(|t| !t.is_finished());
        handles.tasks.push(task);
    }

    async fn run_watch(
        self: Arc<Self>,
        mut updates: mpsc::Receiver<Result<PositionFix, GeolocationError>>,
    ) {
        while let Some(update) = updates.recv().await {
            match update {
                Ok(fix) => self.ingest(fix, Origin::Watch).await,
                Err(e) => {
                    if self.on_error(e, Origin::Watch) {
                        return;
                    }
                }
            }
        }
        debug!(meeting_id = %self.meeting_id, "Platform watch ended");
    }

    async fn run_poll(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; the initial fix already covered it
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match self.fetch(self.options).await {
                Ok(fix) => self.ingest(fix, Origin::Poll).await,
                Err(e) => {
                    if self.on_error(e, Origin::Poll) {
                        return;
                    }
                }
            }
        }
    }
}

//! One meeting view.
//!
//! [`LocationSession`] wires the store, suggestion coordinator, committer
//! and geolocation watcher together around a shared [`LocationHub`] and owns
//! their lifecycle: [`LocationSession::shutdown`] (or dropping the session)
//! releases the platform watch, stops polling and invalidates pending
//! suggestion lookups.

use crate::backend::MeetingBackend;
use crate::central::CentralLocation;
use crate::commit::{LocationCommitter, SelectionChoice};
use crate::error::{EngineError, EngineResult};
use crate::hub::LocationHub;
use crate::map::{MapProvider, MapView};
use crate::source::{PositionSource, Unsupported};
use crate::store::AttendeeLocation;
use crate::suggestions::{SuggestionCoordinator, SuggestionState};
use crate::watcher::{GeolocationWatcher, WatcherState};
use chrono::{DateTime, Utc};
use meetpoint_api_client::{PlaceSuggestion, SelectedMeetingLocation, SuggestionFilter};
use meetpoint_core::config::EngineSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{OnceCell, watch};
use tracing::{info, instrument};

/// Who is looking at which meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub meeting_id: String,
    /// Attendee using this device
    pub attendee_id: String,
    pub is_organizer: bool,
    #[serde(default)]
    pub settings: EngineSettings,
}

impl SessionConfig {
    pub fn new(meeting_id: impl Into<String>, attendee_id: impl Into<String>) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            attendee_id: attendee_id.into(),
            is_organizer: false,
            settings: EngineSettings::default(),
        }
    }

    #[must_use]
    pub fn organizer(mut self, is_organizer: bool) -> Self {
        self.is_organizer = is_organizer;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Location state and operations for one meeting view
pub struct LocationSession<B: MeetingBackend, S: PositionSource = Unsupported> {
    config: SessionConfig,
    backend: Arc<B>,
    hub: Arc<LocationHub>,
    suggestions: SuggestionCoordinator<B>,
    committer: LocationCommitter<B>,
    watcher: GeolocationWatcher<B, S>,
    map_ready: OnceCell<()>,
}

impl<B: MeetingBackend> LocationSession<B, Unsupported> {
    /// A session on a host that cannot report its own position
    pub fn without_positioning(backend: Arc<B>, config: SessionConfig) -> Self {
        Self::new(backend, Arc::new(Unsupported), config)
    }
}

impl<B: MeetingBackend, S: PositionSource> LocationSession<B, S> {
    pub fn new(backend: Arc<B>, source: Arc<S>, config: SessionConfig) -> Self {
        let hub = Arc::new(LocationHub::default());
        let suggestions =
            SuggestionCoordinator::from_settings(Arc::clone(&backend), &config.meeting_id, &config.settings.suggestions)
                .with_hub(Arc::clone(&hub));
        let committer = LocationCommitter::new(
            Arc::clone(&backend),
            Arc::clone(&hub),
            &config.meeting_id,
            config.is_organizer,
        );
        let watcher = GeolocationWatcher::new(
            Arc::clone(&backend),
            source,
            Arc::clone(&hub),
            &config.meeting_id,
            &config.attendee_id,
            &config.settings.geolocation,
        );

        Self {
            config,
            backend,
            hub,
            suggestions,
            committer,
            watcher,
            map_ready: OnceCell::new(),
        }
    }

    pub fn meeting_id(&self) -> &str {
        &self.config.meeting_id
    }

    pub fn hub(&self) -> &Arc<LocationHub> {
        &self.hub
    }

    /// Pull attendee positions, the server center and any committed venue
    #[instrument(skip(self), fields(meeting_id = %self.config.meeting_id))]
    pub async fn refresh(&self) -> EngineResult<Option<CentralLocation>> {
        let locations = self
            .backend
            .attendee_locations(&self.config.meeting_id)
            .await
            .map_err(|source| EngineError::Refresh {
                meeting_id: self.config.meeting_id.clone(),
                source,
            })?;
        self.hub.apply_remote(&locations, Utc::now());
        info!(
            attendees = self.hub.store().len(),
            rejected = locations.rejected,
            "Locations refreshed"
        );
        Ok(self.hub.central())
    }

    pub fn central(&self) -> Option<CentralLocation> {
        self.hub.central()
    }

    pub fn subscribe_central(&self) -> watch::Receiver<Option<CentralLocation>> {
        self.hub.subscribe_central()
    }

    /// All known attendee positions, in first-seen order
    pub fn snapshot(&self) -> Vec<AttendeeLocation> {
        self.hub.store().snapshot()
    }

    /// Attendees whose last fix is older than the configured threshold
    pub fn stale_attendees(&self, now: DateTime<Utc>) -> Vec<String> {
        self.hub
            .store()
            .stale_attendees(now, self.config.settings.store.stale_after())
    }

    /// Filter used when the caller does not pick one
    pub fn default_filter(&self) -> SuggestionFilter {
        let settings = &self.config.settings.suggestions;
        SuggestionFilter::new(settings.default_place_type.clone(), settings.default_radius_m)
    }

    /// Look up venues around the current central location
    pub async fn request_suggestions(&self, filter: Option<SuggestionFilter>) -> EngineResult<Vec<PlaceSuggestion>> {
        let central = self
            .hub
            .central()
            .ok_or_else(|| EngineError::NoCentralLocation(self.config.meeting_id.clone()))?;
        let filter = filter.unwrap_or_else(|| self.default_filter());
        Ok(self
            .suggestions
            .request_suggestions(central.coordinate.to_array(), filter)
            .await?)
    }

    pub fn suggestion_state(&self) -> SuggestionState {
        self.suggestions.state()
    }

    pub fn subscribe_suggestions(&self) -> watch::Receiver<SuggestionState> {
        self.suggestions.subscribe()
    }

    /// Commit the meeting venue (organizer only)
    pub async fn commit(&self, choice: impl Into<SelectionChoice>) -> EngineResult<SelectedMeetingLocation> {
        Ok(self.committer.commit(choice).await?)
    }

    pub fn selected(&self) -> Option<SelectedMeetingLocation> {
        self.hub.selected()
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<SelectedMeetingLocation>> {
        self.hub.subscribe_selected()
    }

    /// Start sharing this device's position
    pub async fn start_watching(&self) -> EngineResult<()> {
        Ok(self.watcher.start().await?)
    }

    pub fn stop_watching(&self) {
        self.watcher.stop();
    }

    pub fn watcher_state(&self) -> WatcherState {
        self.watcher.state()
    }

    pub fn subscribe_watcher(&self) -> watch::Receiver<WatcherState> {
        self.watcher.subscribe()
    }

    /// The current state as a map frame
    pub fn map_view(&self) -> MapView {
        let suggestions = self.suggestions.state().suggestions;
        MapView::build(
            self.hub.central(),
            &self.snapshot(),
            &suggestions,
            self.hub.selected().as_ref(),
        )
    }

    /// Draw the current state; waits for the provider the first time
    pub async fn render<M: MapProvider>(&self, map: &M) -> EngineResult<MapView> {
        self.map_ready.get_or_try_init(|| map.ready()).await?;
        let view = self.map_view();
        map.show(&view)?;
        Ok(view)
    }

    /// Release the watch, stop polling and drop pending lookups
    pub fn shutdown(&self) {
        self.watcher.stop();
        self.suggestions.cancel_pending();
        info!(meeting_id = %self.config.meeting_id, "Location session closed");
    }
}

impl<B: MeetingBackend, S: PositionSource> Drop for LocationSession<B, S> {
    fn drop(&mut self) {
        self.suggestions.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::central::CentralBasis;
    use crate::map::{MapError, MarkerKind};
    use crate::source::PositionFix;
    use crate::testing::{FakeBackend, FakeSource, place};
    use meetpoint_api_client::{MeetingLocations, RemoteAttendee};
    use meetpoint_geo::GeoPoint;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn remote(id: &str, lng: f64, lat: f64) -> RemoteAttendee {
        RemoteAttendee {
            id: id.into(),
            name: Some(id.to_uppercase()),
            coordinate: GeoPoint::new(lng, lat).unwrap(),
            accuracy_meters: None,
            last_updated: None,
        }
    }

    fn backend_with_attendees() -> Arc<FakeBackend> {
        let backend = FakeBackend::default()
            .with_places("restaurant", vec![place("r1", -73.95, 40.73)], Duration::ZERO)
            .with_places("cafe", vec![place("c1", -73.96, 40.72)], Duration::ZERO);
        *backend.locations.lock().unwrap() = MeetingLocations {
            attendees: vec![remote("a", -74.0, 40.71), remote("b", -73.9, 40.75)],
            ..MeetingLocations::default()
        };
        Arc::new(backend)
    }

    #[derive(Default)]
    struct RecordingMap {
        ready_calls: AtomicUsize,
        shown: Mutex<Vec<MapView>>,
    }

    impl MapProvider for RecordingMap {
        async fn ready(&self) -> Result<(), MapError> {
            self.ready_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        }

        fn show(&self, view: &MapView) -> Result<(), MapError> {
            self.shown.lock().unwrap().push(view.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_computes_central() {
        let backend = backend_with_attendees();
        let session = LocationSession::without_positioning(backend, SessionConfig::new("m1", "me"));

        let central = session.refresh().await.unwrap().unwrap();
        assert_eq!(central.basis, CentralBasis::ClientComputed);
        assert!((central.coordinate.lng() - -73.95).abs() < 0.01);
        assert!((central.coordinate.lat() - 40.73).abs() < 0.01);
        assert_eq!(session.snapshot().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_names_meeting() {
        struct Down;
        impl crate::backend::MeetingBackend for Down {
            async fn attendee_locations(&self, _: &str) -> meetpoint_api_client::ApiResult<MeetingLocations> {
                Err(meetpoint_api_client::ApiError::Timeout(Duration::from_secs(30)))
            }
            async fn push_location(
                &self,
                _: &str,
                _: &meetpoint_api_client::LocationUpdate,
            ) -> meetpoint_api_client::ApiResult<MeetingLocations> {
                Err(meetpoint_api_client::ApiError::Timeout(Duration::from_secs(30)))
            }
            async fn suggestions(
                &self,
                _: &str,
                _: GeoPoint,
                _: &SuggestionFilter,
            ) -> meetpoint_api_client::ApiResult<meetpoint_api_client::SuggestionsPage> {
                Err(meetpoint_api_client::ApiError::Timeout(Duration::from_secs(30)))
            }
            async fn select_location(
                &self,
                _: &str,
                _: &meetpoint_api_client::SelectLocationRequest,
            ) -> meetpoint_api_client::ApiResult<SelectedMeetingLocation> {
                Err(meetpoint_api_client::ApiError::Timeout(Duration::from_secs(30)))
            }
        }

        let session = LocationSession::without_positioning(Arc::new(Down), SessionConfig::new("m7", "me"));
        let err = session.refresh().await.unwrap_err();
        assert!(matches!(&err, EngineError::Refresh { meeting_id, .. } if meeting_id == "m7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestions_need_a_center() {
        let backend = Arc::new(FakeBackend::default());
        let session = LocationSession::without_positioning(Arc::clone(&backend), SessionConfig::new("m1", "me"));

        let err = session.request_suggestions(None).await.unwrap_err();
        assert!(matches!(err, EngineError::NoCentralLocation(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestions_use_default_filter() {
        let backend = backend_with_attendees();
        let session = LocationSession::without_positioning(Arc::clone(&backend), SessionConfig::new("m1", "me"));
        session.refresh().await.unwrap();

        let places = session.request_suggestions(None).await.unwrap();
        assert_eq!(places[0].place_id, "r1");
        assert_eq!(backend.suggestion_calls(), [SuggestionFilter::new("restaurant", 1500)]);

        let places = session
            .request_suggestions(Some(SuggestionFilter::new("cafe", 800)))
            .await
            .unwrap();
        assert_eq!(places[0].place_id, "c1");
        assert_eq!(session.suggestion_state().suggestions[0].place_id, "c1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_reaches_subscribers() {
        let backend = backend_with_attendees();
        let session = LocationSession::without_positioning(
            Arc::clone(&backend),
            SessionConfig::new("m1", "me").organizer(true),
        );
        let mut selected = session.subscribe_selected();

        session.commit(place("r1", -73.95, 40.73)).await.unwrap();
        assert!(selected.has_changed().unwrap());
        assert_eq!(selected.borrow_and_update().as_ref().unwrap().name, "Place r1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_waits_for_ready_once() {
        let backend = backend_with_attendees();
        let session = LocationSession::without_positioning(backend, SessionConfig::new("m1", "me"));
        session.refresh().await.unwrap();
        let map = RecordingMap::default();

        let first = session.render(&map).await.unwrap();
        session.request_suggestions(None).await.unwrap();
        let second = session.render(&map).await.unwrap();

        assert_eq!(map.ready_calls.load(Ordering::SeqCst), 1);
        assert_eq!(map.shown.lock().unwrap().len(), 2);
        assert!(first.center.is_some());
        assert_eq!(first.markers_of(MarkerKind::Suggestion).count(), 0);
        assert_eq!(second.markers_of(MarkerKind::Suggestion).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_attendees_use_configured_threshold() {
        let backend = backend_with_attendees();
        let session = LocationSession::without_positioning(backend, SessionConfig::new("m1", "me"));
        session.refresh().await.unwrap();

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(session.stale_attendees(later), ["a", "b"]);
        assert!(session.stale_attendees(Utc::now()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_watch() {
        let backend = backend_with_attendees();
        let source = Arc::new(FakeSource::default());
        source.queue(Ok(PositionFix::now(40.72, -73.99, Some(10.0))));
        let session = LocationSession::new(Arc::clone(&backend), Arc::clone(&source), SessionConfig::new("m1", "me"));

        session.start_watching().await.unwrap();
        assert_eq!(session.watcher_state(), WatcherState::Watching);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(session.snapshot().iter().any(|a| a.attendee_id == "me"));

        session.shutdown();
        assert_eq!(session.watcher_state(), WatcherState::Idle);
        assert_eq!(*source.cleared.lock().unwrap(), [1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_restart_watching() {
        let backend = backend_with_attendees();
        let source = Arc::new(FakeSource::default());
        let session = LocationSession::new(Arc::clone(&backend), Arc::clone(&source), SessionConfig::new("m1", "me"));
        let mut states = session.subscribe_watcher();

        session.start_watching().await.unwrap();
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), WatcherState::Watching);

        session.stop_watching();
        assert_eq!(*states.borrow_and_update(), WatcherState::Idle);
        assert_eq!(source.cleared.lock().unwrap().len(), 1);

        session.start_watching().await.unwrap();
        assert_eq!(session.watcher_state(), WatcherState::Watching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestion_subscribers_see_results() {
        let backend = backend_with_attendees();
        let session = LocationSession::without_positioning(Arc::clone(&backend), SessionConfig::new("m1", "me"));
        let mut updates = session.subscribe_suggestions();
        session.refresh().await.unwrap();

        session.request_suggestions(None).await.unwrap();
        let state = updates.borrow_and_update().clone();
        assert!(state.in_flight.is_none());
        assert_eq!(state.shown_filter, Some(SuggestionFilter::new("restaurant", 1500)));
        assert_eq!(state.suggestions[0].place_id, "r1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_positioning_is_unavailable() {
        let backend = Arc::new(FakeBackend::default());
        let session = LocationSession::without_positioning(backend, SessionConfig::new("m1", "me"));
        let err = session.start_watching().await.unwrap_err();
        assert!(matches!(err, EngineError::Geolocation(crate::error::GeolocationError::Unavailable)));
        assert_eq!(session.watcher_state(), WatcherState::Unavailable);
    }
}

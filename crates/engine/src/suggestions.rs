//! Suggestion Query Coordinator
//!
//! Every request takes the next sequence number, waits out the debounce
//! window, and only calls the backend if no newer request arrived meanwhile.
//! A response is applied only if its sequence number is still the latest
//! when it arrives, so a slow earlier lookup can never overwrite a faster
//! later one. Failures keep the last good list visible.

use crate::backend::MeetingBackend;
use crate::error::{SuggestionError, SuggestionFetchError};
use crate::hub::LocationHub;
use meetpoint_api_client::{PlaceSuggestion, SuggestionFilter};
use meetpoint_core::config::{MAX_RADIUS_METERS, MIN_RADIUS_METERS, SuggestionSettings};
use meetpoint_geo::GeoPoint;
use meetpoint_telemetry::{Timer, metrics};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// A failed lookup, as shown next to the last good list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionFailure {
    pub filter: SuggestionFilter,
    pub message: String,
    pub retryable: bool,
}

/// What the suggestion list UI renders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionState {
    /// Last successful list, replaced wholesale
    pub suggestions: Vec<PlaceSuggestion>,
    /// Filter that produced `suggestions`
    pub shown_filter: Option<SuggestionFilter>,
    /// Filter of the newest request still pending
    pub in_flight: Option<SuggestionFilter>,
    /// Most recent failure, cleared by the next success
    pub last_error: Option<SuggestionFailure>,
}

/// Debounced, race-free suggestion lookups for one meeting
pub struct SuggestionCoordinator<B> {
    backend: Arc<B>,
    meeting_id: String,
    debounce: Duration,
    seq: AtomicU64,
    state: watch::Sender<SuggestionState>,
    hub: Option<Arc<LocationHub>>,
}

impl<B: MeetingBackend> SuggestionCoordinator<B> {
    /// Create a coordinator with the given debounce window
    pub fn new(backend: Arc<B>, meeting_id: impl Into<String>, debounce: Duration) -> Self {
        Self {
            backend,
            meeting_id: meeting_id.into(),
            debounce,
            seq: AtomicU64::new(0),
            state: watch::channel(SuggestionState::default()).0,
            hub: None,
        }
    }

    /// Forward a central point returned with suggestions to `hub`
    #[must_use]
    pub fn with_hub(mut self, hub: Arc<LocationHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Create a coordinator from engine settings
    pub fn from_settings(backend: Arc<B>, meeting_id: impl Into<String>, settings: &SuggestionSettings) -> Self {
        Self::new(backend, meeting_id, settings.debounce())
    }

    /// Look up venues around `center` (a `[lng, lat]` pair).
    ///
    /// Resolves to [`SuggestionError::Superseded`] when a newer request
    /// replaced this one, either during the debounce window or while the
    /// backend was answering.
    pub async fn request_suggestions(
        &self,
        center: [f64; 2],
        filter: SuggestionFilter,
    ) -> Result<Vec<PlaceSuggestion>, SuggestionError> {
        let center = GeoPoint::try_from(center)?;
        validate_filter(&filter)?;

        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        metrics().increment("suggestions.requested");
        self.state.send_modify(|s| s.in_flight = Some(filter.clone()));

        tokio::time::sleep(self.debounce).await;
        if !self.is_latest(seq) {
            metrics().increment("suggestions.debounced");
            debug!(meeting_id = %self.meeting_id, seq, %filter, "Superseded during debounce");
            return Err(SuggestionError::Superseded);
        }

        debug!(meeting_id = %self.meeting_id, seq, %filter, %center, "Fetching suggestions");
        let timer = Timer::start("suggestions.fetch_ms");
        let result = self.backend.suggestions(&self.meeting_id, center, &filter).await;
        timer.stop();

        match result {
            Ok(page) => {
                let applied = self.apply_if_latest(seq, |s| {
                    s.suggestions = page.suggestions.clone();
                    s.shown_filter = Some(filter.clone());
                    s.in_flight = None;
                    s.last_error = None;
                });
                if !applied {
                    return Err(self.discard_stale(seq));
                }
                if let (Some(hub), Some(server)) = (&self.hub, page.central_location) {
                    hub.adopt_server_central(server);
                }
                info!(
                    meeting_id = %self.meeting_id,
                    seq,
                    count = page.suggestions.len(),
                    rejected = page.rejected,
                    "Suggestions updated"
                );
                Ok(page.suggestions)
            }
            Err(source) => {
                let failure = SuggestionFailure {
                    filter: filter.clone(),
                    message: source.to_string(),
                    retryable: source.is_retryable(),
                };
                let applied = self.apply_if_latest(seq, |s| {
                    s.in_flight = None;
                    s.last_error = Some(failure);
                });
                if !applied {
                    return Err(self.discard_stale(seq));
                }
                metrics().increment("suggestions.failed");
                warn!(meeting_id = %self.meeting_id, seq, %filter, error = %source, "Suggestion lookup failed");
                Err(SuggestionFetchError {
                    meeting_id: self.meeting_id.clone(),
                    filter,
                    source,
                }
                .into())
            }
        }
    }

    /// Invalidate every pending request
    pub fn cancel_pending(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|s| s.in_flight.take().is_some());
    }

    /// Current list state
    #[must_use]
    pub fn state(&self) -> SuggestionState {
        self.state.borrow().clone()
    }

    /// Subscribe to list changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.state.subscribe()
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.seq.load(Ordering::SeqCst) == seq
    }

    /// Apply `update` only if `seq` is still the newest request
    fn apply_if_latest(&self, seq: u64, update: impl FnOnce(&mut SuggestionState)) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|s| {
            if self.is_latest(seq) {
                update(s);
                applied = true;
            }
            applied
        });
        applied
    }

    fn discard_stale(&self, seq: u64) -> SuggestionError {
        metrics().increment("suggestions.stale_discarded");
        debug!(meeting_id = %self.meeting_id, seq, "Discarding late suggestion response");
        SuggestionError::Superseded
    }
}

fn validate_filter(filter: &SuggestionFilter) -> Result<(), SuggestionError> {
    if filter.place_type.trim().is_empty() {
        return Err(SuggestionError::InvalidFilter("place type is empty".into()));
    }
    if !(MIN_RADIUS_METERS..=MAX_RADIUS_METERS).contains(&filter.radius_meters) {
        return Err(SuggestionError::InvalidFilter(format!(
            "radius {} m is outside {MIN_RADIUS_METERS}..={MAX_RADIUS_METERS} m",
            filter.radius_meters
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, place};
    use std::sync::atomic::Ordering;

    const NYC: [f64; 2] = [-73.95, 40.73];

    fn coordinator(backend: &Arc<FakeBackend>) -> Arc<SuggestionCoordinator<FakeBackend>> {
        Arc::new(SuggestionCoordinator::new(
            Arc::clone(backend),
            "m1",
            Duration::from_millis(300),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keeps_only_latest_filter() {
        let backend = Arc::new(
            FakeBackend::default().with_places("cafe", vec![place("c1", -73.95, 40.73)], Duration::ZERO),
        );
        let coordinator = coordinator(&backend);

        let first = coordinator.request_suggestions(NYC, SuggestionFilter::new("restaurant", 1000));
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            coordinator
                .request_suggestions(NYC, SuggestionFilter::new("cafe", 500))
                .await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.unwrap_err().is_superseded());
        assert_eq!(second.unwrap().len(), 1);
        assert_eq!(backend.suggestion_calls(), [SuggestionFilter::new("cafe", 500)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_does_not_overwrite_newer() {
        let backend = Arc::new(
            FakeBackend::default()
                .with_places("restaurant", vec![place("slow", -73.9, 40.7)], Duration::from_secs(2))
                .with_places("cafe", vec![place("fast", -73.96, 40.74)], Duration::ZERO),
        );
        let coordinator = coordinator(&backend);

        let slow = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move {
                coordinator
                    .request_suggestions(NYC, SuggestionFilter::new("restaurant", 1000))
                    .await
            }
        });
        // Past A's debounce: A is now waiting on the backend
        tokio::time::sleep(Duration::from_millis(500)).await;
        let fast = coordinator
            .request_suggestions(NYC, SuggestionFilter::new("cafe", 1000))
            .await
            .unwrap();
        assert_eq!(fast[0].place_id, "fast");

        let slow = slow.await.unwrap();
        assert!(slow.unwrap_err().is_superseded());

        let state = coordinator.state();
        assert_eq!(state.suggestions.len(), 1);
        assert_eq!(state.suggestions[0].place_id, "fast");
        assert_eq!(state.shown_filter, Some(SuggestionFilter::new("cafe", 1000)));
        assert!(state.in_flight.is_none());
        assert_eq!(backend.suggestion_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_center_reaches_hub() {
        let server = GeoPoint::new(-73.97, 40.75).unwrap();
        let backend = Arc::new(
            FakeBackend::default().with_places("cafe", vec![place("c1", -73.95, 40.73)], Duration::ZERO),
        );
        *backend.suggestion_center.lock().unwrap() = Some(server);
        let hub = Arc::new(LocationHub::default());
        let coordinator = SuggestionCoordinator::new(Arc::clone(&backend), "m1", Duration::from_millis(300))
            .with_hub(Arc::clone(&hub));
        let mut central = hub.subscribe_central();

        coordinator
            .request_suggestions(NYC, SuggestionFilter::new("cafe", 800))
            .await
            .unwrap();

        assert!(central.has_changed().unwrap());
        let published = central.borrow_and_update().unwrap();
        assert_eq!(published.basis, crate::central::CentralBasis::Server);
        assert_eq!(published.coordinate, server);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_good_list() {
        let backend = Arc::new(
            FakeBackend::default().with_places("cafe", vec![place("c1", -73.95, 40.73)], Duration::ZERO),
        );
        let coordinator = coordinator(&backend);
        let mut rx = coordinator.subscribe();

        coordinator
            .request_suggestions(NYC, SuggestionFilter::new("cafe", 800))
            .await
            .unwrap();
        rx.borrow_and_update();

        backend.fail_suggestions.store(true, Ordering::SeqCst);
        let err = coordinator
            .request_suggestions(NYC, SuggestionFilter::new("bar", 800))
            .await
            .unwrap_err();
        match err {
            SuggestionError::Fetch(e) => {
                assert_eq!(e.meeting_id, "m1");
                assert_eq!(e.filter, SuggestionFilter::new("bar", 800));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.suggestions[0].place_id, "c1");
        assert_eq!(state.shown_filter, Some(SuggestionFilter::new("cafe", 800)));
        let failure = state.last_error.unwrap();
        assert_eq!(failure.filter.place_type, "bar");
        assert!(failure.retryable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_call_inside_debounce_window() {
        let backend = Arc::new(
            FakeBackend::default().with_places("cafe", vec![place("c1", -73.95, 40.73)], Duration::ZERO),
        );
        let coordinator = coordinator(&backend);
        let filter = SuggestionFilter::new("cafe", 500);

        let mut request = tokio_test::task::spawn(coordinator.request_suggestions(NYC, filter.clone()));
        tokio_test::assert_pending!(request.poll());
        assert_eq!(coordinator.state().in_flight, Some(filter));
        assert!(backend.calls().is_empty());

        tokio::time::advance(Duration::from_millis(299)).await;
        tokio_test::assert_pending!(request.poll());
        assert!(backend.calls().is_empty());

        let places = tokio_test::assert_ok!(request.await);
        assert_eq!(places.len(), 1);
        assert_eq!(backend.suggestion_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_center_never_reaches_backend() {
        let backend = Arc::new(FakeBackend::default());
        let coordinator = coordinator(&backend);

        for center in [[0.0, 0.0], [200.0, 40.0], [f64::NAN, 40.0]] {
            let err = coordinator
                .request_suggestions(center, SuggestionFilter::new("cafe", 800))
                .await
                .unwrap_err();
            assert!(matches!(err, SuggestionError::InvalidCenter(_)), "{center:?}");
        }
        assert!(backend.calls().is_empty());
        assert!(coordinator.state().in_flight.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_filter() {
        let backend = Arc::new(FakeBackend::default());
        let coordinator = coordinator(&backend);

        for filter in [SuggestionFilter::new("cafe", 0), SuggestionFilter::new("cafe", 60_000), SuggestionFilter::new(" ", 500)] {
            assert!(matches!(
                coordinator.request_suggestions(NYC, filter).await,
                Err(SuggestionError::InvalidFilter(_))
            ));
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending() {
        let backend = Arc::new(FakeBackend::default());
        let coordinator = coordinator(&backend);

        let pending = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move {
                coordinator
                    .request_suggestions(NYC, SuggestionFilter::new("cafe", 800))
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(coordinator.state().in_flight.is_some());

        coordinator.cancel_pending();
        assert!(pending.await.unwrap().unwrap_err().is_superseded());
        assert!(coordinator.state().in_flight.is_none());
        assert!(backend.calls().is_empty());
    }
}

//! In-memory fakes of the backend and the platform position source.

use crate::backend::MeetingBackend;
use crate::error::GeolocationError;
use crate::source::{PlatformWatch, PositionFix, PositionOptions, PositionSource, WatchId};
use meetpoint_api_client::{
    ApiError, ApiResult, LocationUpdate, MeetingLocations, PlaceSuggestion, SelectLocationRequest,
    SelectedMeetingLocation, SuggestionFilter, SuggestionsPage,
};
use meetpoint_geo::GeoPoint;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    AttendeeLocations(String),
    Push(String, LocationUpdate),
    Suggestions(String, SuggestionFilter),
    Select(String, SelectLocationRequest),
}

#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    pub calls: Mutex<Vec<Call>>,
    pub locations: Mutex<MeetingLocations>,
    /// Suggestions and response delay per place type
    pub places: Mutex<HashMap<String, (Vec<PlaceSuggestion>, Duration)>>,
    /// Central point returned alongside suggestions
    pub suggestion_center: Mutex<Option<GeoPoint>>,
    pub fail_suggestions: AtomicBool,
    pub fail_push: AtomicBool,
    pub fail_select: AtomicBool,
}

impl FakeBackend {
    pub fn with_places(self, place_type: &str, places: Vec<PlaceSuggestion>, delay: Duration) -> Self {
        self.places
            .lock()
            .unwrap()
            .insert(place_type.to_string(), (places, delay));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn suggestion_calls(&self) -> Vec<SuggestionFilter> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Suggestions(_, filter) => Some(filter),
                _ => None,
            })
            .collect()
    }

    pub fn pushes(&self) -> Vec<LocationUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Push(_, update) => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn selects(&self) -> Vec<SelectLocationRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Select(_, request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MeetingBackend for FakeBackend {
    async fn attendee_locations(&self, meeting_id: &str) -> ApiResult<MeetingLocations> {
        self.record(Call::AttendeeLocations(meeting_id.to_string()));
        Ok(self.locations.lock().unwrap().clone())
    }

    async fn push_location(&self, meeting_id: &str, update: &LocationUpdate) -> ApiResult<MeetingLocations> {
        self.record(Call::Push(meeting_id.to_string(), update.clone()));
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(ApiError::api_response(503, "unavailable"));
        }
        Ok(self.locations.lock().unwrap().clone())
    }

    async fn suggestions(
        &self,
        meeting_id: &str,
        _center: GeoPoint,
        filter: &SuggestionFilter,
    ) -> ApiResult<SuggestionsPage> {
        self.record(Call::Suggestions(meeting_id.to_string(), filter.clone()));
        let (suggestions, delay) = self
            .places
            .lock()
            .unwrap()
            .get(&filter.place_type)
            .cloned()
            .unwrap_or_default();
        tokio::time::sleep(delay).await;
        if self.fail_suggestions.load(Ordering::SeqCst) {
            // What the client reports once its retries on a 502 run out
            return Err(ApiError::RetriesExhausted {
                attempts: 3,
                last_error: ApiError::api_response(502, "bad gateway").to_string(),
                transient: true,
            });
        }
        Ok(SuggestionsPage {
            suggestions,
            central_location: *self.suggestion_center.lock().unwrap(),
            rejected: 0,
        })
    }

    async fn select_location(
        &self,
        meeting_id: &str,
        selection: &SelectLocationRequest,
    ) -> ApiResult<SelectedMeetingLocation> {
        self.record(Call::Select(meeting_id.to_string(), selection.clone()));
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(ApiError::api_response(500, "boom"));
        }
        Ok(SelectedMeetingLocation {
            place_id: selection.place_id.clone(),
            name: selection.name.clone(),
            address: selection.address.clone(),
            coordinate: selection.coordinates,
        })
    }
}

pub(crate) fn place(id: &str, lng: f64, lat: f64) -> PlaceSuggestion {
    PlaceSuggestion {
        place_id: id.to_string(),
        name: format!("Place {id}"),
        address: format!("{id} Street"),
        coordinate: GeoPoint::new(lng, lat).unwrap(),
        rating: Some(4.0),
        distance_meters: 100.0,
        category: "restaurant".to_string(),
    }
}

/// Scripted position source; one-shot requests time out once the script runs dry
#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    current: Mutex<VecDeque<Result<PositionFix, GeolocationError>>>,
    watch_tx: Mutex<Option<mpsc::Sender<Result<PositionFix, GeolocationError>>>>,
    pub watch_error: Mutex<Option<GeolocationError>>,
    pub current_calls: AtomicUsize,
    pub watches_opened: AtomicUsize,
    pub cleared: Mutex<Vec<WatchId>>,
    next_id: AtomicU64,
}

impl FakeSource {
    pub fn queue(&self, answer: Result<PositionFix, GeolocationError>) {
        self.current.lock().unwrap().push_back(answer);
    }

    /// Push an update through the open watch; false if nobody listens
    pub fn emit(&self, update: Result<PositionFix, GeolocationError>) -> bool {
        self.watch_tx
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.try_send(update).is_ok())
    }
}

impl PositionSource for FakeSource {
    async fn current_position(&self, _options: &PositionOptions) -> Result<PositionFix, GeolocationError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.current.lock().unwrap().pop_front();
        answer.unwrap_or(Err(GeolocationError::Timeout))
    }

    fn watch_position(&self, _options: &PositionOptions) -> Result<PlatformWatch, GeolocationError> {
        if let Some(e) = *self.watch_error.lock().unwrap() {
            return Err(e);
        }
        self.watches_opened.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, updates) = mpsc::channel(16);
        *self.watch_tx.lock().unwrap() = Some(tx);
        Ok(PlatformWatch { id, updates })
    }

    fn clear_watch(&self, id: WatchId) {
        self.cleared.lock().unwrap().push(id);
        self.watch_tx.lock().unwrap().take();
    }
}

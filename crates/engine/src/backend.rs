//! The meeting backend as seen by the engine.
//!
//! [`MeetpointClient`] is the production implementation; tests use an
//! in-memory fake.

use meetpoint_api_client::{
    ApiResult, LocationUpdate, MeetingLocations, MeetpointClient, SelectLocationRequest,
    SelectedMeetingLocation, SuggestionFilter, SuggestionsPage,
};
use meetpoint_geo::GeoPoint;
use std::future::Future;

/// Meeting location routes used by the engine
pub trait MeetingBackend: Send + Sync + 'static {
    /// `GET meetings/{id}/attendee-locations`
    fn attendee_locations(
        &self,
        meeting_id: &str,
    ) -> impl Future<Output = ApiResult<MeetingLocations>> + Send;

    /// `POST meetings/{id}/location`
    fn push_location(
        &self,
        meeting_id: &str,
        update: &LocationUpdate,
    ) -> impl Future<Output = ApiResult<MeetingLocations>> + Send;

    /// `GET meetings/{id}/suggestions`
    fn suggestions(
        &self,
        meeting_id: &str,
        center: GeoPoint,
        filter: &SuggestionFilter,
    ) -> impl Future<Output = ApiResult<SuggestionsPage>> + Send;

    /// `POST meetings/{id}/select-location`
    fn select_location(
        &self,
        meeting_id: &str,
        selection: &SelectLocationRequest,
    ) -> impl Future<Output = ApiResult<SelectedMeetingLocation>> + Send;
}

impl MeetingBackend for MeetpointClient {
    async fn attendee_locations(&self, meeting_id: &str) -> ApiResult<MeetingLocations> {
        self.meetings().attendee_locations(meeting_id).await
    }

    async fn push_location(
        &self,
        meeting_id: &str,
        update: &LocationUpdate,
    ) -> ApiResult<MeetingLocations> {
        self.meetings().push_location(meeting_id, update).await
    }

    async fn suggestions(
        &self,
        meeting_id: &str,
        center: GeoPoint,
        filter: &SuggestionFilter,
    ) -> ApiResult<SuggestionsPage> {
        self.meetings().suggestions(meeting_id, center, filter).await
    }

    async fn select_location(
        &self,
        meeting_id: &str,
        selection: &SelectLocationRequest,
    ) -> ApiResult<SelectedMeetingLocation> {
        self.meetings().select_location(meeting_id, selection).await
    }
}

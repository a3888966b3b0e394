//! Location Selection Commit
//!
//! The organizer's choice, either a suggested venue or a manually entered
//! place, is validated in geo order before anything is sent. A successful
//! commit is published through the hub's selection channel; a failed one
//! leaves the previous selection in place.

use crate::backend::MeetingBackend;
use crate::error::{CommitError, LocationCommitError};
use crate::hub::LocationHub;
use meetpoint_api_client::{PlaceSuggestion, SelectLocationRequest, SelectedMeetingLocation};
use meetpoint_geo::{CoordinateOrder, GeoPoint, MapPoint};
use meetpoint_telemetry::{Timer, metrics};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// A place typed in by the organizer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManualEntry {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub place_id: Option<String>,
    /// Raw pair as entered, in `order`
    pub coordinate: [f64; 2],
    pub order: CoordinateOrder,
}

/// What the organizer picked
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionChoice {
    Suggestion(PlaceSuggestion),
    Manual(ManualEntry),
}

impl From<PlaceSuggestion> for SelectionChoice {
    fn from(suggestion: PlaceSuggestion) -> Self {
        Self::Suggestion(suggestion)
    }
}

impl From<ManualEntry> for SelectionChoice {
    fn from(entry: ManualEntry) -> Self {
        Self::Manual(entry)
    }
}

impl SelectionChoice {
    /// Build the wire request, validating the point in geo order
    pub fn to_request(&self) -> Result<SelectLocationRequest, CommitError> {
        match self {
            Self::Suggestion(suggestion) => Ok(SelectLocationRequest::from(suggestion)),
            Self::Manual(entry) => {
                let coordinates = match entry.order {
                    CoordinateOrder::Geo => GeoPoint::try_from(entry.coordinate)?,
                    CoordinateOrder::Map => MapPoint::try_from(entry.coordinate)?.to_geo(),
                };
                Ok(SelectLocationRequest {
                    place_id: entry.place_id.clone(),
                    name: entry.name.trim().to_string(),
                    address: entry.address.trim().to_string(),
                    coordinates,
                })
            }
        }
    }
}

/// Commits the meeting venue on behalf of one session
pub struct LocationCommitter<B> {
    backend: Arc<B>,
    hub: Arc<LocationHub>,
    meeting_id: String,
    is_organizer: bool,
}

impl<B: MeetingBackend> LocationCommitter<B> {
    pub fn new(backend: Arc<B>, hub: Arc<LocationHub>, meeting_id: impl Into<String>, is_organizer: bool) -> Self {
        Self {
            backend,
            hub,
            meeting_id: meeting_id.into(),
            is_organizer,
        }
    }

    /// Persist `choice` as the meeting location.
    ///
    /// Committing the same venue again is harmless: subscribers of the
    /// selection channel are only woken when the venue actually changes.
    pub async fn commit(&self, choice: impl Into<SelectionChoice>) -> Result<SelectedMeetingLocation, CommitError> {
        if !self.is_organizer {
            return Err(CommitError::NotOrganizer);
        }
        let request = choice.into().to_request().inspect_err(|e| {
            metrics().increment("commit.rejected_invalid");
            warn!(meeting_id = %self.meeting_id, error = %e, "Refusing to commit invalid location");
        })?;

        let timer = Timer::start("commit.request_ms");
        let result = self.backend.select_location(&self.meeting_id, &request).await;
        timer.stop();

        match result {
            Ok(selected) => {
                let changed = self.hub.adopt_selected(selected.clone());
                metrics().increment("commit.succeeded");
                info!(
                    meeting_id = %self.meeting_id,
                    name = %selected.name,
                    coordinates = %selected.coordinate,
                    changed,
                    "Meeting location selected"
                );
                Ok(selected)
            }
            Err(source) => {
                metrics().increment("commit.failed");
                warn!(meeting_id = %self.meeting_id, name = %request.name, error = %source, "Commit failed");
                Err(LocationCommitError {
                    meeting_id: self.meeting_id.clone(),
                    attempted: request,
                    source,
                }
                .into())
            }
        }
    }
}

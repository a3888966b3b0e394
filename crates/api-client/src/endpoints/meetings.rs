//! Meeting location endpoints
//!
//! Responses are decoded entry by entry: every coordinate goes through
//! [`meetpoint_geo::payload`] before it is handed out, and an entry whose
//! location cannot be read is dropped on its own without failing the rest
//! of the response.

use crate::client::{MeetpointClient, RetryPolicy, path_segment};
use crate::error::ApiResult;
use chrono::{DateTime, Utc};
use meetpoint_geo::payload::coalesce_optional;
use meetpoint_geo::{GeoError, GeoPoint, coalesce_point, haversine_distance_meters};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Meeting location API interface
#[derive(Clone)]
pub struct MeetingsApi {
    client: MeetpointClient,
}

impl MeetingsApi {
    /// Create a new meetings API interface
    pub(crate) fn new(client: MeetpointClient) -> Self {
        Self { client }
    }

    /// Current attendee positions, plus the server's central and selected location
    #[instrument(skip(self))]
    pub async fn attendee_locations(&self, meeting_id: &str) -> ApiResult<MeetingLocations> {
        let path = format!("meetings/{}/attendee-locations", path_segment(meeting_id)?);
        let body: Value = self.client.get(&path, &[]).await?;
        MeetingLocations::from_response(meeting_id, body)
    }

    /// Push the caller's own position; the backend answers with the refreshed set
    #[instrument(skip(self, update))]
    pub async fn push_location(
        &self,
        meeting_id: &str,
        update: &LocationUpdate,
    ) -> ApiResult<MeetingLocations> {
        let path = format!("meetings/{}/location", path_segment(meeting_id)?);
        let body: Value = self
            .client
            .post(&path, update, RetryPolicy::Configured)
            .await?;
        MeetingLocations::from_response(meeting_id, body)
    }

    /// Venues matching `filter` around the meeting's central point.
    ///
    /// `center` is the point the caller is querying for; it is only used to
    /// fill in distances the backend leaves out.
    #[instrument(skip(self, filter), fields(place_type = %filter.place_type, radius = filter.radius_meters))]
    pub async fn suggestions(
        &self,
        meeting_id: &str,
        center: GeoPoint,
        filter: &SuggestionFilter,
    ) -> ApiResult<SuggestionsPage> {
        let path = format!("meetings/{}/suggestions", path_segment(meeting_id)?);
        let query = [
            ("type", filter.place_type.clone()),
            ("radius", filter.radius_meters.to_string()),
        ];
        let body: Value = self.client.get(&path, &query).await?;
        SuggestionsPage::from_response(meeting_id, center, filter, body)
    }

    /// Persist the organizer's chosen venue. Never retried.
    #[instrument(skip(self, selection), fields(name = %selection.name))]
    pub async fn select_location(
        &self,
        meeting_id: &str,
        selection: &SelectLocationRequest,
    ) -> ApiResult<SelectedMeetingLocation> {
        let path = format!("meetings/{}/select-location", path_segment(meeting_id)?);
        let body: Value = self.client.post(&path, selection, RetryPolicy::Once).await?;
        let location = body.get("location").unwrap_or(&body);
        Ok(SelectedMeetingLocation::from_value(location)?)
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST meetings/{id}/location`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl LocationUpdate {
    /// Build from an already validated point
    #[must_use]
    pub fn new(point: GeoPoint, accuracy: Option<f64>) -> Self {
        Self {
            latitude: point.lat(),
            longitude: point.lng(),
            accuracy: accuracy.filter(|a| a.is_finite() && *a >= 0.0),
        }
    }
}

/// Venue type and search radius for a suggestion lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionFilter {
    /// Backend place type, e.g. `restaurant` or `cafe`
    pub place_type: String,
    /// Search radius in meters
    pub radius_meters: u32,
}

impl SuggestionFilter {
    /// Create a filter
    pub fn new(place_type: impl Into<String>, radius_meters: u32) -> Self {
        Self {
            place_type: place_type.into(),
            radius_meters,
        }
    }
}

impl std::fmt::Display for SuggestionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} within {} m", self.place_type, self.radius_meters)
    }
}

/// Body of `POST meetings/{id}/select-location`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectLocationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    pub name: String,
    pub address: String,
    /// Always `[lng, lat]` on the wire
    pub coordinates: GeoPoint,
}

// ============================================================================
// Response Types
// ============================================================================

/// An attendee position as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAttendee {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "coordinates")]
    pub coordinate: GeoPoint,
    pub accuracy_meters: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Decoded `attendee-locations` (or `location` push) response
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingLocations {
    pub attendees: Vec<RemoteAttendee>,
    pub central_location: Option<GeoPoint>,
    pub selected_location: Option<SelectedMeetingLocation>,
    /// Entries dropped because their location could not be read
    pub rejected: usize,
}

/// A venue proposed around the central point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSuggestion {
    pub place_id: String,
    pub name: String,
    pub address: String,
    #[serde(rename = "coordinates")]
    pub coordinate: GeoPoint,
    pub rating: Option<f64>,
    pub distance_meters: f64,
    pub category: String,
}

/// Decoded `suggestions` response
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsPage {
    pub suggestions: Vec<PlaceSuggestion>,
    pub central_location: Option<GeoPoint>,
    pub rejected: usize,
}

/// The venue the organizer committed to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedMeetingLocation {
    pub place_id: Option<String>,
    pub name: String,
    pub address: String,
    #[serde(rename = "coordinates")]
    pub coordinate: GeoPoint,
}

// ============================================================================
// Wire decoding
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationsEnvelope {
    #[serde(default, alias = "attendees")]
    attendee_locations: Vec<Value>,
    #[serde(default)]
    central_location: Option<Value>,
    #[serde(default)]
    selected_location: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttendee {
    #[serde(alias = "_id", alias = "userId", alias = "attendeeId", deserialize_with = "id_string")]
    id: String,
    #[serde(default, alias = "displayName")]
    name: Option<String>,
    #[serde(default, alias = "accuracyMeters")]
    accuracy: Option<f64>,
    #[serde(default, alias = "updatedAt")]
    last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    position: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionsEnvelope {
    #[serde(default, alias = "results")]
    suggestions: Vec<Value>,
    #[serde(default)]
    central_location: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    #[serde(default, alias = "place_id", alias = "id", deserialize_with = "optional_id_string")]
    place_id: Option<String>,
    name: String,
    #[serde(default, alias = "vicinity", alias = "formattedAddress", alias = "formatted_address")]
    address: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default, alias = "distance")]
    distance_meters: Option<f64>,
    #[serde(default, alias = "type", alias = "placeType")]
    category: Option<String>,
    #[serde(flatten)]
    position: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSelected {
    #[serde(default, alias = "place_id", deserialize_with = "optional_id_string")]
    place_id: Option<String>,
    name: String,
    #[serde(default)]
    address: String,
    #[serde(flatten)]
    position: Map<String, Value>,
}

impl MeetingLocations {
    fn from_response(meeting_id: &str, body: Value) -> ApiResult<Self> {
        let envelope: LocationsEnvelope = serde_json::from_value(body)?;
        let mut rejected = 0;

        let attendees = envelope
            .attendee_locations
            .into_iter()
            .filter_map(|entry| match RemoteAttendee::from_value(entry) {
                Ok(attendee) => Some(attendee),
                Err(e) => {
                    rejected += 1;
                    warn!(meeting_id, error = %e, "Dropping attendee entry with unreadable location");
                    None
                }
            })
            .collect();

        let central_location = match coalesce_optional(envelope.central_location.as_ref()) {
            Some(Ok(point)) => Some(point),
            Some(Err(e)) => {
                warn!(meeting_id, error = %e, "Ignoring invalid server central location");
                None
            }
            None => None,
        };

        let selected_location = match envelope.selected_location {
            None | Some(Value::Null) => None,
            Some(value) => match SelectedMeetingLocation::from_value(&value) {
                Ok(selected) => Some(selected),
                Err(e) => {
                    warn!(meeting_id, error = %e, "Ignoring invalid selected location");
                    None
                }
            },
        };

        debug!(meeting_id, rejected, "Decoded attendee locations");
        Ok(Self {
            attendees,
            central_location,
            selected_location,
            rejected,
        })
    }
}

impl RemoteAttendee {
    fn from_value(value: Value) -> Result<Self, GeoError> {
        let raw: RawAttendee = serde_json::from_value(value)?;
        let coordinate = coalesce_point(&Value::Object(raw.position))?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            coordinate,
            accuracy_meters: raw.accuracy.filter(|a| a.is_finite() && *a >= 0.0),
            last_updated: raw.last_updated,
        })
    }
}

impl SuggestionsPage {
    fn from_response(
        meeting_id: &str,
        center: GeoPoint,
        filter: &SuggestionFilter,
        body: Value,
    ) -> ApiResult<Self> {
        let envelope: SuggestionsEnvelope = serde_json::from_value(body)?;

        let central_location = match coalesce_optional(envelope.central_location.as_ref()) {
            Some(Ok(point)) => Some(point),
            Some(Err(e)) => {
                warn!(meeting_id, error = %e, "Ignoring invalid server central location");
                None
            }
            None => None,
        };
        let reference = central_location.unwrap_or(center);

        let mut rejected = 0;
        let suggestions = envelope
            .suggestions
            .into_iter()
            .filter_map(|entry| match PlaceSuggestion::from_value(entry, reference, filter) {
                Ok(suggestion) => Some(suggestion),
                Err(e) => {
                    rejected += 1;
                    warn!(meeting_id, error = %e, "Dropping unreadable suggestion");
                    None
                }
            })
            .collect();

        Ok(Self {
            suggestions,
            central_location,
            rejected,
        })
    }
}

impl PlaceSuggestion {
    fn from_value(value: Value, reference: GeoPoint, filter: &SuggestionFilter) -> Result<Self, GeoError> {
        let raw: RawSuggestion = serde_json::from_value(value)?;
        let place_id = raw
            .place_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GeoError::MalformedPayload(format!("suggestion {:?} has no place id", raw.name)))?;
        let coordinate = coalesce_point(&Value::Object(raw.position))?;
        let distance_meters = raw
            .distance_meters
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or_else(|| haversine_distance_meters(&reference, &coordinate));

        Ok(Self {
            place_id,
            name: raw.name,
            address: raw.address.unwrap_or_default(),
            coordinate,
            rating: raw.rating.filter(|r| r.is_finite()),
            distance_meters,
            category: raw.category.unwrap_or_else(|| filter.place_type.clone()),
        })
    }
}

impl SelectedMeetingLocation {
    fn from_value(value: &Value) -> Result<Self, GeoError> {
        let raw: RawSelected = serde_json::from_value(value.clone())?;
        let coordinate = coalesce_point(&Value::Object(raw.position))?;
        Ok(Self {
            place_id: raw.place_id,
            name: raw.name,
            address: raw.address,
            coordinate,
        })
    }

    /// The request that would persist this location again
    #[must_use]
    pub fn to_request(&self) -> SelectLocationRequest {
        SelectLocationRequest {
            place_id: self.place_id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            coordinates: self.coordinate,
        }
    }
}

impl From<&PlaceSuggestion> for SelectLocationRequest {
    fn from(suggestion: &PlaceSuggestion) -> Self {
        Self {
            place_id: Some(suggestion.place_id.clone()),
            name: suggestion.name.clone(),
            address: suggestion.address.clone(),
            coordinates: suggestion.coordinate,
        }
    }
}

/// Identifiers arrive as strings or numbers depending on the backend table
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

fn optional_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

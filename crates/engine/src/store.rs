//! Attendee Location Store
//!
//! Latest known position per attendee for the meeting being viewed. Entries
//! are only ever added or refreshed; a position with an older timestamp than
//! the stored one is ignored, so callbacks arriving out of order cannot move
//! an attendee backwards.

use chrono::{DateTime, Utc};
use meetpoint_api_client::RemoteAttendee;
use meetpoint_geo::{GeoPoint, InvalidCoordinateError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, trace};

/// Latest known location of one attendee
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeLocation {
    pub attendee_id: String,
    pub display_name: String,
    #[serde(rename = "coordinates")]
    pub coordinate: GeoPoint,
    pub accuracy_meters: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// What an upsert did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First position for this attendee
    Inserted,
    /// Replaced an older position
    Updated,
    /// The stored position is newer; nothing changed
    IgnoredOlder,
}

impl UpsertOutcome {
    /// Whether the store changed
    #[must_use]
    pub fn changed(self) -> bool {
        !matches!(self, Self::IgnoredOlder)
    }
}

#[derive(Debug, Default)]
struct Entries {
    order: Vec<String>,
    by_id: HashMap<String, AttendeeLocation>,
}

/// Keyed, insertion-ordered store of attendee positions
#[derive(Debug, Default)]
pub struct AttendeeLocationStore {
    entries: RwLock<Entries>,
}

impl AttendeeLocationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position given as a raw `[lng, lat]` pair.
    ///
    /// The pair is validated first; an invalid pair leaves the store untouched.
    pub fn upsert(
        &self,
        attendee_id: &str,
        coordinate: [f64; 2],
        accuracy: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Result<UpsertOutcome, InvalidCoordinateError> {
        let point = GeoPoint::try_from(coordinate)?;
        Ok(self.upsert_point(attendee_id, None, point, accuracy, timestamp))
    }

    /// Record an already validated position, optionally naming the attendee
    pub fn upsert_point(
        &self,
        attendee_id: &str,
        display_name: Option<&str>,
        coordinate: GeoPoint,
        accuracy: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> UpsertOutcome {
        let accuracy_meters = accuracy.filter(|a| a.is_finite() && *a >= 0.0);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.by_id.get_mut(attendee_id) {
            if timestamp < existing.last_updated {
                trace!(attendee_id, %timestamp, "Ignoring out-of-order position");
                return UpsertOutcome::IgnoredOlder;
            }
            existing.coordinate = coordinate;
            existing.accuracy_meters = accuracy_meters;
            existing.last_updated = timestamp;
            if let Some(name) = display_name {
                existing.display_name = name.to_string();
            }
            return UpsertOutcome::Updated;
        }

        debug!(attendee_id, %coordinate, "New attendee position");
        entries.order.push(attendee_id.to_string());
        entries.by_id.insert(
            attendee_id.to_string(),
            AttendeeLocation {
                attendee_id: attendee_id.to_string(),
                display_name: display_name.unwrap_or(attendee_id).to_string(),
                coordinate,
                accuracy_meters,
                last_updated: timestamp,
            },
        );
        UpsertOutcome::Inserted
    }

    /// Fold a backend refresh into the store.
    ///
    /// Entries without a timestamp are taken as observed at `received_at`.
    /// Returns how many entries changed.
    pub fn merge_remote(&self, attendees: &[RemoteAttendee], received_at: DateTime<Utc>) -> usize {
        attendees
            .iter()
            .filter(|a| {
                self.upsert_point(
                    &a.id,
                    a.name.as_deref(),
                    a.coordinate,
                    a.accuracy_meters,
                    a.last_updated.unwrap_or(received_at),
                )
                .changed()
            })
            .count()
    }

    /// Point-in-time copy, first-seen attendee first
    #[must_use]
    pub fn snapshot(&self) -> Vec<AttendeeLocation> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id).cloned())
            .collect()
    }

    /// Coordinates only, in snapshot order
    #[must_use]
    pub fn points(&self) -> Vec<GeoPoint> {
        self.snapshot().into_iter().map(|a| a.coordinate).collect()
    }

    /// Latest location of one attendee
    #[must_use]
    pub fn get(&self, attendee_id: &str) -> Option<AttendeeLocation> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(attendee_id)
            .cloned()
    }

    /// Age of an attendee's latest fix; zero if the fix is stamped in the future
    #[must_use]
    pub fn staleness(&self, attendee_id: &str, now: DateTime<Utc>) -> Option<Duration> {
        self.get(attendee_id)
            .map(|a| (now - a.last_updated).to_std().unwrap_or(Duration::ZERO))
    }

    /// Attendees whose latest fix is older than `threshold`, in snapshot order
    #[must_use]
    pub fn stale_attendees(&self, now: DateTime<Utc>, threshold: Duration) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|a| (now - a.last_updated).to_std().is_ok_and(|age| age > threshold))
            .map(|a| a.attendee_id)
            .collect()
    }

    /// Number of attendees with a known position
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).order.len()
    }

    /// Whether no attendee has a known position
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

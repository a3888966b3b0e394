//! Shared location state for one meeting view.
//!
//! Owns the attendee store and publishes the derived central location and
//! the committed venue through `watch` channels, so every producer (watcher,
//! refresh, commit) and every subscriber sees one consistent view.

use crate::central::{CentralLocation, resolve_central};
use crate::store::{AttendeeLocationStore, UpsertOutcome};
use chrono::{DateTime, Utc};
use meetpoint_api_client::{MeetingLocations, SelectedMeetingLocation};
use meetpoint_geo::GeoPoint;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// Store plus the observables derived from it
#[derive(Debug)]
pub struct LocationHub {
    store: Arc<AttendeeLocationStore>,
    server_central: Mutex<Option<GeoPoint>>,
    central: watch::Sender<Option<CentralLocation>>,
    selected: watch::Sender<Option<SelectedMeetingLocation>>,
}

impl Default for LocationHub {
    fn default() -> Self {
        Self::new(Arc::new(AttendeeLocationStore::new()))
    }
}

impl LocationHub {
    /// Wrap an existing store
    #[must_use]
    pub fn new(store: Arc<AttendeeLocationStore>) -> Self {
        Self {
            store,
            server_central: Mutex::new(None),
            central: watch::channel(None).0,
            selected: watch::channel(None).0,
        }
    }

    /// The underlying attendee store
    #[must_use]
    pub fn store(&self) -> &Arc<AttendeeLocationStore> {
        &self.store
    }

    /// Record this device's own validated fix
    pub fn record_local(
        &self,
        attendee_id: &str,
        coordinate: GeoPoint,
        accuracy: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> UpsertOutcome {
        let outcome = self
            .store
            .upsert_point(attendee_id, None, coordinate, accuracy, timestamp);
        if outcome.changed() {
            self.recompute();
        }
        outcome
    }

    /// Fold a backend response into the store and observables
    pub fn apply_remote(&self, locations: &MeetingLocations, received_at: DateTime<Utc>) {
        let changed = self.store.merge_remote(&locations.attendees, received_at);
        *self
            .server_central
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = locations.central_location;
        if let Some(selected) = &locations.selected_location {
            self.adopt_selected(selected.clone());
        }
        debug!(changed, server_central = locations.central_location.is_some(), "Applied backend locations");
        self.recompute();
    }

    /// Adopt a central point the backend sent along with another response
    pub fn adopt_server_central(&self, point: GeoPoint) -> Option<CentralLocation> {
        *self
            .server_central
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(point);
        self.recompute()
    }

    /// Re-derive the central location; subscribers are only woken on change.
    ///
    /// Resolution runs under the watch lock, so concurrent recomputes publish
    /// in the order they read the store.
    pub fn recompute(&self) -> Option<CentralLocation> {
        let mut resolved = None;
        self.central.send_if_modified(|current| {
            let server = *self
                .server_central
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            resolved = resolve_central(server, &self.store.snapshot());
            if *current == resolved {
                false
            } else {
                *current = resolved;
                true
            }
        });
        resolved
    }

    /// Current central location
    #[must_use]
    pub fn central(&self) -> Option<CentralLocation> {
        *self.central.borrow()
    }

    /// Subscribe to central location changes
    #[must_use]
    pub fn subscribe_central(&self) -> watch::Receiver<Option<CentralLocation>> {
        self.central.subscribe()
    }

    /// Publish a committed venue; returns whether it differed from the current one
    pub fn adopt_selected(&self, selected: SelectedMeetingLocation) -> bool {
        self.selected.send_if_modified(|current| {
            if current.as_ref() == Some(&selected) {
                false
            } else {
                *current = Some(selected);
                true
            }
        })
    }

    /// Currently committed venue
    #[must_use]
    pub fn selected(&self) -> Option<SelectedMeetingLocation> {
        self.selected.borrow().clone()
    }

    /// Subscribe to committed venue changes
    #[must_use]
    pub fn subscribe_selected(&self) -> watch::Receiver<Option<SelectedMeetingLocation>> {
        self.selected.subscribe()
    }
}

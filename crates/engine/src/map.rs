//! Map rendering capability.
//!
//! The engine never talks to a map SDK directly. A [`MapProvider`] signals
//! when it can draw through [`MapProvider::ready`] and receives a
//! [`MapView`] whose points are already in map order.

use crate::central::CentralLocation;
use crate::store::AttendeeLocation;
use meetpoint_api_client::{PlaceSuggestion, SelectedMeetingLocation};
use meetpoint_geo::MapPoint;
use serde::Serialize;
use std::future::Future;
use thiserror::Error;

/// Map provider failures
#[derive(Debug, Error)]
pub enum MapError {
    #[error("map provider is not ready")]
    NotReady,

    #[error("map provider error: {0}")]
    Provider(String),
}

/// Kind of marker, used for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Attendee,
    Suggestion,
    Selected,
}

/// One pin on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub label: String,
    pub position: MapPoint,
    pub kind: MarkerKind,
}

/// Everything a provider needs to draw one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapView {
    /// Where to center the viewport
    pub center: Option<MapPoint>,
    pub markers: Vec<MapMarker>,
}

impl MapView {
    /// Assemble a view from engine state
    #[must_use]
    pub fn build(
        central: Option<CentralLocation>,
        attendees: &[AttendeeLocation],
        suggestions: &[PlaceSuggestion],
        selected: Option<&SelectedMeetingLocation>,
    ) -> Self {
        let mut markers = Vec::with_capacity(attendees.len() + suggestions.len() + 1);

        markers.extend(attendees.iter().map(|a| MapMarker {
            id: a.attendee_id.clone(),
            label: a.display_name.clone(),
            position: a.coordinate.to_map(),
            kind: MarkerKind::Attendee,
        }));
        markers.extend(suggestions.iter().map(|s| MapMarker {
            id: s.place_id.clone(),
            label: s.name.clone(),
            position: s.coordinate.to_map(),
            kind: MarkerKind::Suggestion,
        }));
        if let Some(selected) = selected {
            markers.push(MapMarker {
                id: selected.place_id.clone().unwrap_or_else(|| "selected".to_string()),
                label: selected.name.clone(),
                position: selected.coordinate.to_map(),
                kind: MarkerKind::Selected,
            });
        }

        Self {
            center: central.map(|c| c.coordinate.to_map()),
            markers,
        }
    }

    /// Markers of one kind
    pub fn markers_of(&self, kind: MarkerKind) -> impl Iterator<Item = &MapMarker> {
        self.markers.iter().filter(move |m| m.kind == kind)
    }
}

/// A map SDK the engine can render into
pub trait MapProvider: Send + Sync {
    /// Resolves once the provider can draw
    fn ready(&self) -> impl Future<Output = Result<(), MapError>> + Send;

    /// Replace the displayed view
    fn show(&self, view: &MapView) -> Result<(), MapError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::central::CentralBasis;
    use crate::testing::place;
    use chrono::Utc;
    use meetpoint_geo::GeoPoint;

    #[test]
    fn test_view_is_in_map_order() {
        let attendee = AttendeeLocation {
            attendee_id: "a".into(),
            display_name: "Ada".into(),
            coordinate: GeoPoint::new(-74.0, 40.71).unwrap(),
            accuracy_meters: None,
            last_updated: Utc::now(),
        };
        let central = CentralLocation {
            coordinate: GeoPoint::new(-73.95, 40.73).unwrap(),
            basis: CentralBasis::ClientComputed,
        };
        let selected = SelectedMeetingLocation {
            place_id: None,
            name: "Park".into(),
            address: "5th Ave".into(),
            coordinate: GeoPoint::new(-73.97, 40.78).unwrap(),
        };

        let view = MapView::build(Some(central), &[attendee], &[place("p1", -73.9, 40.7)], Some(&selected));

        assert_eq!(view.center.unwrap().to_array(), [40.73, -73.95]);
        assert_eq!(view.markers.len(), 3);
        let pin = view.markers_of(MarkerKind::Attendee).next().unwrap();
        assert_eq!(pin.position.to_array(), [40.71, -74.0]);
        let chosen = view.markers_of(MarkerKind::Selected).next().unwrap();
        assert_eq!(chosen.id, "selected");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["markers"][1]["position"], serde_json::json!([40.7, -73.9]));
    }

    #[test]
    fn test_empty_view() {
        let view = MapView::build(None, &[], &[], None);
        assert!(view.center.is_none());
        assert!(view.markers.is_empty());
    }
}

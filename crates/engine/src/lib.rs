//! Location convergence for Meetpoint meetings
//!
//! This crate turns scattered attendee positions into one place to meet:
//!
//! - [`AttendeeLocationStore`]: latest position per attendee, latest write wins
//! - [`resolve_central`]: server-supplied center, else the spherical centroid
//! - [`SuggestionCoordinator`]: debounced venue lookups that never apply a
//!   late response over a newer one
//! - [`GeolocationWatcher`]: this device's position, validated and pushed
//! - [`LocationCommitter`]: the organizer's venue commit
//! - [`LocationSession`]: all of the above for one meeting view, with
//!   `watch` channels for the UI
//!
//! # Example
//!
//! ```rust,no_run
//! use meetpoint_api_client::MeetpointClient;
//! use meetpoint_engine::{LocationSession, SessionConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(MeetpointClient::new()?);
//!     let session = LocationSession::without_positioning(client, SessionConfig::new("m-42", "me"));
//!
//!     if let Some(central) = session.refresh().await? {
//!         println!("meet near {} ({})", central.coordinate, central.basis);
//!         for place in session.request_suggestions(None).await? {
//!             println!("{} - {:.0} m", place.name, place.distance_meters);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod central;
pub mod commit;
pub mod error;
pub mod hub;
pub mod map;
pub mod session;
pub mod source;
pub mod store;
pub mod suggestions;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use backend::MeetingBackend;
pub use central::{CentralBasis, CentralLocation, resolve_central};
pub use commit::{LocationCommitter, ManualEntry, SelectionChoice};
pub use error::{
    CommitError, EngineError, EngineResult, GeolocationError, LocationCommitError, SuggestionError,
    SuggestionFetchError,
};
pub use hub::LocationHub;
pub use map::{MapError, MapMarker, MapProvider, MapView, MarkerKind};
pub use session::{LocationSession, SessionConfig};
pub use source::{PositionFix, PositionOptions, PositionSource, ReplaySource, ReplayStep, Unsupported};
pub use store::{AttendeeLocation, AttendeeLocationStore, UpsertOutcome};
pub use suggestions::{SuggestionCoordinator, SuggestionFailure, SuggestionState};
pub use watcher::{GeolocationWatcher, WatcherState};

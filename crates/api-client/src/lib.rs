//! HTTP client for the Meetpoint meetings backend
//!
//! This crate provides a resilient client for the meeting location routes:
//! attendee positions, position pushes, venue suggestions and the organizer's
//! venue commit.
//!
//! # Features
//!
//! - **Environment-based configuration**: Load URL, token and keys from environment variables
//! - **Retry with exponential backoff**: Automatic retry for transient failures on idempotent calls
//! - **Circuit breaker**: Prevent cascading failures during outages
//! - **Request correlation**: Track requests with unique IDs for debugging
//! - **Validated ingress**: Every coordinate in a response is checked before it is returned
//!
//! # Example
//!
//! ```rust,no_run
//! use meetpoint_api_client::{MeetpointClient, SuggestionFilter};
//! use meetpoint_geo::GeoPoint;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MeetpointClient::new()?;
//!
//!     let locations = client.meetings().attendee_locations("m-42").await?;
//!     println!("{} attendees", locations.attendees.len());
//!
//!     let center = GeoPoint::new(-73.95, 40.73)?;
//!     let page = client
//!         .meetings()
//!         .suggestions("m-42", center, &SuggestionFilter::new("cafe", 1500))
//!         .await?;
//!     println!("{} suggestions", page.suggestions.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;

pub use client::{MeetpointClient, RetryPolicy};
pub use config::{ClientConfig, Environment};
pub use endpoints::meetings::{
    LocationUpdate, MeetingLocations, PlaceSuggestion, RemoteAttendee, SelectLocationRequest,
    SelectedMeetingLocation, SuggestionFilter, SuggestionsPage,
};
pub use error::{ApiError, ApiResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::MeetpointClient;
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::endpoints::MeetingsApi;
    pub use crate::error::{ApiError, ApiResult};
}

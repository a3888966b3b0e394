//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for a specific set of backend endpoints.
//!
//! ## Mapping to the meetings backend
//!
//! | Module | Backend route | Description |
//! |--------|---------------|-------------|
//! | `meetings` | `meetings/{id}/attendee-locations` | Attendee positions and central point |
//! | `meetings` | `meetings/{id}/location` | Push the caller's own position |
//! | `meetings` | `meetings/{id}/suggestions` | Venues around the central point |
//! | `meetings` | `meetings/{id}/select-location` | Organizer commits the venue |

pub mod meetings;

pub use meetings::MeetingsApi;

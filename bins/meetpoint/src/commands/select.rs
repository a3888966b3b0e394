//! Select command - commit the meeting venue

use super::Context;
use crate::output::{Status, print_json};
use anyhow::Result;
use meetpoint_engine::{LocationSession, ManualEntry};
use meetpoint_geo::CoordinateOrder;

/// Venue given on the command line
pub struct Venue {
    pub name: String,
    pub address: String,
    pub place_id: Option<String>,
    /// `[lng, lat]`
    pub coordinate: [f64; 2],
}

/// Run the select command
pub async fn run(meeting_id: &str, venue: Venue, ctx: &Context) -> Result<()> {
    // The backend decides whether the caller really is the organizer
    let config = ctx.session(meeting_id, "cli").organizer(true);
    let session = LocationSession::without_positioning(ctx.client()?, config);

    let entry = ManualEntry {
        name: venue.name,
        address: venue.address,
        place_id: venue.place_id,
        coordinate: venue.coordinate,
        order: CoordinateOrder::Geo,
    };
    let selected = session.commit(entry).await?;

    if ctx.format.is_json() {
        return print_json(&selected);
    }
    Status::success(&format!(
        "Meeting {meeting_id} will take place at {} ({}) {}",
        selected.name, selected.address, selected.coordinate
    ));
    Ok(())
}

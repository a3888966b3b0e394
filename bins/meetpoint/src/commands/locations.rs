//! Locations command - attendee positions and the central location

use super::Context;
use crate::output::{Status, TextMap, print_json};
use anyhow::Result;
use chrono::Utc;
use meetpoint_api_client::SelectedMeetingLocation;
use meetpoint_engine::{AttendeeLocation, CentralLocation, LocationSession};
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationsOutput {
    meeting_id: String,
    attendees: Vec<AttendeeLocation>,
    central_location: Option<CentralLocation>,
    selected_location: Option<SelectedMeetingLocation>,
    stale: Vec<String>,
}

/// Run the locations command
pub async fn run(meeting_id: &str, map: bool, ctx: &Context) -> Result<()> {
    let session = LocationSession::without_positioning(ctx.client()?, ctx.session(meeting_id, "cli"));
    let central = session.refresh().await?;
    let now = Utc::now();
    let stale = session.stale_attendees(now);

    if ctx.format.is_json() {
        return print_json(&LocationsOutput {
            meeting_id: meeting_id.to_string(),
            attendees: session.snapshot(),
            central_location: central,
            selected_location: session.selected(),
            stale,
        });
    }

    Status::header(&format!("Meeting {meeting_id}"));
    let attendees = session.snapshot();
    if attendees.is_empty() {
        Status::info("No attendee has shared a location yet");
    }
    for attendee in &attendees {
        let age = (now - attendee.last_updated).num_seconds().max(0);
        let freshness = if stale.contains(&attendee.attendee_id) {
            format!("{age}s ago, stale").yellow().to_string()
        } else {
            format!("{age}s ago").dimmed().to_string()
        };
        println!("  {:<24} {} {}", attendee.display_name, attendee.coordinate, freshness);
    }

    println!();
    match central {
        Some(central) => Status::success(&format!("Central location {} ({})", central.coordinate, central.basis)),
        None => Status::warning("No central location yet"),
    }
    if let Some(selected) = session.selected() {
        Status::success(&format!("Selected venue: {} - {}", selected.name, selected.address));
    }

    if map {
        session.render(&TextMap).await?;
    }
    Ok(())
}

//! Suggest command - venues around the meeting's central location

use super::Context;
use crate::output::{Status, format_distance, print_json};
use anyhow::Result;
use meetpoint_api_client::{PlaceSuggestion, SuggestionFilter};
use meetpoint_engine::{CentralLocation, LocationSession};
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestOutput {
    meeting_id: String,
    central_location: Option<CentralLocation>,
    filter: SuggestionFilter,
    suggestions: Vec<PlaceSuggestion>,
}

/// Run the suggest command
pub async fn run(meeting_id: &str, place_type: Option<String>, radius: Option<u32>, ctx: &Context) -> Result<()> {
    let session = LocationSession::without_positioning(ctx.client()?, ctx.session(meeting_id, "cli"));
    let central = session.refresh().await?;

    let default = session.default_filter();
    let filter = SuggestionFilter::new(
        place_type.unwrap_or(default.place_type),
        radius.unwrap_or(default.radius_meters),
    );
    let suggestions = session.request_suggestions(Some(filter.clone())).await?;

    if ctx.format.is_json() {
        return print_json(&SuggestOutput {
            meeting_id: meeting_id.to_string(),
            central_location: central,
            filter,
            suggestions,
        });
    }

    Status::header(&format!("Suggestions for meeting {meeting_id}: {filter}"));
    if let Some(central) = central {
        println!("  {} {} ({})", "around".dimmed(), central.coordinate, central.basis);
    }
    if suggestions.is_empty() {
        Status::info("Nothing found; try a larger radius or another type");
        return Ok(());
    }
    for (i, place) in suggestions.iter().enumerate() {
        let rating = place
            .rating
            .map(|r| format!("★ {r:.1}"))
            .unwrap_or_default();
        println!(
            "  {:>2}. {} {} {}",
            i + 1,
            place.name.bold(),
            format_distance(place.distance_meters).cyan(),
            rating.yellow()
        );
        println!("      {} {}", place.address.dimmed(), format!("[{}]", place.place_id).dimmed());
    }
    Ok(())
}

//! Track command - replay a recorded position track through the watcher

use super::Context;
use crate::output::{Status, TextMap, format_duration, print_json};
use anyhow::{Context as _, Result};
use meetpoint_engine::{AttendeeLocation, CentralLocation, LocationSession, ReplaySource, WatcherState};
use meetpoint_telemetry::metrics;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackOutput {
    meeting_id: String,
    attendee_id: String,
    final_state: WatcherState,
    accepted: u64,
    dropped: u64,
    position: Option<AttendeeLocation>,
    central_location: Option<CentralLocation>,
}

/// Run the track command
pub async fn run(meeting_id: &str, attendee_id: &str, file: &Path, pace_ms: u64, ctx: &Context) -> Result<()> {
    let json = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let pace = Duration::from_millis(pace_ms);
    let source = Arc::new(
        ReplaySource::from_json(&json, pace).with_context(|| format!("Invalid track file {}", file.display()))?,
    );
    if source.remaining() == 0 {
        return Err(meetpoint_core::Error::validation(format!("Track file {} has no steps", file.display()))
            .with_suggestion("Record at least one fix or error step")
            .into());
    }

    let session = LocationSession::new(ctx.client()?, Arc::clone(&source), ctx.session(meeting_id, attendee_id));
    if let Err(e) = session.refresh().await {
        warn!(error = %e, "Starting without the meeting's current locations");
    }

    let started = Instant::now();
    session.start_watching().await?;
    if !ctx.format.is_json() {
        Status::info(&format!("Replaying {} at one fix per {}", file.display(), format_duration(pace)));
    }

    while !source.finished() && session.watcher_state() == WatcherState::Watching {
        tokio::time::sleep(pace.max(Duration::from_millis(50))).await;
    }
    // Let the last push settle
    tokio::time::sleep(pace.min(Duration::from_secs(1))).await;
    let final_state = session.watcher_state();
    session.shutdown();

    let accepted = metrics().counter("geolocation.samples_accepted");
    let dropped = metrics().counter("geolocation.samples_dropped") + metrics().counter("geolocation.samples_too_old");
    let position = session.snapshot().into_iter().find(|a| a.attendee_id == attendee_id);

    if ctx.format.is_json() {
        return print_json(&TrackOutput {
            meeting_id: meeting_id.to_string(),
            attendee_id: attendee_id.to_string(),
            final_state,
            accepted,
            dropped,
            position,
            central_location: session.central(),
        });
    }

    Status::header(&format!("Track replayed in {}", format_duration(started.elapsed())));
    println!("  accepted fixes: {accepted}");
    println!("  dropped fixes:  {dropped}");
    match final_state {
        WatcherState::PermissionDenied => Status::warning("The track revoked location permission"),
        WatcherState::Unavailable => Status::warning("The track reported location as unavailable"),
        _ => {}
    }
    match position {
        Some(p) => Status::success(&format!("Last position of {attendee_id}: {}", p.coordinate)),
        None => Status::warning(&format!("No valid position recorded for {attendee_id}")),
    }
    session.render(&TextMap).await?;
    Ok(())
}

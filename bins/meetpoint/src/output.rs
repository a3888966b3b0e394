//! Terminal output helpers

use clap::ValueEnum;
use meetpoint_engine::{MapError, MapProvider, MapView, MarkerKind};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::time::Duration;

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == Self::Json
    }
}

/// Status message helpers
pub struct Status;

impl Status {
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Pretty-printed JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `850 m` or `1.4 km`
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let mins = (secs / 60.0).floor();
        format!("{}m {:.0}s", mins, secs % 60.0)
    }
}

/// Draws map frames as a pin list
pub struct TextMap;

impl MapProvider for TextMap {
    async fn ready(&self) -> Result<(), MapError> {
        Ok(())
    }

    fn show(&self, view: &MapView) -> Result<(), MapError> {
        Status::header("Map");
        match view.center {
            Some(center) => println!("  {} [{:.5}, {:.5}]", "◎ center".cyan(), center.lat(), center.lng()),
            None => println!("  {}", "no center yet".dimmed()),
        }
        for marker in &view.markers {
            let pin = match marker.kind {
                MarkerKind::Attendee => "● attendee ".blue().to_string(),
                MarkerKind::Suggestion => "◆ venue    ".yellow().to_string(),
                MarkerKind::Selected => "★ selected ".green().to_string(),
            };
            println!(
                "  {pin} [{:.5}, {:.5}] {}",
                marker.position.lat(),
                marker.position.lng(),
                marker.label
            );
        }
        Ok(())
    }
}

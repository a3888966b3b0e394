//! Meetpoint CLI
//!
//! Find a fair place to meet: compute midpoints offline, inspect a meeting's
//! attendee positions, look up venues around the center, commit a venue and
//! replay recorded position tracks through the geolocation watcher.

use clap::{Parser, Subcommand};
use meetpoint_api_client::ApiError;
use meetpoint_core::config::Config;
use meetpoint_core::{ErrorCode, exit_codes};
use meetpoint_engine::EngineError;
use meetpoint_telemetry::TelemetryConfig;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod output;

use commands::{Context, centroid, locations, select, suggest, track};
use output::OutputFormat;

/// Location convergence for Meetpoint meetings
#[derive(Parser)]
#[command(name = "meetpoint")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Engine settings file (defaults to .meetpoint.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the central point of a set of coordinates (offline)
    Centroid {
        /// Points as `lng,lat` (or `lat,lng` with --map-order)
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<String>,

        /// Read points as `lat,lng`
        #[arg(long)]
        map_order: bool,
    },

    /// Show attendee positions and the central location of a meeting
    Locations {
        /// Meeting id
        meeting: String,

        /// Also draw the map frame
        #[arg(short, long)]
        map: bool,
    },

    /// Suggest venues around the meeting's central location
    Suggest {
        /// Meeting id
        meeting: String,

        /// Place type (defaults to the configured type)
        #[arg(short = 't', long = "type")]
        place_type: Option<String>,

        /// Search radius in meters (defaults to the configured radius)
        #[arg(short, long)]
        radius: Option<u32>,
    },

    /// Commit the meeting venue (organizer only)
    Select {
        /// Meeting id
        meeting: String,

        /// Venue name
        #[arg(long)]
        name: String,

        /// Venue address
        #[arg(long)]
        address: String,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Place id of a suggested venue
        #[arg(long)]
        place_id: Option<String>,
    },

    /// Replay a recorded position track through the geolocation watcher
    Track {
        /// Meeting id
        meeting: String,

        /// Attendee the track belongs to
        #[arg(long)]
        attendee: String,

        /// JSON array of fixes (`{"latitude", "longitude", "accuracy"?}`) or
        /// errors (`{"error": "permission_denied"}`)
        #[arg(long)]
        file: PathBuf,

        /// Delay between replayed fixes in milliseconds
        #[arg(long, default_value = "1000")]
        pace_ms: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = if cli.verbose {
        TelemetryConfig::verbose()
    } else {
        TelemetryConfig {
            log_level: "warn".to_string(),
            ..TelemetryConfig::default()
        }
    };
    if let Err(e) = meetpoint_telemetry::init_with_config(telemetry) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return report(e.into(), cli.format),
    };
    let ctx = Context::new(cli.format, config);

    let result = match cli.command {
        Commands::Centroid { points, map_order } => centroid::run(&points, map_order, &ctx),
        Commands::Locations { meeting, map } => locations::run(&meeting, map, &ctx).await,
        Commands::Suggest {
            meeting,
            place_type,
            radius,
        } => suggest::run(&meeting, place_type, radius, &ctx).await,
        Commands::Select {
            meeting,
            name,
            address,
            lng,
            lat,
            place_id,
        } => {
            let venue = select::Venue {
                name,
                address,
                place_id,
                coordinate: [lng, lat],
            };
            select::run(&meeting, venue, &ctx).await
        }
        Commands::Track {
            meeting,
            attendee,
            file,
            pace_ms,
        } => track::run(&meeting, &attendee, &file, pace_ms, &ctx).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e, cli.format),
    }
}

/// Print an error and pick the exit code from its error code
fn report(err: anyhow::Error, format: OutputFormat) -> ExitCode {
    let err = match err.downcast::<EngineError>() {
        Ok(e) => meetpoint_core::Error::from(e),
        Err(err) => match err.downcast::<ApiError>() {
            Ok(e) => meetpoint_core::Error::from(e),
            Err(err) => match err.downcast::<meetpoint_core::Error>() {
                Ok(e) => e,
                Err(other) => {
                    eprintln!("{} {:#}", "Error:".red().bold(), other);
                    return ExitCode::FAILURE;
                }
            },
        },
    };
    if format.is_json() {
        match serde_json::to_string_pretty(&err.to_report()) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{err}"),
        }
    } else {
        eprintln!("{} {}", "Error:".red().bold(), err);
    }
    ExitCode::from(exit_code(err.code))
}

fn exit_code(code: ErrorCode) -> u8 {
    let code = match code {
        ErrorCode::Timeout | ErrorCode::GeolocationTimeout => exit_codes::TIMEOUT,
        other => match other.category() {
            "Validation" | "Geo" => exit_codes::VALIDATION_ERROR,
            "Configuration" => exit_codes::CONFIG_ERROR,
            "Network" => exit_codes::NETWORK_ERROR,
            _ => exit_codes::FAILURE,
        },
    };
    u8::try_from(code).unwrap_or(1)
}

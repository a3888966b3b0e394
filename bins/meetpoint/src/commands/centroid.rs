//! Centroid command - central point of a set of coordinates, offline

use super::Context;
use crate::output::{Status, format_distance, print_json};
use anyhow::Result;
use meetpoint_geo::{GeoPoint, compute_centroid, haversine_distance_meters, to_geo_order};
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CentroidOutput {
    points: usize,
    /// `[lng, lat]`, absent when the points have no meaningful center
    centroid: Option<GeoPoint>,
    /// Farthest point from the centroid, in meters
    max_distance_meters: Option<f64>,
}

/// Run the centroid command
pub fn run(raw: &[String], map_order: bool, ctx: &Context) -> Result<()> {
    let points = raw
        .iter()
        .map(|p| parse_point(p, map_order))
        .collect::<Result<Vec<_>, _>>()?;

    let centroid = compute_centroid(&points);
    let max_distance_meters = centroid.map(|c| {
        points
            .iter()
            .map(|p| haversine_distance_meters(&c, p))
            .fold(0.0, f64::max)
    });

    if ctx.format.is_json() {
        return print_json(&CentroidOutput {
            points: points.len(),
            centroid,
            max_distance_meters,
        });
    }

    Status::header(&format!("Centroid of {} points", points.len()));
    match (centroid, max_distance_meters) {
        (Some(c), Some(spread)) => {
            println!("  {} {c}", "lng, lat:".dimmed());
            println!("  {} {}", "lat, lng:".dimmed(), c.to_map());
            println!("  {} {}", "farthest:".dimmed(), format_distance(spread));
        }
        _ => Status::warning("The points have no meaningful center"),
    }
    Ok(())
}

/// Parse `a,b` in the requested order into a validated point
fn parse_point(raw: &str, map_order: bool) -> Result<GeoPoint, meetpoint_core::Error> {
    let invalid = |detail: &str| meetpoint_core::Error::invalid_coordinate(format!("{raw:?}: {detail}"));

    let (a, b) = raw.split_once(',').ok_or_else(|| invalid("expected two comma-separated numbers"))?;
    let a: f64 = a.trim().parse().map_err(|_| invalid("first value is not a number"))?;
    let b: f64 = b.trim().parse().map_err(|_| invalid("second value is not a number"))?;

    let pair = if map_order {
        to_geo_order([a, b]).ok_or_else(|| invalid("not a valid [lat, lng] pair"))?
    } else {
        [a, b]
    };
    GeoPoint::try_from(pair).map_err(|e| invalid(&e.to_string()))
}

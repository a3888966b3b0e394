//! Coalescing of location payloads from the backend.
//!
//! Different endpoints describe a point in different shapes. All of them are
//! folded into a [`GeoPoint`] here, at the ingress boundary:
//! - `{"location": {"coordinates": [lng, lat]}}` (nested GeoJSON)
//! - `{"type": "Point", "coordinates": [lng, lat]}` / `{"coordinates": [lng, lat]}`
//! - `{"latitude": .., "longitude": ..}`
//! - `{"lat": .., "lng": ..}` (also `lon`)
//! - `[lng, lat]` (bare pair, backend convention)
//! - `"POINT(lng lat)"` (WKT)

use crate::{GeoError, GeoPoint, Result};
use serde_json::Value;

/// Folds any supported location shape into a validated [`GeoPoint`].
///
/// # Example
/// ```
/// use meetpoint_geo::coalesce_point;
/// use serde_json::json;
///
/// let nested = json!({"location": {"type": "Point", "coordinates": [-74.0, 40.71]}});
/// let flat = json!({"latitude": 40.71, "longitude": -74.0});
///
/// assert_eq!(coalesce_point(&nested).unwrap(), coalesce_point(&flat).unwrap());
/// ```
pub fn coalesce_point(value: &Value) -> Result<GeoPoint> {
    match value {
        Value::Null => Err(GeoError::MalformedPayload("location is null".into())),
        Value::Array(items) => pair_from_array(items),
        Value::String(wkt) => parse_wkt_point(wkt),
        Value::Object(map) => {
            if let Some(inner) = map.get("location") {
                return coalesce_point(inner);
            }
            if let Some(Value::Array(items)) = map.get("coordinates") {
                return pair_from_array(items);
            }
            if let (Some(lat), Some(lng)) = (map.get("latitude"), map.get("longitude")) {
                return from_lat_lng(lat, lng);
            }
            let lng = map.get("lng").or_else(|| map.get("lon"));
            if let (Some(lat), Some(lng)) = (map.get("lat"), lng) {
                return from_lat_lng(lat, lng);
            }
            Err(GeoError::MalformedPayload(format!(
                "no recognised coordinate fields in {}",
                summarize(value)
            )))
        }
        Value::Bool(_) | Value::Number(_) => Err(GeoError::MalformedPayload(format!(
            "expected an object, pair or WKT string, got {}",
            summarize(value)
        ))),
    }
}

/// Like [`coalesce_point`] but treats a missing or null payload as absent.
pub fn coalesce_optional(value: Option<&Value>) -> Option<Result<GeoPoint>> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(coalesce_point(v)),
    }
}

fn pair_from_array(items: &[Value]) -> Result<GeoPoint> {
    if items.len() != 2 {
        return Err(GeoError::MalformedPayload(format!(
            "expected [lng, lat], got {} elements",
            items.len()
        )));
    }
    let lng = number(&items[0], "longitude")?;
    let lat = number(&items[1], "latitude")?;
    Ok(GeoPoint::new(lng, lat)?)
}

fn from_lat_lng(lat: &Value, lng: &Value) -> Result<GeoPoint> {
    let lat = number(lat, "latitude")?;
    let lng = number(lng, "longitude")?;
    Ok(GeoPoint::new(lng, lat)?)
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn number(value: &Value, axis: &str) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| GeoError::MalformedPayload(format!("{axis} is not representable"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| GeoError::MalformedPayload(format!("{axis} is not numeric: {s:?}"))),
        other => Err(GeoError::MalformedPayload(format!(
            "{axis} is not numeric: {}",
            summarize(other)
        ))),
    }
}

fn summarize(value: &Value) -> String {
    let text = value.to_string();
    if text.len() > 80 {
        let cut = (0..=80).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        format!("{}…", &text[..cut])
    } else {
        text
    }
}

/// Parse a WKT POINT string.
///
/// Format: `POINT(longitude latitude)`
fn parse_wkt_point(wkt: &str) -> Result<GeoPoint> {
    let wkt = wkt.trim();

    if !wkt.starts_with("POINT(") && !wkt.starts_with("POINT (") {
        return Err(GeoError::InvalidWkt(format!("Expected POINT, got: {wkt}")));
    }

    let start = wkt.find('(').ok_or_else(|| GeoError::InvalidWkt("Missing '('".into()))?;
    let end = wkt.find(')').ok_or_else(|| GeoError::InvalidWkt("Missing ')'".into()))?;

    if start >= end {
        return Err(GeoError::InvalidWkt("Invalid parentheses".into()));
    }

    let parts: Vec<&str> = wkt[start + 1..end].split_whitespace().collect();

    if parts.len() != 2 {
        return Err(GeoError::InvalidWkt(format!(
            "Expected 2 coordinates, got {}",
            parts.len()
        )));
    }

    let lng: f64 = parts[0]
        .parse()
        .map_err(|_| GeoError::InvalidWkt(format!("Invalid longitude: {}", parts[0])))?;
    let lat: f64 = parts[1]
        .parse()
        .map_err(|_| GeoError::InvalidWkt(format!("Invalid latitude: {}", parts[1])))?;

    Ok(GeoPoint::new(lng, lat)?)
}

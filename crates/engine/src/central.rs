//! Central location resolution.
//!
//! A valid point supplied by the server wins; otherwise the spherical
//! centroid of the known attendee positions is used.

use crate::store::AttendeeLocation;
use meetpoint_geo::{GeoPoint, compute_centroid};
use serde::Serialize;

/// Where a central location came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CentralBasis {
    /// Supplied by the backend
    Server,
    /// Spherical centroid of the attendee set
    ClientComputed,
}

impl std::fmt::Display for CentralBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::ClientComputed => f.write_str("client-computed"),
        }
    }
}

/// The point suggestions are searched around
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CentralLocation {
    #[serde(rename = "coordinates")]
    pub coordinate: GeoPoint,
    pub basis: CentralBasis,
}

/// Prefer the server's point, else the centroid of `attendees`.
///
/// `None` when the server has none and no attendee position yields a
/// center (empty set, positions that cancel out, or a mean on `(0, 0)`).
#[must_use]
pub fn resolve_central(server: Option<GeoPoint>, attendees: &[AttendeeLocation]) -> Option<CentralLocation> {
    if let Some(coordinate) = server {
        return Some(CentralLocation {
            coordinate,
            basis: CentralBasis::Server,
        });
    }

    let points: Vec<GeoPoint> = attendees.iter().map(|a| a.coordinate).collect();
    compute_centroid(&points).map(|coordinate| CentralLocation {
        coordinate,
        basis: CentralBasis::ClientComputed,
    })
}

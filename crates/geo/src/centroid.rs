//! Spherical centroid of a set of points.
//!
//! Each point becomes a unit vector on the sphere, the vectors are averaged,
//! and the mean vector is projected back to latitude/longitude. Unlike an
//! arithmetic mean of degrees this has no seam at the ±180° meridian and no
//! singularity at the poles.

use crate::GeoPoint;

/// Below this length the mean vector has no meaningful direction.
const DEGENERATE_NORM: f64 = 1e-9;

/// Computes the central point of `points`.
///
/// - no points: `None`
/// - one point: that point, unchanged
/// - several points: spherical mean, or `None` when the points cancel out
///   (for example two exactly antipodal positions) or the mean lands on the
///   `(0, 0)` sentinel
///
/// The result does not depend on the order of `points` beyond
/// floating-point rounding.
///
/// # Example
/// ```
/// use meetpoint_geo::{compute_centroid, GeoPoint};
///
/// let east = GeoPoint::new(179.9, 10.0).unwrap();
/// let west = GeoPoint::new(-179.9, 10.0).unwrap();
/// let center = compute_centroid(&[east, west]).unwrap();
/// assert!((center.lng().abs() - 180.0).abs() < 1e-6);
/// ```
pub fn compute_centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    match points {
        [] => None,
        [single] => Some(*single),
        _ => {
            let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
            for point in points {
                let (lat, lng) = point.to_radians();
                x += lat.cos() * lng.cos();
                y += lat.cos() * lng.sin();
                z += lat.sin();
            }

            let n = points.len() as f64;
            let (x, y, z) = (x / n, y / n, z / n);

            if (x * x + y * y + z * z).sqrt() < DEGENERATE_NORM {
                return None;
            }

            let lng = y.atan2(x);
            let lat = z.atan2((x * x + y * y).sqrt());

            GeoPoint::from_computed(lng.to_degrees(), lat.to_degrees())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(lng: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lng, lat).unwrap()
    }

    #[test]
    fn test_empty_is_none() {
        assert!(compute_centroid(&[]).is_none());
    }

    #[test]
    fn test_single_point_is_identity() {
        let berlin = p(13.4050, 52.5200);
        assert_eq!(compute_centroid(&[berlin]), Some(berlin));
    }

    #[test]
    fn test_new_york_pair() {
        let center = compute_centroid(&[p(-74.0, 40.71), p(-73.9, 40.75)]).unwrap();
        assert!((center.lng() - -73.95).abs() < 0.01, "lng {}", center.lng());
        assert!((center.lat() - 40.73).abs() < 0.01, "lat {}", center.lat());
    }

    #[test]
    fn test_antimeridian_does_not_collapse_to_zero() {
        let center = compute_centroid(&[p(179.9, 0.5), p(-179.9, 0.5)]).unwrap();
        assert!((center.lng().abs() - 180.0).abs() < 1e-6, "lng {}", center.lng());
        assert!((center.lat() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_antimeridian_on_equator() {
        let center = compute_centroid(&[p(179.9, 0.0), p(-179.9, 0.0)]).unwrap();
        assert!((center.lng().abs() - 180.0).abs() < 1e-6);
        assert!(center.lat().abs() < 1e-9);
    }

    #[test]
    fn test_points_around_pole() {
        let ring: Vec<GeoPoint> = [0.0, 90.0, 180.0, -90.0].iter().map(|&lng| p(lng, 89.0)).collect();
        let center = compute_centroid(&ring).unwrap();
        assert!((center.lat() - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_antipodal_pair_has_no_center() {
        assert!(compute_centroid(&[p(10.0, 20.0), p(-170.0, -20.0)]).is_none());
    }

    #[test]
    fn test_mean_on_sentinel_has_no_center() {
        assert!(compute_centroid(&[p(-1.0, 0.0), p(1.0, 0.0)]).is_none());
        assert!(compute_centroid(&[p(0.0, -2.0), p(0.0, 2.0)]).is_none());
        // Close to but outside the sentinel box
        let center = compute_centroid(&[p(-1.0, 0.0), p(1.1, 0.0)]).unwrap();
        assert!((center.lng() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_points() {
        let paris = p(2.3522, 48.8566);
        let center = compute_centroid(&[paris, paris, paris]).unwrap();
        assert!((center.lng() - paris.lng()).abs() < 1e-9);
        assert!((center.lat() - paris.lat()).abs() < 1e-9);
    }

    fn point() -> impl Strategy<Value = GeoPoint> {
        (-180.0f64..=180.0, -90.0f64..=90.0)
            .prop_filter_map("sentinel", |(lng, lat)| GeoPoint::new(lng, lat).ok())
    }

    proptest! {
        #[test]
        fn prop_permutation_invariant(
            points in prop::collection::vec(point(), 2..12),
            rotate in 0usize..12,
        ) {
            let mut shuffled = points.clone();
            shuffled.reverse();
            let len = shuffled.len();
            shuffled.rotate_left(rotate % len);

            let a = compute_centroid(&points);
            let b = compute_centroid(&shuffled);
            match (a, b) {
                (Some(a), Some(b)) => {
                    let d_lng = (a.lng() - b.lng()).abs();
                    let d_lng = d_lng.min(360.0 - d_lng);
                    prop_assert!(d_lng < 1e-9 || a.lat().abs() > 90.0 - 1e-6);
                    prop_assert!((a.lat() - b.lat()).abs() < 1e-9);
                }
                (None, None) => {}
                _ => prop_assert!(false, "degenerate in one order only"),
            }
        }

        #[test]
        fn prop_result_is_in_range(points in prop::collection::vec(point(), 1..12)) {
            if let Some(c) = compute_centroid(&points) {
                prop_assert!((-180.0..=180.0).contains(&c.lng()));
                prop_assert!((-90.0..=90.0).contains(&c.lat()));
            }
        }
    }
}

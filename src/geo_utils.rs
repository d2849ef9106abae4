//! # Geographic Utilities
//!
//! Projection and bounding-box helpers shared by the cluster index and the
//! render session.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`project`] | WGS84 point to Web-Mercator unit square |
//! | [`unproject`] | Unit square back to WGS84 |
//! | [`wrap_longitude`] | Normalise a longitude into `[-180, 180]` |
//! | [`clamp_latitude`] | Clamp a latitude into `[-90, 90]` |
//! | [`zoom_radius`] | Pixel radius at a zoom level, in unit-square units |
//! | [`bounds_of`] | Bounding box enclosing a set of points |
//!
//! ## Example
//!
//! ```rust
//! use spatial_grouping::{GeoPoint, geo_utils};
//!
//! let p = GeoPoint::new(40.4093, 49.8671);
//! let [x, y] = geo_utils::project(p);
//! assert!(x > 0.5 && y < 0.5); // north-east of null island
//!
//! let back = geo_utils::unproject([x, y]);
//! assert!((back.latitude - p.latitude).abs() < 1e-9);
//! ```
//!
//! ## Coordinate System
//!
//! Clustering happens on the spherical Web-Mercator projection scaled to the
//! unit square: `x` grows east from 0 at 180°W to 1 at 180°E, `y` grows south
//! from 0 at ~85.05°N to 1 at ~85.05°S. One map tile at zoom `z` spans
//! `1 / 2^z` of the square, so a pixel radius converts to square units by
//! dividing by `extent * 2^z`.

use std::f64::consts::PI;

use geo::{BoundingRect, MultiPoint, Point};

use crate::{BoundingBox, GeoPoint};

// =============================================================================
// Projection
// =============================================================================

/// Project a longitude to the unit-square `x` axis.
#[inline]
pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Project a latitude to the unit-square `y` axis, clamped to `[0, 1]`.
#[inline]
pub fn lat_y(lat: f64) -> f64 {
    let sin = lat.to_radians().sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

/// Inverse of [`lng_x`].
#[inline]
pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

/// Inverse of [`lat_y`].
#[inline]
pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Project a point onto the Web-Mercator unit square as `[x, y]`.
///
/// Latitudes beyond the Mercator limit (~85.05°) pin to the square's edge.
#[inline]
pub fn project(point: GeoPoint) -> [f64; 2] {
    [lng_x(point.longitude), lat_y(point.latitude)]
}

/// Convert a unit-square position back to a point.
#[inline]
pub fn unproject([x, y]: [f64; 2]) -> GeoPoint {
    GeoPoint::new(y_lat(y), x_lng(x))
}

/// Search radius in unit-square units for a pixel `radius` at `zoom`, on
/// tiles `extent` pixels wide.
#[inline]
pub fn zoom_radius(radius: f64, extent: f64, zoom: u8) -> f64 {
    radius / (extent * 2f64.powi(zoom as i32))
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Normalise a longitude into `[-180, 180]`.
///
/// In-range values come back bit-for-bit unchanged, so a record sitting
/// exactly on a viewport edge stays on it. Only out-of-range values wrap.
#[inline]
pub fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Clamp a latitude into `[-90, 90]`.
#[inline]
pub fn clamp_latitude(lat: f64) -> f64 {
    lat.clamp(-90.0, 90.0)
}

/// Compute the bounding box enclosing `points`.
///
/// Returns `None` for empty input.
///
/// # Example
///
/// ```rust
/// use spatial_grouping::{GeoPoint, geo_utils};
///
/// let bounds = geo_utils::bounds_of([
///     GeoPoint::new(40.40, 49.80),
///     GeoPoint::new(40.45, 49.90),
/// ]).unwrap();
/// assert_eq!(bounds.west, 49.80);
/// assert_eq!(bounds.north, 40.45);
/// ```
pub fn bounds_of<I>(points: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = GeoPoint>,
{
    let multi: MultiPoint<f64> = points.into_iter().map(Point::<f64>::from).collect();
    let rect = multi.bounding_rect()?;
    Some(BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_project_origin() {
        let [x, y] = project(GeoPoint::new(0.0, 0.0));
        assert!(approx_eq(x, 0.5, 1e-12));
        assert!(approx_eq(y, 0.5, 1e-12));
    }

    #[test]
    fn test_project_edges() {
        assert_eq!(lng_x(-180.0), 0.0);
        assert_eq!(lng_x(180.0), 1.0);
        // Poles clamp to the square
        assert_eq!(lat_y(90.0), 0.0);
        assert_eq!(lat_y(-90.0), 1.0);
    }

    #[test]
    fn test_unproject_roundtrip() {
        let p = GeoPoint::new(-33.8688, 151.2093);
        let back = unproject(project(p));
        assert!(approx_eq(back.latitude, p.latitude, 1e-9));
        assert!(approx_eq(back.longitude, p.longitude, 1e-9));
    }

    #[test]
    fn test_zoom_radius_halves_per_level() {
        let r0 = zoom_radius(40.0, 256.0, 0);
        let r1 = zoom_radius(40.0, 256.0, 1);
        assert!(approx_eq(r0, 40.0 / 256.0, 1e-12));
        assert!(approx_eq(r0 / 2.0, r1, 1e-12));
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(45.0), 45.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
    }

    #[test]
    fn test_wrap_longitude_keeps_in_range_values_exact() {
        for lng in [49.860123, -0.1278, 151.20929, -179.999999, 0.000001] {
            assert_eq!(wrap_longitude(lng).to_bits(), lng.to_bits());
        }
    }

    #[test]
    fn test_bounds_of_empty() {
        assert!(bounds_of(std::iter::empty()).is_none());
    }

    #[test]
    fn test_bounds_of_points() {
        let b = bounds_of([
            GeoPoint::new(51.50, -0.13),
            GeoPoint::new(51.51, -0.12),
            GeoPoint::new(51.505, -0.125),
        ])
        .unwrap();
        assert_eq!(b.south, 51.50);
        assert_eq!(b.north, 51.51);
        assert_eq!(b.west, -0.13);
        assert_eq!(b.east, -0.12);
    }
}

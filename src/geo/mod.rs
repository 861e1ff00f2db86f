//! # Geodetic Geometry
//!
//! Points, meshes and longitude/latitude boxes on a spherical earth, plus the
//! international date line (IDL) arithmetic every box computation needs.
//!
//! Longitudes are degrees in [-180, 180) unless a function says otherwise.
//! Depths are kilometres, positive downwards. Distances are kilometres.
//!
//! Design rule: everything here is pure. No I/O, no state.

pub mod point;
pub mod bbox;
pub mod surface;

pub use point::{Mesh, Point};
pub use bbox::BoundingBox;

use crate::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Mean earth radius used by every great-circle computation.
pub const EARTH_RADIUS: f64 = 6371.0;

/// Degrees of arc per kilometre along a great circle.
pub const KM_TO_DEGREES: f64 = 0.0089932;

/// Kilometres per degree of arc along a great circle.
pub const DEGREES_TO_KM: f64 = EARTH_RADIUS * std::f64::consts::PI / 180.0;

// ============================================================================
// Great-circle helpers
// ============================================================================

/// Haversine distance between two surface points, in km.
pub fn geodetic_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lon1, lat1, lon2, lat2) = (
        lon1.to_radians(),
        lat1.to_radians(),
        lon2.to_radians(),
        lat2.to_radians(),
    );
    let a = ((lat1 - lat2) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon1 - lon2) / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin()
}

/// Initial bearing from the first point to the second, degrees clockwise
/// from north in [0, 360).
pub fn azimuth(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlon = (lon2 - lon1).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Surface point reached by travelling `distance` km from (lon, lat) along
/// the great circle with initial bearing `azimuth` (degrees).
pub fn point_at(lon: f64, lat: f64, azimuth: f64, distance: f64) -> (f64, f64) {
    let (lon, lat, az) = (lon.to_radians(), lat.to_radians(), azimuth.to_radians());
    let delta = distance / EARTH_RADIUS;
    let lat2 = (lat.sin() * delta.cos() + lat.cos() * delta.sin() * az.cos()).asin();
    let lon2 = lon
        + (az.sin() * delta.sin() * lat.cos()).atan2(delta.cos() - lat.sin() * lat2.sin());
    (fix_lon(lon2.to_degrees()), lat2.to_degrees())
}

/// Longitudinal width (degrees) of `km` at the larger of the given latitudes.
///
/// Grows without bound towards the poles; callers clamp.
pub fn angular_distance(km: f64, lat: f64, lat2: Option<f64>) -> f64 {
    let lat = match lat2 {
        Some(other) => lat.abs().max(other.abs()),
        None => lat.abs(),
    };
    km * KM_TO_DEGREES / lat.to_radians().cos()
}

// ============================================================================
// International date line
// ============================================================================

/// Wrap a longitude into [-180, 180).
pub fn fix_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed eastward extent from `lon1` to `lon2`, in (-180, 180].
///
/// Negative when `lon2` lies west of `lon1` along the short way round.
pub fn longitudinal_extent(lon1: f64, lon2: f64) -> f64 {
    let extent = (lon2 - lon1 + 180.0).rem_euclid(360.0) - 180.0;
    if extent == -180.0 { 180.0 } else { extent }
}

/// True when the longitudes lie on both sides of the date line, i.e. they
/// have opposite signs and span more than 180 degrees.
pub fn cross_idl(lons: &[f64]) -> bool {
    let Some((min, max)) = min_max(lons) else {
        return false;
    };
    min * max < 0.0 && (max - min).abs() > 180.0
}

/// Move longitudes into [0, 360) when they cross the date line.
///
/// Returns the (possibly shifted) longitudes and whether the shift applied.
pub fn fix_lons_idl(lons: &[f64]) -> (Vec<f64>, bool) {
    if cross_idl(lons) {
        (lons.iter().map(|lon| lon.rem_euclid(360.0)).collect(), true)
    } else {
        (lons.to_vec(), false)
    }
}

/// Smallest box holding all the points, aware of the date line.
///
/// When the points straddle the date line the west edge is the smallest
/// positive longitude and the east edge the largest negative one, so the
/// result has `min_lon > max_lon`.
pub fn spherical_bounding_box(lons: &[f64], lats: &[f64]) -> Result<BoundingBox> {
    if lons.len() != lats.len() {
        return Err(Error::Geometry(format!(
            "{} longitudes but {} latitudes",
            lons.len(),
            lats.len()
        )));
    }
    let (Some((mut west, mut east)), Some((south, north))) = (min_max(lons), min_max(lats)) else {
        return Err(Error::Geometry("bounding box of an empty point set".into()));
    };
    if lons.iter().any(|lon| !(-180.0..=180.0).contains(lon)) {
        return Err(Error::Geometry(format!(
            "longitudes must lie in [-180, 180], got [{west}, {east}]"
        )));
    }
    if longitudinal_extent(west, east) < 0.0 {
        west = lons.iter().copied().filter(|lon| *lon > 0.0).fold(f64::INFINITY, f64::min);
        east = lons.iter().copied().filter(|lon| *lon < 0.0).fold(f64::NEG_INFINITY, f64::max);
        let fits = lons.iter().all(|&lon| {
            longitudinal_extent(west, lon) >= 0.0 && longitudinal_extent(lon, east) >= 0.0
        });
        if !fits {
            return Err(Error::Geometry(
                "points collection has longitudinal extent wider than 180 deg".into(),
            ));
        }
    }
    Ok(BoundingBox::new(west, south, east, north))
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

// ============================================================================
// Tests
// ============================================================================

//! Longitude/latitude bounding boxes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{angular_distance, longitudinal_extent, KM_TO_DEGREES};

/// An axis-aligned lon/lat box, `(min_lon, min_lat, max_lon, max_lat)`.
///
/// A box that wraps over the date line has `min_lon > max_lon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    /// Degenerate box holding a single point.
    pub fn from_point(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, lon, lat)
    }

    pub fn crosses_idl(&self) -> bool {
        self.min_lon > self.max_lon
    }

    /// Eastward width in degrees, measured across the date line when the box wraps.
    pub fn width(&self) -> f64 {
        if self.crosses_idl() {
            self.max_lon + 360.0 - self.min_lon
        } else {
            self.max_lon - self.min_lon
        }
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Inclusive containment test; wrapped boxes hold both sides of the seam.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let lat_ok = self.min_lat <= lat && lat <= self.max_lat;
        let lon_ok = if self.crosses_idl() {
            lon >= self.min_lon || lon <= self.max_lon
        } else {
            self.min_lon <= lon && lon <= self.max_lon
        };
        lat_ok && lon_ok
    }

    /// Grow the box by `maxdist` km on every side.
    ///
    /// Latitudes move by `maxdist * KM_TO_DEGREES` and are clamped to the
    /// poles. Longitudes move by the angular distance at the box's most
    /// poleward latitude and wrap back into [-180, 180]; a result wider
    /// than the globe becomes the full longitude range.
    pub fn enlarged(&self, maxdist: f64) -> Self {
        let a1 = (maxdist * KM_TO_DEGREES).min(90.0);
        let a2 = angular_distance(maxdist, self.min_lat, Some(self.max_lat)).min(180.0);
        let min_lat = (self.min_lat - a1).max(-90.0);
        let max_lat = (self.max_lat + a1).min(90.0);

        let extent = longitudinal_extent(self.min_lon, self.max_lon).abs();
        if extent + 2.0 * a2 >= 360.0 {
            return Self::new(-180.0, min_lat, 180.0, max_lat);
        }
        let mut west = self.min_lon - a2;
        if west < -180.0 {
            west += 360.0;
        }
        let mut east = self.max_lon + a2;
        if east > 180.0 {
            east -= 360.0;
        }
        Self::new(west, min_lat, east, max_lat)
    }

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

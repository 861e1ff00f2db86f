//! Points and meshes of points.

use serde::{Deserialize, Serialize};

use super::{azimuth, geodetic_distance};
use crate::{Error, Result};

/// A location on (or below) the earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
    /// Kilometres below sea level.
    pub depth: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64, depth: f64) -> Self {
        Self { lon, lat, depth }
    }

    pub fn surface(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, 0.0)
    }

    /// Great-circle distance between the surface projections, in km.
    pub fn epicentral_distance(&self, other: &Point) -> f64 {
        geodetic_distance(self.lon, self.lat, other.lon, other.lat)
    }

    /// Straight-line distance accounting for both depths, in km.
    pub fn distance(&self, other: &Point) -> f64 {
        self.epicentral_distance(other).hypot(self.depth - other.depth)
    }

    /// Bearing from this point to `other`, degrees clockwise from north.
    pub fn azimuth(&self, other: &Point) -> f64 {
        azimuth(self.lon, self.lat, other.lon, other.lat)
    }

    /// Distance to every point of the mesh, with or without the depth term.
    pub fn distance_to_mesh(&self, mesh: &Mesh, with_depths: bool) -> Vec<f64> {
        mesh.iter()
            .map(|p| if with_depths { self.distance(&p) } else { self.epicentral_distance(&p) })
            .collect()
    }
}

/// Parallel coordinate arrays, one entry per point.
///
/// This is the form site collections hand to distance computations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    lons: Vec<f64>,
    lats: Vec<f64>,
    depths: Vec<f64>,
}

impl Mesh {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>, depths: Vec<f64>) -> Result<Self> {
        if lons.len() != lats.len() || lons.len() != depths.len() {
            return Err(Error::Geometry(format!(
                "mesh arrays differ in length: {} lons, {} lats, {} depths",
                lons.len(),
                lats.len(),
                depths.len()
            )));
        }
        Ok(Self { lons, lats, depths })
    }

    pub fn from_points(points: &[Point]) -> Self {
        Self {
            lons: points.iter().map(|p| p.lon).collect(),
            lats: points.iter().map(|p| p.lat).collect(),
            depths: points.iter().map(|p| p.depth).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lons.is_empty()
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    pub fn get(&self, i: usize) -> Option<Point> {
        Some(Point::new(*self.lons.get(i)?, *self.lats.get(i)?, *self.depths.get(i)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = Point> + '_ {
        self.lons
            .iter()
            .zip(&self.lats)
            .zip(&self.depths)
            .map(|((&lon, &lat), &depth)| Point::new(lon, lat, depth))
    }
}

//! Point-like sources.

use serde::{Deserialize, Serialize};

use super::SeismicSource;
use crate::geo::surface::PointSurface;
use crate::geo::{spherical_bounding_box, BoundingBox, Point};
use crate::model::{Rupture, SiteCollection};
use crate::{Error, Result};

fn check_distance(maxdist: f64) -> Result<()> {
    if maxdist.is_finite() && maxdist >= 0.0 {
        Ok(())
    } else {
        Err(Error::Geometry(format!("maximum distance must be finite and non-negative, got {maxdist}")))
    }
}

// ============================================================================
// PointSource
// ============================================================================

/// Earthquakes nucleating at a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
    pub source_id: String,
    pub tectonic_region_type: String,
    pub location: Point,
    /// One rupture per magnitude.
    #[serde(default)]
    pub magnitudes: Vec<f64>,
    #[serde(default)]
    pub strike: f64,
    #[serde(default)]
    pub rake: f64,
    /// Furthest a rupture extends from `location`, in km. Widens every
    /// distance test so finite ruptures are not cut off.
    #[serde(default)]
    pub max_rupture_radius: f64,
}

impl PointSource {
    pub fn new(source_id: impl Into<String>, tectonic_region_type: impl Into<String>, location: Point) -> Self {
        Self {
            source_id: source_id.into(),
            tectonic_region_type: tectonic_region_type.into(),
            location,
            magnitudes: Vec::new(),
            strike: 0.0,
            rake: 0.0,
            max_rupture_radius: 0.0,
        }
    }

    pub fn with_magnitudes(mut self, magnitudes: impl IntoIterator<Item = f64>) -> Self {
        self.magnitudes = magnitudes.into_iter().collect();
        self
    }

    pub fn with_strike(mut self, strike: f64) -> Self {
        self.strike = strike;
        self
    }

    pub fn with_rupture_radius(mut self, km: f64) -> Self {
        self.max_rupture_radius = km;
        self
    }

    pub fn iter_ruptures(&self) -> impl Iterator<Item = Rupture> + '_ {
        self.magnitudes.iter().map(move |&mag| {
            Rupture::new(
                mag,
                self.tectonic_region_type.clone(),
                self.location,
                PointSurface::new(self.location, self.strike),
            )
            .with_rake(self.rake)
        })
    }
}

impl SeismicSource for PointSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn tectonic_region_type(&self) -> &str {
        &self.tectonic_region_type
    }

    fn bounding_box(&self, maxdist: f64) -> Result<BoundingBox> {
        check_distance(maxdist)?;
        Ok(BoundingBox::from_point(self.location.lon, self.location.lat)
            .enlarged(maxdist + self.max_rupture_radius))
    }

    fn filter_sites_by_distance(&self, maxdist: f64, sites: &SiteCollection) -> Result<Option<SiteCollection>> {
        check_distance(maxdist)?;
        if sites.is_empty() {
            return Ok(None);
        }
        let limit = maxdist + self.max_rupture_radius;
        let mask: Vec<bool> = self
            .location
            .distance_to_mesh(&sites.mesh(), false)
            .into_iter()
            .map(|d| d <= limit)
            .collect();
        sites.filter(&mask)
    }
}

// ============================================================================
// MultiPointSource
// ============================================================================

/// Point sources sharing magnitudes and mechanism, one per location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPointSource {
    pub source_id: String,
    pub tectonic_region_type: String,
    pub locations: Vec<Point>,
    #[serde(default)]
    pub magnitudes: Vec<f64>,
    #[serde(default)]
    pub strike: f64,
    #[serde(default)]
    pub rake: f64,
    #[serde(default)]
    pub max_rupture_radius: f64,
}

impl MultiPointSource {
    pub fn new(
        source_id: impl Into<String>,
        tectonic_region_type: impl Into<String>,
        locations: Vec<Point>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            tectonic_region_type: tectonic_region_type.into(),
            locations,
            magnitudes: Vec::new(),
            strike: 0.0,
            rake: 0.0,
            max_rupture_radius: 0.0,
        }
    }

    pub fn with_magnitudes(mut self, magnitudes: impl IntoIterator<Item = f64>) -> Self {
        self.magnitudes = magnitudes.into_iter().collect();
        self
    }

    pub fn with_rupture_radius(mut self, km: f64) -> Self {
        self.max_rupture_radius = km;
        self
    }

    /// One `PointSource` per location, ids suffixed with the location index.
    pub fn points(&self) -> impl Iterator<Item = PointSource> + '_ {
        self.locations.iter().enumerate().map(move |(i, &location)| PointSource {
            source_id: format!("{}:{i}", self.source_id),
            tectonic_region_type: self.tectonic_region_type.clone(),
            location,
            magnitudes: self.magnitudes.clone(),
            strike: self.strike,
            rake: self.rake,
            max_rupture_radius: self.max_rupture_radius,
        })
    }

    pub fn iter_ruptures(&self) -> impl Iterator<Item = Rupture> + '_ {
        self.points().flat_map(|src| src.iter_ruptures().collect::<Vec<_>>())
    }

    fn require_locations(&self) -> Result<()> {
        if self.locations.is_empty() {
            Err(Error::Geometry("multi-point source has no locations".into()))
        } else {
            Ok(())
        }
    }
}

impl SeismicSource for MultiPointSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn tectonic_region_type(&self) -> &str {
        &self.tectonic_region_type
    }

    fn bounding_box(&self, maxdist: f64) -> Result<BoundingBox> {
        check_distance(maxdist)?;
        self.require_locations()?;
        let lons: Vec<f64> = self.locations.iter().map(|p| p.lon).collect();
        let lats: Vec<f64> = self.locations.iter().map(|p| p.lat).collect();
        Ok(spherical_bounding_box(&lons, &lats)?.enlarged(maxdist + self.max_rupture_radius))
    }

    fn filter_sites_by_distance(&self, maxdist: f64, sites: &SiteCollection) -> Result<Option<SiteCollection>> {
        check_distance(maxdist)?;
        self.require_locations()?;
        if sites.is_empty() {
            return Ok(None);
        }
        let limit = maxdist + self.max_rupture_radius;
        let mesh = sites.mesh();
        let mut mask = vec![false; sites.len()];
        for location in &self.locations {
            for (keep, d) in mask.iter_mut().zip(location.distance_to_mesh(&mesh, false)) {
                *keep |= d <= limit;
            }
        }
        sites.filter(&mask)
    }
}

// ============================================================================
// Tests
// ============================================================================

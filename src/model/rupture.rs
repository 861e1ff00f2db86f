//! Ruptures produced by sources.

use std::sync::Arc;

use crate::geo::surface::RuptureSurface;
use crate::geo::{Mesh, Point};
use crate::{Error, Result};

/// A single earthquake scenario: magnitude, nucleation point and geometry.
///
/// Ruptures are transient: sources generate them, filters read them.
#[derive(Debug, Clone)]
pub struct Rupture {
    pub mag: f64,
    /// Degrees, Aki & Richards convention.
    pub rake: f64,
    pub tectonic_region_type: String,
    pub hypocenter: Point,
    pub surface: Arc<dyn RuptureSurface>,
    /// Slip direction in the fault plane, needed only for directivity.
    pub rupture_slip_direction: Option<f64>,
}

impl Rupture {
    pub fn new(
        mag: f64,
        tectonic_region_type: impl Into<String>,
        hypocenter: Point,
        surface: impl RuptureSurface + 'static,
    ) -> Self {
        Self {
            mag,
            rake: 0.0,
            tectonic_region_type: tectonic_region_type.into(),
            hypocenter,
            surface: Arc::new(surface),
            rupture_slip_direction: None,
        }
    }

    pub fn with_rake(mut self, rake: f64) -> Self {
        self.rake = rake;
        self
    }

    pub fn with_slip_direction(mut self, degrees: f64) -> Self {
        self.rupture_slip_direction = Some(degrees);
        self
    }

    /// Directivity predictor at every mesh point.
    pub fn cdpp_value(&self, mesh: &Mesh) -> Result<Vec<f64>> {
        let slip = self.rupture_slip_direction.ok_or_else(|| {
            Error::Geometry("rcdpp needs a rupture slip direction".into())
        })?;
        self.surface.directivity_predictor(&self.hypocenter, slip, mesh)
    }
}

//! Named distance metrics between a rupture and a mesh of sites.
//!
//! Parsing a metric name is where unknown names fail; once a
//! [`DistanceMetric`] exists the computation cannot fail except for `rcdpp`
//! on a rupture without a slip direction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geo::Mesh;
use crate::model::Rupture;
use crate::{Error, Result};

/// The distance measures ground-motion models ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Closest distance to the rupture surface.
    #[default]
    Rrup,
    /// Joyner-Boore: closest distance to the surface projection.
    Rjb,
    Rx,
    Ry0,
    /// Hypocentral.
    Rhypo,
    /// Epicentral.
    Repi,
    /// Directivity predictor.
    Rcdpp,
    Azimuth,
}

impl DistanceMetric {
    pub const ALL: [DistanceMetric; 8] = [
        DistanceMetric::Rrup,
        DistanceMetric::Rjb,
        DistanceMetric::Rx,
        DistanceMetric::Ry0,
        DistanceMetric::Rhypo,
        DistanceMetric::Repi,
        DistanceMetric::Rcdpp,
        DistanceMetric::Azimuth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DistanceMetric::Rrup => "rrup",
            DistanceMetric::Rjb => "rjb",
            DistanceMetric::Rx => "rx",
            DistanceMetric::Ry0 => "ry0",
            DistanceMetric::Rhypo => "rhypo",
            DistanceMetric::Repi => "repi",
            DistanceMetric::Rcdpp => "rcdpp",
            DistanceMetric::Azimuth => "azimuth",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DistanceMetric::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::UnsupportedDistance(s.to_string()))
    }
}

/// Distances from `rupture` to every point of `mesh`.
pub fn distance(rupture: &Rupture, mesh: &Mesh, metric: DistanceMetric) -> Result<Vec<f64>> {
    let surface = &rupture.surface;
    Ok(match metric {
        DistanceMetric::Rrup => surface.min_distance(mesh),
        DistanceMetric::Rjb => surface.joyner_boore_distance(mesh),
        DistanceMetric::Rx => surface.rx_distance(mesh),
        DistanceMetric::Ry0 => surface.ry0_distance(mesh),
        DistanceMetric::Rhypo => rupture.hypocenter.distance_to_mesh(mesh, true),
        DistanceMetric::Repi => rupture.hypocenter.distance_to_mesh(mesh, false),
        DistanceMetric::Rcdpp => rupture.cdpp_value(mesh)?,
        DistanceMetric::Azimuth => surface.azimuth(mesh),
    })
}

/// [`distance`] keyed by metric name, e.g. `"rjb"`.
pub fn distance_by_name(rupture: &Rupture, mesh: &Mesh, metric: &str) -> Result<Vec<f64>> {
    distance(rupture, mesh, metric.parse()?)
}

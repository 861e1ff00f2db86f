//! # Seismic Source Contract
//!
//! This is what the filters need from a source, and nothing more.
//! Rupture enumeration stays on the concrete types.
//!
//! ## Implementations
//!
//! | Source | Module | Geometry |
//! |--------|--------|----------|
//! | `PointSource` | `point` | one hypocentre |
//! | `MultiPointSource` | `point` | a set of hypocentres sharing parameters |

pub mod point;

use std::sync::Arc;

use crate::geo::BoundingBox;
use crate::model::SiteCollection;
use crate::Result;

pub use point::{MultiPointSource, PointSource};

/// A seismic source as seen by the filters.
pub trait SeismicSource {
    /// Identifier used to tag errors raised while filtering this source.
    fn source_id(&self) -> &str;

    fn tectonic_region_type(&self) -> &str;

    /// Box around the source geometry, enlarged by `maxdist` km.
    ///
    /// A box crossing the date line has `min_lon > max_lon`.
    fn bounding_box(&self, maxdist: f64) -> Result<BoundingBox>;

    /// Sites within `maxdist` km of the source geometry, `None` when there are none.
    fn filter_sites_by_distance(
        &self,
        maxdist: f64,
        sites: &SiteCollection,
    ) -> Result<Option<SiteCollection>>;
}

impl<T: SeismicSource + ?Sized> SeismicSource for &T {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    fn tectonic_region_type(&self) -> &str {
        (**self).tectonic_region_type()
    }

    fn bounding_box(&self, maxdist: f64) -> Result<BoundingBox> {
        (**self).bounding_box(maxdist)
    }

    fn filter_sites_by_distance(
        &self,
        maxdist: f64,
        sites: &SiteCollection,
    ) -> Result<Option<SiteCollection>> {
        (**self).filter_sites_by_distance(maxdist, sites)
    }
}

impl<T: SeismicSource + ?Sized> SeismicSource for Arc<T> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    fn tectonic_region_type(&self) -> &str {
        (**self).tectonic_region_type()
    }

    fn bounding_box(&self, maxdist: f64) -> Result<BoundingBox> {
        (**self).bounding_box(maxdist)
    }

    fn filter_sites_by_distance(
        &self,
        maxdist: f64,
        sites: &SiteCollection,
    ) -> Result<Option<SiteCollection>> {
        (**self).filter_sites_by_distance(maxdist, sites)
    }
}

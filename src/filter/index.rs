//! Point indexes over site coordinates.
//!
//! Each site is stored as a degenerate box at its (possibly date-line
//! shifted) longitude and latitude. Queries take a rectangle with
//! `min_lon <= max_lon` and report every site inside it, edges included.

use std::fmt::Debug;

#[cfg(feature = "rtree")]
use rstar::{primitives::GeomWithData, RTree, AABB};

use crate::geo::BoundingBox;
use crate::model::SiteId;

/// Box-intersection queries over sites.
pub trait SpatialIndex: Debug + Send + Sync {
    /// Call `f` with the id of every site inside `rect`.
    fn visit_rect(&self, rect: &BoundingBox, f: &mut dyn FnMut(SiteId));

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backend name, for logs.
    fn name(&self) -> &'static str;
}

// ============================================================================
// RTreeIndex
// ============================================================================

#[cfg(feature = "rtree")]
type SitePoint = GeomWithData<[f64; 2], SiteId>;

/// R-tree over site points, bulk loaded once.
#[cfg(feature = "rtree")]
#[derive(Debug)]
pub struct RTreeIndex {
    tree: RTree<SitePoint>,
}

#[cfg(feature = "rtree")]
impl RTreeIndex {
    pub fn new(entries: impl IntoIterator<Item = (SiteId, f64, f64)>) -> Self {
        let points: Vec<SitePoint> = entries
            .into_iter()
            .map(|(sid, lon, lat)| GeomWithData::new([lon, lat], sid))
            .collect();
        Self { tree: RTree::bulk_load(points) }
    }
}

#[cfg(feature = "rtree")]
impl SpatialIndex for RTreeIndex {
    fn visit_rect(&self, rect: &BoundingBox, f: &mut dyn FnMut(SiteId)) {
        let envelope = AABB::from_corners([rect.min_lon, rect.min_lat], [rect.max_lon, rect.max_lat]);
        for point in self.tree.locate_in_envelope(&envelope) {
            f(point.data);
        }
    }

    fn len(&self) -> usize {
        self.tree.size()
    }

    fn name(&self) -> &'static str {
        "rtree"
    }
}

// ============================================================================
// FlatIndex
// ============================================================================

/// Linear scan over site points. Always available.
pub struct FlatIndex {
    entries: Vec<(SiteId, f64, f64)>,
}

impl FlatIndex {
    pub fn new(entries: impl IntoIterator<Item = (SiteId, f64, f64)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }
}

impl Debug for FlatIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatIndex").field("sites", &self.entries.len()).finish_non_exhaustive()
    }
}

impl SpatialIndex for FlatIndex {
    fn visit_rect(&self, rect: &BoundingBox, f: &mut dyn FnMut(SiteId)) {
        for &(sid, lon, lat) in &self.entries {
            if rect.min_lon <= lon && lon <= rect.max_lon && rect.min_lat <= lat && lat <= rect.max_lat {
                f(sid);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn name(&self) -> &'static str {
        "flat"
    }
}

//! # Source Filter
//!
//! Pairs every seismic source with the sites close enough to it.
//!
//! ## Strategies
//!
//! | Condition | Behaviour |
//! |-----------|-----------|
//! | no site collection | pass-through: every source with the caller's sites (required) |
//! | index built | affected box → index query → sorted site ids |
//! | empty distance table | every source with all sites |
//! | otherwise | the source filters the sites by its own geometry |
//!
//! An index is built only when a backend is selected, the distance table is
//! not empty, a site collection is given and every site is at sea level.
//! Sources with no site in range are skipped, never yielded empty.
//!
//! ## Date line
//!
//! When the sites straddle the date line their longitudes are moved into
//! [0, 360) before indexing and every affected box is moved into the same
//! frame. Boxes are *unwrapped*: `min_lon <= max_lon`, with `max_lon`
//! allowed past the frame's east edge, in which case the index is queried
//! with two rectangles.

use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::{smallvec, SmallVec};
use tracing::{debug, info, trace};

#[cfg(feature = "rtree")]
use super::index::RTreeIndex;
use super::index::{FlatIndex, SpatialIndex};
use super::integration::IntegrationDistance;
use crate::geo::{fix_lons_idl, BoundingBox};
use crate::model::{SiteCollection, SiteId};
use crate::source::SeismicSource;
use crate::{Error, Result};

// ============================================================================
// Configuration and results
// ============================================================================

/// Which index backend a [`SourceFilter`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// R-tree when the `rtree` feature is enabled, geometric filtering otherwise.
    #[default]
    Auto,
    /// Linear-scan index.
    Flat,
    /// No index: every source filters by its own geometry.
    Disabled,
}

/// A source together with the sites it affects.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredSource<S> {
    pub source: S,
    /// Number of sites in `sites`, for cost estimation downstream.
    pub nsites: usize,
    pub sites: SiteCollection,
}

impl<S> FilteredSource<S> {
    fn new(source: S, sites: SiteCollection) -> Self {
        Self { nsites: sites.len(), source, sites }
    }
}

/// An affected box recast for plotting: south-west corner, width and height in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub origin: (f64, f64),
    pub width: f64,
    pub height: f64,
}

// ============================================================================
// SourceFilter
// ============================================================================

/// Built once per calculation, then queried once per source.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    sitecol: Option<SiteCollection>,
    integration_distance: IntegrationDistance,
    index: Option<Arc<dyn SpatialIndex>>,
    /// Site longitudes were moved into [0, 360).
    idl: bool,
}

static NOOP: LazyLock<SourceFilter> =
    LazyLock::new(|| SourceFilter::new(None, IntegrationDistance::default(), IndexMode::Disabled));

impl SourceFilter {
    pub fn new(sitecol: Option<SiteCollection>, integration_distance: IntegrationDistance, mode: IndexMode) -> Self {
        let (index, idl) = match &sitecol {
            Some(sites) if !integration_distance.is_empty() => build_index(sites, mode),
            _ => (None, false),
        };
        if index.is_none() && sitecol.is_some() && !integration_distance.is_empty() {
            info!("Using distance filtering [no rtree]");
        }
        Self { sitecol, integration_distance, index, idl }
    }

    /// The shared pass-through filter.
    pub fn noop() -> &'static SourceFilter {
        &NOOP
    }

    /// The copy a filter becomes after crossing a process boundary: same
    /// sites and distance table, no index.
    pub fn transmitted(&self) -> Self {
        debug!(sites = self.sitecol.as_ref().map(SiteCollection::len), "filter transmitted, index dropped");
        Self::new(self.sitecol.clone(), self.integration_distance.clone(), IndexMode::Disabled)
    }

    pub fn sitecol(&self) -> Option<&SiteCollection> {
        self.sitecol.as_ref()
    }

    pub fn integration_distance(&self) -> &IntegrationDistance {
        &self.integration_distance
    }

    pub fn uses_index(&self) -> bool {
        self.index.is_some()
    }

    /// True when the site longitudes were shifted for the date line.
    pub fn idl(&self) -> bool {
        self.idl
    }

    /// Bounding box of `source` enlarged by its maximum distance, unwrapped
    /// into the index frame (`min_lon <= max_lon`).
    pub fn affected_box<S: SeismicSource + ?Sized>(&self, source: &S) -> Result<BoundingBox> {
        let maxdist = self.integration_distance.get(source.tectonic_region_type(), None)?;
        let bbox = source.bounding_box(maxdist)?;
        let (west, east) = unwrap_lons(&bbox, self.idl);
        Ok(BoundingBox::new(west, bbox.min_lat, east, bbox.max_lat))
    }

    /// The affected box as origin, width and height. For plotting only.
    pub fn get_rectangle<S: SeismicSource + ?Sized>(&self, source: &S) -> Result<Rectangle> {
        let bbox = self.affected_box(source)?;
        Ok(Rectangle {
            origin: (bbox.min_lon, bbox.min_lat),
            width: bbox.max_lon - bbox.min_lon,
            height: bbox.max_lat - bbox.min_lat,
        })
    }

    /// Lazily pair each source with its close sites, in input order.
    ///
    /// `sites` defaults to the filter's own collection. Errors are tagged
    /// with the id of the source being filtered.
    ///
    /// A pass-through filter (no site collection, as [`SourceFilter::noop`])
    /// has nothing to fall back on: calling it without `sites` is a caller
    /// error, reported as [`Error::InvalidSites`] for every source.
    pub fn filter<I>(&self, sources: I, sites: Option<&SiteCollection>) -> SourceSites<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: SeismicSource,
    {
        SourceSites {
            filter: self,
            sources: sources.into_iter(),
            sites: sites.or(self.sitecol.as_ref()).cloned(),
        }
    }

    /// Sites affected by a single source, `None` if there are none.
    pub fn get_close_sites<S: SeismicSource + ?Sized>(&self, source: &S) -> Result<Option<SiteCollection>> {
        self.filter(std::iter::once(source), None)
            .next()
            .transpose()
            .map(|found| found.map(|pair| pair.sites))
    }

    fn filter_source<S: SeismicSource>(&self, source: S, sites: &SiteCollection) -> Result<Option<FilteredSource<S>>> {
        if self.sitecol.is_none() {
            return Ok(Some(FilteredSource::new(source, sites.clone())));
        }
        let close = if let Some(index) = &self.index {
            self.query_index(&**index, &source, sites)
        } else if self.integration_distance.is_empty() {
            Ok(Some(sites.clone()))
        } else {
            self.integration_distance
                .get(source.tectonic_region_type(), None)
                .and_then(|maxdist| source.filter_sites_by_distance(maxdist, sites))
        };
        match close.map_err(|err| err.with_source_id(source.source_id()))? {
            Some(close) => Ok(Some(FilteredSource::new(source, close))),
            None => {
                trace!(source_id = source.source_id(), "no site in range, source skipped");
                Ok(None)
            }
        }
    }

    fn query_index<S: SeismicSource>(
        &self,
        index: &dyn SpatialIndex,
        source: &S,
        sites: &SiteCollection,
    ) -> Result<Option<SiteCollection>> {
        let bbox = self.affected_box(source)?;
        let frame_east = if self.idl { 360.0 } else { 180.0 };
        let mut sids: Vec<SiteId> = Vec::new();
        for rect in split_at(&bbox, frame_east) {
            index.visit_rect(&rect, &mut |sid| {
                if sites.contains(sid) {
                    sids.push(sid);
                }
            });
        }
        sids.sort_unstable();
        sids.dedup();
        sites.filter_sids(&sids)
    }
}

fn build_index(sites: &SiteCollection, mode: IndexMode) -> (Option<Arc<dyn SpatialIndex>>, bool) {
    if mode == IndexMode::Disabled {
        return (None, false);
    }
    if !sites.at_sea_level() {
        debug!("sites off sea level, index disabled");
        return (None, false);
    }
    let (lons, idl) = fix_lons_idl(&sites.lons());
    let entries = sites.sids().into_iter().zip(lons).zip(sites.lats()).map(|((sid, lon), lat)| (sid, lon, lat));
    let index: Arc<dyn SpatialIndex> = match mode {
        #[cfg(feature = "rtree")]
        IndexMode::Auto => Arc::new(RTreeIndex::new(entries)),
        #[cfg(not(feature = "rtree"))]
        IndexMode::Auto => return (None, false),
        IndexMode::Flat => Arc::new(FlatIndex::new(entries)),
        IndexMode::Disabled => return (None, false),
    };
    debug!(backend = index.name(), sites = index.len(), idl, "site index built");
    (Some(index), idl)
}

/// West and east edges of `bbox` in the index frame, west <= east.
///
/// The frame is [0, 360) when `idl` is set and [-180, 180] otherwise. A box
/// with `min_lon <= max_lon` spans exactly that range of longitudes, however
/// wide; only `min_lon > max_lon` means the box wraps across the date line.
fn unwrap_lons(bbox: &BoundingBox, idl: bool) -> (f64, f64) {
    let (west, east) = (bbox.min_lon, bbox.max_lon);
    if !bbox.crosses_idl() && east - west >= 360.0 {
        return if idl { (0.0, 360.0) } else { (-180.0, 180.0) };
    }
    if !idl {
        return if bbox.crosses_idl() { (west, east + 360.0) } else { (west, east) };
    }
    let west = west.rem_euclid(360.0);
    let mut east = east.rem_euclid(360.0);
    if east < west {
        east += 360.0;
    }
    (west, east)
}

/// Query rectangles for an unwrapped box whose east edge may pass `frame_east`.
fn split_at(bbox: &BoundingBox, frame_east: f64) -> SmallVec<[BoundingBox; 2]> {
    if bbox.max_lon <= frame_east {
        return smallvec![*bbox];
    }
    smallvec![
        BoundingBox::new(bbox.min_lon, bbox.min_lat, frame_east, bbox.max_lat),
        BoundingBox::new(frame_east - 360.0, bbox.min_lat, bbox.max_lon - 360.0, bbox.max_lat),
    ]
}

// ============================================================================
// Iteration
// ============================================================================

/// Lazy `(source, sites)` sequence returned by [`SourceFilter::filter`].
#[derive(Debug)]
pub struct SourceSites<'a, I> {
    filter: &'a SourceFilter,
    sources: I,
    sites: Option<SiteCollection>,
}

impl<I> Iterator for SourceSites<'_, I>
where
    I: Iterator,
    I::Item: SeismicSource,
{
    type Item = Result<FilteredSource<I::Item>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let source = self.sources.next()?;
            let Some(sites) = &self.sites else {
                return Some(Err(Error::InvalidSites("no site collection to pass through".into())
                    .with_source_id(source.source_id())));
            };
            match self.filter.filter_source(source, sites) {
                Ok(Some(pair)) => return Some(Ok(pair)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.sources.size_hint().1)
    }
}

// ============================================================================
// Transmission
// ============================================================================

#[derive(Serialize)]
struct WireRef<'a> {
    sitecol: &'a Option<SiteCollection>,
    integration_distance: &'a IntegrationDistance,
}

#[derive(Deserialize)]
struct Wire {
    sitecol: Option<SiteCollection>,
    integration_distance: IntegrationDistance,
}

/// Only the sites and the distance table are written.
impl Serialize for SourceFilter {
    fn serialize<Se: Serializer>(&self, serializer: Se) -> std::result::Result<Se::Ok, Se::Error> {
        WireRef { sitecol: &self.sitecol, integration_distance: &self.integration_distance }.serialize(serializer)
    }
}

/// Always comes back without an index.
impl<'de> Deserialize<'de> for SourceFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = Wire::deserialize(deserializer)?;
        debug!("filter received, geometric filtering");
        Ok(SourceFilter::new(wire.sitecol, wire.integration_distance, IndexMode::Disabled))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Point;
    use crate::model::Site;
    use crate::source::PointSource;
    use pretty_assertions::assert_eq;

    fn bbox(w: f64, e: f64) -> BoundingBox {
        BoundingBox::new(w, -10.0, e, 10.0)
    }

    fn three_sites() -> SiteCollection {
        SiteCollection::from_points([(0.0, 0.0), (1.0, 0.0), (10.0, 0.0)]).unwrap()
    }

    fn maxdist() -> IntegrationDistance {
        IntegrationDistance::scalar(100.0).unwrap()
    }

    #[test]
    fn unwrap_with_idl_covers_every_branch() {
        // Greenwich straddle, narrow and wide
        assert_eq!(unwrap_lons(&bbox(-10.0, 10.0), true), (350.0, 370.0));
        assert_eq!(unwrap_lons(&bbox(-135.0, 135.0), true), (225.0, 495.0));
        assert_eq!(unwrap_lons(&bbox(-170.0, 170.0), true), (190.0, 530.0));
        assert_eq!(unwrap_lons(&bbox(-20.0, -10.0), true), (340.0, 350.0));
        assert_eq!(unwrap_lons(&bbox(10.0, 20.0), true), (10.0, 20.0));
        // wrapped
        assert_eq!(unwrap_lons(&bbox(170.0, -170.0), true), (170.0, 190.0));
        assert_eq!(unwrap_lons(&bbox(-180.0, 180.0), true), (0.0, 360.0));
    }

    #[test]
    fn wide_greenwich_box_keeps_its_hemisphere() {
        let rects = split_at(&bbox(225.0, 495.0), 360.0);
        assert_eq!(rects.as_slice(), &[bbox(225.0, 360.0), bbox(0.0, 135.0)]);
        assert!(rects.iter().all(|r| !r.contains(179.5, 0.0) && !r.contains(180.5, 0.0)));
        assert!(rects.iter().any(|r| r.contains(0.0, 0.0)));
    }

    #[test]
    fn unwrap_without_idl() {
        assert_eq!(unwrap_lons(&bbox(-10.0, 10.0), false), (-10.0, 10.0));
        assert_eq!(unwrap_lons(&bbox(170.0, -170.0), false), (170.0, 190.0));
    }

    #[test]
    fn split_past_frame_edge() {
        assert_eq!(split_at(&bbox(10.0, 20.0), 180.0).len(), 1);
        let rects = split_at(&bbox(170.0, 190.0), 180.0);
        assert_eq!(rects.as_slice(), &[bbox(170.0, 180.0), bbox(-180.0, -170.0)]);
        let rects = split_at(&bbox(350.0, 370.0), 360.0);
        assert_eq!(rects.as_slice(), &[bbox(350.0, 360.0), bbox(0.0, 10.0)]);
    }

    #[test]
    fn index_eligibility() {
        let sites = three_sites();
        assert!(SourceFilter::new(Some(sites.clone()), maxdist(), IndexMode::Flat).uses_index());
        assert!(!SourceFilter::new(Some(sites.clone()), maxdist(), IndexMode::Disabled).uses_index());
        assert!(!SourceFilter::new(Some(sites.clone()), IntegrationDistance::default(), IndexMode::Flat).uses_index());
        assert!(!SourceFilter::new(None, maxdist(), IndexMode::Flat).uses_index());

        let raised = SiteCollection::new(vec![Site::new(0, 0.0, 0.0).with_depth(-1.2)]).unwrap();
        assert!(!SourceFilter::new(Some(raised), maxdist(), IndexMode::Flat).uses_index());
    }

    #[cfg(feature = "rtree")]
    #[test]
    fn auto_mode_builds_rtree() {
        assert!(SourceFilter::new(Some(three_sites()), maxdist(), IndexMode::Auto).uses_index());
    }

    #[test]
    fn idl_flag_follows_the_sites() {
        let sites = SiteCollection::from_points([(179.5, 0.0), (-179.5, 0.0)]).unwrap();
        assert!(SourceFilter::new(Some(sites), maxdist(), IndexMode::Flat).idl());
        assert!(!SourceFilter::new(Some(three_sites()), maxdist(), IndexMode::Flat).idl());
    }

    #[test]
    fn rectangle_of_affected_box() {
        let filter = SourceFilter::new(Some(three_sites()), maxdist(), IndexMode::Flat);
        let src = PointSource::new("p", "Active Shallow Crust", Point::new(0.0, 0.0, 10.0));
        let rect = filter.get_rectangle(&src).unwrap();
        let bbox = filter.affected_box(&src).unwrap();
        assert_eq!(rect.origin, (bbox.min_lon, bbox.min_lat));
        assert!((rect.width - 2.0 * 100.0 * crate::geo::KM_TO_DEGREES).abs() < 1e-9);
        assert!((rect.height - rect.width).abs() < 1e-9);
    }

    #[test]
    fn get_close_sites_for_one_source() {
        let filter = SourceFilter::new(Some(three_sites()), maxdist(), IndexMode::Flat);
        let near = PointSource::new("near", "Active Shallow Crust", Point::new(0.5, 0.0, 10.0));
        let far = PointSource::new("far", "Active Shallow Crust", Point::new(50.0, 0.0, 10.0));
        let close = filter.get_close_sites(&near).unwrap().unwrap();
        assert_eq!(close.sids(), vec![SiteId(0), SiteId(1)]);
        assert_eq!(filter.get_close_sites(&far).unwrap(), None);
    }

    #[test]
    fn noop_passes_caller_sites_through() {
        let src = PointSource::new("p", "Active Shallow Crust", Point::new(90.0, 0.0, 10.0));
        let sites = three_sites();
        let pairs: Vec<_> = SourceFilter::noop().filter([&src], Some(&sites)).collect::<Result<_>>().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].nsites, 3);

        let err = SourceFilter::noop().filter([&src], None).next().unwrap().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidSites);
    }

    #[test]
    fn deserialized_filter_has_no_index() {
        let filter = SourceFilter::new(Some(three_sites()), maxdist(), IndexMode::Flat);
        let json = serde_json::to_string(&filter).unwrap();
        assert!(json.contains("integration_distance"));
        let back: SourceFilter = serde_json::from_str(&json).unwrap();
        assert!(!back.uses_index());
        assert_eq!(back.sitecol(), filter.sitecol());
        assert_eq!(back.integration_distance(), filter.integration_distance());
        assert!(!filter.transmitted().uses_index());
    }
}

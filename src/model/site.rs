//! Sites and site collections.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::geo::{Mesh, Point};
use crate::{Error, Result};

/// Stable site identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteId(pub u32);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A location where hazard is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub sid: SiteId,
    pub lon: f64,
    pub lat: f64,
    /// Kilometres below sea level; negative for sites above it.
    #[serde(default)]
    pub depth: f64,
}

impl Site {
    /// A site at sea level.
    pub fn new(sid: u32, lon: f64, lat: f64) -> Self {
        Self { sid: SiteId(sid), lon, lat, depth: 0.0 }
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = depth;
        self
    }

    pub fn at_sea_level(&self) -> bool {
        self.depth == 0.0
    }

    pub fn location(&self) -> Point {
        Point::new(self.lon, self.lat, self.depth)
    }
}

// ============================================================================
// SiteCollection
// ============================================================================

/// The unfiltered origin every view points back to.
#[derive(Debug)]
struct CompleteSites {
    sites: Vec<Site>,
    positions: HashMap<SiteId, usize>,
}

/// An ordered set of sites with unique identifiers.
///
/// A collection is either *complete* (the original set) or a *view* holding
/// positions into the complete set. Views never point at other views:
/// filtering a view yields another view of the same complete collection.
/// Cloning is cheap.
#[derive(Clone)]
pub struct SiteCollection {
    complete: Arc<CompleteSites>,
    /// Ascending positions into `complete.sites`; `None` for the complete set.
    selection: Option<Arc<[usize]>>,
}

impl SiteCollection {
    /// Build a complete collection. Identifiers must be unique.
    pub fn new(sites: Vec<Site>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(sites.len());
        for (i, site) in sites.iter().enumerate() {
            if !site.lon.is_finite() || !site.lat.is_finite() || !site.depth.is_finite() {
                return Err(Error::InvalidSites(format!("site {} has non-finite coordinates", site.sid)));
            }
            if positions.insert(site.sid, i).is_some() {
                return Err(Error::InvalidSites(format!("duplicate site id {}", site.sid)));
            }
        }
        Ok(Self {
            complete: Arc::new(CompleteSites { sites, positions }),
            selection: None,
        })
    }

    /// Sea-level sites numbered 0, 1, 2, ... in the given order.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let sites = points
            .into_iter()
            .enumerate()
            .map(|(i, (lon, lat))| {
                u32::try_from(i)
                    .map(|sid| Site::new(sid, lon, lat))
                    .map_err(|_| Error::InvalidSites("more than u32::MAX sites".into()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(sites)
    }

    pub fn len(&self) -> usize {
        match &self.selection {
            Some(sel) => sel.len(),
            None => self.complete.sites.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> + '_ {
        let all = &self.complete.sites;
        let (view, full) = match &self.selection {
            Some(sel) => (Some(sel.iter().map(move |&i| &all[i])), None),
            None => (None, Some(all.iter())),
        };
        view.into_iter().flatten().chain(full.into_iter().flatten())
    }

    pub fn sids(&self) -> Vec<SiteId> {
        self.iter().map(|s| s.sid).collect()
    }

    pub fn lons(&self) -> Vec<f64> {
        self.iter().map(|s| s.lon).collect()
    }

    pub fn lats(&self) -> Vec<f64> {
        self.iter().map(|s| s.lat).collect()
    }

    pub fn depths(&self) -> Vec<f64> {
        self.iter().map(|s| s.depth).collect()
    }

    /// Coordinates in the form distance computations take.
    pub fn mesh(&self) -> Mesh {
        let points: Vec<Point> = self.iter().map(Site::location).collect();
        Mesh::from_points(&points)
    }

    pub fn contains(&self, sid: SiteId) -> bool {
        match (&self.selection, self.complete.positions.get(&sid)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(sel), Some(pos)) => sel.binary_search(pos).is_ok(),
        }
    }

    pub fn get(&self, sid: SiteId) -> Option<&Site> {
        if !self.contains(sid) {
            return None;
        }
        let pos = self.complete.positions.get(&sid)?;
        self.complete.sites.get(*pos)
    }

    /// True when every site has zero depth.
    pub fn at_sea_level(&self) -> bool {
        self.iter().all(Site::at_sea_level)
    }

    /// The unfiltered collection this one was derived from (itself if complete).
    pub fn complete(&self) -> SiteCollection {
        Self { complete: Arc::clone(&self.complete), selection: None }
    }

    pub fn is_complete(&self) -> bool {
        self.selection.is_none()
    }

    /// True when both collections derive from the same complete collection.
    pub fn same_origin(&self, other: &SiteCollection) -> bool {
        Arc::ptr_eq(&self.complete, &other.complete)
    }

    /// Keep the sites whose mask entry is true.
    ///
    /// Returns the collection itself when every entry is true and `None` when
    /// none is. A mask of the wrong length is an error.
    pub fn filter(&self, mask: &[bool]) -> Result<Option<SiteCollection>> {
        if mask.len() != self.len() {
            return Err(Error::InvalidSites(format!("mask has {} entries for {} sites", mask.len(), self.len())));
        }
        if mask.iter().all(|&keep| keep) {
            return Ok(Some(self.clone()));
        }
        if !mask.iter().any(|&keep| keep) {
            return Ok(None);
        }
        let selection: Arc<[usize]> = match &self.selection {
            Some(sel) => sel.iter().zip(mask).filter(|(_, keep)| **keep).map(|(&i, _)| i).collect(),
            None => mask.iter().enumerate().filter(|(_, keep)| **keep).map(|(i, _)| i).collect(),
        };
        Ok(Some(Self { complete: Arc::clone(&self.complete), selection: Some(selection) }))
    }

    /// View of the complete collection restricted to the given identifiers.
    ///
    /// Returns `None` for an empty identifier list; unknown identifiers are an error.
    pub fn filter_sids(&self, sids: &[SiteId]) -> Result<Option<SiteCollection>> {
        let mut positions = sids
            .iter()
            .map(|sid| {
                self.complete
                    .positions
                    .get(sid)
                    .copied()
                    .ok_or_else(|| Error::InvalidSites(format!("unknown site id {sid}")))
            })
            .collect::<Result<Vec<usize>>>()?;
        if positions.is_empty() {
            return Ok(None);
        }
        positions.sort_unstable();
        positions.dedup();
        if positions.len() == self.complete.sites.len() {
            return Ok(Some(self.complete()));
        }
        Ok(Some(Self {
            complete: Arc::clone(&self.complete),
            selection: Some(positions.into()),
        }))
    }
}

impl fmt::Debug for SiteCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteCollection")
            .field("len", &self.len())
            .field("complete_len", &self.complete.sites.len())
            .finish_non_exhaustive()
    }
}

/// Same sites, regardless of origin.
impl PartialEq for SiteCollection {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

// ============================================================================
// Serialization
// ============================================================================

/// Wire form: the complete site list plus the selected identifiers.
#[derive(Serialize, Deserialize)]
struct SiteCollectionRepr {
    sites: Vec<Site>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selection: Option<Vec<SiteId>>,
}

impl Serialize for SiteCollection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        SiteCollectionRepr {
            sites: self.complete.sites.clone(),
            selection: self.selection.as_ref().map(|_| self.sids()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SiteCollection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = SiteCollectionRepr::deserialize(deserializer)?;
        let complete = SiteCollection::new(repr.sites).map_err(serde::de::Error::custom)?;
        match repr.selection {
            None => Ok(complete),
            Some(sids) => complete
                .filter_sids(&sids)
                .map_err(serde::de::Error::custom)?
                .ok_or_else(|| serde::de::Error::custom("empty site selection")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

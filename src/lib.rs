//! # seismic-filter: Source/Site Distance Filtering
//!
//! Decides which (source, sites) and (rupture, sites) pairs are close enough
//! to matter for a hazard calculation. Nothing here computes ground motion;
//! the crate only narrows site collections.
//!
//! ## Design Principles
//!
//! 1. **Build once, query many**: `SourceFilter` indexes the sites once per
//!    calculation and is then asked about one source at a time
//! 2. **Explicit outcomes**: pruned sources are not yielded, far-away ruptures
//!    come back as `Proximity::FarAway`, never as an empty collection
//! 3. **No hidden mutation**: the site count of a source travels with the
//!    result (`FilteredSource::nsites`), the source is never touched
//! 4. **Transmissible**: a filter crossing a process boundary keeps only its
//!    sites and distance table and falls back to geometric filtering
//!
//! ## Quick Start
//!
//! ```rust
//! use seismic_filter::{
//!     IndexMode, IntegrationDistance, Point, PointSource, Site, SiteCollection, SourceFilter,
//! };
//!
//! # fn example() -> seismic_filter::Result<()> {
//! let sites = SiteCollection::new(vec![
//!     Site::new(0, 0.0, 0.0),
//!     Site::new(1, 1.0, 0.0),
//!     Site::new(2, 10.0, 0.0),
//! ])?;
//! let maxdist = IntegrationDistance::from_json(r#"{"default": 100}"#)?;
//! let filter = SourceFilter::new(Some(sites), maxdist, IndexMode::Auto);
//!
//! let src = PointSource::new("src-1", "Active Shallow Crust", Point::new(0.5, 0.0, 10.0));
//! for item in filter.filter([&src], None) {
//!     let pair = item?;
//!     println!("{} -> {} sites", pair.source.source_id, pair.nsites);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Filtering Strategies
//!
//! | Strategy | Selected by | Description |
//! |----------|-------------|-------------|
//! | Pass-through | no site collection | every source is yielded with the caller's sites |
//! | Unfiltered | empty distance table | sites were filtered upstream |
//! | R-tree | `IndexMode::Auto` + `rtree` feature | box queries against an rstar index |
//! | Flat | `IndexMode::Flat` | box queries by linear scan |
//! | Geometric | `IndexMode::Disabled` / after transmission | each source filters by its own geometry |

// ============================================================================
// Modules
// ============================================================================

pub mod geo;
pub mod model;
pub mod source;
pub mod distance;
pub mod filter;

// ============================================================================
// Re-exports: Geometry and model
// ============================================================================

pub use geo::{BoundingBox, Mesh, Point};
pub use geo::surface::{PlanarSurface, PointSurface, RuptureSurface};
pub use model::{Rupture, Site, SiteCollection, SiteId};

// ============================================================================
// Re-exports: Sources and distances
// ============================================================================

pub use source::{MultiPointSource, PointSource, SeismicSource};
pub use distance::{distance, distance_by_name, DistanceMetric};

// ============================================================================
// Re-exports: Filtering
// ============================================================================

pub use filter::{
    filter_sites_by_distance_to_rupture, FilteredSource, IndexMode, IntegrationDistance,
    MaxDistance, Proximity, Rectangle, SourceFilter, SourceSites,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown distance measure '{0}'")]
    UnsupportedDistance(String),

    #[error("No integration distance for tectonic region type '{trt}' and no 'default' entry")]
    MissingRegionType { trt: String },

    #[error("Invalid integration distance for '{trt}': {message}")]
    InvalidDistanceTable { trt: String, message: String },

    #[error("Invalid site collection: {0}")]
    InvalidSites(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An error raised while filtering a source, tagged with the source id.
    #[error("An error occurred with source id={source_id}. Error: {error}")]
    Source {
        source_id: String,
        #[source]
        error: Box<Error>,
    },
}

/// Failure category of an [`Error`], stable across source tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedDistance,
    MissingRegionType,
    InvalidDistanceTable,
    InvalidSites,
    Geometry,
    Serialization,
}

impl Error {
    /// The category of the failure. A source-tagged error reports the
    /// category of the error it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedDistance(_) => ErrorKind::UnsupportedDistance,
            Error::MissingRegionType { .. } => ErrorKind::MissingRegionType,
            Error::InvalidDistanceTable { .. } => ErrorKind::InvalidDistanceTable,
            Error::InvalidSites(_) => ErrorKind::InvalidSites,
            Error::Geometry(_) => ErrorKind::Geometry,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Source { error, .. } => error.kind(),
        }
    }

    /// Prefix the message with the id of the source being filtered.
    pub fn with_source_id(self, source_id: impl Into<String>) -> Self {
        Error::Source {
            source_id: source_id.into(),
            error: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! # Filtering
//!
//! | Module | Question answered |
//! |--------|-------------------|
//! | `integration` | how far from a source or rupture can a site matter? |
//! | `index` | which sites fall inside a box? |
//! | `source_filter` | which sites does each source affect? |
//! | `rupture` | which sites does one rupture affect? |

pub mod index;
pub mod integration;
pub mod rupture;
pub mod source_filter;

pub use index::{FlatIndex, SpatialIndex};
#[cfg(feature = "rtree")]
pub use index::RTreeIndex;
pub use integration::{IntegrationDistance, MaxDistance, Proximity, DEFAULT_REGION};
pub use rupture::filter_sites_by_distance_to_rupture;
pub use source_filter::{FilteredSource, IndexMode, Rectangle, SourceFilter, SourceSites};

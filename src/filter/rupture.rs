//! Rupture-level site filtering by Joyner-Boore distance.

use tracing::trace;

use crate::model::{Rupture, SiteCollection};
use crate::Result;

/// Sites whose Joyner-Boore distance to `rupture` is at most `max_distance` km.
///
/// `None` when no site is that close. The result shares the complete
/// collection of `sites`. A surface that returns one distance per site
/// never fails.
pub fn filter_sites_by_distance_to_rupture(
    rupture: &Rupture,
    max_distance: f64,
    sites: &SiteCollection,
) -> Result<Option<SiteCollection>> {
    if sites.is_empty() {
        return Ok(None);
    }
    let jb = rupture.surface.joyner_boore_distance(&sites.mesh());
    let mask: Vec<bool> = jb.iter().map(|&d| d <= max_distance).collect();
    let close = sites.filter(&mask)?;
    if close.is_none() {
        trace!(mag = rupture.mag, max_distance, "no site within Joyner-Boore distance");
    }
    Ok(close)
}

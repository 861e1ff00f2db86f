//! # Hazard Model DTOs
//!
//! Sites and ruptures: the data every filter reads.
//! These types cross every boundary, including process boundaries, so
//! everything but `Rupture` is serde-serializable.
//!
//! Design rule: no index types and no filtering policy here.

pub mod site;
pub mod rupture;

pub use site::{Site, SiteCollection, SiteId};
pub use rupture::Rupture;

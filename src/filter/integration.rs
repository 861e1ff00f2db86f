//! Maximum integration distance per tectonic region type.
//!
//! A region type maps either to a fixed distance or to a table of
//! `(magnitude, distance)` pairs interpolated linearly in magnitude.
//! Magnitudes outside the table are extrapolated from the end segments.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::distance::{distance, DistanceMetric};
use crate::model::{Rupture, SiteCollection};
use crate::{Error, Result};

/// Key consulted when a region type has no entry of its own.
pub const DEFAULT_REGION: &str = "default";

// ============================================================================
// MaxDistance
// ============================================================================

/// Distance cutoff for one region type, in km.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxDistance {
    Scalar(f64),
    /// `(magnitude, distance)` pairs, ascending in magnitude once validated.
    ByMagnitude(Vec<(f64, f64)>),
}

impl From<f64> for MaxDistance {
    fn from(km: f64) -> Self {
        MaxDistance::Scalar(km)
    }
}

impl From<Vec<(f64, f64)>> for MaxDistance {
    fn from(pairs: Vec<(f64, f64)>) -> Self {
        MaxDistance::ByMagnitude(pairs)
    }
}

impl fmt::Display for MaxDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxDistance::Scalar(km) => write!(f, "{km}"),
            MaxDistance::ByMagnitude(pairs) => {
                f.write_str("[")?;
                for (i, (mag, km)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({mag}, {km})")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Sort and check one entry.
fn validate(trt: &str, value: MaxDistance) -> Result<MaxDistance> {
    let invalid = |message: String| Error::InvalidDistanceTable { trt: trt.to_string(), message };
    match value {
        MaxDistance::Scalar(km) => {
            if !km.is_finite() || km < 0.0 {
                return Err(invalid(format!("distance must be finite and non-negative, got {km}")));
            }
            Ok(MaxDistance::Scalar(km))
        }
        MaxDistance::ByMagnitude(mut pairs) => {
            if pairs.is_empty() {
                return Err(invalid("empty magnitude/distance list".into()));
            }
            for &(mag, km) in &pairs {
                if !mag.is_finite() || !km.is_finite() || km < 0.0 {
                    return Err(invalid(format!("bad pair ({mag}, {km})")));
                }
            }
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
                return Err(invalid(format!("magnitude {} listed twice", w[0].0)));
            }
            Ok(MaxDistance::ByMagnitude(pairs))
        }
    }
}

// ============================================================================
// Interpolator
// ============================================================================

/// Piecewise-linear function of magnitude, extended linearly past both ends.
#[derive(Debug, Clone, PartialEq)]
struct Interpolator {
    mags: Vec<f64>,
    dists: Vec<f64>,
}

impl Interpolator {
    fn new(pairs: &[(f64, f64)]) -> Self {
        Self {
            mags: pairs.iter().map(|p| p.0).collect(),
            dists: pairs.iter().map(|p| p.1).collect(),
        }
    }

    fn at(&self, mag: f64) -> f64 {
        let n = self.mags.len();
        if n == 1 {
            return self.dists[0];
        }
        // segment whose left end is the last knot <= mag, clamped to [0, n - 2]
        let seg = self.mags.partition_point(|&m| m <= mag).saturating_sub(1).min(n - 2);
        let (m0, m1) = (self.mags[seg], self.mags[seg + 1]);
        let (d0, d1) = (self.dists[seg], self.dists[seg + 1]);
        d0 + (mag - m0) * (d1 - d0) / (m1 - m0)
    }
}

// ============================================================================
// IntegrationDistance
// ============================================================================

/// Region type → maximum distance table.
///
/// The table is the whole state: interpolators are built in the constructor
/// and rebuilt after deserialization, never on lookup.
///
/// ```rust
/// use seismic_filter::IntegrationDistance;
///
/// let maxdist = IntegrationDistance::from_json(
///     r#"{"default": [[5, 100], [7, 300]], "Stable Continental": 250}"#,
/// ).unwrap();
/// assert_eq!(maxdist.get("Active Shallow Crust", Some(6.0)).unwrap(), 200.0);
/// assert_eq!(maxdist.get("Stable Continental", Some(6.0)).unwrap(), 250.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, MaxDistance>", into = "BTreeMap<String, MaxDistance>")]
pub struct IntegrationDistance {
    table: BTreeMap<String, MaxDistance>,
    interpolators: HashMap<String, Interpolator>,
}

impl IntegrationDistance {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<MaxDistance>,
    {
        let mut table = BTreeMap::new();
        let mut interpolators = HashMap::new();
        for (trt, value) in entries {
            let trt = trt.into();
            let value = validate(&trt, value.into())?;
            if let MaxDistance::ByMagnitude(pairs) = &value {
                interpolators.insert(trt.clone(), Interpolator::new(pairs));
            } else {
                interpolators.remove(&trt);
            }
            table.insert(trt, value);
        }
        Ok(Self { table, interpolators })
    }

    /// Same distance for every region type.
    pub fn scalar(km: f64) -> Result<Self> {
        Self::new([(DEFAULT_REGION, km)])
    }

    /// Parse a JSON object such as `{"default": [[5, 100], [7, 300]]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn lookup(&self, trt: &str) -> Result<(&str, &MaxDistance)> {
        self.table
            .get_key_value(trt)
            .or_else(|| self.table.get_key_value(DEFAULT_REGION))
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| Error::MissingRegionType { trt: trt.to_string() })
    }

    /// Maximum distance for `trt`, falling back to the `"default"` entry.
    ///
    /// Without a magnitude a tabulated entry yields the distance at its
    /// largest magnitude.
    pub fn get(&self, trt: &str, mag: Option<f64>) -> Result<f64> {
        let (key, value) = self.lookup(trt)?;
        match (value, mag) {
            (MaxDistance::Scalar(km), _) => Ok(*km),
            (MaxDistance::ByMagnitude(pairs), None) => pairs
                .last()
                .map(|p| p.1)
                .ok_or_else(|| Error::InvalidDistanceTable { trt: key.to_string(), message: "empty".into() }),
            (MaxDistance::ByMagnitude(_), Some(mag)) => self
                .interpolators
                .get(key)
                .map(|interp| interp.at(mag))
                .ok_or_else(|| Error::InvalidDistanceTable {
                    trt: key.to_string(),
                    message: "missing interpolator".into(),
                }),
        }
    }

    /// Sites within range of `rupture` together with their distances.
    ///
    /// An empty table applies no threshold. The cutoff is taken at the
    /// rupture's region type and magnitude.
    pub fn get_closest(
        &self,
        sites: &SiteCollection,
        rupture: &Rupture,
        metric: DistanceMetric,
    ) -> Result<Proximity> {
        let distances = distance(rupture, &sites.mesh(), metric)?;
        if self.is_empty() {
            return Ok(Proximity::Close { sites: sites.clone(), distances });
        }
        let maxdist = self.get(&rupture.tectonic_region_type, Some(rupture.mag))?;
        let mask: Vec<bool> = distances.iter().map(|&d| d <= maxdist).collect();
        if !mask.iter().any(|&keep| keep) {
            trace!(mag = rupture.mag, maxdist, %metric, "rupture far away from every site");
            return Ok(Proximity::FarAway);
        }
        let Some(close) = sites.filter(&mask)? else {
            return Ok(Proximity::FarAway);
        };
        let distances = distances.into_iter().zip(&mask).filter(|(_, keep)| **keep).map(|(d, _)| d).collect();
        Ok(Proximity::Close { sites: close, distances })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// True when `trt` has its own entry (the default fallback is not consulted).
    pub fn contains(&self, trt: &str) -> bool {
        self.table.contains_key(trt)
    }

    pub fn entry(&self, trt: &str) -> Option<&MaxDistance> {
        self.table.get(trt)
    }

    pub fn region_types(&self) -> impl Iterator<Item = &str> + '_ {
        self.table.keys().map(String::as_str)
    }
}

impl PartialEq for IntegrationDistance {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl TryFrom<BTreeMap<String, MaxDistance>> for IntegrationDistance {
    type Error = Error;

    fn try_from(table: BTreeMap<String, MaxDistance>) -> Result<Self> {
        Self::new(table)
    }
}

impl From<IntegrationDistance> for BTreeMap<String, MaxDistance> {
    fn from(maxdist: IntegrationDistance) -> Self {
        maxdist.table
    }
}

impl fmt::Display for IntegrationDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (trt, value)) in self.table.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{trt}': {value}")?;
        }
        f.write_str("}")
    }
}

// ============================================================================
// Proximity
// ============================================================================

/// Outcome of [`IntegrationDistance::get_closest`].
#[derive(Debug, Clone, PartialEq)]
pub enum Proximity {
    /// Sites within range and their distances, aligned.
    Close { sites: SiteCollection, distances: Vec<f64> },
    /// No site within range; the rupture can be skipped.
    FarAway,
}

impl Proximity {
    pub fn is_far_away(&self) -> bool {
        matches!(self, Proximity::FarAway)
    }

    pub fn into_option(self) -> Option<(SiteCollection, Vec<f64>)> {
        match self {
            Proximity::Close { sites, distances } => Some((sites, distances)),
            Proximity::FarAway => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::surface::PointSurface;
    use crate::geo::Point;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn table() -> IntegrationDistance {
        IntegrationDistance::new([
            ("default", MaxDistance::from(vec![(7.0, 300.0), (5.0, 100.0)])),
            ("Stable Continental", MaxDistance::from(250.0)),
        ])
        .unwrap()
    }

    #[test]
    fn scalar_ignores_magnitude() {
        let t = table();
        assert_eq!(t.get("Stable Continental", None).unwrap(), 250.0);
        assert_eq!(t.get("Stable Continental", Some(9.0)).unwrap(), 250.0);
    }

    #[test]
    fn tabulated_entry_is_sorted_and_interpolated() {
        let t = table();
        assert_eq!(t.entry("default"), Some(&MaxDistance::ByMagnitude(vec![(5.0, 100.0), (7.0, 300.0)])));
        assert_eq!(t.get("default", Some(6.0)).unwrap(), 200.0);
        assert_eq!(t.get("default", Some(5.0)).unwrap(), 100.0);
        assert_eq!(t.get("default", None).unwrap(), 300.0);
    }

    #[test]
    fn magnitudes_outside_the_table_are_extrapolated() {
        let t = table();
        assert_eq!(t.get("default", Some(8.0)).unwrap(), 400.0);
        assert_eq!(t.get("default", Some(4.5)).unwrap(), 50.0);
    }

    #[test]
    fn single_pair_is_constant() {
        let t = IntegrationDistance::new([("default", vec![(6.0, 120.0)])]).unwrap();
        assert_eq!(t.get("x", Some(3.0)).unwrap(), 120.0);
        assert_eq!(t.get("x", Some(9.0)).unwrap(), 120.0);
    }

    #[test]
    fn unknown_region_falls_back_to_default() {
        let t = table();
        assert!(!t.contains("Subduction Interface"));
        assert_eq!(t.get("Subduction Interface", Some(7.0)).unwrap(), 300.0);
    }

    #[test]
    fn missing_region_without_default_fails() {
        let t = IntegrationDistance::new([("Active Shallow Crust", 200.0)]).unwrap();
        let err = t.get("Volcanic", None).unwrap_err();
        assert_eq!(err, Error::MissingRegionType { trt: "Volcanic".into() });
    }

    #[test]
    fn invalid_entries_are_rejected() {
        let dup = IntegrationDistance::new([("default", vec![(5.0, 100.0), (5.0, 200.0)])]);
        assert!(matches!(dup, Err(Error::InvalidDistanceTable { .. })));
        let empty = IntegrationDistance::new([("default", Vec::<(f64, f64)>::new())]);
        assert!(matches!(empty, Err(Error::InvalidDistanceTable { .. })));
        assert!(IntegrationDistance::scalar(-1.0).is_err());
        assert!(IntegrationDistance::scalar(f64::INFINITY).is_err());
    }

    #[test]
    fn json_accepts_integers_and_pairs() {
        let t = IntegrationDistance::from_json(r#"{"default": [[5, 100], [7, 300]], "Volcanic": 80}"#).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.region_types().collect::<Vec<_>>(), vec!["Volcanic", "default"]);
        assert_eq!(t.get("Volcanic", None).unwrap(), 80.0);
        assert!(IntegrationDistance::from_json(r#"{"default": "far"}"#).is_err());
    }

    #[test]
    fn serde_round_trip_rebuilds_interpolators() {
        let json = serde_json::to_string(&table()).unwrap();
        let back: IntegrationDistance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table());
        assert_eq!(back.get("default", Some(6.5)).unwrap(), 250.0);
    }

    #[test]
    fn display_lists_the_table() {
        assert_eq!(
            table().to_string(),
            "{'Stable Continental': 250, 'default': [(5, 100), (7, 300)]}"
        );
    }

    fn rupture_at(lon: f64, mag: f64) -> Rupture {
        let hypo = Point::new(lon, 0.0, 0.0);
        Rupture::new(mag, "Active Shallow Crust", hypo, PointSurface::new(hypo, 0.0))
    }

    #[test]
    fn get_closest_narrows_sites() {
        let sites = SiteCollection::from_points([(0.0, 0.0), (0.5, 0.0), (3.0, 0.0)]).unwrap();
        let t = IntegrationDistance::scalar(100.0).unwrap();
        let (close, dists) = t
            .get_closest(&sites, &rupture_at(0.0, 6.0), DistanceMetric::Rjb)
            .unwrap()
            .into_option()
            .unwrap();
        assert_eq!(close.len(), 2);
        assert_eq!(dists.len(), 2);
        assert!(dists[0].abs() < 1e-9);
        assert!(close.same_origin(&sites));
    }

    proptest! {
        #[test]
        fn interpolation_is_monotonic(
            steps in prop::collection::vec((0.1f64..2.0, 0.0f64..100.0), 1..6),
            a in -5.0f64..15.0,
            b in -5.0f64..15.0,
        ) {
            let mut mag = 4.0;
            let mut km = 10.0;
            let mut pairs = vec![(mag, km)];
            for (dm, dk) in steps {
                mag += dm;
                km += dk;
                pairs.push((mag, km));
            }
            let t = IntegrationDistance::new([("default", pairs)]).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let d_lo = t.get("any", Some(lo)).unwrap();
            let d_hi = t.get("any", Some(hi)).unwrap();
            prop_assert!(d_lo <= d_hi + 1e-9, "{lo} -> {d_lo}, {hi} -> {d_hi}");
        }
    }
}

//! End-to-end tests for rupture-level filtering.
//!
//! Sources are filtered against sites first, then their ruptures are
//! checked against the surviving sites with `get_closest` and the
//! Joyner-Boore filter.

use pretty_assertions::assert_eq;
use seismic_filter::geo::DEGREES_TO_KM;
use seismic_filter::{
    distance, filter_sites_by_distance_to_rupture, DistanceMetric, IndexMode, IntegrationDistance,
    PlanarSurface, Point, PointSource, PointSurface, Proximity, Rupture, SiteCollection, SiteId,
    SourceFilter,
};

fn point_rupture(lon: f64, mag: f64, trt: &str) -> Rupture {
    let hypo = Point::new(lon, 0.0, 10.0);
    Rupture::new(mag, trt, hypo, PointSurface::new(hypo, 0.0))
}

// ============================================================================
// 1. Far-away ruptures are reported, not returned empty
// ============================================================================

#[test]
fn test_site_500_km_away_is_far() {
    let sites = SiteCollection::from_points([(500.0 / DEGREES_TO_KM, 0.0)]).unwrap();
    let maxdist = IntegrationDistance::scalar(50.0).unwrap();
    let rup = point_rupture(0.0, 6.0, "Active Shallow Crust");

    let got = maxdist.get_closest(&sites, &rup, DistanceMetric::Rrup).unwrap();
    assert_eq!(got, Proximity::FarAway);
    assert!(got.is_far_away());
    assert!(got.into_option().is_none());
}

#[test]
fn test_magnitude_widens_the_threshold() {
    let sites = SiteCollection::from_points([(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).unwrap();
    let maxdist = IntegrationDistance::from_json(r#"{"default": [[5, 50], [7, 250]]}"#).unwrap();

    let small = point_rupture(0.0, 5.0, "Active Shallow Crust");
    let (close, _) = maxdist.get_closest(&sites, &small, DistanceMetric::Repi).unwrap().into_option().unwrap();
    assert_eq!(close.sids(), vec![SiteId(0)]);

    let large = point_rupture(0.0, 7.0, "Active Shallow Crust");
    let (close, dists) = maxdist.get_closest(&sites, &large, DistanceMetric::Repi).unwrap().into_option().unwrap();
    assert_eq!(close.sids(), vec![SiteId(0), SiteId(1), SiteId(2)]);
    assert_eq!(dists.len(), 3);
}

// ============================================================================
// 2. An empty table applies no threshold
// ============================================================================

#[test]
fn test_empty_table_returns_every_site_and_distance() {
    let sites = SiteCollection::from_points([(0.0, 0.0), (45.0, 10.0), (-120.0, -30.0)]).unwrap();
    let rup = point_rupture(0.0, 4.0, "Active Shallow Crust");
    for metric in [DistanceMetric::Rrup, DistanceMetric::Rjb, DistanceMetric::Rhypo, DistanceMetric::Azimuth] {
        let expected = distance(&rup, &sites.mesh(), metric).unwrap();
        let got = IntegrationDistance::default().get_closest(&sites, &rup, metric).unwrap();
        assert_eq!(got, Proximity::Close { sites: sites.clone(), distances: expected });
    }
}

// ============================================================================
// 3. Region types without an entry use the default
// ============================================================================

#[test]
fn test_default_entry_serves_other_region_types() {
    let maxdist = IntegrationDistance::from_json(r#"{"default": 100, "Stable Continental": 300}"#).unwrap();
    let sites = SiteCollection::from_points([(1.5, 0.0)]).unwrap();

    for trt in ["Active Shallow Crust", "Subduction Interface", "Volcanic"] {
        assert_eq!(maxdist.get(trt, Some(6.0)).unwrap(), 100.0);
        let rup = point_rupture(0.0, 6.0, trt);
        assert!(maxdist.get_closest(&sites, &rup, DistanceMetric::Rjb).unwrap().is_far_away());
    }
    let rup = point_rupture(0.0, 6.0, "Stable Continental");
    assert!(!maxdist.get_closest(&sites, &rup, DistanceMetric::Rjb).unwrap().is_far_away());
}

// ============================================================================
// 4. Unknown metric names fail
// ============================================================================

#[test]
fn test_unknown_metric_name() {
    let err = "rclosest".parse::<DistanceMetric>().unwrap_err();
    assert_eq!(err.to_string(), "Unknown distance measure 'rclosest'");
}

// ============================================================================
// 5. Source → sites → ruptures → sites
// ============================================================================

#[test]
fn test_full_chain() {
    let sites = SiteCollection::from_points((0..11).map(|i| (i as f64 * 0.25, 0.0))).unwrap();
    let maxdist = IntegrationDistance::from_json(r#"{"default": [[5, 20], [7, 120]]}"#).unwrap();
    let filter = SourceFilter::new(Some(sites.clone()), maxdist.clone(), IndexMode::Auto);

    let src = PointSource::new("chain", "Active Shallow Crust", Point::new(0.0, 0.0, 5.0))
        .with_magnitudes([5.0, 6.0, 7.0]);
    let pair = filter.filter([&src], None).next().unwrap().unwrap();
    assert_eq!(pair.nsites, 5);

    let counts: Vec<usize> = pair
        .source
        .iter_ruptures()
        .map(|rup| match maxdist.get_closest(&pair.sites, &rup, DistanceMetric::Rjb).unwrap() {
            Proximity::Close { sites, .. } => sites.len(),
            Proximity::FarAway => 0,
        })
        .collect();
    // 20 km, 70 km and 120 km around the origin, sites every ~27.8 km
    assert_eq!(counts, vec![1, 3, 5]);
}

// ============================================================================
// 6. Joyner-Boore filter on a finite fault
// ============================================================================

#[test]
fn test_joyner_boore_filter_on_planar_fault() {
    // 45 degree dip, 20 km wide: surface projection about 14.1 km south of the trace
    let surface = PlanarSurface::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), 45.0, 20.0).unwrap();
    let rup = Rupture::new(7.0, "Active Shallow Crust", Point::new(0.5, -0.05, 7.0), surface);
    let sites = SiteCollection::from_points([(0.5, -0.1), (0.5, 0.1), (0.5, -0.5), (3.0, 0.0)]).unwrap();

    let close = filter_sites_by_distance_to_rupture(&rup, 15.0, &sites).unwrap().unwrap();
    assert_eq!(close.sids(), vec![SiteId(0), SiteId(1)]);
    assert!(filter_sites_by_distance_to_rupture(&rup, 15.0, &close).unwrap().is_some());
    let far = sites.filter(&[false, false, false, true]).unwrap().unwrap();
    assert!(filter_sites_by_distance_to_rupture(&rup, 1.0, &far).unwrap().is_none());
}

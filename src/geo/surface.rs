//! # Rupture Surfaces
//!
//! The distance metrics ground-motion models are written against:
//!
//! | Metric | Method | Meaning |
//! |--------|--------|---------|
//! | rrup | `min_distance` | closest distance to the rupture plane |
//! | rjb | `joyner_boore_distance` | closest distance to its surface projection |
//! | rx | `rx_distance` | signed distance perpendicular to strike, positive on the hanging wall |
//! | ry0 | `ry0_distance` | distance along strike beyond the rupture ends |
//! | azimuth | `azimuth` | site bearing measured clockwise from strike |
//!
//! `PlanarSurface` works in a local equirectangular projection centred on
//! its first top-edge corner, which is accurate at the few-hundred-km scale
//! filtering cares about.

use std::fmt;

use super::{azimuth, longitudinal_extent, point_at, spherical_bounding_box, BoundingBox, Mesh, Point, DEGREES_TO_KM};
use crate::{Error, Result};

/// Geometry of a rupture as seen by distance computations.
pub trait RuptureSurface: fmt::Debug + Send + Sync {
    /// Strike in degrees clockwise from north.
    fn strike(&self) -> f64;

    /// Lon/lat box of the surface corners.
    fn bounding_box(&self) -> Result<BoundingBox>;

    /// rrup: closest 3D distance from each mesh point to the surface.
    fn min_distance(&self, mesh: &Mesh) -> Vec<f64>;

    /// rjb: closest distance to the surface projection.
    fn joyner_boore_distance(&self, mesh: &Mesh) -> Vec<f64>;

    /// rx: signed horizontal distance from the top edge, perpendicular to strike.
    fn rx_distance(&self, mesh: &Mesh) -> Vec<f64>;

    /// ry0: horizontal distance along strike beyond the ends of the top edge.
    fn ry0_distance(&self, mesh: &Mesh) -> Vec<f64>;

    /// Bearing of each mesh point relative to strike, degrees in [0, 360).
    fn azimuth(&self, mesh: &Mesh) -> Vec<f64>;

    /// Directivity predictor for a rupture nucleating at `hypocenter` with
    /// the given slip direction (degrees in the fault plane, 0 along strike).
    ///
    /// Not every surface supports directivity; the default is an error.
    fn directivity_predictor(
        &self,
        _hypocenter: &Point,
        _slip_direction: f64,
        _mesh: &Mesh,
    ) -> Result<Vec<f64>> {
        Err(Error::Geometry(format!("{self:?} does not support directivity predictors")))
    }
}

// ============================================================================
// PointSurface
// ============================================================================

/// A rupture collapsed onto its hypocentre, oriented by a strike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSurface {
    pub location: Point,
    pub strike: f64,
}

impl PointSurface {
    pub fn new(location: Point, strike: f64) -> Self {
        Self { location, strike }
    }

    fn relative_bearings<'a>(&'a self, mesh: &'a Mesh) -> impl Iterator<Item = (f64, f64)> + 'a {
        mesh.iter().map(move |p| {
            let repi = self.location.epicentral_distance(&p);
            let theta = (self.location.azimuth(&p) - self.strike).to_radians();
            (repi, theta)
        })
    }
}

impl RuptureSurface for PointSurface {
    fn strike(&self) -> f64 {
        self.strike
    }

    fn bounding_box(&self) -> Result<BoundingBox> {
        Ok(BoundingBox::from_point(self.location.lon, self.location.lat))
    }

    fn min_distance(&self, mesh: &Mesh) -> Vec<f64> {
        self.location.distance_to_mesh(mesh, true)
    }

    fn joyner_boore_distance(&self, mesh: &Mesh) -> Vec<f64> {
        self.location.distance_to_mesh(mesh, false)
    }

    fn rx_distance(&self, mesh: &Mesh) -> Vec<f64> {
        self.relative_bearings(mesh).map(|(repi, theta)| repi * theta.sin()).collect()
    }

    fn ry0_distance(&self, mesh: &Mesh) -> Vec<f64> {
        self.relative_bearings(mesh).map(|(repi, theta)| (repi * theta.cos()).abs()).collect()
    }

    fn azimuth(&self, mesh: &Mesh) -> Vec<f64> {
        mesh.iter()
            .map(|p| (self.location.azimuth(&p) - self.strike).rem_euclid(360.0))
            .collect()
    }

    /// A point has no extent to propagate along: zero everywhere.
    fn directivity_predictor(&self, _hypocenter: &Point, _slip: f64, mesh: &Mesh) -> Result<Vec<f64>> {
        Ok(vec![0.0; mesh.len()])
    }
}

// ============================================================================
// PlanarSurface
// ============================================================================

/// A rectangular fault plane hanging from a straight top edge.
///
/// The plane dips to the right of strike (Aki & Richards convention).
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarSurface {
    /// top-left, top-right, bottom-right, bottom-left
    corners: [Point; 4],
    strike: f64,
    dip: f64,
    length: f64,
    width: f64,
    /// Unit along-strike vector (east, north).
    along: (f64, f64),
    /// Unit horizontal down-dip vector (east, north).
    across: (f64, f64),
    cos_lat0: f64,
}

impl PlanarSurface {
    /// Build from the two ends of the top edge, a dip (degrees, (0, 90])
    /// and a down-dip width in km. Both top points share the first one's depth.
    pub fn new(top_left: Point, top_right: Point, dip: f64, width: f64) -> Result<Self> {
        if !(dip > 0.0 && dip <= 90.0) {
            return Err(Error::Geometry(format!("dip must be in (0, 90], got {dip}")));
        }
        if !(width >= 0.0 && width.is_finite()) {
            return Err(Error::Geometry(format!("width must be a finite non-negative number, got {width}")));
        }
        let cos_lat0 = top_left.lat.to_radians().cos();
        let x = longitudinal_extent(top_left.lon, top_right.lon) * cos_lat0 * DEGREES_TO_KM;
        let y = (top_right.lat - top_left.lat) * DEGREES_TO_KM;
        let length = x.hypot(y);
        if length == 0.0 {
            return Err(Error::Geometry("top edge has zero length".into()));
        }
        let along = (x / length, y / length);
        let across = (along.1, -along.0);
        let strike = x.atan2(y).to_degrees().rem_euclid(360.0);

        let ztop = top_left.depth;
        let horizontal = width * dip.to_radians().cos();
        let zbot = ztop + width * dip.to_radians().sin();
        let top_right = Point::new(top_right.lon, top_right.lat, ztop);
        let bottom = |p: &Point| {
            let (lon, lat) = point_at(p.lon, p.lat, strike + 90.0, horizontal);
            Point::new(lon, lat, zbot)
        };
        let corners = [top_left, top_right, bottom(&top_right), bottom(&top_left)];

        Ok(Self { corners, strike, dip, length, width, along, across, cos_lat0 })
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    pub fn dip(&self) -> f64 {
        self.dip
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Mesh point in plane coordinates: (along strike, horizontal down-dip, depth below top).
    fn local(&self, p: &Point) -> (f64, f64, f64) {
        let origin = &self.corners[0];
        let x = longitudinal_extent(origin.lon, p.lon) * self.cos_lat0 * DEGREES_TO_KM;
        let y = (p.lat - origin.lat) * DEGREES_TO_KM;
        let pa = x * self.along.0 + y * self.along.1;
        let pv = x * self.across.0 + y * self.across.1;
        (pa, pv, p.depth - origin.depth)
    }

    fn beyond_ends(&self, pa: f64) -> f64 {
        (-pa).max(pa - self.length).max(0.0)
    }

    fn top_center(&self) -> Point {
        let [tl, tr, ..] = &self.corners;
        let (lon, lat) = point_at(tl.lon, tl.lat, self.strike, self.length / 2.0);
        Point::new(lon, lat, (tl.depth + tr.depth) / 2.0)
    }
}

impl RuptureSurface for PlanarSurface {
    fn strike(&self) -> f64 {
        self.strike
    }

    fn bounding_box(&self) -> Result<BoundingBox> {
        let lons: Vec<f64> = self.corners.iter().map(|p| p.lon).collect();
        let lats: Vec<f64> = self.corners.iter().map(|p| p.lat).collect();
        spherical_bounding_box(&lons, &lats)
    }

    fn min_distance(&self, mesh: &Mesh) -> Vec<f64> {
        let (sin_dip, cos_dip) = self.dip.to_radians().sin_cos();
        mesh.iter()
            .map(|p| {
                let (pa, pv, dz) = self.local(&p);
                let a = pa.clamp(0.0, self.length);
                let b = (pv * cos_dip + dz * sin_dip).clamp(0.0, self.width);
                let ex = pa - a;
                let ev = pv - b * cos_dip;
                let ez = dz - b * sin_dip;
                (ex * ex + ev * ev + ez * ez).sqrt()
            })
            .collect()
    }

    fn joyner_boore_distance(&self, mesh: &Mesh) -> Vec<f64> {
        let projected_width = self.width * self.dip.to_radians().cos();
        mesh.iter()
            .map(|p| {
                let (pa, pv, _) = self.local(&p);
                let dv = (-pv).max(pv - projected_width).max(0.0);
                self.beyond_ends(pa).hypot(dv)
            })
            .collect()
    }

    fn rx_distance(&self, mesh: &Mesh) -> Vec<f64> {
        mesh.iter().map(|p| self.local(&p).1).collect()
    }

    fn ry0_distance(&self, mesh: &Mesh) -> Vec<f64> {
        mesh.iter().map(|p| self.beyond_ends(self.local(&p).0)).collect()
    }

    fn azimuth(&self, mesh: &Mesh) -> Vec<f64> {
        let center = self.top_center();
        mesh.iter()
            .map(|p| (azimuth(center.lon, center.lat, p.lon, p.lat) - self.strike).rem_euclid(360.0))
            .collect()
    }

    /// Somerville-style `X cos(theta)`: `X` is the fraction of the rupture
    /// length between the hypocentre and the site's along-strike position,
    /// `theta` the angle between the propagation direction and the
    /// epicentre-to-site bearing. Scaled by the strike-parallel part of slip.
    fn directivity_predictor(&self, hypocenter: &Point, slip_direction: f64, mesh: &Mesh) -> Result<Vec<f64>> {
        let (ha, _, _) = self.local(hypocenter);
        let slip_along = slip_direction.to_radians().cos().abs();
        Ok(mesh
            .iter()
            .map(|p| {
                let (pa, _, _) = self.local(&p);
                let s = pa.clamp(0.0, self.length) - ha.clamp(0.0, self.length);
                let heading = if s >= 0.0 { self.strike } else { self.strike + 180.0 };
                let theta = (hypocenter.azimuth(&p) - heading).to_radians();
                let x = s.abs() / self.length;
                if hypocenter.epicentral_distance(&p) == 0.0 {
                    0.0
                } else {
                    x * theta.cos() * slip_along
                }
            })
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    /// 0.9 degree east-striking vertical fault from (0, 0) to (0.9, 0), 10 km wide.
    fn vertical_fault() -> PlanarSurface {
        PlanarSurface::new(Point::new(0.0, 0.0, 0.0), Point::new(0.9, 0.0, 0.0), 90.0, 10.0).unwrap()
    }

    #[test]
    fn planar_geometry() {
        let surface = vertical_fault();
        assert!(close(surface.strike(), 90.0, 1e-9));
        assert!(close(surface.length(), 0.9 * DEGREES_TO_KM, 1e-9));
        let bottom = surface.corners()[2];
        assert!(close(bottom.depth, 10.0, 1e-9));
        assert!(close(bottom.lon, 0.9, 1e-6));
    }

    #[test]
    fn planar_distances_beside_the_fault() {
        let surface = vertical_fault();
        // 0.5 degree north of the fault midpoint
        let mesh = Mesh::from_points(&[Point::surface(0.45, 0.5)]);
        let off = 0.5 * DEGREES_TO_KM;

        assert!(close(surface.joyner_boore_distance(&mesh)[0], off, 1e-6));
        assert!(close(surface.min_distance(&mesh)[0], off, 1e-6));
        assert!(close(surface.ry0_distance(&mesh)[0], 0.0, 1e-9));
        // north is to the left of an east strike: footwall side
        assert!(close(surface.rx_distance(&mesh)[0], -off, 1e-6));
        assert!(close(surface.azimuth(&mesh)[0], 270.0, 1e-3));
    }

    #[test]
    fn planar_distances_past_the_end() {
        let surface = vertical_fault();
        let mesh = Mesh::from_points(&[Point::surface(1.4, 0.0)]);
        let beyond = 0.5 * DEGREES_TO_KM;
        assert!(close(surface.ry0_distance(&mesh)[0], beyond, 1e-6));
        assert!(close(surface.joyner_boore_distance(&mesh)[0], beyond, 1e-6));
        assert!(close(surface.rx_distance(&mesh)[0], 0.0, 1e-9));
    }

    #[test]
    fn dipping_plane_hanging_wall() {
        // 45 degree dip, buried 2 km: rjb is zero above the plane, rrup is not
        let surface = PlanarSurface::new(
            Point::new(0.0, 0.0, 2.0),
            Point::new(0.5, 0.0, 2.0),
            45.0,
            20.0,
        )
        .unwrap();
        // hanging wall is south of an east strike; 5 km south of the trace
        let (lon, lat) = point_at(0.25, 0.0, 180.0, 5.0);
        let mesh = Mesh::from_points(&[Point::surface(lon, lat)]);
        assert!(close(surface.joyner_boore_distance(&mesh)[0], 0.0, 1e-9));
        assert!(close(surface.rx_distance(&mesh)[0], 5.0, 1e-6));
        // distance from (5, 0) to the line z = x + 2 in the dip section
        let expected = (5.0_f64 + 2.0) / 2.0_f64.sqrt();
        assert!(close(surface.min_distance(&mesh)[0], expected, 1e-6));
    }

    #[test]
    fn rejects_bad_geometry() {
        let p = Point::surface(0.0, 0.0);
        assert!(PlanarSurface::new(p, p, 45.0, 10.0).is_err());
        assert!(PlanarSurface::new(p, Point::surface(1.0, 0.0), 0.0, 10.0).is_err());
        assert!(PlanarSurface::new(p, Point::surface(1.0, 0.0), 30.0, -1.0).is_err());
    }

    #[test]
    fn point_surface_metrics() {
        let surface = PointSurface::new(Point::new(0.0, 0.0, 10.0), 0.0);
        let east = Point::surface(1.0, 0.0);
        let mesh = Mesh::from_points(&[east]);
        assert!(close(surface.joyner_boore_distance(&mesh)[0], DEGREES_TO_KM, 1e-9));
        assert!(close(surface.min_distance(&mesh)[0], DEGREES_TO_KM.hypot(10.0), 1e-9));
        // strike north, site due east: fully across strike
        assert!(close(surface.rx_distance(&mesh)[0], DEGREES_TO_KM, 1e-9));
        assert!(close(surface.ry0_distance(&mesh)[0], 0.0, 1e-9));
        assert!(close(surface.azimuth(&mesh)[0], 90.0, 1e-9));
        assert_eq!(
            surface.directivity_predictor(&surface.location, 0.0, &mesh).unwrap(),
            vec![0.0]
        );
    }

    #[test]
    fn directivity_forward_and_backward() {
        let surface = vertical_fault();
        let hypo = Point::new(0.0, 0.0, 5.0);
        let mesh = Mesh::from_points(&[Point::surface(1.2, 0.0), Point::surface(-0.3, 0.0)]);
        let dpp = surface.directivity_predictor(&hypo, 0.0, &mesh).unwrap();
        // ahead of a unilateral rupture: full length, theta = 0
        assert!(close(dpp[0], 1.0, 1e-6));
        // behind the hypocentre there is no rupture to travel along
        assert!(close(dpp[1], 0.0, 1e-9));
    }
}

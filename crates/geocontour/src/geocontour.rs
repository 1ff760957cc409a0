//! [`GeoContour`]: one assembled geometry plus its editing and measuring
//! operations.

use crate::descriptors::{self, ShapeDescriptors};
use crate::types::{Circle, Feature, GeoContourError, Geometry, GeometryType, Point, Properties};

/// One fill region of a mask (an outer boundary or an island) with its
/// holes, or a degenerate `Point`/`LineString` when the region is too
/// thin to enclose area.
///
/// The geometry variant is fixed at construction. Scaling and hole
/// removal edit coordinates in place but never change the variant.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoContour {
    geometry: Geometry,
}

impl GeoContour {
    /// Classify raw rings into a geometry.
    ///
    /// `exterior` and each interior may be open or closed. The exterior
    /// decides the variant:
    ///
    /// - one distinct point gives a `Point`;
    /// - no enclosed area gives a `LineString` of the exterior points;
    /// - otherwise a `Polygon`, keeping every interior that encloses area.
    ///
    /// Polygon rings are closed and normalized so the exterior has negative
    /// shoelace area and every hole positive.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::DegenerateRing`] if `exterior` is empty.
    pub fn from_rings(
        exterior: Vec<Point>,
        interiors: Vec<Vec<Point>>,
    ) -> Result<Self, GeoContourError> {
        let exterior = open_ring(exterior);
        let Some(&first) = exterior.first() else {
            return Err(GeoContourError::DegenerateRing(
                "exterior ring has no points",
            ));
        };

        let geometry = if exterior.iter().all(|&p| p == first) {
            Geometry::Point(first)
        } else if descriptors::signed_area(&exterior) == 0.0 {
            Geometry::LineString(exterior)
        } else {
            let interiors = interiors
                .into_iter()
                .map(open_ring)
                .filter(|ring| descriptors::signed_area(ring) != 0.0)
                .map(|ring| closed_ring(oriented(ring, 1.0)))
                .collect();
            Geometry::Polygon {
                exterior: closed_ring(oriented(exterior, -1.0)),
                interiors,
            }
        };
        Ok(Self { geometry })
    }

    /// Wrap an existing geometry as-is, for example one read back from a
    /// GeoJSON file.
    #[must_use]
    pub const fn from_geometry(geometry: Geometry) -> Self {
        Self { geometry }
    }

    /// The wrapped geometry.
    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Variant tag of the wrapped geometry.
    #[must_use]
    pub const fn geometry_type(&self) -> GeometryType {
        self.geometry.geometry_type()
    }

    /// An owned copy of the geometry, detached from this contour.
    #[must_use]
    pub fn export_geometry(&self) -> Geometry {
        self.geometry.clone()
    }

    /// The geometry as a feature. Properties that are all unset export as
    /// `null`.
    #[must_use]
    pub fn export_feature(&self, properties: Properties) -> Feature {
        Feature {
            geometry: self.export_geometry(),
            properties: (!properties.is_empty()).then_some(properties),
        }
    }

    /// Points of the outer boundary (the single point for a `Point`, all
    /// points for a `LineString`).
    #[must_use]
    pub fn exterior(&self) -> &[Point] {
        match &self.geometry {
            Geometry::Point(p) => std::slice::from_ref(p),
            Geometry::LineString(points) => points,
            Geometry::Polygon { exterior, .. } => exterior,
        }
    }

    /// Polygon exterior, or a `DegenerateRing` error naming `what`.
    fn polygon_exterior(&self, what: &'static str) -> Result<&[Point], GeoContourError> {
        match &self.geometry {
            Geometry::Polygon { exterior, .. } => Ok(exterior),
            Geometry::Point(_) | Geometry::LineString(_) => {
                Err(GeoContourError::DegenerateRing(what))
            }
        }
    }

    /// Enclosed area minus hole area, scaled by `resolution²`. Zero for
    /// points and lines.
    #[must_use]
    pub fn area(&self, resolution: f64) -> f64 {
        match &self.geometry {
            Geometry::Point(_) | Geometry::LineString(_) => 0.0,
            Geometry::Polygon {
                exterior,
                interiors,
            } => {
                let holes: f64 = interiors.iter().map(|h| descriptors::ring_area(h)).sum();
                (descriptors::ring_area(exterior) - holes) * resolution * resolution
            }
        }
    }

    /// Smallest circle around the outer boundary, in pixel units.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::DegenerateRing`] if the geometry has no
    /// points.
    pub fn min_enclosing_circle(&self) -> Result<Circle, GeoContourError> {
        descriptors::min_enclosing_circle(self.exterior()).ok_or(
            GeoContourError::DegenerateRing("enclosing circle needs at least one point"),
        )
    }

    /// `4π·A / P²` of the exterior ring. Informational: pixel staircases
    /// can push it slightly outside `(0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::DegenerateRing`] unless the geometry is
    /// a polygon.
    pub fn circularity(&self) -> Result<f64, GeoContourError> {
        descriptors::circularity(self.polygon_exterior("circularity is defined for polygons only")?)
    }

    /// Exterior area over the area of its convex hull.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::DegenerateRing`] unless the geometry is
    /// a polygon with a non-degenerate hull.
    pub fn solidity(&self) -> Result<f64, GeoContourError> {
        descriptors::solidity(self.polygon_exterior("solidity is defined for polygons only")?)
    }

    /// Short over long side of the exterior's minimum-area rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::DegenerateRing`] unless the geometry is
    /// a polygon.
    pub fn aspect_ratio(&self) -> Result<f64, GeoContourError> {
        descriptors::aspect_ratio(self.polygon_exterior("aspect ratio is defined for polygons only")?)
    }

    /// Minor over major axis of the exterior's best-fit ellipse.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::DegenerateRing`] unless the geometry is
    /// a polygon.
    pub fn elongation(&self) -> Result<f64, GeoContourError> {
        descriptors::elongation(self.polygon_exterior("elongation is defined for polygons only")?)
    }

    /// Number of interior rings.
    #[must_use]
    pub const fn holes_num(&self) -> usize {
        match &self.geometry {
            Geometry::Polygon { interiors, .. } => interiors.len(),
            Geometry::Point(_) | Geometry::LineString(_) => 0,
        }
    }

    /// Remove holes in place.
    ///
    /// With `hole_size` unset or negative every hole is removed. Otherwise
    /// a hole is removed when its area times `resolution²` is at most
    /// `hole_size`. Points and lines are left alone.
    pub fn fill_hole(&mut self, resolution: f64, hole_size: Option<f64>) {
        let Geometry::Polygon { interiors, .. } = &mut self.geometry else {
            return;
        };
        match hole_size {
            Some(size) if size >= 0.0 => {
                let scale = resolution * resolution;
                interiors.retain(|hole| descriptors::ring_area(hole) * scale > size);
            }
            _ => interiors.clear(),
        }
    }

    /// Map every point to `ratio · p + offset`, in place.
    pub fn scale_up(&mut self, ratio: f64, offset: Point) {
        self.geometry.for_each_point_mut(|p| {
            p.x = ratio.mul_add(p.x, offset.x);
            p.y = ratio.mul_add(p.y, offset.y);
        });
    }

    /// Map every point to `(p - offset) / ratio`, in place. Undoes
    /// [`scale_up`](Self::scale_up) with the same arguments.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::InvalidScale`] if `ratio` is zero or not
    /// finite. The geometry is untouched in that case.
    pub fn scale_down(&mut self, ratio: f64, offset: Point) -> Result<(), GeoContourError> {
        if ratio == 0.0 || !ratio.is_finite() {
            return Err(GeoContourError::InvalidScale(ratio));
        }
        self.geometry.for_each_point_mut(|p| {
            p.x = (p.x - offset.x) / ratio;
            p.y = (p.y - offset.y) / ratio;
        });
        Ok(())
    }

    /// Every descriptor at once. Undefined ones are `None`.
    #[must_use]
    pub fn describe(&self, resolution: f64) -> ShapeDescriptors {
        ShapeDescriptors {
            area: self.area(resolution),
            holes: self.holes_num(),
            circularity: self.circularity().ok(),
            solidity: self.solidity().ok(),
            aspect_ratio: self.aspect_ratio().ok(),
            elongation: self.elongation().ok(),
            min_enclosing_circle: self.min_enclosing_circle().ok(),
        }
    }
}

/// Drop a repeated closing point.
fn open_ring(mut ring: Vec<Point>) -> Vec<Point> {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

fn closed_ring(mut ring: Vec<Point>) -> Vec<Point> {
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    ring
}

/// Reverse an open ring (keeping its first point) unless its signed area
/// already has the sign of `sign`.
fn oriented(mut ring: Vec<Point>, sign: f64) -> Vec<Point> {
    if descriptors::signed_area(&ring) * sign < 0.0 && ring.len() > 2 {
        ring[1..].reverse();
    }
    ring
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, s: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + s, y),
            Point::new(x + s, y + s),
            Point::new(x, y + s),
        ]
    }

    fn donut() -> GeoContour {
        GeoContour::from_rings(
            square(0.0, 0.0, 10.0),
            vec![square(1.0, 1.0, 2.0), square(5.0, 5.0, 3.0)],
        )
        .unwrap()
    }

    #[test]
    fn single_point_is_point() {
        let gc = GeoContour::from_rings(vec![Point::new(3.0, 4.0)], vec![]).unwrap();
        assert_eq!(gc.geometry_type(), GeometryType::Point);
        assert_eq!(gc.geometry(), &Geometry::Point(Point::new(3.0, 4.0)));
        assert!(gc.area(1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_area_is_line_string() {
        let gc = GeoContour::from_rings(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)], vec![])
            .unwrap();
        assert_eq!(gc.geometry_type(), GeometryType::LineString);
        assert!(matches!(
            gc.circularity(),
            Err(GeoContourError::DegenerateRing(_))
        ));
    }

    #[test]
    fn empty_exterior_is_rejected() {
        assert!(matches!(
            GeoContour::from_rings(vec![], vec![]),
            Err(GeoContourError::DegenerateRing(_))
        ));
    }

    #[test]
    fn polygon_rings_are_closed_and_oppositely_wound() {
        let gc = donut();
        let Geometry::Polygon {
            exterior,
            interiors,
        } = gc.geometry()
        else {
            unreachable!("donut is a polygon");
        };
        assert_eq!(exterior.first(), exterior.last());
        assert_eq!(exterior.len(), 5);
        assert!(descriptors::signed_area(exterior) < 0.0);
        for hole in interiors {
            assert_eq!(hole.first(), hole.last());
            assert!(descriptors::signed_area(hole) > 0.0);
        }
    }

    #[test]
    fn zero_area_holes_are_dropped() {
        let gc = GeoContour::from_rings(
            square(0.0, 0.0, 10.0),
            vec![vec![Point::new(2.0, 2.0), Point::new(3.0, 2.0)]],
        )
        .unwrap();
        assert_eq!(gc.holes_num(), 0);
        assert_eq!(gc.geometry_type(), GeometryType::Polygon);
    }

    #[test]
    fn area_subtracts_holes_and_scales() {
        let gc = donut();
        assert!((gc.area(1.0) - (100.0 - 4.0 - 9.0)).abs() < 1e-12);
        assert!((gc.area(0.5) - 87.0 * 0.25).abs() < 1e-12);
    }

    #[test]
    fn fill_hole_thresholds() {
        let mut gc = donut();
        gc.fill_hole(1.0, Some(4.0));
        assert_eq!(gc.holes_num(), 1, "hole of area 4 is removed at size 4");

        let mut gc = donut();
        gc.fill_hole(1.0, Some(3.9));
        assert_eq!(gc.holes_num(), 2);

        let mut gc = donut();
        gc.fill_hole(2.0, Some(16.0));
        assert_eq!(gc.holes_num(), 1, "resolution scales hole area");

        let mut gc = donut();
        gc.fill_hole(1.0, Some(-1.0));
        assert_eq!(gc.holes_num(), 0);

        let mut gc = donut();
        gc.fill_hole(1.0, None);
        assert_eq!(gc.holes_num(), 0);
        assert_eq!(gc.geometry_type(), GeometryType::Polygon);
    }

    #[test]
    fn fill_hole_on_point_is_noop() {
        let mut gc = GeoContour::from_rings(vec![Point::new(1.0, 1.0)], vec![]).unwrap();
        let before = gc.clone();
        gc.fill_hole(1.0, None);
        assert_eq!(gc, before);
    }

    #[test]
    fn scale_round_trip() {
        let original = donut();
        let mut gc = original.clone();
        let offset = Point::new(8.0, -4.0);
        gc.scale_up(4.0, offset);
        assert!((gc.area(1.0) - original.area(1.0) * 16.0).abs() < 1e-9);
        gc.scale_down(4.0, offset).unwrap();
        assert_eq!(gc, original);
    }

    fn all_points(gc: &GeoContour) -> Vec<Point> {
        let mut points = Vec::new();
        gc.export_geometry().for_each_point_mut(|p| points.push(*p));
        points
    }

    #[test]
    fn scale_round_trip_inexact_ratios() {
        let original = donut();
        let offset = Point::new(0.25, -3.75);
        for ratio in [3.0, -0.7, 1.0 / 3.0, 1e-3, -12.5] {
            let mut gc = original.clone();
            gc.scale_up(ratio, offset);
            assert!(
                (gc.area(1.0) - original.area(1.0) * ratio * ratio).abs() < 1e-6,
                "ratio {ratio}"
            );
            gc.scale_down(ratio, offset).unwrap();
            assert_eq!(gc.geometry_type(), GeometryType::Polygon);
            assert_eq!(gc.holes_num(), original.holes_num());
            for (a, b) in all_points(&gc).iter().zip(all_points(&original)) {
                assert!(a.distance(b) < 1e-9, "ratio {ratio}: {a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn scale_up_maps_points() {
        let mut gc = GeoContour::from_rings(vec![Point::new(1.0, 2.0)], vec![]).unwrap();
        gc.scale_up(2.0, Point::new(10.0, 20.0));
        assert_eq!(gc.geometry(), &Geometry::Point(Point::new(12.0, 24.0)));
    }

    #[test]
    fn scale_down_rejects_zero() {
        let mut gc = donut();
        let before = gc.clone();
        assert!(matches!(
            gc.scale_down(0.0, Point::new(0.0, 0.0)),
            Err(GeoContourError::InvalidScale(_))
        ));
        assert_eq!(gc, before);
    }

    #[test]
    fn clone_does_not_alias() {
        let original = donut();
        let mut copy = original.clone();
        copy.scale_up(3.0, Point::new(1.0, 1.0));
        copy.fill_hole(1.0, None);
        assert_eq!(original, donut());
        assert_eq!(original.holes_num(), 2);
    }

    #[test]
    fn export_feature_properties() {
        let gc = donut();
        assert!(gc.export_feature(Properties::default()).properties.is_none());

        let feature = gc.export_feature(Properties {
            color: Some([255, 0, 0]),
            name: Some("cell".to_string()),
            ..Properties::default()
        });
        let props = feature.properties.unwrap();
        assert_eq!(props.color, Some([255, 0, 0]));
        assert!(props.label.is_none());
        assert_eq!(feature.geometry, *gc.geometry());
    }

    #[test]
    fn square_descriptors() {
        let gc = GeoContour::from_rings(square(0.0, 0.0, 4.0), vec![square(1.0, 1.0, 1.0)])
            .unwrap();
        assert!((gc.solidity().unwrap() - 1.0).abs() < 1e-12);
        assert!((gc.aspect_ratio().unwrap() - 1.0).abs() < 1e-9);
        assert!((gc.elongation().unwrap() - 1.0).abs() < 1e-9);
        assert!((gc.circularity().unwrap() - std::f64::consts::PI / 4.0).abs() < 1e-12);
        let circle = gc.min_enclosing_circle().unwrap();
        assert!((circle.radius - 8.0_f64.sqrt()).abs() < 1e-9);
        assert!(circle.center.distance(Point::new(2.0, 2.0)) < 1e-9);
    }

    #[test]
    fn describe_marks_undefined_descriptors() {
        let gc = GeoContour::from_rings(vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0)], vec![])
            .unwrap();
        let d = gc.describe(1.0);
        assert!(d.area.abs() < f64::EPSILON);
        assert!(d.circularity.is_none());
        assert!(d.solidity.is_none());
        assert!((d.min_enclosing_circle.unwrap().radius - 1.0).abs() < 1e-12);
    }

    #[test]
    fn geocontour_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeoContour>();
    }
}

//! Shape descriptors: pure functions over rings.
//!
//! Rings may be passed open or closed; a repeated closing point adds a
//! zero-length edge and changes nothing. Areas are in squared pixel units
//! and lengths in pixels. Callers apply `resolution` themselves.

use geo::{Area, ConvexHull, MinimumRotatedRect};
use serde::{Deserialize, Serialize};

use crate::types::{Circle, GeoContourError, Point};

/// Relative tolerance for point-in-circle tests.
const CIRCLE_EPSILON: f64 = 1e-9;

/// Shoelace area. Positive when the ring turns clockwise on screen
/// (y grows downward), negative for counter-clockwise.
#[must_use]
pub fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x.mul_add(b.y, -(b.x * a.y))
        })
        .sum();
    twice / 2.0
}

/// Unsigned enclosed area of a ring.
#[must_use]
pub fn ring_area(ring: &[Point]) -> f64 {
    signed_area(ring).abs()
}

/// Length of the closed ring, including the closing edge.
#[must_use]
pub fn perimeter(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| ring[i].distance(ring[(i + 1) % n])).sum()
}

fn to_multi_point(points: &[Point]) -> geo::MultiPoint<f64> {
    points
        .iter()
        .map(|&p| geo::Point::from(geo::Coord::from(p)))
        .collect()
}

fn to_polygon(ring: &[Point]) -> geo::Polygon<f64> {
    let exterior: geo::LineString<f64> = ring.iter().map(|&p| geo::Coord::from(p)).collect();
    geo::Polygon::new(exterior, vec![])
}

/// `4π·A / P²` of a ring. Close to 1 for a disc; lower for anything
/// elongated or ragged. Pixel staircases can push small shapes slightly
/// off the ideal.
///
/// # Errors
///
/// Returns [`GeoContourError::DegenerateRing`] if the ring has no
/// perimeter.
pub fn circularity(ring: &[Point]) -> Result<f64, GeoContourError> {
    let p = perimeter(ring);
    if p <= 0.0 {
        return Err(GeoContourError::DegenerateRing(
            "circularity needs a ring with nonzero perimeter",
        ));
    }
    Ok(4.0 * std::f64::consts::PI * ring_area(ring) / (p * p))
}

/// Area of the convex hull of `points`.
#[must_use]
pub fn convex_hull_area(points: &[Point]) -> f64 {
    to_multi_point(points).convex_hull().unsigned_area()
}

/// Ring area over convex hull area, in `(0, 1]`.
///
/// # Errors
///
/// Returns [`GeoContourError::DegenerateRing`] if the hull has no area
/// (two or fewer distinct points, or all collinear).
pub fn solidity(ring: &[Point]) -> Result<f64, GeoContourError> {
    let hull = convex_hull_area(ring);
    if hull <= 0.0 {
        return Err(GeoContourError::DegenerateRing(
            "solidity needs a convex hull with nonzero area",
        ));
    }
    Ok(ring_area(ring) / hull)
}

/// Side lengths `(short, long)` of the minimum-area enclosing rectangle.
#[must_use]
pub fn min_area_rect_sides(ring: &[Point]) -> Option<(f64, f64)> {
    let rect = to_polygon(ring).minimum_rotated_rect()?;
    let coords: Vec<geo::Coord<f64>> = rect.exterior().coords().copied().collect();
    if coords.len() < 3 {
        return None;
    }
    let a = Point::from(coords[0]).distance(Point::from(coords[1]));
    let b = Point::from(coords[1]).distance(Point::from(coords[2]));
    Some(if a <= b { (a, b) } else { (b, a) })
}

/// Short side over long side of the minimum-area enclosing rectangle,
/// in `(0, 1]`. A square gives 1.
///
/// # Errors
///
/// Returns [`GeoContourError::DegenerateRing`] if the rectangle
/// collapses to a segment or point.
pub fn aspect_ratio(ring: &[Point]) -> Result<f64, GeoContourError> {
    match min_area_rect_sides(ring) {
        Some((short, long)) if short > 0.0 && long > 0.0 => Ok(short / long),
        _ => Err(GeoContourError::DegenerateRing(
            "aspect ratio needs a ring with two-dimensional extent",
        )),
    }
}

/// Raw area moments of a polygon ring, by Green's theorem.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    m00: f64,
    m10: f64,
    m01: f64,
    m20: f64,
    m11: f64,
    m02: f64,
}

impl Moments {
    fn of_ring(ring: &[Point]) -> Self {
        let n = ring.len();
        let mut m = Self::default();
        if n < 3 {
            return m;
        }
        for i in 0..n {
            let Point { x: x0, y: y0 } = ring[i];
            let Point { x: x1, y: y1 } = ring[(i + 1) % n];
            let cross = x0.mul_add(y1, -(x1 * y0));
            m.m00 += cross;
            m.m10 += (x0 + x1) * cross;
            m.m01 += (y0 + y1) * cross;
            m.m20 += x1.mul_add(x1, x0.mul_add(x0, x0 * x1)) * cross;
            m.m02 += y1.mul_add(y1, y0.mul_add(y0, y0 * y1)) * cross;
            m.m11 += (2.0 * x0).mul_add(y0, (2.0 * x1).mul_add(y1, x0.mul_add(y1, x1 * y0)))
                * cross;
        }
        m.m00 /= 2.0;
        m.m10 /= 6.0;
        m.m01 /= 6.0;
        m.m20 /= 12.0;
        m.m02 /= 12.0;
        m.m11 /= 24.0;

        // Orientation-independent: report moments of the enclosed region.
        if m.m00 < 0.0 {
            m = Self {
                m00: -m.m00,
                m10: -m.m10,
                m01: -m.m01,
                m20: -m.m20,
                m11: -m.m11,
                m02: -m.m02,
            };
        }
        m
    }

    /// Eigenvalues `(min, max)` of the normalized central second-moment
    /// matrix.
    fn principal_variances(self) -> Option<(f64, f64)> {
        if self.m00 <= 0.0 {
            return None;
        }
        let cx = self.m10 / self.m00;
        let cy = self.m01 / self.m00;
        let a = self.m20 / self.m00 - cx * cx;
        let b = self.m11 / self.m00 - cx * cy;
        let c = self.m02 / self.m00 - cy * cy;
        let mean = (a + c) / 2.0;
        let spread = ((a - c) / 2.0).hypot(b);
        Some(((mean - spread).max(0.0), mean + spread))
    }
}

/// Minor over major axis of the ellipse with the ring's second moments,
/// in `[0, 1]`. A disc or square gives 1; a `w x h` rectangle gives
/// `min(w, h) / max(w, h)`.
///
/// # Errors
///
/// Returns [`GeoContourError::DegenerateRing`] if the ring encloses no
/// area (fewer than three non-collinear points).
pub fn elongation(ring: &[Point]) -> Result<f64, GeoContourError> {
    match Moments::of_ring(ring).principal_variances() {
        Some((minor, major)) if major > 0.0 => Ok((minor / major).sqrt()),
        _ => Err(GeoContourError::DegenerateRing(
            "elongation needs three or more non-collinear points",
        )),
    }
}

/// Smallest circle containing every point.
///
/// Runs the incremental Welzl construction over the convex hull
/// vertices, which bound the same circle as the full point set. Returns
/// `None` for an empty slice.
#[must_use]
pub fn min_enclosing_circle(points: &[Point]) -> Option<Circle> {
    let first = *points.first()?;

    let hull: Vec<Point> = to_multi_point(points)
        .convex_hull()
        .exterior()
        .coords()
        .copied()
        .map(Point::from)
        .collect();
    // A closed hull of a 2D set has at least four coords.
    let candidates = if hull.len() >= 4 { &hull[..] } else { points };

    let mut circle = Circle {
        center: first,
        radius: 0.0,
    };
    for (i, &p) in candidates.iter().enumerate() {
        if contains(&circle, p) {
            continue;
        }
        circle = Circle {
            center: p,
            radius: 0.0,
        };
        for (j, &q) in candidates[..i].iter().enumerate() {
            if contains(&circle, q) {
                continue;
            }
            circle = diameter_circle(p, q);
            for &r in &candidates[..j] {
                if !contains(&circle, r) {
                    circle = circumcircle(p, q, r);
                }
            }
        }
    }
    Some(circle)
}

fn contains(circle: &Circle, p: Point) -> bool {
    circle.center.distance(p) <= circle.radius.mul_add(CIRCLE_EPSILON, circle.radius) + CIRCLE_EPSILON
}

fn diameter_circle(a: Point, b: Point) -> Circle {
    Circle {
        center: Point::new(f64::midpoint(a.x, b.x), f64::midpoint(a.y, b.y)),
        radius: a.distance(b) / 2.0,
    }
}

/// Circle through three points; the widest pair's diameter circle when
/// they are collinear.
fn circumcircle(a: Point, b: Point, c: Point) -> Circle {
    let (bx, by) = (b.x - a.x, b.y - a.y);
    let (cx, cy) = (c.x - a.x, c.y - a.y);
    let d = 2.0 * bx.mul_add(cy, -(by * cx));
    if d.abs() <= f64::EPSILON {
        return [diameter_circle(a, b), diameter_circle(a, c), diameter_circle(b, c)]
            .into_iter()
            .max_by(|l, r| l.radius.total_cmp(&r.radius))
            .unwrap_or_else(|| diameter_circle(a, b));
    }
    let b2 = bx.mul_add(bx, by * by);
    let c2 = cx.mul_add(cx, cy * cy);
    let ux = cy.mul_add(b2, -(by * c2)) / d;
    let uy = bx.mul_add(c2, -(cx * b2)) / d;
    Circle {
        center: Point::new(a.x + ux, a.y + uy),
        radius: ux.hypot(uy),
    }
}

/// Every descriptor of one geocontour, for reports and JSON output.
///
/// Descriptors that are undefined for the geometry (for example the
/// circularity of a line) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescriptors {
    pub area: f64,
    pub holes: usize,
    pub circularity: Option<f64>,
    pub solidity: Option<f64>,
    pub aspect_ratio: Option<f64>,
    pub elongation: Option<f64>,
    pub min_enclosing_circle: Option<Circle>,
}

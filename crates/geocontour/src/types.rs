//! Shared types for the geocontour conversion core.

use serde::{Deserialize, Serialize};

use crate::geocontour::GeoContour;
use crate::transform::CoordinateMode;

/// Re-export `GrayImage` so downstream crates can hand masks to the
/// tracer without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point in raster (or geographic) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl From<Point> for geo::Coord<f64> {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<geo::Coord<f64>> for Point {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

/// One traced boundary: an ordered, implicitly closed sequence of
/// pixel-center samples.
///
/// Tracers emit integral coordinates; the pixel-boundary transform
/// rounds to the nearest lattice point before resolving directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve(Vec<Point>);

impl Curve {
    /// Create a new curve from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the curve has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the curve.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the curve and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

impl FromIterator<Point> for Curve {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Geometry tag, mirroring the [`Geometry`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
        })
    }
}

/// A basic GeoJSON geometry.
///
/// Polygon rings are stored closed (first point repeated at the end).
/// By convention the exterior ring has negative shoelace area in raster
/// coordinates (counter-clockwise on screen, where y grows downward) and
/// holes wind the opposite way.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(Vec<Point>),
    Polygon {
        exterior: Vec<Point>,
        interiors: Vec<Vec<Point>>,
    },
}

impl Geometry {
    /// The tag of this geometry.
    #[must_use]
    pub const fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::LineString(_) => GeometryType::LineString,
            Self::Polygon { .. } => GeometryType::Polygon,
        }
    }

    /// Returns `true` if every coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        let finite = |p: &Point| p.x.is_finite() && p.y.is_finite();
        match self {
            Self::Point(p) => finite(p),
            Self::LineString(points) => points.iter().all(finite),
            Self::Polygon {
                exterior,
                interiors,
            } => exterior.iter().chain(interiors.iter().flatten()).all(finite),
        }
    }

    /// Apply `f` to every point of every ring, in place.
    pub fn for_each_point_mut(&mut self, mut f: impl FnMut(&mut Point)) {
        match self {
            Self::Point(p) => f(p),
            Self::LineString(points) => points.iter_mut().for_each(f),
            Self::Polygon {
                exterior,
                interiors,
            } => {
                exterior.iter_mut().for_each(&mut f);
                interiors.iter_mut().flatten().for_each(f);
            }
        }
    }
}

/// Serde-compatible proxy for [`Geometry`].
///
/// Produces the GeoJSON shape: a `type` tag plus nested `[x, y]`
/// coordinate arrays.
#[derive(Serialize)]
#[serde(tag = "type")]
enum GeometryProxy {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

const fn position(p: Point) -> [f64; 2] {
    [p.x, p.y]
}

fn positions(points: &[Point]) -> Vec<[f64; 2]> {
    points.iter().copied().map(position).collect()
}

impl Serialize for Geometry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::Point(p) => GeometryProxy::Point {
                coordinates: position(*p),
            },
            Self::LineString(points) => GeometryProxy::LineString {
                coordinates: positions(points),
            },
            Self::Polygon {
                exterior,
                interiors,
            } => GeometryProxy::Polygon {
                coordinates: std::iter::once(exterior)
                    .chain(interiors)
                    .map(|ring| positions(ring))
                    .collect(),
            },
        };
        proxy.serialize(serializer)
    }
}

/// Optional property bag attached to an exported [`Feature`].
///
/// Properties that were not supplied are omitted from the output, not
/// written as empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    /// Display color as `[r, g, b]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
    /// Classification label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Object name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Properties {
    /// Returns `true` if no property was supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.color.is_none() && self.label.is_none() && self.name.is_none()
    }
}

/// A geometry plus its optional properties, ready for a feature writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    /// `None` when no property was supplied; serialized as `null`.
    pub properties: Option<Properties>,
}

#[derive(Serialize)]
struct FeatureProxy<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: &'a Geometry,
    properties: Option<&'a Properties>,
}

impl Serialize for Feature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FeatureProxy {
            kind: "Feature",
            geometry: &self.geometry,
            properties: self.properties.as_ref(),
        }
        .serialize(serializer)
    }
}

/// A circle in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

/// Configuration for converting a mask into geocontours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Which coordinate convention to emit.
    pub mode: CoordinateMode,

    /// Pixels with a value strictly above this threshold are foreground.
    pub foreground_threshold: u8,

    /// Physical size of one pixel. Areas are scaled by its square.
    pub resolution: f64,

    /// Remove holes whose scaled area is at most this value after
    /// assembly. A negative value removes every hole; `None` keeps all.
    pub fill_holes: Option<f64>,
}

impl ConversionConfig {
    pub const DEFAULT_MODE: CoordinateMode = CoordinateMode::PixelCenter;
    pub const DEFAULT_FOREGROUND_THRESHOLD: u8 = 0;
    pub const DEFAULT_RESOLUTION: f64 = 1.0;

    /// Check the invariants the fields cannot express on their own.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::InvalidConfig`] if `resolution` is not
    /// a finite positive number or `fill_holes` is NaN.
    pub fn validate(&self) -> Result<(), GeoContourError> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(GeoContourError::InvalidConfig(format!(
                "resolution must be finite and positive, got {}",
                self.resolution
            )));
        }
        if self.fill_holes.is_some_and(f64::is_nan) {
            return Err(GeoContourError::InvalidConfig(
                "fill_holes must not be NaN".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            mode: Self::DEFAULT_MODE,
            foreground_threshold: Self::DEFAULT_FOREGROUND_THRESHOLD,
            resolution: Self::DEFAULT_RESOLUTION,
            fill_holes: None,
        }
    }
}

/// Result of converting one mask.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    /// One entry per fill region (roots and islands), in hierarchy order.
    pub geocontours: Vec<GeoContour>,

    /// Dimensions of the source mask in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur while converting or measuring geocontours.
#[derive(Debug, thiserror::Error)]
pub enum GeoContourError {
    /// Failed to decode the input mask image.
    #[error("failed to decode mask image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A traced curve has no points.
    #[error("curve {index} has no points")]
    EmptyCurve { index: usize },

    /// Hierarchy indices are out of range, inconsistent, or cyclic.
    #[error("malformed contour hierarchy: {0}")]
    MalformedHierarchy(String),

    /// Too few distinct points for the requested measurement.
    #[error("degenerate ring: {0}")]
    DegenerateRing(&'static str),

    /// Scale ratio cannot be inverted.
    #[error("invalid scale ratio: {0}")]
    InvalidScale(f64),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_geo_coord_conversion() {
        let p = Point::new(1.5, -2.0);
        let c: geo::Coord<f64> = p.into();
        assert_eq!(Point::from(c), p);
    }

    #[test]
    fn curve_collects_points() {
        let curve: Curve = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)]
            .into_iter()
            .collect();
        assert_eq!(curve.len(), 2);
        assert!(!curve.is_empty());
        assert_eq!(curve.points()[1], Point::new(1.0, 0.0));
    }

    #[test]
    fn point_geometry_serializes_as_geojson() {
        let json = serde_json::to_value(Geometry::Point(Point::new(1.0, 2.0))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "Point", "coordinates": [1.0, 2.0]})
        );
    }

    #[test]
    fn polygon_geometry_serializes_exterior_then_holes() {
        let square = |x: f64, s: f64| {
            vec![
                Point::new(x, x),
                Point::new(x, x + s),
                Point::new(x + s, x + s),
                Point::new(x + s, x),
                Point::new(x, x),
            ]
        };
        let geometry = Geometry::Polygon {
            exterior: square(0.0, 4.0),
            interiors: vec![square(1.0, 1.0)],
        };
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["type"], "Polygon");
        let rings = json["coordinates"].as_array().unwrap();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].as_array().unwrap().len(), 5);
        assert_eq!(rings[1][0], serde_json::json!([1.0, 1.0]));
    }

    #[test]
    fn feature_omits_unsupplied_properties() {
        let feature = Feature {
            geometry: Geometry::Point(Point::new(0.0, 0.0)),
            properties: Some(Properties {
                label: Some("roi".to_string()),
                ..Properties::default()
            }),
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["properties"], serde_json::json!({"label": "roi"}));
    }

    #[test]
    fn feature_without_properties_writes_null() {
        let feature = Feature {
            geometry: Geometry::Point(Point::new(0.0, 0.0)),
            properties: None,
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert!(json["properties"].is_null());
    }

    #[test]
    fn for_each_point_mut_visits_holes() {
        let mut geometry = Geometry::Polygon {
            exterior: vec![Point::new(0.0, 0.0); 4],
            interiors: vec![vec![Point::new(1.0, 1.0); 4]],
        };
        let mut visited = 0;
        geometry.for_each_point_mut(|p| {
            p.x += 1.0;
            visited += 1;
        });
        assert_eq!(visited, 8);
        let Geometry::Polygon { interiors, .. } = geometry else {
            unreachable!()
        };
        assert!((interiors[0][0].x - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn is_finite_checks_hole_points() {
        let mut geometry = Geometry::Polygon {
            exterior: vec![Point::new(0.0, 0.0); 4],
            interiors: vec![vec![Point::new(1.0, 1.0); 4]],
        };
        assert!(geometry.is_finite());
        if let Geometry::Polygon { interiors, .. } = &mut geometry {
            interiors[0][2].y = f64::NAN;
        }
        assert!(!geometry.is_finite());
        assert!(!Geometry::Point(Point::new(f64::INFINITY, 0.0)).is_finite());
    }

    #[test]
    fn config_defaults() {
        let config = ConversionConfig::default();
        assert_eq!(config.mode, CoordinateMode::PixelCenter);
        assert_eq!(config.foreground_threshold, 0);
        assert!((config.resolution - 1.0).abs() < f64::EPSILON);
        assert!(config.fill_holes.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_non_positive_resolution() {
        let config = ConversionConfig {
            resolution: 0.0,
            ..ConversionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GeoContourError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_serde_round_trip() {
        let config = ConversionConfig {
            mode: CoordinateMode::PixelBoundary,
            foreground_threshold: 127,
            resolution: 0.25,
            fill_holes: Some(-1.0),
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ConversionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn config_partial_json_uses_defaults() {
        let config: ConversionConfig =
            serde_json::from_str(r#"{"mode": "pixel_boundary"}"#).unwrap();
        assert_eq!(config.mode, CoordinateMode::PixelBoundary);
        assert!((config.resolution - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            GeoContourError::InvalidScale(0.0).to_string(),
            "invalid scale ratio: 0"
        );
        assert_eq!(
            GeoContourError::EmptyCurve { index: 3 }.to_string(),
            "curve 3 has no points"
        );
    }
}

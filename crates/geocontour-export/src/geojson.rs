//! GeoJSON (RFC 7946) text for geocontour geometries.
//!
//! Output is a `FeatureCollection` of features whose `properties` hold
//! only the supplied keys among `color`, `label`, and `name`, or `null`
//! when none was supplied.
//!
//! Input may be any GeoJSON object. Multi-part geometries, geometry
//! collections, features, and feature collections are flattened into
//! their basic `Point`, `LineString`, and `Polygon` members, in document
//! order. Altitude and other extra position values are dropped.

use serde::{Deserialize, Serialize};

use geocontour::{Feature, GeoContour, Geometry, Point};

/// Errors from reading or writing GeoJSON.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The text is not JSON, or not a GeoJSON object of a known type.
    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A geometry violates GeoJSON's structural rules.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A feature has a `null` geometry.
    #[error("feature has no geometry")]
    MissingGeometry,
}

#[derive(Serialize)]
struct FeatureCollectionProxy<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    features: &'a [Feature],
}

/// GeoJSON positions are plain numbers; `NaN` and infinities have no
/// encoding.
fn check_finite(index: usize, feature: &Feature) -> Result<(), FormatError> {
    if feature.geometry.is_finite() {
        Ok(())
    } else {
        Err(FormatError::InvalidGeometry(format!(
            "feature {index} has a non-finite coordinate"
        )))
    }
}

/// Serialize features as a GeoJSON `FeatureCollection`.
///
/// # Errors
///
/// Returns [`FormatError::InvalidGeometry`] if a feature has a
/// non-finite coordinate, and [`FormatError::Json`] if serialization
/// fails.
pub fn to_feature_collection(features: &[Feature], pretty: bool) -> Result<String, FormatError> {
    for (index, feature) in features.iter().enumerate() {
        check_finite(index, feature)?;
    }
    let collection = FeatureCollectionProxy {
        kind: "FeatureCollection",
        features,
    };
    let json = if pretty {
        serde_json::to_string_pretty(&collection)?
    } else {
        serde_json::to_string(&collection)?
    };
    Ok(json)
}

/// Serialize a single feature.
///
/// # Errors
///
/// Returns [`FormatError::InvalidGeometry`] if the feature has a
/// non-finite coordinate, and [`FormatError::Json`] if serialization
/// fails.
pub fn to_feature_json(feature: &Feature) -> Result<String, FormatError> {
    check_finite(0, feature)?;
    Ok(serde_json::to_string(feature)?)
}

/// A GeoJSON position: `[x, y]` plus optional extra values.
type Position = Vec<f64>;

/// Every GeoJSON object type, as read from text.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJson>,
    },
    Feature {
        geometry: Option<Box<GeoJson>>,
    },
    FeatureCollection {
        features: Vec<GeoJson>,
    },
}

/// Parse any GeoJSON object into its basic geometries.
///
/// # Errors
///
/// Returns [`FormatError::Json`] for malformed text or unknown types,
/// [`FormatError::InvalidGeometry`] for a geometry that breaks GeoJSON's
/// rules (short line strings, unclosed or short rings, positions with
/// fewer than two values, non-features inside a feature collection), and
/// [`FormatError::MissingGeometry`] for a feature without geometry.
pub fn parse_geometries(json: &str) -> Result<Vec<Geometry>, FormatError> {
    let object: GeoJson = serde_json::from_str(json)?;
    let mut out = Vec::new();
    flatten(object, &mut out)?;
    Ok(out)
}

/// Parse any GeoJSON object into geocontours, one per basic geometry.
///
/// # Errors
///
/// Same as [`parse_geometries`].
pub fn load_geocontours(json: &str) -> Result<Vec<GeoContour>, FormatError> {
    Ok(parse_geometries(json)?
        .into_iter()
        .map(GeoContour::from_geometry)
        .collect())
}

fn flatten(object: GeoJson, out: &mut Vec<Geometry>) -> Result<(), FormatError> {
    match object {
        GeoJson::Point { coordinates } => out.push(Geometry::Point(point(&coordinates)?)),
        GeoJson::MultiPoint { coordinates } => {
            for position in &coordinates {
                out.push(Geometry::Point(point(position)?));
            }
        }
        GeoJson::LineString { coordinates } => out.push(line_string(&coordinates)?),
        GeoJson::MultiLineString { coordinates } => {
            for line in &coordinates {
                out.push(line_string(line)?);
            }
        }
        GeoJson::Polygon { coordinates } => out.push(polygon(&coordinates)?),
        GeoJson::MultiPolygon { coordinates } => {
            for rings in &coordinates {
                out.push(polygon(rings)?);
            }
        }
        GeoJson::GeometryCollection { geometries } => {
            for geometry in geometries {
                flatten(geometry, out)?;
            }
        }
        GeoJson::Feature { geometry } => {
            let geometry = geometry.ok_or(FormatError::MissingGeometry)?;
            flatten(*geometry, out)?;
        }
        GeoJson::FeatureCollection { features } => {
            for feature in features {
                if !matches!(feature, GeoJson::Feature { .. }) {
                    return Err(FormatError::InvalidGeometry(
                        "feature collection member is not a Feature".to_string(),
                    ));
                }
                flatten(feature, out)?;
            }
        }
    }
    Ok(())
}

fn point(position: &[f64]) -> Result<Point, FormatError> {
    match position {
        [x, y, ..] => Ok(Point::new(*x, *y)),
        _ => Err(FormatError::InvalidGeometry(format!(
            "position needs at least two values, got {}",
            position.len()
        ))),
    }
}

fn points(positions: &[Position]) -> Result<Vec<Point>, FormatError> {
    positions.iter().map(|p| point(p)).collect()
}

fn line_string(positions: &[Position]) -> Result<Geometry, FormatError> {
    if positions.len() < 2 {
        return Err(FormatError::InvalidGeometry(format!(
            "LineString needs at least two positions, got {}",
            positions.len()
        )));
    }
    Ok(Geometry::LineString(points(positions)?))
}

fn ring(positions: &[Position]) -> Result<Vec<Point>, FormatError> {
    let ring = points(positions)?;
    if ring.len() < 4 {
        return Err(FormatError::InvalidGeometry(format!(
            "polygon ring needs at least four positions, got {}",
            ring.len()
        )));
    }
    if ring.first() != ring.last() {
        return Err(FormatError::InvalidGeometry(
            "polygon ring is not closed".to_string(),
        ));
    }
    Ok(ring)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Geometry, FormatError> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Err(FormatError::InvalidGeometry(
            "Polygon has no rings".to_string(),
        ));
    };
    Ok(Geometry::Polygon {
        exterior: ring(exterior)?,
        interiors: interiors
            .iter()
            .map(|r| ring(r))
            .collect::<Result<_, _>>()?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geocontour::{GeometryType, Properties};

    fn square_geocontour() -> GeoContour {
        GeoContour::from_rings(
            vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 4.0),
                Point::new(0.0, 4.0),
            ],
            vec![vec![
                Point::new(1.0, 1.0),
                Point::new(2.0, 1.0),
                Point::new(2.0, 2.0),
                Point::new(1.0, 2.0),
            ]],
        )
        .unwrap()
    }

    #[test]
    fn collection_shape() {
        let features = vec![
            square_geocontour().export_feature(Properties {
                color: Some([0, 128, 255]),
                label: Some("cell".to_string()),
                ..Properties::default()
            }),
            GeoContour::from_rings(vec![Point::new(7.0, 8.0)], vec![])
                .unwrap()
                .export_feature(Properties::default()),
        ];
        let json = to_feature_collection(&features, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        let items = value["features"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "Feature");
        assert_eq!(items[0]["geometry"]["type"], "Polygon");
        assert_eq!(
            items[0]["properties"],
            serde_json::json!({"color": [0, 128, 255], "label": "cell"})
        );
        assert!(items[1]["properties"].is_null());
        assert_eq!(
            items[1]["geometry"],
            serde_json::json!({"type": "Point", "coordinates": [7.0, 8.0]})
        );
    }

    #[test]
    fn pretty_output_is_multiline() {
        let json = to_feature_collection(&[], true).unwrap();
        assert!(json.contains('\n'));
        assert_eq!(parse_geometries(&json).unwrap().len(), 0);
    }

    #[test]
    fn exported_geometry_reads_back_unchanged() {
        let gc = square_geocontour();
        let json = to_feature_json(&gc.export_feature(Properties::default())).unwrap();
        let geometries = parse_geometries(&json).unwrap();
        assert_eq!(geometries, vec![gc.export_geometry()]);
    }

    #[test]
    fn multi_geometries_are_flattened() {
        let json = r#"{
            "type": "GeometryCollection",
            "geometries": [
                {"type": "MultiPoint", "coordinates": [[0, 0], [1, 1, 5]]},
                {"type": "MultiLineString", "coordinates": [[[0, 0], [1, 0]], [[2, 2], [3, 3]]]},
                {"type": "MultiPolygon", "coordinates": [
                    [[[0, 0], [1, 0], [1, 1], [0, 0]]],
                    [[[5, 5], [6, 5], [6, 6], [5, 5]]]
                ]}
            ]
        }"#;
        let types: Vec<GeometryType> = parse_geometries(json)
            .unwrap()
            .iter()
            .map(Geometry::geometry_type)
            .collect();
        assert_eq!(
            types,
            vec![
                GeometryType::Point,
                GeometryType::Point,
                GeometryType::LineString,
                GeometryType::LineString,
                GeometryType::Polygon,
                GeometryType::Polygon,
            ]
        );
    }

    #[test]
    fn feature_collection_with_foreign_properties() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 3, "properties": {"area": 12.5},
                 "geometry": {"type": "Point", "coordinates": [2.5, 3.5]}},
                {"type": "Feature", "properties": null,
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
            ]
        }"#;
        let gcs = load_geocontours(json).unwrap();
        assert_eq!(gcs.len(), 2);
        assert_eq!(
            gcs[0].geometry(),
            &Geometry::Point(Point::new(2.5, 3.5))
        );
        assert_eq!(gcs[1].geometry_type(), GeometryType::LineString);
    }

    #[test]
    fn null_geometry_is_missing() {
        let json = r#"{"type": "Feature", "geometry": null, "properties": {}}"#;
        assert!(matches!(
            parse_geometries(json),
            Err(FormatError::MissingGeometry)
        ));
    }

    #[test]
    fn rejects_invalid_geometries() {
        let cases = [
            r#"{"type": "Point", "coordinates": [1]}"#,
            r#"{"type": "LineString", "coordinates": [[0, 0]]}"#,
            r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1]]]}"#,
            r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [0, 0]]]}"#,
            r#"{"type": "Polygon", "coordinates": []}"#,
            r#"{"type": "FeatureCollection", "features": [{"type": "Point", "coordinates": [0, 0]}]}"#,
        ];
        for case in cases {
            assert!(
                matches!(parse_geometries(case), Err(FormatError::InvalidGeometry(_))),
                "expected InvalidGeometry for {case}"
            );
        }
    }

    #[test]
    fn rejects_unknown_type_and_bad_json() {
        assert!(matches!(
            parse_geometries(r#"{"type": "Circle", "radius": 3}"#),
            Err(FormatError::Json(_))
        ));
        assert!(matches!(
            parse_geometries("not json"),
            Err(FormatError::Json(_))
        ));
    }

    #[test]
    fn non_finite_coordinates_fail_to_serialize() {
        let mut gc = GeoContour::from_rings(vec![Point::new(1.0, 1.0)], vec![]).unwrap();
        gc.scale_up(f64::INFINITY, Point::new(0.0, 0.0));
        let feature = gc.export_feature(Properties::default());
        assert!(matches!(
            to_feature_json(&feature),
            Err(FormatError::InvalidGeometry(_))
        ));

        let fine = GeoContour::from_rings(vec![Point::new(2.0, 2.0)], vec![])
            .unwrap()
            .export_feature(Properties::default());
        let err = to_feature_collection(&[fine, feature], false).unwrap_err();
        assert!(err.to_string().contains("feature 1"), "{err}");
    }
}

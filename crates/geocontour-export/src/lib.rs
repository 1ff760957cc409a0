//! geocontour-export: GeoJSON serialization and parsing (sans-IO).
//!
//! Writes geocontour features as GeoJSON `FeatureCollection` text and
//! reads any GeoJSON object back as basic geometries. No file access;
//! callers hand in and receive `String`s.

pub mod geojson;

pub use geojson::{
    FormatError, load_geocontours, parse_geometries, to_feature_collection, to_feature_json,
};

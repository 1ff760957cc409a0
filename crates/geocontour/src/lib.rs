//! geocontour: raster masks to polygon geometries (sans-IO).
//!
//! Converts a foreground/background mask into geometries that keep the
//! mask's topology: outer boundaries, holes, and islands inside holes.
//!
//! mask -> border tracing -> (curves, hierarchy) -> assembly (+ coordinate
//! transform) -> [`GeoContour`]s -> shape descriptors / export.
//!
//! Two coordinate conventions are supported. [`CoordinateMode::PixelCenter`]
//! keeps the traced pixel centers; [`CoordinateMode::PixelBoundary`]
//! follows the pixel edges, so a single pixel becomes a unit square and a
//! `w x h` block encloses exactly `w * h`.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory byte
//! slices and images; GeoJSON text lives in `geocontour-export` and the
//! filesystem in `geocontour-cli`.

pub mod assemble;
pub mod descriptors;
pub mod diagnostics;
pub mod geocontour;
pub mod hierarchy;
pub mod mask;
pub mod trace;
pub mod transform;
pub mod types;

pub use assemble::assemble;
pub use descriptors::ShapeDescriptors;
pub use geocontour::GeoContour;
pub use hierarchy::{Hierarchy, HierarchyNode};
pub use trace::{ContourTracer, ContourTracerKind, TracedContours};
pub use transform::{CoordinateMode, RingRole};
pub use types::{
    Circle, ConversionConfig, ConversionResult, Curve, Dimensions, Feature, GeoContourError,
    Geometry, GeometryType, GrayImage, Point, Properties,
};

/// Trace `mask` (any nonzero pixel is foreground) and assemble the
/// result in `mode`.
///
/// # Errors
///
/// Returns [`GeoContourError::MalformedHierarchy`] if the tracer reports
/// inconsistent nesting.
pub fn find_geocontours(
    mask: &GrayImage,
    mode: CoordinateMode,
) -> Result<Vec<GeoContour>, GeoContourError> {
    find_geocontours_with_threshold(mask, 0, mode)
}

/// Like [`find_geocontours`], with pixels strictly above `threshold`
/// counted as foreground.
///
/// # Errors
///
/// Returns [`GeoContourError::MalformedHierarchy`] if the tracer reports
/// inconsistent nesting.
pub fn find_geocontours_with_threshold(
    mask: &GrayImage,
    threshold: u8,
    mode: CoordinateMode,
) -> Result<Vec<GeoContour>, GeoContourError> {
    let traced = ContourTracerKind::default().trace(mask, threshold)?;
    assemble(&traced.curves, &traced.hierarchy, mode)
}

/// Convert an encoded mask image into geocontours.
///
/// # Steps
///
/// 1. Decode the image and reduce it to one channel
/// 2. Trace outer and hole borders with their nesting
/// 3. Assemble one geocontour per fill region in `config.mode`
/// 4. Optionally remove holes up to `config.fill_holes`
///
/// An all-background mask yields an empty result, not an error.
///
/// # Errors
///
/// Returns [`GeoContourError::InvalidConfig`] if the config fails
/// validation, [`GeoContourError::EmptyInput`] if `image_bytes` is empty,
/// and [`GeoContourError::ImageDecode`] if the format is unrecognized.
pub fn process(
    image_bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionResult, GeoContourError> {
    config.validate()?;

    // 1. Decode.
    let mask = mask::decode_mask(image_bytes)?;
    let dimensions = Dimensions {
        width: mask.width(),
        height: mask.height(),
    };

    // 2-3. Trace and assemble.
    let mut geocontours =
        find_geocontours_with_threshold(&mask, config.foreground_threshold, config.mode)?;

    // 4. Optional hole removal.
    if let Some(hole_size) = config.fill_holes {
        for gc in &mut geocontours {
            gc.fill_hole(config.resolution, Some(hole_size));
        }
    }

    Ok(ConversionResult {
        geocontours,
        dimensions,
    })
}

//! Group traced curves into geometries by nesting depth.
//!
//! A curve at even depth bounds a fill region (an outer boundary, or an
//! island inside a hole). A curve at odd depth is a hole in its parent.
//! Each even-depth curve becomes one [`GeoContour`] whose interior rings
//! are its odd-depth children; even-depth grandchildren are emitted as
//! separate contours of their own.

use crate::geocontour::GeoContour;
use crate::hierarchy::Hierarchy;
use crate::transform::{CoordinateMode, RingRole};
use crate::types::{Curve, GeoContourError, Point};

/// Assemble curves into geocontours, one per even-depth node, in the
/// hierarchy's pre-order.
///
/// # Errors
///
/// Returns [`GeoContourError::MalformedHierarchy`] if `hierarchy` does
/// not describe a forest over exactly `curves.len()` nodes, and
/// [`GeoContourError::EmptyCurve`] if a curve has no points. Either error
/// aborts the whole call; no partial output is returned.
pub fn assemble(
    curves: &[Curve],
    hierarchy: &Hierarchy,
    mode: CoordinateMode,
) -> Result<Vec<GeoContour>, GeoContourError> {
    if curves.len() != hierarchy.len() {
        return Err(GeoContourError::MalformedHierarchy(format!(
            "{} curves but {} hierarchy nodes",
            curves.len(),
            hierarchy.len()
        )));
    }
    if let Some(index) = curves.iter().position(Curve::is_empty) {
        return Err(GeoContourError::EmptyCurve { index });
    }

    let order = hierarchy.walk()?;

    order
        .into_iter()
        .filter(|&(_, depth)| depth % 2 == 0)
        .map(|(index, _)| {
            let exterior = ring(&curves[index], mode, RingRole::Exterior);
            let interiors = hierarchy
                .children(index)
                .map(|child| ring(&curves[child], mode, RingRole::Interior))
                .collect();
            GeoContour::from_rings(exterior, interiors)
        })
        .collect()
}

fn ring(curve: &Curve, mode: CoordinateMode, role: RingRole) -> Vec<Point> {
    mode.apply(curve, role).into_points()
}

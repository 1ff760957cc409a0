//! Contour tracing: extract boundary curves and their nesting from a
//! binary mask.
//!
//! This module defines the [`ContourTracer`] trait for pluggable tracing
//! algorithms and the [`ContourTracerKind`] enum for selecting one at
//! runtime. Every tracer reports curves as pixel-center chains, reduced to
//! the points where the chain turns, plus a [`Hierarchy`] with one node
//! per curve.

use image::GrayImage;
use imageproc::contours::Contour;
use imageproc::point::Point as GridPoint;

use crate::hierarchy::Hierarchy;
use crate::types::{Curve, GeoContourError, Point};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via
    /// `imageproc::contours::find_contours_with_threshold`.
    ///
    /// Outer borders and hole borders alternate with depth, and every
    /// border reports its enclosing border as parent.
    #[default]
    BorderFollowing,
}

/// Flat curve list plus nesting, as produced by a tracer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TracedContours {
    pub curves: Vec<Curve>,
    pub hierarchy: Hierarchy,
}

impl TracedContours {
    /// Number of traced curves.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.curves.len()
    }

    /// Returns `true` if nothing was traced.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Trait for contour tracing strategies.
///
/// Input: a mask where pixels strictly above `threshold` are foreground.
/// Output: every outer and hole border, with their nesting.
pub trait ContourTracer {
    /// Trace the borders of the given mask.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::MalformedHierarchy`] if the tracer
    /// reports parent links that do not form a forest.
    fn trace(&self, mask: &GrayImage, threshold: u8) -> Result<TracedContours, GeoContourError>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, mask: &GrayImage, threshold: u8) -> Result<TracedContours, GeoContourError> {
        match *self {
            Self::BorderFollowing => trace_border_following(mask, threshold),
        }
    }
}

/// Suzuki-Abe border following via `imageproc`.
///
/// Converts `imageproc` contour points (integer grid coordinates) into
/// floating-point [`Point`]s and parent indices into a [`Hierarchy`].
fn trace_border_following(
    mask: &GrayImage,
    threshold: u8,
) -> Result<TracedContours, GeoContourError> {
    let contours: Vec<Contour<u32>> =
        imageproc::contours::find_contours_with_threshold(mask, threshold);

    let parents: Vec<Option<usize>> = contours.iter().map(|c| c.parent).collect();
    let hierarchy = Hierarchy::from_parents(&parents)?;

    let curves = contours
        .into_iter()
        .map(|c| {
            compress_chain(&c.points)
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .collect();

    Ok(TracedContours { curves, hierarchy })
}

/// Keep only the points where a closed chain changes direction.
///
/// A point whose incoming and outgoing steps are equal sits inside a
/// straight (axis or diagonal) run and is dropped. A one-pixel-wide
/// straight line, traced out and back, reduces to its two end pixels.
fn compress_chain(points: &[GridPoint<u32>]) -> Vec<GridPoint<u32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |from: usize, to: usize| {
        (
            i64::from(points[to].x) - i64::from(points[from].x),
            i64::from(points[to].y) - i64::from(points[from].y),
        )
    };
    let corners: Vec<_> = (0..n)
        .filter(|&i| step((i + n - 1) % n, i) != step(i, (i + 1) % n))
        .map(|i| points[i])
        .collect();
    if corners.is_empty() {
        points.to_vec()
    } else {
        corners
    }
}

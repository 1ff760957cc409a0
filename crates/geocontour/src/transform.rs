//! Coordinate conventions for traced curves.
//!
//! Tracers report boundaries as chains of pixel *centers*. That is the
//! [`CoordinateMode::PixelCenter`] convention and needs no work. The
//! [`CoordinateMode::PixelBoundary`] convention instead follows the cell
//! edges between foreground and background, where pixel `(x, y)` covers
//! the square `[x, x + 1] x [y, y + 1]`.
//!
//! # Corner selection
//!
//! Walking a ring with the background on the left, each pixel sees its
//! predecessor in direction `a` and its successor in direction `b`
//! (Moore neighbourhood, numbered clockwise on screen starting east).
//! The neighbours swept clockwise strictly between `a` and `b` are
//! background, and the 4-connected ones among them are exactly the cell
//! edges this pixel contributes to the boundary. Emitting the start
//! corner of each such edge, in sweep order, chains into a closed
//! polygon:
//!
//! - a straight run contributes one edge per pixel (collinear corners are
//!   merged afterwards);
//! - a convex turn sweeps two or three edges around the outer corner;
//! - a concave turn sweeps no edge, so the outer corner of the
//!   neighbouring cells is used rather than the pixel center;
//! - a spur tip (`a == b`) sweeps all the way round.
//!
//! Rings that run the other way are reversed first and restored after.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Curve, GeoContourError, Point};

/// Selects which coordinate convention the assembler emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateMode {
    /// Vertices at pixel centers, exactly as traced.
    #[default]
    #[serde(alias = "opencv")]
    PixelCenter,

    /// Vertices at pixel corners, following the true cell edges.
    #[serde(alias = "imagej")]
    PixelBoundary,
}

impl CoordinateMode {
    /// The mode's name as used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PixelCenter => "pixel_center",
            Self::PixelBoundary => "pixel_boundary",
        }
    }

    /// Convert one curve into this mode's coordinates.
    #[must_use]
    pub fn apply(self, curve: &Curve, role: RingRole) -> Curve {
        match self {
            Self::PixelCenter => identity(curve),
            Self::PixelBoundary => to_pixel_boundary(curve, role),
        }
    }
}

impl fmt::Display for CoordinateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoordinateMode {
    type Err = GeoContourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pixel_center" | "opencv" => Ok(Self::PixelCenter),
            "pixel_boundary" | "imagej" => Ok(Self::PixelBoundary),
            other => Err(GeoContourError::InvalidConfig(format!(
                "unknown coordinate mode {other:?}, expected pixel_center or pixel_boundary"
            ))),
        }
    }
}

/// Which side of a ring the foreground lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingRole {
    /// Outer border of a fill region: background outside the ring.
    Exterior,
    /// Border of a hole: background inside the ring.
    Interior,
}

/// Pixel-center mode: the curve's points, unchanged.
#[must_use]
pub fn identity(curve: &Curve) -> Curve {
    curve.clone()
}

/// Moore neighbourhood steps, clockwise on screen (y grows downward),
/// starting east. Even indices are the 4-connected directions.
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Pixel-boundary mode: trace the cell edges around the curve's pixels.
///
/// Returns an open ring (no repeated closing point) with collinear
/// corners merged. A single pixel becomes its unit square, starting at
/// the top-left corner and running down the left edge first. Steps longer
/// than one pixel are filled in along their axis or diagonal, so
/// run-length compressed chains give the same result as full ones.
///
/// Axis-aligned runs cost the same whatever their length. Diagonal runs
/// are walked cell by cell, since each cell adds a staircase step to the
/// output. Coordinates are clamped to `±2^53`.
#[must_use]
pub fn to_pixel_boundary(curve: &Curve, role: RingRole) -> Curve {
    let mut cells = lattice_ring(curve.points());

    if cells.len() <= 1 {
        return cells
            .first()
            .map(|&(x, y)| unit_square(x, y))
            .unwrap_or_default();
    }

    // Zero-area chains (one-pixel-wide lines and trees) carry no winding of
    // their own; they are taken to run counter-clockwise on screen, the way
    // border following emits outer borders.
    let twice_area = twice_signed_area(&cells);
    let background_on_left = match role {
        RingRole::Exterior => twice_area > 0,
        RingRole::Interior => twice_area <= 0,
    };
    if !background_on_left {
        reverse_keeping_start(&mut cells);
    }

    let mut corners = Vec::with_capacity(cells.len() * 2);
    let n = cells.len();
    for i in 0..n {
        let cell = cells[i];
        let prev = cells[(i + n - 1) % n];
        let next = cells[(i + 1) % n];
        let from = direction_index(prev.0 - cell.0, prev.1 - cell.1);
        let to = direction_index(next.0 - cell.0, next.1 - cell.1);
        for step in 1..8 {
            let d = (from + step) % 8;
            if d == to {
                break;
            }
            if d % 2 == 0 {
                corners.push(edge_start(cell, d));
            }
        }
    }

    let mut ring = merge_collinear(&corners);
    if !background_on_left {
        reverse_keeping_start(&mut ring);
    }

    ring.into_iter().map(lattice_point).collect()
}

#[allow(clippy::cast_precision_loss)]
const fn lattice_point((x, y): (i64, i64)) -> Point {
    Point::new(x as f64, y as f64)
}

/// Largest lattice coordinate magnitude; every integer up to here is exact
/// in `f64`.
const LATTICE_LIMIT: i64 = 1 << 53;

#[allow(clippy::cast_possible_truncation)]
fn to_lattice(v: f64) -> i64 {
    (v.round() as i64).clamp(-LATTICE_LIMIT, LATTICE_LIMIT)
}

/// Round to lattice points, fill in long steps, and drop repeats
/// (including a closing point equal to the first).
fn lattice_ring(points: &[Point]) -> Vec<(i64, i64)> {
    let rounded: Vec<(i64, i64)> = points
        .iter()
        .map(|p| (to_lattice(p.x), to_lattice(p.y)))
        .collect();

    let mut cells: Vec<(i64, i64)> = Vec::with_capacity(rounded.len());
    for (i, &target) in rounded.iter().enumerate() {
        if i == 0 {
            cells.push(target);
            continue;
        }
        step_towards(&mut cells, target);
    }
    // Close the loop so the last-to-first step is unit length too.
    if let Some(&first) = cells.first() {
        step_towards(&mut cells, first);
        if cells.len() > 1 && cells.last() == Some(&first) {
            cells.pop();
        }
    }
    cells
}

/// Append cells from the last one until `target` is reached. Moves
/// diagonally one cell at a time while both axes differ, then straight.
///
/// Of a straight run only the first, second, second-to-last and last
/// cells are kept. Every cell in between sees the same neighbour
/// directions, so its corner lies on the edge joining the kept ones.
fn step_towards(cells: &mut Vec<(i64, i64)>, target: (i64, i64)) {
    let Some(&(mut x, mut y)) = cells.last() else {
        return;
    };
    let (sx, sy) = ((target.0 - x).signum(), (target.1 - y).signum());
    let diagonal = (target.0 - x).abs().min((target.1 - y).abs());
    for _ in 0..diagonal {
        x += sx;
        y += sy;
        cells.push((x, y));
    }

    let (sx, sy) = ((target.0 - x).signum(), (target.1 - y).signum());
    let run = (target.0 - x).abs().max((target.1 - y).abs());
    if run == 0 {
        return;
    }
    let mut kept = [1, run - 1, run];
    kept.sort_unstable();
    let mut last = 0;
    for k in kept {
        if k > last {
            cells.push((x + sx * k, y + sy * k));
            last = k;
        }
    }
}

fn direction_index(dx: i64, dy: i64) -> usize {
    DIRECTIONS
        .iter()
        .position(|&d| d == (dx.signum(), dy.signum()))
        .unwrap_or(0)
}

/// Start corner of the cell edge facing direction `d`, walking the cell
/// clockwise on screen: north edge left-to-right, east edge downward,
/// south edge right-to-left, west edge upward.
const fn edge_start((x, y): (i64, i64), d: usize) -> (i64, i64) {
    match d {
        0 => (x + 1, y),
        2 => (x + 1, y + 1),
        4 => (x, y + 1),
        _ => (x, y),
    }
}

fn unit_square(x: i64, y: i64) -> Curve {
    Curve::new(vec![
        lattice_point((x, y)),
        lattice_point((x, y + 1)),
        lattice_point((x + 1, y + 1)),
        lattice_point((x + 1, y)),
    ])
}

fn twice_signed_area(ring: &[(i64, i64)]) -> i128 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            i128::from(x0) * i128::from(y1) - i128::from(x1) * i128::from(y0)
        })
        .sum()
}

/// Reverse traversal order while keeping the first vertex first.
fn reverse_keeping_start<T>(ring: &mut [T]) {
    if ring.len() > 2 {
        ring[1..].reverse();
    }
}

/// Drop repeated corners and corners that sit in the middle of a straight
/// edge, treating the input as a closed ring.
fn merge_collinear(corners: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut deduped: Vec<(i64, i64)> = Vec::with_capacity(corners.len());
    for &c in corners {
        if deduped.last() != Some(&c) {
            deduped.push(c);
        }
    }
    while deduped.len() > 1 && deduped.first() == deduped.last() {
        deduped.pop();
    }

    let n = deduped.len();
    if n < 3 {
        return deduped;
    }
    (0..n)
        .filter(|&i| {
            let (px, py) = deduped[(i + n - 1) % n];
            let (cx, cy) = deduped[i];
            let (nx, ny) = deduped[(i + 1) % n];
            let (ux, uy) = (i128::from(cx - px), i128::from(cy - py));
            let (vx, vy) = (i128::from(nx - cx), i128::from(ny - cy));
            let cross = ux * vy - uy * vx;
            let dot = ux * vx + uy * vy;
            cross != 0 || dot <= 0
        })
        .map(|i| deduped[i])
        .collect()
}

//! Conversion diagnostics: timing, counts, and other metrics for each stage.
//!
//! Every call to [`process_with_diagnostics`] collects diagnostics
//! alongside the conversion result. Timestamps come from a caller-supplied
//! [`Clock`] so the core stays free of platform time sources.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assemble::assemble;
use crate::geocontour::GeoContour;
use crate::mask::{decode_mask, foreground_pixel_count};
use crate::trace::{ContourTracer, ContourTracerKind, TracedContours};
use crate::types::{
    ConversionConfig, ConversionResult, Curve, Dimensions, GeoContourError, GeometryType,
};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single conversion.
///
/// Stages that are conditionally skipped have `Option` fields that are
/// `None` when the stage was not executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: border tracing.
    pub tracing: StageDiagnostics,
    /// Stage 2: hierarchy walk and geometry assembly.
    pub assembly: StageDiagnostics,
    /// Stage 3: hole removal (only when `config.fill_holes` is set).
    pub hole_filling: Option<StageDiagnostics>,
    /// Total wall-clock duration of the conversion (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: ConversionSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
        /// Pixels above the foreground threshold.
        foreground_pixel_count: u64,
    },
    /// Border tracing metrics.
    Tracing {
        /// Number of curves (outer and hole borders).
        curve_count: usize,
        /// Total number of points across all curves.
        total_point_count: usize,
        /// Minimum points in any single curve.
        min_curve_points: usize,
        /// Maximum points in any single curve.
        max_curve_points: usize,
        /// Mean points per curve.
        mean_curve_points: f64,
    },
    /// Geometry assembly metrics.
    Assembly {
        /// Coordinate mode used.
        mode: String,
        /// Polygons emitted.
        polygon_count: usize,
        /// Line strings emitted.
        line_string_count: usize,
        /// Points emitted.
        point_count: usize,
        /// Interior rings across all polygons.
        hole_count: usize,
    },
    /// Hole removal metrics.
    HoleFilling {
        /// Size limit; `None` or negative removes every hole.
        hole_size: Option<f64>,
        /// Interior rings before removal.
        holes_before: usize,
        /// Interior rings after removal.
        holes_after: usize,
    },
}

/// High-level summary counts for the conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of traced curves.
    pub curve_count: usize,
    /// Number of geocontours in the result.
    pub geocontour_count: usize,
    /// Interior rings in the result.
    pub hole_count: usize,
}

impl ConversionDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Conversion Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![
            ("Decode", &self.decode),
            ("Tracing", &self.tracing),
            ("Assembly", &self.assembly),
        ];
        if let Some(ref fill) = self.hole_filling {
            stages.push(("Hole Filling", fill));
        }

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Curves: {}  |  Geocontours: {}  |  Holes: {}",
            self.summary.curve_count, self.summary.geocontour_count, self.summary.hole_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            pixel_count,
            foreground_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let coverage = if *pixel_count > 0 {
                *foreground_pixel_count as f64 / *pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("{input_bytes} bytes -> {width}x{height} fg={foreground_pixel_count} ({coverage:.1}%)")
        }
        StageMetrics::Tracing {
            curve_count,
            total_point_count,
            min_curve_points,
            max_curve_points,
            mean_curve_points,
        } => {
            format!(
                "{curve_count} curves, {total_point_count} pts (min={min_curve_points} max={max_curve_points} mean={mean_curve_points:.1})",
            )
        }
        StageMetrics::Assembly {
            mode,
            polygon_count,
            line_string_count,
            point_count,
            hole_count,
        } => {
            format!(
                "{mode} polygons={polygon_count} lines={line_string_count} points={point_count} holes={hole_count}",
            )
        }
        StageMetrics::HoleFilling {
            hole_size,
            holes_before,
            holes_after,
        } => {
            let limit = hole_size.map_or_else(|| "all".to_string(), |s| format!("<={s}"));
            format!("size={limit} holes={holes_before}->{holes_after}")
        }
    }
}

/// Statistics for a set of traced curves.
pub(crate) struct CurveStats {
    pub total: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

/// Compute point-count statistics over traced curves.
pub(crate) fn curve_stats(curves: &[Curve]) -> CurveStats {
    let total: usize = curves.iter().map(Curve::len).sum();
    let min = curves.iter().map(Curve::len).min().unwrap_or(0);
    let max = curves.iter().map(Curve::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if curves.is_empty() {
        0.0
    } else {
        total as f64 / curves.len() as f64
    };
    CurveStats {
        total,
        min,
        max,
        mean,
    }
}

/// Interior rings across a set of geocontours.
pub(crate) fn total_holes(geocontours: &[GeoContour]) -> usize {
    geocontours.iter().map(GeoContour::holes_num).sum()
}

fn count_type(geocontours: &[GeoContour], kind: GeometryType) -> usize {
    geocontours
        .iter()
        .filter(|gc| gc.geometry_type() == kind)
        .count()
}

/// Run [`process`](crate::process) and time each stage with `clock`.
///
/// # Errors
///
/// Same as [`process`](crate::process).
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &ConversionConfig,
    clock: &C,
) -> Result<(ConversionResult, ConversionDiagnostics), GeoContourError> {
    config.validate()?;
    let start = clock.now();

    // Decode.
    let t = clock.now();
    let mask = decode_mask(image_bytes)?;
    let dimensions = Dimensions {
        width: mask.width(),
        height: mask.height(),
    };
    let pixel_count = u64::from(dimensions.width) * u64::from(dimensions.height);
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
            pixel_count,
            foreground_pixel_count: foreground_pixel_count(&mask, config.foreground_threshold),
        },
    };

    // Tracing.
    let t = clock.now();
    let TracedContours { curves, hierarchy } =
        ContourTracerKind::default().trace(&mask, config.foreground_threshold)?;
    let duration = clock.elapsed(&t);
    let stats = curve_stats(&curves);
    let tracing = StageDiagnostics {
        duration,
        metrics: StageMetrics::Tracing {
            curve_count: curves.len(),
            total_point_count: stats.total,
            min_curve_points: stats.min,
            max_curve_points: stats.max,
            mean_curve_points: stats.mean,
        },
    };

    // Assembly.
    let t = clock.now();
    let mut geocontours = assemble(&curves, &hierarchy, config.mode)?;
    let duration = clock.elapsed(&t);
    let holes_before = total_holes(&geocontours);
    let assembly = StageDiagnostics {
        duration,
        metrics: StageMetrics::Assembly {
            mode: config.mode.to_string(),
            polygon_count: count_type(&geocontours, GeometryType::Polygon),
            line_string_count: count_type(&geocontours, GeometryType::LineString),
            point_count: count_type(&geocontours, GeometryType::Point),
            hole_count: holes_before,
        },
    };

    // Optional hole removal.
    let hole_filling = config.fill_holes.map(|hole_size| {
        let t = clock.now();
        for gc in &mut geocontours {
            gc.fill_hole(config.resolution, Some(hole_size));
        }
        StageDiagnostics {
            duration: clock.elapsed(&t),
            metrics: StageMetrics::HoleFilling {
                hole_size: Some(hole_size),
                holes_before,
                holes_after: total_holes(&geocontours),
            },
        }
    });

    let summary = ConversionSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count,
        curve_count: curves.len(),
        geocontour_count: geocontours.len(),
        hole_count: total_holes(&geocontours),
    };

    let diagnostics = ConversionDiagnostics {
        decode,
        tracing,
        assembly,
        hole_filling,
        total_duration: clock.elapsed(&start),
        summary,
    };

    Ok((
        ConversionResult {
            geocontours,
            dimensions,
        },
        diagnostics,
    ))
}

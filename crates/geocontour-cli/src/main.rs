//! geocontour: convert raster masks to GeoJSON and measure the shapes.
//!
//! # Usage
//!
//! ```text
//! geocontour convert [OPTIONS] <MASK_PATH>
//! geocontour describe [OPTIONS] <GEOJSON_PATH>
//! ```
//!
//! `convert` traces every foreground region of a mask image and writes a
//! GeoJSON `FeatureCollection` (stdout unless `--output` is given).
//! `describe` reads any GeoJSON file and prints the shape descriptors of
//! each geometry in it.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use geocontour::diagnostics::Clock;
use geocontour::{ConversionConfig, CoordinateMode, Properties, ShapeDescriptors};

/// Convert raster masks into GeoJSON polygons with holes and islands.
#[derive(Parser)]
#[command(name = "geocontour", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trace a mask image and write a GeoJSON feature collection.
    Convert(ConvertArgs),
    /// Print shape descriptors for every geometry in a GeoJSON file.
    Describe(DescribeArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Path to the mask image (PNG, JPEG, BMP, WebP, TIFF).
    mask_path: PathBuf,

    /// Coordinate convention for the output vertices: `pixel_center`
    /// (alias `opencv`) or `pixel_boundary` (alias `imagej`).
    #[arg(long, value_parser = parse_mode, default_value_t = ConversionConfig::DEFAULT_MODE)]
    mode: CoordinateMode,

    /// Pixels strictly above this value are foreground.
    #[arg(long, default_value_t = ConversionConfig::DEFAULT_FOREGROUND_THRESHOLD)]
    threshold: u8,

    /// Physical size of one pixel, used for hole-size comparisons.
    #[arg(long, default_value_t = ConversionConfig::DEFAULT_RESOLUTION)]
    resolution: f64,

    /// Remove holes with scaled area up to this size (negative removes all).
    #[arg(long, allow_negative_numbers = true)]
    fill_holes: Option<f64>,

    /// Feature color as `r,g,b`.
    #[arg(long, value_parser = parse_color)]
    color: Option<[u8; 3]>,

    /// Feature label.
    #[arg(long)]
    label: Option<String>,

    /// Feature name.
    #[arg(long)]
    name: Option<String>,

    /// Write GeoJSON to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Indent the GeoJSON output.
    #[arg(long)]
    pretty: bool,

    /// Print per-stage diagnostics to stderr.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long, requires = "diagnostics")]
    json: bool,

    /// Full conversion config as a JSON string.
    ///
    /// When provided, `--mode`, `--threshold`, `--resolution`, and
    /// `--fill-holes` are ignored. The JSON must be a valid
    /// `ConversionConfig` serialization; missing fields take defaults.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Args)]
struct DescribeArgs {
    /// Path to a GeoJSON file (any object type).
    geojson_path: PathBuf,

    /// Physical size of one pixel; areas are scaled by its square.
    #[arg(long, default_value_t = ConversionConfig::DEFAULT_RESOLUTION)]
    resolution: f64,

    /// Print descriptors as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

/// Parse a mode name with [`CoordinateMode`]'s own names and aliases.
fn parse_mode(s: &str) -> Result<CoordinateMode, String> {
    s.parse().map_err(|e: geocontour::GeoContourError| e.to_string())
}

/// Parse `r,g,b` into a color triple.
fn parse_color(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("expected r,g,b, got {s:?}"));
    };
    let channel = |v: &str| {
        v.parse::<u8>()
            .map_err(|e| format!("invalid color channel {v:?}: {e}"))
    };
    Ok([channel(r)?, channel(g)?, channel(b)?])
}

/// Build a [`ConversionConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual conversion flags are ignored.
fn config_from_cli(args: &ConvertArgs) -> Result<ConversionConfig, String> {
    let config = if let Some(ref json) = args.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        ConversionConfig {
            mode: args.mode,
            foreground_threshold: args.threshold,
            resolution: args.resolution,
            fill_holes: args.fill_holes,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Convert(args) => convert(&args),
        Command::Describe(args) => describe(&args),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))
}

fn convert(args: &ConvertArgs) -> Result<(), String> {
    let config = config_from_cli(args)?;
    let image_bytes = read_file(&args.mask_path)?;

    eprintln!(
        "Mask: {} ({} bytes)",
        args.mask_path.display(),
        image_bytes.len(),
    );
    eprintln!("Config: {config:?}");

    let (result, diagnostics) =
        geocontour::diagnostics::process_with_diagnostics(&image_bytes, &config, &StdClock)
            .map_err(|e| format!("Conversion error: {e}"))?;

    if args.diagnostics {
        if args.json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            eprintln!("{json}");
        } else {
            eprintln!("{}", diagnostics.report());
        }
    }

    let properties = Properties {
        color: args.color,
        label: args.label.clone(),
        name: args.name.clone(),
    };
    let features: Vec<_> = result
        .geocontours
        .iter()
        .map(|gc| gc.export_feature(properties.clone()))
        .collect();
    let geojson = geocontour_export::to_feature_collection(&features, args.pretty)
        .map_err(|e| format!("Error serializing GeoJSON: {e}"))?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &geojson)
                .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
            eprintln!(
                "{} features written to {} ({} bytes)",
                features.len(),
                path.display(),
                geojson.len(),
            );
        }
        None => println!("{geojson}"),
    }
    Ok(())
}

fn describe(args: &DescribeArgs) -> Result<(), String> {
    if !args.resolution.is_finite() || args.resolution <= 0.0 {
        return Err(format!(
            "resolution must be finite and positive, got {}",
            args.resolution
        ));
    }
    let bytes = read_file(&args.geojson_path)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| format!("{} is not UTF-8: {e}", args.geojson_path.display()))?;
    let geocontours = geocontour_export::load_geocontours(&text)
        .map_err(|e| format!("Error reading {}: {e}", args.geojson_path.display()))?;

    let rows: Vec<(String, ShapeDescriptors)> = geocontours
        .iter()
        .map(|gc| (gc.geometry_type().to_string(), gc.describe(args.resolution)))
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(
            &rows.iter().map(|(_, d)| d).collect::<Vec<_>>(),
        )
        .map_err(|e| format!("Error serializing descriptors: {e}"))?;
        println!("{json}");
    } else {
        print_descriptor_table(&rows);
    }
    Ok(())
}

/// Format an optional descriptor, `-` when undefined.
fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn print_descriptor_table(rows: &[(String, ShapeDescriptors)]) {
    println!(
        "{:>4} {:<10} {:>12} {:>5} {:>11} {:>9} {:>9} {:>10} {:>10}",
        "#", "Type", "Area", "Holes", "Circularity", "Solidity", "Aspect", "Elongation", "MEC r",
    );
    println!("{}", "-".repeat(88));
    for (i, (kind, d)) in rows.iter().enumerate() {
        println!(
            "{:>4} {:<10} {:>12.3} {:>5} {:>11} {:>9} {:>9} {:>10} {:>10}",
            i,
            kind,
            d.area,
            d.holes,
            cell(d.circularity),
            cell(d.solidity),
            cell(d.aspect_ratio),
            cell(d.elongation),
            cell(d.min_enclosing_circle.map(|c| c.radius)),
        );
    }
    println!();
    println!("Geometries: {}", rows.len());
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

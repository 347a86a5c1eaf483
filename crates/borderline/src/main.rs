//! borderline: find the shortest shared border in a polygon dataset and map it.
//!
//! Reads a GeoJSON `FeatureCollection`, measures every shared border
//! between neighbouring features in a metric projection, and reports the
//! shortest one strictly longer than `--min-length`. The result is drawn
//! as an SVG or PNG figure (chosen by the output extension).
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin borderline -- [OPTIONS] <INPUT>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use borderline_core::{AnalysisConfig, Crs, SystemClock, analyze_with_diagnostics};
use borderline_export::{FigureConfig, ImageFormat, MapFigure};
use clap::{Parser, ValueEnum};

/// Find the shortest shared border between neighbouring regions.
///
/// Prints a one-line summary and the elapsed time on stdout, per-stage
/// diagnostics on stderr, and writes a map figure of the result.
#[derive(Parser)]
#[command(name = "borderline", version)]
struct Cli {
    /// Path to the input GeoJSON FeatureCollection.
    input: PathBuf,

    /// Borders must be strictly longer than this, in units of the
    /// computation reference.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_MIN_LENGTH)]
    min_length: f64,

    /// Reference the input coordinates are in, unless the file declares one.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_SOURCE_CRS)]
    source_crs: Crs,

    /// Reference lengths are measured in.
    #[arg(long = "crs", default_value_t = AnalysisConfig::DEFAULT_COMPUTATION_CRS)]
    computation_crs: Crs,

    /// Reference the figure is drawn in.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_DISPLAY_CRS)]
    display_crs: Crs,

    /// Feature property holding the name (repeatable; tried in order).
    #[arg(long = "name-property")]
    name_properties: Vec<String>,

    /// Pair enumeration strategy.
    #[arg(long, value_enum, default_value_t = Visit::Ordered)]
    pair_visit: Visit,

    /// Output image path (.svg or .png).
    #[arg(short, long, default_value = "out/shortest_border.png")]
    output: PathBuf,

    /// Image width in pixels.
    #[arg(long, default_value_t = FigureConfig::DEFAULT_WIDTH)]
    width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = FigureConfig::DEFAULT_HEIGHT)]
    height: u32,

    /// Margin around the border in the main map, in display units.
    #[arg(long, default_value_t = FigureConfig::DEFAULT_BUFFER)]
    buffer: f64,

    /// Do not draw the zoomed inset.
    #[arg(long)]
    no_inset: bool,

    /// Do not write a figure.
    #[arg(long)]
    no_figure: bool,

    /// Output results and diagnostics as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Full analysis config as a JSON string.
    ///
    /// When provided, all other analysis flags are ignored. The JSON must
    /// be a valid `AnalysisConfig` serialization; missing fields take
    /// their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Pair enumeration strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Visit {
    /// Visit (A, B) and (B, A) separately.
    Ordered,
    /// Visit each unordered pair once.
    Unordered,
}

/// Build an [`AnalysisConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual analysis flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<AnalysisConfig, String> {
    let config: AnalysisConfig = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            min_length: cli.min_length,
            source_crs: cli.source_crs,
            computation_crs: cli.computation_crs,
            display_crs: cli.display_crs,
            name_properties: if cli.name_properties.is_empty() {
                defaults.name_properties
            } else {
                cli.name_properties.clone()
            },
            pair_visit: match cli.pair_visit {
                Visit::Ordered => borderline_core::PairVisit::Ordered,
                Visit::Unordered => borderline_core::PairVisit::Unordered,
            },
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Build a [`FigureConfig`] from CLI arguments.
fn figure_config_from_cli(cli: &Cli) -> Result<FigureConfig, String> {
    let config = FigureConfig {
        width: cli.width,
        height: cli.height,
        buffer: cli.buffer,
        inset: !cli.no_inset,
        ..FigureConfig::default()
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let started = Instant::now();

    let (config, figure_config) = match (config_from_cli(&cli), figure_config_from_cli(&cli)) {
        (Ok(c), Ok(f)) => (c, f),
        (Err(msg), _) | (_, Err(msg)) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let format = if cli.no_figure {
        None
    } else {
        match ImageFormat::from_path(&cli.output) {
            Ok(f) => Some(f),
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let text = match std::fs::read_to_string(&cli.input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Input: {} ({} bytes)", cli.input.display(), text.len());
    eprintln!("Config: {config:#?}");
    eprintln!();

    let (analysis, diagnostics) = match analyze_with_diagnostics(&text, &config, &SystemClock) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Analysis error: {e}");
            return ExitCode::FAILURE;
        }
    };

    for skipped in &analysis.scan.skipped {
        eprintln!(
            "Skipped pair ({}, {}): {}",
            skipped.a, skipped.b, skipped.error
        );
    }

    if let Some(format) = format {
        let figure = MapFigure::from_analysis(&analysis);
        if let Err(msg) = write_figure(&figure, &figure_config, format, &cli.output) {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    }

    let elapsed = started.elapsed().as_secs_f64();

    if cli.json {
        let names = analysis.names();
        let output = serde_json::json!({
            "summary": analysis.summary(),
            "entity_a": names.map(|(a, _)| a),
            "entity_b": names.map(|(_, b)| b),
            "length": analysis.best.winner().map(|w| w.length),
            "unit": analysis.computation_crs.unit(),
            "load": analysis.load,
            "scan": analysis.scan,
            "diagnostics": diagnostics,
            "elapsed_seconds": elapsed,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing results: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        eprintln!("{}", diagnostics.report());
        eprintln!();
        println!("{}", analysis.summary());
        println!("Time taken: {elapsed:.2} seconds.");
    }

    ExitCode::SUCCESS
}

/// Render `figure` and write it to `path`, creating parent directories.
fn write_figure(
    figure: &MapFigure<'_>,
    config: &FigureConfig,
    format: ImageFormat,
    path: &Path,
) -> Result<(), String> {
    let bytes = borderline_export::render(figure, config, format)
        .map_err(|e| format!("Error rendering figure: {e}"))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Error creating {}: {e}", parent.display()))?;
    }
    std::fs::write(path, &bytes)
        .map_err(|e| format!("Error writing figure to {}: {e}", path.display()))?;
    eprintln!(
        "Figure written to {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use borderline_core::PairVisit;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("borderline").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_library_defaults() {
        let cli = parse(&["world.geojson"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(cli.output, PathBuf::from("out/shortest_border.png"));
        let figure = figure_config_from_cli(&cli).unwrap();
        assert_eq!(figure, FigureConfig::default());
    }

    #[test]
    fn flags_build_config() {
        let cli = parse(&[
            "world.geojson",
            "--min-length",
            "1000",
            "--crs",
            "EPSG:3857",
            "--name-property",
            "NAME_EN",
            "--pair-visit",
            "unordered",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.min_length - 1000.0).abs() < f64::EPSILON);
        assert_eq!(config.computation_crs, Crs::WebMercator);
        assert_eq!(config.name_properties, vec!["NAME_EN".to_string()]);
        assert_eq!(config.pair_visit, PairVisit::Unordered);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "world.geojson",
            "--min-length",
            "1000",
            "--config-json",
            r#"{"min_length": 42.0}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.min_length - 42.0).abs() < f64::EPSILON);
        assert_eq!(config.computation_crs, AnalysisConfig::DEFAULT_COMPUTATION_CRS);
    }

    #[test]
    fn invalid_values_are_reported() {
        let cli = parse(&["world.geojson", "--min-length=-5"]);
        assert!(config_from_cli(&cli).is_err());
        let cli = parse(&["world.geojson", "--config-json", "not json"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
        let cli = parse(&["world.geojson", "--width", "0"]);
        assert!(figure_config_from_cli(&cli).is_err());
    }

    #[test]
    fn unknown_reference_is_rejected_by_the_parser() {
        let result = Cli::try_parse_from(["borderline", "world.geojson", "--crs", "EPSG:2154"]);
        assert!(result.is_err());
    }
}

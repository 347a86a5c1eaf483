//! borderline-core: shortest shared border analysis (sans-IO).
//!
//! Given a set of named polygonal entities (countries, provinces, parcels),
//! finds the pair of neighbours whose shared border is the shortest one
//! strictly longer than a configurable minimum:
//!
//! load GeoJSON -> project into a metric reference -> bounding-box index ->
//! exact shared-border scan -> reproject the winner for display.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory text
//! and returns structured data. Reading files and writing figures lives in
//! the `borderline` binary and `borderline-export`.

pub mod border;
pub mod diagnostics;
pub mod display;
mod geojson;
pub mod index;
pub mod projection;
pub mod scan;
pub mod store;
pub mod types;

pub use border::{BoundarySegments, SharedBorder, shared_border};
pub use diagnostics::{AnalysisDiagnostics, Clock, SystemClock};
pub use display::to_display_reference;
pub use geojson::LoadReport;
pub use index::SpatialIndex;
pub use projection::Crs;
pub use scan::{ScanOutcome, ScanStats, SkippedPair, find_shortest_qualifying_border, scan};
pub use store::GeometryStore;
pub use types::{
    AnalysisConfig, AnalysisError, BestBorder, BorderMatch, DataLoadError, Entity, EntityId,
    GeometryError, PairVisit, ProjectionError,
};

use diagnostics::{StageDiagnostics, StageMetrics};

/// Outcome of a full analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Every entity, in the display reference.
    pub entities: GeometryStore,
    /// The winner with geometry in the display reference. The length stays
    /// in the unit of the computation reference.
    pub best: BestBorder,
    /// Reference the length was measured in.
    pub computation_crs: Crs,
    /// What the loader kept and skipped.
    pub load: LoadReport,
    /// What the scan did.
    pub scan: ScanStats,
}

impl Analysis {
    /// Names of the winning pair, if any.
    #[must_use]
    pub fn names(&self) -> Option<(&str, &str)> {
        let winner = self.best.winner()?;
        let a = self.entities.get(winner.entity_a)?;
        let b = self.entities.get(winner.entity_b)?;
        Some((a.name(), b.name()))
    }

    /// One-line description of the result.
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.best.winner(), self.names()) {
            (Some(winner), Some((a, b))) => format!(
                "Shortest border is between {a} and {b} with a length of {:.2} {}.",
                winner.length,
                self.computation_crs.unit(),
            ),
            _ => "No qualifying border was found.".to_string(),
        }
    }
}

/// Run the full analysis on GeoJSON text.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidConfig`] if `config` does not validate,
/// [`AnalysisError::Load`] if the text cannot be read as polygon entities
/// or declares an unsupported reference, and [`AnalysisError::Projection`]
/// if the winning border cannot be transformed for display. An entity with
/// coordinates outside the computation reference's domain does not fail
/// the run: its pairs are skipped and listed in [`ScanStats::skipped`].
/// Finding no qualifying border is not an error.
pub fn analyze(geojson: &str, config: &AnalysisConfig) -> Result<Analysis, AnalysisError> {
    analyze_with_diagnostics(geojson, config, &SystemClock).map(|(analysis, _)| analysis)
}

/// Run the full analysis, timing each stage with `clock`.
///
/// # Steps
///
/// 1. Parse the collection into a store in the source reference
/// 2. Reproject into the computation reference
/// 3. Build the bounding-box index
/// 4. Scan candidate pairs for the shortest qualifying border
/// 5. Reproject the winner and the entities into the display reference
///
/// # Errors
///
/// Same as [`analyze`].
pub fn analyze_with_diagnostics<C: Clock>(
    geojson: &str,
    config: &AnalysisConfig,
    clock: &C,
) -> Result<(Analysis, AnalysisDiagnostics), AnalysisError> {
    config.validate()?;
    let run_start = clock.now();

    // 1. Load.
    let start = clock.now();
    let (source, load) =
        GeometryStore::from_geojson(geojson, config.source_crs, &config.name_properties)?;
    let load_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Load {
            input_bytes: geojson.len(),
            total_features: load.total_features,
            entity_count: source.len(),
            skipped_features: load.skipped_features,
            vertex_count: source.vertex_count(),
        },
    };

    // 2. Project.
    let start = clock.now();
    let projected = source.reproject(config.computation_crs);
    let project_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Project {
            from: source.crs().code().to_string(),
            to: projected.crs().code().to_string(),
            invalid_entities: projected.invalid_entities().len(),
        },
    };

    // 3. Index.
    let start = clock.now();
    let index = SpatialIndex::build(&projected);
    let index_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Index {
            indexed: index.len(),
            empty: index.empty_entities().len(),
            unbounded: index.unbounded().len(),
        },
    };

    // 4. Scan.
    let start = clock.now();
    let outcome = scan::scan(&projected, &index, config.min_length, config.pair_visit);
    let scan_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Scan {
            pair_visit: format!("{:?}", config.pair_visit),
            min_length: config.min_length,
            candidate_pairs: outcome.stats.candidate_pairs,
            intersections_computed: outcome.stats.intersections_computed,
            qualifying_updates: outcome.stats.qualifying_updates,
            skipped_pairs: outcome.stats.skipped.len(),
        },
    };

    // 5. Display.
    let start = clock.now();
    let best = to_display_reference(&outcome.best, projected.crs(), config.display_crs)?;
    let entities = source.reproject(config.display_crs);
    let display_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Display {
            crs: config.display_crs.code().to_string(),
            found: !best.is_empty(),
        },
    };

    let diagnostics = AnalysisDiagnostics {
        load: load_stage,
        project: project_stage,
        index: index_stage,
        scan: scan_stage,
        display: display_stage,
        total_duration: clock.elapsed(&run_start),
    };

    let analysis = Analysis {
        entities,
        best,
        computation_crs: projected.crs(),
        load,
        scan: outcome.stats,
    };
    Ok((analysis, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Three rectangles near the equator, in degrees. Lengths in World
    /// Mercator: A-C about 111 km, A-B about 222 km, B-C about 334 km.
    const THREE_RECTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"NAME": "Alpha"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[3,0],[3,3],[0,3],[0,0]]]}},
            {"type": "Feature", "properties": {"NAME": "Bravo"},
             "geometry": {"type": "Polygon", "coordinates": [[[3,0],[6,0],[6,2],[3,2],[3,0]]]}},
            {"type": "Feature", "properties": {"NAME": "Charlie"},
             "geometry": {"type": "Polygon", "coordinates": [[[3,2],[6,2],[6,5],[3,5],[3,2]]]}},
            {"type": "Feature", "properties": {"NAME": "Marker"},
             "geometry": {"type": "Point", "coordinates": [10, 10]}}
        ]
    }"#;

    #[test]
    fn analyze_finds_shortest_border() {
        let analysis = analyze(THREE_RECTS, &AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.names(), Some(("Alpha", "Charlie")));
        let length = analysis.best.length();
        assert!(length > 100_000.0 && length < 120_000.0, "length {length}");
        assert_eq!(analysis.load.skipped_features, 1);
        assert_eq!(analysis.entities.crs(), Crs::Wgs84);
    }

    #[test]
    fn winner_geometry_is_in_display_reference() {
        let analysis = analyze(THREE_RECTS, &AnalysisConfig::default()).unwrap();
        let geometry = analysis.best.geometry().unwrap();
        for coord in geometry.0.iter().flat_map(|ls| ls.0.iter()) {
            assert!((coord.x - 3.0).abs() < 1e-6, "x {}", coord.x);
            assert!(coord.y >= 2.0 - 1e-6 && coord.y <= 3.0 + 1e-6, "y {}", coord.y);
        }
    }

    #[test]
    fn threshold_moves_the_winner() {
        let config = AnalysisConfig {
            min_length: 150_000.0,
            ..AnalysisConfig::default()
        };
        let analysis = analyze(THREE_RECTS, &config).unwrap();
        assert_eq!(analysis.names(), Some(("Alpha", "Bravo")));
    }

    #[test]
    fn no_result_is_not_an_error() {
        let config = AnalysisConfig {
            min_length: 1.0e9,
            ..AnalysisConfig::default()
        };
        let analysis = analyze(THREE_RECTS, &config).unwrap();
        assert!(analysis.best.is_empty());
        assert!(analysis.names().is_none());
        assert_eq!(analysis.summary(), "No qualifying border was found.");
    }

    #[test]
    fn summary_names_pair_length_and_unit() {
        let analysis = analyze(THREE_RECTS, &AnalysisConfig::default()).unwrap();
        let summary = analysis.summary();
        assert!(summary.starts_with("Shortest border is between Alpha and Charlie with a length of "));
        assert!(summary.ends_with(" meters."), "{summary}");
    }

    #[test]
    fn geographic_computation_reports_degrees() {
        let config = AnalysisConfig {
            min_length: 0.0,
            computation_crs: Crs::Wgs84,
            ..AnalysisConfig::default()
        };
        let analysis = analyze(THREE_RECTS, &config).unwrap();
        assert!((analysis.best.length() - 1.0).abs() < 1e-9);
        assert!(analysis.summary().ends_with("with a length of 1.00 degrees."));
    }

    #[test]
    fn invalid_config_is_rejected_before_loading() {
        let config = AnalysisConfig {
            min_length: -1.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            analyze("", &config),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_input_is_a_load_error() {
        assert!(matches!(
            analyze("  ", &AnalysisConfig::default()),
            Err(AnalysisError::Load(DataLoadError::EmptyInput))
        ));
    }

    #[test]
    fn diagnostics_cover_every_stage() {
        let (analysis, diagnostics) =
            analyze_with_diagnostics(THREE_RECTS, &AnalysisConfig::default(), &SystemClock)
                .unwrap();
        assert!(diagnostics.total_duration >= diagnostics.scan.duration);
        assert!(matches!(
            diagnostics.scan.metrics,
            StageMetrics::Scan { intersections_computed, .. }
                if intersections_computed == analysis.scan.intersections_computed
        ));
        assert!(diagnostics.report().contains("EPSG:4326 -> EPSG:3395"));
    }

    #[test]
    fn out_of_domain_entity_skips_its_pairs_only() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"NAME": "Alpha"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[3,0],[3,3],[0,3],[0,0]]]}},
                {"type": "Feature", "properties": {"NAME": "Bravo"},
                 "geometry": {"type": "Polygon", "coordinates": [[[3,0],[6,0],[6,2],[3,2],[3,0]]]}},
                {"type": "Feature", "properties": {"NAME": "Beyond"},
                 "geometry": {"type": "Polygon", "coordinates": [[[50,80],[52,80],[51,90.5],[50,80]]]}}
            ]
        }"#;
        for pair_visit in [PairVisit::Ordered, PairVisit::Unordered] {
            let config = AnalysisConfig {
                pair_visit,
                ..AnalysisConfig::default()
            };
            let (analysis, diagnostics) =
                analyze_with_diagnostics(text, &config, &SystemClock).unwrap();
            assert_eq!(analysis.names(), Some(("Alpha", "Bravo")));
            assert!(!analysis.scan.skipped.is_empty());
            assert!(
                analysis
                    .scan
                    .skipped
                    .iter()
                    .all(|p| p.a == EntityId(2) || p.b == EntityId(2))
            );
            assert!(analysis.scan.skipped.iter().all(|p| matches!(
                p.error,
                GeometryError::NonFiniteCoordinate { entity: EntityId(2) }
            )));
            assert!(matches!(
                diagnostics.project.metrics,
                StageMetrics::Project { invalid_entities: 1, .. }
            ));
        }
    }

    #[test]
    fn pair_visit_does_not_change_the_result() {
        let ordered = analyze(THREE_RECTS, &AnalysisConfig::default()).unwrap();
        let unordered = analyze(
            THREE_RECTS,
            &AnalysisConfig {
                pair_visit: PairVisit::Unordered,
                ..AnalysisConfig::default()
            },
        )
        .unwrap();
        assert_eq!(ordered.best, unordered.best);
    }
}

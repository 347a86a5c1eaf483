//! Integration test: run the three-countries fixture through the full analysis.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use borderline_core::{
    AnalysisConfig, Crs, EntityId, GeometryStore, PairVisit, SpatialIndex,
    analyze, scan, shared_border,
};

fn fixture() -> String {
    let workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    let path = workspace_root.join("assets/fixtures/three_countries.geojson");
    assert!(path.exists(), "fixture not found at {}", path.display());
    std::fs::read_to_string(&path).unwrap()
}

fn config(min_length: f64) -> AnalysisConfig {
    AnalysisConfig {
        min_length,
        ..AnalysisConfig::default()
    }
}

#[test]
fn loads_polygons_and_skips_points() {
    let names = AnalysisConfig::default().name_properties;
    let (store, report) = GeometryStore::from_geojson(&fixture(), Crs::Wgs84, &names).unwrap();
    assert_eq!(report.total_features, 5);
    assert_eq!(report.polygon_features, 4);
    assert_eq!(report.skipped_features, 1);
    let names: Vec<&str> = store.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["Avalon", "Brightwater", "Caldera", "Dunmore Isles"]);
}

#[test]
fn default_threshold_picks_the_shortest_border() {
    let analysis = analyze(&fixture(), &AnalysisConfig::default()).unwrap();
    assert_eq!(analysis.names(), Some(("Avalon", "Caldera")));
    // Half a degree of latitude near the equator.
    let length = analysis.best.length();
    assert!((55_000.0..56_000.0).contains(&length), "length {length}");
    eprintln!("{}", analysis.summary());
}

#[test]
fn raising_the_threshold_walks_up_the_borders() {
    let cases = [
        (100_000.0, ("Avalon", "Brightwater")),
        (200_000.0, ("Brightwater", "Caldera")),
    ];
    for (min_length, expected) in cases {
        let analysis = analyze(&fixture(), &config(min_length)).unwrap();
        assert_eq!(analysis.names(), Some(expected), "min_length={min_length}");
        assert!(analysis.best.length() > min_length);
    }
}

#[test]
fn nothing_qualifies_above_the_longest_border() {
    let analysis = analyze(&fixture(), &config(300_000.0)).unwrap();
    assert!(analysis.best.is_empty());
    assert_eq!(analysis.summary(), "No qualifying border was found.");
}

#[test]
fn border_is_reported_in_degrees() {
    let analysis = analyze(&fixture(), &AnalysisConfig::default()).unwrap();
    let geometry = analysis.best.geometry().unwrap();
    let coords: Vec<_> = geometry.0.iter().flat_map(|l| l.0.iter()).collect();
    assert_eq!(coords.len(), 2);
    for c in coords {
        assert!((c.x - 2.0).abs() < 1e-6);
        assert!(c.y > 1.5 - 1e-6 && c.y < 2.0 + 1e-6);
    }
}

#[test]
fn border_lengths_are_symmetric_and_match_the_scan() {
    let names = AnalysisConfig::default().name_properties;
    let (store, _) = GeometryStore::from_geojson(&fixture(), Crs::Wgs84, &names).unwrap();
    let projected = store.reproject(Crs::WorldMercator);
    let index = SpatialIndex::build(&projected);

    for a in &projected {
        for b in &projected {
            let ab = shared_border(a, b).unwrap().length;
            let ba = shared_border(b, a).unwrap().length;
            assert!((ab - ba).abs() < 1e-6, "{} / {}", a.name(), b.name());
        }
    }

    let ordered = scan(&projected, &index, 500.0, PairVisit::Ordered);
    let unordered = scan(&projected, &index, 500.0, PairVisit::Unordered);
    assert_eq!(ordered.best, unordered.best);
    let winner = ordered.best.winner().unwrap();
    assert_eq!((winner.entity_a, winner.entity_b), (EntityId(0), EntityId(2)));
    // The isolated islands are never candidates of the mainland.
    assert!(ordered.stats.skipped.is_empty());
    assert_eq!(ordered.stats.candidate_pairs, 6);
}

#[test]
fn unknown_name_property_keeps_features_with_placeholders() {
    let config = AnalysisConfig {
        name_properties: vec!["ISO_A3".to_string()],
        ..AnalysisConfig::default()
    };
    let analysis = analyze(&fixture(), &config).unwrap();
    assert_eq!(analysis.load.unnamed_features, 4);
    assert_eq!(
        analysis.names(),
        Some(("unnamed feature 0", "unnamed feature 2"))
    );
}

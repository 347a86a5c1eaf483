//! Analysis diagnostics: timing and counts for each stage of a run.
//!
//! Every call to [`analyze_with_diagnostics`](crate::analyze_with_diagnostics)
//! collects these alongside the result. Time is read through the [`Clock`]
//! trait so the core stays free of platform timers; [`SystemClock`] uses
//! the `web-time` crate, which maps to `performance.now()` on WASM and
//! `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
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

/// Diagnostics collected from a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    /// GeoJSON parsing and entity construction.
    pub load: StageDiagnostics,
    /// Reprojection into the computation reference.
    pub project: StageDiagnostics,
    /// Bounding-box index construction.
    pub index: StageDiagnostics,
    /// The adjacency scan.
    pub scan: StageDiagnostics,
    /// Reprojection of the result and the entities into the display
    /// reference.
    pub display: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
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
    /// Loading metrics.
    Load {
        /// Size of the input text.
        input_bytes: usize,
        /// Features in the collection.
        total_features: usize,
        /// Features kept as entities.
        entity_count: usize,
        /// Non-polygonal features skipped.
        skipped_features: usize,
        /// Vertices across all boundaries.
        vertex_count: usize,
    },
    /// Reprojection metrics.
    Project {
        /// Source reference code.
        from: String,
        /// Target reference code.
        to: String,
        /// Entities left with coordinates outside the target's domain.
        invalid_entities: usize,
    },
    /// Index metrics.
    Index {
        /// Entities stored in the index.
        indexed: usize,
        /// Entities with an empty boundary.
        empty: usize,
        /// Entities with a non-finite extent.
        unbounded: usize,
    },
    /// Scan metrics.
    Scan {
        /// Pair enumeration strategy.
        pair_visit: String,
        /// Minimum qualifying length.
        min_length: f64,
        /// Candidate pairs from the index.
        candidate_pairs: usize,
        /// Exact border computations.
        intersections_computed: usize,
        /// Times the running minimum was replaced.
        qualifying_updates: usize,
        /// Pairs skipped because of geometry errors.
        skipped_pairs: usize,
    },
    /// Display reprojection metrics.
    Display {
        /// Display reference code.
        crs: String,
        /// Whether a border was found.
        found: bool,
    },
}

impl AnalysisDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Analysis Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Load", &self.load),
            ("Project", &self.project),
            ("Index", &self.index),
            ("Scan", &self.scan),
            ("Display", &self.display),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<12} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

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
        StageMetrics::Load {
            input_bytes,
            total_features,
            entity_count,
            skipped_features,
            vertex_count,
        } => format!(
            "{input_bytes} bytes, {total_features} features -> {entity_count} entities \
             ({skipped_features} skipped), {vertex_count} vertices",
        ),
        StageMetrics::Project {
            from,
            to,
            invalid_entities,
        } => format!("{from} -> {to} (invalid={invalid_entities})"),
        StageMetrics::Index {
            indexed,
            empty,
            unbounded,
        } => format!("{indexed} entities (empty={empty} unbounded={unbounded})"),
        StageMetrics::Scan {
            pair_visit,
            min_length,
            candidate_pairs,
            intersections_computed,
            qualifying_updates,
            skipped_pairs,
        } => format!(
            "{pair_visit} min={min_length} pairs={candidate_pairs} \
             computed={intersections_computed} updates={qualifying_updates} skipped={skipped_pairs}",
        ),
        StageMetrics::Display { crs, found } => {
            format!("{crs} {}", if *found { "border found" } else { "no border" })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stage(ms: u64, metrics: StageMetrics) -> StageDiagnostics {
        StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        }
    }

    fn sample() -> AnalysisDiagnostics {
        AnalysisDiagnostics {
            load: stage(
                10,
                StageMetrics::Load {
                    input_bytes: 2048,
                    total_features: 4,
                    entity_count: 3,
                    skipped_features: 1,
                    vertex_count: 15,
                },
            ),
            project: stage(
                5,
                StageMetrics::Project {
                    from: "EPSG:4326".to_string(),
                    to: "EPSG:3395".to_string(),
                    invalid_entities: 0,
                },
            ),
            index: stage(
                1,
                StageMetrics::Index {
                    indexed: 3,
                    empty: 0,
                    unbounded: 0,
                },
            ),
            scan: stage(
                30,
                StageMetrics::Scan {
                    pair_visit: "Ordered".to_string(),
                    min_length: 500.0,
                    candidate_pairs: 6,
                    intersections_computed: 6,
                    qualifying_updates: 2,
                    skipped_pairs: 0,
                },
            ),
            display: stage(
                4,
                StageMetrics::Display {
                    crs: "EPSG:4326".to_string(),
                    found: true,
                },
            ),
            total_duration: Duration::from_millis(50),
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn report_lists_every_stage() {
        let report = sample().report();
        for name in ["Load", "Project", "Index", "Scan", "Display"] {
            assert!(report.contains(name), "missing {name} in:\n{report}");
        }
        assert!(report.contains("EPSG:4326 -> EPSG:3395"));
        assert!(report.contains("60.0%"));
    }

    #[test]
    fn report_handles_zero_total() {
        let mut diag = sample();
        diag.total_duration = Duration::ZERO;
        assert!(diag.report().contains("0.0%"));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.05).abs() < 1e-12);
        assert!((json["scan"]["duration"].as_f64().unwrap() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn diagnostics_round_trip_through_json() {
        let json = serde_json::to_string(&sample()).unwrap();
        let back: AnalysisDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_duration, Duration::from_millis(50));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<AnalysisDiagnostics>(json).is_err());
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let start = clock.now();
        assert!(clock.elapsed(&start) >= Duration::ZERO);
    }
}

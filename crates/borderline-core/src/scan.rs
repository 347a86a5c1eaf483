//! The adjacency scan: find the shortest qualifying shared border.
//!
//! For every entity `A` the scan asks the [`SpatialIndex`] for candidates
//! whose bounding box intersects `A`'s, skips `A` itself, computes the
//! exact shared border with each candidate, and keeps the shortest one
//! whose length is strictly greater than the minimum.
//!
//! Entities are visited in ascending id order and candidates come back
//! ascending, so the first pair reaching a given minimal length wins and
//! results are reproducible run to run.

use std::cell::OnceCell;

use serde::Serialize;

use crate::border::BoundarySegments;
use crate::index::SpatialIndex;
use crate::store::GeometryStore;
use crate::types::{BestBorder, BorderMatch, Entity, EntityId, GeometryError, PairVisit};

/// A pair whose border could not be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPair {
    /// The outer entity.
    pub a: EntityId,
    /// The candidate.
    pub b: EntityId,
    /// Why the pair was skipped.
    pub error: GeometryError,
}

impl Serialize for SkippedPair {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("SkippedPair", 3)?;
        s.serialize_field("a", &self.a)?;
        s.serialize_field("b", &self.b)?;
        s.serialize_field("error", &self.error.to_string())?;
        s.end()
    }
}

/// Counters collected during one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Entities visited as the outer loop.
    pub entities: usize,
    /// Candidate pairs returned by the index, excluding self pairs.
    pub candidate_pairs: usize,
    /// Exact border computations performed.
    pub intersections_computed: usize,
    /// Times the running minimum was replaced.
    pub qualifying_updates: usize,
    /// Pairs skipped because of a geometry error.
    pub skipped: Vec<SkippedPair>,
}

/// Result of [`scan`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// The winning border, or empty if none qualified.
    pub best: BestBorder,
    /// What the scan did along the way.
    pub stats: ScanStats,
}

/// Whether a border of `length` replaces `best`.
///
/// Zero length (point contacts, disjoint pairs) never qualifies. Ties with
/// the current best do not replace it.
#[must_use]
pub fn qualifies(length: f64, best: &BestBorder, min_length: f64) -> bool {
    length > 0.0 && length < best.length() && length > min_length
}

/// Run the adjacency scan over `store` using candidates from `index`.
///
/// `min_length` is in the linear unit of the store's reference. Pairs
/// whose border cannot be computed are recorded in
/// [`ScanStats::skipped`] and otherwise ignored.
///
/// Both [`PairVisit`] strategies return the same winner: the border
/// length is symmetric and the ordered walk reaches every pair as
/// `(A, B)` with `A < B` before `(B, A)`.
#[must_use]
pub fn scan(
    store: &GeometryStore,
    index: &SpatialIndex,
    min_length: f64,
    pair_visit: PairVisit,
) -> ScanOutcome {
    let cache: Vec<SegmentCell> = (0..store.len()).map(|_| OnceCell::new()).collect();

    let mut best = BestBorder::empty();
    let mut stats = ScanStats::default();

    for a in store {
        stats.entities += 1;
        for b_id in index.candidates(a) {
            if b_id == a.id() {
                continue;
            }
            if pair_visit == PairVisit::Unordered && b_id < a.id() {
                continue;
            }
            let Some(b) = store.get(b_id) else {
                continue;
            };
            stats.candidate_pairs += 1;

            let shared = match (segments_of(&cache, a), segments_of(&cache, b)) {
                (Ok(sa), Ok(sb)) => sa.shared_with(sb),
                (Err(error), _) | (_, Err(error)) => {
                    stats.skipped.push(SkippedPair {
                        a: a.id(),
                        b: b_id,
                        error,
                    });
                    continue;
                }
            };
            stats.intersections_computed += 1;

            if qualifies(shared.length, &best, min_length) {
                best.replace(BorderMatch {
                    length: shared.length,
                    geometry: shared.geometry,
                    entity_a: a.id(),
                    entity_b: b_id,
                });
                stats.qualifying_updates += 1;
            }
        }
    }

    ScanOutcome { best, stats }
}

/// Lazily built segment index of one entity.
type SegmentCell = OnceCell<Result<BoundarySegments, GeometryError>>;

/// Segments of `entity`, built on first use and shared by every pair it
/// takes part in.
fn segments_of<'c>(
    cache: &'c [SegmentCell],
    entity: &Entity,
) -> Result<&'c BoundarySegments, GeometryError> {
    cache[entity.id().index()]
        .get_or_init(|| BoundarySegments::build(entity))
        .as_ref()
        .map_err(Clone::clone)
}

/// Shortest border strictly longer than `min_length`, visiting ordered
/// pairs.
#[must_use]
pub fn find_shortest_qualifying_border(
    store: &GeometryStore,
    index: &SpatialIndex,
    min_length: f64,
) -> BestBorder {
    scan(store, index, min_length, PairVisit::Ordered).best
}

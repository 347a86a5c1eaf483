//! Shared-border computation between two polygonal boundaries.
//!
//! The border of two entities is the 1-dimensional part of the
//! intersection of their boundaries: every stretch where a ring segment of
//! one entity runs collinear with a ring segment of the other. Crossings
//! and corner contacts are single points and contribute nothing; areal
//! overlap contributes only where the rings themselves coincide.
//!
//! # Algorithm
//!
//! 1. Explode each boundary (exterior and interior rings of every polygon)
//!    into segments and bulk-load them into an R\*-tree, once per entity.
//! 2. Restrict the first boundary's segments to the overlap of the two
//!    bounding boxes.
//! 3. For each surviving segment, query the other tree with the segment's
//!    envelope and run [`line_intersection`] on each hit. Collinear
//!    overlaps of positive length are the border pieces.
//! 4. Orient each piece along the first boundary and stitch consecutive
//!    pieces that share an endpoint into line strings.

use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{BoundingRect, Coord, Euclidean, Length, Line, LineString, MultiLineString, Rect};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree, RTreeObject};

use crate::types::{Entity, EntityId, GeometryError};

/// A boundary segment tagged with its ordinal within the boundary, so
/// pieces can be emitted in ring order.
type IndexedSegment = GeomWithData<Line<f64>, usize>;

/// The segments of one entity's boundary, indexed for overlap queries.
#[derive(Debug, Clone)]
pub struct BoundarySegments {
    entity: EntityId,
    tree: RTree<IndexedSegment>,
    bounds: Option<Rect<f64>>,
}

/// The shared border of two entities.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedBorder {
    /// Border pieces, oriented along the first entity's rings.
    pub geometry: MultiLineString<f64>,
    /// Total Euclidean length of the pieces.
    pub length: f64,
}

impl SharedBorder {
    /// A border with no pieces.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            geometry: MultiLineString(Vec::new()),
            length: 0.0,
        }
    }

    /// Returns `true` if the boundaries share no 1-dimensional part.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

impl BoundarySegments {
    /// Index every ring segment of `entity`'s boundary.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NonFiniteCoordinate`] if any vertex is NaN
    /// or infinite.
    pub fn build(entity: &Entity) -> Result<Self, GeometryError> {
        let mut segments = Vec::new();
        for polygon in entity.boundary() {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                for line in ring.lines() {
                    if !coord_is_finite(line.start) || !coord_is_finite(line.end) {
                        return Err(GeometryError::NonFiniteCoordinate {
                            entity: entity.id(),
                        });
                    }
                    let ordinal = segments.len();
                    segments.push(IndexedSegment::new(line, ordinal));
                }
            }
        }
        // A ring of a single vertex has no segments but still has a box;
        // the box is only used as a query window, so that is harmless.
        let bounds = entity.boundary().bounding_rect();
        Ok(Self {
            entity: entity.id(),
            tree: RTree::bulk_load(segments),
            bounds,
        })
    }

    /// The entity these segments belong to.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Number of indexed segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if the boundary has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Compute the border shared with `other`.
    #[must_use]
    pub fn shared_with(&self, other: &Self) -> SharedBorder {
        let Some(window) = overlap_window(self.bounds, other.bounds) else {
            return SharedBorder::empty();
        };

        let mut own: Vec<&IndexedSegment> =
            self.tree.locate_in_envelope_intersecting(&window).collect();
        own.sort_unstable_by_key(|s| s.data);

        let mut pieces = Vec::new();
        for segment in own {
            let line = *segment.geom();
            let mut hits: Vec<&IndexedSegment> = other
                .tree
                .locate_in_envelope_intersecting(&segment.envelope())
                .collect();
            hits.sort_unstable_by_key(|s| s.data);

            let mut on_segment: Vec<Line<f64>> = hits
                .into_iter()
                .filter_map(|hit| match line_intersection(line, *hit.geom()) {
                    Some(LineIntersection::Collinear { intersection }) => {
                        Some(orient_along(intersection, line))
                    }
                    _ => None,
                })
                .filter(|piece| Euclidean.length(piece) > 0.0)
                .collect();
            // The other boundary may split this segment and list the parts
            // in its own order; walk them along this segment instead.
            on_segment.sort_by(|p, q| offset_along(p, line).total_cmp(&offset_along(q, line)));
            pieces.extend(on_segment);
        }

        let length = pieces.iter().map(|p| Euclidean.length(p)).sum();
        SharedBorder {
            geometry: stitch(&pieces),
            length,
        }
    }
}

/// Convenience: index both boundaries and compute their shared border.
///
/// # Errors
///
/// Returns [`GeometryError`] if either boundary cannot be indexed.
pub fn shared_border(a: &Entity, b: &Entity) -> Result<SharedBorder, GeometryError> {
    let a = BoundarySegments::build(a)?;
    let b = BoundarySegments::build(b)?;
    Ok(a.shared_with(&b))
}

const fn coord_is_finite(c: Coord<f64>) -> bool {
    c.x.is_finite() && c.y.is_finite()
}

/// Intersection of two bounding boxes as an R-tree query envelope.
fn overlap_window(a: Option<Rect<f64>>, b: Option<Rect<f64>>) -> Option<AABB<geo::Point<f64>>> {
    let (a, b) = (a?, b?);
    let min_x = a.min().x.max(b.min().x);
    let min_y = a.min().y.max(b.min().y);
    let max_x = a.max().x.min(b.max().x);
    let max_y = a.max().y.min(b.max().y);
    (min_x <= max_x && min_y <= max_y).then(|| {
        AABB::from_corners(geo::Point::new(min_x, min_y), geo::Point::new(max_x, max_y))
    })
}

/// Flip `piece` if it runs against `reference`.
fn orient_along(piece: Line<f64>, reference: Line<f64>) -> Line<f64> {
    let p = piece.delta();
    let r = reference.delta();
    if p.x.mul_add(r.x, p.y * r.y) < 0.0 {
        Line::new(piece.end, piece.start)
    } else {
        piece
    }
}

/// Position of `piece`'s start along `reference`, in units of the
/// reference's squared length.
fn offset_along(piece: &Line<f64>, reference: Line<f64>) -> f64 {
    let r = reference.delta();
    let d = piece.start - reference.start;
    d.x.mul_add(r.x, d.y * r.y)
}

/// Join consecutive pieces that share an endpoint into line strings.
fn stitch(pieces: &[Line<f64>]) -> MultiLineString<f64> {
    let mut strings: Vec<Vec<Coord<f64>>> = Vec::new();
    for piece in pieces {
        match strings.last_mut() {
            Some(current) if current.last() == Some(&piece.start) => current.push(piece.end),
            _ => strings.push(vec![piece.start, piece.end]),
        }
    }
    MultiLineString::new(strings.into_iter().map(LineString::new).collect())
}

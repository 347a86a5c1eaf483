//! Bounding-box candidate index over a [`GeometryStore`].
//!
//! Each entity is stored in an R\*-tree under its axis-aligned bounding
//! box. A query returns every entity whose box intersects the query box:
//! never a false negative, false positives expected. Exact filtering is
//! the caller's job.
//!
//! Degenerate entities never break construction:
//!
//! - zero-area boundaries are stored under their degenerate box;
//! - empty boundaries intersect nothing and are never returned;
//! - boundaries with a non-finite extent are kept outside the tree and
//!   returned by every query, so soundness does not depend on their box.

use geo::Rect;
use rstar::{AABB, RTree, RTreeObject};

use crate::store::GeometryStore;
use crate::types::{Entity, EntityId};

/// An entity's bounding box, suitable for R\*-tree insertion.
#[derive(Debug, Clone)]
struct IndexedBounds {
    id: EntityId,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Read-only candidate index built once per store.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: RTree<IndexedBounds>,
    unbounded: Vec<EntityId>,
    empty: Vec<EntityId>,
}

impl SpatialIndex {
    /// Bulk-load an index over every entity in `store`.
    #[must_use]
    pub fn build(store: &GeometryStore) -> Self {
        let mut bounded = Vec::with_capacity(store.len());
        let mut unbounded = Vec::new();
        let mut empty = Vec::new();

        for entity in store {
            if !entity.is_finite() {
                unbounded.push(entity.id());
                continue;
            }
            match entity.bounding_rect() {
                Some(rect) if rect_is_finite(&rect) => bounded.push(IndexedBounds {
                    id: entity.id(),
                    envelope: rect_to_aabb(&rect),
                }),
                Some(_) => unbounded.push(entity.id()),
                None => empty.push(entity.id()),
            }
        }

        Self {
            tree: RTree::bulk_load(bounded),
            unbounded,
            empty,
        }
    }

    /// Ids of all entities whose box intersects `bounds`, ascending.
    ///
    /// A non-finite `bounds` matches every non-empty entity.
    #[must_use]
    pub fn query(&self, bounds: Rect<f64>) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = if rect_is_finite(&bounds) {
            self.tree
                .locate_in_envelope_intersecting(&rect_to_aabb(&bounds))
                .map(|b| b.id)
                .collect()
        } else {
            self.tree.iter().map(|b| b.id).collect()
        };
        ids.extend_from_slice(&self.unbounded);
        ids.sort_unstable();
        ids
    }

    /// Candidate neighbours of `entity`: a query with its own box.
    ///
    /// The result includes `entity` itself. An empty entity has no
    /// candidates; an entity with a non-finite coordinate has every
    /// non-empty entity as a candidate.
    #[must_use]
    pub fn candidates(&self, entity: &Entity) -> Vec<EntityId> {
        if !entity.is_finite() {
            return self.query(Rect::new(
                geo::coord! { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY },
                geo::coord! { x: f64::INFINITY, y: f64::INFINITY },
            ));
        }
        entity
            .bounding_rect()
            .map_or_else(Vec::new, |rect| self.query(rect))
    }

    /// Number of entities recorded, including empty ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size() + self.unbounded.len() + self.empty.len()
    }

    /// Returns `true` if the index holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entities kept outside the tree because their extent is non-finite.
    #[must_use]
    pub fn unbounded(&self) -> &[EntityId] {
        &self.unbounded
    }

    /// Entities with an empty boundary.
    #[must_use]
    pub fn empty_entities(&self) -> &[EntityId] {
        &self.empty
    }
}

fn rect_is_finite(rect: &Rect<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()
}

fn rect_to_aabb(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

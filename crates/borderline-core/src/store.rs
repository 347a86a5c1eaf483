//! The entity table: polygon entities in a single coordinate reference.
//!
//! A [`GeometryStore`] is built once and never mutated. Reprojection
//! produces a new store; the original stays valid, which lets the analysis
//! keep the geographic store for drawing while scanning a projected copy.

use geo::{BoundingRect, Coord, MapCoords, MultiPolygon, Rect};

use crate::geojson::{self, LoadReport};
use crate::projection::{self, Crs};
use crate::types::{DataLoadError, Entity, EntityId, ProjectionError};

/// Ordered, immutable collection of [`Entity`] values.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryStore {
    crs: Crs,
    entities: Vec<Entity>,
}

impl GeometryStore {
    /// Build a store from `(name, boundary)` pairs, assigning ids in order.
    #[must_use]
    pub fn new(crs: Crs, features: Vec<(String, MultiPolygon<f64>)>) -> Self {
        let entities = features
            .into_iter()
            .enumerate()
            .map(|(i, (name, boundary))| Entity::new(EntityId(i), name, boundary))
            .collect();
        Self { crs, entities }
    }

    /// Load a store from GeoJSON `FeatureCollection` text.
    ///
    /// Coordinates are interpreted in `default_crs` unless the collection
    /// carries a legacy `crs` member naming a supported reference.
    /// Non-polygonal features are skipped and counted in the returned
    /// [`LoadReport`].
    ///
    /// # Errors
    ///
    /// Returns a [`DataLoadError`] if the text is not a parseable
    /// collection, a polygon feature is malformed, or no polygon features
    /// remain.
    pub fn from_geojson(
        text: &str,
        default_crs: Crs,
        name_properties: &[String],
    ) -> Result<(Self, LoadReport), DataLoadError> {
        let parsed = geojson::parse_feature_collection(text, name_properties)?;
        let crs = parsed.crs.unwrap_or(default_crs);
        Ok((Self::new(crs, parsed.features), parsed.report))
    }

    /// The reference all boundaries are expressed in.
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// All entities in load order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Look up an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// Number of entities.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the store holds no entities.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over entities in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Total vertex count across all boundaries.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        use geo::CoordsIter;
        self.entities
            .iter()
            .map(|e| e.boundary().coords_count())
            .sum()
    }

    /// Extent of the whole dataset, or `None` if every boundary is empty.
    /// Entities with a non-finite coordinate are left out.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.entities
            .iter()
            .filter(|e| e.is_finite())
            .filter_map(|e| e.boundary().bounding_rect())
            .reduce(|acc, r| {
                Rect::new(
                    geo::coord! { x: acc.min().x.min(r.min().x), y: acc.min().y.min(r.min().y) },
                    geo::coord! { x: acc.max().x.max(r.max().x), y: acc.max().y.max(r.max().y) },
                )
            })
    }

    /// Return a new store with every boundary transformed into `target`.
    ///
    /// Ids, names, and order are preserved; `self` is not modified. A
    /// coordinate outside the domain of either reference becomes NaN
    /// instead of failing the store: the entity keeps its id, and every
    /// pair it takes part in is skipped by the scan. See
    /// [`invalid_entities`](Self::invalid_entities).
    #[must_use]
    pub fn reproject(&self, target: Crs) -> Self {
        let source = self.crs;
        let entities = self
            .entities
            .iter()
            .map(|e| {
                let boundary = e.boundary().map_coords(|c| {
                    source
                        .transform(target, c)
                        .unwrap_or(Coord { x: f64::NAN, y: f64::NAN })
                });
                e.with_boundary(boundary)
            })
            .collect();
        Self {
            crs: target,
            entities,
        }
    }

    /// Like [`reproject`](Self::reproject), but fails on the first
    /// coordinate that cannot be transformed.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProjectionError`] hit by any coordinate.
    pub fn try_reproject(&self, target: Crs) -> Result<Self, ProjectionError> {
        let entities = self
            .entities
            .iter()
            .map(|e| {
                projection::reproject(e.boundary(), self.crs, target).map(|b| e.with_boundary(b))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            crs: target,
            entities,
        })
    }

    /// Entities with at least one non-finite coordinate, in id order.
    #[must_use]
    pub fn invalid_entities(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| !e.is_finite())
            .map(Entity::id)
            .collect()
    }
}

impl<'a> IntoIterator for &'a GeometryStore {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

//! Shared types for the borderline analysis.

use std::fmt;

use geo::{BoundingRect, CoordsIter, MultiLineString, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};

use crate::projection::Crs;

/// Identity of an entity: its position in load order.
///
/// Ids are assigned densely from zero by [`GeometryStore`](crate::GeometryStore),
/// so uniqueness holds by construction and ids double as indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub usize);

impl EntityId {
    /// The id as a slice index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity #{}", self.0)
    }
}

/// One polygon feature (e.g. a country): identity, name, and boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    name: String,
    boundary: MultiPolygon<f64>,
}

impl Entity {
    /// Create a new entity.
    #[must_use]
    pub const fn new(id: EntityId, name: String, boundary: MultiPolygon<f64>) -> Self {
        Self { id, name, boundary }
    }

    /// The entity's id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity's boundary geometry.
    #[must_use]
    pub const fn boundary(&self) -> &MultiPolygon<f64> {
        &self.boundary
    }

    /// Axis-aligned bounding box, or `None` for an empty boundary.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.boundary.bounding_rect()
    }

    /// Returns `true` if every boundary coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.boundary
            .coords_iter()
            .all(|c| c.x.is_finite() && c.y.is_finite())
    }

    /// Returns a copy of this entity with a different boundary.
    #[must_use]
    pub(crate) fn with_boundary(&self, boundary: MultiPolygon<f64>) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            boundary,
        }
    }
}

/// A qualifying shared border between two entities.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderMatch {
    /// Length in the linear unit of the reference the scan ran in.
    pub length: f64,
    /// The shared boundary pieces.
    pub geometry: MultiLineString<f64>,
    /// The entity whose boundary was scanned.
    pub entity_a: EntityId,
    /// The candidate entity it borders.
    pub entity_b: EntityId,
}

/// Running minimum of the adjacency scan.
///
/// Starts empty (length `+∞`, no geometry, no entities). The winner is
/// replaced as a whole, so length, geometry, and the entity pair can never
/// disagree. An empty result after a completed scan is a valid outcome
/// (no qualifying border), not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestBorder(Option<BorderMatch>);

impl BestBorder {
    /// An empty accumulator.
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    /// Current best length, `f64::INFINITY` while empty.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.as_ref().map_or(f64::INFINITY, |m| m.length)
    }

    /// The winning border geometry, if any.
    #[must_use]
    pub fn geometry(&self) -> Option<&MultiLineString<f64>> {
        self.0.as_ref().map(|m| &m.geometry)
    }

    /// First entity of the winning pair.
    #[must_use]
    pub fn entity_a(&self) -> Option<EntityId> {
        self.0.as_ref().map(|m| m.entity_a)
    }

    /// Second entity of the winning pair.
    #[must_use]
    pub fn entity_b(&self) -> Option<EntityId> {
        self.0.as_ref().map(|m| m.entity_b)
    }

    /// Returns `true` if no pair has qualified.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// The winning match, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<&BorderMatch> {
        self.0.as_ref()
    }

    /// Consumes the accumulator and returns the winning match.
    #[must_use]
    pub fn into_winner(self) -> Option<BorderMatch> {
        self.0
    }

    /// Replace the current winner.
    pub(crate) fn replace(&mut self, winner: BorderMatch) {
        self.0 = Some(winner);
    }
}

impl From<BorderMatch> for BestBorder {
    fn from(winner: BorderMatch) -> Self {
        Self(Some(winner))
    }
}

/// How the scan enumerates candidate pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairVisit {
    /// Visit `(A, B)` and `(B, A)` separately, once per outer entity.
    #[default]
    Ordered,
    /// Visit each unordered pair once, as `(A, B)` with `A < B`.
    Unordered,
}

/// Configuration for a full analysis run.
///
/// `min_length` is measured in the linear unit of `computation_crs`
/// (metres for the Mercator references).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Borders must be strictly longer than this to qualify.
    pub min_length: f64,

    /// Reference the input coordinates are expressed in.
    pub source_crs: Crs,

    /// Reference lengths are measured in.
    pub computation_crs: Crs,

    /// Reference the result is reported and drawn in.
    pub display_crs: Crs,

    /// Feature properties tried, in order, for the entity name.
    pub name_properties: Vec<String>,

    /// Pair enumeration strategy.
    pub pair_visit: PairVisit,
}

impl AnalysisConfig {
    /// Default minimum qualifying border length.
    pub const DEFAULT_MIN_LENGTH: f64 = 500.0;

    /// Default reference of input data (GeoJSON is geographic).
    pub const DEFAULT_SOURCE_CRS: Crs = Crs::Wgs84;

    /// Default reference for length computation.
    pub const DEFAULT_COMPUTATION_CRS: Crs = Crs::WorldMercator;

    /// Default reference for display.
    pub const DEFAULT_DISPLAY_CRS: Crs = Crs::Wgs84;

    /// Default name property lookup order.
    pub const DEFAULT_NAME_PROPERTIES: &[&str] = &["NAME", "name", "ADMIN"];

    /// Check the configuration for values the analysis cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if `min_length` is negative
    /// or not finite, or if `name_properties` is empty.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.min_length.is_finite() || self.min_length < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_length must be a finite, non-negative number, got {}",
                self.min_length,
            )));
        }
        if self.name_properties.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "name_properties must list at least one property".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_length: Self::DEFAULT_MIN_LENGTH,
            source_crs: Self::DEFAULT_SOURCE_CRS,
            computation_crs: Self::DEFAULT_COMPUTATION_CRS,
            display_crs: Self::DEFAULT_DISPLAY_CRS,
            name_properties: Self::DEFAULT_NAME_PROPERTIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            pair_visit: PairVisit::default(),
        }
    }
}

/// The input could not be turned into polygon entities. Fatal.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The input text was empty.
    #[error("input dataset is empty")]
    EmptyInput,

    /// The input is not valid JSON or has the wrong shape.
    #[error("failed to parse GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level object is not a `FeatureCollection`.
    #[error("expected a GeoJSON FeatureCollection, found {0:?}")]
    NotFeatureCollection(String),

    /// A feature's geometry could not be read as polygons.
    #[error("feature {feature}: invalid geometry: {reason}")]
    InvalidGeometry {
        /// Zero-based feature position in the collection.
        feature: usize,
        /// What was wrong.
        reason: String,
    },

    /// The dataset declares a coordinate reference we cannot read.
    #[error("dataset coordinate reference: {0}")]
    Crs(#[from] ProjectionError),

    /// The collection contains no polygon features.
    #[error("no polygon features found in the dataset")]
    NoPolygons,
}

/// A coordinate reference is unsupported or a coordinate is outside its
/// domain. Fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    /// The named reference is not one of the supported references.
    #[error("unsupported coordinate reference: {0}")]
    Unsupported(String),

    /// A coordinate cannot be transformed.
    #[error("coordinate ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain {
        /// Horizontal component.
        x: f64,
        /// Vertical component.
        y: f64,
        /// Reference the coordinate was interpreted in.
        crs: Crs,
    },
}

/// Intersection of one specific pair failed. Recoverable: the scan skips
/// the pair and continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    /// The boundary contains a NaN or infinite coordinate.
    #[error("{entity} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// The offending entity.
        entity: EntityId,
    },
}

/// Errors that abort an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Loading the dataset failed.
    #[error(transparent)]
    Load(#[from] DataLoadError),

    /// Reprojection failed.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// The configuration is unusable.
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{LineString, polygon};

    use super::*;

    fn sample_match(length: f64) -> BorderMatch {
        BorderMatch {
            length,
            geometry: MultiLineString::new(vec![LineString::from(vec![
                (0.0, 0.0),
                (length, 0.0),
            ])]),
            entity_a: EntityId(1),
            entity_b: EntityId(2),
        }
    }

    // --- BestBorder tests ---

    #[test]
    fn best_border_starts_empty() {
        let best = BestBorder::empty();
        assert!(best.is_empty());
        assert!(best.length().is_infinite());
        assert!(best.geometry().is_none());
        assert!(best.entity_a().is_none());
        assert!(best.entity_b().is_none());
        assert_eq!(best, BestBorder::default());
    }

    #[test]
    fn best_border_replace_updates_all_fields() {
        let mut best = BestBorder::empty();
        best.replace(sample_match(12.0));
        assert!((best.length() - 12.0).abs() < f64::EPSILON);
        assert_eq!(best.entity_a(), Some(EntityId(1)));
        assert_eq!(best.entity_b(), Some(EntityId(2)));
        assert_eq!(best.geometry().unwrap().0.len(), 1);
    }

    #[test]
    fn best_border_into_winner() {
        let best = BestBorder::from(sample_match(3.0));
        let winner = best.into_winner().unwrap();
        assert!((winner.length - 3.0).abs() < f64::EPSILON);
    }

    // --- Entity tests ---

    #[test]
    fn entity_bounding_rect() {
        let boundary = MultiPolygon::new(vec![polygon![
            (x: 1.0, y: 2.0),
            (x: 4.0, y: 2.0),
            (x: 4.0, y: 6.0),
            (x: 1.0, y: 2.0),
        ]]);
        let entity = Entity::new(EntityId(0), "Somewhere".to_string(), boundary);
        let rect = entity.bounding_rect().unwrap();
        assert!((rect.min().x - 1.0).abs() < f64::EPSILON);
        assert!((rect.max().y - 6.0).abs() < f64::EPSILON);
        assert_eq!(entity.name(), "Somewhere");
    }

    #[test]
    fn empty_entity_has_no_bounding_rect() {
        let entity = Entity::new(EntityId(3), "Nowhere".to_string(), MultiPolygon::new(vec![]));
        assert!(entity.bounding_rect().is_none());
    }

    #[test]
    fn entity_id_display() {
        assert_eq!(EntityId(7).to_string(), "entity #7");
    }

    // --- AnalysisConfig tests ---

    #[test]
    fn analysis_config_defaults() {
        let config = AnalysisConfig::default();
        assert!((config.min_length - 500.0).abs() < f64::EPSILON);
        assert_eq!(config.source_crs, Crs::Wgs84);
        assert_eq!(config.computation_crs, Crs::WorldMercator);
        assert_eq!(config.display_crs, Crs::Wgs84);
        assert_eq!(config.name_properties, vec!["NAME", "name", "ADMIN"]);
        assert_eq!(config.pair_visit, PairVisit::Ordered);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn analysis_config_rejects_negative_min_length() {
        let config = AnalysisConfig {
            min_length: -1.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn analysis_config_rejects_nan_min_length() {
        let config = AnalysisConfig {
            min_length: f64::NAN,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn analysis_config_rejects_empty_name_properties() {
        let config = AnalysisConfig {
            name_properties: Vec::new(),
            ..AnalysisConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid analysis configuration: name_properties must list at least one property",
        );
    }

    #[test]
    fn analysis_config_partial_json_fills_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"min_length": 1000.0, "computation_crs": "EPSG:3857"}"#)
                .unwrap();
        assert!((config.min_length - 1000.0).abs() < f64::EPSILON);
        assert_eq!(config.computation_crs, Crs::WebMercator);
        assert_eq!(config.display_crs, Crs::Wgs84);
    }

    // --- Error display tests ---

    #[test]
    fn geometry_error_display() {
        let err = GeometryError::NonFiniteCoordinate {
            entity: EntityId(4),
        };
        assert_eq!(err.to_string(), "entity #4 has a non-finite coordinate");
    }

    #[test]
    fn data_load_error_display() {
        let err = DataLoadError::InvalidGeometry {
            feature: 2,
            reason: "ring has no positions".to_string(),
        };
        assert_eq!(err.to_string(), "feature 2: invalid geometry: ring has no positions");
        assert_eq!(
            DataLoadError::NoPolygons.to_string(),
            "no polygon features found in the dataset"
        );
    }

    #[test]
    fn analysis_error_is_transparent_over_projection() {
        let err = AnalysisError::from(ProjectionError::Unsupported("EPSG:1".to_string()));
        assert_eq!(err.to_string(), "unsupported coordinate reference: EPSG:1");
    }
}

//! GeoJSON `FeatureCollection` reader.
//!
//! Only what the analysis needs is read: a name property and polygonal
//! geometry per feature. `Polygon` and `MultiPolygon` geometries are
//! accepted directly; a `GeometryCollection` contributes its polygonal
//! members. Features with any other (or `null`) geometry are skipped.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::projection::Crs;
use crate::types::DataLoadError;

/// Counts describing what a load kept and skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoadReport {
    /// Features present in the collection.
    pub total_features: usize,
    /// Features kept as entities.
    pub polygon_features: usize,
    /// Features dropped for having no polygonal geometry.
    pub skipped_features: usize,
    /// Kept features that carry none of the name properties.
    #[serde(default)]
    pub unnamed_features: usize,
}

/// Result of parsing a collection, before ids are assigned.
#[derive(Debug)]
pub(crate) struct ParsedCollection {
    pub crs: Option<Crs>,
    pub features: Vec<(String, MultiPolygon<f64>)>,
    pub report: LoadReport,
}

#[derive(Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
    #[serde(default)]
    crs: Option<RawCrs>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

/// Legacy (2008) named CRS member.
#[derive(Deserialize)]
struct RawCrs {
    properties: RawCrsProperties,
}

#[derive(Deserialize)]
struct RawCrsProperties {
    name: String,
}

type Position = Vec<f64>;
type Ring = Vec<Position>;

/// Parse collection text into named polygon boundaries.
pub(crate) fn parse_feature_collection(
    text: &str,
    name_properties: &[String],
) -> Result<ParsedCollection, DataLoadError> {
    if text.trim().is_empty() {
        return Err(DataLoadError::EmptyInput);
    }

    let raw: RawCollection = serde_json::from_str(text)?;
    if raw.kind != "FeatureCollection" {
        return Err(DataLoadError::NotFeatureCollection(raw.kind));
    }

    let crs = raw
        .crs
        .map(|c| c.properties.name.parse::<Crs>())
        .transpose()?;

    let total_features = raw.features.len();
    let mut features = Vec::with_capacity(total_features);
    let mut unnamed_features = 0;

    for (idx, feature) in raw.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let Some(boundary) = parse_geometry(idx, &geometry)? else {
            continue;
        };
        let name = feature_name(feature.properties.as_ref(), name_properties).unwrap_or_else(|| {
            unnamed_features += 1;
            format!("unnamed feature {idx}")
        });
        features.push((name, boundary));
    }

    if features.is_empty() {
        return Err(DataLoadError::NoPolygons);
    }

    let report = LoadReport {
        total_features,
        polygon_features: features.len(),
        skipped_features: total_features - features.len(),
        unnamed_features,
    };
    Ok(ParsedCollection {
        crs,
        features,
        report,
    })
}

/// First configured property holding a non-empty string.
///
/// A feature without one still takes part in the analysis; its shared
/// borders are real even if it has no label.
fn feature_name(
    properties: Option<&Map<String, Value>>,
    name_properties: &[String],
) -> Option<String> {
    properties.and_then(|props| {
        name_properties
            .iter()
            .filter_map(|key| props.get(key).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
            .map(ToString::to_string)
    })
}

/// Read a geometry object. `Ok(None)` means "not polygonal".
fn parse_geometry(feature: usize, value: &Value) -> Result<Option<MultiPolygon<f64>>, DataLoadError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(feature, "geometry has no \"type\""))?;

    match kind {
        "Polygon" => {
            let rings: Vec<Ring> = coordinates(feature, value)?;
            Ok(Some(MultiPolygon::new(
                polygon_from_rings(feature, rings)?.into_iter().collect(),
            )))
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<Ring>> = coordinates(feature, value)?;
            let mut parts = Vec::with_capacity(polygons.len());
            for rings in polygons {
                parts.extend(polygon_from_rings(feature, rings)?);
            }
            Ok(Some(MultiPolygon::new(parts)))
        }
        "GeometryCollection" => {
            let members = value
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid(feature, "GeometryCollection has no \"geometries\""))?;
            let mut parts = Vec::new();
            for member in members {
                if let Some(mp) = parse_geometry(feature, member)? {
                    parts.extend(mp.0);
                }
            }
            Ok((!parts.is_empty()).then(|| MultiPolygon::new(parts)))
        }
        _ => Ok(None),
    }
}

fn coordinates<T: DeserializeOwned>(feature: usize, value: &Value) -> Result<T, DataLoadError> {
    let raw = value
        .get("coordinates")
        .ok_or_else(|| invalid(feature, "geometry has no \"coordinates\""))?;
    T::deserialize(raw).map_err(|e| invalid(feature, &e.to_string()))
}

/// Build a polygon from GeoJSON rings (exterior first). A polygon with no
/// rings yields `None`.
fn polygon_from_rings(feature: usize, rings: Vec<Ring>) -> Result<Option<Polygon<f64>>, DataLoadError> {
    let mut rings = rings.into_iter();
    let Some(exterior) = rings.next() else {
        return Ok(None);
    };
    let exterior = ring_to_line_string(feature, exterior)?;
    let interiors = rings
        .map(|ring| ring_to_line_string(feature, ring))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Polygon::new(exterior, interiors)))
}

fn ring_to_line_string(feature: usize, ring: Ring) -> Result<LineString<f64>, DataLoadError> {
    ring.into_iter()
        .map(|pos| match pos.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(invalid(
                feature,
                &format!("position needs at least 2 numbers, got {}", pos.len()),
            )),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn invalid(feature: usize, reason: &str) -> DataLoadError {
    DataLoadError::InvalidGeometry {
        feature,
        reason: reason.to_string(),
    }
}

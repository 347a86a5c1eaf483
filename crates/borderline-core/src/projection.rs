//! Coordinate reference systems and pure coordinate transforms.
//!
//! Only the references the analysis needs are supported:
//!
//! - `EPSG:4326` -- geographic longitude/latitude in degrees (WGS 84).
//! - `EPSG:3395` -- World Mercator on the WGS 84 ellipsoid, metres.
//! - `EPSG:3857` -- spherical Web Mercator, metres.
//!
//! Every transform pivots through geographic coordinates. Transforms never
//! mutate their input: [`reproject`] returns a new geometry.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use std::str::FromStr;

use geo::{Coord, MapCoords};
use serde::{Deserialize, Serialize};

use crate::types::ProjectionError;

/// WGS 84 semi-major axis in metres.
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS 84 first eccentricity.
const ECCENTRICITY: f64 = 0.081_819_190_842_621_49;

/// Latitude limit (degrees) for Web Mercator, where the projected world
/// becomes square.
pub const WEB_MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Latitude limit (degrees) for World Mercator. The poles project to
/// infinity, so polar rings are clamped here.
pub const WORLD_MERCATOR_MAX_LATITUDE: f64 = 89.5;

/// Convergence threshold (radians) for the inverse ellipsoidal Mercator.
const INVERSE_TOLERANCE: f64 = 1e-12;

/// Iteration cap for the inverse ellipsoidal Mercator.
const INVERSE_MAX_ITERATIONS: usize = 15;

/// A supported coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// Geographic WGS 84 (`EPSG:4326`), x = longitude, y = latitude.
    #[serde(rename = "EPSG:4326")]
    Wgs84,
    /// World Mercator (`EPSG:3395`), ellipsoidal, metres.
    #[serde(rename = "EPSG:3395")]
    WorldMercator,
    /// Web Mercator (`EPSG:3857`), spherical, metres.
    #[serde(rename = "EPSG:3857")]
    WebMercator,
}

impl Crs {
    /// The EPSG code, e.g. `"EPSG:3395"`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Wgs84 => "EPSG:4326",
            Self::WorldMercator => "EPSG:3395",
            Self::WebMercator => "EPSG:3857",
        }
    }

    /// Whether coordinates are angular (longitude/latitude).
    #[must_use]
    pub const fn is_geographic(self) -> bool {
        matches!(self, Self::Wgs84)
    }

    /// Name of the linear unit lengths are measured in.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Wgs84 => "degrees",
            Self::WorldMercator | Self::WebMercator => "meters",
        }
    }

    /// Convert a geographic coordinate (degrees) into this reference.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::OutOfDomain`] for non-finite input or a
    /// latitude beyond ±90°.
    pub fn from_geographic(self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        if !c.x.is_finite() || !c.y.is_finite() || c.y.abs() > 90.0 {
            return Err(ProjectionError::OutOfDomain {
                x: c.x,
                y: c.y,
                crs: Self::Wgs84,
            });
        }
        Ok(match self {
            Self::Wgs84 => c,
            Self::WorldMercator => {
                let lat = c
                    .y
                    .clamp(-WORLD_MERCATOR_MAX_LATITUDE, WORLD_MERCATOR_MAX_LATITUDE)
                    .to_radians();
                let e_sin = ECCENTRICITY * lat.sin();
                let ratio = ((1.0 - e_sin) / (1.0 + e_sin)).powf(ECCENTRICITY / 2.0);
                Coord {
                    x: SEMI_MAJOR_AXIS * c.x.to_radians(),
                    y: SEMI_MAJOR_AXIS * ((FRAC_PI_4 + lat / 2.0).tan() * ratio).ln(),
                }
            }
            Self::WebMercator => {
                let lat = c
                    .y
                    .clamp(-WEB_MERCATOR_MAX_LATITUDE, WEB_MERCATOR_MAX_LATITUDE)
                    .to_radians();
                Coord {
                    x: SEMI_MAJOR_AXIS * c.x.to_radians(),
                    y: SEMI_MAJOR_AXIS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
                }
            }
        })
    }

    /// Convert a coordinate in this reference back to geographic degrees.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::OutOfDomain`] for non-finite input, or
    /// (for [`Crs::Wgs84`]) a latitude beyond ±90°.
    pub fn to_geographic(self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(ProjectionError::OutOfDomain {
                x: c.x,
                y: c.y,
                crs: self,
            });
        }
        match self {
            Self::Wgs84 => {
                if c.y.abs() > 90.0 {
                    return Err(ProjectionError::OutOfDomain {
                        x: c.x,
                        y: c.y,
                        crs: self,
                    });
                }
                Ok(c)
            }
            Self::WorldMercator => Ok(Coord {
                x: (c.x / SEMI_MAJOR_AXIS).to_degrees(),
                y: inverse_ellipsoidal_latitude(c.y).to_degrees(),
            }),
            Self::WebMercator => Ok(Coord {
                x: (c.x / SEMI_MAJOR_AXIS).to_degrees(),
                y: 2.0f64
                    .mul_add((c.y / SEMI_MAJOR_AXIS).exp().atan(), -FRAC_PI_2)
                    .to_degrees(),
            }),
        }
    }

    /// Convert a coordinate from this reference into `target`.
    ///
    /// # Errors
    ///
    /// Propagates [`ProjectionError::OutOfDomain`] from either leg.
    pub fn transform(self, target: Self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        if self == target {
            return Ok(c);
        }
        target.from_geographic(self.to_geographic(c)?)
    }
}

/// Iteratively solve for latitude (radians) from a World Mercator
/// northing.
fn inverse_ellipsoidal_latitude(y: f64) -> f64 {
    let t = (-y / SEMI_MAJOR_AXIS).exp();
    let mut lat = 2.0f64.mul_add(-t.atan(), FRAC_PI_2);
    for _ in 0..INVERSE_MAX_ITERATIONS {
        let e_sin = ECCENTRICITY * lat.sin();
        let ratio = ((1.0 - e_sin) / (1.0 + e_sin)).powf(ECCENTRICITY / 2.0);
        let next = 2.0f64.mul_add(-(t * ratio).atan(), FRAC_PI_2);
        let converged = (next - lat).abs() < INVERSE_TOLERANCE;
        lat = next;
        if converged {
            break;
        }
    }
    lat
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Crs {
    type Err = ProjectionError;

    /// Parse `EPSG:<code>` (case-insensitive), a bare code, or the OGC
    /// `CRS84` URN that legacy GeoJSON files carry.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        let code = upper
            .strip_prefix("EPSG:")
            .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG::"))
            .unwrap_or(&upper);
        match code {
            "4326" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84" | "CRS84" | "WGS84" => Ok(Self::Wgs84),
            "3395" => Ok(Self::WorldMercator),
            "3857" | "900913" => Ok(Self::WebMercator),
            _ => Err(ProjectionError::Unsupported(trimmed.to_string())),
        }
    }
}

/// Reproject a geometry from `from` into `to`, returning a new geometry.
///
/// # Errors
///
/// Returns the first [`ProjectionError`] hit by any coordinate.
pub fn reproject<G>(geometry: &G, from: Crs, to: Crs) -> Result<G, ProjectionError>
where
    G: MapCoords<f64, f64, Output = G> + Clone,
{
    if from == to {
        return Ok(geometry.clone());
    }
    geometry.try_map_coords(move |c| from.transform(to, c))
}

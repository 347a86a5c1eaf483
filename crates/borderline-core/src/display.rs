//! Reprojection of the scan result into the display reference.

use crate::projection::{self, Crs};
use crate::types::{BestBorder, BorderMatch, ProjectionError};

/// Return `best` with its geometry transformed from `from` into `target`.
///
/// The length and the entity pair are carried over untouched: the length
/// stays in the unit it was measured in. An empty result passes through
/// unchanged.
///
/// # Errors
///
/// Returns a [`ProjectionError`] if a border coordinate cannot be
/// transformed.
pub fn to_display_reference(
    best: &BestBorder,
    from: Crs,
    target: Crs,
) -> Result<BestBorder, ProjectionError> {
    let Some(winner) = best.winner() else {
        return Ok(BestBorder::empty());
    };
    let geometry = projection::reproject(&winner.geometry, from, target)?;
    Ok(BestBorder::from(BorderMatch {
        geometry,
        ..winner.clone()
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{LineString, MultiLineString};

    use super::*;
    use crate::types::EntityId;

    fn projected_match() -> BestBorder {
        let line = LineString::from(vec![(0.0, 0.0), (0.0, 111_325.0)]);
        BestBorder::from(BorderMatch {
            length: 111_325.0,
            geometry: MultiLineString::new(vec![line]),
            entity_a: EntityId(3),
            entity_b: EntityId(7),
        })
    }

    #[test]
    fn geometry_is_reprojected_and_metadata_kept() {
        let best = projected_match();
        let shown = to_display_reference(&best, Crs::WorldMercator, Crs::Wgs84).unwrap();
        let winner = shown.winner().unwrap();
        assert_eq!(winner.entity_a, EntityId(3));
        assert_eq!(winner.entity_b, EntityId(7));
        assert!((winner.length - 111_325.0).abs() < f64::EPSILON);
        let end = winner.geometry.0[0].0[1];
        assert!(end.x.abs() < 1e-9);
        assert!((end.y - 1.0).abs() < 0.02, "latitude {}", end.y);
    }

    #[test]
    fn same_reference_is_a_no_op() {
        let best = projected_match();
        let shown = to_display_reference(&best, Crs::WorldMercator, Crs::WorldMercator).unwrap();
        assert_eq!(shown, best);
    }

    #[test]
    fn empty_result_passes_through() {
        let shown =
            to_display_reference(&BestBorder::empty(), Crs::WorldMercator, Crs::Wgs84).unwrap();
        assert!(shown.is_empty());
    }
}

//! World-to-pixel mapping for one drawing panel.

use geo::{Coord, Rect, coord};

/// Maps a world rectangle into a pixel box, preserving aspect ratio.
///
/// The world rectangle is scaled uniformly to fit the box and centred in
/// it; the axis with slack shows extra world around the rectangle. Pixel
/// `y` grows downwards, so world `y` is flipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    /// Pixel box: left, top, width, height.
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    /// World coordinate shown at the centre of the box.
    centre: Coord<f64>,
    /// Pixels per world unit.
    scale: f64,
}

impl MapView {
    /// Fit `world` into the pixel box at (`left`, `top`) of the given size.
    ///
    /// A world rectangle with zero width or height is widened to the other
    /// dimension (or to one world unit if both are zero).
    #[must_use]
    pub fn fit(world: Rect<f64>, left: f64, top: f64, width: f64, height: f64) -> Self {
        let centre = world.center();
        let (mut ww, mut wh) = (world.width(), world.height());
        if ww <= 0.0 && wh <= 0.0 {
            (ww, wh) = (1.0, 1.0);
        } else if ww <= 0.0 {
            ww = wh;
        } else if wh <= 0.0 {
            wh = ww;
        }
        let scale = (width / ww).min(height / wh);
        Self {
            left,
            top,
            width,
            height,
            centre,
            scale,
        }
    }

    /// Pixel position of a world coordinate.
    #[must_use]
    pub fn to_px(&self, c: Coord<f64>) -> (f64, f64) {
        let x = self.left + self.width / 2.0 + (c.x - self.centre.x) * self.scale;
        let y = self.top + self.height / 2.0 - (c.y - self.centre.y) * self.scale;
        (x, y)
    }

    /// World rectangle covered by the whole pixel box.
    #[must_use]
    pub fn world_bounds(&self) -> Rect<f64> {
        let half_w = self.width / 2.0 / self.scale;
        let half_h = self.height / 2.0 / self.scale;
        Rect::new(
            coord! { x: self.centre.x - half_w, y: self.centre.y - half_h },
            coord! { x: self.centre.x + half_w, y: self.centre.y + half_h },
        )
    }

    /// Pixels per world unit.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Pixel box as (left, top, width, height).
    #[must_use]
    pub const fn pixel_box(&self) -> (f64, f64, f64, f64) {
        (self.left, self.top, self.width, self.height)
    }
}

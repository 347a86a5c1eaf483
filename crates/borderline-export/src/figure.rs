//! What a map figure shows and where each element goes.
//!
//! [`MapFigure`] gathers the drawable data (every entity, the winning pair,
//! the winning border, a title). [`FigureConfig`] holds the knobs. The
//! crate-private [`Layout`] turns both into pixel positions shared by the
//! SVG and PNG serializers, so the two formats place things identically.

use std::path::Path;

use borderline_core::{Analysis, BestBorder, Entity, EntityId, GeometryStore, SpatialIndex};
use geo::{BoundingRect, MultiLineString, Rect, coord};
use serde::{Deserialize, Serialize};

use crate::ExportError;
use crate::view::MapView;

/// Output format, chosen from the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Scalable vector graphics.
    Svg,
    /// Portable network graphics.
    Png,
}

impl ImageFormat {
    /// Pick the format for `path` from its extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::UnsupportedFormat`] for any extension other
    /// than `svg` or `png`, or when there is none.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("svg") => Ok(Self::Svg),
            Some("png") => Ok(Self::Png),
            _ => Err(ExportError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Margin around the winning border, in display units.
    pub buffer: f64,
    /// Whether to draw the zoomed inset panel.
    pub inset: bool,
    /// Margin around the winning border inside the inset, in display units.
    pub inset_padding: f64,
    /// Inset panel size as a fraction of the map area.
    pub inset_fraction: f64,
    /// Scale bar length, in display units.
    pub scale_bar_length: f64,
}

impl FigureConfig {
    /// 10 inches at 300 dpi.
    pub const DEFAULT_WIDTH: u32 = 3000;

    /// 10 inches at 300 dpi.
    pub const DEFAULT_HEIGHT: u32 = 3000;

    /// Default main-map margin around the border (half a degree).
    pub const DEFAULT_BUFFER: f64 = 0.5;

    /// Default inset margin around the border.
    pub const DEFAULT_INSET_PADDING: f64 = 0.001;

    /// Default inset size.
    pub const DEFAULT_INSET_FRACTION: f64 = 0.3;

    /// Default scale bar length.
    pub const DEFAULT_SCALE_BAR_LENGTH: f64 = 0.1;

    /// Largest accepted image side.
    pub const MAX_SIDE: u32 = 20_000;

    /// Check the configuration for values no figure can be drawn with.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidDimensions`] for a zero or oversized
    /// side, and [`ExportError::InvalidConfig`] for negative or non-finite
    /// lengths or an inset fraction outside `(0, 1)`.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.width == 0
            || self.height == 0
            || self.width > Self::MAX_SIDE
            || self.height > Self::MAX_SIDE
        {
            return Err(ExportError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        for (name, value) in [
            ("buffer", self.buffer),
            ("inset_padding", self.inset_padding),
            ("scale_bar_length", self.scale_bar_length),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ExportError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number, got {value}"
                )));
            }
        }
        if !(self.inset_fraction > 0.0 && self.inset_fraction < 1.0) {
            return Err(ExportError::InvalidConfig(format!(
                "inset_fraction must be between 0 and 1, got {}",
                self.inset_fraction,
            )));
        }
        Ok(())
    }
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            buffer: Self::DEFAULT_BUFFER,
            inset: true,
            inset_padding: Self::DEFAULT_INSET_PADDING,
            inset_fraction: Self::DEFAULT_INSET_FRACTION,
            scale_bar_length: Self::DEFAULT_SCALE_BAR_LENGTH,
        }
    }
}

/// Everything a figure draws.
#[derive(Debug, Clone)]
pub struct MapFigure<'a> {
    entities: &'a GeometryStore,
    index: SpatialIndex,
    pair: Option<(EntityId, EntityId)>,
    border: Option<&'a MultiLineString<f64>>,
    title: String,
}

impl<'a> MapFigure<'a> {
    /// Build a figure of `entities` highlighting `best`.
    ///
    /// `best` must be expressed in the same reference as `entities`.
    #[must_use]
    pub fn new(entities: &'a GeometryStore, best: &'a BestBorder) -> Self {
        let pair = best.winner().map(|w| (w.entity_a, w.entity_b));
        let title = match pair.and_then(|(a, b)| Some((entities.get(a)?, entities.get(b)?))) {
            Some((a, b)) => format!("Shortest border: {} - {}", a.name(), b.name()),
            None => "No qualifying border found".to_string(),
        };
        Self {
            entities,
            index: SpatialIndex::build(entities),
            pair,
            border: best.geometry(),
            title,
        }
    }

    /// Build a figure from a finished analysis.
    #[must_use]
    pub fn from_analysis(analysis: &'a Analysis) -> Self {
        Self::new(&analysis.entities, &analysis.best)
    }

    /// Replace the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The figure title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The two entities of the winning pair.
    #[must_use]
    pub fn pair(&self) -> Option<(&'a Entity, &'a Entity)> {
        let (a, b) = self.pair?;
        Some((self.entities.get(a)?, self.entities.get(b)?))
    }

    /// The winning border.
    #[must_use]
    pub const fn border(&self) -> Option<&'a MultiLineString<f64>> {
        self.border
    }

    /// Linear unit of the drawing reference.
    #[must_use]
    pub const fn unit(&self) -> &'static str {
        self.entities.crs().unit()
    }

    /// Main map extent: the border bounds grown by `config.buffer`, or the
    /// whole dataset when there is no border.
    #[must_use]
    pub fn extent(&self, config: &FigureConfig) -> Rect<f64> {
        self.border_bounds()
            .map(|r| grow(r, config.buffer))
            .or_else(|| self.entities.bounding_rect())
            .unwrap_or_else(|| Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }))
    }

    /// Inset extent: the border bounds grown by `config.inset_padding`.
    /// `None` without a border or with the inset disabled.
    #[must_use]
    pub fn inset_extent(&self, config: &FigureConfig) -> Option<Rect<f64>> {
        if !config.inset {
            return None;
        }
        self.border_bounds().map(|r| grow(r, config.inset_padding))
    }

    /// Legend rows, top to bottom.
    #[must_use]
    pub fn legend(&self) -> Vec<(Layer, String)> {
        let mut rows = vec![(Layer::World, "Boundaries".to_string())];
        if let Some((a, b)) = self.pair() {
            rows.push((Layer::Pair, format!("{} / {}", a.name(), b.name())));
        }
        if self.border.is_some() {
            rows.push((Layer::Border, "Shortest border".to_string()));
        }
        rows
    }

    /// Entities whose bounding box meets the view.
    pub(crate) fn visible(&self, view: &MapView) -> Vec<&'a Entity> {
        self.index
            .query(view.world_bounds())
            .into_iter()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    fn border_bounds(&self) -> Option<Rect<f64>> {
        self.border.and_then(BoundingRect::bounding_rect)
    }
}

/// Drawing layer, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Every entity boundary.
    World,
    /// The two entities of the winning pair.
    Pair,
    /// The winning border.
    Border,
}

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Self = Self(255, 255, 255);
    pub const BLACK: Self = Self(0, 0, 0);
    pub const WORLD_FILL: Self = Self(240, 240, 240);
    pub const WORLD_STROKE: Self = Self(128, 128, 128);
    pub const PAIR_FILL: Self = Self(173, 216, 230);
    pub const PAIR_STROKE: Self = Self(70, 130, 180);
    pub const BORDER: Self = Self(255, 0, 0);

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Layer {
    pub(crate) const fn fill(self) -> Option<Rgb> {
        match self {
            Self::World => Some(Rgb::WORLD_FILL),
            Self::Pair => Some(Rgb::PAIR_FILL),
            Self::Border => None,
        }
    }

    pub(crate) const fn stroke(self) -> Rgb {
        match self {
            Self::World => Rgb::WORLD_STROKE,
            Self::Pair => Rgb::PAIR_STROKE,
            Self::Border => Rgb::BORDER,
        }
    }
}

/// Pixel placement of every figure element.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub width: f64,
    pub height: f64,
    /// Unit for line widths and text sizes.
    pub em: f64,
    /// Baseline of the centred title.
    pub title_y: f64,
    pub main: MapView,
    pub inset: Option<MapView>,
    /// Top-left corner of the legend box.
    pub legend: (f64, f64),
    /// Tip of the north arrow.
    pub north: (f64, f64),
    /// Left end of the scale bar and its length in pixels.
    pub scale_bar: (f64, f64, f64),
}

impl Layout {
    pub fn new(figure: &MapFigure<'_>, config: &FigureConfig) -> Self {
        let width = f64::from(config.width);
        let height = f64::from(config.height);
        let em = width.min(height) / 100.0;
        let margin = 2.0 * em;
        let title_band = 6.0 * em;

        let map_left = margin;
        let map_top = title_band;
        let map_width = (width - 2.0 * margin).max(1.0);
        let map_height = (height - title_band - margin).max(1.0);
        let main = MapView::fit(
            figure.extent(config),
            map_left,
            map_top,
            map_width,
            map_height,
        );

        let inset = figure.inset_extent(config).map(|world| {
            let w = map_width * config.inset_fraction;
            let h = map_height * config.inset_fraction;
            MapView::fit(world, map_left + map_width - w - em, map_top + em, w, h)
        });

        let rows = figure.legend().len();
        #[allow(clippy::cast_precision_loss)]
        let legend_height = (rows as f64).mul_add(3.0 * em, em);
        let legend = (map_left + em, map_top + map_height - em - legend_height);

        let north = (map_left + 3.0 * em, map_top + 2.0 * em);

        let bar_px = config.scale_bar_length * main.scale();
        let scale_bar = (
            map_left + map_width - 2.0 * em - bar_px,
            map_top + map_height - 2.0 * em,
            bar_px,
        );

        Self {
            width,
            height,
            em,
            title_y: title_band * 0.65,
            main,
            inset,
            legend,
            north,
            scale_bar,
        }
    }
}

fn grow(r: Rect<f64>, by: f64) -> Rect<f64> {
    Rect::new(
        coord! { x: r.min().x - by, y: r.min().y - by },
        coord! { x: r.max().x + by, y: r.max().y + by },
    )
}

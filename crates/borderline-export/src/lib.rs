//! borderline-export: Pure map figure serializers (sans-IO)
//!
//! Draws an analysis result as a map figure: every entity boundary, the
//! winning pair highlighted, the winning border in red, a zoomed inset,
//! legend, north arrow and scale bar. Supports SVG and PNG; both return
//! bytes in memory and leave writing files to the caller.

pub mod figure;
pub mod raster;
pub mod svg;
pub mod view;

pub use figure::{FigureConfig, ImageFormat, Layer, MapFigure};
pub use raster::to_png;
pub use svg::to_svg;
pub use view::MapView;

/// Errors from figure export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The output path does not name a supported format.
    #[error("unsupported output format for {0:?} (expected .svg or .png)")]
    UnsupportedFormat(String),

    /// The image size is zero or too large to allocate.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// A figure option is out of range.
    #[error("invalid figure configuration: {0}")]
    InvalidConfig(String),

    /// The image encoder failed.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Validate `config` and serialize `figure` in `format`.
///
/// # Errors
///
/// Returns an [`ExportError`] if the configuration is invalid or the
/// image cannot be produced.
pub fn render(
    figure: &MapFigure<'_>,
    config: &FigureConfig,
    format: ImageFormat,
) -> Result<Vec<u8>, ExportError> {
    config.validate()?;
    match format {
        ImageFormat::Svg => Ok(to_svg(figure, config).into_bytes()),
        ImageFormat::Png => to_png(figure, config),
    }
}

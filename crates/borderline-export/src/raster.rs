//! PNG map serializer.
//!
//! Rasterises the same layout as the SVG output with `tiny-skia`:
//! anti-aliased polygon fills and strokes, the winning border, the inset
//! panel (rendered into its own pixmap and composited, which clips it),
//! legend swatches, the north arrow and the scale bar. `tiny-skia` has no
//! text support, so the PNG carries no title or labels.

use geo::{LineString, MultiLineString, MultiPolygon};
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect,
    Stroke, Transform,
};

use crate::ExportError;
use crate::figure::{FigureConfig, Layer, Layout, MapFigure, Rgb};
use crate::view::MapView;

/// Serialize a map figure into PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::InvalidDimensions`] if a pixmap of the configured
/// size cannot be allocated, and [`ExportError::Encode`] if PNG encoding
/// fails.
pub fn to_png(figure: &MapFigure<'_>, config: &FigureConfig) -> Result<Vec<u8>, ExportError> {
    render(figure, config)?
        .encode_png()
        .map_err(|e| ExportError::Encode(e.to_string()))
}

/// Rasterise a map figure into a pixmap.
///
/// # Errors
///
/// Returns [`ExportError::InvalidDimensions`] if a pixmap of the configured
/// size cannot be allocated.
#[allow(clippy::cast_possible_truncation)]
pub fn render(figure: &MapFigure<'_>, config: &FigureConfig) -> Result<Pixmap, ExportError> {
    let invalid = || ExportError::InvalidDimensions {
        width: config.width,
        height: config.height,
    };
    let layout = Layout::new(figure, config);
    let em = layout.em as f32;

    let mut pixmap = Pixmap::new(config.width, config.height).ok_or_else(invalid)?;
    pixmap.fill(color(Rgb::WHITE));

    draw_layers(&mut pixmap, figure, &layout.main, em);

    if let (Some(view), Some(world)) = (layout.inset, figure.inset_extent(config)) {
        let (x, y, w, h) = view.pixel_box();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (pw, ph) = (w.round().max(1.0) as u32, h.round().max(1.0) as u32);
        let mut inset = Pixmap::new(pw, ph).ok_or_else(invalid)?;
        inset.fill(color(Rgb::WHITE));
        let local = MapView::fit(world, 0.0, 0.0, f64::from(pw), f64::from(ph));
        draw_layers(&mut inset, figure, &local, em);

        let (ix, iy) = (x.round() as i32, y.round() as i32);
        pixmap.draw_pixmap(
            ix,
            iy,
            inset.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        #[allow(clippy::cast_precision_loss)]
        let frame = rect_path(ix as f32, iy as f32, pw as f32, ph as f32);
        if let Some(frame) = frame {
            stroke(&mut pixmap, &frame, Rgb::BLACK, 0.2 * em);
        }
    }

    draw_legend(&mut pixmap, figure, &layout);
    draw_north_arrow(&mut pixmap, &layout);
    draw_scale_bar(&mut pixmap, &layout);

    Ok(pixmap)
}

fn draw_layers(pixmap: &mut Pixmap, figure: &MapFigure<'_>, view: &MapView, em: f32) {
    for entity in figure.visible(view) {
        draw_area(pixmap, entity.boundary(), view, Layer::World, 0.1 * em);
    }
    if let Some((a, b)) = figure.pair() {
        for entity in [a, b] {
            draw_area(pixmap, entity.boundary(), view, Layer::Pair, 0.15 * em);
        }
    }
    if let Some(path) = figure.border().and_then(|b| lines_path(b, view)) {
        let stroke = Stroke {
            width: 0.5 * em,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(
            &path,
            &paint(Layer::Border.stroke()),
            &stroke,
            Transform::identity(),
            None,
        );
    }
}

fn draw_area(
    pixmap: &mut Pixmap,
    boundary: &MultiPolygon<f64>,
    view: &MapView,
    layer: Layer,
    stroke_width: f32,
) {
    let Some(path) = polygon_path(boundary, view) else {
        return;
    };
    if let Some(fill) = layer.fill() {
        pixmap.fill_path(
            &path,
            &paint(fill),
            FillRule::EvenOdd,
            Transform::identity(),
            None,
        );
    }
    stroke(pixmap, &path, layer.stroke(), stroke_width);
}

#[allow(clippy::cast_possible_truncation)]
fn draw_legend(pixmap: &mut Pixmap, figure: &MapFigure<'_>, layout: &Layout) {
    let em = layout.em as f32;
    let rows = figure.legend();
    let (left, top) = (layout.legend.0 as f32, layout.legend.1 as f32);
    #[allow(clippy::cast_precision_loss)]
    let height = (rows.len() as f32).mul_add(3.0 * em, em);

    if let Some(frame) = rect_path(left, top, 6.0 * em, height) {
        pixmap.fill_path(
            &frame,
            &paint(Rgb::WHITE),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
        stroke(pixmap, &frame, Rgb::BLACK, 0.1 * em);
    }

    for (i, (layer, _)) in rows.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = (i as f32).mul_add(3.0 * em, top + em);
        if *layer == Layer::Border {
            fill_rect(pixmap, left + em, y + 0.9 * em, 3.0 * em, 0.4 * em, layer.stroke());
        } else if let Some(swatch) = rect_path(left + em, y, 3.0 * em, 2.0 * em) {
            if let Some(fill) = layer.fill() {
                pixmap.fill_path(
                    &swatch,
                    &paint(fill),
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
            stroke(pixmap, &swatch, layer.stroke(), 0.1 * em);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn draw_north_arrow(pixmap: &mut Pixmap, layout: &Layout) {
    let em = layout.em as f32;
    let (x, y) = (layout.north.0 as f32, layout.north.1 as f32);
    let mut pb = PathBuilder::new();
    pb.move_to(x, y);
    pb.line_to(x - em, y + 3.0 * em);
    pb.line_to(x, y + 2.2 * em);
    pb.line_to(x + em, y + 3.0 * em);
    pb.close();
    if let Some(path) = pb.finish() {
        pixmap.fill_path(
            &path,
            &paint(Rgb::BLACK),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

#[allow(clippy::cast_possible_truncation)]
fn draw_scale_bar(pixmap: &mut Pixmap, layout: &Layout) {
    let em = layout.em as f32;
    let (x, y, len) = layout.scale_bar;
    fill_rect(pixmap, x as f32, y as f32, len as f32, 0.4 * em, Rgb::BLACK);
}

/// Build a closed path for every ring of `boundary` in pixel space.
fn polygon_path(boundary: &MultiPolygon<f64>, view: &MapView) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for polygon in boundary {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            if push_line(&mut pb, ring, view) {
                pb.close();
            }
        }
    }
    pb.finish()
}

/// Build an open path for every line string of `lines` in pixel space.
fn lines_path(lines: &MultiLineString<f64>, view: &MapView) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for line in lines {
        push_line(&mut pb, line, view);
    }
    pb.finish()
}

#[allow(clippy::cast_possible_truncation)]
fn push_line(pb: &mut PathBuilder, line: &LineString<f64>, view: &MapView) -> bool {
    let [first, rest @ ..] = line.0.as_slice() else {
        return false;
    };
    if rest.is_empty() || !line.0.iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return false;
    }
    let (x, y) = view.to_px(*first);
    pb.move_to(x as f32, y as f32);
    for c in rest {
        let (x, y) = view.to_px(*c);
        pb.line_to(x as f32, y as f32);
    }
    true
}

fn rect_path(x: f32, y: f32, w: f32, h: f32) -> Option<Path> {
    Rect::from_xywh(x, y, w, h).map(PathBuilder::from_rect)
}

fn fill_rect(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, rgb: Rgb) {
    if let Some(rect) = Rect::from_xywh(x, y, w, h) {
        pixmap.fill_rect(rect, &paint(rgb), Transform::identity(), None);
    }
}

fn stroke(pixmap: &mut Pixmap, path: &Path, rgb: Rgb, width: f32) {
    let stroke = Stroke {
        width,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(path, &paint(rgb), &stroke, Transform::identity(), None);
}

fn paint(rgb: Rgb) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb.0, rgb.1, rgb.2, 255);
    paint.anti_alias = true;
    paint
}

fn color(rgb: Rgb) -> Color {
    Color::from_rgba8(rgb.0, rgb.1, rgb.2, 255)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::sample;

    fn small() -> FigureConfig {
        FigureConfig {
            width: 300,
            height: 300,
            ..FigureConfig::default()
        }
    }

    fn pixel(pixmap: &Pixmap, x: f64, y: f64) -> (u8, u8, u8) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let p = pixmap.pixel(x as u32, y as u32).unwrap();
        (p.red(), p.green(), p.blue())
    }

    #[test]
    fn png_has_signature_and_size() {
        let analysis = sample(500.0);
        let figure = MapFigure::from_analysis(&analysis);
        let bytes = to_png(&figure, &small()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        // IHDR width and height, big-endian.
        assert_eq!(u32::from_be_bytes(bytes[16..20].try_into().unwrap()), 300);
        assert_eq!(u32::from_be_bytes(bytes[20..24].try_into().unwrap()), 300);
    }

    #[test]
    fn border_is_drawn_in_red() {
        let analysis = sample(500.0);
        let figure = MapFigure::from_analysis(&analysis);
        let config = FigureConfig {
            inset: false,
            ..small()
        };
        let pixmap = render(&figure, &config).unwrap();
        let layout = Layout::new(&figure, &config);
        let border = figure.border().unwrap();
        let mid = border.0[0].0[0];
        let (x, y) = layout.main.to_px(geo::coord! { x: mid.x, y: mid.y + 0.5 });
        // Anti-aliasing blends the stroke edge, so only require red to
        // dominate.
        let (r, g, b) = pixel(&pixmap, x, y);
        assert!(r > 200 && g < 150 && b < 150, "({r}, {g}, {b})");
    }

    #[test]
    fn pair_is_filled_light_blue() {
        let analysis = sample(500.0);
        let figure = MapFigure::from_analysis(&analysis);
        let config = FigureConfig {
            inset: false,
            ..small()
        };
        let pixmap = render(&figure, &config).unwrap();
        let layout = Layout::new(&figure, &config);
        // Inside Alpha, away from any edge.
        let (x, y) = layout.main.to_px(geo::coord! { x: 2.7, y: 2.5 });
        let Rgb(r, g, b) = Rgb::PAIR_FILL;
        assert_eq!(pixel(&pixmap, x, y), (r, g, b));
    }

    #[test]
    fn empty_result_renders() {
        let analysis = sample(1.0e9);
        let figure = MapFigure::from_analysis(&analysis);
        let bytes = to_png(&figure, &small()).unwrap();
        assert!(bytes.len() > 8);
    }

    #[test]
    fn unallocatable_pixmap_is_an_error() {
        let analysis = sample(500.0);
        let figure = MapFigure::from_analysis(&analysis);
        let config = FigureConfig {
            width: 0,
            ..small()
        };
        assert!(matches!(
            render(&figure, &config),
            Err(ExportError::InvalidDimensions { .. })
        ));
    }
}

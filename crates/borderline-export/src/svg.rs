//! SVG map serializer.
//!
//! Builds the figure with the [`svg`] crate: a `<title>`, the main map
//! (world, pair and border layers), an optional inset clipped to its
//! panel, a legend, a north arrow and a scale bar. Polygon rings become
//! `M`/`L`/`Z` path data with `evenodd` filling so holes stay open.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use geo::{LineString, MultiLineString, MultiPolygon};
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{
    ClipPath, Definitions, Group, Path, Polygon, Rectangle, Text as TextElement, Title,
};
use svg::node::Value;

use crate::figure::{FigureConfig, Layer, Layout, MapFigure, Rgb};
use crate::view::MapView;

/// Build path data for every ring of `boundary` in pixel space.
///
/// Rings with fewer than 2 points or a non-finite coordinate are skipped.
/// Returns an empty string if nothing remains.
#[must_use]
pub fn polygon_path_data(boundary: &MultiPolygon<f64>, view: &MapView) -> String {
    let mut data = Data::new();
    let mut any = false;
    for polygon in boundary {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            let (d, drawn) = append_line(data, ring, view);
            data = if drawn { d.close() } else { d };
            any |= drawn;
        }
    }
    if any {
        String::from(Value::from(data))
    } else {
        String::new()
    }
}

/// Build path data for every line string of `lines` in pixel space.
#[must_use]
pub fn line_path_data(lines: &MultiLineString<f64>, view: &MapView) -> String {
    let mut data = Data::new();
    let mut any = false;
    for line in lines {
        let (d, drawn) = append_line(data, line, view);
        data = d;
        any |= drawn;
    }
    if any {
        String::from(Value::from(data))
    } else {
        String::new()
    }
}

/// Append `line` as one subpath; the flag is `false` if it was too short.
fn append_line(data: Data, line: &LineString<f64>, view: &MapView) -> (Data, bool) {
    let [first, rest @ ..] = line.0.as_slice() else {
        return (data, false);
    };
    // Rings with coordinates outside the drawing reference are left out.
    if rest.is_empty() || !line.0.iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return (data, false);
    }
    let mut data = data.move_to(view.to_px(*first));
    for c in rest {
        data = data.line_to(view.to_px(*c));
    }
    (data, true)
}

/// Serialize a map figure into an SVG document string.
#[must_use]
pub fn to_svg(figure: &MapFigure<'_>, config: &FigureConfig) -> String {
    let layout = Layout::new(figure, config);
    let em = layout.em;

    let mut doc = Document::new()
        .set("width", config.width)
        .set("height", config.height)
        .set("viewBox", (0, 0, config.width, config.height))
        .add(Title::new(figure.title()))
        .add(
            Rectangle::new()
                .set("width", "100%")
                .set("height", "100%")
                .set("fill", Rgb::WHITE.hex()),
        )
        .add(
            TextElement::new(figure.title())
                .set("x", layout.width / 2.0)
                .set("y", layout.title_y)
                .set("text-anchor", "middle")
                .set("font-family", "sans-serif")
                .set("font-size", 3.0 * em),
        );

    doc = doc.add(layers(figure, &layout.main, em).set("id", "main"));

    if let Some(view) = layout.inset {
        let (x, y, w, h) = view.pixel_box();
        let frame = || {
            Rectangle::new()
                .set("x", x)
                .set("y", y)
                .set("width", w)
                .set("height", h)
        };
        doc = doc
            .add(Definitions::new().add(ClipPath::new().set("id", "inset-clip").add(frame())))
            .add(
                Group::new()
                    .set("id", "inset")
                    .add(frame().set("fill", Rgb::WHITE.hex()))
                    .add(layers(figure, &view, em).set("clip-path", "url(#inset-clip)"))
                    .add(
                        frame()
                            .set("fill", "none")
                            .set("stroke", Rgb::BLACK.hex())
                            .set("stroke-width", 0.2 * em),
                    ),
            );
    }

    doc = doc
        .add(legend(figure, &layout))
        .add(north_arrow(&layout))
        .add(scale_bar(figure, config, &layout));

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

/// World, pair and border layers drawn through `view`.
fn layers(figure: &MapFigure<'_>, view: &MapView, em: f64) -> Group {
    let mut world = Group::new().set("class", "world");
    for entity in figure.visible(view) {
        let d = polygon_path_data(entity.boundary(), view);
        if !d.is_empty() {
            world = world.add(area_path(d, Layer::World, 0.1 * em));
        }
    }

    let mut group = Group::new().add(world);

    if let Some((a, b)) = figure.pair() {
        let mut pair = Group::new().set("class", "pair");
        for entity in [a, b] {
            let d = polygon_path_data(entity.boundary(), view);
            if !d.is_empty() {
                pair = pair.add(area_path(d, Layer::Pair, 0.15 * em));
            }
        }
        group = group.add(pair);
    }

    if let Some(border) = figure.border() {
        let d = line_path_data(border, view);
        if !d.is_empty() {
            group = group.add(
                Path::new()
                    .set("class", "border")
                    .set("d", d)
                    .set("fill", "none")
                    .set("stroke", Layer::Border.stroke().hex())
                    .set("stroke-width", 0.5 * em)
                    .set("stroke-linecap", "round")
                    .set("stroke-linejoin", "round"),
            );
        }
    }
    group
}

fn area_path(d: String, layer: Layer, stroke_width: f64) -> Path {
    Path::new()
        .set("d", d)
        .set("fill", layer.fill().map_or_else(|| "none".to_string(), Rgb::hex))
        .set("fill-rule", "evenodd")
        .set("stroke", layer.stroke().hex())
        .set("stroke-width", stroke_width)
}

fn legend(figure: &MapFigure<'_>, layout: &Layout) -> Group {
    let em = layout.em;
    let rows = figure.legend();
    let (left, top) = layout.legend;
    let widest = rows.iter().map(|(_, label)| label.chars().count()).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let box_width = (widest as f64).mul_add(1.2 * em, 6.0 * em);
    #[allow(clippy::cast_precision_loss)]
    let box_height = (rows.len() as f64).mul_add(3.0 * em, em);

    let mut group = Group::new().set("id", "legend").add(
        Rectangle::new()
            .set("x", left)
            .set("y", top)
            .set("width", box_width)
            .set("height", box_height)
            .set("fill", Rgb::WHITE.hex())
            .set("stroke", Rgb::BLACK.hex())
            .set("stroke-width", 0.1 * em),
    );

    for (i, (layer, label)) in rows.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = (i as f64).mul_add(3.0 * em, top + em);
        let swatch = if *layer == Layer::Border {
            Rectangle::new()
                .set("x", left + em)
                .set("y", y + 0.9 * em)
                .set("width", 3.0 * em)
                .set("height", 0.4 * em)
                .set("fill", layer.stroke().hex())
        } else {
            Rectangle::new()
                .set("x", left + em)
                .set("y", y)
                .set("width", 3.0 * em)
                .set("height", 2.0 * em)
                .set("fill", layer.fill().map_or_else(|| "none".to_string(), Rgb::hex))
                .set("stroke", layer.stroke().hex())
                .set("stroke-width", 0.1 * em)
        };
        group = group.add(swatch).add(
            TextElement::new(label.as_str())
                .set("x", left + 5.0 * em)
                .set("y", y + 1.6 * em)
                .set("font-family", "sans-serif")
                .set("font-size", 1.8 * em),
        );
    }
    group
}

fn north_arrow(layout: &Layout) -> Group {
    let em = layout.em;
    let (x, y) = layout.north;
    let points = format!(
        "{},{} {},{} {},{} {},{}",
        x,
        y,
        x - em,
        y + 3.0 * em,
        x,
        y + 2.2 * em,
        x + em,
        y + 3.0 * em,
    );
    Group::new()
        .set("id", "north-arrow")
        .add(Polygon::new().set("points", points).set("fill", Rgb::BLACK.hex()))
        .add(
            TextElement::new("N")
                .set("x", x)
                .set("y", y + 5.0 * em)
                .set("text-anchor", "middle")
                .set("font-family", "sans-serif")
                .set("font-size", 2.0 * em),
        )
}

fn scale_bar(figure: &MapFigure<'_>, config: &FigureConfig, layout: &Layout) -> Group {
    let em = layout.em;
    let (x, y, len) = layout.scale_bar;
    Group::new()
        .set("id", "scale-bar")
        .add(
            Rectangle::new()
                .set("x", x)
                .set("y", y)
                .set("width", len)
                .set("height", 0.4 * em)
                .set("fill", Rgb::BLACK.hex()),
        )
        .add(
            TextElement::new(format!("{} {}", config.scale_bar_length, figure.unit()))
                .set("x", x + len / 2.0)
                .set("y", y - 0.6 * em)
                .set("text-anchor", "middle")
                .set("font-family", "sans-serif")
                .set("font-size", 1.6 * em),
        )
}

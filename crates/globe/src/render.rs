//! SVG output for a projected frame.

use foundation::math::Vec2;
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, ClipPath, Definitions, Group, Path};

use crate::scene::{ProjectedFrame, ProjectedShape};

/// Fill and stroke colours of the globe.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeStyle {
    pub ocean: String,
    pub land: String,
    pub visited: String,
    pub border: String,
    pub speckle: String,
}

impl Default for GlobeStyle {
    fn default() -> Self {
        Self {
            ocean: "#0b1d33".to_string(),
            land: "#24405f".to_string(),
            visited: "#e9b949".to_string(),
            border: "#0b1d33".to_string(),
            speckle: "#fff7d6".to_string(),
        }
    }
}

/// Clip-path id of a shape's silhouette.
pub fn clip_id(shape: &ProjectedShape) -> String {
    format!("country-clip-{}", shape.index)
}

fn fmt_px(v: f64) -> String {
    format!("{v:.2}")
}

fn outline(shape: &ProjectedShape) -> Data {
    let mut data = Data::new();
    for ring in &shape.rings {
        let mut points = ring.iter();
        let Some(first) = points.next() else {
            continue;
        };
        data = data.move_to(xy(*first));
        for p in points {
            data = data.line_to(xy(*p));
        }
        data = data.close();
    }
    data
}

fn xy(p: Vec2) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Renders one frame as a standalone SVG document.
///
/// Speckles of each visited shape sit in a group clipped to that shape's
/// outline, so they never spill onto neighbours or the ocean.
pub fn render_svg(frame: &ProjectedFrame, style: &GlobeStyle) -> Document {
    let vp = frame.viewport;
    let mut defs = Definitions::new();
    let mut land = Group::new().set("class", "countries");
    let mut lights = Group::new().set("class", "speckles");

    for shape in &frame.shapes {
        let fill = if shape.visited {
            &style.visited
        } else {
            &style.land
        };
        land = land.add(
            Path::new()
                .set("d", outline(shape))
                .set("fill", fill.as_str())
                .set("fill-rule", "evenodd")
                .set("stroke", style.border.as_str())
                .set("stroke-width", "0.5")
                .set("class", if shape.visited { "visited" } else { "country" })
                .set("data-name", shape.name.as_str()),
        );

        if !shape.visited || shape.speckles.is_empty() {
            continue;
        }

        let id = clip_id(shape);
        defs = defs.add(
            ClipPath::new().set("id", id.as_str()).add(
                Path::new()
                    .set("d", outline(shape))
                    .set("clip-rule", "evenodd"),
            ),
        );

        let mut group = Group::new().set("clip-path", format!("url(#{id})"));
        for sp in &shape.speckles {
            group = group.add(
                Circle::new()
                    .set("cx", fmt_px(sp.point.x))
                    .set("cy", fmt_px(sp.point.y))
                    .set("r", fmt_px(sp.radius))
                    .set("fill", style.speckle.as_str())
                    .set("fill-opacity", format!("{:.3}", sp.opacity)),
            );
        }
        lights = lights.add(group);
    }

    let ocean = Circle::new()
        .set("cx", fmt_px(frame.center.x))
        .set("cy", fmt_px(frame.center.y))
        .set("r", fmt_px(frame.radius))
        .set("fill", style.ocean.as_str())
        .set("class", "ocean");

    Document::new()
        .set("viewBox", format!("0 0 {} {}", fmt_px(vp.width), fmt_px(vp.height)))
        .set("width", fmt_px(vp.width))
        .set("height", fmt_px(vp.height))
        .add(defs)
        .add(ocean)
        .add(land)
        .add(lights)
}

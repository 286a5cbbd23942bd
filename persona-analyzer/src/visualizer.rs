//! Radar chart rendering
//!
//! Draws trait scores as an SVG radar chart: one axis per trait in canonical
//! order starting at the top and running clockwise, concentric grid pentagons
//! every 20%, and the score polygon with point markers.
//!
//! All coordinates are printed with two decimals so the same scores always
//! render to the same bytes.

use base64::{engine::general_purpose, Engine as _};
use persona_common::{Trait, TraitScores};
use std::f64::consts::PI;

const WIDTH: f64 = 500.0;
const HEIGHT: f64 = 500.0;
const CENTER_X: f64 = 250.0;
const CENTER_Y: f64 = 260.0;
const RADIUS: f64 = 180.0;
const LABEL_OFFSET: f64 = 24.0;
const GRID_LEVELS: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];

const TITLE: &str = "Personality Traits Analysis";
const FILL_COLOR: &str = "#4CAF50";
const GRID_COLOR: &str = "#CCCCCC";
const TEXT_COLOR: &str = "#333333";

/// Rendered chart image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chart {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Chart {
    /// `data:` URI suitable for an `<img src>`
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Position of axis `index` at fraction `level` of the radius
fn point(index: usize, level: f64) -> (f64, f64) {
    let angle = -PI / 2.0 + index as f64 * 2.0 * PI / Trait::ALL.len() as f64;
    (
        CENTER_X + RADIUS * level * angle.cos(),
        CENTER_Y + RADIUS * level * angle.sin(),
    )
}

fn polygon_points(levels: impl Iterator<Item = f64>) -> String {
    levels
        .enumerate()
        .map(|(i, level)| {
            let (x, y) = point(i, level);
            format!("{:.2},{:.2}", x, y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render trait scores as an SVG radar chart
pub fn render_radar_chart(scores: &TraitScores) -> Chart {
    let mut svg = String::with_capacity(4096);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\" font-family=\"sans-serif\">\n",
        w = WIDTH,
        h = HEIGHT
    ));
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"#FFFFFF\"/>\n");
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"32\" text-anchor=\"middle\" font-size=\"20\" font-weight=\"bold\" fill=\"{}\">{}</text>\n",
        CENTER_X, TEXT_COLOR, TITLE
    ));

    // Grid
    for level in GRID_LEVELS {
        svg.push_str(&format!(
            "<polygon points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>\n",
            polygon_points(std::iter::repeat(level).take(Trait::ALL.len())),
            GRID_COLOR
        ));
        let (x, y) = point(0, level);
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"10\" fill=\"#888888\">{:.0}%</text>\n",
            x + 4.0,
            y + 12.0,
            level * 100.0
        ));
    }

    // Axes and labels
    for (i, t) in Trait::ALL.iter().enumerate() {
        let (x, y) = point(i, 1.0);
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1\"/>\n",
            CENTER_X, CENTER_Y, x, y, GRID_COLOR
        ));

        let (lx, ly) = point(i, 1.0 + LABEL_OFFSET / RADIUS);
        let anchor = if (lx - CENTER_X).abs() < 1.0 {
            "middle"
        } else if lx > CENTER_X {
            "start"
        } else {
            "end"
        };
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"{}\" font-size=\"14\" fill=\"{}\">{}</text>\n",
            lx,
            ly + 5.0,
            anchor,
            TEXT_COLOR,
            t.name()
        ));
    }

    // Scores
    svg.push_str(&format!(
        "<polygon points=\"{}\" fill=\"{c}\" fill-opacity=\"0.25\" stroke=\"{c}\" stroke-width=\"2\"/>\n",
        polygon_points(scores.iter().map(|(_, s)| s)),
        c = FILL_COLOR
    ));
    for (i, (t, score)) in scores.iter().enumerate() {
        let (x, y) = point(i, score);
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\" fill=\"{}\"><title>{}: {:.2}</title></circle>\n",
            x,
            y,
            FILL_COLOR,
            t.name(),
            score
        ));
    }

    svg.push_str("</svg>\n");

    Chart {
        mime_type: "image/svg+xml",
        bytes: svg.into_bytes(),
    }
}

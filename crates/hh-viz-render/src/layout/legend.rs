use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::{LegendConfig, LegendPosition};
use crate::layout::margins::PlotArea;
use crate::primitives::{Marker, Paint, Stroke, TextAlign, TextStyle};

pub struct LegendEntry {
    pub label: String,
    pub color: Color,
    pub kind: LegendKind,
}

pub enum LegendKind {
    /// Filled box (`F`).
    FilledRect,
    /// Line segment (`L`).
    Line,
    /// Marker on a line segment (`LP`).
    LineMarker,
}

/// Legend box in canvas coordinates: `(left, top, width, height)`.
///
/// Sizes and the offset are fractions of the page; the box is anchored to
/// the frame corner named by `position`.
pub fn legend_box(
    page_w: f64,
    page_h: f64,
    frame: &PlotArea,
    config: &LegendConfig,
) -> (f64, f64, f64, f64) {
    let w = config.width * page_w;
    let h = config.height * page_h;
    let ox = config.offset * page_w;
    let oy = config.offset * page_h;

    let x = match config.position {
        LegendPosition::TopLeft | LegendPosition::BottomLeft => frame.left + ox,
        LegendPosition::TopCenter | LegendPosition::BottomCenter => frame.center_x() - w / 2.0,
        LegendPosition::TopRight | LegendPosition::BottomRight => frame.right() - ox - w,
    };
    let y = match config.position {
        LegendPosition::TopLeft | LegendPosition::TopCenter | LegendPosition::TopRight => {
            frame.top + oy
        }
        _ => frame.bottom() - oy - h,
    };
    (x, y, w, h)
}

/// Draw a borderless legend, one row per entry, filling the configured box.
pub fn draw_legend(
    canvas: &mut Canvas,
    frame: &PlotArea,
    entries: &[LegendEntry],
    config: &LegendConfig,
    font_size: f64,
) {
    if entries.is_empty() || !config.show {
        return;
    }

    let (lx, ly, lw, lh) = legend_box(canvas.width, canvas.height, frame, config);
    let row_height = lh / entries.len() as f64;
    let swatch_w = (lw * 0.22).min(30.0);
    let swatch_h = (row_height * 0.6).min(font_size * 1.2);
    let gap = font_size * 0.6;

    let text_style = TextStyle::sized(font_size).aligned(TextAlign::LEFT_CENTER);

    canvas.rect(lx, ly, lw, lh, &Paint::fill(Color::WHITE));

    for (i, entry) in entries.iter().enumerate() {
        let ey = ly + (i as f64 + 0.5) * row_height;
        let sx = lx + gap / 2.0;

        match entry.kind {
            LegendKind::FilledRect => {
                canvas.rect(sx, ey - swatch_h / 2.0, swatch_w, swatch_h, &Paint::fill(entry.color));
            }
            LegendKind::Line => {
                canvas.line(sx, ey, sx + swatch_w, ey, &Stroke::new(entry.color, 2.0));
            }
            LegendKind::LineMarker => {
                canvas.line(sx, ey, sx + swatch_w, ey, &Stroke::new(entry.color, 1.0));
                canvas.marker(sx + swatch_w / 2.0, ey, &Marker::full(entry.color, 3.0));
            }
        }

        canvas.text(sx + swatch_w + gap, ey, &entry.label, &text_style);
    }
}

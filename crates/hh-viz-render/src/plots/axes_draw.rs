use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::RenderConfig;
use crate::layout::axes::{Axis, AxisScale};
use crate::layout::margins::PlotArea;
use crate::primitives::{Stroke, TextAlign, TextStyle};

/// Draw a box frame with inward ticks on all four sides, the x grid and the
/// tick and axis labels. `x_labels` is off for a main panel sitting above a
/// ratio panel.
pub fn draw_axes(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_axis: &Axis,
    y_axis: &Axis,
    config: &RenderConfig,
    x_labels: bool,
) {
    let frame_color = Color::BLACK;
    let tick_line = Stroke::new(frame_color, 0.8);
    let minor_line = Stroke::new(frame_color, 0.6);
    let tl = config.axes.tick_length;
    let mtl = config.axes.minor_tick_length;

    let categorical = x_axis.scale == AxisScale::Categorical;
    // Categorical axes tick and grid at the bin edges, labels at the centres.
    let edges: &[f64] = if categorical { &x_axis.minor_ticks } else { &x_axis.tick_positions };
    let grid = config
        .axes
        .grid_x
        .then(|| Stroke::new(config.colors.grid, 0.6).dashed(config.axes.grid_dash().unwrap_or_default()));
    for &val in edges {
        let px = x_axis.data_to_pixel(val, area.left, area.right());
        if let Some(grid) = &grid {
            canvas.line(px, area.top, px, area.bottom(), grid);
        }
        canvas.line(px, area.bottom(), px, area.bottom() - tl, &tick_line);
        canvas.line(px, area.top, px, area.top + tl, &tick_line);
    }

    if x_labels {
        let size = if categorical { config.font.category_size } else { config.font.tick_size };
        let style = TextStyle::sized(size).aligned(TextAlign::CENTER_TOP);
        for (i, &val) in x_axis.tick_positions.iter().enumerate() {
            if let Some(label) = x_axis.tick_labels.get(i) {
                let px = x_axis.data_to_pixel(val, area.left, area.right());
                canvas.text(px, area.bottom() + 4.0, label, &style);
            }
        }
    }

    let y_tick_label = TextStyle::sized(config.font.tick_size).aligned(TextAlign::RIGHT_CENTER);
    for (i, &val) in y_axis.tick_positions.iter().enumerate() {
        let py = y_axis.data_to_pixel(val, area.bottom(), area.top);
        if py < area.top - 0.5 || py > area.bottom() + 0.5 {
            continue;
        }
        canvas.line(area.left, py, area.left + tl, py, &tick_line);
        canvas.line(area.right(), py, area.right() - tl, py, &tick_line);
        if let Some(label) = y_axis.tick_labels.get(i) {
            canvas.text(area.left - 4.0, py, label, &y_tick_label);
        }
    }
    for &val in &y_axis.minor_ticks {
        let py = y_axis.data_to_pixel(val, area.bottom(), area.top);
        if py < area.top - 0.5 || py > area.bottom() + 0.5 {
            continue;
        }
        canvas.line(area.left, py, area.left + mtl, py, &minor_line);
        canvas.line(area.right(), py, area.right() - mtl, py, &minor_line);
    }

    let title = TextStyle::sized(config.font.label_size).aligned(TextAlign::RIGHT_BOTTOM);
    if x_labels && !x_axis.label.is_empty() {
        let y = area.bottom() + config.font.tick_size + 2.0 * config.font.label_size;
        canvas.text(area.right(), y, &x_axis.label, &title);
    }
    if !y_axis.label.is_empty() {
        let widest = y_axis
            .tick_labels
            .iter()
            .map(|l| canvas.measure_text(l, &y_tick_label).width)
            .fold(0.0_f64, f64::max);
        let x = area.left - widest - 8.0 - config.font.label_size * 0.3;
        canvas.text_rotated(x, area.top, &y_axis.label, &title, -90.0);
    }

    draw_frame(canvas, area, config.axes.frame_width);
}

/// Frame rectangle only, drawn last so it sits on top of bands.
pub fn draw_frame(canvas: &mut Canvas, area: &PlotArea, width: f64) {
    let style = Stroke::new(Color::BLACK, width);
    canvas.line(area.left, area.top, area.right(), area.top, &style);
    canvas.line(area.left, area.bottom(), area.right(), area.bottom(), &style);
    canvas.line(area.left, area.top, area.left, area.bottom(), &style);
    canvas.line(area.right(), area.top, area.right(), area.bottom(), &style);
}

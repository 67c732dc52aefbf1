use hh_viz::LimitBarsArtifact;

use crate::RenderError;
use crate::canvas::Canvas;
use crate::config::RenderConfig;
use crate::document::Page;
use crate::layout::axes::{Axis, AxisScale};
use crate::layout::legend::{self, LegendEntry, LegendKind};
use crate::layout::margins::PlotArea;
use crate::layout::multi_panel::MainRatioLayout;
use crate::logo::draw_logo;
use crate::plots::axes_draw::{draw_axes, draw_frame};
use crate::primitives::{Marker, Paint, Stroke};

/// Headroom above the largest value for the logo and legend, as a factor.
const LOG_HEADROOM: f64 = 5.0;
const LINEAR_HEADROOM: f64 = 1.4;
/// Space between the main and the ratio panel.
const PANEL_GAP: f64 = 4.0;

/// Render one page of limit bars: ±2σ and ±1σ expected bands, the expected
/// median and the observed limit per category, plus the reference ratio
/// panel when the artifact carries one.
pub fn render(artifact: &LimitBarsArtifact, config: &RenderConfig) -> crate::Result<Page> {
    if artifact.n_bins() == 0 {
        return Err(RenderError::Layout(format!("panel '{}' has no bins", artifact.name)));
    }

    let width = config.figure.width;
    let height = match artifact.ratio {
        Some(_) => config.figure.height * config.ratio.height_scale,
        None => config.figure.height,
    };
    let mut canvas = Canvas::new(width, height);

    let frame = PlotArea::from_margins(width, height, &config.margins);
    let (main, ratio_area) = match artifact.ratio {
        Some(_) => {
            let layout = MainRatioLayout::split(&frame, PANEL_GAP, config.ratio.fraction);
            (layout.main, Some(layout.ratio))
        }
        None => (frame, None),
    };

    let x_axis = Axis::categorical(&artifact.labels);
    let y_axis = main_y_axis(artifact, config)?.with_label(config.axes.y_title.clone());

    draw_axes(&mut canvas, &main, &x_axis, &y_axis, config, ratio_area.is_none());

    let exp_marker = config.bars.marker(config.colors.expected)?;
    let obs_marker = config.bars.marker(config.colors.observed)?;

    canvas.push_clip(main.left, main.top, main.width, main.height);
    let half = config.bars.width / 2.0;
    let x_px = |v: f64| x_axis.data_to_pixel(v, main.left, main.right());
    let y_px = |v: f64| y_axis.data_to_pixel(v, main.bottom(), main.top);
    // bands reaching below a log axis start at its floor
    let band_px = |v: f64| y_px(v.clamp(y_axis.min, y_axis.max));

    for i in 0..artifact.n_bins() {
        let centre = i as f64 + 0.5;
        let (x0, x1) = (x_px(centre - half), x_px(centre + half));
        let bands = [
            (artifact.exp_minus2[i], artifact.exp_plus2[i], config.colors.band_2sigma),
            (artifact.exp_minus1[i], artifact.exp_plus1[i], config.colors.band_1sigma),
        ];
        for (lo, hi, color) in bands {
            if lo.is_finite() && hi.is_finite() && hi > y_axis.min {
                let (top, bottom) = (band_px(hi), band_px(lo));
                canvas.rect(x0, top, x1 - x0, bottom - top, &Paint::fill(color));
            }
        }
    }
    for i in 0..artifact.n_bins() {
        let centre = i as f64 + 0.5;
        let (x0, x1, xc) = (x_px(centre - half), x_px(centre + half), x_px(centre));
        let exp0 = artifact.exp0[i];
        if drawable(&y_axis, exp0) {
            draw_point(&mut canvas, x0, x1, xc, y_px(exp0), &exp_marker, config);
        }
        if let Some(obs) = artifact.obs.as_ref().and_then(|o| o[i])
            && drawable(&y_axis, obs)
        {
            draw_point(&mut canvas, x0, x1, xc, y_px(obs), &obs_marker, config);
        }
    }
    canvas.pop_clip();
    draw_frame(&mut canvas, &main, config.axes.frame_width);

    let mut entries = Vec::with_capacity(4);
    if artifact.obs.is_some() {
        entries.push(LegendEntry {
            label: "Observed".into(),
            color: config.colors.observed,
            kind: LegendKind::LineMarker,
        });
    }
    entries.push(LegendEntry {
        label: "Expected".into(),
        color: config.colors.expected,
        kind: LegendKind::Line,
    });
    entries.push(LegendEntry {
        label: "#pm1#sigma Expected".into(),
        color: config.colors.band_1sigma,
        kind: LegendKind::FilledRect,
    });
    entries.push(LegendEntry {
        label: "#pm2#sigma Expected".into(),
        color: config.colors.band_2sigma,
        kind: LegendKind::FilledRect,
    });
    legend::draw_legend(&mut canvas, &main, &entries, &config.legend, config.font.size);
    draw_logo(&mut canvas, &main, &config.logo)?;

    if let (Some(area), Some(ratio)) = (ratio_area, artifact.ratio.as_ref()) {
        draw_ratio(&mut canvas, &area, &x_axis, &ratio.ratio, &exp_marker, config)?;
    }

    tracing::debug!(panel = %artifact.name, bins = artifact.n_bins(), "rendered limit page");
    Ok(Page { name: artifact.name.clone(), width, height, svg: canvas.finish_svg() })
}

/// Marker with a horizontal bar spanning the bin.
fn draw_point(canvas: &mut Canvas, x0: f64, x1: f64, xc: f64, y: f64, marker: &Marker, config: &RenderConfig) {
    canvas.line(x0, y, x1, y, &Stroke::new(marker.color, config.bars.line_width));
    canvas.marker(xc, y, marker);
}

fn drawable(axis: &Axis, v: f64) -> bool {
    v.is_finite() && (axis.scale != AxisScale::Log || v > 0.0)
}

fn main_y_axis(artifact: &LimitBarsArtifact, config: &RenderConfig) -> crate::Result<Axis> {
    let (lo, hi) = artifact.value_range();
    let have_data = lo.is_finite() && hi.is_finite();
    if !have_data && (artifact.y_min.is_none() || artifact.y_max.is_none()) {
        return Err(RenderError::Layout(format!(
            "panel '{}' has no finite values to range the y axis",
            artifact.name
        )));
    }

    if config.axes.log_y {
        let (pos_lo, pos_hi) = artifact.positive_range();
        let auto = (pos_lo.is_finite() && pos_hi.is_finite())
            .then(|| Axis::auto_log(pos_lo, pos_hi * LOG_HEADROOM));
        let (min, max) = match (artifact.y_min, artifact.y_max, &auto) {
            (Some(min), Some(max), _) => (min, max),
            (min, max, Some(auto)) => (min.unwrap_or(auto.min), max.unwrap_or(auto.max)),
            _ => {
                return Err(RenderError::Layout(format!(
                    "panel '{}' has no positive values for a log y axis",
                    artifact.name
                )));
            }
        };
        if !(min > 0.0 && max > min) {
            return Err(RenderError::Layout(format!(
                "panel '{}': log y range [{min}, {max}] is not positive and increasing",
                artifact.name
            )));
        }
        Ok(Axis::log_range(min, max))
    } else {
        let min = artifact.y_min.unwrap_or(lo.min(0.0));
        let max = artifact.y_max.unwrap_or(hi * LINEAR_HEADROOM);
        if !(max > min) {
            return Err(RenderError::Layout(format!(
                "panel '{}': y range [{min}, {max}] is empty",
                artifact.name
            )));
        }
        Ok(fixed_linear(min, max, 6))
    }
}

/// Linear axis over exactly `[min, max]` with nice ticks inside it.
fn fixed_linear(min: f64, max: f64, target_ticks: usize) -> Axis {
    let mut axis = Axis::auto_linear(min, max, target_ticks);
    let eps = (max - min) * 1e-9;
    let inside = |v: &f64| *v >= min - eps && *v <= max + eps;
    let (ticks, labels) = axis
        .tick_positions
        .iter()
        .zip(&axis.tick_labels)
        .filter(|(t, _)| inside(t))
        .map(|(t, l)| (*t, l.clone()))
        .unzip();
    axis.tick_positions = ticks;
    axis.tick_labels = labels;
    axis.minor_ticks.retain(inside);
    axis.min = min;
    axis.max = max;
    axis
}

fn draw_ratio(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_axis: &Axis,
    ratio: &[f64],
    marker: &Marker,
    config: &RenderConfig,
) -> crate::Result<()> {
    let finite = ratio.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((1.0_f64, 1.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) * 0.2).max(0.05);
    let min = config.ratio.y_min.unwrap_or((lo - pad).max(0.0));
    let max = config.ratio.y_max.unwrap_or(hi + pad);
    let y_axis = fixed_linear(min, max, 4).with_label(config.ratio.y_title.clone());

    draw_axes(canvas, area, x_axis, &y_axis, config, true);

    canvas.push_clip(area.left, area.top, area.width, area.height);
    let y1 = y_axis.data_to_pixel(1.0, area.bottom(), area.top);
    let reference = Stroke::new(config.colors.reference_line, 1.0).dashed(config.ratio.reference_dash()?);
    canvas.line(area.left, y1, area.right(), y1, &reference);

    let half = config.bars.width / 2.0;
    for (i, &r) in ratio.iter().enumerate() {
        if !r.is_finite() {
            continue;
        }
        let centre = i as f64 + 0.5;
        let x0 = x_axis.data_to_pixel(centre - half, area.left, area.right());
        let x1 = x_axis.data_to_pixel(centre + half, area.left, area.right());
        let xc = x_axis.data_to_pixel(centre, area.left, area.right());
        let y = y_axis.data_to_pixel(r, area.bottom(), area.top);
        draw_point(canvas, x0, x1, xc, y, marker, config);
    }
    canvas.pop_clip();
    draw_frame(canvas, area, config.axes.frame_width);
    Ok(())
}

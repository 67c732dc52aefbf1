use crate::layout::margins::PlotArea;

/// Main panel on top of a ratio panel sharing the x axis.
#[derive(Debug, Clone)]
pub struct MainRatioLayout {
    pub main: PlotArea,
    pub ratio: PlotArea,
}

impl MainRatioLayout {
    /// Split `frame` vertically; the ratio panel takes `ratio_frac` of the
    /// height below a `gap`.
    pub fn split(frame: &PlotArea, gap: f64, ratio_frac: f64) -> Self {
        let ratio_h = frame.height * ratio_frac;
        let main_h = frame.height - ratio_h - gap;

        Self {
            main: PlotArea::manual(frame.left, frame.top, frame.width, main_h),
            ratio: PlotArea::manual(frame.left, frame.top + main_h + gap, frame.width, ratio_h),
        }
    }
}

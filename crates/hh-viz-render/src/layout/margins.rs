use crate::config::MarginsConfig;

/// Rectangular plot area within the canvas.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    /// Frame inside a `width`×`height` page with fractional margins.
    pub fn from_margins(width: f64, height: f64, m: &MarginsConfig) -> Self {
        Self {
            left: width * m.left,
            top: height * m.top,
            width: width * (1.0 - m.left - m.right),
            height: height * (1.0 - m.top - m.bottom),
        }
    }

    /// Manual margins (for multi-panel layouts).
    pub fn manual(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_margins() {
        let a = PlotArea::from_margins(700.0, 700.0, &MarginsConfig::default());
        assert!((a.left - 105.0).abs() < 1e-9);
        assert!((a.top - 35.0).abs() < 1e-9);
        assert!((a.right() - 665.0).abs() < 1e-9);
        assert!((a.bottom() - 630.0).abs() < 1e-9);
    }
}

use serde::{Deserialize, Serialize};

use crate::RenderError;
use crate::color::Color;
use crate::primitives::{Dash, Font, Marker};
use crate::theme::BuiltinTheme;

/// Top-level render configuration (YAML or programmatic).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub theme: String,
    pub figure: FigureConfig,
    pub margins: MarginsConfig,
    pub font: FontConfig,
    pub axes: AxesConfig,
    pub logo: LogoConfig,
    pub legend: LegendConfig,
    pub colors: ColorsConfig,
    pub bars: BarsConfig,
    pub ratio: RatioConfig,
    pub output: OutputConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        BuiltinTheme::Cms.base_config()
    }
}

impl RenderConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.figure.width <= 0.0 || self.figure.height <= 0.0 {
            return Err(RenderError::Config("figure size must be positive".into()));
        }
        let m = &self.margins;
        if m.left + m.right >= 1.0 || m.top + m.bottom >= 1.0 {
            return Err(RenderError::Config("margins leave no room for the frame".into()));
        }
        if !(0.0..1.0).contains(&self.ratio.fraction) {
            return Err(RenderError::Config("ratio.fraction must be in [0, 1)".into()));
        }
        if !(0.0..=1.0).contains(&self.bars.width) || self.bars.width == 0.0 {
            return Err(RenderError::Config("bars.width must be in (0, 1]".into()));
        }
        self.axes.grid_dash()?;
        self.ratio.reference_dash()?;
        self.bars.marker(Color::BLACK)?;
        self.logo.validate()
    }
}

/// Page size in points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self { width: 504.0, height: 504.0 }
    }
}

/// Frame margins as fractions of the page, ROOT pad style.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginsConfig {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for MarginsConfig {
    fn default() -> Self {
        Self { left: 0.15, right: 0.05, top: 0.05, bottom: 0.10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub size: f64,
    pub label_size: f64,
    pub tick_size: f64,
    pub category_size: f64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { size: 11.0, label_size: 14.0, tick_size: 10.0, category_size: 16.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    pub tick_length: f64,
    pub minor_tick_length: f64,
    pub log_y: bool,
    pub y_title: String,
    /// Vertical grid lines at the bin edges.
    pub grid_x: bool,
    /// ROOT line style of the grid.
    pub grid_style: u8,
    pub frame_width: f64,
}

impl AxesConfig {
    pub fn grid_dash(&self) -> crate::Result<Dash> {
        Dash::from_root(self.grid_style)
            .ok_or_else(|| RenderError::Config(format!("axes.grid_style {} is not a line style", self.grid_style)))
    }
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            tick_length: 8.0,
            minor_tick_length: 4.0,
            log_y: true,
            y_title: "95% CL limit on #sigma / #sigma_{SM}".into(),
            grid_x: true,
            grid_style: 3,
            frame_width: 1.5,
        }
    }
}

/// Experiment logo, placed with the CMS `iPosX` convention.
///
/// `pos_x / 10` selects the horizontal alignment (0 = out of frame, 1 = left,
/// 2 = centre, 3 = right) and `pos_x % 10` the anchor inside the frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoConfig {
    pub show: bool,
    pub text: String,
    pub extra_text: String,
    pub extra_text2: String,
    pub pos_x: u32,
    pub rel_pos_x: f64,
    pub rel_pos_y: f64,
    pub rel_extra_dy: f64,
    /// Logo size in units of the top margin.
    pub text_size: f64,
    /// ROOT font codes of the logo and the extra text.
    pub font: u16,
    pub extra_font: u16,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            show: true,
            text: "CMS".into(),
            extra_text: "Internal".into(),
            extra_text2: String::new(),
            pos_x: 11,
            rel_pos_x: 0.045,
            rel_pos_y: 0.035,
            rel_extra_dy: 1.2,
            text_size: 1.2,
            font: 61,
            extra_font: 52,
        }
    }
}

impl LogoConfig {
    pub const POSITIONS: [u32; 10] = [0, 11, 12, 13, 21, 22, 23, 31, 32, 33];

    pub fn validate(&self) -> crate::Result<()> {
        if !Self::POSITIONS.contains(&self.pos_x) {
            return Err(RenderError::Config(format!(
                "logo.pos_x {} not one of {:?}",
                self.pos_x,
                Self::POSITIONS
            )));
        }
        self.fonts().map(|_| ())
    }

    /// Logo and extra-text faces.
    pub fn fonts(&self) -> crate::Result<(Font, Font)> {
        let face = |code: u16| {
            Font::from_root(code)
                .ok_or_else(|| RenderError::Config(format!("logo font {code} is not a Helvetica face")))
        };
        Ok((face(self.font)?, face(self.extra_font)?))
    }
}

/// Legend corner inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendPosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub show: bool,
    pub position: LegendPosition,
    /// Width as a fraction of the page width.
    pub width: f64,
    /// Height as a fraction of the page height.
    pub height: f64,
    /// Distance from the frame, as a page fraction.
    pub offset: f64,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self { show: true, position: LegendPosition::TopRight, width: 0.3, height: 0.2, offset: 0.015 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub observed: Color,
    pub expected: Color,
    pub band_1sigma: Color,
    pub band_2sigma: Color,
    pub grid: Color,
    pub reference_line: Color,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            observed: Color::BLACK,
            expected: Color::rgb(255, 0, 0),
            band_1sigma: Color::rgb(0, 255, 0),
            band_2sigma: Color::rgb(255, 255, 0),
            grid: Color::rgb(204, 204, 204),
            reference_line: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarsConfig {
    /// Bar width as a fraction of one bin.
    pub width: f64,
    pub marker_size: f64,
    /// ROOT marker style of the median and observed points.
    pub marker_style: u8,
    pub line_width: f64,
}

impl Default for BarsConfig {
    fn default() -> Self {
        Self { width: 0.95, marker_size: 3.5, marker_style: 20, line_width: 2.0 }
    }
}

impl BarsConfig {
    pub fn marker(&self, color: Color) -> crate::Result<Marker> {
        Marker::from_root(self.marker_style, color, self.marker_size).ok_or_else(|| {
            RenderError::Config(format!("bars.marker_style {} is not a circle marker", self.marker_style))
        })
    }
}

/// Reference-ratio sub-panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioConfig {
    /// Share of the frame height taken by the ratio panel.
    pub fraction: f64,
    /// Page height multiplier when a ratio panel is drawn.
    pub height_scale: f64,
    pub y_title: String,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    /// ROOT line style of the line at one.
    pub reference_line_style: u8,
}

impl RatioConfig {
    pub fn reference_dash(&self) -> crate::Result<Dash> {
        Dash::from_root(self.reference_line_style).ok_or_else(|| {
            RenderError::Config(format!(
                "ratio.reference_line_style {} is not a line style",
                self.reference_line_style
            ))
        })
    }
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            fraction: 0.35,
            height_scale: 1.125,
            y_title: "Ratio to reference".into(),
            y_min: None,
            y_max: None,
            reference_line_style: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dpi: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dpi: 150 }
    }
}

/// Overlay `over` onto `base`, recursing into mappings.
fn merge_yaml(base: &mut serde_yaml_ng::Value, over: serde_yaml_ng::Value) {
    use serde_yaml_ng::Value;
    match (base, over) {
        (Value::Mapping(b), Value::Mapping(o)) => {
            for (k, v) in o {
                match b.get_mut(&k) {
                    Some(slot) => merge_yaml(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

/// Resolve a RenderConfig from optional YAML.
/// Priority: user YAML overrides → theme base config (`theme:` key, default `cms`).
pub fn resolve_config(user_yaml: Option<&str>) -> crate::Result<RenderConfig> {
    let config = match user_yaml {
        None => RenderConfig::default(),
        Some(yaml) => {
            let user: serde_yaml_ng::Value =
                serde_yaml_ng::from_str(yaml).map_err(|e| RenderError::Config(e.to_string()))?;
            let theme = match user.get("theme") {
                None => BuiltinTheme::Cms,
                Some(v) => {
                    let name = v
                        .as_str()
                        .ok_or_else(|| RenderError::Config("theme must be a string".into()))?;
                    name.parse()?
                }
            };
            let mut merged = serde_yaml_ng::to_value(theme.base_config())
                .map_err(|e| RenderError::Config(e.to_string()))?;
            if !user.is_null() {
                merge_yaml(&mut merged, user);
            }
            serde_yaml_ng::from_value(merged).map_err(|e| RenderError::Config(e.to_string()))?
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_cms_style() {
        let c = resolve_config(None).unwrap();
        assert_eq!(c.theme, "cms");
        assert_eq!(c.logo.pos_x, 11);
        assert_eq!(c.legend.position, LegendPosition::TopRight);
        assert!((c.bars.width - 0.95).abs() < 1e-12);
        assert_eq!(c.colors.band_2sigma, Color::rgb(255, 255, 0));
        assert_eq!(c.logo.fonts().unwrap(), (Font::Bold, Font::Italic));
        assert_eq!(c.ratio.reference_dash().unwrap(), Dash::Dashed);
    }

    #[test]
    fn user_yaml_overrides_single_fields() {
        let yaml = "logo:\n  extra_text: Preliminary\nlegend:\n  position: bottom_left\n";
        let c = resolve_config(Some(yaml)).unwrap();
        assert_eq!(c.logo.extra_text, "Preliminary");
        assert_eq!(c.logo.text, "CMS");
        assert_eq!(c.legend.position, LegendPosition::BottomLeft);
        assert!((c.legend.width - 0.3).abs() < 1e-12);
    }

    #[test]
    fn theme_is_the_base_for_overrides() {
        let c = resolve_config(Some("theme: minimal\nfont:\n  size: 8\n")).unwrap();
        assert_eq!(c.theme, "minimal");
        assert!(!c.logo.show);
        assert!((c.font.size - 8.0).abs() < 1e-12);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(resolve_config(Some("logo:\n  pos_x: 14\n")).is_err());
        assert!(resolve_config(Some("legend:\n  position: middle\n")).is_err());
        assert!(resolve_config(Some("theme: atlas\n")).is_err());
        assert!(resolve_config(Some("margins:\n  left: 0.6\n  right: 0.5\n")).is_err());
        assert!(resolve_config(Some("logo:\n  font: 132\n")).is_err());
        assert!(resolve_config(Some("bars:\n  marker_style: 21\n")).is_err());
        assert!(resolve_config(Some("ratio:\n  reference_line_style: 0\n")).is_err());
    }
}

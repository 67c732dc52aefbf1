use std::str::FromStr;

use crate::RenderError;
use crate::color::Color;
use crate::config::*;

/// Built-in theme presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTheme {
    /// ROOT look of the CMS limit plots: log y axis, kGreen/kYellow bands.
    Cms,
    /// Softer colours, no logo, for quick looks.
    Minimal,
}

impl FromStr for BuiltinTheme {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cms" => Ok(Self::Cms),
            "minimal" => Ok(Self::Minimal),
            other => Err(RenderError::Config(format!("unknown theme '{other}'"))),
        }
    }
}

impl BuiltinTheme {
    pub fn base_config(self) -> RenderConfig {
        match self {
            Self::Cms => cms(),
            Self::Minimal => minimal(),
        }
    }
}

fn cms() -> RenderConfig {
    RenderConfig {
        theme: "cms".into(),
        figure: FigureConfig::default(),
        margins: MarginsConfig::default(),
        font: FontConfig::default(),
        axes: AxesConfig::default(),
        logo: LogoConfig::default(),
        legend: LegendConfig::default(),
        colors: ColorsConfig::default(),
        bars: BarsConfig::default(),
        ratio: RatioConfig::default(),
        output: OutputConfig::default(),
    }
}

fn minimal() -> RenderConfig {
    RenderConfig {
        theme: "minimal".into(),
        figure: FigureConfig { width: 432.0, height: 360.0 },
        margins: MarginsConfig { left: 0.14, right: 0.04, top: 0.04, bottom: 0.10 },
        font: FontConfig { size: 9.0, label_size: 11.0, tick_size: 8.5, category_size: 11.0 },
        axes: AxesConfig { grid_x: false, frame_width: 0.8, ..AxesConfig::default() },
        logo: LogoConfig { show: false, ..LogoConfig::default() },
        colors: ColorsConfig {
            observed: Color::rgb(17, 24, 39),
            expected: Color::rgb(29, 78, 216),
            band_1sigma: Color::rgb(123, 211, 137),
            band_2sigma: Color::rgb(242, 217, 92),
            grid: Color::rgb(203, 213, 225),
            reference_line: Color::rgb(100, 116, 139),
        },
        bars: BarsConfig { marker_size: 2.5, line_width: 1.5, ..BarsConfig::default() },
        ..cms()
    }
}

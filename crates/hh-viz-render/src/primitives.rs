//! Drawing attributes.
//!
//! The numeric codes accepted by the `from_root` constructors are the ones
//! analysts already write in ROOT macros (`SetLineStyle(2)`,
//! `SetTextFont(62)`, `SetTextAlign(31)`, `SetMarkerStyle(20)`), so style
//! settings can be carried over from existing plotting scripts.

use crate::color::Color;

/// Dash pattern of a stroke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dash {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDotted,
}

impl Dash {
    /// ROOT line style 1..=4.
    pub fn from_root(style: u8) -> Option<Self> {
        match style {
            1 => Some(Dash::Solid),
            2 => Some(Dash::Dashed),
            3 => Some(Dash::Dotted),
            4 => Some(Dash::DashDotted),
            _ => None,
        }
    }

    /// Value of `stroke-dasharray`; `None` for solid lines.
    pub fn dasharray(self) -> Option<&'static str> {
        match self {
            Dash::Solid => None,
            Dash::Dashed => Some("6 3"),
            Dash::Dotted => Some("3 3"),
            Dash::DashDotted => Some("6 3 1 3"),
        }
    }
}

/// Line attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub dash: Dash,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width, dash: Dash::Solid }
    }

    pub fn dashed(mut self, dash: Dash) -> Self {
        self.dash = dash;
        self
    }
}

/// Area attributes: optional fill and optional outline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Paint {
    pub fill: Option<Color>,
    pub outline: Option<Stroke>,
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self { fill: Some(color), outline: None }
    }

    pub fn outlined(mut self, stroke: Stroke) -> Self {
        self.outline = Some(stroke);
        self
    }
}

/// Helvetica faces of the ROOT font table (precision 2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Font {
    #[default]
    Regular,
    Italic,
    Bold,
    BoldItalic,
}

impl Font {
    /// ROOT font code `10 * family + precision`; only the Helvetica
    /// families 4, 5, 6 and 7 are known.
    pub fn from_root(code: u16) -> Option<Self> {
        match code / 10 {
            4 => Some(Font::Regular),
            5 => Some(Font::Italic),
            6 => Some(Font::Bold),
            7 => Some(Font::BoldItalic),
            _ => None,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, Font::Bold | Font::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, Font::Italic | Font::BoldItalic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    /// On the baseline.
    Bottom,
    Center,
    /// Hanging from the top.
    Top,
}

/// Text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextAlign {
    pub h: HAlign,
    pub v: VAlign,
}

impl TextAlign {
    pub const LEFT_BOTTOM: Self = Self { h: HAlign::Left, v: VAlign::Bottom };
    pub const LEFT_CENTER: Self = Self { h: HAlign::Left, v: VAlign::Center };
    pub const CENTER_TOP: Self = Self { h: HAlign::Center, v: VAlign::Top };
    pub const RIGHT_BOTTOM: Self = Self { h: HAlign::Right, v: VAlign::Bottom };
    pub const RIGHT_CENTER: Self = Self { h: HAlign::Right, v: VAlign::Center };

    /// ROOT alignment code `10 * horizontal + vertical`, each 1..=3.
    pub fn from_root(code: u8) -> Option<Self> {
        let h = match code / 10 {
            1 => HAlign::Left,
            2 => HAlign::Center,
            3 => HAlign::Right,
            _ => return None,
        };
        let v = match code % 10 {
            1 => VAlign::Bottom,
            2 => VAlign::Center,
            3 => VAlign::Top,
            _ => return None,
        };
        Some(Self { h, v })
    }

    pub fn text_anchor(self) -> &'static str {
        match self.h {
            HAlign::Left => "start",
            HAlign::Center => "middle",
            HAlign::Right => "end",
        }
    }

    pub fn dominant_baseline(self) -> &'static str {
        match self.v {
            VAlign::Bottom => "auto",
            VAlign::Center => "central",
            VAlign::Top => "hanging",
        }
    }
}

impl Default for TextAlign {
    fn default() -> Self {
        Self::LEFT_BOTTOM
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Font size in points.
    pub size: f64,
    pub color: Color,
    pub font: Font,
    pub align: TextAlign,
}

impl TextStyle {
    pub fn sized(size: f64) -> Self {
        Self { size, ..Default::default() }
    }

    pub fn aligned(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self { size: 10.0, color: Color::BLACK, font: Font::Regular, align: TextAlign::default() }
    }
}

/// Data-point marker. Only the circular ROOT markers are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub color: Color,
    /// Radius in points.
    pub radius: f64,
    /// Full (ROOT style 20) or open (style 24) circle.
    pub filled: bool,
}

impl Marker {
    pub fn full(color: Color, radius: f64) -> Self {
        Self { color, radius, filled: true }
    }

    pub fn from_root(style: u8, color: Color, radius: f64) -> Option<Self> {
        match style {
            20 | 8 => Some(Self { color, radius, filled: true }),
            24 | 4 => Some(Self { color, radius, filled: false }),
            _ => None,
        }
    }
}

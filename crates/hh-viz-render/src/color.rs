use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rrggbb`, `#rrggbbaa` or a ROOT colour name (`kRed`, `kGreen`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(c) = root_color(s) {
            return Some(c);
        }
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let a = if hex.len() == 8 { byte(6)? as f64 / 255.0 } else { 1.0 };
        Some(Self { r: byte(0)?, g: byte(2)?, b: byte(4)?, a })
    }

    pub const fn with_alpha(mut self, a: f64) -> Self {
        self.a = a;
        self
    }

    pub fn to_svg_fill(&self) -> String {
        if (self.a - 1.0).abs() < 1e-6 {
            self.to_hex()
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The basic ROOT palette entries used by limit plots.
fn root_color(name: &str) -> Option<Color> {
    let c = match name {
        "kBlack" => Color::BLACK,
        "kWhite" => Color::WHITE,
        "kRed" => Color::rgb(255, 0, 0),
        "kGreen" => Color::rgb(0, 255, 0),
        "kBlue" => Color::rgb(0, 0, 255),
        "kYellow" => Color::rgb(255, 255, 0),
        "kMagenta" => Color::rgb(255, 0, 255),
        "kCyan" => Color::rgb(0, 255, 255),
        "kOrange" => Color::rgb(255, 204, 0),
        "kGray" => Color::rgb(204, 204, 204),
        _ => return None,
    };
    Some(c)
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if (self.a - 1.0).abs() < 1e-6 {
            serializer.serialize_str(&self.to_hex())
        } else {
            let a = (self.a * 255.0).round() as u8;
            serializer.serialize_str(&format!("{}{a:02x}", self.to_hex()))
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid colour '{s}'")))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

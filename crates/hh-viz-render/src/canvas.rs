//! SVG canvas of one page.
//!
//! Elements are serialised as they are drawn; clip regions open a
//! `<g clip-path>` group that stays open until [`Canvas::pop_clip`].

use std::fmt::Write as FmtWrite;

use crate::color::Color;
use crate::primitives::{Marker, Paint, Stroke, TextStyle};
use crate::text::{SCRIPT_SCALE, Shift, TextMetrics, measure_label, parse_label};

pub const FONT_FAMILY: &str = "Helvetica, Arial, Liberation Sans, DejaVu Sans, sans-serif";

/// Page canvas. Coordinates in points, y pointing down.
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    body: String,
    clip_defs: Vec<String>,
    open_clips: usize,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, body: String::with_capacity(16 * 1024), clip_defs: Vec::new(), open_clips: 0 }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, paint: &Paint) {
        let _ = write!(self.body, r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}""#);
        paint_attrs(&mut self.body, paint);
        self.body.push_str(" />\n");
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &Stroke) {
        let _ = write!(self.body, r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}""#);
        stroke_attrs(&mut self.body, stroke);
        self.body.push_str(" />\n");
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, paint: &Paint) {
        let _ = write!(self.body, r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}""#);
        paint_attrs(&mut self.body, paint);
        self.body.push_str(" />\n");
    }

    pub fn marker(&mut self, x: f64, y: f64, marker: &Marker) {
        let paint = if marker.filled {
            Paint::fill(marker.color).outlined(Stroke::new(marker.color, 0.5))
        } else {
            Paint::fill(Color::WHITE).outlined(Stroke::new(marker.color, 1.0))
        };
        self.circle(x, y, marker.radius, &paint);
    }

    /// Text with ROOT-style markup (`#sigma_{SM}`); scripts become `<tspan>`s.
    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        self.write_text(x, y, content, style, None);
    }

    /// Text turned by `angle` degrees about its anchor.
    pub fn text_rotated(&mut self, x: f64, y: f64, content: &str, style: &TextStyle, angle: f64) {
        self.write_text(x, y, content, style, Some(angle));
    }

    fn write_text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle, rotate: Option<f64>) {
        let out = &mut self.body;
        let _ = write!(
            out,
            r#"<text x="{x:.2}" y="{y:.2}" font-family="{FONT_FAMILY}" font-size="{:.1}" fill="{}" text-anchor="{}" dominant-baseline="{}""#,
            style.size,
            style.color.to_svg_fill(),
            style.align.text_anchor(),
            style.align.dominant_baseline(),
        );
        if style.font.is_bold() {
            out.push_str(r#" font-weight="bold""#);
        }
        if style.font.is_italic() {
            out.push_str(r#" font-style="italic""#);
        }
        if let Some(angle) = rotate {
            let _ = write!(out, r#" transform="rotate({angle:.1},{x:.2},{y:.2})""#);
        }
        out.push('>');
        for run in parse_label(content) {
            let shift = match run.shift {
                Shift::Normal => {
                    escape_into(out, &run.text);
                    continue;
                }
                Shift::Sub => "sub",
                Shift::Super => "super",
            };
            let _ = write!(out, r#"<tspan baseline-shift="{shift}" font-size="{:.1}">"#, style.size * SCRIPT_SCALE);
            escape_into(out, &run.text);
            out.push_str("</tspan>");
        }
        out.push_str("</text>\n");
    }

    /// Clip everything drawn until the matching [`Canvas::pop_clip`].
    /// Returns the clip-path id.
    pub fn push_clip(&mut self, x: f64, y: f64, w: f64, h: f64) -> String {
        let id = format!("clip{}", self.clip_defs.len());
        self.clip_defs.push(format!(
            r#"<clipPath id="{id}"><rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" /></clipPath>"#
        ));
        let _ = writeln!(self.body, r#"<g clip-path="url(#{id})">"#);
        self.open_clips += 1;
        id
    }

    pub fn pop_clip(&mut self) {
        if self.open_clips > 0 {
            self.body.push_str("</g>\n");
            self.open_clips -= 1;
        }
    }

    pub fn measure_text(&self, label: &str, style: &TextStyle) -> TextMetrics {
        measure_label(label, style)
    }

    /// Standalone SVG document on a white background. Clip groups still open
    /// are closed.
    pub fn finish_svg(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 512);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        );
        if !self.clip_defs.is_empty() {
            out.push_str("<defs>\n");
            for def in &self.clip_defs {
                out.push_str(def);
                out.push('\n');
            }
            out.push_str("</defs>\n");
        }
        let _ = writeln!(out, r#"<rect width="{}" height="{}" fill="white" />"#, self.width, self.height);
        out.push_str(&self.body);
        for _ in 0..self.open_clips {
            out.push_str("</g>\n");
        }
        out.push_str("</svg>\n");
        out
    }
}

fn escape_into(out: &mut String, content: &str) {
    for ch in content.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn paint_attrs(out: &mut String, paint: &Paint) {
    match paint.fill {
        Some(fill) => {
            let _ = write!(out, r#" fill="{}""#, fill.to_svg_fill());
        }
        None => out.push_str(r#" fill="none""#),
    }
    if let Some(stroke) = &paint.outline {
        stroke_attrs(out, stroke);
    }
}

fn stroke_attrs(out: &mut String, stroke: &Stroke) {
    let _ = write!(out, r#" stroke="{}" stroke-width="{:.2}""#, stroke.color.to_svg_fill(), stroke.width);
    if let Some(dash) = stroke.dash.dasharray() {
        let _ = write!(out, r#" stroke-dasharray="{dash}""#);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Dash, Font};

    #[test]
    fn empty_canvas_is_a_white_page() {
        let svg = Canvas::new(100.0, 50.0).finish_svg();
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50""#));
        assert!(svg.contains(r#"<rect width="100" height="50" fill="white" />"#));
        assert!(!svg.contains("<defs>"));
    }

    #[test]
    fn band_and_dashed_line() {
        let mut c = Canvas::new(200.0, 100.0);
        c.rect(10.0, 20.0, 50.0, 30.0, &Paint::fill(Color::rgb(255, 255, 0)));
        c.line(0.0, 50.0, 200.0, 50.0, &Stroke::new(Color::BLACK, 1.0).dashed(Dash::Dashed));
        let svg = c.finish_svg();
        assert!(svg.contains(r##"<rect x="10.00" y="20.00" width="50.00" height="30.00" fill="#ffff00" />"##));
        assert!(svg.contains(r#"stroke-dasharray="6 3""#));
    }

    #[test]
    fn labels_use_tspans_and_escape() {
        let mut c = Canvas::new(200.0, 100.0);
        c.text(10.0, 20.0, "#sigma_{SM} <x>", &TextStyle::default().with_font(Font::BoldItalic));
        let svg = c.finish_svg();
        assert!(svg.contains("σ<tspan baseline-shift=\"sub\" font-size=\"7.0\">SM</tspan> &lt;x&gt;"), "{svg}");
        assert!(svg.contains(r#"font-weight="bold" font-style="italic""#));
        assert!(svg.contains(FONT_FAMILY));
    }

    #[test]
    fn clip_groups_wrap_what_is_drawn_inside() {
        let mut c = Canvas::new(200.0, 100.0);
        let frame = Stroke::new(Color::BLACK, 1.0);
        c.line(0.0, 0.0, 1.0, 1.0, &frame);
        assert_eq!(c.push_clip(10.0, 10.0, 50.0, 50.0), "clip0");
        c.rect(0.0, 0.0, 5.0, 5.0, &Paint::fill(Color::BLACK));
        c.marker(1.0, 1.0, &Marker::full(Color::BLACK, 2.0));
        c.pop_clip();
        c.line(2.0, 2.0, 3.0, 3.0, &frame);
        c.push_clip(0.0, 0.0, 1.0, 1.0);

        let svg = c.finish_svg();
        let open = svg.find(r#"<g clip-path="url(#clip0)">"#).unwrap();
        let close = svg.find("</g>").unwrap();
        let rect = svg.find(r#"<rect x="0.00""#).unwrap();
        let last_line = svg.rfind("<line").unwrap();
        assert!(open < rect && rect < close && close < last_line);
        assert!(svg.contains(r#"<clipPath id="clip1">"#));
        assert_eq!(svg.matches("<g ").count(), svg.matches("</g>").count());
    }
}

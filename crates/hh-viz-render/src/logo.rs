use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::LogoConfig;
use crate::layout::margins::PlotArea;
use crate::primitives::{Font, TextAlign, TextStyle};

/// Ratio of extra text size to logo size.
const EXTRA_OVER_LOGO: f64 = 0.76;
/// Height above the frame of out-of-frame text, in top margins.
const OUT_OF_FRAME_OFFSET: f64 = 0.2;
/// Out-of-frame text sits on its baseline, left aligned.
const OUT_OF_FRAME_ALIGN: u8 = 11;

/// Where one logo line goes and how it is aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoLine {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub align: TextAlign,
    pub font: Font,
}

impl LogoLine {
    fn style(&self) -> TextStyle {
        TextStyle { size: self.size, color: Color::BLACK, font: self.font, align: self.align }
    }
}

/// Resolve the logo lines for `frame` following the `iPosX` convention:
/// code 0 writes everything above the frame; `1x`/`2x`/`3x` write inside it,
/// left/centre/right aligned and hanging from the top, at the anchor named
/// by the last digit.
pub fn layout_logo(frame: &PlotArea, config: &LogoConfig) -> crate::Result<Vec<LogoLine>> {
    let mut lines = Vec::new();
    if !config.show {
        return Ok(lines);
    }
    let (logo_font, extra_font) = config.fonts()?;

    let pos = config.pos_x;
    let t = frame.top;
    let logo_size = config.text_size * t;
    let extra_size = EXTRA_OVER_LOGO * logo_size;

    if pos == 0 {
        let y = frame.top - OUT_OF_FRAME_OFFSET * t;
        let align = TextAlign::from_root(OUT_OF_FRAME_ALIGN).unwrap_or_default();
        if !config.text.is_empty() {
            lines.push(LogoLine {
                text: config.text.clone(),
                x: frame.left,
                y,
                size: logo_size,
                align,
                font: logo_font,
            });
        }
        if !config.extra_text.is_empty() {
            // The extra text follows the logo on the same line.
            let logo_style = TextStyle::sized(logo_size).with_font(logo_font);
            let x = frame.left + crate::text::measure_label(&config.text, &logo_style).width + 0.25 * logo_size;
            lines.push(LogoLine {
                text: config.extra_text.clone(),
                x,
                y,
                size: extra_size,
                align,
                font: extra_font,
            });
        }
        return Ok(lines);
    }

    let align = u8::try_from(10 * (pos / 10) + 3)
        .ok()
        .and_then(TextAlign::from_root)
        .ok_or_else(|| crate::RenderError::Config(format!("logo.pos_x {pos} has no alignment")))?;
    let x = match pos % 10 {
        1 => frame.left + config.rel_pos_x * frame.width,
        2 => frame.center_x(),
        _ => frame.right() - config.rel_pos_x * frame.width,
    };
    let y = frame.top + config.rel_pos_y * frame.height;
    let dy = config.rel_extra_dy * config.text_size * t;

    lines.push(LogoLine { text: config.text.clone(), x, y, size: logo_size, align, font: logo_font });
    if !config.extra_text.is_empty() {
        lines.push(LogoLine {
            text: config.extra_text.clone(),
            x,
            y: y + dy,
            size: extra_size,
            align,
            font: extra_font,
        });
        if !config.extra_text2.is_empty() {
            lines.push(LogoLine {
                text: config.extra_text2.clone(),
                x,
                y: y + 1.8 * dy,
                size: extra_size,
                align,
                font: extra_font,
            });
        }
    }
    Ok(lines)
}

pub fn draw_logo(canvas: &mut Canvas, frame: &PlotArea, config: &LogoConfig) -> crate::Result<()> {
    for line in layout_logo(frame, config)? {
        canvas.text(line.x, line.y, &line.text, &line.style());
    }
    Ok(())
}

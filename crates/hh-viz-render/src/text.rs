//! Text metrics and ROOT-style label markup.
//!
//! Labels in limit files and plot configs use ROOT's TLatex shorthands
//! (`#tau`, `#sigma_{SM}`, `fb^{-1}`). [`parse_label`] turns them into runs
//! the canvas renders as `<tspan>`s; [`latex_to_unicode`] flattens them
//! into plain Unicode for file names and logs.

use ab_glyph::{Font as _, FontArc, PxScale, ScaleFont};

use crate::font::FontHandle;
use crate::primitives::{Font, TextStyle};

#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub ascent: f64,
}

/// Vertical placement of a run relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Normal,
    Sub,
    Super,
}

/// Font size factor applied to sub- and superscript runs.
pub const SCRIPT_SCALE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub shift: Shift,
}

/// Advance width of `ch` in units of the font size, Helvetica-like.
fn advance(ch: char) -> f64 {
    match ch {
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.24,
        'I' | 'f' | 't' | 'r' | '(' | ')' | '[' | ']' | ' ' => 0.30,
        'm' | 'w' => 0.83,
        'M' | 'W' => 0.90,
        '0'..='9' => 0.556,
        'a'..='z' => 0.52,
        'A'..='Z' => 0.68,
        '%' => 0.89,
        _ => 0.60,
    }
}

/// Metrics of `text` at `size_pt`, measured on the system face for `font`
/// or estimated when there is none.
pub fn measure_text(text: &str, size_pt: f64, font: Font) -> TextMetrics {
    match FontHandle::shared().select(font) {
        Some(face) => measure_with_face(face, text, size_pt),
        None => estimate_text(text, size_pt, font),
    }
}

/// Advance widths and kerning of `face`, scaled so that one em is `size_pt`.
pub fn measure_with_face(face: &FontArc, text: &str, size_pt: f64) -> TextMetrics {
    let em_px = match face.units_per_em() {
        Some(upem) => size_pt as f32 * face.height_unscaled() / upem,
        None => size_pt as f32,
    };
    let scaled = face.as_scaled(PxScale::from(em_px));

    let mut width: f32 = 0.0;
    let mut prev = None;
    for ch in text.chars() {
        let id = face.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    let ascent = scaled.ascent();
    TextMetrics { width: width as f64, height: (ascent - scaled.descent()) as f64, ascent: ascent as f64 }
}

/// Helvetica-like estimate used without a usable system face.
pub fn estimate_text(text: &str, size_pt: f64, font: Font) -> TextMetrics {
    let em: f64 = text.chars().map(advance).sum();
    let bold = if font.is_bold() { 1.06 } else { 1.0 };
    TextMetrics { width: em * size_pt * bold, height: size_pt * 1.2, ascent: size_pt * 0.75 }
}

/// Metrics of a marked-up label.
pub fn measure_label(label: &str, style: &TextStyle) -> TextMetrics {
    let mut total = measure_text("", style.size, style.font);
    for run in parse_label(label) {
        let size = match run.shift {
            Shift::Normal => style.size,
            Shift::Sub | Shift::Super => style.size * SCRIPT_SCALE,
        };
        total.width += measure_text(&run.text, size, style.font).width;
    }
    total
}

fn symbol(name: &str) -> Option<&'static str> {
    let s = match name {
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" => "ε",
        "eta" => "η",
        "theta" => "θ",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "pi" => "π",
        "rho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "phi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Lambda" => "Λ",
        "Sigma" => "Σ",
        "Phi" => "Φ",
        "Omega" => "Ω",
        "pm" => "±",
        "mp" => "∓",
        "times" => "×",
        "leq" => "≤",
        "geq" => "≥",
        "infty" => "∞",
        "rightarrow" | "to" => "→",
        "sqrt" => "√",
        _ => return None,
    };
    Some(s)
}

/// Split a label into runs, expanding `#name` symbols and `_{..}`/`^{..}`
/// groups. Unknown `#name`s are kept verbatim.
pub fn parse_label(label: &str) -> Vec<TextRun> {
    let mut runs: Vec<TextRun> = Vec::new();
    let mut current = String::new();
    let mut chars = label.chars().peekable();

    fn flush(runs: &mut Vec<TextRun>, current: &mut String, shift: Shift) {
        if !current.is_empty() {
            runs.push(TextRun { text: std::mem::take(current), shift });
        }
    }

    while let Some(ch) = chars.next() {
        match ch {
            '#' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                match symbol(&name) {
                    Some(s) => current.push_str(s),
                    None => {
                        current.push('#');
                        current.push_str(&name);
                    }
                }
            }
            '_' | '^' if chars.peek() == Some(&'{') => {
                chars.next();
                let shift = if ch == '_' { Shift::Sub } else { Shift::Super };
                let mut depth = 1;
                let mut group = String::new();
                for c in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    group.push(c);
                }
                flush(&mut runs, &mut current, Shift::Normal);
                let inner: String = parse_label(&group).into_iter().map(|r| r.text).collect();
                runs.push(TextRun { text: inner, shift });
            }
            // `#sqrt{s}` leaves a braced argument behind.
            '{' | '}' => {}
            _ => current.push(ch),
        }
    }
    flush(&mut runs, &mut current, Shift::Normal);
    runs
}

fn superscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' => '⁻',
        _ => return None,
    })
}

fn subscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        '+' => '₊',
        '-' => '₋',
        _ => return None,
    })
}

/// Plain-Unicode rendering of a label. Scripts use Unicode sub/superscript
/// digits where they exist and fall back to the bare text otherwise.
pub fn latex_to_unicode(label: &str) -> String {
    parse_label(label)
        .into_iter()
        .map(|run| {
            let map: fn(char) -> Option<char> = match run.shift {
                Shift::Normal => return run.text,
                Shift::Sub => subscript,
                Shift::Super => superscript,
            };
            run.text.chars().map(map).collect::<Option<String>>().unwrap_or(run.text)
        })
        .collect()
}

//! Font faces for text measurement.
//!
//! Faces come from the system font database, looked up in the order of the
//! canvas `font-family` list. The same database is handed to usvg when pages
//! are converted to PDF or PNG, so measured and rendered text use one face.

use std::sync::{Arc, OnceLock};

use ab_glyph::{FontArc, FontVec};
use fontdb::{Database, Family, Query, Style, Weight};

use crate::primitives::Font;

/// Families tried in order; mirrors [`crate::canvas::FONT_FAMILY`].
const FAMILIES: [Family<'static>; 5] = [
    Family::Name("Helvetica"),
    Family::Name("Arial"),
    Family::Name("Liberation Sans"),
    Family::Name("DejaVu Sans"),
    Family::SansSerif,
];

pub struct FontHandle {
    db: Arc<Database>,
    regular: Option<FontArc>,
    bold: Option<FontArc>,
    italic: Option<FontArc>,
    bold_italic: Option<FontArc>,
}

impl FontHandle {
    /// Load the system fonts and pick the four Helvetica-like faces.
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        Self::from_database(db)
    }

    pub fn from_database(db: Database) -> Self {
        let face = |weight: Weight, style: Style| load_face(&db, weight, style);
        let handle = Self {
            regular: face(Weight::NORMAL, Style::Normal),
            bold: face(Weight::BOLD, Style::Normal),
            italic: face(Weight::NORMAL, Style::Italic),
            bold_italic: face(Weight::BOLD, Style::Italic),
            db: Arc::new(db),
        };
        if handle.regular.is_none() {
            tracing::debug!(faces = handle.db.len(), "no sans-serif face found; text widths are estimated");
        }
        handle
    }

    /// Process-wide handle, loaded on first use.
    pub fn shared() -> &'static FontHandle {
        static FONTS: OnceLock<FontHandle> = OnceLock::new();
        FONTS.get_or_init(FontHandle::system)
    }

    /// Face for `font`, falling back to the regular face when the styled
    /// one is missing.
    pub fn select(&self, font: Font) -> Option<&FontArc> {
        let styled = match font {
            Font::Regular => &self.regular,
            Font::Bold => &self.bold,
            Font::Italic => &self.italic,
            Font::BoldItalic => &self.bold_italic,
        };
        styled.as_ref().or(self.regular.as_ref())
    }

    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }
}

fn load_face(db: &Database, weight: Weight, style: Style) -> Option<FontArc> {
    let query = Query { families: &FAMILIES, weight, style, ..Query::default() };
    let id = db.query(&query)?;
    let parsed = db.with_face_data(id, |data, index| FontVec::try_from_vec_and_index(data.to_vec(), index))?;
    match parsed {
        Ok(face) => Some(FontArc::new(face)),
        Err(e) => {
            tracing::debug!(?weight, ?style, "unusable font face: {e}");
            None
        }
    }
}

//! Multi-page documents of rendered limit pages.

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

use crate::RenderError;

/// One rendered page.
#[derive(Debug, Clone)]
pub struct Page {
    pub name: String,
    /// Page size in points.
    pub width: f64,
    pub height: f64,
    /// Standalone SVG document.
    pub svg: String,
}

impl Page {
    /// Page name reduced to characters safe in file names.
    pub fn file_stem(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
            .collect()
    }
}

/// Output container chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// All pages stacked vertically in one SVG.
    Svg,
    Pdf,
    /// One PNG per page, named `<stem>_<page>.png`.
    Png,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            "png" => Ok(Self::Png),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Pages in the order they were appended.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// One SVG holding every page, top to bottom.
    ///
    /// Clip-path ids are prefixed per page so pages cannot capture each
    /// other's clips.
    pub fn to_stacked_svg(&self) -> crate::Result<String> {
        let width = self.pages.iter().map(|p| p.width).fold(0.0_f64, f64::max);
        let height: f64 = self.pages.iter().map(|p| p.height).sum();

        let mut out = String::with_capacity(self.pages.iter().map(|p| p.svg.len()).sum::<usize>() + 256);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        let mut y = 0.0;
        for (i, page) in self.pages.iter().enumerate() {
            let body = page.svg.trim_start().strip_prefix("<svg ").ok_or_else(|| {
                RenderError::Layout(format!("page '{}' is not an SVG document", page.name))
            })?;
            let body = body
                .replace("id=\"clip", &format!("id=\"p{i}clip"))
                .replace("url(#clip", &format!("url(#p{i}clip"));
            let _ = write!(out, r#"<svg x="0" y="{y}" "#);
            out.push_str(&body);
            y += page.height;
        }
        out.push_str("</svg>\n");
        Ok(out)
    }

    /// Write `<dir>/<page>.svg` for every page.
    pub fn write_svg_pages(&self, dir: &Path) -> crate::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let path = dir.join(format!("{}.svg", page.file_stem()));
            crate::output::svg::save_svg(&page.svg, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Write the document to `path`, format inferred from the extension.
    /// Returns every file written.
    pub fn save(&self, path: &Path, dpi: u32) -> crate::Result<Vec<PathBuf>> {
        if self.is_empty() {
            return Err(RenderError::Layout("document has no pages".into()));
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let format = DocumentFormat::from_path(path)?;
        tracing::info!(pages = self.len(), ?format, "writing {}", path.display());
        match format {
            DocumentFormat::Svg => {
                crate::output::svg::save_svg(&self.to_stacked_svg()?, path)?;
                Ok(vec![path.to_path_buf()])
            }
            #[cfg(feature = "pdf")]
            DocumentFormat::Pdf => {
                std::fs::write(path, crate::output::pdf::pages_to_pdf(&self.pages)?)?;
                Ok(vec![path.to_path_buf()])
            }
            #[cfg(feature = "png")]
            DocumentFormat::Png => {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("page");
                let mut written = Vec::with_capacity(self.pages.len());
                for page in &self.pages {
                    let out = path.with_file_name(format!("{stem}_{}.png", page.file_stem()));
                    std::fs::write(&out, crate::output::png::svg_to_png(&page.svg, dpi)?)?;
                    written.push(out);
                }
                Ok(written)
            }
            #[allow(unreachable_patterns)]
            other => {
                let _ = dpi;
                Err(RenderError::FeatureDisabled(format!("{other:?}").to_lowercase()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;

    fn page(name: &str, h: f64) -> Page {
        let mut c = Canvas::new(100.0, h);
        c.push_clip(0.0, 0.0, 10.0, 10.0);
        c.text(1.0, 1.0, name, &Default::default());
        c.pop_clip();
        Page { name: name.into(), width: 100.0, height: h, svg: c.finish_svg() }
    }

    #[test]
    fn stacked_svg_offsets_pages() {
        let mut doc = Document::new();
        doc.push(page("years", 50.0));
        doc.push(page("channels", 70.0));
        let svg = doc.to_stacked_svg().unwrap();
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="120""#));
        assert!(svg.contains(r#"<svg x="0" y="0" xmlns"#));
        assert!(svg.contains(r#"<svg x="0" y="50" xmlns"#));
        assert!(svg.contains("id=\"p0clip0\"") && svg.contains("url(#p1clip0)"));
        assert!(!svg.contains("\"clip0\""));
        assert!(svg.find("years").unwrap() < svg.find("channels").unwrap());
    }

    #[test]
    fn svg_pages_go_to_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new();
        doc.push(page("channels_2016", 50.0));
        doc.push(page("a/b", 50.0));
        let written = doc.write_svg_pages(&dir.path().join("pages")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("pages/channels_2016.svg").is_file());
        assert!(dir.path().join("pages/a_b.svg").is_file());
    }

    #[test]
    fn save_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new();
        assert!(doc.save(&dir.path().join("empty.svg"), 72).is_err());

        doc.push(page("years", 50.0));
        let out = dir.path().join("nested/limits_sm.svg");
        assert_eq!(doc.save(&out, 72).unwrap(), [out.clone()]);
        assert!(std::fs::read_to_string(&out).unwrap().contains("years"));

        assert!(matches!(
            doc.save(&dir.path().join("limits.eps"), 72),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }
}

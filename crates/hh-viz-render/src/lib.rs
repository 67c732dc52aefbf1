//! Rendering of limit panels into SVG pages and multi-page documents.
//!
//! Pages are drawn on a hand-built SVG [`canvas::Canvas`]; PDF output
//! (feature `pdf`) and PNG output (feature `png`) convert those SVGs.

pub mod canvas;
pub mod color;
pub mod config;
pub mod document;
pub mod font;
pub mod layout;
pub mod logo;
pub mod output;
pub mod plots;
pub mod primitives;
pub mod text;
pub mod theme;

use config::RenderConfig;
use document::{Document, Page};
use hh_viz::LimitBarsArtifact;
use thiserror::Error;

pub use config::resolve_config;
pub use document::DocumentFormat;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("config error: {0}")]
    Config(String),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("unsupported output format '{0}' (expected svg, pdf or png)")]
    UnsupportedFormat(String),
    #[error("{0} output requires building with the '{0}' feature")]
    FeatureDisabled(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "png")]
    #[error("PNG encoding error: {0}")]
    Png(String),
    #[cfg(feature = "pdf")]
    #[error("PDF conversion error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Render a single limit page.
pub fn render_page(artifact: &LimitBarsArtifact, config: &RenderConfig) -> Result<Page> {
    plots::limit_bars::render(artifact, config)
}

/// Render every artifact, in order, into one document.
///
/// A panel that cannot be laid out (e.g. nothing positive to put on a log
/// axis) is left out with a warning; the other pages are kept.
pub fn render_document(artifacts: &[LimitBarsArtifact], config: &RenderConfig) -> Result<Document> {
    config.validate()?;
    let mut doc = Document::new();
    for art in artifacts {
        match render_page(art, config) {
            Ok(page) => doc.push(page),
            Err(RenderError::Layout(reason)) => {
                tracing::warn!(panel = %art.name, %reason, "panel left out of the document");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(doc)
}

#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "png")]
pub mod png;
pub mod svg;

/// Parse an SVG page with the font database its text was measured against.
#[cfg(any(feature = "pdf", feature = "png"))]
pub(crate) fn parse_svg(svg: &str) -> std::result::Result<usvg::Tree, String> {
    let opt = usvg::Options { fontdb: crate::font::FontHandle::shared().database(), ..Default::default() };
    usvg::Tree::from_str(svg, &opt).map_err(|e| e.to_string())
}

use std::collections::HashMap;

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref};

use crate::RenderError;
use crate::document::Page;

/// One PDF page per document page, each at its own size in points.
///
/// Every page SVG becomes a form XObject (via svg2pdf) placed to fill its
/// page; object ids of the converted chunks are renumbered into one file.
pub fn pages_to_pdf(pages: &[Page]) -> crate::Result<Vec<u8>> {
    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let page_tree_id = alloc.bump();

    let mut pdf = Pdf::new();
    let mut page_ids = Vec::with_capacity(pages.len());
    let xobject_name = Name(b"Page");

    for page in pages {
        let tree = crate::output::parse_svg(&page.svg).map_err(RenderError::Pdf)?;
        let (chunk, svg_id) = svg2pdf::to_chunk(&tree, svg2pdf::ConversionOptions::default())
            .map_err(|e| RenderError::Pdf(format!("page '{}': {e}", page.name)))?;

        let mut map = HashMap::new();
        let chunk = chunk.renumber(|old| *map.entry(old).or_insert_with(|| alloc.bump()));
        let svg_id = *map
            .get(&svg_id)
            .ok_or_else(|| RenderError::Pdf(format!("page '{}': xobject missing from chunk", page.name)))?;

        let page_id = alloc.bump();
        let content_id = alloc.bump();
        page_ids.push(page_id);

        let mut p = pdf.page(page_id);
        p.media_box(Rect::new(0.0, 0.0, page.width as f32, page.height as f32));
        p.parent(page_tree_id);
        p.contents(content_id);
        p.resources().x_objects().pair(xobject_name, svg_id);
        p.finish();

        let mut content = Content::new();
        content.transform([page.width as f32, 0.0, 0.0, page.height as f32, 0.0, 0.0]);
        content.x_object(xobject_name);
        pdf.stream(content_id, &content.finish());

        pdf.extend(&chunk);
    }

    pdf.catalog(catalog_id).pages(page_tree_id);
    let count = page_ids.len() as i32;
    pdf.pages(page_tree_id).kids(page_ids).count(count);

    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;

    #[test]
    fn every_page_lands_in_the_pdf() {
        let pages: Vec<Page> = ["years", "channels"]
            .iter()
            .map(|name| Page {
                name: name.to_string(),
                width: 100.0,
                height: 80.0,
                svg: Canvas::new(100.0, 80.0).finish_svg(),
            })
            .collect();
        let bytes = pages_to_pdf(&pages).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 2"));
    }
}

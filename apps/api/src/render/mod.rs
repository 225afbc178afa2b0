// Three presentations of one document: the block editor, the local wireframe,
// and the styled document produced by the external template engine.

pub mod controller;
pub mod export;
pub mod styled;
pub mod wireframe;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::content::{ContentBlock, Document};
use crate::layout::{scale, RenderSurface, ResolvedSizes};

pub use controller::{FetchOutcome, ModeEffect, RenderController, RenderMode, StyledKey, StyledTicket};
pub use export::{export_document, export_filename, ExportedDocument, PageFormat, PDF_CONTENT_TYPE};
pub use styled::{
    fetch_styled, HttpTemplateEngine, MarkupCache, MemoryMarkupCache, RedisMarkupCache,
    TemplateEngine, TemplateEngineError,
};
pub use wireframe::render_wireframe;

/// Edit mode: the raw block list in display order, no template slotting.
#[derive(Debug, Clone, Serialize)]
pub struct EditorView<'a> {
    pub headline: &'a str,
    pub subheadline: Option<&'a str>,
    pub blocks: Vec<&'a ContentBlock>,
    pub sizes: ResolvedSizes,
    pub css_variables: BTreeMap<&'static str, String>,
}

pub fn editor_view(document: &Document) -> EditorView<'_> {
    let tokens = scale(&document.layout_params);
    EditorView {
        headline: &document.content.headline,
        subheadline: document.content.subheadline.as_deref(),
        blocks: document.content.sorted_blocks(),
        sizes: RenderSurface::Editor.resolve(&tokens),
        css_variables: tokens.css_variables(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlockContent, DocumentContent};

    #[test]
    fn test_editor_view_lists_blocks_in_order() {
        let mut content = DocumentContent::new("Headline");
        content.blocks = vec![
            ContentBlock::new("b", BlockContent::Text("second".into()), 5),
            ContentBlock::new("a", BlockContent::Text("first".into()), 2),
        ];
        let mut doc = Document::new("Doc", content, "test-model");
        doc.layout_params.typography.body_scale = 1.25;

        let view = editor_view(&doc);
        let ids: Vec<&str> = view.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(view.sizes.body_px, 20.0);
        assert_eq!(view.sizes.h1_px, 40.0);
    }
}

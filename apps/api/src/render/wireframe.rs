//! Structural wireframe markup, rendered locally from a slot assignment.
//!
//! The wireframe is a preview of the styled document's structure: it draws exactly
//! the regions the resolver produced, in order, with the same spans. Sizes come from
//! the wireframe surface's base table multiplied by the layout CSS variables.

use crate::content::{BlockContent, Document};
use crate::layout::{scale, RenderSurface, ScalingTokens};
use crate::templates::{BlockView, RegionAssignment, RegionFill, SlotAssignment};

struct Writer {
    depth: usize,
    buffer: String,
}

impl Writer {
    fn new() -> Self {
        Self {
            depth: 0,
            buffer: String::new(),
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.buffer.push_str("  ");
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    fn open(&mut self, tag: &str) {
        self.line(tag);
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(tag);
    }

    fn finish(self) -> String {
        self.buffer
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Stylesheet for the wireframe surface. Every size is `base * var(--layout-*)`.
fn stylesheet() -> String {
    let base = RenderSurface::Wireframe.base();
    format!(
        ".wireframe-container {{ padding: calc({pad}px * var(--layout-padding-scale, 1.0)); line-height: calc({lh} * var(--layout-line-height-scale, 1.0)); }}\n\
         .wireframe-region {{ margin-bottom: var(--layout-section-gap, 20px); }}\n\
         .wireframe-headline {{ font-size: calc({h1}px * var(--layout-h1-scale, 1.0)); }}\n\
         .wireframe-section-title {{ font-size: calc({h2}px * var(--layout-h2-scale, 1.0)); }}\n\
         .wireframe-text, .wireframe-list-item {{ font-size: calc({body}px * var(--layout-body-scale, 1.0)); }}\n\
         .wireframe-placeholder {{ border: 1px dashed #A0AEC0; color: #718096; }}",
        pad = base.padding_px,
        lh = base.line_height,
        h1 = base.h1_px,
        h2 = base.h2_px,
        body = base.body_px,
    )
}

/// Renders the wireframe document for `document` under `assignment`.
pub fn render_wireframe(document: &Document, assignment: &SlotAssignment) -> String {
    render_with_tokens(document, assignment, &scale(&document.layout_params))
}

pub fn render_with_tokens(
    document: &Document,
    assignment: &SlotAssignment,
    tokens: &ScalingTokens,
) -> String {
    let mut w = Writer::new();
    w.line(&format!("<style>{}</style>", stylesheet()));
    w.open(&format!(
        "<div class=\"wireframe-container wireframe-{}\" style=\"{}\">",
        assignment.template,
        tokens.style_attr()
    ));
    w.line(&format!(
        "<div class=\"wireframe-template-header\">{} TEMPLATE: {}</div>",
        assignment.template.as_str().to_uppercase(),
        escape_html(&document.title)
    ));
    for region in &assignment.regions {
        render_region(&mut w, region);
    }
    w.close("</div>");
    w.finish()
}

fn render_region(w: &mut Writer, region: &RegionAssignment) {
    let mut class = format!("wireframe-region wireframe-region-{}", region.region);
    if region.emphasis {
        class.push_str(" wireframe-emphasis");
    }
    w.open(&format!(
        "<section class=\"{class}\" data-region=\"{}\" style=\"grid-column: span {}; grid-row: span {};\">",
        region.region, region.col_span, region.row_span
    ));
    w.line(&format!(
        "<div class=\"wireframe-column-label\">{}</div>",
        escape_html(region.label)
    ));

    match &region.fill {
        RegionFill::Blocks { blocks } => {
            for block in blocks {
                render_block(w, block);
            }
        }
        RegionFill::Static { cards } => {
            for card in cards {
                w.open("<div class=\"wireframe-static\">");
                w.line(&format!(
                    "<strong class=\"wireframe-section-title\">{}</strong>",
                    escape_html(card.title)
                ));
                if !card.body.is_empty() {
                    w.line(&format!(
                        "<p class=\"wireframe-text\">{}</p>",
                        escape_html(card.body)
                    ));
                }
                w.close("</div>");
            }
        }
        RegionFill::Placeholder { message } => {
            w.line(&format!(
                "<div class=\"wireframe-placeholder\">{}</div>",
                escape_html(message)
            ));
        }
    }
    w.close("</section>");
}

fn render_block(w: &mut Writer, block: &BlockView) {
    w.open(&format!(
        "<div class=\"wireframe-section\" data-block-id=\"{}\">",
        escape_html(&block.id)
    ));
    w.line(&format!(
        "<div class=\"wireframe-section-label\">{}</div>",
        block.block_type.as_str().to_uppercase()
    ));
    if let Some(title) = &block.title {
        w.line(&format!(
            "<h3 class=\"wireframe-section-title\">{}</h3>",
            escape_html(title)
        ));
    }

    match &block.content {
        BlockContent::Hero(hero) => {
            w.line(&format!(
                "<h1 class=\"wireframe-headline\">{}</h1>",
                escape_html(&hero.headline)
            ));
            if let Some(overlay) = &block.overlay {
                w.line(&format!(
                    "<p class=\"wireframe-overlay\">{}</p>",
                    escape_html(overlay)
                ));
            } else {
                for line in [&hero.subheadline, &hero.description].into_iter().flatten() {
                    w.line(&format!("<p class=\"wireframe-text\">{}</p>", escape_html(line)));
                }
            }
        }
        BlockContent::List(items) => {
            w.open("<ul class=\"wireframe-list\">");
            for item in items {
                w.line(&format!(
                    "<li class=\"wireframe-list-item\">{}</li>",
                    escape_html(item)
                ));
            }
            w.close("</ul>");
        }
        BlockContent::Button(link) | BlockContent::Cta(link) => {
            w.line(&format!(
                "<button class=\"wireframe-cta-button\">{}</button>",
                escape_html(&link.text)
            ));
            if let Some(url) = &link.url {
                w.line(&format!(
                    "<span class=\"wireframe-cta-url\">{}</span>",
                    escape_html(url)
                ));
            }
        }
        other => {
            w.line(&format!(
                "<p class=\"wireframe-text\">{}</p>",
                escape_html(&other.plain_text())
            ));
        }
    }
    w.close("</div>");
}

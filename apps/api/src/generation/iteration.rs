//! Document-level effects of generation: creating a document from session inputs and
//! applying an AI iteration to an existing one.

use chrono::Utc;
use tracing::{info, warn};

use crate::content::{Document, DocumentContent};
use crate::generation::backend::{GenerationBackend, SessionInputs};
use crate::generation::fallback::fallback_content;
use crate::history::{create_snapshot, describe};
use crate::layout::LayoutParameters;

/// Generates a new document. A backend failure falls back to the deterministic
/// starter content instead of failing the request. No snapshot is taken: history
/// starts empty.
pub async fn create_document(backend: &dyn GenerationBackend, inputs: &SessionInputs) -> Document {
    let content = match backend.generate(inputs).await {
        Ok(content) => content,
        Err(e) => {
            warn!("generation failed, using fallback content: {e}");
            fallback_content(&inputs.prompt)
        }
    };

    let mut document = Document::new(inputs.title.trim(), content, backend.model());
    if let Some(brand) = &inputs.brand {
        let branded = LayoutParameters {
            color_scheme: brand.color_palette.clone(),
            ..LayoutParameters::default()
        };
        match branded.validate() {
            Ok(()) => document.layout_params = branded,
            Err(e) => warn!("ignoring brand palette: {e}"),
        }
    }
    document.generation.prompts.push(inputs.prompt.clone());
    document.generation.last_generated_at = Some(Utc::now());

    info!(document_id = %document.id, "one-pager created");
    document
}

/// Replaces the document's content with AI output. The pre-iteration state is
/// snapshotted first, described by the feedback text. Returns the snapshot version.
pub fn apply_iteration(document: &mut Document, feedback: &str, content: DocumentContent) -> u32 {
    let version = create_snapshot(document, Some(describe(Some(feedback))));
    document.replace_content(content);
    document.current_version = None;

    let generation = &mut document.generation;
    generation.prompts.push(feedback.to_string());
    generation.iterations += 1;
    generation.last_generated_at = Some(Utc::now());

    info!(document_id = %document.id, version, "AI iteration applied");
    version
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlockContent, BrandKit, ContentBlock};
    use crate::generation::backend::fakes::ScriptedBackend;
    use crate::layout::ColorScheme;

    fn make_inputs() -> SessionInputs {
        SessionInputs {
            title: " Espresso ".to_string(),
            prompt: "A page for our espresso machine".to_string(),
            target_audience: None,
            brand: None,
        }
    }

    fn make_content(headline: &str) -> DocumentContent {
        let mut content = DocumentContent::new(headline);
        content.blocks = vec![ContentBlock::new("t", BlockContent::Text("body".into()), 0)];
        content
    }

    #[tokio::test]
    async fn test_create_document_records_prompt_without_snapshot() {
        let backend = ScriptedBackend::succeeding(make_content("Fresh"));
        let doc = create_document(&backend, &make_inputs()).await;
        assert_eq!(doc.title, "Espresso");
        assert_eq!(doc.content.headline, "Fresh");
        assert_eq!(doc.generation.prompts, vec![make_inputs().prompt]);
        assert_eq!(doc.generation.ai_model, "scripted");
        assert!(doc.version_history.is_empty());
        assert_eq!(doc.version, 0);
    }

    #[tokio::test]
    async fn test_create_document_falls_back_on_failure() {
        let backend = ScriptedBackend::failing();
        let doc = create_document(&backend, &make_inputs()).await;
        assert_eq!(doc.content.headline, "Your Marketing One-Pager");
        assert_eq!(doc.content.blocks.len(), 4);
    }

    #[tokio::test]
    async fn test_create_document_applies_valid_brand_palette_only() {
        let backend = ScriptedBackend::succeeding(make_content("Fresh"));
        let mut inputs = make_inputs();
        let mut palette = ColorScheme::default();
        palette.primary = "#112233".to_string();
        inputs.brand = Some(BrandKit {
            company_name: "Acme".to_string(),
            brand_voice: None,
            target_audiences: Default::default(),
            color_palette: palette,
        });
        let doc = create_document(&backend, &inputs).await;
        assert_eq!(doc.layout_params.color_scheme.primary, "#112233");

        inputs.brand.as_mut().unwrap().color_palette.primary = "blue".to_string();
        let doc = create_document(&backend, &inputs).await;
        assert_eq!(doc.layout_params, LayoutParameters::default());
    }

    #[test]
    fn test_apply_iteration_snapshots_previous_state() {
        let mut doc = Document::new("Doc", make_content("Before"), "m");
        doc.current_version = Some(3);
        let version = apply_iteration(&mut doc, "punchier headline", make_content("After"));

        assert_eq!(version, 1);
        assert_eq!(doc.content.headline, "After");
        assert_eq!(doc.version_history[0].content.headline, "Before");
        assert_eq!(
            doc.version_history[0].description.as_deref(),
            Some("punchier headline")
        );
        assert_eq!(doc.current_version, None);
        assert_eq!(doc.generation.iterations, 1);
        assert_eq!(doc.generation.prompts, vec!["punchier headline".to_string()]);
    }
}

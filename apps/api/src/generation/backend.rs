//! AI generation backend.
//!
//! The model returns loosely shaped JSON (`headline`, `subheadline`, `sections`).
//! Everything it produces passes through [`GeneratedLayout::into_content`] before it
//! reaches a document: sections whose payload does not match their declared type are
//! dropped, duplicate ids are dropped, and `order` is renormalized to `0..n`.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::content::{BrandKit, ContentBlock, Document, DocumentContent};
use crate::errors::AppError;
use crate::generation::prompts::{generation_prompt, refinement_prompt, SYSTEM};
use crate::llm_client::LlmClient;

const DEFAULT_HEADLINE: &str = "Your One-Pager";

/// What the user typed into the "new one-pager" form.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInputs {
    pub title: String,
    pub prompt: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub brand: Option<BrandKit>,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Drafts fresh content for a new document.
    async fn generate(&self, inputs: &SessionInputs) -> Result<DocumentContent, AppError>;

    /// Produces replacement content for `document` guided by `feedback`. Does not
    /// touch the document; snapshotting and replacement are the caller's job.
    async fn iterate(&self, document: &Document, feedback: &str)
        -> Result<DocumentContent, AppError>;

    /// Model name recorded in generation metadata.
    fn model(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// Model output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedLayout {
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub subheadline: Option<String>,
    #[serde(default, alias = "blocks")]
    pub sections: Option<Vec<Value>>,
}

impl GeneratedLayout {
    /// Validates model output into document content. Fields the model left out are
    /// taken from `base` when given (refinement), else defaulted.
    pub fn into_content(self, base: Option<&DocumentContent>) -> DocumentContent {
        let headline = self
            .headline
            .filter(|h| !h.trim().is_empty())
            .or_else(|| base.map(|b| b.headline.clone()))
            .unwrap_or_else(|| DEFAULT_HEADLINE.to_string());
        let subheadline = match self.subheadline {
            Some(s) => Some(s).filter(|s| !s.trim().is_empty()),
            None => base.and_then(|b| b.subheadline.clone()),
        };
        let blocks = match self.sections {
            Some(sections) => sanitize_sections(sections),
            None => base.map(|b| b.blocks.clone()).unwrap_or_default(),
        };

        let mut content = DocumentContent {
            headline,
            subheadline,
            blocks,
        };
        content.normalize_order();
        content
    }
}

/// Parses raw sections, keeping the valid ones. Missing ids become `section-{n}`.
fn sanitize_sections(sections: Vec<Value>) -> Vec<ContentBlock> {
    let mut seen = HashSet::new();
    let mut blocks = Vec::with_capacity(sections.len());

    for (idx, mut raw) in sections.into_iter().enumerate() {
        if let Value::Object(map) = &mut raw {
            let missing_id = map
                .get("id")
                .and_then(Value::as_str)
                .map_or(true, |id| id.trim().is_empty());
            if missing_id {
                map.insert("id".to_string(), Value::String(format!("section-{}", idx + 1)));
            }
            map.entry("order").or_insert_with(|| Value::from(idx as u64 + 1));
        }

        match serde_json::from_value::<ContentBlock>(raw) {
            Ok(block) if seen.insert(block.id.clone()) => blocks.push(block),
            Ok(block) => warn!(block_id = %block.id, "dropping generated section with duplicate id"),
            Err(e) => warn!("dropping invalid generated section: {e}"),
        }
    }
    blocks
}

// ────────────────────────────────────────────────────────────────────────────
// LLM-backed implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmGenerationBackend {
    llm: LlmClient,
}

impl LlmGenerationBackend {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl GenerationBackend for LlmGenerationBackend {
    async fn generate(&self, inputs: &SessionInputs) -> Result<DocumentContent, AppError> {
        let prompt = generation_prompt(
            &inputs.prompt,
            inputs.brand.as_ref(),
            inputs.target_audience.as_deref(),
        );
        let layout: GeneratedLayout = self
            .llm
            .call_json(&prompt, SYSTEM)
            .await
            .map_err(|e| AppError::Generation(format!("Initial generation failed: {e}")))?;

        let content = layout.into_content(None);
        info!(blocks = content.blocks.len(), "generated one-pager content");
        Ok(content)
    }

    async fn iterate(
        &self,
        document: &Document,
        feedback: &str,
    ) -> Result<DocumentContent, AppError> {
        let current = serde_json::to_string_pretty(&document.content)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize content: {e}")))?;
        let prompt = refinement_prompt(&current, feedback, None);
        let layout: GeneratedLayout = self
            .llm
            .call_json(&prompt, SYSTEM)
            .await
            .map_err(|e| AppError::Generation(format!("Refinement failed: {e}")))?;

        let content = layout.into_content(Some(&document.content));
        info!(
            document_id = %document.id,
            blocks = content.blocks.len(),
            "refined one-pager content"
        );
        Ok(content)
    }

    fn model(&self) -> &str {
        self.llm.model()
    }
}

//! The Document: unit of mutation and of snapshotting.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::block::{BlockType, ContentBlock};
use crate::errors::ValidationError;
use crate::history::VersionSnapshot;
use crate::layout::LayoutParameters;
use crate::templates::Template;

/// Headline, subheadline and the ordered block sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    #[serde(default, alias = "sections")]
    pub blocks: Vec<ContentBlock>,
}

impl DocumentContent {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            subheadline: None,
            blocks: Vec::new(),
        }
    }

    /// Blocks in ascending `order`. Ties keep their storage position.
    pub fn sorted_blocks(&self) -> Vec<&ContentBlock> {
        let mut blocks: Vec<&ContentBlock> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| b.order);
        blocks
    }

    /// All blocks of one type, in ascending `order`.
    pub fn blocks_by_type(&self, block_type: BlockType) -> Vec<&ContentBlock> {
        self.sorted_blocks()
            .into_iter()
            .filter(|b| b.block_type() == block_type)
            .collect()
    }

    /// Ids in display order.
    pub fn ordered_ids(&self) -> Vec<String> {
        self.sorted_blocks().iter().map(|b| b.id.clone()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&ContentBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Re-indexes `order` to the dense sequence `0..n` and stores blocks in that order.
    /// Idempotent.
    pub fn normalize_order(&mut self) {
        self.blocks.sort_by_key(|b| b.order);
        for (idx, block) in self.blocks.iter_mut().enumerate() {
            block.order = idx as u32;
        }
    }

    /// True when `order` is exactly `0..n` in storage order.
    pub fn is_dense(&self) -> bool {
        self.blocks
            .iter()
            .enumerate()
            .all(|(idx, b)| b.order == idx as u32)
    }

    /// Checks every block payload plus id and order uniqueness.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut ids = HashSet::new();
        let mut orders = HashSet::new();
        for block in &self.blocks {
            if !ids.insert(block.id.as_str()) {
                return Err(ValidationError::DuplicateId(block.id.clone()));
            }
            if !orders.insert(block.order) {
                return Err(ValidationError::DuplicateOrder(block.order));
            }
            block.validate()?;
        }
        Ok(())
    }
}

/// AI generation tracking metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub iterations: u32,
    pub ai_model: String,
    #[serde(default)]
    pub last_generated_at: Option<DateTime<Utc>>,
}

impl GenerationMetadata {
    pub fn new(ai_model: impl Into<String>) -> Self {
        Self {
            prompts: Vec::new(),
            iterations: 0,
            ai_model: ai_model.into(),
            last_generated_at: None,
        }
    }
}

/// One one-pager. Owns its content, layout parameters, chosen template and
/// the append-only version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub template: Template,
    pub content: DocumentContent,
    #[serde(default)]
    pub layout_params: LayoutParameters,
    /// Stored brand kit the document was generated against, if any.
    #[serde(default)]
    pub brand_kit_id: Option<Uuid>,
    /// Highest snapshot version allocated so far. Never reused.
    #[serde(default)]
    pub version: u32,
    /// Snapshot the current content was restored from. Cleared by the next
    /// wholesale change.
    #[serde(default)]
    pub current_version: Option<u32>,
    #[serde(default)]
    pub version_history: Vec<VersionSnapshot>,
    pub generation: GenerationMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every structural edit; keys memoized slot assignments.
    #[serde(skip)]
    revision: u64,
}

impl Document {
    pub fn new(title: impl Into<String>, content: DocumentContent, ai_model: &str) -> Self {
        let now = Utc::now();
        let mut content = content;
        content.normalize_order();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            template: Template::default(),
            content,
            layout_params: LayoutParameters::default(),
            brand_kit_id: None,
            version: 0,
            current_version: None,
            version_history: Vec::new(),
            generation: GenerationMetadata::new(ai_model),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Records a structural edit: invalidates memoized slot assignments and
    /// advances `updated_at`, which keys styled-mode fetches.
    pub fn mark_edited(&mut self) {
        self.revision += 1;
        // Strictly increasing at the microsecond precision the store keeps.
        let floor = self.updated_at + chrono::Duration::microseconds(1);
        self.updated_at = Utc::now().max(floor);
    }

    /// Replaces the content wholesale (AI iteration, restore). Order is renormalized.
    pub fn replace_content(&mut self, mut content: DocumentContent) {
        content.normalize_order();
        self.content = content;
        self.mark_edited();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

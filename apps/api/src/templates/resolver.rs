//! Template Slot Resolver.
//!
//! `resolve` partitions blocks by type (ascending `order` within each type), then
//! walks the template's rule table region by region, consuming from the front of
//! each typed sub-sequence. A block is never placed in two regions. Regions whose
//! picks are exhausted get an explicit placeholder, so the topology of a template
//! is constant regardless of how much content the document has.
//!
//! The function is pure: the same content and template always give the same
//! assignment, whichever surface asks.

use std::collections::{HashMap, HashSet};

use serde::{Serialize, Serializer};

use crate::content::{BlockContent, BlockType, ContentBlock, Document, DocumentContent};
use crate::templates::display::{apply_budget, hero_overlay};
use crate::templates::rules::{rules_for, DisplayBudget, Pick, RegionRule, RegionSpec, StaticCard};
use crate::templates::Template;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// A block as a region displays it: content already cut to the region's budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockView {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(serialize_with = "serialize_content")]
    pub content: BlockContent,
    /// Visual-hero overlay line, for regions that carry an overlay budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
    pub truncated: bool,
}

fn serialize_content<S: Serializer>(content: &BlockContent, s: S) -> Result<S::Ok, S::Error> {
    content.to_value().serialize(s)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionFill {
    Blocks { blocks: Vec<BlockView> },
    Static { cards: Vec<StaticCard> },
    Placeholder { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionAssignment {
    pub region: &'static str,
    pub label: &'static str,
    pub emphasis: bool,
    pub col_span: u8,
    pub row_span: u8,
    pub fill: RegionFill,
}

impl RegionAssignment {
    pub fn block_ids(&self) -> Vec<&str> {
        match &self.fill {
            RegionFill::Blocks { blocks } => blocks.iter().map(|b| b.id.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.fill, RegionFill::Placeholder { .. })
    }
}

/// Complete mapping of regions to blocks, static cards or placeholders for one
/// document and template, in render order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAssignment {
    pub template: Template,
    pub regions: Vec<RegionAssignment>,
}

impl SlotAssignment {
    pub fn region(&self, name: &str) -> Option<&RegionAssignment> {
        self.regions.iter().find(|r| r.region == name)
    }

    /// Ids of every block placed anywhere, in render order.
    pub fn assigned_ids(&self) -> Vec<&str> {
        self.regions.iter().flat_map(|r| r.block_ids()).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

/// Typed sub-sequences, each in ascending `order`.
fn partition(content: &DocumentContent) -> HashMap<BlockType, Vec<&ContentBlock>> {
    let mut by_type: HashMap<BlockType, Vec<&ContentBlock>> = HashMap::new();
    for block in content.sorted_blocks() {
        by_type.entry(block.block_type()).or_default().push(block);
    }
    by_type
}

fn take<'a>(
    partitions: &HashMap<BlockType, Vec<&'a ContentBlock>>,
    pick: &Pick,
    used: &mut HashSet<&'a str>,
) -> Option<&'a ContentBlock> {
    let block = *partitions.get(&pick.source)?.get(pick.index)?;
    used.insert(block.id.as_str()).then_some(block)
}

fn view(block: &ContentBlock, budget: &DisplayBudget) -> BlockView {
    let (content, truncated) = apply_budget(&block.content, budget);
    let overlay = match (&block.content, budget.overlay_chars) {
        (BlockContent::Hero(hero), Some(max)) => hero_overlay(hero, max),
        _ => None,
    };
    BlockView {
        id: block.id.clone(),
        block_type: block.block_type(),
        title: block.title.clone(),
        content,
        overlay,
        truncated,
    }
}

fn resolve_region<'a>(
    spec: &RegionSpec,
    partitions: &HashMap<BlockType, Vec<&'a ContentBlock>>,
    used: &mut HashSet<&'a str>,
) -> RegionFill {
    let blocks: Vec<&ContentBlock> = match spec.rule {
        RegionRule::Static(cards) => {
            return RegionFill::Static {
                cards: cards.to_vec(),
            }
        }
        RegionRule::Stack(picks) => picks
            .iter()
            .filter_map(|p| take(partitions, p, used))
            .collect(),
        RegionRule::FirstOf(picks) => picks
            .iter()
            .find_map(|p| take(partitions, p, used))
            .into_iter()
            .collect(),
    };

    if blocks.is_empty() {
        RegionFill::Placeholder {
            message: spec.empty_message.to_string(),
        }
    } else {
        RegionFill::Blocks {
            blocks: blocks.into_iter().map(|b| view(b, &spec.budget)).collect(),
        }
    }
}

/// Maps the document's blocks onto `template`'s regions.
pub fn resolve(content: &DocumentContent, template: Template) -> SlotAssignment {
    let partitions = partition(content);
    let mut used = HashSet::new();

    let regions = rules_for(template)
        .iter()
        .map(|spec| RegionAssignment {
            region: spec.name,
            label: spec.label,
            emphasis: spec.emphasis,
            col_span: spec.col_span,
            row_span: spec.row_span,
            fill: resolve_region(spec, &partitions, &mut used),
        })
        .collect();

    SlotAssignment { template, regions }
}

// ────────────────────────────────────────────────────────────────────────────
// Memo
// ────────────────────────────────────────────────────────────────────────────

/// Per-session cache of slot assignments, keyed by template and document revision.
///
/// Every structural edit bumps the document's revision, which makes older
/// entries miss. The memo belongs to a single document.
#[derive(Debug, Default)]
pub struct AssignmentMemo {
    entries: HashMap<Template, (u64, SlotAssignment)>,
}

impl AssignmentMemo {
    pub fn get(&mut self, document: &Document, template: Template) -> &SlotAssignment {
        let revision = document.revision();
        let entry = self
            .entries
            .entry(template)
            .or_insert_with(|| (revision, resolve(&document.content, template)));
        if entry.0 != revision {
            tracing::debug!(%template, revision, "slot assignment memo miss");
            *entry = (revision, resolve(&document.content, template));
        }
        &entry.1
    }

    /// Drops every entry, e.g. when the session swaps in a different document instance.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

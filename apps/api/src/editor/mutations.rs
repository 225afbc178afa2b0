//! Mutation & Reorder Engine.
//!
//! Every operation validates first and touches the document only on success, so a
//! rejected edit leaves no partial state behind. Successful edits renormalize
//! `order` to `0..n` and mark the document edited. None of these operations creates
//! a snapshot; lightweight edits are persisted directly by autosave.

use std::collections::HashSet;

use crate::content::{BlockPatch, ContentBlock, Document};
use crate::errors::ValidationError;

/// Inserts `block` at position `block.order` (clamped to the end) in display order.
pub fn insert(document: &mut Document, block: ContentBlock) -> Result<(), ValidationError> {
    block.validate()?;
    if document.content.find(&block.id).is_some() {
        return Err(ValidationError::DuplicateId(block.id));
    }

    let content = &mut document.content;
    content.normalize_order();
    let at = (block.order as usize).min(content.blocks.len());
    content.blocks.insert(at, block);
    renumber(&mut content.blocks);
    document.mark_edited();
    Ok(())
}

/// Applies a partial edit to one block. The block keeps its type and position.
pub fn update(
    document: &mut Document,
    block_id: &str,
    patch: &BlockPatch,
) -> Result<(), ValidationError> {
    let index = position(document, block_id)?;
    let next = document.content.blocks[index].patched(patch)?;
    document.content.blocks[index] = next;
    document.mark_edited();
    Ok(())
}

/// Removes one block and closes the gap in `order`.
pub fn delete(document: &mut Document, block_id: &str) -> Result<ContentBlock, ValidationError> {
    let index = position(document, block_id)?;
    let removed = document.content.blocks.remove(index);
    document.content.normalize_order();
    document.mark_edited();
    Ok(removed)
}

/// Reassigns dense `order` values to match `ordered_ids`.
///
/// Rejected unless `ordered_ids` is exactly the document's id set. Reordering to
/// the current order changes nothing and does not count as an edit.
pub fn reorder(document: &mut Document, ordered_ids: &[String]) -> Result<(), ValidationError> {
    let current: HashSet<&str> = document.content.blocks.iter().map(|b| b.id.as_str()).collect();
    let requested: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
    if requested.len() != ordered_ids.len() || requested != current {
        return Err(ValidationError::ReorderMismatch {
            expected: current.len(),
            actual: ordered_ids.len(),
        });
    }

    if document.content.is_dense() && document.content.ordered_ids() == ordered_ids {
        return Ok(());
    }

    let mut blocks = std::mem::take(&mut document.content.blocks);
    blocks.sort_by_key(|b| {
        ordered_ids
            .iter()
            .position(|id| *id == b.id)
            .unwrap_or(usize::MAX)
    });
    renumber(&mut blocks);
    document.content.blocks = blocks;
    document.mark_edited();
    Ok(())
}

/// Pure splice: moves the id at `from` to `to` and returns the new sequence.
/// Out-of-range `from` returns the input unchanged; `to` is clamped.
pub fn move_block(ids: &[String], from: usize, to: usize) -> Vec<String> {
    let mut out = ids.to_vec();
    if from >= out.len() {
        return out;
    }
    let id = out.remove(from);
    let to = to.min(out.len());
    out.insert(to, id);
    out
}

/// Drag-and-drop entry point: move one block to a display position.
pub fn move_to(document: &mut Document, block_id: &str, to: usize) -> Result<(), ValidationError> {
    let ids = document.content.ordered_ids();
    let from = ids
        .iter()
        .position(|id| id == block_id)
        .ok_or_else(|| ValidationError::UnknownBlock(block_id.to_string()))?;
    reorder(document, &move_block(&ids, from, to))
}

fn position(document: &Document, block_id: &str) -> Result<usize, ValidationError> {
    document
        .content
        .blocks
        .iter()
        .position(|b| b.id == block_id)
        .ok_or_else(|| ValidationError::UnknownBlock(block_id.to_string()))
}

fn renumber(blocks: &mut [ContentBlock]) {
    for (idx, block) in blocks.iter_mut().enumerate() {
        block.order = idx as u32;
    }
}

//! Display-only truncation. Every function here returns a new value; stored
//! content is never touched.

use crate::content::{BlockContent, HeroContent};
use crate::templates::rules::DisplayBudget;

const ELLIPSIS: &str = "...";

/// Cuts `text` to at most `max` characters (not bytes) and appends an ellipsis.
/// Returns `None` when nothing had to be cut.
pub fn truncate(text: &str, max: usize) -> Option<String> {
    if text.chars().count() <= max {
        return None;
    }
    let cut: String = text.chars().take(max).collect();
    Some(format!("{cut}{ELLIPSIS}"))
}

fn truncate_owned(text: &str, max: Option<usize>, truncated: &mut bool) -> String {
    match max.and_then(|m| truncate(text, m)) {
        Some(cut) => {
            *truncated = true;
            cut
        }
        None => text.to_string(),
    }
}

/// Applies a region's budget to a block payload. The flag reports whether anything was cut.
pub fn apply_budget(content: &BlockContent, budget: &DisplayBudget) -> (BlockContent, bool) {
    let mut truncated = false;
    let out = match content {
        BlockContent::Text(s) => {
            BlockContent::Text(truncate_owned(s, budget.text_chars, &mut truncated))
        }
        BlockContent::Heading(s) => {
            BlockContent::Heading(truncate_owned(s, budget.text_chars, &mut truncated))
        }
        BlockContent::Footer(s) => {
            BlockContent::Footer(truncate_owned(s, budget.text_chars, &mut truncated))
        }
        BlockContent::List(items) => {
            let limit = budget.list_items.unwrap_or(items.len());
            if items.len() > limit {
                truncated = true;
            }
            BlockContent::List(items.iter().take(limit).cloned().collect())
        }
        other => other.clone(),
    };
    (out, truncated)
}

/// Overlay line for a visual hero: the subheadline verbatim, else the description
/// cut to `max` characters.
pub fn hero_overlay(hero: &HeroContent, max: usize) -> Option<String> {
    if let Some(sub) = hero.subheadline.as_deref().filter(|s| !s.is_empty()) {
        return Some(sub.to_string());
    }
    hero.description
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(|d| truncate(d, max).unwrap_or_else(|| d.to_string()))
}

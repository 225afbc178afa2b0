//! Declarative per-template rule tables.
//!
//! Each template is an ordered list of regions. A region either pulls blocks from
//! the front of typed sub-sequences ("first list", "second text", ...) or is constant
//! chrome that never reads document data. The tables are the single source of truth
//! for topology; `resolver::resolve` is the only consumer.

use serde::Serialize;

use crate::content::BlockType;
use crate::content::BlockType::{Button, Cta, Hero, List, Text};
use crate::templates::Template;

// ────────────────────────────────────────────────────────────────────────────
// Rule vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// The `index`-th block of type `source`, counting in ascending `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub source: BlockType,
    pub index: usize,
}

/// Constant copy for regions that are not sourced from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StaticCard {
    pub title: &'static str,
    pub body: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRule {
    /// Every pick that resolves, in table order.
    Stack(&'static [Pick]),
    /// The first pick that resolves; the rest are fallbacks.
    FirstOf(&'static [Pick]),
    /// Fixed chrome or placeholder copy.
    Static(&'static [StaticCard]),
}

/// Display-only limits. Stored content is never truncated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayBudget {
    pub text_chars: Option<usize>,
    pub list_items: Option<usize>,
    /// Hero overlay text, used only when the hero has no subheadline.
    pub overlay_chars: Option<usize>,
}

const UNBOUNDED: DisplayBudget = DisplayBudget {
    text_chars: None,
    list_items: None,
    overlay_chars: None,
};

const fn budget(text_chars: usize, list_items: usize) -> DisplayBudget {
    DisplayBudget {
        text_chars: Some(text_chars),
        list_items: Some(list_items),
        overlay_chars: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub rule: RegionRule,
    pub budget: DisplayBudget,
    /// Rendered with emphasis styling (business box 1, product showcase card).
    pub emphasis: bool,
    pub col_span: u8,
    pub row_span: u8,
    /// Shown when no pick resolves. Unused for static regions.
    pub empty_message: &'static str,
}

impl RegionSpec {
    const fn new(name: &'static str, label: &'static str, rule: RegionRule) -> Self {
        Self {
            name,
            label,
            rule,
            budget: UNBOUNDED,
            emphasis: false,
            col_span: 1,
            row_span: 1,
            empty_message: "",
        }
    }

    const fn empty(mut self, message: &'static str) -> Self {
        self.empty_message = message;
        self
    }

    const fn budget(mut self, budget: DisplayBudget) -> Self {
        self.budget = budget;
        self
    }

    const fn emphasis(mut self) -> Self {
        self.emphasis = true;
        self
    }

    const fn span(mut self, col_span: u8, row_span: u8) -> Self {
        self.col_span = col_span;
        self.row_span = row_span;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimalist: hero, two equal columns, CTA footer
// ────────────────────────────────────────────────────────────────────────────

const MINIMALIST: &[RegionSpec] = &[
    RegionSpec::new("hero", "HERO", RegionRule::FirstOf(&[Pick { source: Hero, index: 0 }]))
        .empty("No hero section to display"),
    RegionSpec::new(
        "left",
        "LEFT COLUMN",
        RegionRule::Stack(&[Pick { source: List, index: 0 }, Pick { source: List, index: 1 }]),
    )
    .empty("No list sections to display"),
    RegionSpec::new(
        "right",
        "RIGHT COLUMN",
        RegionRule::Stack(&[Pick { source: Text, index: 0 }, Pick { source: Text, index: 1 }, Pick { source: List, index: 2 }]),
    )
    .empty("No text sections to display"),
    RegionSpec::new("footer", "CTA FOOTER", RegionRule::FirstOf(&[Pick { source: Cta, index: 0 }]))
        .empty("No call to action to display"),
];

// ────────────────────────────────────────────────────────────────────────────
// Bold: diagonal hero, 3-column asymmetric grid
// ────────────────────────────────────────────────────────────────────────────

const BOLD_BUDGET: DisplayBudget = budget(300, 8);

const BOLD: &[RegionSpec] = &[
    RegionSpec::new("hero", "DIAGONAL HERO", RegionRule::FirstOf(&[Pick { source: Hero, index: 0 }]))
        .empty("No hero section"),
    RegionSpec::new("large", "LARGE BLOCK", RegionRule::FirstOf(&[Pick { source: List, index: 0 }]))
        .budget(BOLD_BUDGET)
        .span(1, 2)
        .empty("No list sections"),
    RegionSpec::new("medium", "MEDIUM BLOCK", RegionRule::FirstOf(&[Pick { source: Text, index: 0 }]))
        .budget(BOLD_BUDGET)
        .empty("No text sections"),
    RegionSpec::new(
        "accent",
        "ACCENT",
        RegionRule::Static(&[StaticCard {
            title: "100%",
            body: "Quality",
        }]),
    ),
    RegionSpec::new(
        "wide",
        "WIDE BLOCK",
        RegionRule::FirstOf(&[Pick { source: List, index: 1 }, Pick { source: Text, index: 1 }]),
    )
    .budget(BOLD_BUDGET)
    .span(1, 2)
    .empty("No second list or text section"),
    RegionSpec::new(
        "footer",
        "FOOTER",
        RegionRule::FirstOf(&[Pick { source: Cta, index: 0 }, Pick { source: Button, index: 0 }]),
    )
    .empty("No call to action"),
];

// ────────────────────────────────────────────────────────────────────────────
// Business: header chrome, executive summary, metrics, 2x2 grid
// ────────────────────────────────────────────────────────────────────────────

const BUSINESS_BUDGET: DisplayBudget = budget(250, 6);

const BUSINESS: &[RegionSpec] = &[
    RegionSpec::new(
        "header",
        "HEADER",
        RegionRule::Static(&[StaticCard {
            title: "[Brand Logo/Name]",
            body: "",
        }]),
    ),
    RegionSpec::new(
        "executive_summary",
        "EXECUTIVE SUMMARY",
        RegionRule::FirstOf(&[Pick { source: Hero, index: 0 }]),
    )
    .empty("No executive summary"),
    RegionSpec::new(
        "metrics",
        "KEY METRICS",
        RegionRule::Static(&[
            StaticCard {
                title: "99+",
                body: "Metric 1",
            },
            StaticCard {
                title: "99+",
                body: "Metric 2",
            },
            StaticCard {
                title: "99+",
                body: "Metric 3",
            },
            StaticCard {
                title: "99+",
                body: "Metric 4",
            },
        ]),
    ),
    RegionSpec::new("box1", "BOX 1", RegionRule::FirstOf(&[Pick { source: List, index: 0 }]))
        .budget(BUSINESS_BUDGET)
        .emphasis()
        .empty("No section for Box 1"),
    RegionSpec::new("box2", "BOX 2", RegionRule::FirstOf(&[Pick { source: Text, index: 0 }]))
        .budget(BUSINESS_BUDGET)
        .empty("No section for Box 2"),
    RegionSpec::new("box3", "BOX 3", RegionRule::FirstOf(&[Pick { source: List, index: 1 }]))
        .budget(BUSINESS_BUDGET)
        .empty("No section for Box 3"),
    RegionSpec::new(
        "box4",
        "BOX 4",
        RegionRule::FirstOf(&[Pick { source: Text, index: 1 }, Pick { source: List, index: 2 }]),
    )
    .budget(BUSINESS_BUDGET)
    .empty("No section for Box 4"),
    RegionSpec::new(
        "footer",
        "FOOTER",
        RegionRule::FirstOf(&[Pick { source: Button, index: 0 }, Pick { source: Cta, index: 0 }]),
    )
    .empty("No call to action"),
];

// ────────────────────────────────────────────────────────────────────────────
// Product: brand bar, visual hero, 3x2 feature gallery
// ────────────────────────────────────────────────────────────────────────────

const PRODUCT: &[RegionSpec] = &[
    RegionSpec::new(
        "brand_bar",
        "BRAND BAR",
        RegionRule::Static(&[StaticCard {
            title: "[Brand Logo/Name]",
            body: "Premium Quality",
        }]),
    ),
    RegionSpec::new("hero", "VISUAL HERO", RegionRule::FirstOf(&[Pick { source: Hero, index: 0 }]))
        .budget(DisplayBudget {
            text_chars: None,
            list_items: None,
            overlay_chars: Some(100),
        })
        .empty("No hero section"),
    RegionSpec::new("card1", "CARD 1", RegionRule::FirstOf(&[Pick { source: List, index: 0 }]))
        .budget(budget(150, 4))
        .emphasis()
        .span(2, 1)
        .empty("No section for Card 1"),
    RegionSpec::new("card2", "CARD 2", RegionRule::FirstOf(&[Pick { source: Text, index: 0 }]))
        .budget(budget(150, 5))
        .empty("No section for Card 2"),
    RegionSpec::new("card3", "CARD 3", RegionRule::FirstOf(&[Pick { source: List, index: 1 }]))
        .budget(budget(150, 5))
        .empty("No section for Card 3"),
    RegionSpec::new(
        "card4",
        "CARD 4",
        RegionRule::FirstOf(&[Pick { source: List, index: 2 }, Pick { source: Text, index: 1 }]),
    )
    .budget(budget(150, 5))
    .empty("No section for Card 4"),
    RegionSpec::new(
        "card5",
        "CARD 5",
        RegionRule::Static(&[StaticCard {
            title: "Fast & Reliable",
            body: "Built for performance and scalability to grow with your needs.",
        }]),
    ),
    RegionSpec::new(
        "card6",
        "CARD 6",
        RegionRule::Static(&[StaticCard {
            title: "24/7 Support",
            body: "Our team is always here to help you succeed and answer questions.",
        }]),
    ),
    RegionSpec::new(
        "footer",
        "CTA BANNER",
        RegionRule::FirstOf(&[Pick { source: Button, index: 0 }, Pick { source: Cta, index: 0 }]),
    )
    .empty("No call to action"),
];

/// The rule table for one template, in render order.
pub fn rules_for(template: Template) -> &'static [RegionSpec] {
    match template {
        Template::Minimalist => MINIMALIST,
        Template::Bold => BOLD,
        Template::Business => BUSINESS,
        Template::Product => PRODUCT,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_region_names_unique_per_template() {
        for template in Template::ALL {
            let names: HashSet<&str> = rules_for(template).iter().map(|r| r.name).collect();
            assert_eq!(names.len(), rules_for(template).len(), "{template}");
        }
    }

    #[test]
    fn test_data_regions_have_empty_message() {
        for template in Template::ALL {
            for region in rules_for(template) {
                if !matches!(region.rule, RegionRule::Static(_)) {
                    assert!(!region.empty_message.is_empty(), "{template}/{}", region.name);
                }
            }
        }
    }

    #[test]
    fn test_no_pick_appears_twice_in_a_template() {
        for template in Template::ALL {
            let mut seen = HashSet::new();
            for region in rules_for(template) {
                let picks = match region.rule {
                    RegionRule::Stack(p) | RegionRule::FirstOf(p) => p,
                    RegionRule::Static(_) => continue,
                };
                for p in picks {
                    assert!(seen.insert((p.source, p.index)), "{template}/{}", region.name);
                }
            }
        }
    }

    #[test]
    fn test_minimalist_shape() {
        let names: Vec<&str> = rules_for(Template::Minimalist).iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["hero", "left", "right", "footer"]);
    }

    #[test]
    fn test_business_metrics_are_four_static_cards() {
        let metrics = rules_for(Template::Business)
            .iter()
            .find(|r| r.name == "metrics")
            .unwrap();
        match metrics.rule {
            RegionRule::Static(cards) => assert_eq!(cards.len(), 4),
            other => panic!("metrics should be static, got {other:?}"),
        }
    }
}

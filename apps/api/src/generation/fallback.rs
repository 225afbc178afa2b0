//! Deterministic content used when the generation backend fails on create, so a
//! new one-pager always opens with something editable.

use crate::content::{BlockContent, ContentBlock, DocumentContent, LinkContent};

const PROMPT_EXCERPT_CHARS: usize = 100;

pub fn fallback_content(user_prompt: &str) -> DocumentContent {
    let excerpt: String = user_prompt.chars().take(PROMPT_EXCERPT_CHARS).collect();

    DocumentContent {
        headline: "Your Marketing One-Pager".to_string(),
        subheadline: Some("Professional marketing materials made simple".to_string()),
        blocks: vec![
            ContentBlock::new(
                "section-1",
                BlockContent::Heading("About Our Solution".to_string()),
                0,
            ),
            ContentBlock::new(
                "section-2",
                BlockContent::Text(format!("Based on your input: {excerpt}...")),
                1,
            ),
            ContentBlock::new(
                "section-3",
                BlockContent::List(vec![
                    "Key benefit or feature".to_string(),
                    "Another important point".to_string(),
                    "Final value proposition".to_string(),
                ]),
                2,
            ),
            ContentBlock::new(
                "section-4",
                BlockContent::Button(LinkContent {
                    text: "Get Started".to_string(),
                    url: None,
                }),
                3,
            ),
        ],
    }
}

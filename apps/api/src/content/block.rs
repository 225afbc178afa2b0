//! Content blocks: the typed, ordered units a one-pager is built from.
//!
//! On the wire a block is `{id, type, title?, content, order, metadata?}` where the
//! shape of `content` depends on `type`. Internally the payload is a tagged union
//! (`BlockContent`) so renderers never have to inspect raw JSON: a block whose
//! payload does not match its declared type cannot be constructed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ValidationError;

// ────────────────────────────────────────────────────────────────────────────
// Block type discriminator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Heading,
    Text,
    List,
    Button,
    Hero,
    Features,
    Testimonials,
    Cta,
    Footer,
    Image,
}

impl BlockType {
    pub const ALL: [BlockType; 10] = [
        BlockType::Heading,
        BlockType::Text,
        BlockType::List,
        BlockType::Button,
        BlockType::Hero,
        BlockType::Features,
        BlockType::Testimonials,
        BlockType::Cta,
        BlockType::Footer,
        BlockType::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Heading => "heading",
            BlockType::Text => "text",
            BlockType::List => "list",
            BlockType::Button => "button",
            BlockType::Hero => "hero",
            BlockType::Features => "features",
            BlockType::Testimonials => "testimonials",
            BlockType::Cta => "cta",
            BlockType::Footer => "footer",
            BlockType::Image => "image",
        }
    }

    /// Human description of the payload shape, used in validation messages.
    fn expected_shape(&self) -> &'static str {
        match self {
            BlockType::Heading | BlockType::Text | BlockType::Footer => "a string",
            BlockType::List => "a sequence of strings",
            BlockType::Button | BlockType::Cta => "a string or a {text, url?} record",
            BlockType::Hero => "a {headline, subheadline?, description?} record",
            BlockType::Features => "an {items: [{title, description}]} record",
            BlockType::Testimonials => "an {items: [{quote, author?, role?}]} record",
            BlockType::Image => "a string or a {url, alt?} record",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structured payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroContent {
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload for `button` and `cta` blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesContent {
    pub items: Vec<FeatureItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestimonialsContent {
    pub items: Vec<Testimonial>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// The polymorphic block payload. The variant *is* the block type.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Heading(String),
    Text(String),
    List(Vec<String>),
    Button(LinkContent),
    Hero(HeroContent),
    Features(FeaturesContent),
    Testimonials(TestimonialsContent),
    Cta(LinkContent),
    Footer(String),
    Image(ImageContent),
}

impl BlockContent {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Heading(_) => BlockType::Heading,
            BlockContent::Text(_) => BlockType::Text,
            BlockContent::List(_) => BlockType::List,
            BlockContent::Button(_) => BlockType::Button,
            BlockContent::Hero(_) => BlockType::Hero,
            BlockContent::Features(_) => BlockType::Features,
            BlockContent::Testimonials(_) => BlockType::Testimonials,
            BlockContent::Cta(_) => BlockType::Cta,
            BlockContent::Footer(_) => BlockType::Footer,
            BlockContent::Image(_) => BlockType::Image,
        }
    }

    /// Parses a raw JSON payload against the declared block type.
    ///
    /// `id` is only used to make the error message point at the offending block.
    pub fn parse(id: &str, block_type: BlockType, raw: &Value) -> Result<Self, ValidationError> {
        let mismatch = || ValidationError::ShapeMismatch {
            id: id.to_string(),
            block_type,
            expected: block_type.expected_shape(),
        };

        let content = match block_type {
            BlockType::Heading => BlockContent::Heading(as_string(raw).ok_or_else(mismatch)?),
            BlockType::Text => BlockContent::Text(as_string(raw).ok_or_else(mismatch)?),
            BlockType::Footer => BlockContent::Footer(as_string(raw).ok_or_else(mismatch)?),
            BlockType::List => {
                BlockContent::List(from_value::<Vec<String>>(raw).ok_or_else(mismatch)?)
            }
            BlockType::Button => BlockContent::Button(parse_link(raw).ok_or_else(mismatch)?),
            BlockType::Cta => BlockContent::Cta(parse_link(raw).ok_or_else(mismatch)?),
            BlockType::Hero => {
                if !raw.is_object() {
                    return Err(mismatch());
                }
                if raw.get("headline").map_or(true, Value::is_null) {
                    return Err(ValidationError::MissingField {
                        id: id.to_string(),
                        block_type,
                        field: "headline",
                    });
                }
                BlockContent::Hero(from_value(raw).ok_or_else(mismatch)?)
            }
            BlockType::Features => {
                BlockContent::Features(from_value(raw).ok_or_else(mismatch)?)
            }
            BlockType::Testimonials => {
                BlockContent::Testimonials(from_value(raw).ok_or_else(mismatch)?)
            }
            BlockType::Image => {
                let image = match raw {
                    Value::String(url) => ImageContent {
                        url: url.clone(),
                        alt: None,
                    },
                    _ => from_value(raw).ok_or_else(mismatch)?,
                };
                BlockContent::Image(image)
            }
        };

        content.check_required(id)?;
        Ok(content)
    }

    /// Serializes the payload back to its wire shape.
    pub fn to_value(&self) -> Value {
        let value = match self {
            BlockContent::Heading(s) | BlockContent::Text(s) | BlockContent::Footer(s) => {
                Ok(Value::String(s.clone()))
            }
            BlockContent::List(items) => serde_json::to_value(items),
            BlockContent::Button(link) | BlockContent::Cta(link) => serde_json::to_value(link),
            BlockContent::Hero(hero) => serde_json::to_value(hero),
            BlockContent::Features(f) => serde_json::to_value(f),
            BlockContent::Testimonials(t) => serde_json::to_value(t),
            BlockContent::Image(img) => serde_json::to_value(img),
        };
        // Plain structs of strings always serialize.
        value.unwrap_or(Value::Null)
    }

    /// An empty payload of the given type, used for freshly inserted placeholder blocks.
    pub fn empty(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Heading => BlockContent::Heading(String::new()),
            BlockType::Text => BlockContent::Text(String::new()),
            BlockType::Footer => BlockContent::Footer(String::new()),
            BlockType::List => BlockContent::List(Vec::new()),
            BlockType::Button => BlockContent::Button(LinkContent {
                text: String::new(),
                url: None,
            }),
            BlockType::Cta => BlockContent::Cta(LinkContent {
                text: String::new(),
                url: None,
            }),
            BlockType::Hero => BlockContent::Hero(HeroContent {
                headline: "New headline".to_string(),
                subheadline: None,
                description: None,
            }),
            BlockType::Features => BlockContent::Features(FeaturesContent { items: Vec::new() }),
            BlockType::Testimonials => {
                BlockContent::Testimonials(TestimonialsContent { items: Vec::new() })
            }
            BlockType::Image => BlockContent::Image(ImageContent {
                url: "about:blank".to_string(),
                alt: None,
            }),
        }
    }

    /// Plain-text rendering used by prompts and truncation.
    pub fn plain_text(&self) -> String {
        match self {
            BlockContent::Heading(s) | BlockContent::Text(s) | BlockContent::Footer(s) => {
                s.clone()
            }
            BlockContent::List(items) => items.join("\n"),
            BlockContent::Button(link) | BlockContent::Cta(link) => link.text.clone(),
            BlockContent::Hero(hero) => [
                Some(hero.headline.as_str()),
                hero.subheadline.as_deref(),
                hero.description.as_deref(),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n"),
            BlockContent::Features(f) => f
                .items
                .iter()
                .map(|i| format!("{}: {}", i.title, i.description))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockContent::Testimonials(t) => t
                .items
                .iter()
                .map(|i| i.quote.clone())
                .collect::<Vec<_>>()
                .join("\n"),
            BlockContent::Image(img) => img.alt.clone().unwrap_or_default(),
        }
    }

    fn check_required(&self, id: &str) -> Result<(), ValidationError> {
        let missing = |field| ValidationError::MissingField {
            id: id.to_string(),
            block_type: self.block_type(),
            field,
        };
        match self {
            BlockContent::Hero(hero) if hero.headline.trim().is_empty() => Err(missing("headline")),
            BlockContent::Image(img) if img.url.trim().is_empty() => Err(missing("url")),
            _ => Ok(()),
        }
    }
}

fn as_string(raw: &Value) -> Option<String> {
    raw.as_str().map(str::to_string)
}

fn from_value<T: serde::de::DeserializeOwned>(raw: &Value) -> Option<T> {
    serde_json::from_value(raw.clone()).ok()
}

/// Buttons and CTAs are produced both as bare strings and as `{text, url}` records.
fn parse_link(raw: &Value) -> Option<LinkContent> {
    match raw {
        Value::String(text) => Some(LinkContent {
            text: text.clone(),
            url: None,
        }),
        Value::Object(_) => from_value(raw),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ContentBlock
// ────────────────────────────────────────────────────────────────────────────

/// Wire representation. Every `ContentBlock` passes through this on (de)serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawContentBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: Value,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContentBlock", into = "RawContentBlock")]
pub struct ContentBlock {
    pub id: String,
    pub title: Option<String>,
    pub content: BlockContent,
    pub order: u32,
    pub metadata: Map<String, Value>,
}

impl ContentBlock {
    pub fn new(id: impl Into<String>, content: BlockContent, order: u32) -> Self {
        Self {
            id: id.into(),
            title: None,
            content,
            order,
            metadata: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn block_type(&self) -> BlockType {
        self.content.block_type()
    }

    /// Re-checks the payload against the declared type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        BlockContent::parse(&self.id, self.block_type(), &self.content.to_value()).map(|_| ())
    }

    /// Applies a partial edit and returns the edited block; `self` is untouched on error.
    ///
    /// Record payloads are merged key by key (a `null` value removes the key); any
    /// other payload is replaced wholesale. The block type never changes.
    pub fn patched(&self, patch: &BlockPatch) -> Result<ContentBlock, ValidationError> {
        let mut next = self.clone();

        if let Some(title) = &patch.title {
            next.title = if title.is_empty() {
                None
            } else {
                Some(title.clone())
            };
        }

        if let Some(content) = &patch.content {
            let merged = match (self.content.to_value(), content) {
                (Value::Object(mut current), Value::Object(changes)) => {
                    for (key, value) in changes {
                        if value.is_null() {
                            current.remove(key);
                        } else {
                            current.insert(key.clone(), value.clone());
                        }
                    }
                    Value::Object(current)
                }
                (_, replacement) => replacement.clone(),
            };
            next.content = BlockContent::parse(&self.id, self.block_type(), &merged)?;
        }

        if let Some(metadata) = &patch.metadata {
            for (key, value) in metadata {
                next.metadata.insert(key.clone(), value.clone());
            }
        }

        Ok(next)
    }
}

impl TryFrom<RawContentBlock> for ContentBlock {
    type Error = ValidationError;

    fn try_from(raw: RawContentBlock) -> Result<Self, Self::Error> {
        let content = BlockContent::parse(&raw.id, raw.block_type, &raw.content)?;
        Ok(ContentBlock {
            id: raw.id,
            title: raw.title.filter(|t| !t.is_empty()),
            content,
            order: raw.order,
            metadata: raw.metadata,
        })
    }
}

impl From<ContentBlock> for RawContentBlock {
    fn from(block: ContentBlock) -> Self {
        RawContentBlock {
            block_type: block.block_type(),
            content: block.content.to_value(),
            id: block.id,
            title: block.title,
            order: block.order,
            metadata: block.metadata,
        }
    }
}

/// Partial edit payload for `update(blockId, partialContent)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockPatch {
    /// `Some("")` clears the title.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_block(value: Value) -> Result<ContentBlock, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_list_block_parses_sequence() {
        let block = parse_block(json!({
            "id": "s-1", "type": "list", "content": ["A", "B"], "order": 2
        }))
        .unwrap();
        assert_eq!(block.block_type(), BlockType::List);
        assert_eq!(
            block.content,
            BlockContent::List(vec!["A".to_string(), "B".to_string()])
        );
        assert_eq!(block.order, 2);
    }

    #[test]
    fn test_list_block_rejects_string_content() {
        let err = BlockContent::parse("s-1", BlockType::List, &json!("not a list")).unwrap_err();
        assert!(matches!(err, ValidationError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_hero_requires_headline() {
        let err =
            BlockContent::parse("h", BlockType::Hero, &json!({"subheadline": "x"})).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingField {
                field: "headline",
                ..
            }
        ));
    }

    #[test]
    fn test_hero_rejects_blank_headline() {
        let err = BlockContent::parse("h", BlockType::Hero, &json!({"headline": "  "})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { .. }));
    }

    #[test]
    fn test_button_accepts_bare_string() {
        let content = BlockContent::parse("b", BlockType::Button, &json!("Get Started")).unwrap();
        assert_eq!(
            content,
            BlockContent::Button(LinkContent {
                text: "Get Started".to_string(),
                url: None
            })
        );
    }

    #[test]
    fn test_cta_accepts_record_with_url() {
        let content = BlockContent::parse(
            "c",
            BlockType::Cta,
            &json!({"text": "Book a demo", "url": "https://example.com"}),
        )
        .unwrap();
        match content {
            BlockContent::Cta(link) => assert_eq!(link.url.as_deref(), Some("https://example.com")),
            other => panic!("expected cta, got {other:?}"),
        }
    }

    #[test]
    fn test_wire_roundtrip_keeps_type_tag() {
        let block = ContentBlock::new("t-1", BlockContent::Text("Hello".to_string()), 0)
            .with_title("Intro");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["content"], "Hello");
        assert_eq!(value["title"], "Intro");
    }

    #[test]
    fn test_patch_merges_record_fields() {
        let hero = ContentBlock::new(
            "h",
            BlockContent::Hero(HeroContent {
                headline: "Old".to_string(),
                subheadline: Some("Sub".to_string()),
                description: None,
            }),
            0,
        );
        let patch = BlockPatch {
            content: Some(json!({"headline": "New"})),
            ..Default::default()
        };
        let next = hero.patched(&patch).unwrap();
        match next.content {
            BlockContent::Hero(h) => {
                assert_eq!(h.headline, "New");
                assert_eq!(h.subheadline.as_deref(), Some("Sub"));
            }
            other => panic!("expected hero, got {other:?}"),
        }
    }

    #[test]
    fn test_patch_with_wrong_shape_leaves_block_untouched() {
        let list = ContentBlock::new("l", BlockContent::List(vec!["A".to_string()]), 0);
        let patch = BlockPatch {
            content: Some(json!({"headline": "nope"})),
            ..Default::default()
        };
        assert!(list.patched(&patch).is_err());
        assert_eq!(list.content, BlockContent::List(vec!["A".to_string()]));
    }

    #[test]
    fn test_patch_null_removes_optional_field() {
        let hero = ContentBlock::new(
            "h",
            BlockContent::Hero(HeroContent {
                headline: "H".to_string(),
                subheadline: Some("Sub".to_string()),
                description: None,
            }),
            0,
        );
        let patch = BlockPatch {
            content: Some(json!({"subheadline": null})),
            ..Default::default()
        };
        match hero.patched(&patch).unwrap().content {
            BlockContent::Hero(h) => assert!(h.subheadline.is_none()),
            other => panic!("expected hero, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_payloads_validate() {
        for block_type in BlockType::ALL {
            let block = ContentBlock::new("e", BlockContent::empty(block_type), 0);
            assert!(block.validate().is_ok(), "{block_type} placeholder should validate");
        }
    }
}

//! Layout parameters: scalar design configuration that scales a template
//! without changing its topology.
//!
//! Every numeric scale is a multiplier applied to a base value owned by the
//! rendering surface, never an absolute unit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

// ────────────────────────────────────────────────────────────────────────────
// Ranges
// ────────────────────────────────────────────────────────────────────────────

pub const H1_SCALE_RANGE: (f64, f64) = (0.8, 1.5);
pub const H2_SCALE_RANGE: (f64, f64) = (0.8, 1.5);
pub const BODY_SCALE_RANGE: (f64, f64) = (0.8, 1.3);
pub const LINE_HEIGHT_SCALE_RANGE: (f64, f64) = (0.8, 1.4);
pub const PADDING_SCALE_RANGE: (f64, f64) = (0.5, 2.0);

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// The five named brand colours, each `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub text: String,
    pub background: String,
}

impl ColorScheme {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("color_scheme.primary", &self.primary),
            ("color_scheme.secondary", &self.secondary),
            ("color_scheme.accent", &self.accent),
            ("color_scheme.text", &self.text),
            ("color_scheme.background", &self.background),
        ] {
            if !is_hex_color(value) {
                return Err(ValidationError::InvalidColor {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            primary: "#864CBD".to_string(),
            secondary: "#1E1E1E".to_string(),
            accent: "#F4B400".to_string(),
            text: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub heading_font: String,
    pub body_font: String,
    pub h1_scale: f64,
    pub h2_scale: f64,
    pub body_scale: f64,
    pub line_height_scale: f64,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            heading_font: "Inter".to_string(),
            body_font: "Inter".to_string(),
            h1_scale: 1.0,
            h2_scale: 1.0,
            body_scale: 1.0,
            line_height_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionGap {
    Tight,
    #[default]
    Normal,
    Loose,
}

impl SectionGap {
    /// Fixed gap lookup table, in pixels.
    pub fn px(self) -> u32 {
        match self {
            SectionGap::Tight => 12,
            SectionGap::Normal => 20,
            SectionGap::Loose => 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    pub section_gap: SectionGap,
    pub padding_scale: f64,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            section_gap: SectionGap::Normal,
            padding_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePosition {
    Top,
    Left,
    Right,
    None,
}

/// Per-section-category layout: columns, alignment, image placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionLayout {
    pub columns: u8,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_position: Option<ImagePosition>,
}

impl Default for SectionLayout {
    fn default() -> Self {
        Self {
            columns: 1,
            alignment: Alignment::Left,
            image_position: Some(ImagePosition::Top),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParameters {
    pub color_scheme: ColorScheme,
    pub typography: Typography,
    pub spacing: Spacing,
    /// Keyed by section category name (e.g. `hero`, `features`).
    pub section_layouts: BTreeMap<String, SectionLayout>,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

impl LayoutParameters {
    /// Rejects out-of-range scales, bad column counts and malformed colours.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let t = &self.typography;
        check_range("typography.h1_scale", t.h1_scale, H1_SCALE_RANGE)?;
        check_range("typography.h2_scale", t.h2_scale, H2_SCALE_RANGE)?;
        check_range("typography.body_scale", t.body_scale, BODY_SCALE_RANGE)?;
        check_range(
            "typography.line_height_scale",
            t.line_height_scale,
            LINE_HEIGHT_SCALE_RANGE,
        )?;
        check_range(
            "spacing.padding_scale",
            self.spacing.padding_scale,
            PADDING_SCALE_RANGE,
        )?;

        for layout in self.section_layouts.values() {
            if !(1..=3).contains(&layout.columns) {
                return Err(ValidationError::OutOfRange {
                    field: "section_layouts.columns",
                    value: layout.columns as f64,
                    min: 1.0,
                    max: 3.0,
                });
            }
        }

        self.color_scheme.validate()
    }

    /// Saturating alternative to `validate` for values we did not author
    /// (AI output, legacy rows). Colours that fail to parse fall back to defaults.
    pub fn clamped(&self) -> Self {
        let mut out = self.clone();
        let t = &mut out.typography;
        t.h1_scale = clamp(t.h1_scale, H1_SCALE_RANGE);
        t.h2_scale = clamp(t.h2_scale, H2_SCALE_RANGE);
        t.body_scale = clamp(t.body_scale, BODY_SCALE_RANGE);
        t.line_height_scale = clamp(t.line_height_scale, LINE_HEIGHT_SCALE_RANGE);
        out.spacing.padding_scale = clamp(out.spacing.padding_scale, PADDING_SCALE_RANGE);

        for layout in out.section_layouts.values_mut() {
            layout.columns = layout.columns.clamp(1, 3);
        }

        let defaults = ColorScheme::default();
        let c = &mut out.color_scheme;
        for (value, fallback) in [
            (&mut c.primary, defaults.primary),
            (&mut c.secondary, defaults.secondary),
            (&mut c.accent, defaults.accent),
            (&mut c.text, defaults.text),
            (&mut c.background, defaults.background),
        ] {
            if !is_hex_color(value) {
                *value = fallback;
            }
        }
        out
    }

    /// Layout for one section category, falling back to the default.
    pub fn section_layout(&self, category: &str) -> SectionLayout {
        self.section_layouts
            .get(category)
            .cloned()
            .unwrap_or_default()
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ValidationError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn clamp(value: f64, (min, max): (f64, f64)) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        1.0
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

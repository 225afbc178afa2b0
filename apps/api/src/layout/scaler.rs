//! Layout Parameter Scaler: turns `LayoutParameters` into renderer-agnostic tokens.
//!
//! Surfaces consume only these tokens plus their own base values
//! (see `layout::surface`). Nothing here produces a font size or padding in pixels;
//! the one exception is the section gap, which is a fixed lookup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::layout::params::{LayoutParameters, SectionGap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingTokens {
    pub h1_scale: f64,
    pub h2_scale: f64,
    pub body_scale: f64,
    pub line_height_scale: f64,
    pub padding_scale: f64,
    pub section_gap: SectionGap,
    pub section_gap_px: u32,
}

impl Default for ScalingTokens {
    fn default() -> Self {
        scale(&LayoutParameters::default())
    }
}

/// Pure mapping from parameters to tokens. Each token depends on exactly one parameter.
pub fn scale(params: &LayoutParameters) -> ScalingTokens {
    let t = &params.typography;
    ScalingTokens {
        h1_scale: t.h1_scale,
        h2_scale: t.h2_scale,
        body_scale: t.body_scale,
        line_height_scale: t.line_height_scale,
        padding_scale: params.spacing.padding_scale,
        section_gap: params.spacing.section_gap,
        section_gap_px: params.spacing.section_gap.px(),
    }
}

/// Tokens for an optional parameter set; absent parameters mean the documented defaults.
pub fn scale_or_default(params: Option<&LayoutParameters>) -> ScalingTokens {
    params.map(scale).unwrap_or_default()
}

impl ScalingTokens {
    /// CSS custom properties consumed by the wireframe and editor stylesheets.
    pub fn css_variables(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("--layout-h1-scale", format_scale(self.h1_scale)),
            ("--layout-h2-scale", format_scale(self.h2_scale)),
            ("--layout-body-scale", format_scale(self.body_scale)),
            (
                "--layout-line-height-scale",
                format_scale(self.line_height_scale),
            ),
            ("--layout-padding-scale", format_scale(self.padding_scale)),
            ("--layout-section-gap", format!("{}px", self.section_gap_px)),
        ])
    }

    /// The variables joined into an inline `style` attribute value.
    pub fn style_attr(&self) -> String {
        self.css_variables()
            .iter()
            .map(|(k, v)| format!("{k}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `1.0` keeps its decimal point; other values use the shortest exact form.
fn format_scale(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

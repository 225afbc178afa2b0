//! Base value tables for the three rendering surfaces.
//!
//! Each surface multiplies its own bases by the shared scaling tokens. This is the
//! only place absolute sizes exist, and it lives on the surface side of the
//! boundary: the same token set drives every surface proportionally.

use serde::{Deserialize, Serialize};

use crate::layout::scaler::ScalingTokens;

/// The three ways a document is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderSurface {
    /// Inline block editor.
    Editor,
    /// Local structural preview.
    Wireframe,
    /// Final document produced by the external template engine (print units).
    Styled,
}

/// Unscaled sizes owned by one surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBase {
    pub h1_px: f64,
    pub h2_px: f64,
    pub body_px: f64,
    pub line_height: f64,
    pub padding_px: f64,
}

/// Absolute sizes after applying tokens to a surface's bases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSizes {
    pub h1_px: f64,
    pub h2_px: f64,
    pub body_px: f64,
    pub line_height: f64,
    pub padding_px: f64,
    pub section_gap_px: u32,
}

impl RenderSurface {
    pub fn base(&self) -> SurfaceBase {
        match self {
            RenderSurface::Editor => SurfaceBase {
                h1_px: 40.0,
                h2_px: 28.0,
                body_px: 16.0,
                line_height: 1.5,
                padding_px: 24.0,
            },
            RenderSurface::Wireframe => SurfaceBase {
                h1_px: 28.0,
                h2_px: 18.0,
                body_px: 12.0,
                line_height: 1.4,
                padding_px: 16.0,
            },
            RenderSurface::Styled => SurfaceBase {
                h1_px: 36.0,
                h2_px: 24.0,
                body_px: 11.0,
                line_height: 1.5,
                padding_px: 20.0,
            },
        }
    }

    pub fn resolve(&self, tokens: &ScalingTokens) -> ResolvedSizes {
        let base = self.base();
        ResolvedSizes {
            h1_px: base.h1_px * tokens.h1_scale,
            h2_px: base.h2_px * tokens.h2_scale,
            body_px: base.body_px * tokens.body_scale,
            line_height: base.line_height * tokens.line_height_scale,
            padding_px: base.padding_px * tokens.padding_scale,
            section_gap_px: tokens.section_gap_px,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::params::LayoutParameters;
    use crate::layout::scaler::scale;

    #[test]
    fn test_default_tokens_resolve_to_bases() {
        let tokens = ScalingTokens::default();
        for surface in [
            RenderSurface::Editor,
            RenderSurface::Wireframe,
            RenderSurface::Styled,
        ] {
            let base = surface.base();
            let sizes = surface.resolve(&tokens);
            assert_eq!(sizes.h1_px, base.h1_px);
            assert_eq!(sizes.body_px, base.body_px);
            assert_eq!(sizes.section_gap_px, 20);
        }
    }

    #[test]
    fn test_scale_is_proportional_across_surfaces() {
        let mut params = LayoutParameters::default();
        params.typography.h1_scale = 1.5;
        let tokens = scale(&params);
        for surface in [RenderSurface::Editor, RenderSurface::Styled] {
            let sizes = surface.resolve(&tokens);
            let ratio = sizes.h1_px / surface.base().h1_px;
            assert!((ratio - 1.5).abs() < 1e-9);
            assert_eq!(sizes.body_px, surface.base().body_px);
        }
    }
}

// Layout parameters and the scaling system shared by every render surface.
// The scaler is pure; surfaces own their base values and resolve tokens locally.

pub mod params;
pub mod scaler;
pub mod surface;

pub use params::{
    Alignment, ColorScheme, ImagePosition, LayoutParameters, SectionGap, SectionLayout,
    Spacing, Typography,
};
pub use scaler::{scale, scale_or_default, ScalingTokens};
pub use surface::{RenderSurface, ResolvedSizes};

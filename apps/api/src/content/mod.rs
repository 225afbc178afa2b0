// Content model: typed blocks, the owning Document, and brand context.

pub mod block;
pub mod brand;
pub mod document;

pub use block::{
    BlockContent, BlockPatch, BlockType, ContentBlock, FeatureItem, FeaturesContent,
    HeroContent, ImageContent, LinkContent, Testimonial, TestimonialsContent,
};
pub use brand::{BrandKit, NonEmptyList, StoredBrandKit, TargetAudience};
pub use document::{Document, DocumentContent, GenerationMetadata};

// One-pager generation: the backend seam, prompts, the deterministic fallback,
// and the document-level effects of generating and iterating.
// All model calls go through llm_client.

pub mod backend;
pub mod fallback;
pub mod iteration;
pub mod prompts;

pub use backend::{GeneratedLayout, GenerationBackend, LlmGenerationBackend, SessionInputs};
pub use fallback::fallback_content;
pub use iteration::{apply_iteration, create_document};

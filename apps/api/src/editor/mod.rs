// In-process editing engine: block mutations, debounced autosave, and the
// single-writer session that ties them to rendering and AI iteration.

pub mod autosave;
pub mod mutations;
pub mod session;

pub use autosave::{spawn_autosave, AutosaveHandle, Debounce, SaveStatus, DEFAULT_DEBOUNCE};
pub use mutations::{delete, insert, move_block, move_to, reorder, update};
pub use session::{EditorSession, GenerationNotice, PendingFetch, PendingIteration};

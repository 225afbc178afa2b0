// HTTP handlers for one-pager documents: generation, block editing, rendering
// and version history.

pub mod handlers;

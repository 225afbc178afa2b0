use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::content::Document;
use crate::editor::{spawn_autosave, EditorSession, DEFAULT_DEBOUNCE};
use crate::errors::AppError;
use crate::generation::GenerationBackend;
use crate::persistence::{BrandKitStore, DocumentStore};
use crate::render::{MarkupCache, TemplateEngine};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub brand_kits: Arc<dyn BrandKitStore>,
    pub generator: Arc<dyn GenerationBackend>,
    pub engine: Arc<dyn TemplateEngine>,
    pub markup_cache: Arc<dyn MarkupCache>,
    pub iterations: Arc<InFlightIterations>,
    pub autosave_debounce: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        brand_kits: Arc<dyn BrandKitStore>,
        generator: Arc<dyn GenerationBackend>,
        engine: Arc<dyn TemplateEngine>,
        markup_cache: Arc<dyn MarkupCache>,
    ) -> Self {
        Self {
            store,
            brand_kits,
            generator,
            engine,
            markup_cache,
            iterations: Arc::new(InFlightIterations::default()),
            autosave_debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_autosave_debounce(mut self, quiet: Duration) -> Self {
        self.autosave_debounce = quiet;
        self
    }

    /// Opens an in-process editing session backed by this state's collaborators.
    /// The HTTP handlers never open one; this is the library surface for an
    /// embedding client, and the only consumer of `autosave_debounce`.
    /// Must be called inside a Tokio runtime; the autosave worker is spawned here.
    pub fn open_session(&self, document: Document) -> EditorSession {
        let (autosave, _worker) = spawn_autosave(self.store.clone(), self.autosave_debounce);
        EditorSession::new(
            document,
            autosave,
            self.generator.clone(),
            self.engine.clone(),
            self.markup_cache.clone(),
        )
    }
}

/// Documents with an AI iteration currently running. A second request for the same
/// document is rejected rather than queued.
#[derive(Debug, Default)]
pub struct InFlightIterations {
    documents: Mutex<HashSet<Uuid>>,
}

impl InFlightIterations {
    /// Claims the document. The claim is released when the guard drops, including
    /// when the request future is cancelled.
    pub fn claim(self: &Arc<Self>, id: Uuid) -> Result<IterationGuard, AppError> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("iteration registry poisoned")))?;
        if !documents.insert(id) {
            return Err(AppError::Conflict(format!(
                "An AI iteration for one-pager {id} is already in progress"
            )));
        }
        Ok(IterationGuard {
            registry: self.clone(),
            id,
        })
    }

    pub fn is_running(&self, id: Uuid) -> bool {
        self.documents
            .lock()
            .map(|documents| documents.contains(&id))
            .unwrap_or(false)
    }
}

pub struct IterationGuard {
    registry: Arc<InFlightIterations>,
    id: Uuid,
}

impl Drop for IterationGuard {
    fn drop(&mut self) {
        if let Ok(mut documents) = self.registry.documents.lock() {
            documents.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let registry = Arc::new(InFlightIterations::default());
        let id = Uuid::new_v4();

        let guard = registry.claim(id).unwrap();
        assert!(registry.is_running(id));
        assert!(matches!(registry.claim(id), Err(AppError::Conflict(_))));
        assert!(registry.claim(Uuid::new_v4()).is_ok());

        drop(guard);
        assert!(!registry.is_running(id));
        assert!(registry.claim(id).is_ok());
    }
}

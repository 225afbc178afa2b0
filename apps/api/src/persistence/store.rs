use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::content::Document;
use crate::errors::AppError;
use crate::templates::Template;

/// Listing entry for the document index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub title: String,
    pub template: Template,
    pub version: u32,
    pub block_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title.clone(),
            template: doc.template,
            version: doc.version,
            block_count: doc.content.blocks.len(),
            updated_at: doc.updated_at,
        }
    }
}

/// Durable home of documents. One record per one-pager holds content, layout
/// parameters, template, full version history and timestamps; deleting it deletes
/// the history with it.
///
/// `save` is last-write-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, document: &Document) -> Result<(), AppError>;
    async fn save(&self, document: &Document) -> Result<(), AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError>;
    async fn list(&self) -> Result<Vec<DocumentSummary>, AppError>;
    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Loads a document or fails with `NotFound`.
pub async fn load(store: &dyn DocumentStore, id: Uuid) -> Result<Document, AppError> {
    store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("One-pager {id} not found")))
}

/// In-process store used by tests and local runs without Postgres.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<Uuid, Document>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes every subsequent write fail with a persistence error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::Persistence("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, document: &Document) -> Result<(), AppError> {
        self.check_available()?;
        let mut docs = self.documents.write().await;
        if docs.contains_key(&document.id) {
            return Err(AppError::Conflict(format!(
                "One-pager {} already exists",
                document.id
            )));
        }
        docs.insert(document.id, document.clone());
        Ok(())
    }

    async fn save(&self, document: &Document) -> Result<(), AppError> {
        self.check_available()?;
        self.documents
            .write()
            .await
            .insert(document.id, document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>, AppError> {
        let docs = self.documents.read().await;
        let mut out: Vec<DocumentSummary> = docs.values().map(DocumentSummary::from).collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self.documents.write().await.remove(&id).is_some())
    }
}

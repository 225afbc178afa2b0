//! One editing session over one document.
//!
//! The session is the single writer of its [`Document`]. Every local operation is
//! synchronous; the three kinds of network work are handed out as pending values
//! that the caller drives and hands back:
//!
//! - persistence runs in the autosave worker, fed after every edit;
//! - AI iteration is a [`PendingIteration`] (at most one per session);
//! - styled rendering is a [`PendingFetch`], collected with [`EditorSession::take_fetch`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::content::{BlockPatch, ContentBlock, Document, DocumentContent};
use crate::editor::autosave::{AutosaveHandle, SaveStatus};
use crate::editor::mutations;
use crate::errors::{AppError, ValidationError};
use crate::generation::{apply_iteration, GenerationBackend};
use crate::history;
use crate::layout::{scale, LayoutParameters, ScalingTokens};
use crate::render::{
    editor_view, fetch_styled, render_wireframe, EditorView, FetchOutcome, MarkupCache,
    ModeEffect, RenderController, RenderMode, StyledTicket, TemplateEngine,
};
use crate::templates::{AssignmentMemo, SlotAssignment, Template};

/// Blocking, dismissible notification shown after a failed AI call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationNotice {
    pub message: String,
}

/// An AI iteration that has been admitted but not yet run.
pub struct PendingIteration {
    backend: Arc<dyn GenerationBackend>,
    document: Document,
    feedback: String,
}

pub struct IterationResult {
    feedback: String,
    outcome: Result<DocumentContent, AppError>,
}

impl PendingIteration {
    pub async fn run(self) -> IterationResult {
        let outcome = self.backend.iterate(&self.document, &self.feedback).await;
        IterationResult {
            feedback: self.feedback,
            outcome,
        }
    }
}

/// A styled-mode fetch issued by the render controller.
pub struct PendingFetch {
    engine: Arc<dyn TemplateEngine>,
    cache: Arc<dyn MarkupCache>,
    document: Document,
    ticket: StyledTicket,
}

pub struct FetchResult {
    ticket: StyledTicket,
    outcome: Result<String, AppError>,
}

impl PendingFetch {
    pub fn ticket(&self) -> &StyledTicket {
        &self.ticket
    }

    pub async fn run(self) -> FetchResult {
        let outcome = fetch_styled(
            &*self.engine,
            &*self.cache,
            &self.document,
            self.ticket.key.template,
        )
        .await;
        FetchResult {
            ticket: self.ticket,
            outcome,
        }
    }
}

pub struct EditorSession {
    document: Document,
    controller: RenderController,
    memo: AssignmentMemo,
    autosave: AutosaveHandle,
    backend: Arc<dyn GenerationBackend>,
    engine: Arc<dyn TemplateEngine>,
    cache: Arc<dyn MarkupCache>,
    iteration_in_flight: bool,
    pending_fetch: Option<PendingFetch>,
    notice: Option<GenerationNotice>,
}

impl EditorSession {
    pub fn new(
        document: Document,
        autosave: AutosaveHandle,
        backend: Arc<dyn GenerationBackend>,
        engine: Arc<dyn TemplateEngine>,
        cache: Arc<dyn MarkupCache>,
    ) -> Self {
        Self {
            document,
            controller: RenderController::new(),
            memo: AssignmentMemo::default(),
            autosave,
            backend,
            engine,
            cache,
            iteration_in_flight: false,
            pending_fetch: None,
            notice: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    pub fn notice(&self) -> Option<&GenerationNotice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn is_iterating(&self) -> bool {
        self.iteration_in_flight
    }

    // ── local edits ─────────────────────────────────────────────────────────

    pub fn insert_block(&mut self, block: ContentBlock) -> Result<(), ValidationError> {
        mutations::insert(&mut self.document, block)?;
        self.after_edit();
        Ok(())
    }

    pub fn update_block(&mut self, block_id: &str, patch: &BlockPatch) -> Result<(), ValidationError> {
        mutations::update(&mut self.document, block_id, patch)?;
        self.after_edit();
        Ok(())
    }

    pub fn delete_block(&mut self, block_id: &str) -> Result<ContentBlock, ValidationError> {
        let removed = mutations::delete(&mut self.document, block_id)?;
        self.after_edit();
        Ok(removed)
    }

    pub fn reorder(&mut self, ordered_ids: &[String]) -> Result<(), ValidationError> {
        let revision = self.document.revision();
        mutations::reorder(&mut self.document, ordered_ids)?;
        if self.document.revision() != revision {
            self.after_edit();
        }
        Ok(())
    }

    pub fn move_block(&mut self, block_id: &str, to: usize) -> Result<(), ValidationError> {
        let revision = self.document.revision();
        mutations::move_to(&mut self.document, block_id, to)?;
        if self.document.revision() != revision {
            self.after_edit();
        }
        Ok(())
    }

    pub fn set_template(&mut self, template: Template) {
        if self.document.template == template {
            return;
        }
        self.document.template = template;
        self.document.mark_edited();
        self.after_edit();
    }

    /// Applies new layout parameters, snapshotting the previous state.
    pub fn apply_layout(&mut self, params: LayoutParameters) -> Result<u32, ValidationError> {
        let version = history::apply_layout(&mut self.document, params, None)?;
        self.after_edit();
        Ok(version)
    }

    pub fn create_snapshot(&mut self, description: Option<&str>) -> u32 {
        let version = history::create_snapshot(&mut self.document, Some(history::describe(description)));
        self.after_edit();
        version
    }

    pub fn restore(&mut self, version: u32) -> Result<(), ValidationError> {
        history::restore(&mut self.document, version)?;
        self.after_edit();
        Ok(())
    }

    fn after_edit(&mut self) {
        self.autosave.changed(&self.document);
        let effect = self.controller.document_changed(&self.document);
        self.queue_fetch(effect);
    }

    /// Writes any pending change now.
    pub async fn flush(&self) -> Result<(), AppError> {
        self.autosave.flush().await
    }

    // ── rendering ───────────────────────────────────────────────────────────

    pub fn mode(&self) -> RenderMode {
        self.controller.mode()
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        let effect = self.controller.set_mode(mode, &self.document);
        self.queue_fetch(effect);
    }

    fn queue_fetch(&mut self, effect: ModeEffect) {
        match effect {
            ModeEffect::Fetch(ticket) => {
                debug!(document_id = %self.document.id, "styled fetch queued");
                self.pending_fetch = Some(PendingFetch {
                    engine: self.engine.clone(),
                    cache: self.cache.clone(),
                    document: self.document.clone(),
                    ticket,
                });
            }
            ModeEffect::Cached => self.pending_fetch = None,
            ModeEffect::Local | ModeEffect::AwaitingFetch => {}
        }
    }

    /// The styled fetch the caller should run, if one was issued since the last call.
    pub fn take_fetch(&mut self) -> Option<PendingFetch> {
        self.pending_fetch.take()
    }

    pub fn complete_fetch(&mut self, result: FetchResult) -> Result<FetchOutcome, AppError> {
        self.controller.complete_fetch(result.ticket, result.outcome)
    }

    pub fn styled_markup(&self) -> Option<&str> {
        self.controller.styled_markup()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn slot_assignment(&mut self, template: Option<Template>) -> &SlotAssignment {
        let template = template.unwrap_or(self.document.template);
        self.memo.get(&self.document, template)
    }

    pub fn tokens(&self) -> ScalingTokens {
        scale(&self.document.layout_params)
    }

    pub fn wireframe(&mut self) -> String {
        let assignment = self.memo.get(&self.document, self.document.template);
        render_wireframe(&self.document, assignment)
    }

    pub fn editor_view(&self) -> EditorView<'_> {
        editor_view(&self.document)
    }

    // ── AI iteration ────────────────────────────────────────────────────────

    /// Admits an AI iteration. Rejected while another is in flight. Any pending
    /// autosave write is flushed first so the backend never sees stale content.
    pub async fn start_iteration(&mut self, feedback: &str) -> Result<PendingIteration, AppError> {
        if self.iteration_in_flight {
            return Err(AppError::Conflict(format!(
                "An AI iteration for one-pager {} is already in progress",
                self.document.id
            )));
        }
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(ValidationError::Message("feedback must not be empty".to_string()).into());
        }

        self.autosave.flush().await?;
        self.iteration_in_flight = true;
        Ok(PendingIteration {
            backend: self.backend.clone(),
            document: self.document.clone(),
            feedback: feedback.to_string(),
        })
    }

    /// Applies the iteration result. A failure raises the notice and changes nothing.
    pub fn finish_iteration(&mut self, result: IterationResult) -> Result<u32, AppError> {
        self.iteration_in_flight = false;
        match result.outcome {
            Ok(content) => {
                let version = apply_iteration(&mut self.document, &result.feedback, content);
                self.after_edit();
                Ok(version)
            }
            Err(e) => {
                warn!(document_id = %self.document.id, "AI iteration failed: {e}");
                self.notice = Some(GenerationNotice {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Flushes and hands the document back, e.g. when the editor closes.
    pub async fn close(self) -> Result<Document, AppError> {
        self.autosave.flush().await?;
        info!(document_id = %self.document.id, "editing session closed");
        Ok(self.document)
    }
}

//! Render-Mode Controller.
//!
//! Three modes over the same document: `Edit` and `Wireframe` render synchronously
//! from local state; `Styled` displays markup fetched from the external template
//! engine. Transitions are unconditional. The controller never performs I/O itself:
//! entering `Styled` hands back a [`StyledTicket`] and the caller completes it with
//! [`RenderController::complete_fetch`] whenever the network answers.
//!
//! A fetch result is displayed only if the controller is still in `Styled` mode and
//! still waiting for the same `(document, template, updated_at)` key. Anything else
//! is stale: it goes into the local cache for a later re-entry and is otherwise ignored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::content::Document;
use crate::errors::AppError;
use crate::templates::Template;

const MAX_CACHED_MARKUP: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Edit,
    Wireframe,
    Styled,
}

/// Identity of one styled rendering. Any edit advances `updated_at` and so changes the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StyledKey {
    pub document_id: Uuid,
    pub template: Template,
    pub updated_at: DateTime<Utc>,
}

impl StyledKey {
    pub fn for_document(document: &Document) -> Self {
        Self::new(document, document.template)
    }

    pub fn new(document: &Document, template: Template) -> Self {
        Self {
            document_id: document.id,
            template,
            updated_at: document.updated_at,
        }
    }

    /// Redis key for the shared styled-markup cache.
    pub fn cache_key(&self) -> String {
        format!(
            "styled:{}:{}:{}",
            self.document_id,
            self.template,
            self.updated_at.timestamp_micros()
        )
    }
}

/// An outstanding styled fetch. Hand it back with the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledTicket {
    pub key: StyledKey,
    seq: u64,
}

/// What the caller must do after a mode change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeEffect {
    /// Render from local state; nothing to fetch.
    Local,
    /// Cached markup for the current key is already on display.
    Cached,
    /// Issue this fetch.
    Fetch(StyledTicket),
    /// A fetch for the current key is already in flight.
    AwaitingFetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Displayed,
    Discarded,
}

#[derive(Debug, Default)]
pub struct RenderController {
    mode: RenderMode,
    pending: Option<StyledTicket>,
    displayed: Option<StyledKey>,
    last_error: Option<String>,
    cache: HashMap<StyledKey, String>,
    next_seq: u64,
}

impl RenderController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Switches mode. Leaving `Styled` does not cancel an in-flight fetch; its
    /// result will simply be cached instead of displayed.
    pub fn set_mode(&mut self, mode: RenderMode, document: &Document) -> ModeEffect {
        self.mode = mode;
        match mode {
            RenderMode::Edit | RenderMode::Wireframe => {
                self.pending = None;
                ModeEffect::Local
            }
            RenderMode::Styled => self.request_styled(document),
        }
    }

    /// Re-evaluates the styled key after the document changed. Outside styled mode
    /// nothing happens until the user switches back.
    pub fn document_changed(&mut self, document: &Document) -> ModeEffect {
        match self.mode {
            RenderMode::Styled => self.request_styled(document),
            _ => ModeEffect::Local,
        }
    }

    fn request_styled(&mut self, document: &Document) -> ModeEffect {
        let key = StyledKey::for_document(document);
        self.last_error = None;

        if self.cache.contains_key(&key) {
            debug!(document_id = %key.document_id, template = %key.template, "styled markup served from local cache");
            self.pending = None;
            self.displayed = Some(key);
            return ModeEffect::Cached;
        }

        self.displayed = None;
        if self.pending.as_ref().is_some_and(|t| t.key == key) {
            return ModeEffect::AwaitingFetch;
        }

        self.next_seq += 1;
        let ticket = StyledTicket {
            key,
            seq: self.next_seq,
        };
        self.pending = Some(ticket.clone());
        ModeEffect::Fetch(ticket)
    }

    fn accepts(&self, ticket: &StyledTicket) -> bool {
        self.mode == RenderMode::Styled
            && self.pending.as_ref().is_some_and(|p| p.key == ticket.key)
    }

    /// Delivers a fetch result. Successful markup is always cached; it is displayed
    /// only if nothing newer superseded the ticket.
    ///
    /// Returns `Err` only for a failure of the fetch the user is currently waiting on.
    pub fn complete_fetch(
        &mut self,
        ticket: StyledTicket,
        result: Result<String, AppError>,
    ) -> Result<FetchOutcome, AppError> {
        let accepted = self.accepts(&ticket);

        match result {
            Ok(markup) => {
                self.insert_cached(ticket.key.clone(), markup);
                if accepted {
                    self.pending = None;
                    self.displayed = Some(ticket.key);
                    Ok(FetchOutcome::Displayed)
                } else {
                    debug!(seq = ticket.seq, "discarding stale styled fetch");
                    Ok(FetchOutcome::Discarded)
                }
            }
            Err(e) if accepted => {
                self.pending = None;
                self.last_error = Some(e.to_string());
                Err(e)
            }
            Err(e) => {
                debug!(seq = ticket.seq, error = %e, "ignoring failure of stale styled fetch");
                Ok(FetchOutcome::Discarded)
            }
        }
    }

    /// Markup on display, if the controller is in styled mode and has it.
    pub fn styled_markup(&self) -> Option<&str> {
        if self.mode != RenderMode::Styled {
            return None;
        }
        self.displayed
            .as_ref()
            .and_then(|k| self.cache.get(k))
            .map(String::as_str)
    }

    pub fn is_loading(&self) -> bool {
        self.mode == RenderMode::Styled && self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn insert_cached(&mut self, key: StyledKey, markup: String) {
        if !self.cache.contains_key(&key) && self.cache.len() >= MAX_CACHED_MARKUP {
            // Evict the oldest rendering that is not on display.
            let displayed = self.displayed.clone();
            let oldest = self
                .cache
                .keys()
                .filter(|k| Some(*k) != displayed.as_ref())
                .min_by_key(|k| k.updated_at)
                .cloned();
            if let Some(oldest) = oldest {
                self.cache.remove(&oldest);
            }
        }
        self.cache.insert(key, markup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::DocumentContent;

    fn make_document() -> Document {
        Document::new("Doc", DocumentContent::new("Headline"), "test-model")
    }

    fn expect_ticket(effect: ModeEffect) -> StyledTicket {
        match effect {
            ModeEffect::Fetch(ticket) => ticket,
            other => panic!("expected a fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_local_modes_need_no_fetch() {
        let doc = make_document();
        let mut ctl = RenderController::new();
        assert_eq!(ctl.set_mode(RenderMode::Wireframe, &doc), ModeEffect::Local);
        assert_eq!(ctl.set_mode(RenderMode::Edit, &doc), ModeEffect::Local);
        assert_eq!(ctl.mode(), RenderMode::Edit);
    }

    #[test]
    fn test_styled_fetch_is_displayed() {
        let doc = make_document();
        let mut ctl = RenderController::new();
        let ticket = expect_ticket(ctl.set_mode(RenderMode::Styled, &doc));
        assert!(ctl.is_loading());

        let outcome = ctl.complete_fetch(ticket, Ok("<html/>".to_string())).unwrap();
        assert_eq!(outcome, FetchOutcome::Displayed);
        assert_eq!(ctl.styled_markup(), Some("<html/>"));
        assert!(!ctl.is_loading());
    }

    #[test]
    fn test_fetch_superseded_by_edit_is_discarded() {
        let mut doc = make_document();
        let mut ctl = RenderController::new();
        let old = expect_ticket(ctl.set_mode(RenderMode::Styled, &doc));

        doc.updated_at += chrono::Duration::seconds(1);
        let new = expect_ticket(ctl.document_changed(&doc));

        let outcome = ctl.complete_fetch(old, Ok("old".to_string())).unwrap();
        assert_eq!(outcome, FetchOutcome::Discarded);
        assert_eq!(ctl.styled_markup(), None);

        ctl.complete_fetch(new, Ok("new".to_string())).unwrap();
        assert_eq!(ctl.styled_markup(), Some("new"));
    }

    #[test]
    fn test_leaving_styled_ignores_response_but_caches_it() {
        let doc = make_document();
        let mut ctl = RenderController::new();
        let ticket = expect_ticket(ctl.set_mode(RenderMode::Styled, &doc));
        ctl.set_mode(RenderMode::Wireframe, &doc);

        let outcome = ctl.complete_fetch(ticket, Ok("cached".to_string())).unwrap();
        assert_eq!(outcome, FetchOutcome::Discarded);
        assert_eq!(ctl.styled_markup(), None);

        // Re-entry with the same key uses the cached response without a new fetch.
        assert_eq!(ctl.set_mode(RenderMode::Styled, &doc), ModeEffect::Cached);
        assert_eq!(ctl.styled_markup(), Some("cached"));
    }

    #[test]
    fn test_reentry_while_fetch_in_flight_accepts_original_ticket() {
        let doc = make_document();
        let mut ctl = RenderController::new();
        let first = expect_ticket(ctl.set_mode(RenderMode::Styled, &doc));
        ctl.set_mode(RenderMode::Edit, &doc);
        let second = expect_ticket(ctl.set_mode(RenderMode::Styled, &doc));
        assert_eq!(first.key, second.key);

        // Whichever answer arrives first for the same key is displayed.
        let outcome = ctl.complete_fetch(first, Ok("m".to_string())).unwrap();
        assert_eq!(outcome, FetchOutcome::Displayed);
    }

    #[test]
    fn test_stale_failure_is_silent() {
        let mut doc = make_document();
        let mut ctl = RenderController::new();
        let old = expect_ticket(ctl.set_mode(RenderMode::Styled, &doc));
        doc.updated_at += chrono::Duration::seconds(1);
        ctl.document_changed(&doc);

        let outcome = ctl
            .complete_fetch(old, Err(AppError::TemplateEngine("boom".into())))
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Discarded);
        assert!(ctl.last_error().is_none());
    }

    #[test]
    fn test_current_failure_is_reported() {
        let doc = make_document();
        let mut ctl = RenderController::new();
        let ticket = expect_ticket(ctl.set_mode(RenderMode::Styled, &doc));
        let err = ctl
            .complete_fetch(ticket, Err(AppError::TemplateEngine("boom".into())))
            .unwrap_err();
        assert!(matches!(err, AppError::TemplateEngine(_)));
        assert!(ctl.last_error().is_some());
    }

    #[test]
    fn test_cache_key_format() {
        let doc = make_document();
        let key = StyledKey::for_document(&doc);
        let expected = format!(
            "styled:{}:minimalist:{}",
            doc.id,
            doc.updated_at.timestamp_micros()
        );
        assert_eq!(key.cache_key(), expected);
    }

    #[test]
    fn test_cache_is_bounded() {
        let mut doc = make_document();
        let mut ctl = RenderController::new();
        for _ in 0..(MAX_CACHED_MARKUP + 4) {
            doc.updated_at += chrono::Duration::seconds(1);
            let ticket = expect_ticket(ctl.set_mode(RenderMode::Styled, &doc));
            ctl.complete_fetch(ticket, Ok("x".to_string())).unwrap();
        }
        assert!(ctl.cache.len() <= MAX_CACHED_MARKUP);
        assert_eq!(ctl.styled_markup(), Some("x"));
    }
}

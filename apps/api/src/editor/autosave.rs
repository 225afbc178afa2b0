//! Debounced autosave.
//!
//! [`Debounce`] is the pure state machine `Idle -> PendingWrite -> Writing ->
//! Idle | Error` with an explicit `flush`. It owns no timers: callers pass `now`
//! and ask for the next deadline. [`spawn_autosave`] drives it with `tokio::time`
//! against a [`DocumentStore`], always writing the latest document it was given.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::content::Document;
use crate::errors::AppError;
use crate::persistence::DocumentStore;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveState {
    Idle,
    PendingWrite { due: Instant },
    /// `dirty` is set when an edit lands while the write is in flight.
    Writing { ticket: u64, dirty: bool },
    Error { message: String },
}

/// The status flag shown next to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Saved,
    Unsaved,
    Saving,
    Error,
}

/// Handed out when a write should start; return it to [`Debounce::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTicket(u64);

#[derive(Debug)]
pub struct Debounce {
    quiet: Duration,
    state: AutosaveState,
    next_ticket: u64,
    last_error: Option<String>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            state: AutosaveState::Idle,
            next_ticket: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> &AutosaveState {
        &self.state
    }

    /// An edit happened. Restarts the quiet period.
    pub fn mark_changed(&mut self, now: Instant) {
        self.state = match &self.state {
            AutosaveState::Writing { ticket, .. } => AutosaveState::Writing {
                ticket: *ticket,
                dirty: true,
            },
            _ => AutosaveState::PendingWrite {
                due: now + self.quiet,
            },
        };
    }

    /// When the pending write becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            AutosaveState::PendingWrite { due } => Some(due),
            _ => None,
        }
    }

    /// Starts the write once the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<WriteTicket> {
        match self.state {
            AutosaveState::PendingWrite { due } if now >= due => Some(self.begin_write()),
            _ => None,
        }
    }

    /// Starts the pending write immediately. An errored state retries.
    /// Nothing to do when idle or already writing.
    pub fn flush(&mut self) -> Option<WriteTicket> {
        match self.state {
            AutosaveState::PendingWrite { .. } | AutosaveState::Error { .. } => {
                Some(self.begin_write())
            }
            _ => None,
        }
    }

    fn begin_write(&mut self) -> WriteTicket {
        self.next_ticket += 1;
        self.state = AutosaveState::Writing {
            ticket: self.next_ticket,
            dirty: false,
        };
        WriteTicket(self.next_ticket)
    }

    /// Records the result of a write. Tickets that are not current are ignored.
    pub fn complete(&mut self, ticket: WriteTicket, result: Result<(), String>, now: Instant) {
        let dirty = match self.state {
            AutosaveState::Writing { ticket: current, dirty } if current == ticket.0 => dirty,
            _ => return,
        };
        self.state = match result {
            Ok(()) => {
                self.last_error = None;
                if dirty {
                    AutosaveState::PendingWrite {
                        due: now + self.quiet,
                    }
                } else {
                    AutosaveState::Idle
                }
            }
            Err(message) => {
                self.last_error = Some(message.clone());
                if dirty {
                    AutosaveState::PendingWrite {
                        due: now + self.quiet,
                    }
                } else {
                    AutosaveState::Error { message }
                }
            }
        };
    }

    /// Errors stay visible until a write succeeds.
    pub fn status(&self) -> SaveStatus {
        match (&self.state, &self.last_error) {
            (AutosaveState::Writing { .. }, _) => SaveStatus::Saving,
            (_, Some(_)) | (AutosaveState::Error { .. }, _) => SaveStatus::Error,
            (AutosaveState::PendingWrite { .. }, None) => SaveStatus::Unsaved,
            (AutosaveState::Idle, None) => SaveStatus::Saved,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Worker
// ────────────────────────────────────────────────────────────────────────────

enum Command {
    Changed(Box<Document>),
    Flush(oneshot::Sender<Result<(), AppError>>),
}

/// Client side of a running autosave worker. Dropping every handle flushes and stops it.
#[derive(Clone)]
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
}

impl AutosaveHandle {
    /// Queues the latest document state; the write happens after the quiet period.
    pub fn changed(&self, document: &Document) {
        if self.tx.send(Command::Changed(Box::new(document.clone()))).is_err() {
            warn!(document_id = %document.id, "autosave worker is gone; edit not queued");
        }
    }

    /// Writes any pending change now and waits for the result.
    pub async fn flush(&self) -> Result<(), AppError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply))
            .map_err(|_| AppError::Persistence("autosave worker stopped".to_string()))?;
        rx.await
            .map_err(|_| AppError::Persistence("autosave worker stopped".to_string()))?
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }
}

async fn write(
    store: &dyn DocumentStore,
    machine: &mut Debounce,
    ticket: WriteTicket,
    latest: Option<&Document>,
) -> Result<(), AppError> {
    let result = match latest {
        Some(doc) => store.save(doc).await,
        None => Ok(()),
    };
    let flag = result.as_ref().map(|_| ()).map_err(|e| e.to_string());
    if let Err(message) = &flag {
        warn!("autosave write failed: {message}");
    } else {
        debug!("autosave write completed");
    }
    machine.complete(ticket, flag, Instant::now());
    result.map_err(|e| match e {
        AppError::Persistence(msg) => AppError::Persistence(msg),
        other => AppError::Persistence(other.to_string()),
    })
}

/// Spawns the autosave worker for one editing session.
pub fn spawn_autosave(
    store: Arc<dyn DocumentStore>,
    quiet: Duration,
) -> (AutosaveHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
    let (status_tx, status_rx) = watch::channel(SaveStatus::Saved);

    let task = tokio::spawn(async move {
        let mut machine = Debounce::new(quiet);
        let mut latest: Option<Document> = None;

        loop {
            let deadline = machine.next_deadline();
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Changed(doc)) => {
                        latest = Some(*doc);
                        machine.mark_changed(Instant::now());
                    }
                    Some(Command::Flush(reply)) => {
                        let result = match machine.flush() {
                            Some(ticket) => write(&*store, &mut machine, ticket, latest.as_ref()).await,
                            None => Ok(()),
                        };
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Some(ticket) = machine.flush() {
                            let _ = write(&*store, &mut machine, ticket, latest.as_ref()).await;
                        }
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(ticket) = machine.poll(Instant::now()) {
                        let _ = write(&*store, &mut machine, ticket, latest.as_ref()).await;
                    }
                }
            }
            status_tx.send_replace(machine.status());
        }
        debug!("autosave worker stopped");
    });

    (
        AutosaveHandle {
            tx,
            status: status_rx,
        },
        task,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::DocumentContent;
    use crate::persistence::MemoryDocumentStore;

    const QUIET: Duration = Duration::from_millis(2000);

    fn make_document() -> Document {
        Document::new("Doc", DocumentContent::new("Headline"), "test-model")
    }

    #[test]
    fn test_three_edits_in_window_make_one_write() {
        let start = Instant::now();
        let mut m = Debounce::new(QUIET);
        m.mark_changed(start);
        m.mark_changed(start + Duration::from_millis(500));
        m.mark_changed(start + Duration::from_millis(1500));

        assert_eq!(m.poll(start + Duration::from_millis(3000)), None);
        let ticket = m.poll(start + Duration::from_millis(3500)).unwrap();
        assert_eq!(m.status(), SaveStatus::Saving);
        assert_eq!(m.poll(start + Duration::from_millis(9000)), None);

        m.complete(ticket, Ok(()), start + Duration::from_millis(3600));
        assert_eq!(m.state(), &AutosaveState::Idle);
        assert_eq!(m.status(), SaveStatus::Saved);
    }

    #[test]
    fn test_flush_skips_quiet_period() {
        let now = Instant::now();
        let mut m = Debounce::new(QUIET);
        assert_eq!(m.flush(), None);
        m.mark_changed(now);
        assert!(m.flush().is_some());
    }

    #[test]
    fn test_edit_during_write_schedules_another() {
        let now = Instant::now();
        let mut m = Debounce::new(QUIET);
        m.mark_changed(now);
        let ticket = m.flush().unwrap();
        m.mark_changed(now);
        m.complete(ticket, Ok(()), now);
        assert_eq!(m.next_deadline(), Some(now + QUIET));
        assert_eq!(m.status(), SaveStatus::Unsaved);
    }

    #[test]
    fn test_failure_sets_error_until_next_success() {
        let now = Instant::now();
        let mut m = Debounce::new(QUIET);
        m.mark_changed(now);
        let ticket = m.flush().unwrap();
        m.complete(ticket, Err("down".into()), now);
        assert_eq!(m.status(), SaveStatus::Error);
        assert_eq!(m.last_error(), Some("down"));

        m.mark_changed(now);
        assert_eq!(m.status(), SaveStatus::Error);
        let ticket = m.poll(now + QUIET).unwrap();
        m.complete(ticket, Ok(()), now + QUIET);
        assert_eq!(m.status(), SaveStatus::Saved);
        assert_eq!(m.last_error(), None);
    }

    #[test]
    fn test_stale_ticket_ignored() {
        let now = Instant::now();
        let mut m = Debounce::new(QUIET);
        m.mark_changed(now);
        let ticket = m.flush().unwrap();
        m.complete(WriteTicket(ticket.0 + 7), Ok(()), now);
        assert!(matches!(m.state(), AutosaveState::Writing { .. }));
    }

    #[tokio::test]
    async fn test_worker_coalesces_edits_into_one_write() {
        tokio::time::pause();
        let store = Arc::new(MemoryDocumentStore::new());
        let (handle, _task) = spawn_autosave(store.clone(), QUIET);

        let mut doc = make_document();
        for title in ["one", "two", "three"] {
            doc.title = title.to_string();
            handle.changed(&doc);
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(store.save_count(), 0);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(store.save_count(), 1);
        let saved = store.get(doc.id).await.unwrap().unwrap();
        assert_eq!(saved.title, "three");
        assert_eq!(handle.status(), SaveStatus::Saved);
    }

    #[tokio::test]
    async fn test_worker_flush_writes_immediately() {
        tokio::time::pause();
        let store = Arc::new(MemoryDocumentStore::new());
        let (handle, _task) = spawn_autosave(store.clone(), QUIET);

        let doc = make_document();
        handle.changed(&doc);
        handle.flush().await.unwrap();
        assert_eq!(store.save_count(), 1);

        // Nothing pending: a second flush writes nothing.
        handle.flush().await.unwrap();
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_worker_surfaces_failure_and_keeps_edit() {
        tokio::time::pause();
        let store = Arc::new(MemoryDocumentStore::new());
        store.set_failing(true);
        let (handle, _task) = spawn_autosave(store.clone(), QUIET);

        let doc = make_document();
        handle.changed(&doc);
        let err = handle.flush().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(handle.status(), SaveStatus::Error);

        store.set_failing(false);
        handle.flush().await.unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(handle.status(), SaveStatus::Saved);
    }
}

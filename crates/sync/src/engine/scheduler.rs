// Debounced writes for the open document.
//
// A burst of edits collapses into one `update` issued once the debounce
// window passes with no further edits. At most one write is in flight:
// edits that arrive meanwhile are held and start a fresh debounce cycle when
// the write resolves, whatever its outcome. `flush_now` skips the window.
// Failed writes are not retried; the next edit's cycle supersedes them.

use std::sync::Arc;
use std::time::Duration;

use canvas_common::types::{Document, DocumentDraft, DocumentId};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::timer::ScheduledTask;
use super::{EditPhase, EngineEvent, SessionTag};
use crate::store::{DocumentStore, StoreError};

/// Default debounce window.
pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;

struct InFlightSave {
    save_id: u64,
    draft: DocumentDraft,
    handle: JoinHandle<Result<Document, StoreError>>,
}

pub struct SaveScheduler<S: DocumentStore> {
    tag: SessionTag,
    delay: Duration,
    store: Arc<S>,
    events: UnboundedSender<EngineEvent>,
    timer: Option<ScheduledTask>,
    /// Bumped on every arm/disarm so a timer that already posted its message
    /// before being cancelled is recognized as stale.
    generation: u64,
    pending: Option<DocumentDraft>,
    flush_requested: bool,
    in_flight: Option<InFlightSave>,
    next_save_id: u64,
}

impl<S: DocumentStore> SaveScheduler<S> {
    pub(crate) fn new(
        tag: SessionTag,
        delay: Duration,
        store: Arc<S>,
        events: UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            tag,
            delay,
            store,
            events,
            timer: None,
            generation: 0,
            pending: None,
            flush_requested: false,
            in_flight: None,
            next_save_id: 0,
        }
    }

    pub fn doc_id(&self) -> &DocumentId {
        &self.tag.doc_id
    }

    pub fn phase(&self) -> EditPhase {
        if self.pending.is_some() {
            EditPhase::Dirty
        } else if self.in_flight.is_some() {
            EditPhase::Saving
        } else {
            EditPhase::Clean
        }
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Content of the write currently in flight, if any.
    pub fn in_flight_content(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|save| save.draft.content.as_str())
    }

    /// Record the latest edit and restart the debounce window.
    pub fn notify_edit(&mut self, draft: DocumentDraft) {
        self.pending = Some(draft);
        // A typed edit supersedes an earlier flush request.
        self.flush_requested = false;
        if self.in_flight.is_some() {
            // Held until the in-flight write resolves.
            return;
        }
        self.arm();
    }

    /// Cancel the window and write `draft` now, or right after the in-flight
    /// write resolves.
    pub fn flush_now(&mut self, draft: DocumentDraft) {
        self.disarm();
        self.pending = Some(draft);
        if self.in_flight.is_some() {
            self.flush_requested = true;
            return;
        }
        self.start_pending();
    }

    /// Handle a debounce timer message. Returns true if a write was issued.
    pub(crate) fn debounce_elapsed(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.timer.is_none() {
            debug!(doc_id = %self.tag.doc_id, generation, "ignoring stale debounce timer");
            return false;
        }
        self.timer = None;
        self.start_pending()
    }

    /// Clear the in-flight slot if `save_id` names it. Returns the draft that
    /// was written. Call `resume` afterwards to start any held cycle.
    pub(crate) fn complete(&mut self, save_id: u64) -> Option<DocumentDraft> {
        match &self.in_flight {
            Some(save) if save.save_id == save_id => {}
            _ => return None,
        }
        self.in_flight.take().map(|save| save.draft)
    }

    /// Wait for the in-flight write to land while keeping any held edit.
    /// The slot stays occupied; pass the result through `complete`.
    pub(crate) async fn settle(&mut self) -> Option<(u64, Result<Document, StoreError>)> {
        let save = self.in_flight.as_mut()?;
        let outcome = (&mut save.handle).await.ok()?;
        Some((save.save_id, outcome))
    }

    /// Start whatever was held behind the last write.
    pub fn resume(&mut self) {
        if self.in_flight.is_some() || self.pending.is_none() {
            return;
        }
        if self.flush_requested {
            self.start_pending();
        } else {
            self.arm();
        }
    }

    /// Drop any buffered edit and cancel the window. Returns true if an edit
    /// was discarded. An in-flight write cannot be recalled.
    pub fn discard_pending(&mut self) -> bool {
        self.disarm();
        self.flush_requested = false;
        self.pending.take().is_some()
    }

    /// Stop scheduling, wait for the in-flight write to land, then write any
    /// held edit directly. Returns the outcome of the last write, if any.
    pub async fn shutdown(mut self) -> Option<Result<Document, StoreError>> {
        self.disarm();
        let mut outcome = None;
        if let Some(save) = self.in_flight.take() {
            outcome = save.handle.await.ok();
        }
        match self.pending.take() {
            Some(draft) => Some(self.store.update(&self.tag.doc_id, &draft).await),
            None => outcome,
        }
    }

    fn arm(&mut self) {
        self.disarm();
        let generation = self.generation;
        let tag = self.tag.clone();
        let events = self.events.clone();
        self.timer = Some(ScheduledTask::after(self.delay, move || {
            let _ = events.send(EngineEvent::DebounceElapsed { tag, generation });
        }));
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    fn start_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(draft) => {
                self.start_save(draft);
                true
            }
            None => false,
        }
    }

    fn start_save(&mut self, draft: DocumentDraft) {
        self.flush_requested = false;
        self.next_save_id += 1;
        let save_id = self.next_save_id;
        let tag = self.tag.clone();
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let body = draft.clone();
        debug!(doc_id = %tag.doc_id, save_id, "issuing write");
        let handle = tokio::spawn(async move {
            let result = store.update(&tag.doc_id, &body).await;
            let _ = events.send(EngineEvent::SaveFinished { tag, save_id, result: result.clone() });
            result
        });
        self.in_flight = Some(InFlightSave { save_id, draft, handle });
    }
}

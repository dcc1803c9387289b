// Periodic fetch of the open document.
//
// Ticks are driven by a `ScheduledTask`; each tick spawns one `get` whose
// result is posted back to the controller. A tick that fires while the
// previous fetch is still outstanding is skipped, so fetches never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::timer::ScheduledTask;
use super::{EngineEvent, SessionTag};
use crate::store::DocumentStore;

/// Default poll period.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

pub struct ActivePoller<S: DocumentStore> {
    store: Arc<S>,
    events: UnboundedSender<EngineEvent>,
    session: Option<SessionTag>,
    ticker: Option<ScheduledTask>,
    fetch: Option<JoinHandle<()>>,
    skipped_ticks: u64,
}

impl<S: DocumentStore> ActivePoller<S> {
    pub(crate) fn new(store: Arc<S>, events: UnboundedSender<EngineEvent>) -> Self {
        Self { store, events, session: None, ticker: None, fetch: None, skipped_ticks: 0 }
    }

    /// Begin polling `tag`'s document every `interval`, replacing any
    /// previous target.
    pub fn start(&mut self, tag: SessionTag, interval: Duration) {
        self.stop();
        let events = self.events.clone();
        let tick_tag = tag.clone();
        self.ticker = Some(ScheduledTask::every(interval, move || {
            let _ = events.send(EngineEvent::PollTick { tag: tick_tag.clone() });
        }));
        debug!(doc_id = %tag.doc_id, interval_ms = interval.as_millis() as u64, "polling started");
        self.session = Some(tag);
    }

    /// Cancel the ticker and abandon any outstanding fetch. Idempotent.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        if let Some(fetch) = self.fetch.take() {
            fetch.abort();
        }
        if let Some(tag) = self.session.take() {
            debug!(doc_id = %tag.doc_id, "polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch.is_some()
    }

    /// Ticks dropped because a fetch was still outstanding.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    /// Handle a tick. Returns true if a fetch was issued.
    pub(crate) fn tick(&mut self, tag: &SessionTag) -> bool {
        if self.session.as_ref() != Some(tag) {
            return false;
        }
        if self.fetch.is_some() {
            self.skipped_ticks += 1;
            debug!(doc_id = %tag.doc_id, "previous poll outstanding, skipping tick");
            return false;
        }
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let tag = tag.clone();
        self.fetch = Some(tokio::spawn(async move {
            let result = store.get(&tag.doc_id).await;
            let _ = events.send(EngineEvent::PollFinished { tag, result });
        }));
        true
    }

    /// Clear the outstanding fetch. Returns false if the result belongs to a
    /// session this poller no longer serves.
    pub(crate) fn fetch_finished(&mut self, tag: &SessionTag) -> bool {
        if self.session.as_ref() != Some(tag) {
            return false;
        }
        self.fetch = None;
        true
    }
}

impl<S: DocumentStore> Drop for ActivePoller<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

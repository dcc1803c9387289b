// Sync controller: the single owner of open-document state.
//
// `SyncController::spawn` starts an actor task and returns a cloneable
// `SyncHandle`. Commands from the handle and messages from timer/network
// tasks are processed one at a time on the actor, so no locks guard the
// buffer, the scheduler, or the poller.

use std::sync::Arc;
use std::time::Duration;

use canvas_common::types::{Document, DocumentDraft, DocumentId, DocumentSummary, Version};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::buffer::LocalEditBuffer;
use super::conflict::{reconcile, Decision};
use super::poller::{ActivePoller, DEFAULT_POLL_INTERVAL_MS};
use super::scheduler::{SaveScheduler, DEFAULT_DEBOUNCE_MS};
use super::{EditPhase, EngineEvent, SessionTag};
use crate::archive::VersionArchive;
use crate::error::{StoreError, SyncError};
use crate::store::DocumentStore;

const COMMAND_BUFFER_SIZE: usize = 64;
const EVENT_BUFFER_SIZE: usize = 256;

// ── Public state ────────────────────────────────────────────────────

/// Timer settings for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    pub debounce: Duration,
    pub poll_interval: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Closed,
    Opening { doc_id: DocumentId },
    Open { doc_id: DocumentId, phase: EditPhase },
}

/// The open document as the controller currently sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenDocument {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub last_known_remote_updated_at: DateTime<Utc>,
}

/// Published on the watch channel after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    pub status: SyncStatus,
    pub document: Option<OpenDocument>,
}

impl SyncSnapshot {
    fn closed() -> Self {
        Self { status: SyncStatus::Closed, document: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// `close()` or shutdown.
    Requested,
    /// Another document was opened.
    Switched,
    /// Deleted through this controller.
    Deleted,
    /// A poll or save found the document gone.
    DeletedRemotely,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Opened { doc_id: DocumentId, updated_at: DateTime<Utc> },
    Saved { doc_id: DocumentId, updated_at: DateTime<Utc> },
    SaveFailed { doc_id: DocumentId, error: String },
    /// Local text was replaced by a newer remote copy.
    RemoteAdopted { doc_id: DocumentId, updated_at: DateTime<Utc>, discarded_local_edits: bool },
    /// A save resolved after a newer remote version had been adopted.
    StaleWrite { doc_id: DocumentId, kept_remote: bool },
    Restored { doc_id: DocumentId, index: usize },
    Closed { doc_id: DocumentId, reason: CloseReason },
}

// ── Handle ──────────────────────────────────────────────────────────

enum Command {
    Open { id: DocumentId, reply: oneshot::Sender<Result<Document, SyncError>> },
    Close { reply: oneshot::Sender<()> },
    Edit { id: DocumentId, draft: DocumentDraft, reply: oneshot::Sender<Result<(), SyncError>> },
    Flush { id: DocumentId, draft: DocumentDraft, reply: oneshot::Sender<Result<(), SyncError>> },
    Restore { id: DocumentId, index: usize, reply: oneshot::Sender<Result<(), SyncError>> },
    Delete { id: DocumentId, reply: oneshot::Sender<Result<(), SyncError>> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Cloneable entry point for UI code. Every method is a request to the
/// controller task, except the collection passthroughs, which go straight
/// to the store.
pub struct SyncHandle<S: DocumentStore> {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SyncSnapshot>,
    events: broadcast::Sender<SyncEvent>,
    store: Arc<S>,
    archive: VersionArchive<S>,
}

impl<S: DocumentStore> Clone for SyncHandle<S> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
            store: Arc::clone(&self.store),
            archive: self.archive.clone(),
        }
    }
}

impl<S: DocumentStore> SyncHandle<S> {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SyncError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(build(reply)).await.map_err(|_| SyncError::ControllerStopped)?;
        response.await.map_err(|_| SyncError::ControllerStopped)
    }

    /// Open `id`, closing (and flushing) whatever was open before. Marks the
    /// document active on the store and starts polling it.
    pub async fn open(&self, id: &DocumentId) -> Result<Document, SyncError> {
        let id = id.clone();
        self.request(|reply| Command::Open { id, reply }).await?
    }

    /// Flush pending edits (best effort), stop both timers, and close.
    pub async fn close(&self) -> Result<(), SyncError> {
        self.request(|reply| Command::Close { reply }).await
    }

    /// Record a local edit; the write follows after the debounce window.
    pub async fn notify_edit(
        &self,
        id: &DocumentId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), SyncError> {
        let id = id.clone();
        let draft = DocumentDraft::new(title, content);
        self.request(|reply| Command::Edit { id, draft, reply }).await?
    }

    /// Record a local edit and write it without waiting for the window.
    pub async fn flush_now(
        &self,
        id: &DocumentId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), SyncError> {
        let id = id.clone();
        let draft = DocumentDraft::new(title, content);
        self.request(|reply| Command::Flush { id, draft, reply }).await?
    }

    /// Load version `index` of the open document into the buffer and
    /// write it immediately. The store appends it as a new version.
    pub async fn restore(&self, id: &DocumentId, index: usize) -> Result<(), SyncError> {
        let id = id.clone();
        self.request(|reply| Command::Restore { id, index, reply }).await?
    }

    /// Version history, oldest first. Always fetched fresh.
    pub async fn versions(&self, id: &DocumentId) -> Result<Vec<Version>, SyncError> {
        Ok(self.archive.list(id).await?)
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, SyncError> {
        Ok(self.store.list().await?)
    }

    pub async fn create_document(&self, draft: &DocumentDraft) -> Result<Document, SyncError> {
        Ok(self.store.create(draft).await?)
    }

    /// Delete a document. If it is the open one it is closed first, and
    /// its unsaved edits are dropped.
    pub async fn delete_document(&self, id: &DocumentId) -> Result<(), SyncError> {
        let id = id.clone();
        self.request(|reply| Command::Delete { id, reply }).await?
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SyncSnapshot> {
        self.state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Close the open document and stop the controller task.
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

// ── Controller ──────────────────────────────────────────────────────

struct Session<S: DocumentStore> {
    tag: SessionTag,
    buffer: LocalEditBuffer,
    scheduler: SaveScheduler<S>,
    /// Timestamp of a remote copy adopted while a write was in flight.
    adopted_during_save: Option<DateTime<Utc>>,
}

pub struct SyncController<S: DocumentStore> {
    store: Arc<S>,
    archive: VersionArchive<S>,
    timings: SyncTimings,
    commands: mpsc::Receiver<Command>,
    engine_tx: UnboundedSender<EngineEvent>,
    engine_rx: UnboundedReceiver<EngineEvent>,
    state_tx: watch::Sender<SyncSnapshot>,
    events_tx: broadcast::Sender<SyncEvent>,
    poller: ActivePoller<S>,
    session: Option<Session<S>>,
    opening: Option<DocumentId>,
    next_epoch: u64,
}

impl<S: DocumentStore> SyncController<S> {
    /// Start the controller task. It runs until `shutdown` is requested or
    /// every handle has been dropped.
    pub fn spawn(store: S, timings: SyncTimings) -> SyncHandle<S> {
        let store = Arc::new(store);
        let archive = VersionArchive::new(Arc::clone(&store));
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SyncSnapshot::closed());
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER_SIZE);

        let controller = Self {
            store: Arc::clone(&store),
            archive: archive.clone(),
            timings,
            commands,
            poller: ActivePoller::new(Arc::clone(&store), engine_tx.clone()),
            engine_tx,
            engine_rx,
            state_tx,
            events_tx: events_tx.clone(),
            session: None,
            opening: None,
            next_epoch: 0,
        };
        tokio::spawn(controller.run());

        SyncHandle { commands: command_tx, state: state_rx, events: events_tx, store, archive }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.close_session(CloseReason::Requested).await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.close_session(CloseReason::Requested).await;
                        break;
                    }
                },
                Some(event) = self.engine_rx.recv() => self.handle_event(event),
            }
        }
        debug!("sync controller stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Open { id, reply } => {
                let result = self.open(id).await;
                let _ = reply.send(result);
            }
            Command::Close { reply } => {
                self.close_session(CloseReason::Requested).await;
                let _ = reply.send(());
            }
            Command::Edit { id, draft, reply } => {
                let _ = reply.send(self.edit(&id, draft, false));
            }
            Command::Flush { id, draft, reply } => {
                let _ = reply.send(self.edit(&id, draft, true));
            }
            Command::Restore { id, index, reply } => {
                let result = self.restore(&id, index).await;
                let _ = reply.send(result);
            }
            Command::Delete { id, reply } => {
                let result = self.delete(&id).await;
                let _ = reply.send(result);
            }
            // Handled in `run`.
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    // ── Commands ────────────────────────────────────────────────────

    async fn open(&mut self, id: DocumentId) -> Result<Document, SyncError> {
        if let Some(session) = &self.session {
            if session.tag.doc_id == id {
                debug!(doc_id = %id, "document already open");
                return Ok(Self::current_document(session));
            }
        }
        self.close_session(CloseReason::Switched).await;

        self.opening = Some(id.clone());
        self.publish();
        let fetched = self.store.get(&id).await;
        self.opening = None;
        let mut document = match fetched {
            Ok(document) => document,
            Err(e) => {
                warn!(doc_id = %id, error = %e, "failed to open document");
                self.publish();
                return Err(e.into());
            }
        };

        match self.store.set_active(&id).await {
            Ok(()) => document.is_active = true,
            Err(e) => warn!(doc_id = %id, error = %e, "failed to mark document active"),
        }

        self.next_epoch += 1;
        let tag = SessionTag { doc_id: id.clone(), epoch: self.next_epoch };
        let scheduler = SaveScheduler::new(
            tag.clone(),
            self.timings.debounce,
            Arc::clone(&self.store),
            self.engine_tx.clone(),
        );
        self.poller.start(tag.clone(), self.timings.poll_interval);
        self.session = Some(Session {
            tag,
            buffer: LocalEditBuffer::from_document(&document),
            scheduler,
            adopted_during_save: None,
        });

        info!(doc_id = %id, updated_at = %document.updated_at, "document opened");
        self.emit(SyncEvent::Opened { doc_id: id, updated_at: document.updated_at });
        self.publish();
        Ok(document)
    }

    fn edit(
        &mut self,
        id: &DocumentId,
        draft: DocumentDraft,
        flush: bool,
    ) -> Result<(), SyncError> {
        let session = self.session_for_id(id)?;
        session.buffer.apply_edit(draft.title, draft.content);
        let draft = session.buffer.draft();
        if flush {
            session.scheduler.flush_now(draft);
        } else {
            session.scheduler.notify_edit(draft);
        }
        self.publish();
        Ok(())
    }

    async fn restore(&mut self, id: &DocumentId, index: usize) -> Result<(), SyncError> {
        self.session_for_id(id)?;
        let content = self.archive.restore(id, index).await?;
        let session = self.session_for_id(id)?;
        let title = session.buffer.title.clone();
        session.buffer.apply_edit(title, content);
        let draft = session.buffer.draft();
        session.scheduler.flush_now(draft);
        info!(doc_id = %id, index, "restoring version");
        self.emit(SyncEvent::Restored { doc_id: id.clone(), index });
        self.publish();
        Ok(())
    }

    async fn delete(&mut self, id: &DocumentId) -> Result<(), SyncError> {
        let mut open_tag = None;
        if let Some(session) = self.session.as_mut().filter(|session| &session.tag.doc_id == id) {
            let tag = session.tag.clone();
            // Let an in-flight write land before the delete does.
            if let Some((save_id, result)) = session.scheduler.settle().await {
                self.apply_save(&tag, save_id, result);
            }
            open_tag = Some(tag);
        }

        let result = self.store.delete(id).await;
        if let Err(e) = &result {
            if !e.is_not_found() {
                warn!(doc_id = %id, error = %e, "delete failed, document stays open");
                if let Some(session) = open_tag.as_ref().and_then(|tag| self.session_for_tag(tag)) {
                    session.scheduler.resume();
                }
                self.publish();
                return Err(e.clone().into());
            }
        }

        let still_open = open_tag
            .as_ref()
            .is_some_and(|tag| self.session.as_ref().is_some_and(|session| &session.tag == tag));
        if still_open {
            if let Some(mut session) = self.detach() {
                let discarded_local_edits = session.scheduler.discard_pending();
                info!(doc_id = %id, discarded_local_edits, "closing deleted document");
            }
            self.emit(SyncEvent::Closed { doc_id: id.clone(), reason: CloseReason::Deleted });
            self.publish();
        }
        result?;
        info!(doc_id = %id, "document deleted");
        Ok(())
    }

    async fn close_session(&mut self, reason: CloseReason) {
        let Some(session) = self.detach() else {
            return;
        };
        let doc_id = session.tag.doc_id.clone();
        match session.scheduler.shutdown().await {
            Some(Ok(saved)) => {
                info!(doc_id = %doc_id, updated_at = %saved.updated_at, "flushed edits on close");
                let updated_at = saved.updated_at;
                self.emit(SyncEvent::Saved { doc_id: doc_id.clone(), updated_at });
            }
            Some(Err(e)) => {
                warn!(doc_id = %doc_id, error = %e, "failed to flush edits on close");
                self.emit(SyncEvent::SaveFailed { doc_id: doc_id.clone(), error: e.to_string() });
            }
            None => {}
        }
        info!(doc_id = %doc_id, ?reason, "document closed");
        self.emit(SyncEvent::Closed { doc_id, reason });
        self.publish();
    }

    /// The open document vanished from the store. No flush is attempted.
    fn lose_document(&mut self) {
        let Some(session) = self.detach() else {
            return;
        };
        let doc_id = session.tag.doc_id;
        error!(doc_id = %doc_id, "open document no longer exists on the store, closing");
        self.emit(SyncEvent::Closed { doc_id, reason: CloseReason::DeletedRemotely });
        self.publish();
    }

    fn detach(&mut self) -> Option<Session<S>> {
        self.poller.stop();
        self.session.take()
    }

    // ── Engine events ───────────────────────────────────────────────

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::DebounceElapsed { tag, generation } => {
                if let Some(session) = self.session_for_tag(&tag) {
                    session.scheduler.debounce_elapsed(generation);
                    self.publish();
                }
            }
            EngineEvent::PollTick { tag } => {
                self.poller.tick(&tag);
            }
            EngineEvent::SaveFinished { tag, save_id, result } => {
                self.save_finished(&tag, save_id, result);
            }
            EngineEvent::PollFinished { tag, result } => {
                if self.poller.fetch_finished(&tag) {
                    self.poll_finished(&tag, result);
                } else {
                    debug!(doc_id = %tag.doc_id, "discarding poll result for closed session");
                }
            }
        }
    }

    fn save_finished(
        &mut self,
        tag: &SessionTag,
        save_id: u64,
        result: Result<Document, StoreError>,
    ) {
        if !self.apply_save(tag, save_id, result) {
            return;
        }
        if let Some(session) = self.session_for_tag(tag) {
            session.scheduler.resume();
        }
        self.publish();
    }

    /// Fold a write's outcome into the session and report it. Returns false
    /// if the write was superseded or the session is gone afterwards.
    fn apply_save(
        &mut self,
        tag: &SessionTag,
        save_id: u64,
        result: Result<Document, StoreError>,
    ) -> bool {
        let Some(session) = self.session_for_tag(tag) else {
            return false;
        };
        if session.scheduler.complete(save_id).is_none() {
            debug!(doc_id = %tag.doc_id, save_id, "ignoring result of superseded write");
            return false;
        }
        let adopted_at = session.adopted_during_save.take();

        let event = match result {
            Err(e) if e.is_not_found() => {
                self.lose_document();
                return false;
            }
            Err(e) => {
                warn!(doc_id = %tag.doc_id, error = %e, "save failed, waiting for next edit");
                SyncEvent::SaveFailed { doc_id: tag.doc_id.clone(), error: e.to_string() }
            }
            Ok(saved) => match adopted_at {
                None => {
                    session.buffer.observe(saved.updated_at);
                    debug!(doc_id = %tag.doc_id, updated_at = %saved.updated_at, "saved");
                    SyncEvent::Saved { doc_id: tag.doc_id.clone(), updated_at: saved.updated_at }
                }
                Some(adopted_at) => {
                    let kept_remote = adopted_at > saved.updated_at;
                    if !kept_remote {
                        // Our write landed last, so the store holds our text.
                        if session.scheduler.has_pending() {
                            session.buffer.observe(saved.updated_at);
                        } else {
                            session.buffer.adopt(&saved);
                        }
                    }
                    warn!(
                        doc_id = %tag.doc_id,
                        kept_remote,
                        "save resolved after a newer remote version was adopted"
                    );
                    SyncEvent::StaleWrite { doc_id: tag.doc_id.clone(), kept_remote }
                }
            },
        };
        self.emit(event);
        true
    }

    fn poll_finished(&mut self, tag: &SessionTag, result: Result<Document, StoreError>) {
        let remote = match result {
            Ok(remote) => remote,
            Err(e) if e.is_not_found() => {
                self.lose_document();
                return;
            }
            Err(e) => {
                warn!(doc_id = %tag.doc_id, error = %e, "poll failed");
                return;
            }
        };
        let Some(session) = self.session_for_tag(tag) else {
            return;
        };

        if session.scheduler.in_flight_content() == Some(remote.content.as_str()) {
            // The store already reflects our own in-flight write.
            session.buffer.observe(remote.updated_at);
            return;
        }

        match reconcile(&remote, &session.buffer) {
            Decision::KeepLocal => {
                session.buffer.observe(remote.updated_at);
            }
            Decision::AdoptRemote => {
                let discarded_local_edits = session.scheduler.discard_pending();
                session.buffer.adopt(&remote);
                if session.scheduler.is_saving() {
                    session.adopted_during_save = Some(remote.updated_at);
                }
                info!(
                    doc_id = %tag.doc_id,
                    updated_at = %remote.updated_at,
                    discarded_local_edits,
                    "adopted newer remote version"
                );
                self.emit(SyncEvent::RemoteAdopted {
                    doc_id: tag.doc_id.clone(),
                    updated_at: remote.updated_at,
                    discarded_local_edits,
                });
                self.publish();
            }
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn session_for_tag(&mut self, tag: &SessionTag) -> Option<&mut Session<S>> {
        match self.session.as_mut() {
            Some(session) if &session.tag == tag => Some(session),
            _ => {
                debug!(doc_id = %tag.doc_id, "ignoring message for a closed session");
                None
            }
        }
    }

    fn session_for_id(&mut self, id: &DocumentId) -> Result<&mut Session<S>, SyncError> {
        match self.session.as_mut() {
            Some(session) if &session.tag.doc_id == id => Ok(session),
            _ => Err(SyncError::NotOpen(id.clone())),
        }
    }

    fn current_document(session: &Session<S>) -> Document {
        Document {
            id: session.tag.doc_id.clone(),
            title: session.buffer.title.clone(),
            content: session.buffer.content.clone(),
            updated_at: session.buffer.last_known_remote_updated_at(),
            is_active: true,
        }
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    fn publish(&self) {
        let snapshot = match &self.session {
            Some(session) => SyncSnapshot {
                status: SyncStatus::Open {
                    doc_id: session.tag.doc_id.clone(),
                    phase: session.scheduler.phase(),
                },
                document: Some(OpenDocument {
                    id: session.tag.doc_id.clone(),
                    title: session.buffer.title.clone(),
                    content: session.buffer.content.clone(),
                    last_known_remote_updated_at: session.buffer.last_known_remote_updated_at(),
                }),
            },
            None => match &self.opening {
                Some(id) => SyncSnapshot {
                    status: SyncStatus::Opening { doc_id: id.clone() },
                    document: None,
                },
                None => SyncSnapshot::closed(),
            },
        };
        self.state_tx.send_replace(snapshot);
    }
}

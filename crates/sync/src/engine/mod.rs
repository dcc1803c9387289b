// Sync engine: one open document, one local writer, one polling observer.
//
// The controller actor owns every piece of mutable state. Timers and network
// requests run on their own tasks and report back as `EngineEvent`s tagged
// with the session that started them; the controller drops any event whose
// tag does not match the currently open session.

pub mod buffer;
pub mod conflict;
pub mod controller;
pub mod poller;
pub mod scheduler;
pub mod timer;

use canvas_common::types::{Document, DocumentId};
use serde::Serialize;

use crate::store::StoreError;

/// Identifies one open-document session. Re-opening the same document
/// yields a new epoch, so events from the previous session never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionTag {
    pub doc_id: DocumentId,
    pub epoch: u64,
}

/// Sub-state of an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditPhase {
    /// Nothing waiting to be written.
    Clean,
    /// Edits buffered, debounce timer running (or queued behind a write).
    Dirty,
    /// A write is in flight.
    Saving,
}

/// Messages posted back to the controller by timers and network tasks.
#[derive(Debug)]
pub(crate) enum EngineEvent {
    DebounceElapsed { tag: SessionTag, generation: u64 },
    PollTick { tag: SessionTag },
    SaveFinished { tag: SessionTag, save_id: u64, result: Result<Document, StoreError> },
    PollFinished { tag: SessionTag, result: Result<Document, StoreError> },
}

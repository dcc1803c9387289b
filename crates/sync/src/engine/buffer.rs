// Local edit buffer for the open document.

use canvas_common::types::{Document, DocumentDraft};
use chrono::{DateTime, Utc};

/// Ephemeral per-open-document state. Never persisted.
///
/// `last_known_remote_updated_at` is the newest `updated_at` this client has
/// observed, from its own save or from a poll. It only moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEditBuffer {
    pub title: String,
    pub content: String,
    last_known_remote_updated_at: DateTime<Utc>,
}

impl LocalEditBuffer {
    pub fn from_document(document: &Document) -> Self {
        Self {
            title: document.title.clone(),
            content: document.content.clone(),
            last_known_remote_updated_at: document.updated_at,
        }
    }

    pub fn last_known_remote_updated_at(&self) -> DateTime<Utc> {
        self.last_known_remote_updated_at
    }

    pub fn draft(&self) -> DocumentDraft {
        DocumentDraft::new(self.title.clone(), self.content.clone())
    }

    pub fn apply_edit(&mut self, title: String, content: String) {
        self.title = title;
        self.content = content;
    }

    /// Record an observed remote timestamp. Returns true if it advanced.
    pub fn observe(&mut self, updated_at: DateTime<Utc>) -> bool {
        if updated_at > self.last_known_remote_updated_at {
            self.last_known_remote_updated_at = updated_at;
            true
        } else {
            false
        }
    }

    /// Replace local text with the remote copy.
    pub fn adopt(&mut self, remote: &Document) {
        self.title = remote.title.clone();
        self.content = remote.content.clone();
        self.observe(remote.updated_at);
    }
}

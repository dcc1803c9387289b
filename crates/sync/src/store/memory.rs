// In-process document store.
//
// Honors the same contract as the HTTP store: `updated_at` is stamped by the
// store on every write and strictly increases, and every update appends an
// immutable version snapshot. Calls made through `DocumentStore` are recorded
// so callers can assert exactly which requests the engine issued; the
// `external_*` methods mutate state without being recorded, which is how an
// out-of-band writer (the agent) is modeled.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use canvas_common::types::{Document, DocumentDraft, DocumentId, DocumentSummary, VersionEntry};
use chrono::{DateTime, Utc};

use super::{DocumentStore, StoreError};

const PREVIEW_CHARS: usize = 80;

/// A request the engine made against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Get(DocumentId),
    Create(DocumentDraft),
    Update(DocumentId, DocumentDraft),
    Delete(DocumentId),
    SetActive(DocumentId),
    ListVersions(DocumentId),
    GetVersion(DocumentId, usize),
}

#[derive(Debug, Clone)]
struct StoredVersion {
    timestamp: DateTime<Utc>,
    content: String,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    document: Document,
    versions: Vec<StoredVersion>,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<DocumentId, StoredDocument>,
    next_id: u64,
    last_stamp: Option<DateTime<Utc>>,
    calls: Vec<StoreCall>,
    update_failures: VecDeque<StoreError>,
    get_failures: VecDeque<StoreError>,
    delete_failures: VecDeque<StoreError>,
    update_request_delay: Duration,
    update_response_delay: Duration,
    get_response_delay: Duration,
}

impl MemoryState {
    /// Strictly increasing wall-clock stamp, even for writes in the same instant.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + chrono::Duration::milliseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn insert(&mut self, draft: &DocumentDraft) -> Document {
        self.next_id += 1;
        let id = DocumentId::new(self.next_id.to_string());
        let updated_at = self.stamp();
        let document = Document {
            id: id.clone(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            updated_at,
            is_active: false,
        };
        let versions =
            vec![StoredVersion { timestamp: updated_at, content: draft.content.clone() }];
        self.documents.insert(id, StoredDocument { document: document.clone(), versions });
        document
    }

    fn write(&mut self, id: &DocumentId, draft: &DocumentDraft) -> Result<Document, StoreError> {
        let updated_at = self.stamp();
        let stored =
            self.documents.get_mut(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        stored.document.title = draft.title.clone();
        stored.document.content = draft.content.clone();
        stored.document.updated_at = updated_at;
        stored
            .versions
            .push(StoredVersion { timestamp: updated_at, content: draft.content.clone() });
        Ok(stored.document.clone())
    }

    fn set_active(&mut self, id: &DocumentId) -> Result<(), StoreError> {
        if !self.documents.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        for (doc_id, stored) in &mut self.documents {
            stored.document.is_active = doc_id == id;
        }
        Ok(())
    }
}

/// Cloneable handle to a shared in-memory document collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Out-of-band access (not recorded) ───────────────────────────

    /// Seed a document directly.
    pub fn insert(&self, title: &str, content: &str) -> Document {
        self.lock().insert(&DocumentDraft::new(title, content))
    }

    /// Write as the external agent would.
    pub fn external_update(&self, id: &DocumentId, content: &str) -> Result<Document, StoreError> {
        let mut state = self.lock();
        let title = state
            .documents
            .get(id)
            .map(|stored| stored.document.title.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        state.write(id, &DocumentDraft::new(title, content))
    }

    /// Delete as another client would.
    pub fn external_delete(&self, id: &DocumentId) -> bool {
        self.lock().documents.remove(id).is_some()
    }

    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        self.lock().documents.get(id).map(|stored| stored.document.clone())
    }

    /// Full content of every version, oldest first.
    pub fn version_contents(&self, id: &DocumentId) -> Vec<String> {
        self.lock()
            .documents
            .get(id)
            .map(|stored| stored.versions.iter().map(|v| v.content.clone()).collect())
            .unwrap_or_default()
    }

    pub fn active_document(&self) -> Option<DocumentId> {
        self.lock()
            .documents
            .values()
            .find(|stored| stored.document.is_active)
            .map(|stored| stored.document.id.clone())
    }

    // ── Call recording ──────────────────────────────────────────────

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Only the `update` calls, in issue order.
    pub fn updates(&self) -> Vec<(DocumentId, DocumentDraft)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Update(id, draft) => Some((id.clone(), draft.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn get_count(&self) -> usize {
        self.lock().calls.iter().filter(|call| matches!(call, StoreCall::Get(_))).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    // ── Fault injection ─────────────────────────────────────────────

    /// The next `update` call fails with `error` without touching state.
    pub fn fail_next_update(&self, error: StoreError) {
        self.lock().update_failures.push_back(error);
    }

    /// The next `get` call fails with `error`.
    pub fn fail_next_get(&self, error: StoreError) {
        self.lock().get_failures.push_back(error);
    }

    /// The next `delete` call fails with `error` and the document stays.
    pub fn fail_next_delete(&self, error: StoreError) {
        self.lock().delete_failures.push_back(error);
    }

    /// Delay before an update is applied (the write lands late).
    pub fn delay_update_requests(&self, delay: Duration) {
        self.lock().update_request_delay = delay;
    }

    /// Delay after an update is applied (the write lands, the response is late).
    pub fn delay_update_responses(&self, delay: Duration) {
        self.lock().update_response_delay = delay;
    }

    pub fn delay_get_responses(&self, delay: Duration) {
        self.lock().get_response_delay = delay;
    }

    fn record(&self, call: StoreCall) {
        self.lock().calls.push(call);
    }
}

fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn list(&self) -> Result<Vec<DocumentSummary>, StoreError> {
        self.record(StoreCall::List);
        Ok(self
            .lock()
            .documents
            .values()
            .map(|stored| DocumentSummary {
                id: stored.document.id.clone(),
                title: stored.document.title.clone(),
                updated_at: stored.document.updated_at,
                is_active: stored.document.is_active,
            })
            .collect())
    }

    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.record(StoreCall::Get(id.clone()));
        let (result, delay) = {
            let mut state = self.lock();
            let result = match state.get_failures.pop_front() {
                Some(error) => Err(error),
                None => state
                    .documents
                    .get(id)
                    .map(|stored| stored.document.clone())
                    .ok_or_else(|| StoreError::NotFound(id.clone())),
            };
            (result, state.get_response_delay)
        };
        pause(delay).await;
        result
    }

    async fn create(&self, draft: &DocumentDraft) -> Result<Document, StoreError> {
        self.record(StoreCall::Create(draft.clone()));
        Ok(self.lock().insert(draft))
    }

    async fn update(&self, id: &DocumentId, draft: &DocumentDraft) -> Result<Document, StoreError> {
        self.record(StoreCall::Update(id.clone(), draft.clone()));
        let (failure, request_delay, response_delay) = {
            let mut state = self.lock();
            (
                state.update_failures.pop_front(),
                state.update_request_delay,
                state.update_response_delay,
            )
        };
        pause(request_delay).await;
        if let Some(error) = failure {
            pause(response_delay).await;
            return Err(error);
        }
        let result = self.lock().write(id, draft);
        pause(response_delay).await;
        result
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.record(StoreCall::Delete(id.clone()));
        let mut state = self.lock();
        if let Some(error) = state.delete_failures.pop_front() {
            return Err(error);
        }
        match state.documents.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    async fn set_active(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.record(StoreCall::SetActive(id.clone()));
        self.lock().set_active(id)
    }

    async fn list_versions(&self, id: &DocumentId) -> Result<Vec<VersionEntry>, StoreError> {
        self.record(StoreCall::ListVersions(id.clone()));
        let state = self.lock();
        let stored = state.documents.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(stored
            .versions
            .iter()
            .map(|version| VersionEntry {
                timestamp: version.timestamp,
                content_preview: preview(&version.content),
            })
            .collect())
    }

    async fn get_version(&self, id: &DocumentId, index: usize) -> Result<String, StoreError> {
        self.record(StoreCall::GetVersion(id.clone(), index));
        let state = self.lock();
        let stored = state.documents.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        stored
            .versions
            .get(index)
            .map(|version| version.content.clone())
            .ok_or_else(|| StoreError::Rejected(format!("version {index} does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_stamps_strictly_increasing_timestamps() {
        let store = MemoryDocumentStore::new();
        let doc = store.insert("Canvas", "a");

        let first = store.update(&doc.id, &DocumentDraft::new("Canvas", "ab")).await.unwrap();
        let second = store.update(&doc.id, &DocumentDraft::new("Canvas", "abc")).await.unwrap();

        assert!(first.updated_at > doc.updated_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn every_update_appends_a_version() {
        let store = MemoryDocumentStore::new();
        let doc = store.insert("Canvas", "v0");
        store.update(&doc.id, &DocumentDraft::new("Canvas", "v1")).await.unwrap();
        store.external_update(&doc.id, "v2").unwrap();

        assert_eq!(store.version_contents(&doc.id), vec!["v0", "v1", "v2"]);
        let listed = store.list_versions(&doc.id).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[2].content_preview, "v2");
        assert_eq!(store.get_version(&doc.id, 1).await.unwrap(), "v1");
    }

    #[tokio::test]
    async fn external_writes_are_not_recorded() {
        let store = MemoryDocumentStore::new();
        let doc = store.insert("Canvas", "");
        store.external_update(&doc.id, "agent text").unwrap();

        assert!(store.calls().is_empty());
        assert_eq!(store.document(&doc.id).unwrap().content, "agent text");
    }

    #[tokio::test]
    async fn set_active_marks_exactly_one_document() {
        let store = MemoryDocumentStore::new();
        let a = store.insert("A", "");
        let b = store.insert("B", "");

        store.set_active(&a.id).await.unwrap();
        store.set_active(&b.id).await.unwrap();

        assert_eq!(store.active_document(), Some(b.id.clone()));
        let listed = store.list().await.unwrap();
        assert_eq!(listed.iter().filter(|summary| summary.is_active).count(), 1);
    }

    #[tokio::test]
    async fn scripted_failure_leaves_state_untouched() {
        let store = MemoryDocumentStore::new();
        let doc = store.insert("Canvas", "kept");
        store.fail_next_update(StoreError::Status { status: 503 });

        let result = store.update(&doc.id, &DocumentDraft::new("Canvas", "lost")).await;

        assert_eq!(result, Err(StoreError::Status { status: 503 }));
        assert_eq!(store.document(&doc.id).unwrap().content, "kept");
        assert_eq!(store.updates().len(), 1);
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let store = MemoryDocumentStore::new();
        let id = DocumentId::from("404");
        assert_eq!(store.get(&id).await, Err(StoreError::NotFound(id.clone())));
        assert_eq!(
            store.update(&id, &DocumentDraft::default()).await,
            Err(StoreError::NotFound(id.clone()))
        );
        assert_eq!(store.delete(&id).await, Err(StoreError::NotFound(id)));
    }

    #[tokio::test]
    async fn version_index_out_of_range_is_rejected() {
        let store = MemoryDocumentStore::new();
        let doc = store.insert("Canvas", "only");
        assert!(matches!(
            store.get_version(&doc.id, 5).await,
            Err(StoreError::Rejected(message)) if message.contains("5")
        ));
    }
}

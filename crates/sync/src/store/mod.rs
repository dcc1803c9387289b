// Document store client.
//
// The store is the remote collaborator that durably persists documents and
// appends a version snapshot on every successful update. It is abstracted
// behind `DocumentStore` so the engine can run against the HTTP client in
// production and the in-memory store in tests.

pub mod http;
pub mod memory;

use std::future::Future;

use canvas_common::types::{Document, DocumentDraft, DocumentId, DocumentSummary, VersionEntry};

pub use crate::error::StoreError;
pub use http::HttpDocumentStore;
pub use memory::{MemoryDocumentStore, StoreCall};

/// CRUD + versioning operations against the remote document collection.
///
/// All methods return `Send` futures so save and poll requests can run on
/// spawned tokio tasks.
pub trait DocumentStore: Send + Sync + 'static {
    /// List every document (no content).
    fn list(&self) -> impl Future<Output = Result<Vec<DocumentSummary>, StoreError>> + Send;

    /// Fetch one document with content.
    fn get(&self, id: &DocumentId) -> impl Future<Output = Result<Document, StoreError>> + Send;

    /// Create a document; the store assigns id and `updated_at`.
    fn create(
        &self,
        draft: &DocumentDraft,
    ) -> impl Future<Output = Result<Document, StoreError>> + Send;

    /// Replace title and content; the store stamps a fresh `updated_at` and
    /// appends a version.
    fn update(
        &self,
        id: &DocumentId,
        draft: &DocumentDraft,
    ) -> impl Future<Output = Result<Document, StoreError>> + Send;

    fn delete(&self, id: &DocumentId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Mark the document the external agent should target.
    fn set_active(&self, id: &DocumentId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Version snapshots, oldest first.
    fn list_versions(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Vec<VersionEntry>, StoreError>> + Send;

    /// Full content of the version at `index` (oldest-first ordinal).
    fn get_version(
        &self,
        id: &DocumentId,
        index: usize,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;
}

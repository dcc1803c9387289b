// Read-only access to a document's version history.
//
// Nothing is cached: every listing reflects the store's current log.
// Restoring only reads a snapshot; persisting it is the caller's job and
// goes through a normal update, which appends a new version. The log is
// therefore only ever extended, never rewritten.

use std::sync::Arc;

use canvas_common::types::{DocumentId, Version};
use tracing::debug;

use crate::store::{DocumentStore, StoreError};

pub struct VersionArchive<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> VersionArchive<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All versions, oldest first (index 0 is the oldest).
    pub async fn list(&self, id: &DocumentId) -> Result<Vec<Version>, StoreError> {
        let entries = self.store.list_versions(id).await?;
        debug!(doc_id = %id, versions = entries.len(), "listed versions");
        Ok(Version::index_entries(entries))
    }

    /// Full content snapshot of version `index`.
    pub async fn restore(&self, id: &DocumentId, index: usize) -> Result<String, StoreError> {
        self.store.get_version(id, index).await
    }
}

impl<S: DocumentStore> Clone for VersionArchive<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryDocumentStore, StoreCall};

    #[tokio::test]
    async fn list_reflects_current_log_on_every_call() {
        let store = Arc::new(MemoryDocumentStore::new());
        let doc = store.insert("Canvas", "v0");
        let archive = VersionArchive::new(Arc::clone(&store));

        assert_eq!(archive.list(&doc.id).await.unwrap().len(), 1);
        store.external_update(&doc.id, "v1").unwrap();
        let versions = archive.list(&doc.id).await.unwrap();

        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].index, 1);
        assert_eq!(versions[1].content_preview, "v1");
    }

    #[tokio::test]
    async fn restore_is_a_pure_read() {
        let store = Arc::new(MemoryDocumentStore::new());
        let doc = store.insert("Canvas", "v0");
        store.external_update(&doc.id, "v1").unwrap();
        let archive = VersionArchive::new(Arc::clone(&store));

        let snapshot = archive.restore(&doc.id, 0).await.unwrap();

        assert_eq!(snapshot, "v0");
        assert_eq!(store.document(&doc.id).unwrap().content, "v1");
        assert_eq!(store.version_contents(&doc.id).len(), 2);
        assert_eq!(store.calls(), vec![StoreCall::GetVersion(doc.id.clone(), 0)]);
    }
}

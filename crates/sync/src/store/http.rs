// HTTP document store client (JSON over REST).
//
// Every failure mode is a `StoreError` value: transport errors, non-2xx
// statuses, undecodable bodies and `success: false` envelopes. Nothing here
// panics or retries; the engine's next debounce or poll cycle is the retry.

use canvas_common::protocol::rest::{
    self, DocumentListResponse, DocumentResponse, Envelope, VersionListResponse, VersionResponse,
};
use canvas_common::types::{Document, DocumentDraft, DocumentId, DocumentSummary, VersionEntry};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{DocumentStore, StoreError};

#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
}

impl HttpDocumentStore {
    /// Build a client rooted at `base_url` (e.g. `http://localhost:8000/api/`).
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, StoreError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|error| StoreError::InvalidUrl(format!("{base_url}: {error}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(StoreError::InvalidUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }
        // Url::join drops the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: rest::Route) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidUrl(format!("{}: cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(route);
        Ok(url)
    }

    async fn send_envelope<T>(
        &self,
        request: RequestBuilder,
        id: Option<&DocumentId>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Envelope,
    {
        let response =
            request.send().await.map_err(|error| StoreError::Transport(error.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::NotFound(id.clone()));
            }
        }
        if !status.is_success() {
            return Err(StoreError::Status { status: status.as_u16() });
        }

        let body =
            response.bytes().await.map_err(|error| StoreError::Transport(error.to_string()))?;
        let envelope: T = serde_json::from_slice(&body)
            .map_err(|error| StoreError::Malformed(error.to_string()))?;
        if !envelope.success() {
            let message = envelope.error_message().unwrap_or("success flag was false");
            return Err(StoreError::Rejected(message.to_string()));
        }
        Ok(envelope)
    }

    /// For endpoints whose body we do not need (delete, set-active): any 2xx is success.
    async fn send_expecting_success(
        &self,
        request: RequestBuilder,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        let response =
            request.send().await.map_err(|error| StoreError::Transport(error.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.clone()));
        }
        if !status.is_success() {
            return Err(StoreError::Status { status: status.as_u16() });
        }
        Ok(())
    }
}

fn require_document(response: DocumentResponse) -> Result<Document, StoreError> {
    response.document.ok_or_else(|| StoreError::Malformed("response missing `document`".into()))
}

impl DocumentStore for HttpDocumentStore {
    async fn list(&self) -> Result<Vec<DocumentSummary>, StoreError> {
        let url = self.endpoint(rest::documents_route())?;
        let response: DocumentListResponse =
            self.send_envelope(self.client.get(url), None).await?;
        Ok(response.documents)
    }

    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError> {
        let url = self.endpoint(rest::document_route(id))?;
        debug!(doc_id = %id, "fetching document");
        let response: DocumentResponse = self.send_envelope(self.client.get(url), Some(id)).await?;
        require_document(response)
    }

    async fn create(&self, draft: &DocumentDraft) -> Result<Document, StoreError> {
        let url = self.endpoint(rest::documents_route())?;
        let response: DocumentResponse =
            self.send_envelope(self.client.post(url).json(draft), None).await?;
        require_document(response)
    }

    async fn update(&self, id: &DocumentId, draft: &DocumentDraft) -> Result<Document, StoreError> {
        let url = self.endpoint(rest::document_route(id))?;
        debug!(doc_id = %id, bytes = draft.content.len(), "writing document");
        let response: DocumentResponse =
            self.send_envelope(self.client.put(url).json(draft), Some(id)).await?;
        require_document(response)
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        let url = self.endpoint(rest::document_route(id))?;
        self.send_expecting_success(self.client.delete(url), id).await
    }

    async fn set_active(&self, id: &DocumentId) -> Result<(), StoreError> {
        let url = self.endpoint(rest::active_document_route(id))?;
        self.send_expecting_success(self.client.post(url), id).await
    }

    async fn list_versions(&self, id: &DocumentId) -> Result<Vec<VersionEntry>, StoreError> {
        let url = self.endpoint(rest::versions_route(id))?;
        let response: VersionListResponse =
            self.send_envelope(self.client.get(url), Some(id)).await?;
        Ok(response.versions)
    }

    async fn get_version(&self, id: &DocumentId, index: usize) -> Result<String, StoreError> {
        let url = self.endpoint(rest::version_route(id, index))?;
        // A 404 here names a missing version, not a deleted document.
        let response: VersionResponse = self.send_envelope(self.client.get(url), None).await?;
        response
            .version
            .map(|version| version.content)
            .ok_or_else(|| StoreError::Malformed("response missing `version`".into()))
    }
}

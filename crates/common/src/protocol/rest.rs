// REST envelopes and routes for the document store API.
//
// Routes:
//   GET    /documents                         list
//   POST   /documents                         create
//   GET    /documents/{id}                    get single
//   PUT    /documents/{id}                    update (store stamps updated_at)
//   DELETE /documents/{id}                    delete
//   POST   /documents/active/{id}             mark the agent's target document
//   GET    /documents/{id}/versions           version list, oldest first
//   GET    /documents/{id}/versions/{index}   full content of one version

use serde::{Deserialize, Serialize};

use crate::types::{Document, DocumentId, DocumentSummary, VersionEntry};

pub const DOCUMENTS: &str = "documents";

/// Path segments of a route, unescaped. The HTTP client percent-encodes
/// each one, so ids containing `/` or spaces stay a single segment.
pub type Route = Vec<String>;

pub fn documents_route() -> Route {
    vec![DOCUMENTS.into()]
}

pub fn document_route(id: &DocumentId) -> Route {
    vec![DOCUMENTS.into(), id.to_string()]
}

pub fn active_document_route(id: &DocumentId) -> Route {
    vec![DOCUMENTS.into(), "active".into(), id.to_string()]
}

pub fn versions_route(id: &DocumentId) -> Route {
    let mut route = document_route(id);
    route.push("versions".into());
    route
}

pub fn version_route(id: &DocumentId, index: usize) -> Route {
    let mut route = versions_route(id);
    route.push(index.to_string());
    route
}

/// Every store response carries a `success` flag and an optional error text.
pub trait Envelope {
    fn success(&self) -> bool;
    fn error_message(&self) -> Option<&str>;
}

macro_rules! envelope {
    ($name:ident { $field:ident : $ty:ty }) => {
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
        pub struct $name {
            pub success: bool,
            #[serde(default)]
            pub $field: $ty,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub error: Option<String>,
        }

        impl Envelope for $name {
            fn success(&self) -> bool {
                self.success
            }

            fn error_message(&self) -> Option<&str> {
                self.error.as_deref()
            }
        }
    };
}

envelope!(DocumentListResponse { documents: Vec<DocumentSummary> });
envelope!(DocumentResponse { document: Option<Document> });
envelope!(VersionListResponse { versions: Vec<VersionEntry> });
envelope!(VersionResponse { version: Option<VersionContent> });

/// Body of a single-version response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionContent {
    pub content: String,
}

// Canvas sync core: keeps one open document consistent between a debounced
// local editor and an out-of-band agent writer, over a REST document store.

pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;

pub use archive::VersionArchive;
pub use config::{ConfigError, SyncConfig};
pub use engine::controller::{
    CloseReason, OpenDocument, SyncController, SyncEvent, SyncHandle, SyncSnapshot, SyncStatus,
    SyncTimings,
};
pub use engine::EditPhase;
pub use error::{StoreError, SyncError};
pub use store::{DocumentStore, HttpDocumentStore, MemoryDocumentStore, StoreCall};

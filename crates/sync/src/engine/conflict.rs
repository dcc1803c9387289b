// Staleness detection between the local buffer and a freshly polled copy.
//
// Policy is last-external-writer-wins: if the store holds a version newer
// than anything this client has observed and its content differs from ours,
// the agent wrote after us and its copy replaces local text wholesale.
// Unsaved local edits in that window are discarded; there is no merge.

use canvas_common::types::Document;

use super::buffer::LocalEditBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    KeepLocal,
    AdoptRemote,
}

pub fn reconcile(remote: &Document, local: &LocalEditBuffer) -> Decision {
    if remote.updated_at > local.last_known_remote_updated_at() && remote.content != local.content
    {
        Decision::AdoptRemote
    } else {
        Decision::KeepLocal
    }
}

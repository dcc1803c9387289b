// `canvas restore`: restore a saved version through the sync engine.
//
// The document is opened, the version is loaded and written, and the
// session is closed once the write has landed. The store records the
// restored text as a new version.

use canvas_common::types::{Document, DocumentId};
use canvas_sync::{DocumentStore, SyncEvent};
use clap::Args;

use crate::context::{block_on, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Document id.
    pub id: String,

    /// Version index as shown by `canvas versions` (0 is the oldest).
    pub index: usize,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: RestoreArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let id = DocumentId::from(args.id);
    match block_on(call_restore(store_url, &id, args.index)) {
        Ok(document) => {
            let index = args.index;
            output::print_output(format, &document, |d| format_human(d, index))?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn call_restore(
    store_url: Option<&str>,
    id: &DocumentId,
    index: usize,
) -> anyhow::Result<Document> {
    let context = StoreContext::load(store_url)?;
    let handle = context.controller();
    let mut events = handle.subscribe();

    handle.open(id).await?;
    let restored = handle.restore(id, index).await;
    handle.shutdown().await?;
    restored?;

    while let Ok(event) = events.try_recv() {
        if let SyncEvent::SaveFailed { error, .. } = event {
            anyhow::bail!("failed to write restored version {index} of `{id}`: {error}");
        }
    }
    Ok(context.store.get(id).await?)
}

fn format_human(document: &Document, index: usize) -> String {
    format!(
        "Restored version {index} of {} [{}] (updated {})",
        document.title,
        document.id,
        document.updated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

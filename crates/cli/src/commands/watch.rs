// `canvas watch`: open a document and print sync events until it closes
// or Ctrl-C.

use canvas_common::types::DocumentId;
use canvas_sync::SyncEvent;
use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::context::{block_on, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Document id.
    pub id: String,

    /// Force JSON output (one event per line).
    #[arg(long)]
    json: bool,
}

pub fn run(args: WatchArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let id = DocumentId::from(args.id);
    match block_on(follow(store_url, &id, format)) {
        Ok(()) => Ok(()),
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn follow(
    store_url: Option<&str>,
    id: &DocumentId,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let context = StoreContext::load(store_url)?;
    let handle = context.controller();
    let mut events = handle.subscribe();
    handle.open(id).await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(event) => {
                    output::print_output(format, &event, format_human)?;
                    if matches!(event, SyncEvent::Closed { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await?;
    Ok(())
}

fn format_human(event: &SyncEvent) -> String {
    let when = |at: &chrono::DateTime<chrono::Utc>| at.format("%H:%M:%S").to_string();
    match event {
        SyncEvent::Opened { doc_id, updated_at } => {
            format!("opened {doc_id} (remote {})", when(updated_at))
        }
        SyncEvent::Saved { doc_id, updated_at } => {
            format!("saved {doc_id} at {}", when(updated_at))
        }
        SyncEvent::SaveFailed { doc_id, error } => format!("save of {doc_id} failed: {error}"),
        SyncEvent::RemoteAdopted { doc_id, updated_at, discarded_local_edits } => {
            let note = if *discarded_local_edits { ", local edits discarded" } else { "" };
            format!("remote change to {doc_id} adopted ({}{note})", when(updated_at))
        }
        SyncEvent::StaleWrite { doc_id, kept_remote: true } => {
            format!("write to {doc_id} landed late; newer remote copy kept")
        }
        SyncEvent::StaleWrite { doc_id, kept_remote: false } => {
            format!("write to {doc_id} landed after a remote change; saved copy adopted")
        }
        SyncEvent::Restored { doc_id, index } => format!("restored version {index} of {doc_id}"),
        SyncEvent::Closed { doc_id, reason } => format!("closed {doc_id} ({reason:?})"),
    }
}

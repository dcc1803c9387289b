// `canvas edit`: replace a document's title or content through the sync
// engine, so the write is ordered against concurrent agent writes.

use std::path::PathBuf;

use anyhow::bail;
use canvas_common::types::DocumentId;
use canvas_sync::{SyncError, SyncEvent};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::{block_on, resolve_content, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Document id.
    pub id: String,

    /// New title. Defaults to the current one.
    #[arg(long)]
    title: Option<String>,

    /// New markdown content.
    #[arg(long, group = "content_source")]
    content: Option<String>,

    /// Read new content from a file (`-` for stdin).
    #[arg(long, value_name = "FILE", group = "content_source")]
    file: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditResult {
    pub doc_id: DocumentId,
    pub title: String,
    pub bytes_written: usize,
    pub updated_at: String,
}

pub fn run(args: EditArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let id = DocumentId::from(args.id);
    let result = resolve_content(args.content, args.file.as_deref())
        .and_then(|content| block_on(call_edit(store_url, &id, args.title, content)));

    match result {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn call_edit(
    store_url: Option<&str>,
    id: &DocumentId,
    title: Option<String>,
    content: Option<String>,
) -> anyhow::Result<EditResult> {
    if title.is_none() && content.is_none() {
        bail!("nothing to change: pass --title, --content, or --file");
    }

    let context = StoreContext::load(store_url)?;
    let handle = context.controller();
    let mut events = handle.subscribe();

    let current = handle.open(id).await?;
    let title = title.unwrap_or(current.title);
    let content = content.unwrap_or(current.content);
    let edited = handle.flush_now(id, title.clone(), content.clone()).await;
    handle.shutdown().await?;
    edited?;

    let mut saved_at = None;
    while let Ok(event) = events.try_recv() {
        match event {
            SyncEvent::Saved { updated_at, .. } => saved_at = Some(updated_at),
            SyncEvent::SaveFailed { error, .. } => {
                bail!("failed to save `{id}`: {error}");
            }
            SyncEvent::StaleWrite { kept_remote: true, .. } => {
                return Err(SyncError::StaleWrite(id.clone()).into());
            }
            _ => {}
        }
    }

    let Some(updated_at) = saved_at else {
        bail!("document `{id}` closed before the edit was saved");
    };
    Ok(EditResult {
        doc_id: id.clone(),
        title,
        bytes_written: content.len(),
        updated_at: updated_at.to_rfc3339(),
    })
}

fn format_human(result: &EditResult) -> String {
    format!(
        "Saved {} [{}] ({} bytes, updated {})",
        result.title, result.doc_id, result.bytes_written, result.updated_at
    )
}

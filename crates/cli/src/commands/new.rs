// `canvas new`: create a document.

use std::path::PathBuf;

use canvas_common::types::{Document, DocumentDraft};
use canvas_sync::DocumentStore;
use clap::Args;

use crate::context::{block_on, resolve_content, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Document title.
    #[arg(long)]
    title: String,

    /// Initial markdown content.
    #[arg(long, group = "content_source")]
    content: Option<String>,

    /// Read initial content from a file (`-` for stdin).
    #[arg(long, value_name = "FILE", group = "content_source")]
    file: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: NewArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = resolve_content(args.content, args.file.as_deref()).and_then(|content| {
        let draft = DocumentDraft::new(args.title, content.unwrap_or_default());
        block_on(call_new(store_url, draft))
    });

    match result {
        Ok(document) => {
            output::print_output(format, &document, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

async fn call_new(store_url: Option<&str>, draft: DocumentDraft) -> anyhow::Result<Document> {
    let context = StoreContext::load(store_url)?;
    Ok(context.store.create(&draft).await?)
}

fn format_human(document: &Document) -> String {
    format!("Created {} [{}] ({} bytes)", document.title, document.id, document.content.len())
}

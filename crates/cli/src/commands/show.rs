// `canvas show`: print a document.

use canvas_common::types::{Document, DocumentId};
use canvas_sync::DocumentStore;
use clap::Args;

use crate::context::{block_on, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document id.
    pub id: String,

    /// Print only the content, without the header line.
    #[arg(long)]
    raw: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ShowArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let id = DocumentId::from(args.id);
    match block_on(call_show(store_url, &id)) {
        Ok(document) if args.raw => {
            output::print_output(format, &document, |d| d.content.clone())?;
            Ok(())
        }
        Ok(document) => {
            output::print_output(format, &document, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

async fn call_show(store_url: Option<&str>, id: &DocumentId) -> anyhow::Result<Document> {
    let context = StoreContext::load(store_url)?;
    Ok(context.store.get(id).await?)
}

fn format_human(document: &Document) -> String {
    let active = if document.is_active { ", active" } else { "" };
    format!(
        "# {} [{}] (updated {}{active})\n\n{}",
        document.title,
        document.id,
        document.updated_at.format("%Y-%m-%d %H:%M:%S"),
        document.content
    )
}

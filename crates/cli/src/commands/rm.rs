// `canvas rm`: delete a document.

use canvas_common::types::DocumentId;
use canvas_sync::DocumentStore;
use clap::Args;
use serde::Serialize;

use crate::context::{block_on, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Document id.
    pub id: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct RmResult {
    deleted: DocumentId,
}

pub fn run(args: RmArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let id = DocumentId::from(args.id);
    let result = block_on(async {
        let context = StoreContext::load(store_url)?;
        context.store.delete(&id).await?;
        Ok::<_, anyhow::Error>(RmResult { deleted: id.clone() })
    });

    match result {
        Ok(result) => {
            output::print_output(format, &result, |r| format!("Deleted {}", r.deleted))?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

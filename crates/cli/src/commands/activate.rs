// `canvas activate`: mark a document as active in the store.

use canvas_common::types::DocumentId;
use canvas_sync::DocumentStore;
use clap::Args;
use serde::Serialize;

use crate::context::{block_on, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ActivateArgs {
    /// Document id.
    pub id: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ActivateResult {
    active: DocumentId,
}

pub fn run(args: ActivateArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let id = DocumentId::from(args.id);
    let result = block_on(async {
        let context = StoreContext::load(store_url)?;
        context.store.set_active(&id).await?;
        Ok::<_, anyhow::Error>(ActivateResult { active: id.clone() })
    });

    match result {
        Ok(result) => {
            output::print_output(format, &result, |r| format!("Active document: {}", r.active))?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

// `canvas ls`: list documents in the store.

use canvas_common::types::DocumentSummary;
use canvas_sync::DocumentStore;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::{block_on, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsResult {
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
}

pub fn run(args: LsArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match block_on(call_ls(store_url)) {
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

async fn call_ls(store_url: Option<&str>) -> anyhow::Result<LsResult> {
    let context = StoreContext::load(store_url)?;
    let documents = context.store.list().await?;
    Ok(LsResult { documents })
}

fn format_human(result: &LsResult) -> String {
    if result.documents.is_empty() {
        return "No documents in store.".into();
    }

    let mut lines = Vec::new();
    lines.push(format!("{} document(s)", result.documents.len()));
    for d in &result.documents {
        let marker = if d.is_active { "*" } else { " " };
        lines.push(format!(
            "{marker} {:>6}  {}  (updated {})",
            d.id,
            d.title,
            d.updated_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    lines.join("\n")
}

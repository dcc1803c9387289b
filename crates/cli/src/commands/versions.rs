// `canvas versions`: list a document's saved versions, oldest first.

use std::sync::Arc;

use canvas_common::types::{DocumentId, Version};
use canvas_sync::VersionArchive;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::{block_on, StoreContext};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct VersionsArgs {
    /// Document id.
    pub id: String,

    /// Print the full content of version INDEX instead of the listing.
    #[arg(long, value_name = "INDEX")]
    show: Option<usize>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsResult {
    pub doc_id: DocumentId,
    #[serde(default)]
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionContent {
    pub doc_id: DocumentId,
    pub index: usize,
    pub content: String,
}

pub fn run(args: VersionsArgs, store_url: Option<&str>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let doc_id = DocumentId::from(args.id);
    let result = block_on(async {
        let context = StoreContext::load(store_url)?;
        let archive = VersionArchive::new(Arc::new(context.store));
        match args.show {
            Some(index) => {
                let content = archive.restore(&doc_id, index).await?;
                let version = VersionContent { doc_id: doc_id.clone(), index, content };
                Ok::<_, anyhow::Error>(Listing::Content(version))
            }
            None => {
                let versions = archive.list(&doc_id).await?;
                Ok(Listing::Versions(VersionsResult { doc_id: doc_id.clone(), versions }))
            }
        }
    });

    let printed = match result {
        Ok(Listing::Versions(listing)) => output::print_output(format, &listing, format_human),
        Ok(Listing::Content(version)) => {
            output::print_output(format, &version, |v| v.content.clone())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            return Err(e);
        }
    };
    printed?;
    Ok(())
}

enum Listing {
    Versions(VersionsResult),
    Content(VersionContent),
}

fn format_human(result: &VersionsResult) -> String {
    if result.versions.is_empty() {
        return format!("No saved versions of {}.", result.doc_id);
    }

    let mut lines = Vec::new();
    lines.push(format!("{} version(s) of {}", result.versions.len(), result.doc_id));
    for v in &result.versions {
        lines.push(format!(
            "  [{}] {}  {}",
            v.index,
            v.timestamp.format("%Y-%m-%d %H:%M:%S"),
            preview_line(&v.content_preview)
        ));
    }
    lines.join("\n")
}

/// First line of a preview, trimmed for a single-row listing.
fn preview_line(preview: &str) -> String {
    let first = preview.lines().next().unwrap_or("").trim();
    let mut chars = first.chars();
    let head: String = chars.by_ref().take(60).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

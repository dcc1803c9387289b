// CLI subcommand dispatch.

use clap::Subcommand;

pub mod activate;
pub mod edit;
pub mod ls;
pub mod new;
pub mod restore;
pub mod rm;
pub mod show;
pub mod versions;
pub mod watch;

#[derive(Subcommand)]
pub enum Command {
    /// List documents in the store
    Ls(ls::LsArgs),
    /// Print a document
    Show(show::ShowArgs),
    /// Create a document
    New(new::NewArgs),
    /// Delete a document
    Rm(rm::RmArgs),
    /// Mark a document as the active one
    Activate(activate::ActivateArgs),
    /// List a document's saved versions
    Versions(versions::VersionsArgs),
    /// Restore a saved version as the current content
    Restore(restore::RestoreArgs),
    /// Replace a document's title or content through the sync engine
    Edit(edit::EditArgs),
    /// Follow a document and print sync events
    Watch(watch::WatchArgs),
}

pub fn run(cmd: Command, store_url: Option<&str>) -> anyhow::Result<()> {
    match cmd {
        Command::Ls(args) => ls::run(args, store_url),
        Command::Show(args) => show::run(args, store_url),
        Command::New(args) => new::run(args, store_url),
        Command::Rm(args) => rm::run(args, store_url),
        Command::Activate(args) => activate::run(args, store_url),
        Command::Versions(args) => versions::run(args, store_url),
        Command::Restore(args) => restore::run(args, store_url),
        Command::Edit(args) => edit::run(args, store_url),
        Command::Watch(args) => watch::run(args, store_url),
    }
}

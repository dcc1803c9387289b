// Shared setup for commands: resolved config, store client, runtime.

use std::future::Future;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use canvas_sync::{HttpDocumentStore, SyncConfig, SyncController, SyncHandle};

pub struct StoreContext {
    pub config: SyncConfig,
    pub store: HttpDocumentStore,
}

impl StoreContext {
    /// Config file, then `CANVAS_STORE_URL`, then the `--store-url` flag.
    pub fn load(store_url: Option<&str>) -> Result<Self> {
        let config = SyncConfig::load().context("failed to load ~/.canvas/config.toml")?;
        Self::from_config(config, store_url)
    }

    fn from_config(mut config: SyncConfig, store_url: Option<&str>) -> Result<Self> {
        if let Some(url) = store_url {
            config.store_url = url.to_string();
        }
        let store = HttpDocumentStore::new(&config.store_url)
            .with_context(|| format!("invalid store URL `{}`", config.store_url))?;
        Ok(Self { config, store })
    }

    pub fn controller(&self) -> SyncHandle<HttpDocumentStore> {
        SyncController::spawn(self.store.clone(), self.config.timings())
    }
}

/// Run `future` to completion on a fresh current-thread runtime.
pub fn block_on<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?
        .block_on(future)
}

/// Content from `--content`, or from `--file` (`-` reads stdin).
pub fn resolve_content(content: Option<String>, file: Option<&Path>) -> Result<Option<String>> {
    match (content, file) {
        (Some(content), _) => Ok(Some(content)),
        (None, Some(path)) if path == Path::new("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
            Ok(Some(buf))
        }
        (None, Some(path)) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("failed to read content file `{}`", path.display())),
        (None, None) => Ok(None),
    }
}

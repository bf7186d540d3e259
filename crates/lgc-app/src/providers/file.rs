//! Fallback provider: writes the listing to a file

use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use lgc_core::prelude::*;

use super::{Provider, SendOptions};

pub const FILE_PROVIDER_ID: &str = "file";

/// Always available, lowest priority
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Provider for FileProvider {
    fn id(&self) -> &str {
        FILE_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Write to file"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn is_available(&self) -> BoxFuture<'_, bool> {
        async { true }.boxed()
    }

    fn send<'a>(
        &'a self,
        content: &'a str,
        options: &'a SendOptions,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            // `path` setting overrides the configured destination
            let path = options
                .settings
                .get("path")
                .map(PathBuf::from)
                .unwrap_or_else(|| self.path.clone());

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
            Ok(format!("written to {}", path.display()))
        }
        .boxed()
    }
}

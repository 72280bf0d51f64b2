//! Append-only log of where each saved file came from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::Persister;
use crate::download::DownloadError;

/// One `timestamp\tabsolute_path\tsource_url` line per saved file.
///
/// Appends from concurrent tasks are serialized so lines never interleave.
pub struct SourceLog {
    path: PathBuf,
    persister: Arc<dyn Persister>,
    write_lock: Mutex<()>,
}

impl SourceLog {
    /// Creates a log that appends to `path` through `persister`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, persister: Arc<dyn Persister>) -> Self {
        Self {
            path: path.into(),
            persister,
            write_lock: Mutex::new(()),
        }
    }

    /// Log file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records that `saved` was fetched from `source_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the log cannot be appended to.
    pub async fn record(&self, saved: &Path, source_url: &str) -> Result<(), DownloadError> {
        let absolute = std::path::absolute(saved).unwrap_or_else(|_| saved.to_path_buf());
        let line = format!(
            "{}\t{}\t{source_url}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
            absolute.display()
        );

        let _guard = self.write_lock.lock().await;
        self.persister.append(&self.path, line.as_bytes()).await
    }
}

impl std::fmt::Debug for SourceLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

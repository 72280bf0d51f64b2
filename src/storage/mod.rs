//! Storage side of the harvester: naming, writing and the source log.
//!
//! The pipeline writes through [`Persister`] so tests can capture files in
//! memory. [`FsPersister`] is the `tokio::fs` implementation.

mod filename;
mod source_log;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::download::DownloadError;

pub use filename::{
    ALLOWED_IMAGE_EXTENSIONS, CollisionPolicy, DEFAULT_EXTENSION, FileNaming, format_size,
};
pub use source_log::SourceLog;

/// Highest numbered candidate tried under [`CollisionPolicy::Rename`].
const MAX_RENAME_INDEX: usize = 1000;

/// Writes bytes to paths.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Creates `dir` and its parents. An existing directory is not an error.
    async fn ensure_dir(&self, dir: &Path) -> Result<(), DownloadError>;

    /// Writes `bytes` to `path`, replacing any existing file.
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), DownloadError>;

    /// Appends `bytes` to `path`, creating it if missing.
    async fn append(&self, path: &Path, bytes: &[u8]) -> Result<(), DownloadError>;

    /// Writes `bytes` to `path` only if nothing exists there yet.
    ///
    /// Returns `Ok(false)` without touching the existing file when `path`
    /// is taken. The check and the creation are one atomic step, so
    /// concurrent callers never both claim the same path.
    async fn create_new(&self, path: &Path, bytes: &[u8]) -> Result<bool, DownloadError>;
}

/// Local filesystem persister.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPersister;

#[async_trait]
impl Persister for FsPersister {
    async fn ensure_dir(&self, dir: &Path) -> Result<(), DownloadError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DownloadError::io(dir, e))
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| DownloadError::io(path, e))
    }

    async fn append(&self, path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        file.flush().await.map_err(|e| DownloadError::io(path, e))
    }

    async fn create_new(&self, path: &Path, bytes: &[u8]) -> Result<bool, DownloadError> {
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(DownloadError::io(path, e)),
        };

        let written = match file.write_all(bytes).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Don't leave a claimed but truncated file behind.
            let _ = tokio::fs::remove_file(path).await;
            return Err(DownloadError::io(path, e));
        }
        Ok(true)
    }
}

/// Ensures `dir` exists and writes `bytes` as `file_name` under `policy`.
///
/// Under [`CollisionPolicy::Rename`] each candidate name is claimed with
/// [`Persister::create_new`], so tasks saving the same name concurrently
/// each end up with their own file.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if the directory cannot be created, the
/// file cannot be written, or every numbered name is taken.
pub async fn persist(
    persister: &dyn Persister,
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
    policy: CollisionPolicy,
) -> Result<PathBuf, DownloadError> {
    persister.ensure_dir(dir).await?;

    let path = match policy {
        CollisionPolicy::Overwrite => {
            let path = dir.join(file_name);
            persister.write(&path, bytes).await?;
            path
        }
        CollisionPolicy::Rename => claim_free_name(persister, dir, file_name, bytes).await?,
    };

    debug!(path = %path.display(), bytes = bytes.len(), "file written");
    Ok(path)
}

async fn claim_free_name(
    persister: &dyn Persister,
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, DownloadError> {
    let base_path = dir.join(file_name);
    if persister.create_new(&base_path, bytes).await? {
        return Ok(base_path);
    }

    for index in 2..MAX_RENAME_INDEX {
        let candidate = dir.join(filename::numbered_file_name(file_name, index));
        if persister.create_new(&candidate, bytes).await? {
            return Ok(candidate);
        }
    }

    warn!(path = %base_path.display(), "no free numbered name left");
    Err(DownloadError::io(
        base_path,
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{file_name} and its numbered variants up to {MAX_RENAME_INDEX} all exist"),
        ),
    ))
}

//! Real filesystem backed by tokio, with fs2 advisory locks and atomic writes

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use fs2::FileExt;
use tokio::io::AsyncWriteExt;

use super::{FileSystem, StoreLock, sibling_path};

/// Distinguishes temp files of concurrent writes within one process
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// [`FileSystem`] implementation over the host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn read_file_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    /// Writes to a temp file next to `path`, syncs it, then renames over the
    /// target so readers never see a half-written document.
    async fn write_file_string(&self, path: &Path, content: &str) -> io::Result<()> {
        let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let temp_path = sibling_path(path, &format!("{}-{}.tmp", std::process::id(), sequence));

        let mut temp_file = tokio::fs::File::create(&temp_path).await?;
        temp_file.write_all(content.as_bytes()).await?;
        temp_file.sync_all().await?;
        drop(temp_file);

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }
        Ok(())
    }

    async fn make_directory(&self, path: &Path, recursive: bool) -> io::Result<()> {
        if recursive {
            tokio::fs::create_dir_all(path).await
        } else {
            tokio::fs::create_dir(path).await
        }
    }

    async fn read_directory(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn lock(&self, path: &Path) -> io::Result<StoreLock> {
        // Separate lock file so the atomic rename never swaps out a locked inode
        let lock_path = sibling_path(path, "lock");

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let lock_file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)?;

            // Blocks until every other holder has dropped its guard
            lock_file.lock_exclusive()?;
            tracing::trace!("Acquired store lock {}", lock_path.display());
            Ok(StoreLock::held(lock_file))
        })
        .await
        .map_err(io::Error::other)?
    }
}

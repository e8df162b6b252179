//! Filesystem seam for the persistent state layer
//!
//! The run and metrics services never touch the OS directly. Everything goes
//! through [`FileSystem`], so tests can swap in [`MemoryFileSystem`].

mod memory;
mod os;

pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Narrow filesystem capability used by the services
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Check whether a file or directory exists at `path`
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Read a UTF-8 file into a string
    async fn read_file_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the contents of `path` with `content`
    ///
    /// The parent directory must already exist.
    async fn write_file_string(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Create a directory. With `recursive`, missing parents are created and an
    /// existing directory is not an error.
    async fn make_directory(&self, path: &Path, recursive: bool) -> io::Result<()>;

    /// Names of the entries directly inside `path`
    async fn read_directory(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Acquire an exclusive advisory lock guarding read-modify-write cycles on `path`
    ///
    /// The lock is held until the returned guard is dropped.
    async fn lock(&self, path: &Path) -> io::Result<StoreLock>;
}

/// Guard for an exclusive store lock
///
/// Dropping the guard closes the lock file, which releases the lock.
#[derive(Debug)]
pub struct StoreLock {
    _file: Option<std::fs::File>,
}

impl StoreLock {
    pub(crate) fn held(file: std::fs::File) -> Self {
        Self { _file: Some(file) }
    }

    /// A guard that protects nothing (in-process fakes)
    pub fn unlocked() -> Self {
        Self { _file: None }
    }
}

/// `dir/name.ext` -> `dir/name.ext.<suffix>`
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("store"));
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_path_appends_suffix() {
        let path = Path::new("/home/u/.config/ai-cli/metrics.json");
        assert_eq!(
            sibling_path(path, "lock"),
            PathBuf::from("/home/u/.config/ai-cli/metrics.json.lock")
        );
    }
}

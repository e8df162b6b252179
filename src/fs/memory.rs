//! In-memory filesystem for deterministic tests

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{FileSystem, StoreLock};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    writes: usize,
}

impl State {
    fn dir_exists(&self, path: &Path) -> bool {
        is_root(path) || self.dirs.contains(path)
    }
}

/// Filesystem that lives entirely in process memory
///
/// Mirrors the OS semantics the services rely on: writing needs an existing
/// parent directory, non-recursive `make_directory` fails on missing parents
/// or existing entries.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<State>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> io::Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| io::Error::other("memory filesystem lock poisoned"))
    }

    /// Seed a file, creating its parent directories
    pub fn insert_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let path = path.into();
        if let Ok(mut state) = self.state() {
            if let Some(parent) = path.parent() {
                for dir in ancestors(parent) {
                    state.dirs.insert(dir);
                }
            }
            state.files.insert(path, content.into());
        }
    }

    /// Current contents of a file, if any
    pub fn file(&self, path: &Path) -> Option<String> {
        self.state().ok()?.files.get(path).cloned()
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        self.state().map(|s| s.dir_exists(path)).unwrap_or(false)
    }

    /// Number of successful `write_file_string` calls so far
    pub fn write_count(&self) -> usize {
        self.state().map(|s| s.writes).unwrap_or(0)
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let state = self.state()?;
        Ok(state.files.contains_key(path) || state.dir_exists(path))
    }

    async fn read_file_string(&self, path: &Path) -> io::Result<String> {
        let state = self.state()?;
        state.files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    async fn write_file_string(&self, path: &Path, content: &str) -> io::Result<()> {
        let mut state = self.state()?;
        if state.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !state.dir_exists(parent) {
                return Err(not_found(parent));
            }
        }
        state.files.insert(path.to_path_buf(), content.to_string());
        state.writes += 1;
        Ok(())
    }

    async fn make_directory(&self, path: &Path, recursive: bool) -> io::Result<()> {
        let mut state = self.state()?;
        if state.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", path.display()),
            ));
        }
        if recursive {
            for dir in ancestors(path) {
                state.dirs.insert(dir);
            }
            return Ok(());
        }
        if state.dir_exists(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !state.dir_exists(parent) => {
                Err(not_found(parent))
            }
            _ => {
                state.dirs.insert(path.to_path_buf());
                Ok(())
            }
        }
    }

    async fn read_directory(&self, path: &Path) -> io::Result<Vec<String>> {
        let state = self.state()?;
        if !state.dir_exists(path) {
            return Err(not_found(path));
        }
        let children = state
            .dirs
            .iter()
            .chain(state.files.keys())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        Ok(children)
    }

    async fn lock(&self, _path: &Path) -> io::Result<StoreLock> {
        Ok(StoreLock::unlocked())
    }
}

fn is_root(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
        && path.has_root()
}

/// Every ancestor of `path` (inclusive) that is not the filesystem root
fn ancestors(path: &Path) -> Vec<PathBuf> {
    path.ancestors()
        .filter(|p| !p.as_os_str().is_empty() && !is_root(p))
        .map(Path::to_path_buf)
        .collect()
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("No such file or directory: {}", path.display()),
    )
}

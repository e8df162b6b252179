//! Shared helpers for integration tests against the real filesystem

use std::sync::Arc;

use ai_cli::config::AppPaths;
use ai_cli::fs::{FileSystem, OsFileSystem};
use tempfile::TempDir;

/// Temporary project and config directories
pub struct Sandbox {
    _root: TempDir,
    pub paths: AppPaths,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let project = root.path().join("project");
        std::fs::create_dir_all(&project).expect("Failed to create project dir");
        let paths = AppPaths::new(project, root.path().join("home/.config/ai-cli"));
        Self { _root: root, paths }
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::new(OsFileSystem::new())
    }
}

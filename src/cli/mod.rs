//! CLI command implementations

pub mod echo;
pub mod init;
pub mod metrics;
pub mod run;

use std::sync::Arc;

use ai_cli::config::{AppPaths, Config};
use ai_cli::fs::{FileSystem, OsFileSystem};
use ai_cli::metrics::MetricsRecorder;
use ai_cli::run::RunManager;

/// Services shared by every command of one invocation
pub struct Context {
    pub paths: AppPaths,
    pub config: Config,
    pub fs: Arc<dyn FileSystem>,
    pub runs: RunManager,
    pub metrics: MetricsRecorder,
}

impl Context {
    pub fn new(paths: AppPaths, config: Config) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(OsFileSystem::new());
        let runs = RunManager::new(fs.clone(), paths.clone());
        let metrics = MetricsRecorder::from_config(fs.clone(), &paths, &config);
        Self {
            paths,
            config,
            fs,
            runs,
            metrics,
        }
    }
}

//! Run lifecycle: creation, activation and current-run lookup

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use super::types::{CounterFile, RunInfo, RunInfoDocument, generate_run_name, iso_timestamp};
use crate::config::AppPaths;
use crate::error::{AppError, Result};
use crate::fs::FileSystem;

/// Subdirectories created inside every run directory
pub const RUN_SUBDIRECTORIES: [&str; 3] = ["outputs", "logs", "metrics"];

/// Metadata file written inside every run directory
pub const RUN_INFO_FILE: &str = "run-info.json";

/// Session object owning the "current run" for one process
///
/// The pointer file is the source of truth across processes. The manager
/// caches the resolved run for its own lifetime; call [`RunManager::refresh`]
/// to drop the cache and re-read the pointer.
pub struct RunManager {
    fs: Arc<dyn FileSystem>,
    paths: AppPaths,
    current: Option<RunInfo>,
}

impl RunManager {
    pub fn new(fs: Arc<dyn FileSystem>, paths: AppPaths) -> Self {
        Self {
            fs,
            paths,
            current: None,
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Create a new run directory tree and make it the current run
    ///
    /// The counter file is locked for the whole creation so concurrent
    /// invocations never hand out the same number.
    pub async fn create_run_directory(&mut self, prefix: Option<&str>) -> Result<RunInfo> {
        let counter_path = self.paths.counter_file();
        let _lock = self
            .fs
            .lock(&counter_path)
            .await
            .map_err(|e| AppError::io(&counter_path, e))?;

        let (sequential_number, counter) = self.read_sequential_number().await?;
        let now = Utc::now();
        let run_name = generate_run_name(prefix, sequential_number, now);

        let runs_dir = self.paths.runs_dir();
        let run_directory = self.resolve_run_dir(&run_name)?;

        self.make_dir(&runs_dir).await?;
        self.make_dir(&run_directory).await?;
        for sub in RUN_SUBDIRECTORIES {
            self.make_dir(&run_directory.join(sub)).await?;
        }

        self.write_sequential_number(sequential_number, counter).await?;

        tracing::info!("Created run directory: {}", run_directory.display());

        let info = RunInfo {
            run_name,
            run_directory,
            timestamp: iso_timestamp(now),
            sequential_number,
        };

        let metadata_path = info.run_directory.join(RUN_INFO_FILE);
        self.write_json(&metadata_path, &info, "run metadata").await?;

        self.current = Some(info.clone());
        self.write_pointer(Some(&info)).await?;
        Ok(info)
    }

    /// Directory of the current run
    pub async fn get_run_path(&mut self) -> Result<PathBuf> {
        let run = self.require_current().await?;
        Ok(run.run_directory.clone())
    }

    /// Path of `filename` inside the current run directory
    pub async fn get_run_file_path(&mut self, filename: &str) -> Result<PathBuf> {
        let run = self.require_current().await?;
        Ok(run.run_directory.join(filename))
    }

    /// The current run, or `None` when no run is active
    pub async fn get_current_run(&mut self) -> Result<Option<RunInfo>> {
        if self.current.is_none() {
            self.current = self.read_pointer().await?;
        }
        Ok(self.current.clone())
    }

    /// Make `info` the current run, for this process and for later invocations
    ///
    /// The run directory is not checked for existence.
    pub async fn set_current_run(&mut self, info: RunInfo) -> Result<()> {
        self.write_pointer(Some(&info)).await?;
        self.current = Some(info);
        Ok(())
    }

    /// Forget the current run
    pub async fn clear_current_run(&mut self) -> Result<()> {
        self.current = None;
        self.write_pointer(None).await
    }

    /// Drop the cached run and re-read the pointer file
    pub async fn refresh(&mut self) -> Result<Option<RunInfo>> {
        self.current = None;
        self.get_current_run().await
    }

    /// `<project>/runs/<name>`, rejecting names that would leave the runs directory
    pub fn resolve_run_dir(&self, name: &str) -> Result<PathBuf> {
        let candidate = Path::new(name);
        let mut components = candidate.components();
        let valid = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !valid {
            return Err(AppError::InvalidRunName(name.to_string()));
        }
        Ok(self.paths.runs_dir().join(candidate))
    }

    /// Read `run-info.json` from a run directory; missing or invalid metadata yields `None`
    pub async fn read_run_info(&self, run_dir: &Path) -> Result<Option<RunInfo>> {
        let metadata_path = run_dir.join(RUN_INFO_FILE);
        if !self.exists(&metadata_path).await? {
            return Ok(None);
        }
        match self.fs.read_file_string(&metadata_path).await {
            Ok(content) => Ok(RunInfoDocument::parse(&content)),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", metadata_path.display(), e);
                Ok(None)
            }
        }
    }

    /// Activate an existing run by name
    pub async fn use_run(&mut self, name: &str) -> Result<RunInfo> {
        let run_dir = self.resolve_run_dir(name)?;
        if !self.exists(&run_dir).await? {
            return Err(AppError::RunNotFound(name.to_string()));
        }
        let info = self
            .read_run_info(&run_dir)
            .await?
            .ok_or_else(|| AppError::RunNotFound(name.to_string()))?;

        self.set_current_run(info.clone()).await?;
        Ok(info)
    }

    /// All runs in the project that carry readable metadata, oldest first
    pub async fn list_runs(&self) -> Result<Vec<RunInfo>> {
        let runs_dir = self.paths.runs_dir();
        if !self.exists(&runs_dir).await? {
            return Ok(Vec::new());
        }

        let names = self
            .fs
            .read_directory(&runs_dir)
            .await
            .map_err(|e| AppError::io(&runs_dir, e))?;

        let mut runs = Vec::new();
        for name in names {
            if let Some(info) = self.read_run_info(&runs_dir.join(&name)).await? {
                runs.push(info);
            }
        }
        runs.sort_by(|a, b| {
            a.sequential_number
                .cmp(&b.sequential_number)
                .then_with(|| a.run_name.cmp(&b.run_name))
        });
        Ok(runs)
    }

    async fn require_current(&mut self) -> Result<&RunInfo> {
        if self.current.is_none() {
            self.current = self.read_pointer().await?;
        }
        self.current.as_ref().ok_or(AppError::NoActiveRun)
    }

    /// Next run number plus the parsed counter document (if any)
    async fn read_sequential_number(&self) -> Result<(u64, Option<CounterFile>)> {
        let path = self.paths.counter_file();
        if !self.exists(&path).await? {
            return Ok((1, None));
        }

        let content = self
            .fs
            .read_file_string(&path)
            .await
            .map_err(|e| AppError::io(&path, e))?;
        let counter: CounterFile =
            serde_json::from_str(&content).map_err(|source| AppError::Parse {
                path: path.clone(),
                source,
            })?;

        let next = counter
            .sequential_number
            .unwrap_or(0)
            .checked_add(1)
            .ok_or(AppError::CounterOverflow(path))?;
        Ok((next, Some(counter)))
    }

    /// Persist the number assigned to the run just created
    async fn write_sequential_number(
        &self,
        number: u64,
        existing: Option<CounterFile>,
    ) -> Result<()> {
        let mut counter = existing.unwrap_or_default();
        counter.sequential_number = Some(number);
        self.write_json(&self.paths.counter_file(), &counter, "run counter")
            .await
    }

    async fn read_pointer(&self) -> Result<Option<RunInfo>> {
        let pointer = self.paths.pointer_file();
        if !self.exists(&pointer).await? {
            return Ok(None);
        }

        let content = match self.fs.read_file_string(&pointer).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Unreadable run pointer {}: {}", pointer.display(), e);
                return Ok(None);
            }
        };
        Ok(RunInfoDocument::parse(&content))
    }

    /// Overwrite the pointer with `info`, or reset it to `{}` if it exists
    async fn write_pointer(&self, info: Option<&RunInfo>) -> Result<()> {
        let pointer = self.paths.pointer_file();
        let Some(info) = info else {
            if self.exists(&pointer).await? {
                self.write_string(&pointer, "{}").await?;
            }
            return Ok(());
        };

        self.make_dir(&self.paths.config_dir).await?;
        self.write_json(&pointer, info, "run pointer").await
    }

    async fn write_json<T: serde::Serialize>(
        &self,
        path: &Path,
        value: &T,
        what: &'static str,
    ) -> Result<()> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|source| AppError::Serialize { what, source })?;
        self.write_string(path, &content).await
    }

    async fn write_string(&self, path: &Path, content: &str) -> Result<()> {
        self.fs
            .write_file_string(path, content)
            .await
            .map_err(|e| AppError::io(path, e))
    }

    async fn make_dir(&self, path: &Path) -> Result<()> {
        self.fs
            .make_directory(path, true)
            .await
            .map_err(|e| AppError::io(path, e))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.fs.exists(path).await.map_err(|e| AppError::io(path, e))
    }
}

//! Metrics recorder - read-modify-write cycles over the JSON store
//!
//! Every mutation reads the whole history, changes it in memory, recomputes
//! the summary and writes the whole history back, all under an exclusive
//! store lock. Only the last record is ever mutated.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use super::report::{ReportFormat, ReportOutcome, render_console_report, render_json, render_jsonl};
use super::types::{ErrorInfo, LlmUsage, MetricsData, MetricsHistory, ModelParameters, RecordedTime};
use super::usage::count_tokens;
use crate::config::{AppPaths, Config};
use crate::error::{AppError, Result};
use crate::fs::FileSystem;
use crate::run::iso_timestamp;

/// Records per-command metrics into the shared store
pub struct MetricsRecorder {
    fs: Arc<dyn FileSystem>,
    store_path: PathBuf,
    /// Default location for `save_*` exports
    project_dir: PathBuf,
    /// Suppress progress lines (json output mode)
    quiet: bool,
}

impl MetricsRecorder {
    pub fn new(fs: Arc<dyn FileSystem>, store_path: PathBuf, project_dir: PathBuf) -> Self {
        Self {
            fs,
            store_path,
            project_dir,
            quiet: false,
        }
    }

    /// Recorder for the configured store location
    pub fn from_config(fs: Arc<dyn FileSystem>, paths: &AppPaths, config: &Config) -> Self {
        Self::new(fs, config.metrics_path(paths), paths.project_dir.clone())
            .with_quiet(config.is_json_output())
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Append a record for a command that is starting now
    pub async fn start_command(&self, command: &str, run_id: Option<&str>) -> Result<()> {
        let record = MetricsData::start(command, run_id.map(str::to_string));
        let _lock = self.lock().await?;

        let mut history = self.read_history().await?;
        history.runs.push(record);
        self.write_history(MetricsHistory::from_runs(history.runs)).await?;

        if !self.quiet {
            tracing::info!("[METRICS] Started command: {}", command);
        }
        Ok(())
    }

    /// Stamp end time and duration on the last record
    pub async fn end_command(&self) -> Result<()> {
        self.update_last(|run| {
            let now = RecordedTime::now();
            let elapsed = now.epoch_millis() - run.start_time.epoch_millis();
            run.end_time = Some(now);
            run.duration = Some(elapsed.max(0));
        })
        .await
    }

    pub async fn record_llm_usage(&self, usage: LlmUsage) -> Result<()> {
        self.update_last(move |run| run.llm_usage = Some(usage)).await
    }

    /// Mark the last record as failed
    pub async fn record_error(&self, error: &anyhow::Error) -> Result<()> {
        let info = ErrorInfo::from_error(error);
        self.update_last(move |run| {
            run.error = Some(info);
            run.success = false;
            run.end_time = Some(RecordedTime::now());
        })
        .await
    }

    /// Record response size with an estimated output token count
    pub async fn record_response(&self, response: &str) -> Result<()> {
        let length = response.chars().count() as u64;
        let tokens = count_tokens(response);
        self.update_last(move |run| {
            run.response_length = Some(length);
            run.output_tokens = Some(tokens);
        })
        .await
    }

    pub async fn record_model_parameters(&self, parameters: ModelParameters) -> Result<()> {
        self.update_last(move |run| run.model_parameters = Some(parameters))
            .await
    }

    /// Last record, if any
    pub async fn get_metrics(&self) -> Result<Option<MetricsData>> {
        Ok(self.read_history().await?.runs.pop())
    }

    pub async fn get_metrics_history(&self) -> Result<MetricsHistory> {
        self.read_history().await
    }

    /// Render or export the history
    ///
    /// JSON formats go to `output` when given, otherwise they are returned
    /// for printing. An empty store only produces a warning.
    pub async fn report_metrics(
        &self,
        format: ReportFormat,
        output: Option<&Path>,
    ) -> Result<ReportOutcome> {
        let history = self.read_history().await?;
        if history.is_empty() {
            tracing::warn!("[METRICS] No metrics data available");
            return Ok(ReportOutcome::Empty);
        }

        let content = match format {
            ReportFormat::Console => {
                return Ok(ReportOutcome::Rendered(render_console_report(&history)));
            }
            ReportFormat::Json => render_json(&history)?,
            ReportFormat::Jsonl => render_jsonl(&history)?,
        };

        match output {
            Some(path) => {
                self.write_document(path, &content).await?;
                tracing::info!("[METRICS] Report saved to {}", path.display());
                Ok(ReportOutcome::Written(path.to_path_buf()))
            }
            None => Ok(ReportOutcome::Rendered(content)),
        }
    }

    /// Reset the store to an empty history
    pub async fn clear_metrics(&self) -> Result<()> {
        let _lock = self.lock().await?;
        self.write_history(MetricsHistory::empty()).await
    }

    /// Export the last record (plus an export timestamp) to a standalone file
    ///
    /// Defaults to `<project>/metrics-<epoch-ms>.json`. Returns `None` when
    /// there is nothing to export.
    pub async fn save_command_metrics(&self, output: Option<&Path>) -> Result<Option<PathBuf>> {
        let Some(last) = self.get_metrics().await? else {
            return Ok(None);
        };

        let now = Utc::now();
        let mut document = serde_json::to_value(&last).map_err(|source| AppError::Serialize {
            what: "metrics record",
            source,
        })?;
        if let Some(fields) = document.as_object_mut() {
            fields.insert("timestamp".to_string(), iso_timestamp(now).into());
        }
        let content =
            serde_json::to_string_pretty(&document).map_err(|source| AppError::Serialize {
                what: "metrics record",
                source,
            })?;

        let path = output.map(Path::to_path_buf).unwrap_or_else(|| {
            self.project_dir
                .join(format!("metrics-{}.json", now.timestamp_millis()))
        });
        self.write_document(&path, &content).await?;
        Ok(Some(path))
    }

    /// Export the full history, defaulting to `<project>/metrics.json`
    pub async fn save_metrics(&self, output: Option<&Path>) -> Result<PathBuf> {
        let history = self.read_history().await?;
        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.project_dir.join("metrics.json"));

        self.write_document(&path, &render_json(&history)?).await?;
        tracing::info!("[METRICS] Report saved to {}", path.display());
        Ok(path)
    }

    /// Run `work` as a tracked command: start, record failure, end
    ///
    /// When `work` fails its error is returned as-is; bookkeeping failures on
    /// that path are only logged.
    pub async fn track<T, Fut>(
        &self,
        command: &str,
        run_id: Option<&str>,
        work: Fut,
    ) -> anyhow::Result<T>
    where
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.start_command(command, run_id).await?;

        match work.await {
            Ok(value) => {
                self.end_command().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(e) = self.record_error(&error).await {
                    tracing::warn!("Failed to record error metrics: {}", e);
                }
                if let Err(e) = self.end_command().await {
                    tracing::warn!("Failed to finish command metrics: {}", e);
                }
                Err(error)
            }
        }
    }

    /// Apply `change` to the last record; no-op on an empty store
    async fn update_last<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut MetricsData),
    {
        let _lock = self.lock().await?;
        let mut history = self.read_history().await?;

        let Some(last) = history.runs.last_mut() else {
            return Ok(());
        };
        change(last);
        self.write_history(MetricsHistory::from_runs(history.runs)).await
    }

    /// Full history; a missing, unreadable or corrupt store reads as empty
    async fn read_history(&self) -> Result<MetricsHistory> {
        let exists = self.fs.exists(&self.store_path).await.map_err(|e| {
            AppError::metrics("Failed to read metrics file", &self.store_path, e)
        })?;
        if !exists {
            return Ok(MetricsHistory::empty());
        }

        let content = match self.fs.read_file_string(&self.store_path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read metrics file {}: {}", self.store_path.display(), e);
                return Ok(MetricsHistory::empty());
            }
        };

        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(document) => Ok(MetricsHistory::from_document(&document)),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse metrics file {}, starting fresh: {}",
                    self.store_path.display(),
                    e
                );
                Ok(MetricsHistory::empty())
            }
        }
    }

    async fn write_history(&self, history: MetricsHistory) -> Result<()> {
        let content = render_json(&history)?;
        self.write_document(&self.store_path, &content).await
    }

    /// Write `content` to `path`, creating the parent directory if needed
    async fn write_document(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            let exists = self
                .fs
                .exists(dir)
                .await
                .map_err(|e| AppError::metrics("Failed to write metrics file", path, e))?;
            if !exists {
                self.fs
                    .make_directory(dir, true)
                    .await
                    .map_err(|e| AppError::metrics("Failed to create metrics directory", dir, e))?;
            }
        }

        self.fs
            .write_file_string(path, content)
            .await
            .map_err(|e| AppError::metrics("Failed to write metrics file", path, e))
    }

    async fn lock(&self) -> Result<crate::fs::StoreLock> {
        self.fs
            .lock(&self.store_path)
            .await
            .map_err(|e| AppError::metrics("Failed to lock metrics file", &self.store_path, e))
    }
}

//! Well-known file locations
//!
//! Project-local state (run counter, `runs/`) lives under the project
//! directory; per-user state (pointer file, metrics store, config) lives
//! under the config directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable that relocates the per-user config directory
pub const CONFIG_DIR_ENV: &str = "AI_CLI_CONFIG_DIR";

/// Resolved directories for one CLI invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Directory holding `.ai-cli-config.json` and `runs/`
    pub project_dir: PathBuf,

    /// Directory holding `current-run.json`, `metrics.json` and `config.toml`
    pub config_dir: PathBuf,
}

impl AppPaths {
    pub fn new(project_dir: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            config_dir: config_dir.into(),
        }
    }

    /// Resolve paths from CLI overrides, the environment and the home directory
    pub fn discover(project_dir: Option<&Path>, config_dir: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;

        let project_dir = match project_dir {
            Some(dir) => std::path::absolute(dir)
                .with_context(|| format!("Invalid project path: {}", dir.display()))?,
            None => cwd.clone(),
        };

        let config_dir = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => match std::env::var_os(CONFIG_DIR_ENV) {
                Some(dir) if !dir.is_empty() => PathBuf::from(dir),
                _ => Self::default_config_dir(&cwd),
            },
        };

        Ok(Self::new(project_dir, config_dir))
    }

    /// `~/.config/ai-cli`, falling back to `<fallback>/.config/ai-cli` without a home directory
    pub fn default_config_dir(fallback: &Path) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| fallback.to_path_buf())
            .join(".config")
            .join("ai-cli")
    }

    /// Project-local sequential counter
    pub fn counter_file(&self) -> PathBuf {
        self.project_dir.join(".ai-cli-config.json")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.project_dir.join("runs")
    }

    /// Cross-process current-run pointer
    pub fn pointer_file(&self) -> PathBuf {
        self.config_dir.join("current-run.json")
    }

    pub fn metrics_file(&self) -> PathBuf {
        self.config_dir.join("metrics.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

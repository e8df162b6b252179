//! Configuration file I/O operations

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use fs2::FileExt;

use super::{AppPaths, Config, OUTPUT_FORMAT_ENV, OutputFormat};

/// Default configuration content for `ai-cli init`
pub const DEFAULT_CONFIG: &str = r#"# ai-cli configuration
# =====================
#
# Per-user state (current run pointer, metrics store) lives next to this file.
# Project state (run counter, runs/) lives in the directory you run ai-cli from.

# Alternate metrics store. Relative paths resolve against this directory.
# metrics_file = "metrics.json"

# "text" (default) or "json". In json mode progress lines are suppressed so
# stdout can be piped. The OUTPUT_FORMAT environment variable takes precedence.
output_format = "text"

# Prefix applied by `ai-cli run new` when --prefix is not given.
# default_run_prefix = "experiment"
"#;

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `<config_dir>/config.toml`, falling back to defaults when it does
    /// not exist, then apply environment overrides.
    pub fn load(paths: &AppPaths) -> Result<Self> {
        let path = paths.config_file();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_output_override(std::env::var(OUTPUT_FORMAT_ENV).ok().as_deref());
        Ok(config)
    }

    /// Apply an `OUTPUT_FORMAT`-style override; unknown values are ignored
    pub fn apply_output_override(&mut self, value: Option<&str>) {
        let Some(value) = value else {
            return;
        };
        match OutputFormat::parse(value) {
            Some(format) => self.output_format = format,
            None => tracing::warn!("Ignoring unknown output format: {}", value),
        }
    }

    /// Write the commented default configuration to `path`
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "Configuration already exists: {}\nUse --force to overwrite.",
                path.display()
            );
        }
        write_locked(path, DEFAULT_CONFIG)
    }
}

/// Exclusive lock + temp file + rename
fn write_locked(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    // Lock file is separate from the config so the rename cannot drop the lock
    let lock_path = path.with_extension("toml.lock");
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

    lock_file
        .lock_exclusive()
        .with_context(|| "Failed to acquire config lock")?;

    let temp_path = path.with_extension("toml.tmp");
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

    temp_file
        .write_all(content.as_bytes())
        .with_context(|| "Failed to write config content")?;

    temp_file
        .sync_all()
        .with_context(|| "Failed to sync config file")?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename config file: {}", path.display()))?;

    Ok(())
}

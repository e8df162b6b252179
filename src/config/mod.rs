//! Configuration loading and well-known paths

mod io;
mod paths;

pub use io::DEFAULT_CONFIG;
pub use paths::AppPaths;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides [`Config::output_format`]
pub const OUTPUT_FORMAT_ENV: &str = "OUTPUT_FORMAT";

/// How commands present their results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// User configuration (`<config_dir>/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Alternate location for the metrics store
    pub metrics_file: Option<PathBuf>,

    /// Output format; `json` keeps stdout free of progress chatter
    pub output_format: OutputFormat,

    /// Prefix used by `run new` when none is given on the command line
    pub default_run_prefix: Option<String>,
}

impl Config {
    /// Metrics store path, honoring the configured override
    pub fn metrics_path(&self, paths: &AppPaths) -> PathBuf {
        match &self.metrics_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => paths.config_dir.join(path),
            None => paths.metrics_file(),
        }
    }

    pub fn is_json_output(&self) -> bool {
        self.output_format == OutputFormat::Json
    }
}

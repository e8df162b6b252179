//! Error types shared by the run and metrics services

use std::path::PathBuf;

/// Errors raised by the persistent state layer
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No current run could be resolved from the session cache or the pointer file
    #[error("No active run. Create one with `ai-cli run new` or activate one with `ai-cli run use <name>`")]
    NoActiveRun,

    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Run names must stay inside the project's `runs/` directory
    #[error("Invalid run name: {0}")]
    InvalidRunName(String),

    /// The project's run counter cannot be advanced any further
    #[error("Run counter exhausted: {0}")]
    CounterOverflow(PathBuf),

    /// Failure reading or writing the metrics store
    #[error("{message}: {path}")]
    Metrics {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A project file that must be valid JSON could not be parsed
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl AppError {
    /// Short, stable name of the error kind (stored in metrics records)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoActiveRun => "NoActiveRunError",
            Self::RunNotFound(_) => "RunNotFoundError",
            Self::InvalidRunName(_) => "InvalidRunNameError",
            Self::CounterOverflow(_) => "CounterOverflowError",
            Self::Metrics { .. } => "MetricsError",
            Self::Io { .. } => "IoError",
            Self::Parse { .. } => "ParseError",
            Self::Serialize { .. } => "SerializeError",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn metrics(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Metrics {
            message: message.into(),
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

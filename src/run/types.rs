//! Run metadata and the documents the run manager persists

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one run, stored as `run-info.json` and in the pointer file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    /// `[prefix-]NNNN-<timestamp>`, unique by construction
    pub run_name: String,

    /// Absolute path of the run directory
    pub run_directory: PathBuf,

    /// Creation time, ISO-8601 UTC with milliseconds
    pub timestamp: String,

    pub sequential_number: u64,
}

/// Lenient view of a pointer or `run-info.json` document
///
/// Any field may be missing; only documents carrying both a run name and a
/// run directory describe a run.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RunInfoDocument {
    run_name: Option<String>,
    run_directory: Option<PathBuf>,
    timestamp: Option<String>,
    sequential_number: Option<u64>,
}

impl RunInfoDocument {
    /// Parse `content`; malformed JSON or an incomplete document yields `None`
    pub(crate) fn parse(content: &str) -> Option<RunInfo> {
        let doc: RunInfoDocument = match serde_json::from_str(content) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("Ignoring unparsable run document: {}", e);
                return None;
            }
        };
        doc.into_run_info()
    }

    fn into_run_info(self) -> Option<RunInfo> {
        let run_name = self.run_name.filter(|n| !n.is_empty())?;
        let run_directory = self.run_directory.filter(|d| !d.as_os_str().is_empty())?;
        Some(RunInfo {
            run_name,
            run_directory,
            timestamp: self.timestamp.unwrap_or_default(),
            sequential_number: self.sequential_number.unwrap_or_default(),
        })
    }
}

/// Project-local counter file (`.ai-cli-config.json`)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CounterFile {
    #[serde(default)]
    pub sequential_number: Option<u64>,

    /// Keys written by other tools are carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// ISO-8601 UTC with millisecond precision, e.g. `2025-01-02T03:04:05.678Z`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build a run name: `[prefix-][NNNN-]<timestamp with ':' and '.' replaced by '-'>`
pub fn generate_run_name(
    prefix: Option<&str>,
    sequential_number: u64,
    at: DateTime<Utc>,
) -> String {
    let timestamp = iso_timestamp(at).replace([':', '.'], "-");
    let prefix = match prefix {
        Some(p) if !p.is_empty() => format!("{}-", p),
        _ => String::new(),
    };
    let seq = if sequential_number > 0 {
        format!("{:04}-", sequential_number)
    } else {
        String::new()
    };
    format!("{}{}{}", prefix, seq, timestamp)
}

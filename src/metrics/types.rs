//! Persisted metrics documents

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient;
use crate::error::AppError;

/// Point in time stored in a metrics record
///
/// New records always use ISO-8601 strings. Older stores may hold a
/// structured timestamp object carrying `epochMillis`, or bare epoch
/// milliseconds; all three are accepted and written back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedTime {
    Iso(DateTime<Utc>),
    Structured {
        #[serde(rename = "epochMillis")]
        epoch_millis: i64,
    },
    Millis(i64),
}

impl RecordedTime {
    pub fn now() -> Self {
        Self::Iso(Utc::now())
    }

    pub fn epoch_millis(&self) -> i64 {
        match self {
            Self::Iso(at) => at.timestamp_millis(),
            Self::Structured { epoch_millis } | Self::Millis(epoch_millis) => *epoch_millis,
        }
    }
}

impl From<DateTime<Utc>> for RecordedTime {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Iso(at)
    }
}

/// Process environment captured when a command starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Environment {
    /// Stored under `nodeVersion`, the key other readers of the store expect
    #[serde(rename = "nodeVersion", alias = "cliVersion", deserialize_with = "lenient::text")]
    pub cli_version: String,
    #[serde(deserialize_with = "lenient::text")]
    pub platform: String,
    #[serde(deserialize_with = "lenient::text")]
    pub cwd: String,
}

impl Environment {
    pub fn capture() -> Self {
        Self {
            cli_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            cwd: std::env::current_dir()
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_else(|_| ".".to_string()),
        }
    }
}

/// Token usage and estimated cost of one LLM call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmUsage {
    #[serde(deserialize_with = "lenient::text")]
    pub provider: String,
    #[serde(deserialize_with = "lenient::text")]
    pub model: String,
    #[serde(deserialize_with = "lenient::count")]
    pub input_tokens: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub output_tokens: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub thinking_tokens: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub total_tokens: u64,
    #[serde(deserialize_with = "lenient::amount")]
    pub estimated_cost: f64,
    #[serde(deserialize_with = "lenient::amount")]
    pub input_cost: f64,
    #[serde(deserialize_with = "lenient::amount")]
    pub output_cost: f64,
    #[serde(deserialize_with = "lenient::amount")]
    pub total_cost: f64,
}

/// Failure details attached to a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub message: String,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub stack: Option<String>,
}

impl ErrorInfo {
    /// Describe an error; domain errors keep their kind, everything else is `Error`
    pub fn from_error(error: &anyhow::Error) -> Self {
        let kind = error
            .downcast_ref::<AppError>()
            .map(AppError::kind)
            .unwrap_or("Error");
        let chain: Vec<String> = error.chain().skip(1).map(|c| c.to_string()).collect();

        Self {
            kind: kind.to_string(),
            message: error.to_string(),
            stack: (!chain.is_empty()).then(|| chain.join("\n")),
        }
    }
}

/// Sampling parameters sent with a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParameters {
    #[serde(
        default,
        deserialize_with = "lenient::optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub top_p: Option<f64>,
}

/// One record per command invocation
///
/// Decoding is forgiving field by field: an unexpected value falls back to
/// the field's default so one odd record never makes the store unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsData {
    #[serde(default, deserialize_with = "lenient::text")]
    pub command: String,
    pub start_time: RecordedTime,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<RecordedTime>,
    /// Milliseconds between start and end; older stores may hold negative values
    #[serde(
        default,
        deserialize_with = "lenient::optional_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<i64>,
    #[serde(
        default = "lenient::default_success",
        deserialize_with = "lenient::success"
    )]
    pub success: bool,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub run_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub environment: Environment,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub llm_usage: Option<LlmUsage>,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<ErrorInfo>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_length: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_tokens: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub model_parameters: Option<ModelParameters>,
}

impl MetricsData {
    /// Fresh record for a command that just started
    pub fn start(command: impl Into<String>, run_id: Option<String>) -> Self {
        Self {
            command: command.into(),
            start_time: RecordedTime::now(),
            end_time: None,
            duration: None,
            success: true,
            run_id,
            environment: Environment::capture(),
            llm_usage: None,
            error: None,
            response_length: None,
            output_tokens: None,
            model_parameters: None,
        }
    }
}

/// Aggregate for one provider or model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub commands: u64,
    pub tokens: u64,
    pub cost: f64,
}

/// Derived totals over every record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsSummary {
    pub total_commands: u64,
    pub successful_commands: u64,
    pub failed_commands: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Milliseconds
    pub average_duration: f64,
    pub provider_stats: BTreeMap<String, UsageStats>,
    pub model_stats: BTreeMap<String, UsageStats>,
}

/// The whole metrics store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    #[serde(default)]
    pub runs: Vec<MetricsData>,
    #[serde(default)]
    pub summary: MetricsSummary,
}

impl MetricsHistory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild a history from a parsed store document
    ///
    /// Records are decoded one at a time so a record that still cannot be
    /// read (no usable `startTime`) is skipped without losing the others.
    /// The stored summary is ignored and recomputed.
    pub fn from_document(document: &Value) -> Self {
        let records = document
            .get("runs")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut runs = Vec::with_capacity(records.len());
        for record in records {
            match MetricsData::deserialize(record) {
                Ok(run) => runs.push(run),
                Err(e) => tracing::warn!("Skipping unreadable metrics record: {}", e),
            }
        }
        Self::from_runs(runs)
    }

    /// History whose summary is computed from `runs`
    pub fn from_runs(runs: Vec<MetricsData>) -> Self {
        let summary = super::summary::calculate_summary(&runs);
        Self { runs, summary }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

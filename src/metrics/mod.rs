//! Metrics accumulator for CLI commands
//!
//! Keeps one record per command invocation plus a derived summary in a
//! single JSON document (`~/.config/ai-cli/metrics.json` by default).
//!
//! # Usage
//!
//! ```ignore
//! let metrics = MetricsRecorder::from_config(fs, &paths, &config);
//!
//! metrics.start_command("generate", Some(&run.run_name)).await?;
//! let usage = extract_llm_usage(&response, "openai", "gpt-4o-mini");
//! metrics.record_llm_usage(usage).await?;
//! metrics.end_command().await?;
//! ```

mod lenient;
mod recorder;
mod report;
mod summary;
mod types;
mod usage;

pub use recorder::MetricsRecorder;
pub use report::{
    ReportFormat, ReportOutcome, format_thousands, render_console_report, render_json, render_jsonl,
};
pub use summary::calculate_summary;
pub use types::{
    Environment, ErrorInfo, LlmUsage, MetricsData, MetricsHistory, MetricsSummary, ModelParameters,
    RecordedTime, UsageStats,
};
pub use usage::{
    FALLBACK_COST_PER_TOKEN, cost_per_token, count_tokens, estimate_cost, extract_llm_usage,
};

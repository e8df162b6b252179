//! Rendering metrics history as console text, JSON or JSON Lines

use std::fmt::Write as _;
use std::path::PathBuf;

use super::types::{MetricsHistory, UsageStats};
use crate::error::{AppError, Result};

/// Output format for `report_metrics`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Human-readable summary
    Console,
    /// Full history, pretty-printed
    Json,
    /// One record per line, summary excluded
    Jsonl,
}

/// What a report call produced
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// No records; nothing rendered or written
    Empty,
    /// Rendered report for the caller to print
    Rendered(String),
    /// Report written to this file
    Written(PathBuf),
}

/// Human-readable report over the summary
pub fn render_console_report(history: &MetricsHistory) -> String {
    let summary = &history.summary;
    let mut out = String::new();

    let _ = writeln!(out, "=== METRICS REPORT ===");
    let _ = writeln!(out, "Total Commands: {}", summary.total_commands);
    let _ = writeln!(out, "Successful: {}", summary.successful_commands);
    let _ = writeln!(out, "Failed: {}", summary.failed_commands);
    let _ = writeln!(out, "Total Tokens: {}", format_thousands(summary.total_tokens));
    let _ = writeln!(out, "Total Cost: ${:.5}", summary.total_cost);
    let _ = writeln!(out, "Average Duration: {:.0}ms", summary.average_duration);

    let _ = writeln!(out, "\nProvider Statistics:");
    for (provider, stats) in &summary.provider_stats {
        let _ = writeln!(out, "  {}", stats_line(provider, stats));
    }

    let _ = writeln!(out, "\nModel Statistics:");
    for (model, stats) in &summary.model_stats {
        let _ = writeln!(out, "  {}", stats_line(model, stats));
    }

    out
}

fn stats_line(name: &str, stats: &UsageStats) -> String {
    format!(
        "{}: {} commands, {} tokens, ${:.5}",
        name,
        stats.commands,
        format_thousands(stats.tokens),
        stats.cost
    )
}

/// Full history as 2-space indented JSON
pub fn render_json(history: &MetricsHistory) -> Result<String> {
    serde_json::to_string_pretty(history).map_err(|source| AppError::Serialize {
        what: "metrics history",
        source,
    })
}

/// One compact JSON record per line, no trailing newline
pub fn render_jsonl(history: &MetricsHistory) -> Result<String> {
    let lines = history
        .runs
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|source| AppError::Serialize {
            what: "metrics record",
            source,
        })?;
    Ok(lines.join("\n"))
}

/// `1234567` -> `1,234,567`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::{LlmUsage, MetricsData};

    fn history() -> MetricsHistory {
        let mut first = MetricsData::start("generate", Some("run-1".to_string()));
        first.duration = Some(40);
        first.llm_usage = Some(LlmUsage {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            total_tokens: 12_345,
            total_cost: 0.0125,
            ..LlmUsage::default()
        });
        let mut second = MetricsData::start("plan", None);
        second.success = false;
        second.duration = Some(20);
        MetricsHistory::from_runs(vec![first, second])
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_console_report_lists_totals_and_breakdowns() {
        let report = render_console_report(&history());

        assert!(report.starts_with("=== METRICS REPORT ===\n"));
        assert!(report.contains("Total Commands: 2\n"));
        assert!(report.contains("Successful: 1\n"));
        assert!(report.contains("Failed: 1\n"));
        assert!(report.contains("Total Tokens: 12,345\n"));
        assert!(report.contains("Total Cost: $0.01250\n"));
        assert!(report.contains("Average Duration: 30ms\n"));
        assert!(report.contains("  openai: 1 commands, 12,345 tokens, $0.01250\n"));
        assert!(report.contains("  gpt-4o: 1 commands, 12,345 tokens, $0.01250\n"));
    }

    #[test]
    fn test_jsonl_has_one_line_per_record_without_summary() {
        let history = history();
        let jsonl = render_jsonl(&history).unwrap();

        let lines: Vec<&str> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!jsonl.ends_with('\n'));
        assert!(!jsonl.contains("totalCommands"));

        let parsed: MetricsData = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, history.runs[0]);
    }

    #[test]
    fn test_json_is_pretty_with_two_space_indent() {
        let json = render_json(&history()).unwrap();
        assert!(json.starts_with("{\n  \"runs\": ["));
        let parsed: MetricsHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.runs.len(), 2);
        assert_eq!(parsed.summary.total_commands, 2);
    }
}

//! Summary recomputation over the full record list

use super::types::{LlmUsage, MetricsData, MetricsSummary, UsageStats};

/// Fold every record into a fresh summary
///
/// Always computed from scratch so the stored summary matches the records.
pub fn calculate_summary(runs: &[MetricsData]) -> MetricsSummary {
    let mut summary = MetricsSummary {
        total_commands: runs.len() as u64,
        ..MetricsSummary::default()
    };
    let mut total_duration: i64 = 0;

    for run in runs {
        if run.success {
            summary.successful_commands += 1;
        }
        total_duration = total_duration.saturating_add(run.duration.unwrap_or(0));

        let Some(usage) = &run.llm_usage else {
            continue;
        };
        summary.total_tokens += usage.total_tokens;
        summary.total_cost += usage.total_cost;

        let provider = summary.provider_stats.entry(usage.provider.clone()).or_default();
        accumulate(provider, usage);
        let model = summary.model_stats.entry(usage.model.clone()).or_default();
        accumulate(model, usage);
    }

    summary.failed_commands = summary.total_commands - summary.successful_commands;
    summary.average_duration = if summary.total_commands > 0 {
        total_duration as f64 / summary.total_commands as f64
    } else {
        0.0
    };
    summary
}

fn accumulate(stats: &mut UsageStats, usage: &LlmUsage) {
    stats.commands += 1;
    stats.tokens += usage.total_tokens;
    stats.cost += usage.total_cost;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        success: bool,
        duration: Option<i64>,
        usage: Option<(&str, &str, u64, f64)>,
    ) -> MetricsData {
        let mut data = MetricsData::start("generate", None);
        data.success = success;
        data.duration = duration;
        data.llm_usage = usage.map(|(provider, model, tokens, cost)| LlmUsage {
            provider: provider.to_string(),
            model: model.to_string(),
            total_tokens: tokens,
            total_cost: cost,
            ..LlmUsage::default()
        });
        data
    }

    #[test]
    fn test_empty_summary_has_zero_average() {
        let summary = calculate_summary(&[]);
        assert_eq!(summary, MetricsSummary::default());
        assert_eq!(summary.average_duration, 0.0);
    }

    #[test]
    fn test_summary_counts_and_breakdowns() {
        let runs = vec![
            record(true, Some(100), Some(("openai", "gpt-4o", 100, 0.5))),
            record(false, Some(300), Some(("openai", "gpt-4o-mini", 50, 0.25))),
            record(true, None, Some(("anthropic", "claude-3-5-haiku", 10, 0.125))),
            record(true, Some(200), None),
        ];

        let summary = calculate_summary(&runs);

        assert_eq!(summary.total_commands, 4);
        assert_eq!(summary.successful_commands, 3);
        assert_eq!(summary.failed_commands, 1);
        assert_eq!(summary.total_tokens, 160);
        assert_eq!(summary.total_cost, 0.875);
        assert_eq!(summary.average_duration, 150.0);

        let openai = &summary.provider_stats["openai"];
        assert_eq!((openai.commands, openai.tokens, openai.cost), (2, 150, 0.75));
        assert_eq!(summary.provider_stats["anthropic"].commands, 1);
        assert_eq!(summary.model_stats.len(), 3);
        assert_eq!(summary.model_stats["gpt-4o-mini"].tokens, 50);
    }
}

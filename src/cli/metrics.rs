//! Metrics commands

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use ai_cli::metrics::{ReportFormat, ReportOutcome, extract_llm_usage, format_thousands};

use super::Context;

/// Print or export the metrics report
pub async fn report_command(
    ctx: &Context,
    format: ReportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    match ctx.metrics.report_metrics(format, output.as_deref()).await? {
        ReportOutcome::Empty => {
            if !ctx.config.is_json_output() {
                println!("No metrics recorded yet.");
            }
        }
        ReportOutcome::Rendered(content) => println!("{}", content.trim_end()),
        ReportOutcome::Written(path) => {
            if !ctx.config.is_json_output() {
                println!("Report saved to {}", path.display());
            }
        }
    }
    Ok(())
}

/// Reset the metrics store
pub async fn clear_command(ctx: &Context) -> Result<()> {
    ctx.metrics.clear_metrics().await?;
    if !ctx.config.is_json_output() {
        println!("Cleared metrics: {}", ctx.metrics.store_path().display());
    }
    Ok(())
}

/// Print the most recent record as JSON
pub async fn last_command(ctx: &Context) -> Result<()> {
    match ctx.metrics.get_metrics().await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("null"),
    }
    Ok(())
}

/// Export the full history, or only the last record with `last`
pub async fn save_command(ctx: &Context, output: Option<PathBuf>, last: bool) -> Result<()> {
    let saved = if last {
        ctx.metrics.save_command_metrics(output.as_deref()).await?
    } else {
        Some(ctx.metrics.save_metrics(output.as_deref()).await?)
    };

    match saved {
        Some(path) => println!("Saved: {}", path.display()),
        None => println!("No metrics recorded yet."),
    }
    Ok(())
}

/// Extract usage from a saved provider response and attach it to the last record
pub async fn usage_command(ctx: &Context, provider: &str, model: &str, file: &Path) -> Result<()> {
    let content = ctx
        .fs
        .read_file_string(file)
        .await
        .with_context(|| format!("Failed to read response file: {}", file.display()))?;
    let response: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse response file: {}", file.display()))?;

    let usage = extract_llm_usage(&response, provider, model);
    ctx.metrics.record_llm_usage(usage.clone()).await?;

    if ctx.config.is_json_output() {
        println!("{}", serde_json::to_string_pretty(&usage)?);
        return Ok(());
    }

    println!("Provider:      {}", usage.provider);
    println!("Model:         {}", usage.model);
    println!(
        "Tokens:        {} in / {} out / {} thinking / {} total",
        format_thousands(usage.input_tokens),
        format_thousands(usage.output_tokens),
        format_thousands(usage.thinking_tokens),
        format_thousands(usage.total_tokens)
    );
    println!("Est. Cost:     ${:.5}", usage.total_cost);
    Ok(())
}

//! Run management commands

use anyhow::{Context as _, Result};

use ai_cli::run::RunInfo;

use super::Context;

/// Create a run and make it current
pub async fn new_command(ctx: &mut Context, prefix: Option<String>) -> Result<()> {
    let prefix = prefix.or_else(|| ctx.config.default_run_prefix.clone());
    let info = ctx
        .runs
        .create_run_directory(prefix.as_deref())
        .await
        .context("Failed to create run")?;
    print_run(ctx, &info)
}

/// Switch the active run by name
pub async fn use_command(ctx: &mut Context, name: &str) -> Result<()> {
    let info = ctx.runs.use_run(name).await?;
    if ctx.config.is_json_output() {
        return print_run(ctx, &info);
    }
    println!("Now using run: {}", info.run_name);
    Ok(())
}

/// Show the current run
pub async fn current_command(ctx: &mut Context) -> Result<()> {
    match ctx.runs.get_current_run().await? {
        Some(info) => print_run(ctx, &info),
        None if ctx.config.is_json_output() => {
            println!("null");
            Ok(())
        }
        None => {
            println!("No active run.");
            Ok(())
        }
    }
}

/// List the project's runs, marking the current one
pub async fn list_command(ctx: &mut Context) -> Result<()> {
    let runs = ctx.runs.list_runs().await?;

    if ctx.config.is_json_output() {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No runs found in {}", ctx.paths.runs_dir().display());
        return Ok(());
    }

    let current = ctx.runs.get_current_run().await?.map(|r| r.run_name);

    println!("{:<2} {:>6} {:<24} {}", "", "SEQ", "CREATED", "NAME");
    println!("{}", "-".repeat(72));
    for run in &runs {
        let marker = if current.as_deref() == Some(run.run_name.as_str()) {
            "*"
        } else {
            ""
        };
        println!(
            "{:<2} {:>6} {:<24} {}",
            marker, run.sequential_number, run.timestamp, run.run_name
        );
    }
    println!();
    println!("Total: {} run(s)", runs.len());
    Ok(())
}

/// Clear the current-run pointer
pub async fn clear_command(ctx: &mut Context) -> Result<()> {
    ctx.runs.clear_current_run().await?;
    if !ctx.config.is_json_output() {
        println!("Cleared current run.");
    }
    Ok(())
}

/// Print the current run directory, or a file path inside it
pub async fn path_command(ctx: &mut Context, file: Option<&str>) -> Result<()> {
    let path = match file {
        Some(name) => ctx.runs.get_run_file_path(name).await?,
        None => ctx.runs.get_run_path().await?,
    };
    println!("{}", path.display());
    Ok(())
}

fn print_run(ctx: &Context, info: &RunInfo) -> Result<()> {
    if ctx.config.is_json_output() {
        println!("{}", serde_json::to_string_pretty(info)?);
        return Ok(());
    }

    println!("Run:           {}", info.run_name);
    println!("Directory:     {}", info.run_directory.display());
    println!("Created:       {}", info.timestamp);
    println!("Sequence:      {}", info.sequential_number);
    Ok(())
}

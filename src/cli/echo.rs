//! Echo command: the smallest tracked command
//!
//! Prints its input and, when a run is active, stores it under the run's
//! `outputs/` directory.

use anyhow::{Context as _, Result};
use chrono::Utc;

use super::Context;

pub async fn echo_command(ctx: &mut Context, text: &str) -> Result<()> {
    let run = ctx.runs.get_current_run().await?;
    let run_id = run.as_ref().map(|r| r.run_name.clone());

    let fs = ctx.fs.clone();
    let work = async {
        println!("{}", text);

        if let Some(run) = &run {
            let path = run
                .run_directory
                .join("outputs")
                .join(format!("echo-{}.txt", Utc::now().timestamp_millis()));
            fs.make_directory(&run.run_directory.join("outputs"), true)
                .await
                .with_context(|| format!("Failed to prepare {}", run.run_directory.display()))?;
            fs.write_file_string(&path, text)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::debug!("Saved echo output to {}", path.display());
        }
        Ok::<_, anyhow::Error>(())
    };

    ctx.metrics.track("echo", run_id.as_deref(), work).await?;
    ctx.metrics.record_response(text).await?;
    Ok(())
}

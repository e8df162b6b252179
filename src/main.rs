use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ai_cli::config::{AppPaths, Config};
use ai_cli::metrics::ReportFormat;

mod cli;

#[derive(Parser)]
#[command(name = "ai-cli")]
#[command(about = "Orchestrate LLM prompt workflows with persistent runs and usage metrics")]
#[command(version)]
struct Cli {
    /// Project directory holding runs/ (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Per-user state directory (defaults to ~/.config/ai-cli or $AI_CLI_CONFIG_DIR)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Start a new run with this name prefix before executing the command
    #[arg(long, global = true, value_name = "PREFIX")]
    run: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Prefix for a run created before the command executes
    ///
    /// `run new` creates its own run and takes `--run` as its prefix instead,
    /// so no extra run is created for it.
    fn startup_run_prefix(&self) -> Option<&str> {
        if matches!(
            self.command,
            Commands::Run {
                action: RunAction::New { .. }
            }
        ) {
            return None;
        }
        self.run.as_deref()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config.toml into the config directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Manage runs (named working directories for outputs, logs and metrics)
    Run {
        #[command(subcommand)]
        action: RunAction,
    },

    /// Inspect and export recorded command metrics
    Metrics {
        #[command(subcommand)]
        action: MetricsAction,
    },

    /// Print text (saved into the current run's outputs/ when a run is active)
    Echo {
        /// Text to echo
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[derive(Subcommand)]
enum RunAction {
    /// Create a new run and make it current
    New {
        /// Name prefix for the run
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Switch the active run by name
    Use {
        /// Name of the run to activate
        name: String,
    },

    /// Show the current run
    Current,

    /// List runs in the project
    List,

    /// Clear the current run
    Clear,

    /// Print the current run directory, or a file path inside it
    Path {
        /// File name relative to the run directory
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum MetricsAction {
    /// Report recorded metrics
    Report {
        #[arg(long, value_enum, default_value = "console")]
        format: ReportFormat,

        /// Write json/jsonl output to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete all recorded metrics
    Clear,

    /// Print the most recent record as JSON
    Last,

    /// Save the metrics history (or only the last record) to a file
    Save {
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save only the most recent record
        #[arg(long)]
        last: bool,
    },

    /// Record LLM usage from a saved provider response onto the last record
    Usage {
        #[arg(long)]
        provider: String,

        #[arg(long)]
        model: String,

        /// JSON file containing the provider response
        response: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = AppPaths::discover(cli.path.as_deref(), cli.config_dir.as_deref())?;
    let config = Config::load(&paths)?;
    let mut ctx = cli::Context::new(paths, config);

    if let Some(prefix) = cli.startup_run_prefix() {
        let prefix = Some(prefix).filter(|p| !p.is_empty());
        ctx.runs.create_run_directory(prefix).await?;
    }

    match cli.command {
        Commands::Init { force } => {
            cli::init::init_command(&ctx.paths, force).await?;
        }
        Commands::Run { action } => match action {
            RunAction::New { prefix } => {
                cli::run::new_command(&mut ctx, prefix.or(cli.run)).await?
            }
            RunAction::Use { name } => cli::run::use_command(&mut ctx, &name).await?,
            RunAction::Current => cli::run::current_command(&mut ctx).await?,
            RunAction::List => cli::run::list_command(&mut ctx).await?,
            RunAction::Clear => cli::run::clear_command(&mut ctx).await?,
            RunAction::Path { file } => cli::run::path_command(&mut ctx, file.as_deref()).await?,
        },
        Commands::Metrics { action } => match action {
            MetricsAction::Report { format, output } => {
                cli::metrics::report_command(&ctx, format, output).await?
            }
            MetricsAction::Clear => cli::metrics::clear_command(&ctx).await?,
            MetricsAction::Last => cli::metrics::last_command(&ctx).await?,
            MetricsAction::Save { output, last } => {
                cli::metrics::save_command(&ctx, output, last).await?
            }
            MetricsAction::Usage {
                provider,
                model,
                response,
            } => cli::metrics::usage_command(&ctx, &provider, &model, &response).await?,
        },
        Commands::Echo { text } => {
            cli::echo::echo_command(&mut ctx, &text.join(" ")).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flag_creates_startup_run() {
        let cli = Cli::try_parse_from(["ai-cli", "--run", "exp", "echo", "hi"]).unwrap();
        assert_eq!(cli.startup_run_prefix(), Some("exp"));

        let cli = Cli::try_parse_from(["ai-cli", "run", "list"]).unwrap();
        assert_eq!(cli.startup_run_prefix(), None);
    }

    #[test]
    fn test_run_new_does_not_create_a_second_run() {
        let cli = Cli::try_parse_from(["ai-cli", "--run", "exp", "run", "new"]).unwrap();

        assert_eq!(cli.startup_run_prefix(), None);
        assert_eq!(cli.run.as_deref(), Some("exp"));
    }
}

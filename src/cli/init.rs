//! Init command implementation

use anyhow::Result;

use ai_cli::config::{AppPaths, Config};

/// Write a commented default `config.toml` into the config directory
pub async fn init_command(paths: &AppPaths, force: bool) -> Result<()> {
    let config_path = paths.config_file();
    Config::write_default(&config_path, force)?;
    println!("Created: {}", config_path.display());
    Ok(())
}

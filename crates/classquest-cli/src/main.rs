//! `classquest` command-line tool.
//!
//! Loads `classquest-config.yaml` (or built-in defaults when the file does
//! not exist), installs structured logging, and runs one command against a
//! ClassQuest document.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments
//! 2. Load configuration and apply environment overrides
//! 3. Initialize structured logging (tracing) on stderr
//! 4. Run the command and print its output on stdout

mod cli;
mod commands;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use classquest_core::ClassQuestConfig;
use classquest_core::config::LoggingConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, from_file) = load_config(&cli.config)?;
    init_tracing(&config.logging, cli.log_json);
    info!(
        config = %cli.config.display(),
        from_file,
        document = %config.storage.document_path.display(),
        blob_dir = %config.storage.blob_dir.display(),
        "Configuration loaded"
    );

    let output = commands::run(cli.command, &config).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Load the config file, or defaults when it does not exist.
fn load_config(path: &Path) -> anyhow::Result<(ClassQuestConfig, bool)> {
    if !path.exists() {
        let mut config = ClassQuestConfig::default();
        config.storage.apply_env_overrides();
        return Ok((config, false));
    }
    let config = ClassQuestConfig::from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok((config, true))
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig, force_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if force_json || logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

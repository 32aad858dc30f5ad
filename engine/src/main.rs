//! Argus binary entry point

use anyhow::Result;
use argus_engine::cli::{Cli, Command};
use argus_engine::config::Config;
use argus_engine::{handlers, telemetry};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_or_create()?,
    };

    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    telemetry::init_telemetry_with_level(log_level);

    let exit_code = match cli.command {
        Command::Review {
            file,
            staged,
            recent,
            workflow,
            format,
            output,
            strict,
        } => {
            let format = if cli.json { "json".to_string() } else { format };
            handlers::handle_review(
                &config, file, staged, recent, &workflow, &format, output, strict,
            )
            .await?
        }
        Command::Workflow { action } => handlers::handle_workflow(&config, action, cli.json).await?,
        Command::Agents => handlers::handle_agents(&config, cli.json).await?,
        Command::Memory { action } => handlers::handle_memory(&config, action).await?,
        Command::Config { action } => handlers::handle_config(&config, action)?,
    };

    std::process::exit(exit_code);
}

//! ffexport command line
//!
//! ```bash
//! ffexport plan --job job.toml
//! ffexport run --job job.toml --json
//! ffexport cleanup
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use ffexport::cli::{commands, Cli, Commands};
use ffexport::config_initialization::initialize_configuration_hierarchy;
use ffexport::ports::ConfigPort;
use ffexport::utils::logging::{init_logging, LoggingConfig};
use ffexport::DefaultAppContainer;

/// Main entry point for the ffexport CLI
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_adapter = initialize_configuration_hierarchy(&cli)?;
    let config = config_adapter.config();

    init_logging(&LoggingConfig::from_strings(
        &config.log_level,
        &config.log_format,
    )?);
    if let Some(path) = config_adapter.config_file_path() {
        debug!(path = %path.display(), "Using configuration file");
    }

    let container = DefaultAppContainer::new(config)?;

    match &cli.command {
        Commands::Run(args) => {
            info!("Executing run command");
            commands::run(args, &container).await?;
        }
        Commands::Plan(args) => {
            debug!("Executing plan command");
            commands::plan(args, &container, config).await?;
        }
        Commands::Cleanup => {
            info!("Executing cleanup command");
            commands::cleanup(&container).await?;
        }
    }

    Ok(())
}

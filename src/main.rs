//! commflag CLI
//!
//! Flags commercial break candidates in a recording by running silence
//! detection over its audio and black-frame and scene-change detection over
//! its video.
//!
//! # Usage
//!
//! ```bash
//! commflag analyze --file /srv/recordings/1001_20240101.ts --json
//! commflag analyze --job-id 42 --config /etc/commflag.toml
//! commflag synth --duration 120 --queue-capacity 64
//! commflag devices
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use commflag::app::DefaultAppContainer;
use commflag::cli::{commands, Cli, Commands};
use commflag::config_initialization::{initialize_configuration, ConfigOverrides};
use commflag::error::{CommFlagError, EXIT_FAILURE, EXIT_OK};
use commflag::utils::logging::{LoggingConfig, LoggingSystem};

/// Main entry point for the commflag CLI
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingSystem::new(LoggingConfig {
        level: cli.log_level,
        format: cli.log_format,
        ..LoggingConfig::default()
    });
    if let Err(e) = logging.initialize() {
        eprintln!("{}", e);
    }
    logging.log_system_info();

    match run(cli).await {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(err) => {
            let code = err
                .downcast_ref::<CommFlagError>()
                .map(CommFlagError::exit_code)
                .unwrap_or(EXIT_FAILURE);
            debug!("Exiting with code {}", code);
            eprintln!("Error: {:#}", err);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = match &cli.command {
        Commands::Analyze(args) => args.pipeline.overrides(),
        Commands::Synth(args) => args.pipeline.overrides(),
        Commands::Devices(args) => ConfigOverrides {
            single_device_policy: args.single_device_policy,
            ..ConfigOverrides::default()
        },
    };

    let config = initialize_configuration(cli.config.as_deref(), &overrides)
        .map_err(CommFlagError::from)
        .context("Failed to load configuration")?;
    let container = DefaultAppContainer::new(config);

    match cli.command {
        Commands::Analyze(args) => {
            info!("Executing analyze command");
            commands::analyze(&container, args).await?;
        }
        Commands::Synth(args) => {
            info!("Executing synth command");
            commands::synth(&container, args).await?;
        }
        Commands::Devices(args) => {
            commands::devices(&container, args)?;
        }
    }

    Ok(())
}

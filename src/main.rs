// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! opchain - configuration-driven operation pipelines
//!
//! Run, validate and explore pipelines of operations over JSON values.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opchain::cli::run::RunOptions;
use opchain::cli::{Cli, Commands};
use opchain::{EngineConfig, OpchainError, OperationRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let config = match cli.config {
        Some(ref path) => EngineConfig::load_from(path)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
            EngineConfig::load(&cwd)?
        }
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.as_str().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    opchain::utils::init_colors();
    let registry = OperationRegistry::from_config(&config).map_err(OpchainError::from)?;
    OperationRegistry::set_global(registry);

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            pipeline,
            input,
            context,
            format,
            log,
            timeout_secs,
        } => {
            let options = RunOptions {
                input,
                context,
                format,
                log,
                timeout_secs,
                verbose: cli.verbose,
            };
            opchain::cli::run::run(pipeline, options).await
        }
        Commands::Validate { pipeline, format } => {
            opchain::cli::validate::run(pipeline, format, cli.verbose).await
        }
        Commands::List { category, format } => {
            opchain::cli::list::run(category, format, cli.verbose).await
        }
        Commands::Describe { name, format } => opchain::cli::describe::run(name, format).await,
        Commands::Watch {
            pipeline,
            input,
            debounce,
        } => opchain::cli::watch::run(pipeline, input, debounce, cli.verbose).await,
        Commands::Init { path, force } => opchain::cli::init::run(path, force, cli.verbose).await,
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for opchain.

pub mod describe;
pub mod init;
pub mod input;
pub mod list;
pub mod run;
pub mod validate;
pub mod watch;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::operations::Category;

/// Config-driven value pipelines
///
/// Chain registered operations over a JSON value.
#[derive(Parser, Debug)]
#[clap(
    name = "opchain",
    version,
    about = "Run configuration-driven pipelines of operations over JSON values",
    long_about = None,
    after_help = "Examples:\n\
        opchain init                               Write a starter pipeline\n\
        opchain run pipeline.json -i '\"  Hi \"'     Run a pipeline on a value\n\
        opchain validate pipeline.json             Check a pipeline without running it\n\
        opchain describe extract_field             Show an operation's config\n\n\
        See 'opchain <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Engine config file (default: ./opchain.toml, then the user config dir)
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a pipeline on an input value
    Run {
        /// Pipeline file (.json, .yaml or .yml)
        pipeline: PathBuf,

        /// Input: a JSON literal, a file, or a glob of files (default: null)
        #[clap(short, long)]
        input: Option<String>,

        /// Initial shared data as a JSON object
        #[clap(long)]
        context: Option<String>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Print the execution log
        #[clap(long)]
        log: bool,

        /// Abort the run after this many seconds
        #[clap(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
    },

    /// Validate a pipeline without running it
    Validate {
        /// Pipeline file to validate
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List registered operations
    List {
        /// Only show one category
        #[clap(short, long, value_parser = parse_category)]
        category: Option<Category>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Describe an operation's config and usage
    Describe {
        /// Operation name or alias
        name: String,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Watch mode - re-run a pipeline when files change
    Watch {
        /// Pipeline file
        pipeline: PathBuf,

        /// Input: a JSON literal, a file, or a glob of files
        #[clap(short, long)]
        input: Option<String>,

        /// Debounce delay in milliseconds
        #[clap(long, default_value = "500")]
        debounce: u64,
    },

    /// Write a starter pipeline
    Init {
        /// File to create
        #[clap(default_value = "pipeline.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[clap(long)]
        force: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::ALL
        .into_iter()
        .find(|c| c.as_str() == s.to_lowercase().replace('-', "_"))
        .ok_or_else(|| {
            format!(
                "Unknown category: {} (expected transformation, validation, side_effect or control_flow)",
                s
            )
        })
}

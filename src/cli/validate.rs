// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Validate command - check a pipeline without running it

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use super::run::load_pipeline;
use super::OutputFormat;
use crate::pipeline::{Pipeline, PipelineIssue, PipelineValidator, ValidationReport};
use crate::registry::OperationRegistry;
use crate::utils::print_success;

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, format: OutputFormat, verbose: bool) -> Result<()> {
    let pipeline = load_pipeline(&pipeline_path)?;
    let registry = OperationRegistry::global();
    let validation = PipelineValidator::new(&registry).validate(&pipeline.steps);

    match format {
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(&serde_json::json!({
                "valid": validation.is_valid(),
                "errors": validation.errors,
                "warnings": validation.warnings,
            }))
            .map_err(|e| miette::miette!("Failed to serialize report: {}", e))?;
            println!("{}", rendered);
        }
        OutputFormat::Text => print_text_report(&pipeline_path, &pipeline, &validation, verbose),
    }

    if validation.is_valid() {
        Ok(())
    } else {
        Err(miette::miette!("Pipeline validation failed"))
    }
}

fn print_text_report(
    path: &Path,
    pipeline: &Pipeline,
    validation: &ValidationReport,
    verbose: bool,
) {
    println!("{} {}", "Validating".bold(), path.display());
    println!();
    print_success("Pipeline parsed");

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in validation.blocking_errors() {
            print_issue("✗".red(), error);
        }
        for error in validation.skipped_errors() {
            print_issue("✗".red(), error);
            println!("    {}", "optional step: a run skips it".dimmed());
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            print_issue("⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Steps".bold());
        for (i, step) in pipeline.steps.iter().enumerate() {
            let flag = if step.is_required { "" } else { " (optional)" };
            println!("  {}. {}{}", i, step.operation, flag.dimmed());
        }
    }

    println!();
    if !validation.is_valid() {
        return;
    }
    if validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }
}

fn print_issue(mark: colored::ColoredString, issue: &PipelineIssue) {
    println!("  {} {}", mark, issue);
}

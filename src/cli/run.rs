// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Run command - execute a pipeline on one or more inputs

use colored::Colorize;
use miette::Result;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::input::{self, Input};
use super::OutputFormat;
use crate::errors::{OpchainError, PipelineExecutionError, RecoverySuggestion};
use crate::pipeline::{ExecutionLogEntry, Pipeline, PipelineExecutor, PipelineValidator};
use crate::registry::OperationRegistry;
use crate::utils::{create_spinner, outcome_mark, print_error, print_warning};

/// Options for the run command
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: Option<String>,
    pub context: Option<String>,
    pub format: OutputFormat,
    pub log: bool,
    pub timeout_secs: Option<u64>,
    pub verbose: bool,
}

/// Run the pipeline
pub async fn run(pipeline_path: PathBuf, options: RunOptions) -> Result<()> {
    let pipeline = load_pipeline(&pipeline_path)?;
    let registry = OperationRegistry::global();

    // Validate pipeline
    let validation = PipelineValidator::new(&registry).validate(&pipeline.steps);

    if !validation.is_runnable() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in validation.blocking_errors() {
            print_error(&error.to_string());
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    // Optional steps that cannot run are skipped by the executor
    for error in validation.skipped_errors() {
        print_warning(&format!("{} (optional step, will be skipped)", error));
    }

    if validation.has_warnings() && options.verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            print_warning(&warning.to_string());
        }
        eprintln!();
    }

    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let inputs = input::resolve(options.input.as_deref(), &working_dir)?;

    let mut shared_data = pipeline.shared_data.clone();
    shared_data.extend(input::parse_context(options.context.as_deref())?);

    // One deadline covers every input
    let token = CancellationToken::new();
    if let Some(secs) = options.timeout_secs {
        let deadline = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            deadline.cancel();
        });
    }

    let mut failures = 0;
    for input in &inputs {
        let mut executor = PipelineExecutor::with_registry(registry.clone())
            .with_shared_data(shared_data.clone())
            .with_cancellation(token.clone());

        let spinner = match options.format {
            OutputFormat::Text => Some(create_spinner(&format!("Running on {}", input.label()))),
            OutputFormat::Json => None,
        };
        let result = executor
            .execute_pipeline(&pipeline.steps, input.value.clone())
            .await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        if result.is_err() {
            failures += 1;
        }

        match options.format {
            OutputFormat::Text => print_text_result(
                input,
                inputs.len() > 1,
                &result,
                &executor,
                &options,
            ),
            OutputFormat::Json => print_json_result(input, &result, &executor, options.log)?,
        }
    }

    if failures > 0 {
        return Err(miette::miette!(
            "Pipeline failed on {} of {} input(s)",
            failures,
            inputs.len()
        ));
    }

    Ok(())
}

/// Load a pipeline file, pointing at `opchain init` when it is missing
pub fn load_pipeline(path: &Path) -> Result<Pipeline> {
    match Pipeline::from_file(path) {
        Ok(pipeline) => Ok(pipeline),
        Err(e @ OpchainError::PipelineNotFound { .. }) => {
            eprintln!("{}", RecoverySuggestion::create_pipeline());
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_text_result(
    input: &Input,
    show_label: bool,
    result: &std::result::Result<Value, PipelineExecutionError>,
    executor: &PipelineExecutor,
    options: &RunOptions,
) {
    if show_label {
        println!("{}", input.label().bold());
    }

    match result {
        Ok(value) => println!("{}", render_value(value)),
        Err(e) if e.is_cancelled() => {
            eprintln!(
                "  {} Run cancelled at step {}",
                "✗".red(),
                e.step_path()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" → ")
            );
        }
        Err(e) => {
            print_error(&e.to_string());
            eprintln!();
            eprintln!("{}", RecoverySuggestion::for_pipeline_error(e));
        }
    }

    if options.log {
        println!();
        println!("{}:", "Execution log".bold());
        print_log(executor.get_execution_log(), 1);
        let full = executor.get_full_log();
        println!(
            "  {} succeeded, {} failed, {:.2}ms",
            full.succeeded(),
            full.failed(),
            full.total_time_ms()
        );
    }

    if options.verbose && !executor.get_context_data().is_empty() {
        println!();
        println!("{}:", "Context".bold());
        println!("{}", render_value(&Value::Object(executor.get_context_data().clone())));
    }
}

fn print_log(entries: &[ExecutionLogEntry], depth: usize) {
    let indent = "  ".repeat(depth);
    for entry in entries {
        let mark = outcome_mark(entry.success, entry.recovered);
        let scope = entry
            .scope
            .as_deref()
            .map(|s| format!("{}: ", s))
            .unwrap_or_default();
        println!(
            "{}{} {}{} {} {}",
            indent,
            mark,
            scope.dimmed(),
            entry.step_index,
            entry.operation_name,
            format!("({:.2}ms)", entry.execution_time_ms).dimmed()
        );
        if let Some(error) = &entry.error {
            println!("{}    {}", indent, error.message.dimmed());
        }
        print_log(&entry.children, depth + 1);
    }
}

fn print_json_result(
    input: &Input,
    result: &std::result::Result<Value, PipelineExecutionError>,
    executor: &PipelineExecutor,
    with_log: bool,
) -> Result<()> {
    let mut output = Map::new();
    if let Some(source) = &input.source {
        output.insert("input".into(), json!(source.display().to_string()));
    }
    match result {
        Ok(value) => {
            output.insert("success".into(), json!(true));
            output.insert("result".into(), value.clone());
        }
        Err(e) => {
            output.insert("success".into(), json!(false));
            output.insert("error".into(), e.report().to_json());
        }
    }
    output.insert(
        "context".into(),
        Value::Object(executor.get_context_data().clone()),
    );
    if with_log {
        let log = serde_json::to_value(executor.get_execution_log())
            .map_err(|e| miette::miette!("Failed to serialize execution log: {}", e))?;
        output.insert("log".into(), log);
    }

    let rendered = serde_json::to_string_pretty(&Value::Object(output))
        .map_err(|e| miette::miette!("Failed to serialize result: {}", e))?;
    println!("{}", rendered);
    Ok(())
}

fn render_value(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

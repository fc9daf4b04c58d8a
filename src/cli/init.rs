// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Init command - write a starter pipeline

use colored::Colorize;
use miette::Result;
use serde_json::json;
use std::path::PathBuf;

use crate::errors::OpchainError;
use crate::pipeline::{OperationSpec, Pipeline};
use crate::utils::print_success;

/// Run the init command
pub async fn run(path: PathBuf, force: bool, verbose: bool) -> Result<()> {
    println!("{}", "Writing starter pipeline...".bold());
    println!();

    if path.exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        ));
    }

    let pipeline = starter_pipeline();
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => pipeline.to_yaml()?,
        _ => pipeline.to_json()?,
    };

    std::fs::write(&path, &content).map_err(|e| OpchainError::FileWriteError {
        path: path.clone(),
        error: e.to_string(),
    })?;

    print_success(&format!("Created {}", path.display()));
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to define your steps", path.display().to_string().cyan());
    println!("  2. Run {} to browse operations", "opchain list".cyan());
    println!(
        "  3. Run {}",
        format!(
            "opchain run {} --input '{{\"user\": {{\"email\": \" Ada@Example.com \"}}}}'",
            path.display()
        )
        .cyan()
    );
    println!();

    if verbose {
        println!("{}", "Generated pipeline:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

/// Normalize an email field and remember it when valid
pub fn starter_pipeline() -> Pipeline {
    Pipeline {
        name: Some("normalize-email".into()),
        description: Some("Extract, clean and check a user's email address".into()),
        shared_data: Default::default(),
        steps: vec![
            OperationSpec::new("extract_field")
                .config("field", "user.email")
                .config("default", ""),
            OperationSpec::new("strip_whitespace"),
            OperationSpec::new("lowercase"),
            OperationSpec::new("if_else")
                .config("condition", json!([{ "operation": "email" }]))
                .config(
                    "then_branch",
                    json!([{
                        "operation": "store_in_context",
                        "operation_config": { "context_path": "user.email" }
                    }]),
                )
                .config(
                    "else_branch",
                    json!([{
                        "operation": "log_value",
                        "operation_config": { "level": "warning", "message": "Invalid email" }
                    }]),
                ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineExecutor, PipelineValidator};
    use crate::registry::OperationRegistry;
    use std::sync::Arc;

    #[test]
    fn test_starter_pipeline_is_valid() {
        let registry = OperationRegistry::with_builtins();
        let report = PipelineValidator::new(&registry).validate(&starter_pipeline().steps);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(!report.has_warnings());
    }

    #[tokio::test]
    async fn test_starter_pipeline_runs() {
        let mut executor = PipelineExecutor::with_registry(Arc::new(OperationRegistry::with_builtins()));
        let result = executor
            .execute_pipeline(
                &starter_pipeline().steps,
                json!({"user": {"email": " Ada@Example.com "}}),
            )
            .await
            .unwrap();

        assert_eq!(result, json!("ada@example.com"));
        assert_eq!(executor.get_context_data()["user"]["email"], json!("ada@example.com"));
    }
}

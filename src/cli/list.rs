// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! List command - show the operation catalog

use colored::Colorize;
use miette::Result;

use super::OutputFormat;
use crate::operations::Category;
use crate::registry::OperationRegistry;

/// Run the list command
pub async fn run(category: Option<Category>, format: OutputFormat, verbose: bool) -> Result<()> {
    let registry = OperationRegistry::global();
    let operations = registry.list_operations(category);

    if format == OutputFormat::Json {
        let rendered = serde_json::to_string_pretty(&operations)
            .map_err(|e| miette::miette!("Failed to serialize catalog: {}", e))?;
        println!("{}", rendered);
        return Ok(());
    }

    let width = operations.iter().map(|op| op.name.len()).max().unwrap_or(0);
    let mut current = None;
    for op in &operations {
        if current != Some(op.category) {
            if current.is_some() {
                println!();
            }
            println!("{}:", op.category.to_string().bold());
            current = Some(op.category);
        }

        let aliases = registry.aliases_of(&op.name);
        let aliases = if aliases.is_empty() || !verbose {
            String::new()
        } else {
            format!(" [{}]", aliases.join(", "))
        };
        println!(
            "  {:width$}  {}{}",
            op.name.cyan(),
            op.description,
            aliases.dimmed(),
            width = width
        );
    }

    if operations.is_empty() {
        println!("No operations registered.");
    } else if !verbose {
        println!();
        println!(
            "Run {} for an operation's config.",
            "opchain describe <name>".cyan()
        );
    }

    Ok(())
}

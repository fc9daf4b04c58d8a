// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Describe command - explain one operation

use colored::Colorize;
use miette::Result;

use super::OutputFormat;
use crate::errors::{EducationalMessage, RecoverySuggestion};
use crate::registry::OperationRegistry;

/// Run the describe command
pub async fn run(name: String, format: OutputFormat) -> Result<()> {
    let registry = OperationRegistry::global();
    let description = match registry.describe_operation(&name) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", RecoverySuggestion::did_you_mean(&e.operation, &e.suggestions));
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(&description)
                .map_err(|e| miette::miette!("Failed to serialize description: {}", e))?;
            println!("{}", rendered);
        }
        OutputFormat::Text => {
            let message = EducationalMessage::for_operation(&description);
            println!("{}", message.summary.bold());
            println!();
            println!("{}", message.explanation);
            if let Some(example) = &message.example {
                println!();
                println!("{}:", "Example".bold());
                println!("{}", example.cyan());
            }
            if let Some(see_also) = &message.see_also {
                println!();
                println!("See also: {}", see_also.dimmed());
            }
        }
    }

    Ok(())
}

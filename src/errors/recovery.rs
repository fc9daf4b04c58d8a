// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Error recovery suggestions
//!
//! Provides actionable next steps for a failed lookup, configuration or run.

use super::{ConfigIssue, OperationError, PipelineExecutionError};

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest the closest registered names for a misspelled operation
    pub fn did_you_mean(operation: &str, suggestions: &[String]) -> Self {
        let mut steps = vec![format!("'{}' is not a registered operation", operation)];
        let mut commands = Vec::new();

        match suggestions.first() {
            Some(best) => {
                steps.push(format!("Closest matches: {}", suggestions.join(", ")));
                commands.push("# Inspect the closest match:".into());
                commands.push(format!("opchain describe {}", best));
            }
            None => steps.push("No registered name is close to it".into()),
        }
        commands.push("# Browse the catalog:".into());
        commands.push("opchain list".into());

        Self {
            action: "Fix the operation name".into(),
            steps,
            commands,
        }
    }

    /// Suggest fixing a step's operation_config
    pub fn fix_config(operation: Option<&str>, issues: &[ConfigIssue]) -> Self {
        let mut steps: Vec<String> = issues.iter().map(|issue| format!("• {}", issue)).collect();
        let commands = match operation {
            Some(op) => {
                steps.push(format!("Compare against the schema of '{}'", op));
                vec![format!("opchain describe {}", op)]
            }
            None => Vec::new(),
        };

        Self {
            action: "Fix the operation configuration".into(),
            steps,
            commands,
        }
    }

    /// Suggest relaxing a step that is allowed to fail
    pub fn relax_step(step_index: usize, operation: &str) -> Self {
        Self {
            action: format!("Decide whether step {} ('{}') must succeed", step_index, operation),
            steps: vec![
                "Required steps abort the whole run on failure".into(),
                "Set \"is_required\": false to keep the previous value and continue".into(),
                "Transformations can also recover locally with \"on_error\"".into(),
            ],
            commands: vec![],
        }
    }

    /// Suggest creating a pipeline file
    pub fn create_pipeline() -> Self {
        Self {
            action: "Create a pipeline definition".into(),
            steps: vec![
                "The pipeline file could not be found".into(),
                "Write a starter pipeline or create the file manually".into(),
            ],
            commands: vec!["opchain init".into()],
        }
    }

    /// Suggest fixing a malformed pipeline document
    pub fn fix_syntax(line: Option<usize>, column: Option<usize>) -> Self {
        let location = match (line, column) {
            (Some(l), Some(c)) => format!(" at line {}, column {}", l, c),
            (Some(l), None) => format!(" at line {}", l),
            _ => String::new(),
        };

        Self {
            action: format!("Fix pipeline syntax{}", location),
            steps: vec![
                "A pipeline is a list of steps, each with an 'operation' key".into(),
                "Nested pipelines use the same shape under their config keys".into(),
            ],
            commands: vec![
                "# Check structure and configuration without running:".into(),
                "opchain validate <pipeline>".into(),
            ],
        }
    }

    /// Pick the most useful suggestion for an aborted run
    pub fn for_pipeline_error(error: &PipelineExecutionError) -> Self {
        match error.root_cause() {
            OperationError::NotFound(e) => Self::did_you_mean(&e.operation, &e.suggestions),
            OperationError::Config(e) => Self::fix_config(e.operation.as_deref(), &e.issues),
            _ => Self::relax_step(error.step_index, &error.operation),
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

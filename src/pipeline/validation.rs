// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Pipeline validation
//!
//! Checks a pipeline against the registry without running it: operation
//! names resolve, configs satisfy their schemas, and the same holds for
//! every nested sub-pipeline. Issue locations are paths such as
//! `step 2 → then_branch → step 0`, numbered in execution order.
//!
//! An error under a step with `is_required: false` (at any depth) does not
//! stop a run: the executor skips that step. Such errors are reported with
//! `required: false` and left out of [`ValidationReport::is_runnable`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::operations::ErrorRecovery;
use crate::pipeline::executor::execution_order;
use crate::pipeline::OperationSpec;
use crate::registry::OperationRegistry;

/// One problem found in a pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineIssue {
    pub location: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Every step on the way to the issue is required
    pub required: bool,
}

impl std::fmt::Display for PipelineIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<PipelineIssue>,
    pub warnings: Vec<PipelineIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_error(&mut self, location: &str, required: bool, message: impl Into<String>) {
        self.errors.push(PipelineIssue {
            location: location.to_string(),
            message: message.into(),
            suggestions: Vec::new(),
            required,
        });
    }

    fn add_warning(&mut self, location: &str, message: impl Into<String>) {
        self.warnings.push(PipelineIssue {
            location: location.to_string(),
            message: message.into(),
            suggestions: Vec::new(),
            required: true,
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Errors that would abort a run
    pub fn blocking_errors(&self) -> impl Iterator<Item = &PipelineIssue> {
        self.errors.iter().filter(|e| e.required)
    }

    /// Errors on optional steps, which a run skips
    pub fn skipped_errors(&self) -> impl Iterator<Item = &PipelineIssue> {
        self.errors.iter().filter(|e| !e.required)
    }

    /// No error sits on a path of required steps
    pub fn is_runnable(&self) -> bool {
        self.blocking_errors().next().is_none()
    }
}

/// Pipeline validator
pub struct PipelineValidator<'r> {
    registry: &'r OperationRegistry,
}

impl<'r> PipelineValidator<'r> {
    pub fn new(registry: &'r OperationRegistry) -> Self {
        Self { registry }
    }

    /// Validate a pipeline; an empty error list means it is runnable
    pub fn validate(&self, steps: &[OperationSpec]) -> ValidationReport {
        let mut report = ValidationReport::new();
        if steps.is_empty() {
            report.add_warning("", "Pipeline has no steps and returns its input unchanged");
        }
        self.validate_steps(steps, "", true, &mut report);
        report
    }

    fn validate_steps(
        &self,
        steps: &[OperationSpec],
        prefix: &str,
        required: bool,
        report: &mut ValidationReport,
    ) {
        let mut order_indices: BTreeMap<i64, usize> = BTreeMap::new();
        for step in steps {
            if let Some(index) = step.order_index {
                *order_indices.entry(index).or_default() += 1;
            }
        }
        for (index, count) in order_indices.into_iter().filter(|(_, n)| *n > 1) {
            report.add_warning(
                prefix,
                format!(
                    "order_index {} is used by {} steps; they run in list order",
                    index, count
                ),
            );
        }

        for (position, step) in execution_order(steps).into_iter().enumerate() {
            let location = if prefix.is_empty() {
                format!("step {}", position)
            } else {
                format!("{} → step {}", prefix, position)
            };
            self.validate_step(step, &location, required && step.is_required, report);
        }
    }

    fn validate_step(
        &self,
        step: &OperationSpec,
        location: &str,
        required: bool,
        report: &mut ValidationReport,
    ) {
        let Some(descriptor) = self.registry.descriptor(&step.operation) else {
            let err = self.registry.not_found(&step.operation);
            report.errors.push(PipelineIssue {
                location: location.to_string(),
                message: err.to_string(),
                suggestions: err.suggestions,
                required,
            });
            return;
        };
        let config = &step.operation_config;

        for key in descriptor.schema.unknown_keys(config) {
            report.add_warning(location, format!("unknown config key '{}' is ignored", key));
        }

        let issues = descriptor.schema.check(config);
        if !issues.is_empty() {
            for issue in issues {
                report.add_error(location, required, issue.to_string());
            }
            return;
        }

        if let Err(e) = ErrorRecovery::from_config(descriptor.category, config) {
            for issue in e.issues {
                report.add_error(location, required, issue.to_string());
            }
        }

        // Construction catches what the schema cannot express: bad regexes,
        // malformed dot paths, steps without an operation
        if let Err(e) = descriptor.build(config) {
            for issue in e.issues {
                report.add_error(location, required, issue.to_string());
            }
            return;
        }

        for key in descriptor.schema.pipeline_keys() {
            let Some(Value::Array(items)) = config.get(key) else {
                continue;
            };
            let nested: Result<Vec<OperationSpec>, _> = items
                .iter()
                .map(|item| serde_json::from_value::<OperationSpec>(item.clone()))
                .collect();
            match nested {
                Ok(nested) => {
                    let prefix = format!("{} → {}", location, key);
                    self.validate_steps(&nested, &prefix, required, report)
                }
                Err(e) => report.add_error(location, required, format!("config '{}': {}", key, e)),
            }
        }
    }
}

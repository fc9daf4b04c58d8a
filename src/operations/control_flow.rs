// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Built-in control flow
//!
//! `if_else` picks a branch from the outcome of a condition pipeline and
//! `on_path` scopes a pipeline to one nested field. Both run their
//! sub-pipelines with the parent's context, so shared data written inside
//! a branch is visible after it returns.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    Category, ConfigParam, ConfigSchema, ConfigType, ConfiguredOperation, ControlFlow,
    Operation, OperationConfig,
};
use crate::errors::{ConfigValidationError, OperationError};
use crate::pipeline::{ExecutionContext, OperationSpec, SubPipelineRunner};
use crate::resolver::DotPath;

/// Read the sub-pipeline stored under `key`
fn sub_pipeline(
    config: &OperationConfig,
    key: &str,
) -> Result<Option<Vec<OperationSpec>>, ConfigValidationError> {
    let steps = match config.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(steps)) => steps,
        Some(_) => {
            return Err(ConfigValidationError::invalid(
                key,
                "expected a list of steps",
            ))
        }
    };

    steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            serde_json::from_value::<OperationSpec>(step.clone())
                .map_err(|e| ConfigValidationError::invalid(key, format!("step {}: {}", index, e)))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn required_sub_pipeline(
    config: &OperationConfig,
    key: &str,
) -> Result<Vec<OperationSpec>, ConfigValidationError> {
    sub_pipeline(config, key)?.ok_or_else(|| ConfigValidationError::missing(key))
}

fn step_example(operation: &str) -> Value {
    json!([{ "operation": operation }])
}

// ─────────────────────────────────────────────────────────────────────────────
// if_else
// ─────────────────────────────────────────────────────────────────────────────

/// Run one of two branches depending on a condition pipeline
///
/// The condition passes when every one of its steps succeeds. A rejected
/// condition selects the else branch rather than failing the step.
#[derive(Debug)]
pub struct IfElse {
    condition: Vec<OperationSpec>,
    then_branch: Vec<OperationSpec>,
    else_branch: Option<Vec<OperationSpec>>,
}

impl ConfiguredOperation for IfElse {
    const CATEGORY: Category = Category::ControlFlow;
    const DESCRIPTION: &'static str = "Run then_branch when the condition pipeline passes, else_branch otherwise";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "condition",
                ConfigParam::new(ConfigType::Pipeline, "Steps that must all succeed")
                    .example(step_example("required")),
            )
            .required(
                "then_branch",
                ConfigParam::new(ConfigType::Pipeline, "Steps run when the condition passes")
                    .example(step_example("uppercase")),
            )
            .optional(
                "else_branch",
                ConfigParam::new(ConfigType::Pipeline, "Steps run when the condition fails")
                    .example(json!([{"operation": "set_value", "operation_config": {"value": "N/A"}}])),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        Ok(Self {
            condition: required_sub_pipeline(config, "condition")?,
            then_branch: required_sub_pipeline(config, "then_branch")?,
            else_branch: sub_pipeline(config, "else_branch")?,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::ControlFlow(Box::new(self))
    }
}

#[async_trait]
impl ControlFlow for IfElse {
    async fn direct_flow(
        &self,
        value: Value,
        context: &mut ExecutionContext,
        runner: &mut SubPipelineRunner<'_>,
    ) -> Result<Value, OperationError> {
        if runner
            .evaluate("condition", &self.condition, &value, context)
            .await?
        {
            return Ok(runner
                .run("then_branch", &self.then_branch, value, context)
                .await?);
        }

        match &self.else_branch {
            Some(steps) => Ok(runner.run("else_branch", steps, value, context).await?),
            None => Ok(value),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// execute_pipeline_on_path
// ─────────────────────────────────────────────────────────────────────────────

/// Run a pipeline on one nested field and write the result back
#[derive(Debug)]
pub struct OnPath {
    path: DotPath,
    pipeline: Vec<OperationSpec>,
}

impl ConfiguredOperation for OnPath {
    const CATEGORY: Category = Category::ControlFlow;
    const DESCRIPTION: &'static str = "Run a sub-pipeline on the field at a dot path";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "path",
                ConfigParam::new(ConfigType::Str, "Dot path of the field to process")
                    .example(json!("user.name")),
            )
            .required(
                "pipeline",
                ConfigParam::new(ConfigType::Pipeline, "Steps run on the field")
                    .example(json!([{"operation": "strip_whitespace"}, {"operation": "uppercase"}])),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let path = match config.get("path") {
            Some(Value::String(path)) => {
                DotPath::parse(path).map_err(|e| e.into_config_error("path"))?
            }
            Some(_) => return Err(ConfigValidationError::invalid("path", "expected a string")),
            None => return Err(ConfigValidationError::missing("path")),
        };

        Ok(Self {
            path,
            pipeline: required_sub_pipeline(config, "pipeline")?,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::ControlFlow(Box::new(self))
    }
}

#[async_trait]
impl ControlFlow for OnPath {
    async fn direct_flow(
        &self,
        mut value: Value,
        context: &mut ExecutionContext,
        runner: &mut SubPipelineRunner<'_>,
    ) -> Result<Value, OperationError> {
        let nested = self.path.get(&value).cloned().ok_or_else(|| {
            OperationError::failed(format!("path '{}' not found in value", self.path))
        })?;

        let result = runner.run("pipeline", &self.pipeline, nested, context).await?;

        self.path
            .set(&mut value, result)
            .map_err(|e| OperationError::failed(e.to_string()))?;
        Ok(value)
    }
}

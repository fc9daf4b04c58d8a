// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Pipeline definition structures
//!
//! A pipeline file is either a bare array of steps or a document with a
//! `steps` array plus optional `name`, `description` and initial
//! `shared_data`. Both JSON and YAML are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{OpchainError, OpchainResult};
use crate::operations::OperationConfig;

/// One pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Operation name or alias
    pub operation: String,

    /// Config handed to the operation, checked against its schema
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub operation_config: OperationConfig,

    /// Sort key; when any step in a list has one the list is stably sorted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,

    /// Abort the run when this step fails
    #[serde(default = "default_required")]
    pub is_required: bool,

    /// Replaces the failure message of this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn default_required() -> bool {
    true
}

impl OperationSpec {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            operation_config: Map::new(),
            order_index: None,
            is_required: true,
            error_message: None,
        }
    }

    /// Set one config key
    pub fn config(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.operation_config.insert(key.to_string(), value.into());
        self
    }

    /// Mark the step as non-required
    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    pub fn order(mut self, index: i64) -> Self {
        self.order_index = Some(index);
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// A pipeline file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Initial shared data for runs of this pipeline
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub shared_data: Map<String, Value>,

    pub steps: Vec<OperationSpec>,
}

impl Pipeline {
    /// Load a pipeline from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: &Path) -> OpchainResult<Self> {
        if !path.exists() {
            return Err(OpchainError::PipelineNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| OpchainError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => PipelineParser::from_json_str(&content),
        }
    }

    /// Parse a pipeline from YAML
    pub fn from_yaml(yaml: &str) -> OpchainResult<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        PipelineParser::from_value(value)
    }

    pub fn to_yaml(&self) -> OpchainResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    pub fn to_json(&self) -> OpchainResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

impl From<Vec<OperationSpec>> for Pipeline {
    fn from(steps: Vec<OperationSpec>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    shared_data: Map<String, Value>,
}

/// Turns structured data into a [`Pipeline`]
///
/// Step errors name the step index so a broken file can be fixed without
/// guessing. Nested sub-pipelines stay in `operation_config` and are
/// checked by [`PipelineValidator`](crate::pipeline::PipelineValidator).
pub struct PipelineParser;

impl PipelineParser {
    pub fn from_json_str(json: &str) -> OpchainResult<Pipeline> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> OpchainResult<Pipeline> {
        match value {
            Value::Array(steps) => Ok(Pipeline::from(Self::parse_steps(steps)?)),
            Value::Object(mut doc) => {
                let steps = match doc.remove("steps") {
                    Some(Value::Array(steps)) => Self::parse_steps(steps)?,
                    Some(_) => return Err(invalid("'steps' must be an array", None)),
                    None => {
                        return Err(invalid(
                            "missing 'steps'",
                            Some("A pipeline is an array of steps or an object with a 'steps' array"),
                        ))
                    }
                };
                let header: Header = serde_json::from_value(Value::Object(doc))?;
                Ok(Pipeline {
                    name: header.name,
                    description: header.description,
                    shared_data: header.shared_data,
                    steps,
                })
            }
            _ => Err(invalid(
                "expected an array of steps or an object with 'steps'",
                None,
            )),
        }
    }

    /// Parse a list of step objects
    pub fn parse_steps(steps: Vec<Value>) -> OpchainResult<Vec<OperationSpec>> {
        steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| Self::parse_step(index, step))
            .collect()
    }

    fn parse_step(index: usize, step: Value) -> OpchainResult<OperationSpec> {
        match &step {
            Value::Object(fields) => match fields.get("operation") {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(invalid(
                        &format!("step {}: 'operation' must be a string", index),
                        None,
                    ))
                }
                None => {
                    return Err(invalid(
                        &format!("step {} is missing 'operation'", index),
                        Some("Every step needs an \"operation\" naming what to run"),
                    ))
                }
            },
            _ => return Err(invalid(&format!("step {} is not an object", index), None)),
        }

        serde_json::from_value(step).map_err(|e| invalid(&format!("step {}: {}", index, e), None))
    }
}

fn invalid(reason: &str, help: Option<&str>) -> OpchainError {
    OpchainError::InvalidPipeline {
        reason: reason.to_string(),
        help: help.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let pipeline = PipelineParser::from_json_str(
            r#"[
                {"operation": "extract_field", "operation_config": {"field": "user.name"}},
                {"operation": "strip", "is_required": false}
            ]"#,
        )
        .unwrap();

        assert_eq!(pipeline.steps.len(), 2);
        assert_eq!(pipeline.steps[0].operation_config["field"], json!("user.name"));
        assert!(pipeline.steps[0].is_required);
        assert!(!pipeline.steps[1].is_required);
        assert_eq!(pipeline.name, None);
    }

    #[test]
    fn test_parse_document() {
        let pipeline = PipelineParser::from_value(json!({
            "name": "users",
            "shared_data": {"threshold": 10},
            "steps": [{"operation": "uppercase", "order_index": 2}]
        }))
        .unwrap();

        assert_eq!(pipeline.name.as_deref(), Some("users"));
        assert_eq!(pipeline.shared_data["threshold"], json!(10));
        assert_eq!(pipeline.steps[0].order_index, Some(2));
    }

    #[test]
    fn test_missing_operation_names_step() {
        let err = PipelineParser::from_value(json!([
            {"operation": "strip"},
            {"operation_config": {}}
        ]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid pipeline definition: step 1 is missing 'operation'"
        );
    }

    #[test]
    fn test_scalar_is_rejected() {
        assert!(PipelineParser::from_value(json!("strip")).is_err());
        assert!(PipelineParser::from_value(json!({"steps": "strip"})).is_err());
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &path,
            "name: clean\nsteps:\n  - operation: strip\n  - operation: upper\n    error_message: could not shout\n",
        )
        .unwrap();

        let pipeline = Pipeline::from_file(&path).unwrap();
        assert_eq!(pipeline.steps[1].operation, "upper");
        assert_eq!(pipeline.steps[1].error_message.as_deref(), Some("could not shout"));

        let missing = Pipeline::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, OpchainError::PipelineNotFound { .. }));
    }

    #[test]
    fn test_builder_round_trip_through_yaml() {
        let pipeline = Pipeline::from(vec![
            OperationSpec::new("extract").config("field", "user.name"),
            OperationSpec::new("upper").optional(),
        ]);
        let reparsed = Pipeline::from_yaml(&pipeline.to_yaml().unwrap()).unwrap();
        assert_eq!(reparsed, pipeline);
    }
}

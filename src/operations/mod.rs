// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Operations
//!
//! An operation is one configurable unit of work. It takes one of four
//! shapes, each with its own contract:
//! - [`Transformation`]: produces a new value
//! - [`Validation`]: accepts or rejects the value, leaving it unchanged
//! - [`SideEffect`]: acts on the value without changing it
//! - [`ControlFlow`]: runs nested pipelines against the value
//!
//! Operations are built fresh for every step from their config mapping
//! and hold nothing beyond that resolved config.

pub mod control_flow;
mod recovery;
mod schema;
pub mod side_effects;
mod template;
pub mod transformations;
pub mod validations;

pub use recovery::{ErrorRecovery, OnError};
pub use schema::{type_name, ConfigParam, ConfigSchema, ConfigType};
pub use template::render_template;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ConfigValidationError, OperationError};
use crate::pipeline::{ExecutionContext, SubPipelineRunner};

/// Config mapping handed to an operation
pub type OperationConfig = Map<String, Value>;

/// Behavioral category of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Transformation,
    Validation,
    SideEffect,
    ControlFlow,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Transformation,
        Category::Validation,
        Category::SideEffect,
        Category::ControlFlow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transformation => "transformation",
            Self::Validation => "validation",
            Self::SideEffect => "side_effect",
            Self::ControlFlow => "control_flow",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown category '{}', expected one of: transformation, validation, side_effect, control_flow",
                    s
                )
            })
    }
}

/// Produces a new value from the current one
#[async_trait]
pub trait Transformation: Send + Sync {
    async fn transform(
        &self,
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<Value, OperationError>;
}

/// Accepts or rejects the current value
#[async_trait]
pub trait Validation: Send + Sync {
    /// `Ok(false)` rejects the value
    async fn validate(
        &self,
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<bool, OperationError>;

    /// Explain a rejection of `value`
    fn describe_failure(&self, _value: &Value) -> Option<String> {
        None
    }
}

/// Acts on the current value; its outcome never replaces the value
#[async_trait]
pub trait SideEffect: Send + Sync {
    async fn perform(
        &self,
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<(), OperationError>;
}

/// Runs nested pipelines against the current value
#[async_trait]
pub trait ControlFlow: Send + Sync {
    async fn direct_flow(
        &self,
        value: Value,
        context: &mut ExecutionContext,
        runner: &mut SubPipelineRunner<'_>,
    ) -> Result<Value, OperationError>;
}

/// A constructed operation, tagged by its contract
pub enum Operation {
    Transformation(Box<dyn Transformation>),
    Validation(Box<dyn Validation>),
    SideEffect(Box<dyn SideEffect>),
    ControlFlow(Box<dyn ControlFlow>),
}

impl Operation {
    pub fn category(&self) -> Category {
        match self {
            Self::Transformation(_) => Category::Transformation,
            Self::Validation(_) => Category::Validation,
            Self::SideEffect(_) => Category::SideEffect,
            Self::ControlFlow(_) => Category::ControlFlow,
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Operation").field(&self.category()).finish()
    }
}

/// An operation type that can describe and build itself from config
///
/// Implement one of the four contracts plus this trait, then register the
/// type with [`OperationRegistry::register_operation`](crate::registry::OperationRegistry::register_operation).
pub trait ConfiguredOperation: Sized + 'static {
    const CATEGORY: Category;
    const DESCRIPTION: &'static str;

    fn config_schema() -> ConfigSchema;

    /// Build from a config that already passed the schema check
    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError>;

    fn into_operation(self) -> Operation;
}

/// Deserialize a typed config from the raw mapping
pub fn parse_config<T: DeserializeOwned>(config: &OperationConfig) -> Result<T, ConfigValidationError> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| ConfigValidationError::invalid("operation_config", e.to_string()))
}

/// Text form of a value, without quotes for strings
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Template arguments: the current value plus shared data
pub(crate) fn template_args(value: &Value, context: &ExecutionContext) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("value".into(), value.clone());
    for (key, v) in &context.shared_data {
        args.insert(key.clone(), v.clone());
    }
    args
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::registry::OperationRegistry;
    use serde_json::Value;

    /// Build an operation from the builtin catalog
    pub fn build(name: &str, config: Value) -> Operation {
        let config = config.as_object().cloned().unwrap_or_default();
        OperationRegistry::with_builtins()
            .get_operation(name, &config)
            .unwrap()
            .operation
    }

    pub async fn transform(name: &str, config: Value, value: Value) -> Result<Value, OperationError> {
        let mut context = ExecutionContext::default();
        match build(name, config) {
            Operation::Transformation(op) => op.transform(&value, &mut context).await,
            other => panic!("{} is a {}", name, other.category()),
        }
    }

    pub async fn validate(name: &str, config: Value, value: Value) -> bool {
        let mut context = ExecutionContext::default();
        validate_in(name, config, value, &mut context).await
    }

    pub async fn validate_in(
        name: &str,
        config: Value,
        value: Value,
        context: &mut ExecutionContext,
    ) -> bool {
        match build(name, config) {
            Operation::Validation(op) => op.validate(&value, context).await.unwrap(),
            other => panic!("{} is a {}", name, other.category()),
        }
    }

    pub async fn perform(
        name: &str,
        config: Value,
        value: Value,
        context: &mut ExecutionContext,
    ) -> Result<(), OperationError> {
        match build(name, config) {
            Operation::SideEffect(op) => op.perform(&value, context).await,
            other => panic!("{} is a {}", name, other.category()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_round_trip_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("sideeffect".parse::<Category>().is_err());
        assert_eq!(
            serde_json::to_value(Category::ControlFlow).unwrap(),
            json!("control_flow")
        );
    }

    #[test]
    fn test_template_args_prefer_shared_data() {
        let mut context = ExecutionContext::default();
        context.shared_data.insert("name".into(), json!("bob"));
        let args = template_args(&json!("v"), &context);

        assert_eq!(args["value"], json!("v"));
        assert_eq!(args["name"], json!("bob"));
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("plain")), "plain");
        assert_eq!(value_to_text(&json!(12)), "12");
        assert_eq!(value_to_text(&json!(null)), "null");
    }
}

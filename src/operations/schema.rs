// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Declared configuration schemas
//!
//! Every operation publishes which `operation_config` keys it requires and
//! which it accepts optionally. The same schema drives `describe`, static
//! validation and the construction-time check in the registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OperationConfig;
use crate::errors::ConfigIssue;

/// Type of a config value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
    /// A nested pipeline: a list of operation specs
    Pipeline,
    Any,
}

impl ConfigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Pipeline => "pipeline",
            Self::Any => "any",
        }
    }

    /// Check whether a value is compatible with this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Str => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Dict => value.is_object(),
            Self::Pipeline => value
                .as_array()
                .is_some_and(|steps| steps.iter().all(Value::is_object)),
            Self::Any => true,
        }
    }
}

impl std::fmt::Display for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short type name of a JSON value, in config type vocabulary
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// One declared config key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigParam {
    #[serde(rename = "type")]
    pub kind: ConfigType,

    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl ConfigParam {
    pub fn new(kind: ConfigType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            default: None,
            example: None,
        }
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn example(mut self, value: Value) -> Self {
        self.example = Some(value);
        self
    }
}

/// Required and optional config keys of one operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigSchema {
    pub required: BTreeMap<String, ConfigParam>,
    pub optional: BTreeMap<String, ConfigParam>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, key: &str, param: ConfigParam) -> Self {
        self.required.insert(key.to_string(), param);
        self
    }

    pub fn optional(mut self, key: &str, param: ConfigParam) -> Self {
        self.optional.insert(key.to_string(), param);
        self
    }

    /// Add an optional key unless the operation already declares it
    pub fn add_optional_if_absent(&mut self, key: &str, param: ConfigParam) {
        if !self.required.contains_key(key) && !self.optional.contains_key(key) {
            self.optional.insert(key.to_string(), param);
        }
    }

    pub fn param(&self, key: &str) -> Option<&ConfigParam> {
        self.required.get(key).or_else(|| self.optional.get(key))
    }

    /// Check a config mapping: required keys present, declared keys well typed
    ///
    /// A `null` optional value counts as unset.
    pub fn check(&self, config: &OperationConfig) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (key, param) in &self.required {
            match config.get(key) {
                None => issues.push(ConfigIssue::Missing { key: key.clone() }),
                Some(value) => check_type(key, param, value, &mut issues),
            }
        }

        for (key, param) in &self.optional {
            if let Some(value) = config.get(key).filter(|v| !v.is_null()) {
                check_type(key, param, value, &mut issues);
            }
        }

        issues
    }

    /// Keys present in the config that the schema does not declare
    pub fn unknown_keys<'c>(&self, config: &'c OperationConfig) -> Vec<&'c str> {
        config
            .keys()
            .filter(|key| self.param(key).is_none())
            .map(String::as_str)
            .collect()
    }

    /// Keys holding nested pipelines
    pub fn pipeline_keys(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .filter(|(_, param)| param.kind == ConfigType::Pipeline)
            .map(|(key, _)| key.as_str())
    }

    /// Build an example config from required examples
    pub fn example_config(&self) -> OperationConfig {
        self.required
            .iter()
            .filter_map(|(key, param)| param.example.clone().map(|ex| (key.clone(), ex)))
            .collect()
    }
}

fn check_type(key: &str, param: &ConfigParam, value: &Value, issues: &mut Vec<ConfigIssue>) {
    if !param.kind.accepts(value) {
        issues.push(ConfigIssue::WrongType {
            key: key.to_string(),
            expected: param.kind.to_string(),
            found: type_name(value).to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "field",
                ConfigParam::new(ConfigType::Str, "Dot path").example(json!("user.name")),
            )
            .optional(
                "count",
                ConfigParam::new(ConfigType::Int, "Max replacements").default_value(json!(0)),
            )
            .optional("then_branch", ConfigParam::new(ConfigType::Pipeline, "Branch"))
    }

    fn config(value: Value) -> OperationConfig {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_check_reports_missing_and_wrong_type() {
        let issues = schema().check(&config(json!({"count": "three"})));

        assert_eq!(
            issues,
            vec![
                ConfigIssue::Missing {
                    key: "field".into()
                },
                ConfigIssue::WrongType {
                    key: "count".into(),
                    expected: "int".into(),
                    found: "str".into(),
                },
            ]
        );
    }

    #[test]
    fn test_null_optional_is_unset() {
        assert!(schema()
            .check(&config(json!({"field": "a", "count": null})))
            .is_empty());
    }

    #[test]
    fn test_unknown_keys_and_pipeline_keys() {
        let cfg = config(json!({"field": "a", "extra": 1}));
        assert_eq!(schema().unknown_keys(&cfg), vec!["extra"]);
        assert_eq!(schema().pipeline_keys().collect::<Vec<_>>(), vec!["then_branch"]);
    }

    #[test]
    fn test_pipeline_type_requires_list_of_steps() {
        assert!(ConfigType::Pipeline.accepts(&json!([{"operation": "strip"}])));
        assert!(ConfigType::Pipeline.accepts(&json!([])));
        assert!(!ConfigType::Pipeline.accepts(&json!(["strip"])));
        assert!(!ConfigType::Pipeline.accepts(&json!({"operation": "strip"})));
    }

    #[test]
    fn test_example_config_uses_required_examples() {
        assert_eq!(
            Value::Object(schema().example_config()),
            json!({"field": "user.name"})
        );
    }

    #[test]
    fn test_schema_serializes_with_type_key() {
        let value = serde_json::to_value(schema()).unwrap();
        assert_eq!(value["required"]["field"]["type"], "str");
        assert_eq!(value["optional"]["count"]["default"], 0);
        assert!(value["optional"]["then_branch"].get("default").is_none());
    }
}

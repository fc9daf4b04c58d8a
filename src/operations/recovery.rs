// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Operation-level error handling keys (`on_error`, `default`, `error_message`)

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Category, ConfigParam, ConfigSchema, ConfigType, OperationConfig};
use crate::errors::ConfigValidationError;

/// What an operation does with its own failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Hand the failure to the step-level policy
    #[default]
    Raise,
    ReturnDefault,
    ReturnNone,
    ReturnOriginal,
    /// Side effects only: log and carry on
    Ignore,
}

impl OnError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::ReturnDefault => "return_default",
            Self::ReturnNone => "return_none",
            Self::ReturnOriginal => "return_original",
            Self::Ignore => "ignore",
        }
    }

    /// Modes an operation of `category` may declare
    pub fn allowed_for(category: Category) -> &'static [OnError] {
        match category {
            Category::Transformation => &[
                Self::Raise,
                Self::ReturnDefault,
                Self::ReturnNone,
                Self::ReturnOriginal,
            ],
            Category::SideEffect => &[Self::Raise, Self::Ignore],
            Category::Validation | Category::ControlFlow => &[Self::Raise],
        }
    }
}

/// Resolved `on_error` policy of one operation instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorRecovery {
    pub mode: OnError,
    /// Substitute used by `return_default`
    pub default: Value,
}

impl ErrorRecovery {
    /// Read `on_error` and `default` for an operation of `category`
    pub fn from_config(
        category: Category,
        config: &OperationConfig,
    ) -> Result<Self, ConfigValidationError> {
        let allowed = OnError::allowed_for(category);
        if allowed.len() == 1 {
            return Ok(Self::default());
        }

        let mode = match config.get("on_error") {
            None | Some(Value::Null) => OnError::Raise,
            Some(raw) => serde_json::from_value::<OnError>(raw.clone())
                .ok()
                .filter(|mode| allowed.contains(mode))
                .ok_or_else(|| {
                    let names: Vec<&str> = allowed.iter().map(OnError::as_str).collect();
                    ConfigValidationError::invalid(
                        "on_error",
                        format!("expected one of {}, got {}", names.join(", "), raw),
                    )
                })?,
        };

        let default = if category == Category::Transformation {
            config.get("default").cloned().unwrap_or(Value::Null)
        } else {
            Value::Null
        };

        Ok(Self { mode, default })
    }

    /// Value to continue with after a failure, or `None` to raise
    pub fn recover(&self, original: &Value) -> Option<Value> {
        match self.mode {
            OnError::Raise => None,
            OnError::ReturnDefault => Some(self.default.clone()),
            OnError::ReturnNone => Some(Value::Null),
            OnError::ReturnOriginal | OnError::Ignore => Some(original.clone()),
        }
    }

    /// Extend a declared schema with the recovery keys of `category`
    pub fn extend_schema(category: Category, schema: &mut ConfigSchema) {
        match category {
            Category::Transformation => {
                schema.add_optional_if_absent(
                    "on_error",
                    ConfigParam::new(
                        ConfigType::Str,
                        "Failure handling: raise, return_default, return_none or return_original",
                    )
                    .default_value(json!("raise")),
                );
                schema.add_optional_if_absent(
                    "default",
                    ConfigParam::new(ConfigType::Any, "Value returned when on_error is return_default")
                        .default_value(Value::Null),
                );
            }
            Category::SideEffect => {
                schema.add_optional_if_absent(
                    "on_error",
                    ConfigParam::new(ConfigType::Str, "Failure handling: raise or ignore")
                        .default_value(json!("raise")),
                );
            }
            Category::Validation => {
                schema.add_optional_if_absent(
                    "error_message",
                    ConfigParam::new(ConfigType::Str, "Message used when the value is rejected"),
                );
            }
            Category::ControlFlow => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(value: Value) -> OperationConfig {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_transformation_modes() {
        let original = json!("input");

        let recovery = ErrorRecovery::from_config(
            Category::Transformation,
            &config(json!({"on_error": "return_default", "default": 0})),
        )
        .unwrap();
        assert_eq!(recovery.recover(&original), Some(json!(0)));

        let recovery = ErrorRecovery::from_config(
            Category::Transformation,
            &config(json!({"on_error": "return_original"})),
        )
        .unwrap();
        assert_eq!(recovery.recover(&original), Some(original.clone()));

        let recovery =
            ErrorRecovery::from_config(Category::Transformation, &config(json!({}))).unwrap();
        assert_eq!(recovery.recover(&original), None);
    }

    #[test]
    fn test_mode_must_fit_category() {
        let err = ErrorRecovery::from_config(
            Category::SideEffect,
            &config(json!({"on_error": "return_default"})),
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected one of raise, ignore"));

        assert!(ErrorRecovery::from_config(
            Category::Transformation,
            &config(json!({"on_error": "ignore"}))
        )
        .is_err());
    }

    #[test]
    fn test_validations_ignore_on_error_key() {
        let recovery = ErrorRecovery::from_config(
            Category::Validation,
            &config(json!({"on_error": "whatever"})),
        )
        .unwrap();
        assert_eq!(recovery.mode, OnError::Raise);
    }

    #[test]
    fn test_extend_schema_keeps_declared_default() {
        let mut schema = ConfigSchema::new().required(
            "default",
            ConfigParam::new(ConfigType::Any, "Replacement for null"),
        );
        ErrorRecovery::extend_schema(Category::Transformation, &mut schema);

        assert!(schema.required.contains_key("default"));
        assert!(!schema.optional.contains_key("default"));
        assert!(schema.optional.contains_key("on_error"));
    }
}

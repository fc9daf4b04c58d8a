// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Built-in validations
//!
//! A validation answers `true` to keep the value or `false` to reject it.
//! Rejection becomes a [`ValidationError`](crate::errors::ValidationError)
//! in the executor, where the step's `error_message` applies.

use std::cmp::Ordering;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    parse_config, type_name, Category, ConfigParam, ConfigSchema, ConfigType,
    ConfiguredOperation, Operation, OperationConfig, Validation,
};
use crate::errors::{ConfigValidationError, OperationError};
use crate::pipeline::ExecutionContext;
use crate::resolver::DotPath;

/// Key in shared data holding the sets seen by `unique`
pub const UNIQUE_SEEN_KEY: &str = "__unique__";

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality that treats `1` and `1.0` as equal and can ignore case
fn values_equal(a: &Value, b: &Value, case_sensitive: bool) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) if !case_sensitive => {
            x.to_lowercase() == y.to_lowercase()
        }
        _ => a == b,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// required
// ─────────────────────────────────────────────────────────────────────────────

/// Reject null, blank strings and empty lists
#[derive(Debug)]
pub struct Required {
    allow_empty_string: bool,
    allow_empty_list: bool,
}

#[derive(Deserialize)]
struct RequiredConfig {
    #[serde(default)]
    allow_empty_string: bool,
    #[serde(default)]
    allow_empty_list: bool,
}

impl ConfiguredOperation for Required {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Require a non-null, non-empty value";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .optional(
                "allow_empty_string",
                ConfigParam::new(ConfigType::Bool, "Accept blank strings")
                    .default_value(json!(false)),
            )
            .optional(
                "allow_empty_list",
                ConfigParam::new(ConfigType::Bool, "Accept empty lists").default_value(json!(false)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: RequiredConfig = parse_config(config)?;
        Ok(Self {
            allow_empty_string: cfg.allow_empty_string,
            allow_empty_list: cfg.allow_empty_list,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for Required {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(match value {
            Value::Null => false,
            Value::String(s) => self.allow_empty_string || !s.trim().is_empty(),
            Value::Array(items) => self.allow_empty_list || !items.is_empty(),
            _ => true,
        })
    }

    fn describe_failure(&self, _value: &Value) -> Option<String> {
        Some("a value is required".into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// range / length
// ─────────────────────────────────────────────────────────────────────────────

/// Require a number within bounds
#[derive(Debug)]
pub struct Range {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Deserialize)]
struct RangeConfig {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

impl ConfiguredOperation for Range {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Require a numeric value within inclusive bounds";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .optional(
                "min",
                ConfigParam::new(ConfigType::Float, "Minimum allowed value").example(json!(0)),
            )
            .optional(
                "max",
                ConfigParam::new(ConfigType::Float, "Maximum allowed value").example(json!(100)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: RangeConfig = parse_config(config)?;
        Ok(Self {
            min: cfg.min,
            max: cfg.max,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for Range {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(as_number(value).is_some_and(|n| {
            self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
        }))
    }

    fn describe_failure(&self, value: &Value) -> Option<String> {
        let n = as_number(value)?;
        match (self.min, self.max) {
            (Some(min), _) if n < min => Some(format!("value {} is below minimum {}", value, min)),
            (_, Some(max)) if n > max => Some(format!("value {} is above maximum {}", value, max)),
            _ => None,
        }
    }
}

/// Require a string, list or mapping length within bounds
#[derive(Debug)]
pub struct Length {
    min_length: Option<usize>,
    max_length: Option<usize>,
}

#[derive(Deserialize)]
struct LengthConfig {
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(default)]
    max_length: Option<usize>,
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

impl ConfiguredOperation for Length {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Require a string, list or mapping length within bounds";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .optional(
                "min_length",
                ConfigParam::new(ConfigType::Int, "Minimum length").example(json!(1)),
            )
            .optional(
                "max_length",
                ConfigParam::new(ConfigType::Int, "Maximum length").example(json!(255)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: LengthConfig = parse_config(config)?;
        Ok(Self {
            min_length: cfg.min_length,
            max_length: cfg.max_length,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for Length {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(length_of(value).is_some_and(|len| {
            self.min_length.map_or(true, |min| len >= min)
                && self.max_length.map_or(true, |max| len <= max)
        }))
    }

    fn describe_failure(&self, value: &Value) -> Option<String> {
        let len = length_of(value)?;
        match (self.min_length, self.max_length) {
            (Some(min), _) if len < min => Some(format!("length {} is below minimum {}", len, min)),
            (_, Some(max)) if len > max => Some(format!("length {} is above maximum {}", len, max)),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern checks
// ─────────────────────────────────────────────────────────────────────────────

/// Require a string matching a pattern at its start
#[derive(Debug)]
pub struct RegexMatch {
    pattern: Regex,
}

#[derive(Deserialize)]
struct RegexConfig {
    pattern: String,
    #[serde(default)]
    flags: String,
}

impl ConfiguredOperation for RegexMatch {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Require a string matching a regular expression";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "pattern",
                ConfigParam::new(ConfigType::Str, "Regular expression, anchored at the start")
                    .example(json!("^[A-Z]{3}-\\d{4}$")),
            )
            .optional(
                "flags",
                ConfigParam::new(ConfigType::Str, "Any of i (ignore case), m (multi-line), s (dot matches newline)")
                    .default_value(json!(""))
                    .example(json!("i")),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: RegexConfig = parse_config(config)?;
        let pattern = RegexBuilder::new(&format!(r"\A(?:{})", cfg.pattern))
            .case_insensitive(cfg.flags.contains('i'))
            .multi_line(cfg.flags.contains('m'))
            .dot_matches_new_line(cfg.flags.contains('s'))
            .build()
            .map_err(|e| ConfigValidationError::invalid("pattern", e.to_string()))?;
        Ok(Self { pattern })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for RegexMatch {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(value.as_str().is_some_and(|s| self.pattern.is_match(s)))
    }
}

/// Require a plausible email address
#[derive(Debug)]
pub struct Email {
    pattern: Regex,
}

impl ConfiguredOperation for Email {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Require a well-formed email address";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
    }

    fn from_config(_config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let pattern = Regex::new(EMAIL_PATTERN)
            .map_err(|e| ConfigValidationError::invalid("pattern", e.to_string()))?;
        Ok(Self { pattern })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for Email {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(value.as_str().is_some_and(|s| self.pattern.is_match(s)))
    }

    fn describe_failure(&self, value: &Value) -> Option<String> {
        Some(format!("{} is not a valid email address", value))
    }
}

/// Require a URL with an allowed scheme
#[derive(Debug)]
pub struct Url {
    pattern: Regex,
}

#[derive(Deserialize)]
struct UrlConfig {
    #[serde(default = "default_schemes")]
    schemes: Vec<String>,
}

fn default_schemes() -> Vec<String> {
    vec!["http".into(), "https".into()]
}

impl ConfiguredOperation for Url {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Require a URL with an allowed scheme";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().optional(
            "schemes",
            ConfigParam::new(ConfigType::List, "Allowed URL schemes")
                .default_value(json!(["http", "https"]))
                .example(json!(["https", "ftp"])),
        )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: UrlConfig = parse_config(config)?;
        if cfg.schemes.is_empty() {
            return Err(ConfigValidationError::invalid("schemes", "at least one scheme is required"));
        }
        let schemes: Vec<String> = cfg.schemes.iter().map(|s| regex::escape(s)).collect();
        let pattern = RegexBuilder::new(&format!(
            r"^(?:{})://[^\s/$.?#][^\s]*$",
            schemes.join("|")
        ))
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigValidationError::invalid("schemes", e.to_string()))?;
        Ok(Self { pattern })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for Url {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(value.as_str().is_some_and(|s| self.pattern.is_match(s)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// type
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExpectedType {
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
    None,
}

impl ExpectedType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::None => "none",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Str => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::Bool => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Dict => value.is_object(),
            Self::None => value.is_null(),
        }
    }
}

/// Require a value of a given type
#[derive(Debug)]
pub struct TypeCheck {
    expected: ExpectedType,
}

#[derive(Deserialize)]
struct TypeCheckConfig {
    expected_type: ExpectedType,
}

impl ConfiguredOperation for TypeCheck {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Require a value of the given type";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().required(
            "expected_type",
            ConfigParam::new(ConfigType::Str, "One of str, int, float, bool, list, dict, none")
                .example(json!("int")),
        )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: TypeCheckConfig = parse_config(config)?;
        Ok(Self {
            expected: cfg.expected_type,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for TypeCheck {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(self.expected.matches(value))
    }

    fn describe_failure(&self, value: &Value) -> Option<String> {
        Some(format!(
            "expected {} but got {}",
            self.expected.as_str(),
            type_name(value)
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Membership
// ─────────────────────────────────────────────────────────────────────────────

/// Require the value to be one of a list
#[derive(Debug)]
pub struct InList {
    allowed: Vec<Value>,
    case_sensitive: bool,
}

#[derive(Deserialize)]
struct InListConfig {
    allowed_values: Vec<Value>,
    #[serde(default = "default_true")]
    case_sensitive: bool,
}

fn default_true() -> bool {
    true
}

impl ConfiguredOperation for InList {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Require the value to be one of the allowed values";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "allowed_values",
                ConfigParam::new(ConfigType::List, "Accepted values")
                    .example(json!(["active", "pending"])),
            )
            .optional(
                "case_sensitive",
                ConfigParam::new(ConfigType::Bool, "Compare strings case-sensitively")
                    .default_value(json!(true)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: InListConfig = parse_config(config)?;
        Ok(Self {
            allowed: cfg.allowed_values,
            case_sensitive: cfg.case_sensitive,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for InList {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(self
            .allowed
            .iter()
            .any(|allowed| values_equal(value, allowed, self.case_sensitive)))
    }

    fn describe_failure(&self, value: &Value) -> Option<String> {
        Some(format!("{} is not one of the allowed values", value))
    }
}

/// Reject the value if it is in a list
#[derive(Debug)]
pub struct NotInList {
    forbidden: Vec<Value>,
    case_sensitive: bool,
}

#[derive(Deserialize)]
struct NotInListConfig {
    forbidden_values: Vec<Value>,
    #[serde(default = "default_true")]
    case_sensitive: bool,
}

impl ConfiguredOperation for NotInList {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Reject values found in the forbidden list";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "forbidden_values",
                ConfigParam::new(ConfigType::List, "Rejected values").example(json!(["admin", "root"])),
            )
            .optional(
                "case_sensitive",
                ConfigParam::new(ConfigType::Bool, "Compare strings case-sensitively")
                    .default_value(json!(true)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: NotInListConfig = parse_config(config)?;
        Ok(Self {
            forbidden: cfg.forbidden_values,
            case_sensitive: cfg.case_sensitive,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for NotInList {
    async fn validate(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        Ok(!self
            .forbidden
            .iter()
            .any(|forbidden| values_equal(value, forbidden, self.case_sensitive)))
    }

    fn describe_failure(&self, value: &Value) -> Option<String> {
        Some(format!("{} is not allowed", value))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// comparison
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Comparator {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Compare the value against a constant or a shared-data entry
#[derive(Debug)]
pub struct Comparison {
    operator: Comparator,
    target: CompareTarget,
}

#[derive(Debug)]
enum CompareTarget {
    Constant(Value),
    Context(DotPath),
}

#[derive(Deserialize)]
struct ComparisonConfig {
    #[serde(default)]
    operator: Comparator,
    #[serde(default)]
    compare_to: Value,
    #[serde(default)]
    context_key: Option<String>,
}

fn ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl ConfiguredOperation for Comparison {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str =
        "Compare the value against a constant or a value in shared data";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "operator",
                ConfigParam::new(ConfigType::Str, "One of eq, ne, lt, le, gt, ge").example(json!("ge")),
            )
            .optional(
                "compare_to",
                ConfigParam::new(ConfigType::Any, "Constant to compare with").example(json!(18)),
            )
            .optional(
                "context_key",
                ConfigParam::new(ConfigType::Str, "Dot path into shared data; overrides compare_to")
                    .example(json!("limits.min_age")),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: ComparisonConfig = parse_config(config)?;
        let target = match cfg.context_key {
            Some(key) => CompareTarget::Context(
                DotPath::parse(&key).map_err(|e| e.into_config_error("context_key"))?,
            ),
            None => CompareTarget::Constant(cfg.compare_to),
        };
        Ok(Self {
            operator: cfg.operator,
            target,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for Comparison {
    async fn validate(
        &self,
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        let other = match &self.target {
            CompareTarget::Constant(v) => v.clone(),
            CompareTarget::Context(path) => path
                .get_in(&context.shared_data)
                .cloned()
                .unwrap_or(Value::Null),
        };
        let other = &other;

        Ok(match self.operator {
            Comparator::Eq => values_equal(value, other, true),
            Comparator::Ne => !values_equal(value, other, true),
            Comparator::Lt => ordering(value, other) == Some(Ordering::Less),
            Comparator::Le => matches!(ordering(value, other), Some(Ordering::Less | Ordering::Equal)),
            Comparator::Gt => ordering(value, other) == Some(Ordering::Greater),
            Comparator::Ge => matches!(
                ordering(value, other),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// unique
// ─────────────────────────────────────────────────────────────────────────────

/// Reject values already seen under the same key
///
/// Seen values live in shared data under `__unique__.<key>`, so they span
/// every step and nested run of the executor and persist across repeated
/// `execute_pipeline` calls on it.
#[derive(Debug)]
pub struct Unique {
    key: String,
}

#[derive(Deserialize)]
struct UniqueConfig {
    #[serde(default = "default_unique_key")]
    key: String,
}

fn default_unique_key() -> String {
    "default".into()
}

impl ConfiguredOperation for Unique {
    const CATEGORY: Category = Category::Validation;
    const DESCRIPTION: &'static str = "Reject values already seen under the same key";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().optional(
            "key",
            ConfigParam::new(ConfigType::Str, "Name of the set of seen values")
                .default_value(json!("default"))
                .example(json!("emails")),
        )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: UniqueConfig = parse_config(config)?;
        Ok(Self { key: cfg.key })
    }

    fn into_operation(self) -> Operation {
        Operation::Validation(Box::new(self))
    }
}

#[async_trait]
impl Validation for Unique {
    async fn validate(
        &self,
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        let sets = context
            .shared_data
            .entry(UNIQUE_SEEN_KEY)
            .or_insert_with(|| json!({}));
        let Value::Object(sets) = sets else {
            return Err(OperationError::failed(format!(
                "shared data key '{}' is reserved for unique and must be a mapping",
                UNIQUE_SEEN_KEY
            )));
        };
        let seen = sets.entry(self.key.clone()).or_insert_with(|| json!([]));
        let Value::Array(seen) = seen else {
            return Err(OperationError::failed(format!(
                "seen set '{}' is not a list",
                self.key
            )));
        };

        if seen.contains(value) {
            return Ok(false);
        }
        seen.push(value.clone());
        Ok(true)
    }

    fn describe_failure(&self, value: &Value) -> Option<String> {
        Some(format!("{} has already been seen", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::{validate, validate_in};

    #[tokio::test]
    async fn test_required() {
        assert!(!validate("required", json!({}), json!(null)).await);
        assert!(!validate("required", json!({}), json!("   ")).await);
        assert!(!validate("validate_required", json!({}), json!([])).await);
        assert!(validate("required", json!({"allow_empty_string": true}), json!("")).await);
        assert!(validate("required", json!({}), json!(0)).await);
    }

    #[tokio::test]
    async fn test_range_and_length() {
        assert!(validate("range", json!({"min": 0, "max": 10}), json!(5)).await);
        assert!(validate("range", json!({"min": 0, "max": 10}), json!("7.5")).await);
        assert!(!validate("range", json!({"max": 10}), json!(11)).await);
        assert!(!validate("validate_range", json!({"min": 0}), json!("abc")).await);

        assert!(validate("length", json!({"min_length": 2}), json!("ab")).await);
        assert!(!validate("length", json!({"max_length": 2}), json!([1, 2, 3])).await);
        assert!(!validate("validate_length", json!({"min_length": 1}), json!(5)).await);
    }

    #[test]
    fn test_range_failure_description() {
        let op = Range {
            min: None,
            max: Some(100.0),
        };
        assert_eq!(
            op.describe_failure(&json!(150)).unwrap(),
            "value 150 is above maximum 100"
        );
    }

    #[test]
    fn test_email_shapes() {
        tokio_test::block_on(async {
            assert!(validate("email", json!({}), json!("ada@example.com")).await);
            assert!(!validate("email", json!({}), json!("ada@example")).await);
            assert!(!validate("validate_email", json!({}), json!("@example.com")).await);
        });
    }

    #[tokio::test]
    async fn test_regex_is_anchored_at_start() {
        let config = json!({"pattern": "\\d+"});
        assert!(validate("regex", config.clone(), json!("123abc")).await);
        assert!(!validate("regex", config, json!("abc123")).await);
        assert!(validate("validate_regex", json!({"pattern": "abc", "flags": "i"}), json!("ABC")).await);
    }

    #[tokio::test]
    async fn test_email_and_url() {
        assert!(validate("email", json!({}), json!("alice@example.com")).await);
        assert!(!validate("email", json!({}), json!("alice@example")).await);
        assert!(validate("url", json!({}), json!("https://example.com/path")).await);
        assert!(!validate("url", json!({}), json!("ftp://example.com")).await);
        assert!(validate("validate_url", json!({"schemes": ["ftp"]}), json!("FTP://host")).await);
    }

    #[tokio::test]
    async fn test_type_check() {
        assert!(validate("type", json!({"expected_type": "int"}), json!(3)).await);
        assert!(!validate("type", json!({"expected_type": "int"}), json!(3.5)).await);
        assert!(validate("validate_type", json!({"expected_type": "none"}), json!(null)).await);
        assert!(validate("type", json!({"expected_type": "dict"}), json!({})).await);
    }

    #[tokio::test]
    async fn test_membership() {
        let allowed = json!({"allowed_values": ["active", "pending"], "case_sensitive": false});
        assert!(validate("in_list", allowed.clone(), json!("ACTIVE")).await);
        assert!(!validate("in_list", allowed, json!("closed")).await);
        assert!(validate("in_list", json!({"allowed_values": [1, 2]}), json!(2.0)).await);
        assert!(!validate("not_in_list", json!({"forbidden_values": ["root"]}), json!("root")).await);
        assert!(validate("validate_not_in_list", json!({"forbidden_values": ["root"]}), json!("bob")).await);
    }

    #[tokio::test]
    async fn test_comparison_with_constant_and_context() {
        assert!(validate("comparison", json!({"operator": "ge", "compare_to": 18}), json!(21)).await);
        assert!(!validate("compare", json!({"operator": "lt", "compare_to": 18}), json!(21)).await);
        assert!(!validate("compare", json!({"operator": "gt", "compare_to": "x"}), json!(1)).await);

        let mut context = ExecutionContext::default();
        context.shared_data.insert("limits".into(), json!({"min_age": 21}));
        assert!(
            validate_in(
                "compare",
                json!({"operator": "ge", "context_key": "limits.min_age"}),
                json!(21),
                &mut context
            )
            .await
        );
    }

    #[tokio::test]
    async fn test_unique_persists_in_shared_data() {
        let mut context = ExecutionContext::default();
        assert!(validate_in("unique", json!({}), json!("a"), &mut context).await);
        assert!(validate_in("unique", json!({}), json!("b"), &mut context).await);
        assert!(!validate_in("validate_unique", json!({}), json!("a"), &mut context).await);
        assert!(validate_in("unique", json!({"key": "other"}), json!("a"), &mut context).await);

        assert_eq!(
            context.shared_data[UNIQUE_SEEN_KEY],
            json!({"default": ["a", "b"], "other": ["a"]})
        );
    }
}

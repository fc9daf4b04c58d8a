// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Built-in transformations
//!
//! Each transformation maps the current value to a new one. Failures are
//! subject to the operation's `on_error` policy, applied by the executor.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use super::{
    parse_config, render_template, value_to_text, Category, ConfigParam, ConfigSchema,
    ConfigType, ConfiguredOperation, Operation, OperationConfig, Transformation,
};
use crate::errors::{ConfigValidationError, OperationError};
use crate::pipeline::ExecutionContext;
use crate::resolver::DotPath;

/// Truthiness used when filtering fields and casting to bool
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// extract_field
// ─────────────────────────────────────────────────────────────────────────────

/// Pull a nested field out of the value
#[derive(Debug)]
pub struct ExtractField {
    path: DotPath,
    default: Value,
}

#[derive(Deserialize)]
struct ExtractFieldConfig {
    field: String,
    #[serde(default)]
    default: Value,
}

impl ConfiguredOperation for ExtractField {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Extract a nested field from the value using dot notation";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "field",
                ConfigParam::new(ConfigType::Str, "Dot-notation path to the field")
                    .example(json!("user.profile.email")),
            )
            .optional(
                "default",
                ConfigParam::new(ConfigType::Any, "Value returned when the field is missing")
                    .default_value(Value::Null)
                    .example(json!("unknown")),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: ExtractFieldConfig = parse_config(config)?;
        let path = DotPath::parse(&cfg.field).map_err(|e| e.into_config_error("field"))?;
        Ok(Self {
            path,
            default: cfg.default,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for ExtractField {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        Ok(self
            .path
            .get(value)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// concatenate
// ─────────────────────────────────────────────────────────────────────────────

/// Join list items or selected mapping fields into a string
#[derive(Debug)]
pub struct Concatenate {
    separator: String,
    fields: Vec<String>,
}

#[derive(Deserialize)]
struct ConcatenateConfig {
    #[serde(default)]
    separator: String,
    #[serde(default)]
    fields: Vec<String>,
}

impl ConfiguredOperation for Concatenate {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Concatenate list items or mapping fields into a string";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .optional(
                "separator",
                ConfigParam::new(ConfigType::Str, "Separator placed between parts")
                    .default_value(json!(""))
                    .example(json!(" ")),
            )
            .optional(
                "fields",
                ConfigParam::new(ConfigType::List, "Mapping fields to join, in order")
                    .default_value(json!([]))
                    .example(json!(["first_name", "last_name"])),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: ConcatenateConfig = parse_config(config)?;
        Ok(Self {
            separator: cfg.separator,
            fields: cfg.fields,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for Concatenate {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        let parts: Vec<String> = match value {
            Value::Object(map) if !self.fields.is_empty() => self
                .fields
                .iter()
                .filter_map(|field| map.get(field))
                .filter(|v| is_truthy(v))
                .map(value_to_text)
                .collect(),
            Value::Array(items) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(value_to_text)
                .collect(),
            Value::Null => Vec::new(),
            other => vec![value_to_text(other)],
        };
        Ok(Value::String(parts.join(&self.separator)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// format_string
// ─────────────────────────────────────────────────────────────────────────────

/// Render a `{placeholder}` template
#[derive(Debug)]
pub struct FormatString {
    template: String,
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct FormatStringConfig {
    #[serde(default = "default_template")]
    template: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

fn default_template() -> String {
    "{value}".to_string()
}

impl ConfiguredOperation for FormatString {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str =
        "Format a string template with the value, extra fields and shared data";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .optional(
                "template",
                ConfigParam::new(ConfigType::Str, "Template with {placeholders}")
                    .default_value(json!("{value}"))
                    .example(json!("Hello, {value}!")),
            )
            .optional(
                "fields",
                ConfigParam::new(ConfigType::Dict, "Extra placeholder values")
                    .default_value(json!({}))
                    .example(json!({"greeting": "Hi"})),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: FormatStringConfig = parse_config(config)?;
        Ok(Self {
            template: cfg.template,
            fields: cfg.fields,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for FormatString {
    async fn transform(
        &self,
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        // Shared data wins over fields, fields win over the value
        let mut args = Map::new();
        args.insert("value".into(), value.clone());
        args.extend(self.fields.clone());
        args.extend(context.shared_data.clone());

        match render_template(&self.template, &args) {
            Ok(rendered) => Ok(Value::String(rendered)),
            Err(reason) => {
                warn!("format_string left the value unchanged: {}", reason);
                Ok(value.clone())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// type_cast
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastTarget {
    Int,
    Float,
    #[default]
    Str,
    Bool,
}

impl CastTarget {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
        }
    }
}

/// Convert the value to another scalar type
#[derive(Debug)]
pub struct TypeCast {
    target: CastTarget,
}

#[derive(Deserialize)]
struct TypeCastConfig {
    #[serde(default)]
    target_type: CastTarget,
}

impl ConfiguredOperation for TypeCast {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Cast the value to int, float, str or bool";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().optional(
            "target_type",
            ConfigParam::new(ConfigType::Str, "Target type: int, float, str or bool")
                .default_value(json!("str"))
                .example(json!("int")),
        )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: TypeCastConfig = parse_config(config)?;
        Ok(Self {
            target: cfg.target_type,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

/// Truncate toward zero; `None` when the result does not fit an `i64`
fn float_to_i64(f: f64) -> Option<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is out of range
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

impl TypeCast {
    fn cast(&self, value: &Value) -> Result<Value, OperationError> {
        let fail = || {
            OperationError::failed(format!(
                "cannot cast {} to {}",
                value,
                self.target.as_str()
            ))
        };

        match self.target {
            CastTarget::Int => match value {
                Value::Number(n) if n.is_u64() => n.as_i64().map(Value::from).ok_or_else(fail),
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().and_then(float_to_i64))
                    .map(Value::from)
                    .ok_or_else(fail),
                Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| fail()),
                Value::Bool(b) => Ok(Value::from(i64::from(*b))),
                _ => Err(fail()),
            },
            CastTarget::Float => match value {
                Value::Number(n) => n.as_f64().map(Value::from).ok_or_else(fail),
                Value::String(s) => s.trim().parse::<f64>().map(Value::from).map_err(|_| fail()),
                Value::Bool(b) => Ok(Value::from(if *b { 1.0 } else { 0.0 })),
                _ => Err(fail()),
            },
            CastTarget::Str => Ok(Value::String(value_to_text(value))),
            CastTarget::Bool => Ok(Value::Bool(match value {
                Value::String(s) => matches!(
                    s.trim().to_lowercase().as_str(),
                    "true" | "1" | "yes" | "on"
                ),
                other => is_truthy(other),
            })),
        }
    }
}

#[async_trait]
impl Transformation for TypeCast {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        self.cast(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// default_value
// ─────────────────────────────────────────────────────────────────────────────

/// Replace null (and optionally empty) values
#[derive(Debug)]
pub struct DefaultValue {
    default: Value,
    check_empty: bool,
}

#[derive(Deserialize)]
struct DefaultValueConfig {
    default: Value,
    #[serde(default)]
    check_empty: bool,
}

impl ConfiguredOperation for DefaultValue {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Provide a default when the value is null or empty";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "default",
                ConfigParam::new(ConfigType::Any, "Replacement value").example(json!("N/A")),
            )
            .optional(
                "check_empty",
                ConfigParam::new(ConfigType::Bool, "Also replace empty strings, lists and mappings")
                    .default_value(json!(false)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: DefaultValueConfig = parse_config(config)?;
        Ok(Self {
            default: cfg.default,
            check_empty: cfg.check_empty,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for DefaultValue {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        let empty = match value {
            Value::Null => true,
            Value::String(s) => self.check_empty && s.is_empty(),
            Value::Array(items) => self.check_empty && items.is_empty(),
            Value::Object(map) => self.check_empty && map.is_empty(),
            _ => false,
        };
        Ok(if empty {
            self.default.clone()
        } else {
            value.clone()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// map_values
// ─────────────────────────────────────────────────────────────────────────────

/// Look the value up in a mapping table
#[derive(Debug)]
pub struct MapValues {
    mapping: Map<String, Value>,
    default: Option<Value>,
    case_sensitive: bool,
}

#[derive(Deserialize)]
struct MapValuesConfig {
    mapping: Map<String, Value>,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default = "default_true")]
    case_sensitive: bool,
}

fn default_true() -> bool {
    true
}

impl ConfiguredOperation for MapValues {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Map the value through a lookup table";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "mapping",
                ConfigParam::new(ConfigType::Dict, "Lookup table from input to output")
                    .example(json!({"M": "Male", "F": "Female"})),
            )
            .optional(
                "default",
                ConfigParam::new(ConfigType::Any, "Value for unmapped inputs; the input is kept when unset")
                    .example(json!("Unknown")),
            )
            .optional(
                "case_sensitive",
                ConfigParam::new(ConfigType::Bool, "Match keys case-sensitively")
                    .default_value(json!(true)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: MapValuesConfig = parse_config(config)?;
        Ok(Self {
            mapping: cfg.mapping,
            default: cfg.default,
            case_sensitive: cfg.case_sensitive,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for MapValues {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        let key = match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
            _ => None,
        };

        let found = key.and_then(|key| {
            if self.case_sensitive {
                self.mapping.get(&key)
            } else {
                let lowered = key.to_lowercase();
                self.mapping
                    .iter()
                    .find(|(k, _)| k.to_lowercase() == lowered)
                    .map(|(_, v)| v)
            }
        });

        Ok(found
            .or(self.default.as_ref())
            .cloned()
            .unwrap_or_else(|| value.clone()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// json_parse / json_serialize
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a JSON string; other values pass through
#[derive(Debug)]
pub struct JsonParse;

impl ConfiguredOperation for JsonParse {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Parse a JSON string into a structured value";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
    }

    fn from_config(_config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        Ok(Self)
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for JsonParse {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        match value {
            Value::String(text) => serde_json::from_str(text)
                .map_err(|e| OperationError::failed(format!("invalid JSON: {}", e))),
            other => Ok(other.clone()),
        }
    }
}

/// Serialize a value to a JSON string; strings pass through
///
/// Mapping keys are always emitted in sorted order.
#[derive(Debug)]
pub struct JsonSerialize {
    indent: Option<usize>,
}

#[derive(Deserialize)]
struct JsonSerializeConfig {
    #[serde(default)]
    indent: Option<usize>,
}

impl ConfiguredOperation for JsonSerialize {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Serialize the value to a JSON string";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().optional(
            "indent",
            ConfigParam::new(ConfigType::Int, "Spaces per indentation level; compact when unset")
                .example(json!(2)),
        )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: JsonSerializeConfig = parse_config(config)?;
        Ok(Self {
            indent: cfg.indent,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for JsonSerialize {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        if value.is_string() {
            return Ok(value.clone());
        }

        let text = match self.indent {
            None => serde_json::to_string(value),
            Some(width) => {
                let indent = vec![b' '; width];
                let mut buf = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
                let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
                value
                    .serialize(&mut serializer)
                    .map(|_| String::from_utf8_lossy(&buf).into_owned())
            }
        };

        text.map(Value::String)
            .map_err(|e| OperationError::failed(format!("cannot serialize value: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// String helpers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StripMode {
    #[default]
    Both,
    Left,
    Right,
}

/// Trim whitespace from strings
#[derive(Debug)]
pub struct StripWhitespace {
    mode: StripMode,
}

#[derive(Deserialize)]
struct StripWhitespaceConfig {
    #[serde(default)]
    mode: StripMode,
}

impl ConfiguredOperation for StripWhitespace {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Strip whitespace from string values";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().optional(
            "mode",
            ConfigParam::new(ConfigType::Str, "Which side to strip: both, left or right")
                .default_value(json!("both"))
                .example(json!("left")),
        )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: StripWhitespaceConfig = parse_config(config)?;
        Ok(Self { mode: cfg.mode })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for StripWhitespace {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        let Value::String(text) = value else {
            return Ok(value.clone());
        };
        let stripped = match self.mode {
            StripMode::Both => text.trim(),
            StripMode::Left => text.trim_start(),
            StripMode::Right => text.trim_end(),
        };
        Ok(Value::String(stripped.to_string()))
    }
}

/// Lowercase strings
#[derive(Debug)]
pub struct Lowercase;

impl ConfiguredOperation for Lowercase {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Convert strings to lowercase";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
    }

    fn from_config(_config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        Ok(Self)
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for Lowercase {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        Ok(match value {
            Value::String(text) => Value::String(text.to_lowercase()),
            other => other.clone(),
        })
    }
}

/// Uppercase strings
#[derive(Debug)]
pub struct Uppercase;

impl ConfiguredOperation for Uppercase {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Convert strings to uppercase";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
    }

    fn from_config(_config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        Ok(Self)
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for Uppercase {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        Ok(match value {
            Value::String(text) => Value::String(text.to_uppercase()),
            other => other.clone(),
        })
    }
}

/// Replace substrings or regex matches
#[derive(Debug)]
pub struct Replace {
    matcher: Matcher,
    replacement: String,
    /// Zero replaces every match
    count: usize,
}

#[derive(Debug)]
enum Matcher {
    Literal(String),
    Pattern(Regex),
}

#[derive(Deserialize)]
struct ReplaceConfig {
    search: String,
    #[serde(default)]
    replace: String,
    #[serde(default)]
    count: usize,
    #[serde(default)]
    use_regex: bool,
}

impl ConfiguredOperation for Replace {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Replace substrings or regular expression matches";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .required(
                "search",
                ConfigParam::new(ConfigType::Str, "Text or pattern to find").example(json!("-")),
            )
            .optional(
                "replace",
                ConfigParam::new(ConfigType::Str, "Replacement; regex mode supports $1 groups")
                    .default_value(json!(""))
                    .example(json!("_")),
            )
            .optional(
                "count",
                ConfigParam::new(ConfigType::Int, "Maximum replacements, 0 for all")
                    .default_value(json!(0)),
            )
            .optional(
                "use_regex",
                ConfigParam::new(ConfigType::Bool, "Treat search as a regular expression")
                    .default_value(json!(false)),
            )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let cfg: ReplaceConfig = parse_config(config)?;
        let matcher = if cfg.use_regex {
            Matcher::Pattern(
                Regex::new(&cfg.search)
                    .map_err(|e| ConfigValidationError::invalid("search", e.to_string()))?,
            )
        } else {
            Matcher::Literal(cfg.search)
        };
        Ok(Self {
            matcher,
            replacement: cfg.replace,
            count: cfg.count,
        })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for Replace {
    async fn transform(
        &self,
        value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        let Value::String(text) = value else {
            return Ok(value.clone());
        };

        let replaced = match &self.matcher {
            Matcher::Literal(search) if search.is_empty() => text.clone(),
            Matcher::Literal(search) if self.count == 0 => text.replace(search, &self.replacement),
            Matcher::Literal(search) => text.replacen(search, &self.replacement, self.count),
            Matcher::Pattern(re) => re
                .replacen(text, self.count, self.replacement.as_str())
                .into_owned(),
        };
        Ok(Value::String(replaced))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// set_value
// ─────────────────────────────────────────────────────────────────────────────

/// Replace the value with a constant
#[derive(Debug)]
pub struct SetValue {
    value: Value,
}

impl ConfiguredOperation for SetValue {
    const CATEGORY: Category = Category::Transformation;
    const DESCRIPTION: &'static str = "Replace the value with a constant";

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().required(
            "value",
            ConfigParam::new(ConfigType::Any, "The new value").example(json!("N/A")),
        )
    }

    fn from_config(config: &OperationConfig) -> Result<Self, ConfigValidationError> {
        let value = config
            .get("value")
            .cloned()
            .ok_or_else(|| ConfigValidationError::missing("value"))?;
        Ok(Self { value })
    }

    fn into_operation(self) -> Operation {
        Operation::Transformation(Box::new(self))
    }
}

#[async_trait]
impl Transformation for SetValue {
    async fn transform(
        &self,
        _value: &Value,
        _context: &mut ExecutionContext,
    ) -> Result<Value, OperationError> {
        Ok(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::transform;

    #[tokio::test]
    async fn test_extract_field_nested_and_default() {
        let data = json!({"user": {"profile": {"email": "a@example.com"}}});
        assert_eq!(
            transform("extract_field", json!({"field": "user.profile.email"}), data.clone())
                .await
                .unwrap(),
            json!("a@example.com")
        );
        assert_eq!(
            transform("extract", json!({"field": "user.age", "default": 18}), data)
                .await
                .unwrap(),
            json!(18)
        );
    }

    #[tokio::test]
    async fn test_concatenate_fields_and_lists() {
        let person = json!({"first": "Ada", "middle": "", "last": "Lovelace"});
        assert_eq!(
            transform(
                "concatenate",
                json!({"separator": " ", "fields": ["first", "middle", "last"]}),
                person
            )
            .await
            .unwrap(),
            json!("Ada Lovelace")
        );
        assert_eq!(
            transform("concat", json!({"separator": ","}), json!(["a", null, 1]))
                .await
                .unwrap(),
            json!("a,1")
        );
    }

    #[tokio::test]
    async fn test_format_string_with_fields() {
        let result = transform(
            "format_string",
            json!({"template": "{greeting}, {value}!", "fields": {"greeting": "Hi"}}),
            json!("Bob"),
        )
        .await
        .unwrap();
        assert_eq!(result, json!("Hi, Bob!"));
    }

    #[tokio::test]
    async fn test_format_string_missing_placeholder_keeps_value() {
        let result = transform("format", json!({"template": "{nope}"}), json!("kept"))
            .await
            .unwrap();
        assert_eq!(result, json!("kept"));
    }

    #[tokio::test]
    async fn test_type_cast() {
        assert_eq!(
            transform("type_cast", json!({"target_type": "int"}), json!("42")).await.unwrap(),
            json!(42)
        );
        assert_eq!(
            transform("cast", json!({"target_type": "int"}), json!(3.9)).await.unwrap(),
            json!(3)
        );
        assert_eq!(
            transform("cast", json!({"target_type": "float"}), json!("2.5")).await.unwrap(),
            json!(2.5)
        );
        assert_eq!(
            transform("cast", json!({"target_type": "bool"}), json!("Yes")).await.unwrap(),
            json!(true)
        );
        assert_eq!(
            transform("cast", json!({}), json!(7)).await.unwrap(),
            json!("7")
        );
        assert!(transform("cast", json!({"target_type": "int"}), json!("abc"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_int_cast_out_of_range_fails() {
        let int = || json!({"target_type": "int"});
        assert!(transform("cast", int(), json!(1e300)).await.is_err());
        assert!(transform("cast", int(), json!(-1e19)).await.is_err());
        assert!(transform("cast", int(), json!(u64::MAX)).await.is_err());
        assert_eq!(
            transform("cast", int(), json!(-2.7)).await.unwrap(),
            json!(-2)
        );
    }

    #[tokio::test]
    async fn test_default_value() {
        assert_eq!(
            transform("default_value", json!({"default": "N/A"}), json!(null)).await.unwrap(),
            json!("N/A")
        );
        assert_eq!(
            transform("default", json!({"default": "N/A"}), json!("")).await.unwrap(),
            json!("")
        );
        assert_eq!(
            transform("default", json!({"default": "N/A", "check_empty": true}), json!(""))
                .await
                .unwrap(),
            json!("N/A")
        );
    }

    #[tokio::test]
    async fn test_map_values() {
        let config = json!({"mapping": {"M": "Male", "F": "Female"}, "default": "Unknown"});
        assert_eq!(
            transform("map_values", config.clone(), json!("F")).await.unwrap(),
            json!("Female")
        );
        assert_eq!(
            transform("map", config, json!("X")).await.unwrap(),
            json!("Unknown")
        );
        assert_eq!(
            transform(
                "map",
                json!({"mapping": {"yes": 1}, "case_sensitive": false}),
                json!("YES")
            )
            .await
            .unwrap(),
            json!(1)
        );
        assert_eq!(
            transform("map", json!({"mapping": {"a": 1}}), json!("b")).await.unwrap(),
            json!("b")
        );
    }

    #[tokio::test]
    async fn test_json_round_trip_operations() {
        assert_eq!(
            transform("json_parse", json!({}), json!("{\"a\": [1, 2]}")).await.unwrap(),
            json!({"a": [1, 2]})
        );
        assert!(transform("parse_json", json!({}), json!("{oops")).await.is_err());
        assert_eq!(
            transform("json_serialize", json!({}), json!({"b": 1, "a": 2})).await.unwrap(),
            json!("{\"a\":2,\"b\":1}")
        );
        assert_eq!(
            transform("serialize_json", json!({"indent": 2}), json!({"a": 1})).await.unwrap(),
            json!("{\n  \"a\": 1\n}")
        );
    }

    #[tokio::test]
    async fn test_string_helpers() {
        assert_eq!(
            transform("strip", json!({}), json!("  hi  ")).await.unwrap(),
            json!("hi")
        );
        assert_eq!(
            transform("strip_whitespace", json!({"mode": "left"}), json!("  hi  ")).await.unwrap(),
            json!("hi  ")
        );
        assert_eq!(
            transform("upper", json!({}), json!("abc")).await.unwrap(),
            json!("ABC")
        );
        assert_eq!(
            transform("lower", json!({}), json!("ABC")).await.unwrap(),
            json!("abc")
        );
        assert_eq!(
            transform("uppercase", json!({}), json!(5)).await.unwrap(),
            json!(5)
        );
    }

    #[tokio::test]
    async fn test_replace_literal_and_regex() {
        assert_eq!(
            transform("replace", json!({"search": "-", "replace": "_"}), json!("a-b-c"))
                .await
                .unwrap(),
            json!("a_b_c")
        );
        assert_eq!(
            transform("replace", json!({"search": "-", "replace": "_", "count": 1}), json!("a-b-c"))
                .await
                .unwrap(),
            json!("a_b-c")
        );
        assert_eq!(
            transform(
                "replace",
                json!({"search": "(\\d+)", "replace": "<$1>", "use_regex": true}),
                json!("a1b22")
            )
            .await
            .unwrap(),
            json!("a<1>b<22>")
        );
    }

    #[tokio::test]
    async fn test_set_value_accepts_null() {
        assert_eq!(
            transform("set", json!({"value": null}), json!("x")).await.unwrap(),
            json!(null)
        );
    }
}

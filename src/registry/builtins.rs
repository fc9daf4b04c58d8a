// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! The built-in operation catalog

use super::{OperationDescriptor, OperationRegistry};
use crate::config::HttpDefaults;
use crate::errors::ConfigValidationError;
use crate::operations::control_flow::{IfElse, OnPath};
use crate::operations::side_effects::{IncrementCounter, LogValue, Notify, StoreInContext};
use crate::operations::transformations::{
    Concatenate, DefaultValue, ExtractField, FormatString, JsonParse, JsonSerialize, Lowercase,
    MapValues, Replace, SetValue, StripWhitespace, TypeCast, Uppercase,
};
use crate::operations::validations::{
    Comparison, Email, InList, Length, NotInList, Range, RegexMatch, Required, TypeCheck, Unique,
    Url,
};
use crate::operations::ConfiguredOperation;

fn add<T: ConfiguredOperation>(
    registry: &mut OperationRegistry,
    name: &str,
    aliases: &[&str],
) -> Result<(), ConfigValidationError> {
    registry.register(name, OperationDescriptor::of::<T>(), aliases)
}

/// Register every built-in operation
#[cfg_attr(not(feature = "http"), allow(unused_variables))]
pub(super) fn register_all(
    registry: &mut OperationRegistry,
    http: &HttpDefaults,
) -> Result<(), ConfigValidationError> {
    // Transformations
    add::<ExtractField>(registry, "extract_field", &["extract"])?;
    add::<Concatenate>(registry, "concatenate", &["concat"])?;
    add::<FormatString>(registry, "format_string", &["format"])?;
    add::<TypeCast>(registry, "type_cast", &["cast"])?;
    add::<DefaultValue>(registry, "default_value", &["default"])?;
    add::<MapValues>(registry, "map_values", &["map"])?;
    add::<JsonParse>(registry, "json_parse", &["parse_json"])?;
    add::<JsonSerialize>(registry, "json_serialize", &["serialize_json"])?;
    add::<StripWhitespace>(registry, "strip_whitespace", &["strip"])?;
    add::<Lowercase>(registry, "lowercase", &["lower"])?;
    add::<Uppercase>(registry, "uppercase", &["upper"])?;
    add::<Replace>(registry, "replace", &[])?;
    add::<SetValue>(registry, "set_value", &["set"])?;

    // Validations
    add::<Required>(registry, "required", &["validate_required"])?;
    add::<Range>(registry, "range", &["validate_range"])?;
    add::<Length>(registry, "length", &["validate_length"])?;
    add::<RegexMatch>(registry, "regex", &["validate_regex"])?;
    add::<Email>(registry, "email", &["validate_email"])?;
    add::<Url>(registry, "url", &["validate_url"])?;
    add::<TypeCheck>(registry, "type", &["validate_type"])?;
    add::<InList>(registry, "in_list", &["validate_in_list"])?;
    add::<NotInList>(registry, "not_in_list", &["validate_not_in_list"])?;
    add::<Comparison>(registry, "comparison", &["compare"])?;
    add::<Unique>(registry, "unique", &["validate_unique"])?;

    // Side effects
    add::<LogValue>(registry, "log_value", &["log"])?;
    add::<StoreInContext>(registry, "store_in_context", &["store"])?;
    add::<IncrementCounter>(registry, "increment_counter", &[])?;
    add::<Notify>(registry, "notify", &[])?;

    #[cfg(feature = "http")]
    {
        use crate::operations::side_effects::HttpRequest;

        let defaults = http.clone();
        let descriptor = OperationDescriptor::of::<HttpRequest>().with_constructor(move |config| {
            HttpRequest::from_config_with(config, &defaults).map(HttpRequest::into_operation)
        });
        registry.register("http_request", descriptor, &["http"])?;
    }

    // Control flow
    add::<IfElse>(registry, "if_else", &["if"])?;
    add::<OnPath>(registry, "execute_pipeline_on_path", &["on_path"])?;

    Ok(())
}

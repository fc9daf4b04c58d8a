// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Educational messages
//!
//! Renders an operation's self-description (category semantics, config
//! schema and a runnable example) so a caller can fix a step without
//! reading source code.

use crate::operations::{Category, ConfigParam};
use crate::registry::OperationDescription;

/// Educational message with explanation and examples
#[derive(Debug, Clone)]
pub struct EducationalMessage {
    /// Short summary
    pub summary: String,
    /// Detailed explanation
    pub explanation: String,
    /// Example of correct usage
    pub example: Option<String>,
    /// Related command
    pub see_also: Option<String>,
}

impl EducationalMessage {
    /// Explain one operation from its registry description
    pub fn for_operation(desc: &OperationDescription) -> Self {
        let mut summary = format!("{} ({})", desc.name, desc.category);
        if !desc.aliases.is_empty() {
            summary.push_str(&format!(", also known as {}", desc.aliases.join(", ")));
        }

        let mut explanation = format!(
            "{}\n\n{}",
            desc.description,
            category_semantics(desc.category)
        );

        let schema = &desc.config_schema;
        if !schema.required.is_empty() {
            explanation.push_str("\n\nRequired config:");
            for (key, param) in &schema.required {
                explanation.push_str(&format!("\n  {}", param_line(key, param)));
            }
        }
        if !schema.optional.is_empty() {
            explanation.push_str("\n\nOptional config:");
            for (key, param) in &schema.optional {
                explanation.push_str(&format!("\n  {}", param_line(key, param)));
            }
        }

        Self {
            summary,
            explanation,
            example: serde_json::to_string_pretty(&desc.example).ok(),
            see_also: Some(format!("opchain list --category {}", desc.category)),
        }
    }

    /// Explain what a category of operation does to the chain value
    pub fn for_category(category: Category) -> Self {
        Self {
            summary: format!("{} operations", category),
            explanation: category_semantics(category).into(),
            example: None,
            see_also: Some(format!("opchain list --category {}", category)),
        }
    }
}

fn category_semantics(category: Category) -> &'static str {
    match category {
        Category::Transformation => {
            "A transformation replaces the current value with its output.\n\
             On failure, 'on_error' decides what happens: raise (default),\n\
             return_default, return_none or return_original."
        }
        Category::Validation => {
            "A validation leaves the value unchanged and fails the step\n\
             when the value does not satisfy its rule. A step-level\n\
             'error_message' replaces the failure message."
        }
        Category::SideEffect => {
            "A side effect acts on the value (logging, storing, HTTP)\n\
             but never changes it. Set 'on_error' to ignore for effects\n\
             that may fail without failing the step."
        }
        Category::ControlFlow => {
            "A control-flow operation runs nested pipelines against the\n\
             value. Nested runs share the same context, so state written\n\
             inside a branch is visible after it returns."
        }
    }
}

fn param_line(key: &str, param: &ConfigParam) -> String {
    let mut line = format!("{} ({})", key, param.kind);
    if let Some(default) = &param.default {
        line.push_str(&format!(", default {}", default));
    }
    if !param.description.is_empty() {
        line.push_str(&format!(": {}", param.description));
    }
    line
}

impl std::fmt::Display for EducationalMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.summary)?;
        writeln!(f)?;
        writeln!(f, "{}", self.explanation)?;

        if let Some(ref example) = self.example {
            writeln!(f)?;
            writeln!(f, "Example:")?;
            writeln!(f, "────────")?;
            writeln!(f, "{}", example)?;
        }

        if let Some(ref see_also) = self.see_also {
            writeln!(f)?;
            writeln!(f, "See also: {}", see_also)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OperationRegistry;

    #[test]
    fn test_operation_message_lists_schema() {
        let registry = OperationRegistry::with_builtins();
        let desc = registry.describe_operation("extract").unwrap();
        let text = EducationalMessage::for_operation(&desc).to_string();

        assert!(text.starts_with("extract_field (transformation), also known as extract"));
        assert!(text.contains("Required config:"));
        assert!(text.contains("field (str)"));
        assert!(text.contains("on_error (str), default \"raise\""));
        assert!(text.contains("\"operation\": \"extract_field\""));
    }

    #[test]
    fn test_category_message() {
        let msg = EducationalMessage::for_category(Category::SideEffect);
        assert_eq!(msg.summary, "side_effect operations");
        assert!(msg.explanation.contains("never changes it"));
    }
}

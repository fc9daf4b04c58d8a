// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! `{name}` placeholder templates

use serde_json::{Map, Value};

use super::value_to_text;

/// Substitute `{name}` placeholders from `args`
///
/// `{{` and `}}` produce literal braces. An unknown placeholder is an
/// error naming it.
pub fn render_template(template: &str, args: &Map<String, Value>) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    name.push(next);
                }
                if !closed {
                    return Err(format!("unclosed placeholder '{{{}'", name));
                }
                let value = args
                    .get(name.trim())
                    .ok_or_else(|| format!("unknown placeholder '{{{}}}'", name))?;
                out.push_str(&value_to_text(value));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

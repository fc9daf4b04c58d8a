// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Input resolution for `run` and `watch`
//!
//! `--input` is tried as a JSON literal first, then as a file, then as a
//! glob pattern. Files ending in `.json`, `.yaml` or `.yml` are parsed;
//! any other file is passed in as a string.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::errors::{OpchainError, OpchainResult};

/// One value to run a pipeline on
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    /// File the value came from, if any
    pub source: Option<PathBuf>,
    pub value: Value,
}

impl Input {
    pub fn label(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "<input>".into(),
        }
    }
}

/// Resolve an `--input` argument relative to `base_dir`
pub fn resolve(input: Option<&str>, base_dir: &Path) -> OpchainResult<Vec<Input>> {
    let Some(raw) = input else {
        return Ok(vec![Input {
            source: None,
            value: Value::Null,
        }]);
    };

    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Ok(vec![Input {
            source: None,
            value,
        }]);
    }

    let path = base_dir.join(raw);
    if path.is_file() {
        return Ok(vec![read_file(&path)?]);
    }

    if raw.contains(['*', '?', '[']) {
        return resolve_glob(raw, base_dir)?
            .iter()
            .map(|p| read_file(p))
            .collect();
    }

    Err(OpchainError::InvalidInput {
        message: format!(
            "'{}' is neither JSON nor an existing file; quote strings as JSON, e.g. '\"{}\"'",
            raw, raw
        ),
    })
}

/// Parse an optional `--context` argument into a shared-data mapping
pub fn parse_context(context: Option<&str>) -> OpchainResult<serde_json::Map<String, Value>> {
    match context {
        None => Ok(serde_json::Map::new()),
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(map),
            other => Err(OpchainError::InvalidInput {
                message: format!(
                    "--context must be a JSON object, got {}",
                    crate::operations::type_name(&other)
                ),
            }),
        },
    }
}

fn resolve_glob(pattern: &str, base_dir: &Path) -> OpchainResult<Vec<PathBuf>> {
    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        base_dir.join(pattern).to_string_lossy().to_string()
    };

    let mut files: Vec<PathBuf> = glob::glob(&full_pattern)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        return Err(OpchainError::NoInputFiles {
            pattern: pattern.to_string(),
        });
    }

    files.sort();
    Ok(files)
}

fn read_file(path: &Path) -> OpchainResult<Input> {
    let content = std::fs::read_to_string(path).map_err(|e| OpchainError::FileReadError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => Value::String(content),
    };

    Ok(Input {
        source: Some(path.to_path_buf()),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_literal_and_default() {
        let dir = tempfile::tempdir().unwrap();

        let inputs = resolve(Some(r#"{"a": 1}"#), dir.path()).unwrap();
        assert_eq!(inputs[0].value, json!({"a": 1}));
        assert_eq!(inputs[0].label(), "<input>");

        let inputs = resolve(None, dir.path()).unwrap();
        assert_eq!(inputs[0].value, Value::Null);
    }

    #[test]
    fn test_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "name: Ada\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "plain").unwrap();

        let yaml = resolve(Some("a.yaml"), dir.path()).unwrap();
        assert_eq!(yaml[0].value, json!({"name": "Ada"}));

        let text = resolve(Some("b.txt"), dir.path()).unwrap();
        assert_eq!(text[0].value, json!("plain"));
    }

    #[test]
    fn test_glob_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2.json"), "2").unwrap();
        std::fs::write(dir.path().join("1.json"), "1").unwrap();

        let inputs = resolve(Some("*.json"), dir.path()).unwrap();
        let values: Vec<Value> = inputs.into_iter().map(|i| i.value).collect();
        assert_eq!(values, vec![json!(1), json!(2)]);

        assert!(matches!(
            resolve(Some("*.csv"), dir.path()),
            Err(OpchainError::NoInputFiles { .. })
        ));
    }

    #[test]
    fn test_unquoted_string_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(Some("hello"), dir.path()).unwrap_err();
        assert!(err.to_string().contains("quote strings as JSON"));
    }

    #[test]
    fn test_context_must_be_object() {
        assert_eq!(parse_context(Some(r#"{"k": 1}"#)).unwrap()["k"], json!(1));
        assert!(parse_context(Some("[1]")).is_err());
        assert!(parse_context(None).unwrap().is_empty());
    }
}

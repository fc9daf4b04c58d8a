// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Dot-path field resolution
//!
//! A path such as `user.addresses.0.city` addresses a value nested inside
//! mappings and sequences. Segments index mapping keys; an all-digit
//! segment indexes a sequence. Lookups never fail for a missing field,
//! only for a malformed path.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::errors::ConfigValidationError;

/// Path resolution failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("malformed path '{path}': {reason}")]
    Malformed { path: String, reason: String },

    #[error("cannot set '{path}': the root value is not a mapping")]
    RootNotMapping { path: String },

    #[error("cannot set '{path}': segment '{segment}' is not a mapping")]
    NotAMapping { path: String, segment: String },

    #[error("cannot set '{path}': '{segment}' is not a valid index into a list")]
    InvalidIndex { path: String, segment: String },

    #[error("cannot set '{path}': index {index} is out of range for a list of {len}")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

impl PathError {
    /// Report a path from operation config as a config error on `key`
    pub fn into_config_error(self, key: &str) -> ConfigValidationError {
        ConfigValidationError::invalid(key, self.to_string())
    }
}

/// A parsed dot path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotPath {
    raw: String,
    segments: Vec<String>,
}

impl DotPath {
    /// Parse a path, rejecting empty paths and empty segments
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Malformed {
                path: path.into(),
                reason: "path is empty".into(),
            });
        }

        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if let Some(pos) = segments.iter().position(String::is_empty) {
            let reason = if pos == 0 {
                "leading '.'"
            } else if pos == segments.len() - 1 {
                "trailing '.'"
            } else {
                "empty segment"
            };
            return Err(PathError::Malformed {
                path: path.into(),
                reason: reason.into(),
            });
        }

        Ok(Self {
            raw: path.into(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Look up the addressed value; `None` when any segment is absent
    pub fn get<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| step(current, segment))
    }

    /// Look up the addressed value inside a bare mapping
    pub fn get_in<'v>(&self, map: &'v Map<String, Value>) -> Option<&'v Value> {
        let (first, rest) = self.segments.split_first()?;
        rest.iter()
            .try_fold(map.get(first)?, |current, segment| step(current, segment))
    }

    /// Write `value` at the path, creating intermediate mappings
    ///
    /// Returns the previous value at the path, if any. The root must be a
    /// mapping; it is mutated in place.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<Option<Value>, PathError> {
        match root {
            Value::Object(map) => self.set_in(map, value),
            _ => Err(PathError::RootNotMapping {
                path: self.raw.clone(),
            }),
        }
    }

    /// Write `value` at the path inside a bare mapping
    pub fn set_in(
        &self,
        map: &mut Map<String, Value>,
        value: Value,
    ) -> Result<Option<Value>, PathError> {
        // Parsing guarantees at least one segment
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(PathError::Malformed {
                path: self.raw.clone(),
                reason: "path is empty".into(),
            });
        };

        let Some((first, rest)) = parents.split_first() else {
            return Ok(map.insert(last.clone(), value));
        };

        let mut cursor = map
            .entry(first.clone())
            .or_insert_with(|| Value::Object(Map::new()));

        for segment in rest {
            cursor = match cursor {
                Value::Object(inner) => inner
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                Value::Array(items) => {
                    let index = self.index(segment)?;
                    let len = items.len();
                    items.get_mut(index).ok_or(PathError::IndexOutOfRange {
                        path: self.raw.clone(),
                        index,
                        len,
                    })?
                }
                _ => {
                    return Err(PathError::NotAMapping {
                        path: self.raw.clone(),
                        segment: segment.clone(),
                    })
                }
            };
        }

        match cursor {
            Value::Object(inner) => Ok(inner.insert(last.clone(), value)),
            Value::Array(items) => {
                let index = self.index(last)?;
                let len = items.len();
                let slot = items.get_mut(index).ok_or(PathError::IndexOutOfRange {
                    path: self.raw.clone(),
                    index,
                    len,
                })?;
                Ok(Some(std::mem::replace(slot, value)))
            }
            _ => Err(PathError::NotAMapping {
                path: self.raw.clone(),
                segment: last.clone(),
            }),
        }
    }

    fn index(&self, segment: &str) -> Result<usize, PathError> {
        parse_index(segment).ok_or_else(|| PathError::InvalidIndex {
            path: self.raw.clone(),
            segment: segment.into(),
        })
    }
}

impl std::fmt::Display for DotPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for DotPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn step<'v>(current: &'v Value, segment: &str) -> Option<&'v Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(parse_index(segment)?),
        _ => None,
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

/// Resolve `path` inside `root`
pub fn get<'v>(root: &'v Value, path: &str) -> Result<Option<&'v Value>, PathError> {
    Ok(DotPath::parse(path)?.get(root))
}

/// Write `value` at `path` inside `root`, returning the previous value
pub fn set(root: &mut Value, path: &str, value: Value) -> Result<Option<Value>, PathError> {
    DotPath::parse(path)?.set(root, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_nested_mapping() {
        let data = json!({"user": {"profile": {"email": "a@example.com"}}});
        assert_eq!(
            get(&data, "user.profile.email").unwrap(),
            Some(&json!("a@example.com"))
        );
    }

    #[test]
    fn test_get_missing_is_not_an_error() {
        let data = json!({"user": {"name": "alice"}});
        assert_eq!(get(&data, "user.age").unwrap(), None);
        assert_eq!(get(&data, "user.name.first").unwrap(), None);
        assert_eq!(get(&json!("scalar"), "a").unwrap(), None);
    }

    #[test]
    fn test_get_indexes_sequences() {
        let data = json!({"items": [{"name": "first"}, {"name": "second"}]});
        assert_eq!(get(&data, "items.1.name").unwrap(), Some(&json!("second")));
        assert_eq!(get(&data, "items.5.name").unwrap(), None);
        assert_eq!(get(&data, "items.first").unwrap(), None);
        assert_eq!(get(&data, "items.-1").unwrap(), None);
    }

    #[test]
    fn test_malformed_paths() {
        for path in ["", ".a", "a.", "a..b"] {
            assert!(
                matches!(DotPath::parse(path), Err(PathError::Malformed { .. })),
                "{path:?} should be rejected"
            );
        }
        let err = DotPath::parse("a.").unwrap_err();
        assert_eq!(err.to_string(), "malformed path 'a.': trailing '.'");
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let mut data = json!({"user": {}});
        let previous = set(&mut data, "user.profile.email", json!("b@example.com")).unwrap();

        assert_eq!(previous, None);
        assert_eq!(data, json!({"user": {"profile": {"email": "b@example.com"}}}));
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut data = json!({"a": {"b": 1, "c": 2}});
        let previous = set(&mut data, "a.b", json!(10)).unwrap();

        assert_eq!(previous, Some(json!(1)));
        assert_eq!(data, json!({"a": {"b": 10, "c": 2}}));
    }

    #[test]
    fn test_set_into_sequence() {
        let mut data = json!({"items": [{"n": 1}, {"n": 2}]});
        set(&mut data, "items.1.n", json!(20)).unwrap();
        assert_eq!(data, json!({"items": [{"n": 1}, {"n": 20}]}));

        let err = set(&mut data, "items.9.n", json!(0)).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfRange { index: 9, len: 2, .. }));

        let err = set(&mut data, "items.x", json!(0)).unwrap_err();
        assert!(matches!(err, PathError::InvalidIndex { .. }));
    }

    #[test]
    fn test_set_rejects_non_mapping_root_and_scalars() {
        let mut scalar = json!("text");
        assert!(matches!(
            set(&mut scalar, "a", json!(1)),
            Err(PathError::RootNotMapping { .. })
        ));

        let mut data = json!({"a": 5});
        assert!(matches!(
            set(&mut data, "a.b", json!(1)),
            Err(PathError::NotAMapping { .. })
        ));
        assert_eq!(data, json!({"a": 5}));
    }

    #[test]
    fn test_map_helpers() {
        let mut map = Map::new();
        let path = DotPath::parse("stats.count").unwrap();
        path.set_in(&mut map, json!(3)).unwrap();

        assert_eq!(path.get_in(&map), Some(&json!(3)));
        assert_eq!(Value::Object(map), json!({"stats": {"count": 3}}));
    }
}

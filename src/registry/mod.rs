// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Operation registry
//!
//! Maps canonical names and aliases to operation constructors. Lookups
//! that miss come back with ranked near-miss suggestions, and every entry
//! can describe itself (schema plus a runnable example), so the catalog
//! is discoverable without reading source.
//!
//! A registry is an ordinary value. [`OperationRegistry::global`] returns
//! the process-wide default used by executors that are not handed one.

mod builtins;
mod suggest;

pub use suggest::{rank, similarity, SuggestionConfig};

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::errors::{ConfigValidationError, OperationError, OperationNotFoundError};
use crate::operations::{
    Category, ConfigSchema, ConfiguredOperation, ErrorRecovery, Operation, OperationConfig,
};

type Constructor =
    dyn Fn(&OperationConfig) -> Result<Operation, ConfigValidationError> + Send + Sync;

/// How to build one operation, plus its documentation
#[derive(Clone)]
pub struct OperationDescriptor {
    pub category: Category,
    pub description: String,
    /// Declared schema extended with the category's error handling keys
    pub schema: ConfigSchema,
    constructor: Arc<Constructor>,
}

impl OperationDescriptor {
    pub fn new<F>(
        category: Category,
        description: impl Into<String>,
        mut schema: ConfigSchema,
        constructor: F,
    ) -> Self
    where
        F: Fn(&OperationConfig) -> Result<Operation, ConfigValidationError> + Send + Sync + 'static,
    {
        ErrorRecovery::extend_schema(category, &mut schema);
        Self {
            category,
            description: description.into(),
            schema,
            constructor: Arc::new(constructor),
        }
    }

    /// Descriptor of a [`ConfiguredOperation`] type
    pub fn of<T: ConfiguredOperation>() -> Self {
        Self::new(T::CATEGORY, T::DESCRIPTION, T::config_schema(), |config| {
            T::from_config(config).map(T::into_operation)
        })
    }

    /// Replace the constructor, keeping category and schema
    pub fn with_constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&OperationConfig) -> Result<Operation, ConfigValidationError> + Send + Sync + 'static,
    {
        self.constructor = Arc::new(constructor);
        self
    }

    pub fn build(&self, config: &OperationConfig) -> Result<Operation, ConfigValidationError> {
        (self.constructor)(config)
    }
}

impl std::fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("category", &self.category)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// An operation built for one step
#[derive(Debug)]
pub struct ResolvedOperation {
    /// Name as requested
    pub name: String,
    pub canonical: String,
    pub operation: Operation,
    pub recovery: ErrorRecovery,
    pub descriptor: Arc<OperationDescriptor>,
}

impl ResolvedOperation {
    pub fn config_schema(&self) -> &ConfigSchema {
        &self.descriptor.schema
    }
}

/// Catalog listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub name: String,
    pub description: String,
    pub category: Category,
}

/// Full self-description of an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDescription {
    pub name: String,
    pub aliases: Vec<String>,
    pub category: Category,
    pub description: String,
    pub config_schema: ConfigSchema,
    /// A step using the operation with its required example values
    pub example: Value,
}

/// Operation registry
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    /// Canonical name to descriptor
    entries: BTreeMap<String, Arc<OperationDescriptor>>,
    /// Canonical names and aliases to canonical name
    names: BTreeMap<String, String>,
    suggestions: SuggestionConfig,
}

static GLOBAL: OnceLock<RwLock<Arc<OperationRegistry>>> = OnceLock::new();

fn global_cell() -> &'static RwLock<Arc<OperationRegistry>> {
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(OperationRegistry::with_builtins())))
}

impl OperationRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in catalog
    ///
    /// # Panics
    ///
    /// When two built-ins claim the same name.
    pub fn with_builtins() -> Self {
        Self::from_config(&EngineConfig::default())
            .unwrap_or_else(|e| panic!("built-in catalog is inconsistent: {}", e))
    }

    /// Built-in catalog with suggestion and HTTP settings from `config`
    ///
    /// Fails rather than returning a partial catalog when a built-in name
    /// collides.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigValidationError> {
        let mut registry = Self::new().with_suggestions(config.suggestions);
        builtins::register_all(&mut registry, &config.http)?;
        Ok(registry)
    }

    pub fn with_suggestions(mut self, suggestions: SuggestionConfig) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// The process-wide registry, built-ins preloaded
    pub fn global() -> Arc<Self> {
        global_cell()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the process-wide registry
    pub fn set_global(registry: OperationRegistry) {
        *global_cell().write().unwrap_or_else(PoisonError::into_inner) = Arc::new(registry);
    }

    /// Register into the process-wide registry
    ///
    /// Executors already holding the previous registry keep it.
    pub fn register_global(
        name: &str,
        descriptor: OperationDescriptor,
        aliases: &[&str],
    ) -> Result<(), ConfigValidationError> {
        let mut guard = global_cell().write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut guard).register(name, descriptor, aliases)
    }

    /// Register an operation under `name` and `aliases`
    ///
    /// Fails when any of the names is already taken.
    pub fn register(
        &mut self,
        name: &str,
        descriptor: OperationDescriptor,
        aliases: &[&str],
    ) -> Result<(), ConfigValidationError> {
        let mut requested: Vec<&str> = Vec::with_capacity(aliases.len() + 1);
        for candidate in std::iter::once(name).chain(aliases.iter().copied()) {
            if candidate.is_empty() {
                return Err(ConfigValidationError::invalid("name", "operation names cannot be empty")
                    .for_operation(name));
            }
            if self.names.contains_key(candidate) || requested.contains(&candidate) {
                return Err(ConfigValidationError::invalid(
                    "name",
                    format!("'{}' is already registered", candidate),
                )
                .for_operation(name));
            }
            requested.push(candidate);
        }

        self.insert(name, descriptor, aliases);
        Ok(())
    }

    /// Register, replacing whatever the names currently point at
    pub fn register_with_override(
        &mut self,
        name: &str,
        descriptor: OperationDescriptor,
        aliases: &[&str],
    ) {
        for candidate in std::iter::once(name).chain(aliases.iter().copied()) {
            match self.names.get(candidate).cloned() {
                Some(canonical) if canonical == candidate => {
                    self.unregister(&canonical);
                }
                Some(_) => {
                    self.names.remove(candidate);
                }
                None => {}
            }
        }
        self.insert(name, descriptor, aliases);
    }

    /// Register a [`ConfiguredOperation`] type
    pub fn register_operation<T: ConfiguredOperation>(
        &mut self,
        name: &str,
        aliases: &[&str],
    ) -> Result<(), ConfigValidationError> {
        self.register(name, OperationDescriptor::of::<T>(), aliases)
    }

    /// Remove an operation and its aliases; `false` when unknown
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(canonical) = self.names.get(name).cloned() else {
            return false;
        };
        self.entries.remove(&canonical);
        self.names.retain(|_, target| *target != canonical);
        true
    }

    fn insert(&mut self, name: &str, descriptor: OperationDescriptor, aliases: &[&str]) {
        self.entries.insert(name.to_string(), Arc::new(descriptor));
        for n in std::iter::once(name).chain(aliases.iter().copied()) {
            self.names.insert(n.to_string(), name.to_string());
        }
    }

    /// Canonical name of a name or alias
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    pub fn descriptor(&self, name: &str) -> Option<&Arc<OperationDescriptor>> {
        self.canonical_name(name)
            .and_then(|canonical| self.entries.get(canonical))
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    fn lookup(&self, name: &str) -> Result<(&str, &Arc<OperationDescriptor>), OperationNotFoundError> {
        self.canonical_name(name)
            .and_then(|canonical| {
                self.entries
                    .get(canonical)
                    .map(|descriptor| (canonical, descriptor))
            })
            .ok_or_else(|| self.not_found(name))
    }

    /// Check `config` and build the operation for one step
    pub fn get_operation(
        &self,
        name: &str,
        config: &OperationConfig,
    ) -> Result<ResolvedOperation, OperationError> {
        let (canonical, descriptor) = self.lookup(name)?;

        let issues = descriptor.schema.check(config);
        if !issues.is_empty() {
            return Err(ConfigValidationError::new(issues)
                .for_operation(canonical)
                .into());
        }

        let recovery = ErrorRecovery::from_config(descriptor.category, config)
            .map_err(|e| e.for_operation(canonical))?;
        let operation = descriptor
            .build(config)
            .map_err(|e| e.for_operation(canonical))?;

        Ok(ResolvedOperation {
            name: name.to_string(),
            canonical: canonical.to_string(),
            operation,
            recovery,
            descriptor: Arc::clone(descriptor),
        })
    }

    /// Catalog entries sorted by category, then name
    pub fn list_operations(&self, category: Option<Category>) -> Vec<OperationSummary> {
        let mut summaries: Vec<OperationSummary> = self
            .entries
            .iter()
            .filter(|(_, d)| category.map_or(true, |c| d.category == c))
            .map(|(name, d)| OperationSummary {
                name: name.clone(),
                description: d.description.clone(),
                category: d.category,
            })
            .collect();
        summaries.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        summaries
    }

    /// Canonical names grouped by category
    pub fn list_by_category(&self) -> BTreeMap<Category, Vec<String>> {
        let mut grouped: BTreeMap<Category, Vec<String>> = BTreeMap::new();
        for (name, d) in &self.entries {
            grouped.entry(d.category).or_default().push(name.clone());
        }
        grouped
    }

    /// Aliases of an operation, canonical name excluded
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let Some(canonical) = self.canonical_name(name) else {
            return Vec::new();
        };
        self.names
            .iter()
            .filter(|(n, target)| *target == canonical && n.as_str() != canonical)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn config_schema(&self, name: &str) -> Result<ConfigSchema, OperationNotFoundError> {
        self.lookup(name).map(|(_, d)| d.schema.clone())
    }

    /// Describe an operation by name or alias
    pub fn describe_operation(&self, name: &str) -> Result<OperationDescription, OperationNotFoundError> {
        let (canonical, descriptor) = self.lookup(name)?;
        let mut example = json!({ "operation": canonical });
        let example_config = descriptor.schema.example_config();
        if !example_config.is_empty() {
            example["operation_config"] = Value::Object(example_config);
        }

        Ok(OperationDescription {
            name: canonical.to_string(),
            aliases: self.aliases_of(canonical),
            category: descriptor.category,
            description: descriptor.description.clone(),
            config_schema: descriptor.schema.clone(),
            example,
        })
    }

    /// Ranked near-miss canonical names for `name`
    pub fn suggest(&self, name: &str) -> Vec<String> {
        rank(
            name,
            self.names.iter().map(|(n, c)| (n.as_str(), c.as_str())),
            &self.suggestions,
        )
    }

    /// Not-found error for `name`, with suggestions
    pub fn not_found(&self, name: &str) -> OperationNotFoundError {
        OperationNotFoundError {
            operation: name.to_string(),
            suggestions: self.suggest(name),
            available: self.entries.keys().cloned().collect(),
        }
    }

    /// Number of canonical operations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::transformations::Uppercase;
    use crate::operations::Transformation;
    use crate::pipeline::ExecutionContext;
    use async_trait::async_trait;
    use serde_json::json;

    struct Shout;

    #[async_trait]
    impl Transformation for Shout {
        async fn transform(
            &self,
            value: &Value,
            _context: &mut ExecutionContext,
        ) -> Result<Value, OperationError> {
            Ok(json!(format!("{}!", value.as_str().unwrap_or_default())))
        }
    }

    fn shout() -> OperationDescriptor {
        OperationDescriptor::new(
            Category::Transformation,
            "Append an exclamation mark",
            ConfigSchema::new(),
            |_| Ok(Operation::Transformation(Box::new(Shout))),
        )
    }

    fn config(value: Value) -> OperationConfig {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_alias_transparency() {
        let registry = OperationRegistry::with_builtins();
        for summary in registry.list_operations(None) {
            let canonical = registry.describe_operation(&summary.name).unwrap();
            for alias in &canonical.aliases {
                assert_eq!(registry.describe_operation(alias).unwrap(), canonical);
            }
        }
    }

    #[test]
    fn test_builtin_catalog_registers_cleanly() {
        let registry = OperationRegistry::from_config(&EngineConfig::default()).unwrap();
        assert_eq!(registry.len(), OperationRegistry::with_builtins().len());
        for name in ["extract", "upper", "range", "email", "log", "if_else", "on_path"] {
            assert!(registry.has_operation(name), "missing {}", name);
        }

        let mut registry = OperationRegistry::new();
        registry.register("uppercase", shout(), &[]).unwrap();
        let err = builtins::register_all(&mut registry, &EngineConfig::default().http).unwrap_err();
        assert!(err.to_string().contains("'uppercase' is already registered"));
    }

    #[test]
    fn test_register_rejects_collisions() {
        let mut registry = OperationRegistry::with_builtins();

        let err = registry.register("shout", shout(), &["upper"]).unwrap_err();
        assert!(err.to_string().contains("'upper' is already registered"));
        assert!(!registry.has_operation("shout"));

        registry.register("shout", shout(), &["yell"]).unwrap();
        assert_eq!(registry.canonical_name("yell"), Some("shout"));
        assert!(registry.register("yell", shout(), &[]).is_err());
    }

    #[test]
    fn test_register_with_override_replaces_entry() {
        let mut registry = OperationRegistry::with_builtins();
        registry.register_with_override("uppercase", shout(), &["shout"]);

        assert_eq!(
            registry.describe_operation("uppercase").unwrap().description,
            "Append an exclamation mark"
        );
        // The old alias went away with the replaced entry
        assert!(!registry.has_operation("upper"));
        assert_eq!(registry.aliases_of("uppercase"), vec!["shout"]);
    }

    #[test]
    fn test_register_operation_type() {
        let mut registry = OperationRegistry::new();
        registry.register_operation::<Uppercase>("caps", &[]).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.list_operations(None)[0].category,
            Category::Transformation
        );
    }

    #[test]
    fn test_get_operation_checks_config() {
        let registry = OperationRegistry::with_builtins();

        let err = registry.get_operation("extract", &config(json!({}))).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"Invalid configuration for 'extract_field': missing required config 'field'"
        );

        let err = registry
            .get_operation("upper", &config(json!({"on_error": "ignore"})))
            .unwrap_err();
        assert!(matches!(err, OperationError::Config(_)));

        let resolved = registry
            .get_operation("upper", &config(json!({"on_error": "return_original"})))
            .unwrap();
        assert_eq!(resolved.canonical, "uppercase");
        assert_eq!(resolved.name, "upper");
        assert_eq!(resolved.recovery.mode, crate::operations::OnError::ReturnOriginal);
    }

    #[test]
    fn test_not_found_suggestions() {
        let registry = OperationRegistry::with_builtins();
        let err = registry.describe_operation("extrct_field").unwrap_err();
        assert_eq!(err.suggestions[0], "extract_field");
        assert!(!err.suggestions.contains(&"extrct_field".to_string()));
        assert!(err.suggestions.len() <= 3);
        assert_eq!(err.suggestions, registry.suggest("extrct_field"));
    }

    #[test]
    fn test_list_operations_filter() {
        let registry = OperationRegistry::with_builtins();
        let control = registry.list_operations(Some(Category::ControlFlow));
        let names: Vec<_> = control.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["execute_pipeline_on_path", "if_else"]);

        let all = registry.list_operations(None);
        assert_eq!(all.len(), registry.len());
        assert_eq!(all[0].category, Category::Transformation);
    }

    #[test]
    fn test_describe_example_is_runnable() {
        let registry = OperationRegistry::with_builtins();
        for summary in registry.list_operations(None) {
            let desc = registry.describe_operation(&summary.name).unwrap();
            let example_config = desc
                .example
                .get("operation_config")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            assert!(
                registry.get_operation(&summary.name, &example_config).is_ok(),
                "example of {} does not build",
                summary.name
            );
        }
    }

    #[test]
    fn test_schema_carries_error_keys() {
        let registry = OperationRegistry::with_builtins();
        assert!(registry.config_schema("strip").unwrap().optional.contains_key("on_error"));
        assert!(registry.config_schema("store").unwrap().optional.contains_key("on_error"));
        assert!(registry
            .config_schema("email")
            .unwrap()
            .optional
            .contains_key("error_message"));
        assert!(!registry.config_schema("if").unwrap().optional.contains_key("on_error"));
    }
}

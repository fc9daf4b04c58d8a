// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Error types with actionable messages
//!
//! The taxonomy mirrors how a pipeline can go wrong: a step names an
//! operation that does not exist, an operation is configured badly, a
//! validation rejects the value, or a required step fails and aborts the
//! run. Each kind exports a stable [`ErrorReport`] suitable for API
//! responses and agent tool results.

mod educational;
mod recovery;

pub use educational::EducationalMessage;
pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for opchain operations
pub type OpchainResult<T> = Result<T, OpchainError>;

// ─────────────────────────────────────────────────────────────────────────────
// Structured export
// ─────────────────────────────────────────────────────────────────────────────

/// Machine-readable error description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Stable error kind, e.g. `OPERATION_NOT_FOUND`
    pub kind: &'static str,

    /// Human-readable message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<ConfigIssue>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorReport>>,
}

impl ErrorReport {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            step_index: None,
            operation: None,
            path: None,
            suggestions: None,
            issues: None,
            cause: None,
        }
    }

    /// Render as a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "kind": self.kind, "message": self.message })
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operation lookup
// ─────────────────────────────────────────────────────────────────────────────

/// A pipeline step named an operation the registry does not know
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown operation: '{operation}'.{}", did_you_mean(.suggestions))]
pub struct OperationNotFoundError {
    /// The name that was requested
    pub operation: String,
    /// Ranked near-miss canonical names
    pub suggestions: Vec<String>,
    /// All canonical names, sorted
    pub available: Vec<String>,
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" Did you mean: {}?", suggestions.join(", "))
    }
}

impl OperationNotFoundError {
    pub fn report(&self) -> ErrorReport {
        let mut report = ErrorReport::new("OPERATION_NOT_FOUND", self.to_string());
        report.operation = Some(self.operation.clone());
        report.suggestions = Some(self.suggestions.clone());
        report
    }
}

impl Diagnostic for OperationNotFoundError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new("opchain::operation_not_found"))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let help = match self.suggestions.first() {
            Some(best) => format!("Run 'opchain describe {}' to see its configuration", best),
            None => {
                let shown: Vec<&str> = self.available.iter().take(10).map(String::as_str).collect();
                let mut text = format!("Available operations: {}", shown.join(", "));
                if self.available.len() > shown.len() {
                    text.push_str(&format!(" ... ({} more)", self.available.len() - shown.len()));
                }
                text
            }
        };
        Some(Box::new(help))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// One problem with an operation's configuration mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum ConfigIssue {
    Missing {
        key: String,
    },
    WrongType {
        key: String,
        expected: String,
        found: String,
    },
    Invalid {
        key: String,
        reason: String,
    },
}

impl ConfigIssue {
    pub fn key(&self) -> &str {
        match self {
            Self::Missing { key } | Self::WrongType { key, .. } | Self::Invalid { key, .. } => key,
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "missing required config '{}'", key),
            Self::WrongType {
                key,
                expected,
                found,
            } => write!(
                f,
                "config '{}' has invalid type, expected {} but got {}",
                key, expected, found
            ),
            Self::Invalid { key, reason } => write!(f, "config '{}': {}", key, reason),
        }
    }
}

/// Malformed or missing operation configuration
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
#[error("{}", render_config_error(.operation, .issues))]
#[diagnostic(
    code(opchain::invalid_config),
    help("Run 'opchain describe <operation>' to see the expected configuration")
)]
pub struct ConfigValidationError {
    pub operation: Option<String>,
    pub issues: Vec<ConfigIssue>,
}

fn render_config_error(operation: &Option<String>, issues: &[ConfigIssue]) -> String {
    let detail = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    match operation {
        Some(op) => format!("Invalid configuration for '{}': {}", op, detail),
        None => format!("Invalid configuration: {}", detail),
    }
}

impl ConfigValidationError {
    pub fn new(issues: Vec<ConfigIssue>) -> Self {
        Self {
            operation: None,
            issues,
        }
    }

    pub fn missing(key: impl Into<String>) -> Self {
        Self::new(vec![ConfigIssue::Missing { key: key.into() }])
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(vec![ConfigIssue::Invalid {
            key: key.into(),
            reason: reason.into(),
        }])
    }

    /// Attach the operation name, keeping one already set
    pub fn for_operation(mut self, operation: &str) -> Self {
        if self.operation.is_none() {
            self.operation = Some(operation.to_string());
        }
        self
    }

    pub fn report(&self) -> ErrorReport {
        let mut report = ErrorReport::new("CONFIGURATION_ERROR", self.to_string());
        report.operation = self.operation.clone();
        report.issues = Some(self.issues.clone());
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// A validation operation rejected the current value
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(opchain::validation_failed))]
pub struct ValidationError {
    pub message: String,
    pub operation: Option<String>,
    /// Step location, e.g. `step[3]`
    pub path: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            operation: None,
            path: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Stable export for field-level feedback
    pub fn report(&self) -> ErrorReport {
        let mut report = ErrorReport::new("VALIDATION_ERROR", self.message.clone());
        report.operation = self.operation.clone();
        report.path = self.path.clone();
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operation failures
// ─────────────────────────────────────────────────────────────────────────────

/// Failure returned by an operation contract
#[derive(Error, Debug)]
pub enum OperationError {
    #[error(transparent)]
    NotFound(#[from] OperationNotFoundError),

    #[error(transparent)]
    Config(#[from] ConfigValidationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A nested sub-pipeline aborted
    #[error(transparent)]
    Pipeline(Box<PipelineExecutionError>),

    #[error("{message}")]
    Failed { message: String },

    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("pipeline run was cancelled")]
    Cancelled,

    /// Failure from a custom operation
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl From<PipelineExecutionError> for OperationError {
    fn from(e: PipelineExecutionError) -> Self {
        Self::Pipeline(Box::new(e))
    }
}

impl OperationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Pipeline(inner) => inner.is_cancelled(),
            _ => false,
        }
    }

    pub fn report(&self) -> ErrorReport {
        match self {
            Self::NotFound(e) => e.report(),
            Self::Config(e) => e.report(),
            Self::Validation(e) => e.report(),
            Self::Pipeline(e) => e.report(),
            Self::Failed { message } => ErrorReport::new("OPERATION_FAILED", message.clone()),
            Self::Timeout { .. } => ErrorReport::new("TIMEOUT", self.to_string()),
            Self::Cancelled => ErrorReport::new("CANCELLED", self.to_string()),
            Self::Custom(e) => ErrorReport::new("OPERATION_FAILED", format!("{:#}", e)),
        }
    }
}

impl Diagnostic for OperationError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            Self::NotFound(e) => e.code(),
            Self::Config(e) => e.code(),
            Self::Validation(e) => e.code(),
            Self::Pipeline(e) => e.code(),
            Self::Failed { .. } | Self::Custom(_) => Some(Box::new("opchain::operation_failed")),
            Self::Timeout { .. } => Some(Box::new("opchain::timeout")),
            Self::Cancelled => Some(Box::new("opchain::cancelled")),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            Self::NotFound(e) => e.help(),
            Self::Config(e) => e.help(),
            Self::Pipeline(e) => e.help(),
            Self::Timeout { .. } => Some(Box::new(
                "Raise the operation's 'timeout' or mark the step \"is_required\": false",
            )),
            _ => None,
        }
    }
}

/// A required step failed and the run was aborted
#[derive(Error, Debug, Diagnostic)]
#[error("Step {step_index}: {message}")]
#[diagnostic(
    code(opchain::pipeline_failed),
    help("Fix the failing step, or mark it \"is_required\": false to continue past failures")
)]
pub struct PipelineExecutionError {
    /// Position of the failing step in execution order
    pub step_index: usize,
    /// Operation name as written in the step
    pub operation: String,
    pub message: String,
    #[source]
    pub cause: Box<OperationError>,
}

impl PipelineExecutionError {
    pub fn new(
        step_index: usize,
        operation: impl Into<String>,
        message: impl Into<String>,
        cause: OperationError,
    ) -> Self {
        Self {
            step_index,
            operation: operation.into(),
            message: message.into(),
            cause: Box::new(cause),
        }
    }

    /// Innermost failure, looking through nested sub-pipeline aborts
    pub fn root_cause(&self) -> &OperationError {
        match self.cause.as_ref() {
            OperationError::Pipeline(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Step indices from this run down to the innermost failing step
    pub fn step_path(&self) -> Vec<usize> {
        let mut path = vec![self.step_index];
        if let OperationError::Pipeline(inner) = self.cause.as_ref() {
            path.extend(inner.step_path());
        }
        path
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), OperationError::Cancelled)
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self.root_cause() {
            OperationError::Validation(e) => Some(e),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        let mut report = ErrorReport::new("PIPELINE_EXECUTION_ERROR", self.message.clone());
        report.step_index = Some(self.step_index);
        report.operation = Some(self.operation.clone());
        let cause = self.cause.report();
        if cause.suggestions.is_some() {
            report.suggestions = cause.suggestions.clone();
        }
        report.cause = Some(Box::new(cause));
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Crate-level errors
// ─────────────────────────────────────────────────────────────────────────────

/// Main error type for opchain
#[derive(Error, Debug, Diagnostic)]
pub enum OpchainError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    OperationNotFound(#[from] OperationNotFoundError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineExecutionError),

    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(opchain::pipeline_not_found),
        help("Create a pipeline with 'opchain init' or write one by hand")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Invalid pipeline definition: {reason}")]
    #[diagnostic(code(opchain::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid input value: {message}")]
    #[diagnostic(code(opchain::invalid_input))]
    InvalidInput { message: String },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(opchain::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(opchain::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("No input files matched pattern: {pattern}")]
    #[diagnostic(
        code(opchain::no_input_files),
        help("Check that files matching '{pattern}' exist")
    )]
    NoInputFiles { pattern: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(opchain::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(opchain::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(opchain::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(opchain::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(opchain::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for OpchainError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for OpchainError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for OpchainError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            message: e.to_string(),
        }
    }
}

impl From<toml::de::Error> for OpchainError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml {
            message: e.to_string(),
        }
    }
}

impl From<glob::PatternError> for OpchainError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern {
            message: e.to_string(),
        }
    }
}

impl OpchainError {
    /// Structured export for taxonomy errors; other kinds report their message
    pub fn report(&self) -> ErrorReport {
        match self {
            Self::OperationNotFound(e) => e.report(),
            Self::Config(e) => e.report(),
            Self::Validation(e) => e.report(),
            Self::Pipeline(e) => e.report(),
            Self::PipelineNotFound { .. } | Self::InvalidPipeline { .. } => {
                ErrorReport::new("INVALID_PIPELINE", self.to_string())
            }
            _ => ErrorReport::new("ERROR", self.to_string()),
        }
    }
}

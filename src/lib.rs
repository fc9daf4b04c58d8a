// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! # opchain - configuration-driven operation pipelines
//!
//! A pipeline is an ordered list of steps, each naming a registered
//! operation and its config. `opchain` threads one JSON value through the
//! steps, keeps shared data for the whole run, and records an execution log.
//!
//! ## Features
//!
//! - **Four operation shapes** - transformations, validations, side effects and control flow
//! - **Nested pipelines** - `if_else` branches and `execute_pipeline_on_path` sub-runs
//! - **Fault tolerance** - optional steps, per-step `on_error` recovery and custom messages
//! - **Static validation** - unknown names come with "did you mean" suggestions
//!
//! ## Quick Start
//!
//! ```no_run
//! use opchain::{OperationSpec, PipelineExecutor};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), opchain::PipelineExecutionError> {
//! let steps = vec![
//!     OperationSpec::new("extract_field").config("field", "user.name"),
//!     OperationSpec::new("strip_whitespace"),
//!     OperationSpec::new("uppercase"),
//! ];
//!
//! let mut executor = PipelineExecutor::new();
//! let name = executor
//!     .execute_pipeline(&steps, json!({"user": {"name": "  ada "}}))
//!     .await?;
//! assert_eq!(name, json!("ADA"));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod operations;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod utils;

// Re-export commonly used types
pub use config::EngineConfig;
pub use errors::{
    ConfigValidationError, OpchainError, OpchainResult, OperationError, OperationNotFoundError,
    PipelineExecutionError, ValidationError,
};
pub use operations::{Category, ConfigSchema, Operation, OperationConfig};
pub use pipeline::{
    ExecutionContext, ExecutionLogEntry, OperationSpec, Pipeline, PipelineExecutor,
    PipelineValidator,
};
pub use registry::{OperationDescriptor, OperationRegistry};
pub use resolver::DotPath;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

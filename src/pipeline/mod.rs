// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Pipelines: definitions, execution and static validation

mod context;
mod definition;
mod executor;
mod validation;

pub use context::{ExecutionContext, ExecutionLogEntry, FullLog};
pub use definition::{OperationSpec, Pipeline, PipelineParser};
pub use executor::{PipelineExecutor, SubPipelineRunner};
pub use validation::{PipelineIssue, PipelineValidator, ValidationReport};

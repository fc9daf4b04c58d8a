// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Run state: shared data and the execution log

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ErrorReport;
use crate::operations::Category;
use crate::pipeline::OperationSpec;

/// Mutable state shared by every step of a run, nested runs included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    pub shared_data: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(shared_data: Map<String, Value>) -> Self {
        Self { shared_data }
    }
}

/// Outcome of one attempted step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionLogEntry {
    /// Position in execution order
    pub step_index: usize,

    /// Operation name as written in the step
    pub operation_name: String,

    /// Config key of the sub-pipeline this step ran in, e.g. `then_branch`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// `None` when the name did not resolve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    pub success: bool,

    /// Wall-clock time of the step, nested runs included
    pub execution_time_ms: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,

    /// A transformation failed and `on_error` substituted a value
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recovered: bool,

    /// Steps of sub-pipelines run by a control-flow step
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExecutionLogEntry>,
}

/// Log, context and steps of the last run
#[derive(Debug, Clone, Serialize)]
pub struct FullLog {
    pub log: Vec<ExecutionLogEntry>,
    pub context: Map<String, Value>,
    pub pipeline: Vec<OperationSpec>,
}

impl FullLog {
    pub fn succeeded(&self) -> usize {
        self.log.iter().filter(|e| e.success).count()
    }

    pub fn failed(&self) -> usize {
        self.log.len() - self.succeeded()
    }

    pub fn total_time_ms(&self) -> f64 {
        self.log.iter().map(|e| e.execution_time_ms).sum()
    }
}

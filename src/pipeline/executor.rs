// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 opchain contributors

//! Pipeline executor
//!
//! Runs steps strictly in sequence: each step sees the value the previous
//! one produced. Control-flow steps run their sub-pipelines through a
//! [`SubPipelineRunner`] that shares the parent's context, registry and
//! cancellation token.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{OperationError, PipelineExecutionError, ValidationError};
use crate::operations::{Category, OnError, Operation};
use crate::pipeline::{ExecutionContext, ExecutionLogEntry, FullLog, OperationSpec};
use crate::registry::{OperationRegistry, ResolvedOperation};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Pipeline executor
///
/// Owns the shared data and the log of its runs. Shared data persists
/// across calls to [`execute_pipeline`](Self::execute_pipeline); the log
/// covers the most recent call only.
pub struct PipelineExecutor {
    registry: Arc<OperationRegistry>,
    context: ExecutionContext,
    log: Vec<ExecutionLogEntry>,
    pipeline: Vec<OperationSpec>,
    cancellation: CancellationToken,
}

impl PipelineExecutor {
    /// Executor backed by the process-wide registry
    pub fn new() -> Self {
        Self::with_registry(OperationRegistry::global())
    }

    /// Executor backed by a private registry
    pub fn with_registry(registry: Arc<OperationRegistry>) -> Self {
        Self {
            registry,
            context: ExecutionContext::default(),
            log: Vec::new(),
            pipeline: Vec::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Seed the shared data
    pub fn with_shared_data(mut self, shared_data: Map<String, Value>) -> Self {
        self.context.shared_data = shared_data;
        self
    }

    /// Abort runs once `token` is cancelled
    ///
    /// The token is checked before every step, nested steps included.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Run `pipeline` on `initial_value`
    ///
    /// Returns the final value, or the failure of the first required step
    /// that failed.
    pub async fn execute_pipeline(
        &mut self,
        pipeline: &[OperationSpec],
        initial_value: Value,
    ) -> Result<Value, PipelineExecutionError> {
        self.pipeline = pipeline.to_vec();
        self.log.clear();

        let runner = Runner {
            registry: &self.registry,
            cancellation: &self.cancellation,
        };
        runner
            .run(pipeline, initial_value, None, &mut self.context, &mut self.log)
            .await
    }

    pub fn get_execution_log(&self) -> &[ExecutionLogEntry] {
        &self.log
    }

    pub fn get_context_data(&self) -> &Map<String, Value> {
        &self.context.shared_data
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    pub fn get_full_log(&self) -> FullLog {
        FullLog {
            log: self.log.clone(),
            context: self.context.shared_data.clone(),
            pipeline: self.pipeline.clone(),
        }
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle given to control-flow operations for running sub-pipelines
pub struct SubPipelineRunner<'r> {
    runner: Runner<'r>,
    log: &'r mut Vec<ExecutionLogEntry>,
}

impl SubPipelineRunner<'_> {
    /// Run `steps` on `value`, sharing `context` with the parent run
    ///
    /// `scope` names the config key the steps came from and labels their
    /// log entries.
    pub async fn run(
        &mut self,
        scope: &str,
        steps: &[OperationSpec],
        value: Value,
        context: &mut ExecutionContext,
    ) -> Result<Value, PipelineExecutionError> {
        self.runner
            .run(steps, value, Some(scope), context, self.log)
            .await
    }

    /// Run `steps` as a condition: `true` when every step succeeds
    ///
    /// Cancellation is not a condition outcome and propagates.
    pub async fn evaluate(
        &mut self,
        scope: &str,
        steps: &[OperationSpec],
        value: &Value,
        context: &mut ExecutionContext,
    ) -> Result<bool, OperationError> {
        match self.run(scope, steps, value.clone(), context).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_cancelled() => Err(e.into()),
            Err(e) => {
                debug!(scope, "condition failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[derive(Clone, Copy)]
struct Runner<'a> {
    registry: &'a OperationRegistry,
    cancellation: &'a CancellationToken,
}

struct StepOutcome {
    category: Option<Category>,
    /// New chain value, `None` when the value is unchanged
    result: Result<Option<Value>, OperationError>,
    recovered: bool,
}

impl StepOutcome {
    fn ok(category: Category, value: Option<Value>) -> Self {
        Self {
            category: Some(category),
            result: Ok(value),
            recovered: false,
        }
    }

    fn failed(category: Option<Category>, error: OperationError) -> Self {
        Self {
            category,
            result: Err(error),
            recovered: false,
        }
    }

    fn recovered(category: Category, value: Option<Value>) -> Self {
        Self {
            category: Some(category),
            result: Ok(value),
            recovered: true,
        }
    }
}

impl<'a> Runner<'a> {
    fn run<'s>(
        self,
        steps: &'s [OperationSpec],
        value: Value,
        scope: Option<&'s str>,
        context: &'s mut ExecutionContext,
        log: &'s mut Vec<ExecutionLogEntry>,
    ) -> BoxFuture<'s, Result<Value, PipelineExecutionError>>
    where
        'a: 's,
    {
        Box::pin(async move {
            let mut current = value;

            for (step_index, spec) in execution_order(steps).into_iter().enumerate() {
                if self.cancellation.is_cancelled() {
                    return Err(PipelineExecutionError::new(
                        step_index,
                        spec.operation.clone(),
                        OperationError::Cancelled.to_string(),
                        OperationError::Cancelled,
                    ));
                }

                debug!(step = step_index, operation = %spec.operation, scope, "running step");
                let start = Instant::now();
                let mut children = Vec::new();
                let location = match scope {
                    Some(scope) => format!("{}.step[{}]", scope, step_index),
                    None => format!("step[{}]", step_index),
                };
                let outcome = self
                    .run_step(spec, &location, &current, context, &mut children)
                    .await;
                let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

                let mut entry = ExecutionLogEntry {
                    step_index,
                    operation_name: spec.operation.clone(),
                    scope: scope.map(str::to_string),
                    category: outcome.category,
                    success: outcome.result.is_ok(),
                    execution_time_ms,
                    error: None,
                    recovered: outcome.recovered,
                    children,
                };

                match outcome.result {
                    Ok(next) => {
                        debug!(step = step_index, elapsed_ms = execution_time_ms, "step succeeded");
                        log.push(entry);
                        if let Some(next) = next {
                            current = next;
                        }
                    }
                    Err(error) => {
                        entry.error = Some(error.report());
                        log.push(entry);

                        if spec.is_required || error.is_cancelled() {
                            let message = spec
                                .error_message
                                .clone()
                                .unwrap_or_else(|| error.to_string());
                            return Err(PipelineExecutionError::new(
                                step_index,
                                spec.operation.clone(),
                                message,
                                error,
                            ));
                        }

                        warn!(
                            step = step_index,
                            operation = %spec.operation,
                            "optional step failed, continuing: {}",
                            error
                        );
                    }
                }
            }

            Ok(current)
        })
    }

    async fn run_step(
        self,
        spec: &OperationSpec,
        location: &str,
        current: &Value,
        context: &mut ExecutionContext,
        children: &mut Vec<ExecutionLogEntry>,
    ) -> StepOutcome {
        let ResolvedOperation {
            canonical,
            operation,
            recovery,
            ..
        } = match self
            .registry
            .get_operation(&spec.operation, &spec.operation_config)
        {
            Ok(resolved) => resolved,
            Err(e) => return StepOutcome::failed(None, e),
        };
        let category = operation.category();

        match operation {
            Operation::Transformation(op) => match op.transform(current, context).await {
                Ok(value) => StepOutcome::ok(category, Some(value)),
                Err(e) if e.is_cancelled() => StepOutcome::failed(Some(category), e),
                Err(e) => match recovery.recover(current) {
                    Some(value) => {
                        warn!(
                            operation = %canonical,
                            on_error = recovery.mode.as_str(),
                            "transformation failed, substituting a value: {}",
                            e
                        );
                        StepOutcome::recovered(category, Some(value))
                    }
                    None => StepOutcome::failed(Some(category), e),
                },
            },

            Operation::Validation(op) => match op.validate(current, context).await {
                Ok(true) => StepOutcome::ok(category, None),
                Ok(false) => {
                    let message = spec
                        .error_message
                        .clone()
                        .or_else(|| {
                            spec.operation_config
                                .get("error_message")
                                .and_then(Value::as_str)
                                .map(str::to_string)
                        })
                        .or_else(|| op.describe_failure(current))
                        .unwrap_or_else(|| format!("Validation failed: {}", canonical));
                    let error = ValidationError::new(message)
                        .with_operation(canonical)
                        .with_path(location);
                    StepOutcome::failed(Some(category), error.into())
                }
                Err(e) => StepOutcome::failed(Some(category), e),
            },

            Operation::SideEffect(op) => match op.perform(current, context).await {
                Ok(()) => StepOutcome::ok(category, None),
                Err(e) if recovery.mode == OnError::Ignore && !e.is_cancelled() => {
                    warn!(operation = %canonical, "side effect failed, ignoring: {}", e);
                    StepOutcome::recovered(category, None)
                }
                Err(e) => StepOutcome::failed(Some(category), e),
            },

            Operation::ControlFlow(op) => {
                let mut runner = SubPipelineRunner {
                    runner: self,
                    log: children,
                };
                match op.direct_flow(current.clone(), context, &mut runner).await {
                    Ok(value) => StepOutcome::ok(category, Some(value)),
                    Err(e) => StepOutcome::failed(Some(category), e),
                }
            }
        }
    }
}

/// Steps in execution order
///
/// When any step carries `order_index` the list is stably sorted by it;
/// steps without one run after all indexed steps.
pub(crate) fn execution_order(steps: &[OperationSpec]) -> Vec<&OperationSpec> {
    let mut ordered: Vec<&OperationSpec> = steps.iter().collect();
    if ordered.iter().any(|s| s.order_index.is_some()) {
        ordered.sort_by_key(|s| s.order_index.unwrap_or(i64::MAX));
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OperationNotFoundError;
    use crate::operations::{ConfigSchema, SideEffect};
    use crate::registry::OperationDescriptor;
    use async_trait::async_trait;
    use serde_json::json;

    /// Cancels the run's token when performed
    struct CancelNow(CancellationToken);

    #[async_trait]
    impl SideEffect for CancelNow {
        async fn perform(
            &self,
            _value: &Value,
            _context: &mut ExecutionContext,
        ) -> Result<(), OperationError> {
            self.0.cancel();
            Ok(())
        }
    }

    fn cancelling_executor() -> PipelineExecutor {
        let token = CancellationToken::new();
        let mut registry = OperationRegistry::with_builtins();
        let cancel = token.clone();
        registry.register_with_override(
            "cancel_now",
            OperationDescriptor::new(
                Category::SideEffect,
                "Cancel the running pipeline",
                ConfigSchema::new(),
                move |_| Ok(Operation::SideEffect(Box::new(CancelNow(cancel.clone())))),
            ),
            &[],
        );
        PipelineExecutor::with_registry(Arc::new(registry)).with_cancellation(token)
    }

    fn executor() -> PipelineExecutor {
        PipelineExecutor::with_registry(Arc::new(OperationRegistry::with_builtins()))
    }

    fn step(operation: &str) -> OperationSpec {
        OperationSpec::new(operation)
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_identity() {
        let mut executor = executor();
        for value in [json!(null), json!("x"), json!({"a": [1, 2]})] {
            let result = executor.execute_pipeline(&[], value.clone()).await.unwrap();
            assert_eq!(result, value);
        }
        assert!(executor.get_execution_log().is_empty());
    }

    #[tokio::test]
    async fn test_extract_strip_uppercase() {
        let pipeline = vec![
            step("extract_field").config("field", "user.name"),
            step("strip"),
            step("uppercase"),
        ];
        let mut executor = executor();

        let result = executor
            .execute_pipeline(&pipeline, json!({"user": {"name": "  alice  "}}))
            .await
            .unwrap();

        assert_eq!(result, json!("ALICE"));
        let log = executor.get_execution_log();
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|e| e.success));
        assert_eq!(log[0].category, Some(Category::Transformation));
    }

    #[tokio::test]
    async fn test_required_validation_aborts() {
        let mut executor = executor();
        let err = executor
            .execute_pipeline(&[step("required")], json!(null))
            .await
            .unwrap_err();

        assert_eq!(err.step_index, 0);
        assert!(err.validation_error().is_some());
        assert!(!executor.get_execution_log()[0].success);
    }

    #[tokio::test]
    async fn test_if_else_takes_else_branch() {
        let pipeline = vec![step("if_else")
            .config("condition", json!([{"operation": "required"}]))
            .config("then_branch", json!([{"operation": "uppercase"}]))
            .config(
                "else_branch",
                json!([{"operation": "set", "operation_config": {"value": "N/A"}}]),
            )];
        let mut executor = executor();

        assert_eq!(
            executor.execute_pipeline(&pipeline, json!("")).await.unwrap(),
            json!("N/A")
        );
        assert_eq!(
            executor.execute_pipeline(&pipeline, json!("ok")).await.unwrap(),
            json!("OK")
        );

        let children = &executor.get_execution_log()[0].children;
        assert_eq!(children[0].scope.as_deref(), Some("condition"));
        assert_eq!(children[1].scope.as_deref(), Some("then_branch"));
    }

    #[tokio::test]
    async fn test_on_path_writes_back() {
        let pipeline = vec![step("on_path")
            .config("path", "user.name")
            .config("pipeline", json!([{"operation": "strip"}, {"operation": "upper"}]))];
        let mut executor = executor();

        let result = executor
            .execute_pipeline(&pipeline, json!({"user": {"name": "  alice  ", "age": 3}}))
            .await
            .unwrap();
        assert_eq!(result, json!({"user": {"name": "ALICE", "age": 3}}));
    }

    #[tokio::test]
    async fn test_unknown_operation_suggests() {
        let mut executor = executor();
        let err = executor
            .execute_pipeline(&[step("extrct_field")], json!({}))
            .await
            .unwrap_err();

        match err.root_cause() {
            OperationError::NotFound(OperationNotFoundError { suggestions, .. }) => {
                assert!(suggestions.contains(&"extract_field".to_string()));
            }
            other => panic!("unexpected cause: {:?}", other),
        }
        assert_eq!(executor.get_execution_log()[0].category, None);
    }

    #[tokio::test]
    async fn test_side_effects_keep_value() {
        let pipeline = vec![
            step("increment_counter"),
            step("log_value").config("level", "debug"),
            step("store_in_context").config("context_path", "seen"),
        ];
        let mut executor = executor();
        let input = json!({"id": 7});

        let result = executor.execute_pipeline(&pipeline, input.clone()).await.unwrap();

        assert_eq!(result, input);
        assert_eq!(executor.get_context_data()["counter"], json!(1));
        assert_eq!(executor.get_context_data()["seen"], input);
    }

    #[tokio::test]
    async fn test_optional_failure_keeps_value() {
        let failing = step("json_parse");
        let mut executor = executor();

        let err = executor
            .execute_pipeline(&[step("upper"), failing.clone()], json!("not json"))
            .await
            .unwrap_err();
        assert_eq!(err.step_index, 1);

        let result = executor
            .execute_pipeline(&[step("upper"), failing.optional()], json!("not json"))
            .await
            .unwrap();
        assert_eq!(result, json!("NOT JSON"));
        assert!(!executor.get_execution_log()[1].success);
    }

    #[tokio::test]
    async fn test_on_error_recovers_inside_step() {
        let pipeline = vec![step("json_parse")
            .config("on_error", "return_default")
            .config("default", json!({}))];
        let mut executor = executor();

        let result = executor.execute_pipeline(&pipeline, json!("{oops")).await.unwrap();

        assert_eq!(result, json!({}));
        let entry = &executor.get_execution_log()[0];
        assert!(entry.success);
        assert!(entry.recovered);
    }

    #[tokio::test]
    async fn test_out_of_range_cast_is_recoverable() {
        let pipeline = vec![step("cast")
            .config("target_type", "int")
            .config("on_error", "return_original")];
        let mut executor = executor();

        let result = executor.execute_pipeline(&pipeline, json!(1e300)).await.unwrap();

        assert_eq!(result, json!(1e300));
        assert!(executor.get_execution_log()[0].recovered);
    }

    #[tokio::test]
    async fn test_error_message_override() {
        let pipeline = vec![step("range")
            .config("max", 100)
            .error_message("age out of bounds")];
        let mut executor = executor();

        let err = executor.execute_pipeline(&pipeline, json!(150)).await.unwrap_err();
        assert_eq!(err.message, "age out of bounds");
        assert_eq!(err.to_string(), "Step 0: age out of bounds");
    }

    #[tokio::test]
    async fn test_validation_describes_failure() {
        let mut executor = executor();
        let err = executor
            .execute_pipeline(&[step("range").config("max", 100)], json!(150))
            .await
            .unwrap_err();
        assert_eq!(err.message, "value 150 is above maximum 100");
    }

    #[tokio::test]
    async fn test_order_index_is_stable() {
        let pipeline = vec![
            step("set").config("value", "late").order(2),
            step("set").config("value", "first").order(1),
            step("upper"),
            step("lower").order(1),
        ];
        let mut executor = executor();

        let result = executor.execute_pipeline(&pipeline, json!(null)).await.unwrap();

        assert_eq!(result, json!("LATE"));
        let names: Vec<_> = executor
            .get_execution_log()
            .iter()
            .map(|e| e.operation_name.as_str())
            .collect();
        assert_eq!(names, ["set", "lower", "set", "upper"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_next_step() {
        let token = CancellationToken::new();
        let mut executor = executor().with_cancellation(token.clone());
        token.cancel();

        let err = executor
            .execute_pipeline(&[step("upper").optional()], json!("x"))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.step_index, 0);
        assert!(executor.get_execution_log().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_mid_run_stops_before_next_step() {
        let pipeline = vec![
            step("set").config("value", "x"),
            step("cancel_now"),
            step("upper").optional(),
        ];
        let mut executor = cancelling_executor();

        let err = executor.execute_pipeline(&pipeline, json!(null)).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.step_index, 2);
        assert_eq!(err.operation, "upper");
        let log = executor.get_execution_log();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.success));
    }

    #[tokio::test]
    async fn test_nested_cancellation_escapes_optional_step() {
        let pipeline = vec![
            step("if_else")
                .config("condition", json!([{"operation": "required"}]))
                .config(
                    "then_branch",
                    json!([{"operation": "cancel_now"}, {"operation": "upper"}]),
                )
                .optional(),
            step("lower"),
        ];
        let mut executor = cancelling_executor();

        let err = executor.execute_pipeline(&pipeline, json!("x")).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.step_path(), vec![0, 1]);
        let log = executor.get_execution_log();
        assert_eq!(log.len(), 1);
        assert!(!log[0].success);
    }

    #[tokio::test]
    async fn test_on_path_checks_cancellation() {
        let pipeline = vec![step("on_path")
            .config("path", "a")
            .config("pipeline", json!([{"operation": "cancel_now"}, {"operation": "upper"}]))
            .optional()];
        let mut executor = cancelling_executor();

        let err = executor
            .execute_pipeline(&pipeline, json!({"a": "x"}))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.step_path(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_validation_error_carries_step_path() {
        let mut executor = executor();
        let err = executor
            .execute_pipeline(&[step("strip"), step("range").config("max", 100)], json!(150))
            .await
            .unwrap_err();

        let report = err.validation_error().unwrap().report();
        assert_eq!(report.path.as_deref(), Some("step[1]"));
        assert_eq!(report.operation.as_deref(), Some("range"));

        let pipeline = vec![step("on_path")
            .config("path", "a")
            .config("pipeline", json!([{"operation": "strip"}, {"operation": "required"}]))];
        let err = executor
            .execute_pipeline(&pipeline, json!({"a": "   "}))
            .await
            .unwrap_err();
        let report = err.validation_error().unwrap().report();
        assert_eq!(report.path.as_deref(), Some("pipeline.step[1]"));
    }

    #[tokio::test]
    async fn test_context_persists_across_runs() {
        let mut executor = executor().with_shared_data(
            json!({"counter": 10}).as_object().cloned().unwrap_or_default(),
        );
        executor
            .execute_pipeline(&[step("increment_counter")], json!(null))
            .await
            .unwrap();
        executor
            .execute_pipeline(&[step("increment_counter")], json!(null))
            .await
            .unwrap();

        let full = executor.get_full_log();
        assert_eq!(full.context["counter"], json!(12));
        assert_eq!(full.pipeline.len(), 1);
        assert_eq!(full.log.len(), 1);
    }

    #[tokio::test]
    async fn test_nested_failure_reports_step_path() {
        let pipeline = vec![step("on_path")
            .config("path", "a")
            .config("pipeline", json!([{"operation": "strip"}, {"operation": "required"}]))];
        let mut executor = executor();

        let err = executor
            .execute_pipeline(&pipeline, json!({"a": "   "}))
            .await
            .unwrap_err();

        assert_eq!(err.step_path(), vec![0, 1]);
        assert!(err.validation_error().is_some());
        let children = &executor.get_execution_log()[0].children;
        assert_eq!(children.len(), 2);
        assert!(!children[1].success);
    }
}

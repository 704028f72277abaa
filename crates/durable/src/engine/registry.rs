//! Workflow registry for type-erased workflow execution
//!
//! The registry maps workflow type names to factories that, given a
//! [`WfContext`] and JSON input, produce the boxed coroutine future driving
//! that workflow. Because [`WfContext`] is `!Send` (it shares state via
//! `Rc`/`Cell`, never across a real suspension point), the resulting future
//! is `!Send` too — callers must drive it to a fixed point with direct
//! `.poll()` calls and must not hold it across a real `.await`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::workflow::{Completion, WfContext, Workflow, WorkflowError};

/// A type-erased, `!Send` workflow run. Resolves once the workflow
/// completes or requests continue-as-new.
pub type WorkflowFuture = Pin<Box<dyn Future<Output = Result<Completion<Value>, WorkflowError>>>>;

type RunFn = Box<dyn Fn(WfContext, Value) -> Result<WorkflowFuture, serde_json::Error>>;

/// Registry of workflow factories
///
/// The registry maps workflow type names to run functions that build the
/// workflow's coroutine future from a context and JSON input.
pub struct WorkflowRegistry {
    factories: HashMap<String, RunFn>,
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a workflow type
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut registry = WorkflowRegistry::new();
    /// registry.register::<MyWorkflow>();
    /// ```
    pub fn register<W: Workflow>(&mut self) {
        let run_fn: RunFn = Box::new(|ctx, input| {
            let typed_input: W::Input = serde_json::from_value(input)?;
            let fut = async move {
                let completion = W::run(ctx, typed_input).await?;
                Ok(match completion {
                    Completion::Complete(output) => {
                        Completion::Complete(serde_json::to_value(output).unwrap_or(Value::Null))
                    }
                    Completion::ContinueAsNew(next_input) => Completion::ContinueAsNew(next_input),
                })
            };
            Ok(Box::pin(fut) as WorkflowFuture)
        });

        self.factories.insert(W::TYPE.to_string(), run_fn);
    }

    /// Check if a workflow type is registered
    pub fn contains(&self, workflow_type: &str) -> bool {
        self.factories.contains_key(workflow_type)
    }

    /// Build the coroutine future for a decision task
    ///
    /// The returned future must be driven to a fixed point (polled until
    /// pending or resolved) without being held across a real `.await` —
    /// it borrows nothing from the registry and is otherwise self-contained.
    pub fn create_run(
        &self,
        workflow_type: &str,
        ctx: WfContext,
        input: Value,
    ) -> Result<WorkflowFuture, RegistryError> {
        let run_fn = self
            .factories
            .get(workflow_type)
            .ok_or_else(|| RegistryError::UnknownWorkflowType(workflow_type.to_string()))?;

        run_fn(ctx, input).map_err(RegistryError::Deserialization)
    }

    /// Get the number of registered workflow types
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Get all registered workflow type names
    pub fn workflow_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }
}

impl fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("workflow_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Errors from registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Workflow type not registered
    #[error("unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    /// Failed to deserialize workflow input
    #[error("failed to deserialize workflow input: {0}")]
    Deserialization(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestInput {
        value: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct TestOutput {
        result: i32,
    }

    struct TestWorkflow;

    #[async_trait(?Send)]
    impl Workflow for TestWorkflow {
        const TYPE: &'static str = "test_workflow";
        type Input = TestInput;
        type Output = TestOutput;

        async fn run(
            _ctx: WfContext,
            input: Self::Input,
        ) -> Result<Completion<Self::Output>, WorkflowError> {
            Ok(Completion::Complete(TestOutput {
                result: input.value * 2,
            }))
        }
    }

    fn test_ctx() -> WfContext {
        WfContext::new("wf-1", chrono::Utc::now(), HashMap::new(), HashMap::new())
    }

    #[test]
    fn test_register_and_contains() {
        let mut registry = WorkflowRegistry::new();
        registry.register::<TestWorkflow>();

        assert!(registry.contains("test_workflow"));
        assert!(!registry.contains("unknown"));
    }

    #[test]
    fn test_unknown_workflow_type() {
        let registry = WorkflowRegistry::new();
        let result = registry.create_run("unknown", test_ctx(), serde_json::json!({}));

        assert!(matches!(result, Err(RegistryError::UnknownWorkflowType(_))));
    }

    #[test]
    fn test_invalid_input() {
        let mut registry = WorkflowRegistry::new();
        registry.register::<TestWorkflow>();

        let result = registry.create_run("test_workflow", test_ctx(), serde_json::json!({}));
        assert!(matches!(result, Err(RegistryError::Deserialization(_))));
    }

    #[test]
    fn test_workflow_execution_to_completion() {
        let mut registry = WorkflowRegistry::new();
        registry.register::<TestWorkflow>();

        let mut fut = registry
            .create_run("test_workflow", test_ctx(), serde_json::json!({ "value": 10 }))
            .unwrap();

        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);

        let poll = fut.as_mut().poll(&mut cx);
        match poll {
            std::task::Poll::Ready(Ok(Completion::Complete(value))) => {
                assert_eq!(value, serde_json::json!({ "result": 20 }));
            }
            other => panic!("expected immediate completion, got {:?}", other.is_ready()),
        }
    }

    #[test]
    fn test_registry_debug() {
        let mut registry = WorkflowRegistry::new();
        registry.register::<TestWorkflow>();

        let debug_str = format!("{:?}", registry);
        assert!(debug_str.contains("test_workflow"));
    }

    #[test]
    fn test_workflow_types_iterator() {
        let mut registry = WorkflowRegistry::new();
        registry.register::<TestWorkflow>();

        let types: Vec<_> = registry.workflow_types().collect();
        assert_eq!(types, vec!["test_workflow"]);
    }
}

//! Workflow trait definition
//!
//! Workflows are authored as a single `async fn run`, not a reducer. See
//! [`crate::workflow::context::WfContext`] for the operations available
//! inside the body and [`crate::engine::executor`] for how determinism is
//! enforced across replays.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::context::WfContext;

/// Error type for workflow failures
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct WorkflowError {
    /// Error message
    pub message: String,

    /// Error code for programmatic handling
    pub code: Option<String>,

    /// Whether this error is retryable
    pub retryable: bool,
}

impl WorkflowError {
    /// Create a new workflow error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            retryable: false,
        }
    }

    /// Create a retryable error
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            retryable: true,
        }
    }

    /// Set the error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkflowError {}

/// What a workflow run resolved to.
pub enum Completion<O> {
    /// The workflow finished normally with a result.
    Complete(O),
    /// The workflow wants to continue as a new run under the same
    /// `workflow_id`, carrying `next_input` forward. History is rotated: a
    /// `WorkflowContinuedAsNew` event is appended and replay for the next
    /// decision task starts from a fresh cursor. Buffered signals are
    /// unaffected since they live in a table keyed by workflow id, not run.
    ContinueAsNew(Value),
}

/// A workflow is a deterministic coroutine driven by replay.
///
/// Given the same sequence of recorded events, `run` must take the same
/// sequence of actions — the same activities in the same order with the
/// same inputs, the same timers, the same child workflows. This is what
/// lets the executor recover a workflow's state by re-running its code
/// against history instead of persisting an opaque snapshot.
///
/// # Example
///
/// ```ignore
/// use hosting_durable::prelude::*;
///
/// struct ProvisionWebroot;
///
/// #[async_trait::async_trait(?Send)]
/// impl Workflow for ProvisionWebroot {
///     const TYPE: &'static str = "provision_webroot";
///     type Input = WebrootInput;
///     type Output = WebrootResult;
///
///     async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError> {
///         let created = ctx
///             .execute_activity::<CreateWebrootOnNode>(input.clone(), ActivityOptions::default())
///             .await
///             .map_err(|e| WorkflowError::new(e.message))?;
///         Ok(Completion::Complete(WebrootResult { id: created.id }))
///     }
/// }
/// ```
#[async_trait(?Send)]
pub trait Workflow: 'static {
    /// Unique type identifier for this workflow, used for registry lookup.
    const TYPE: &'static str;

    /// Input type the workflow is started/continued-as-new with.
    type Input: Serialize + DeserializeOwned + Clone;

    /// Output type when the workflow completes.
    type Output: Serialize + DeserializeOwned;

    /// Run (or replay) the workflow body to the next suspension point.
    async fn run(ctx: WfContext, input: Self::Input) -> Result<Completion<Self::Output>, WorkflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_display() {
        let error = WorkflowError::new("something went wrong");
        assert_eq!(error.to_string(), "something went wrong");
    }

    #[test]
    fn test_workflow_error_with_code() {
        let error = WorkflowError::new("not found").with_code("NOT_FOUND");
        assert_eq!(error.code, Some("NOT_FOUND".to_string()));
    }

    #[test]
    fn test_workflow_error_retryable() {
        let error = WorkflowError::retryable("temporary failure");
        assert!(error.retryable);
    }
}

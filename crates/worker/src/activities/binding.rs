//! Bridges `hosting_core`'s RPC traits to the durable runtime's `Activity`
//! trait.
//!
//! `hosting-core` can't implement `hosting_durable::Activity` for its own
//! marker types: the trait and (if the marker lived there) the type would
//! both be foreign to `hosting-core`, which the orphan rule forbids. So the
//! marker structs, their `ActivitySpec`/`Activity` impls, and the adapters
//! that back them all live here instead, in the one crate that depends on
//! both `hosting-core` and `hosting-durable`.

use hosting_core::error::{CoreError, ErrorKind};
use hosting_durable::ActivityError;

pub fn core_error_to_activity_error(err: CoreError) -> ActivityError {
    let error_type = match err.kind {
        ErrorKind::Validation => "validation",
        ErrorKind::Transient => "transient",
        ErrorKind::Permanent => "permanent",
        ErrorKind::ConvergencePartial => "convergence_partial",
        ErrorKind::NonDeterminism => "non_determinism",
        ErrorKind::Cancellation => "cancellation",
    };
    let base = if err.is_retryable() {
        ActivityError::retryable(err.message)
    } else {
        ActivityError::non_retryable(err.message)
    };
    base.with_type(error_type)
}

/// Declare an activity marker struct that wraps an `Arc<$client_ty>` and
/// dispatches to it via the given expression. The expression receives
/// `$client` (the adapter, bound from `self.0`) and `$input_ident` (the
/// deserialized activity input) and must evaluate to
/// `impl Future<Output = Result<$output, CoreError>>`.
///
/// A closure-call body (rather than a fixed method-name convention) is
/// needed because the RPC traits in `hosting_core::activities` take
/// multiple positional arguments, while an activity's wire shape is always
/// a single `Input` struct — this macro is where that reshaping happens.
macro_rules! rpc_activity {
    ($marker:ident, $type_name:literal, $client_ty:ty, $input:ty, $output:ty, |$client:ident, $input_ident:ident| $body:expr) => {
        pub struct $marker(pub std::sync::Arc<$client_ty>);

        impl hosting_durable::ActivitySpec for $marker {
            const TYPE: &'static str = $type_name;
            type Input = $input;
            type Output = $output;
        }

        #[async_trait::async_trait]
        impl hosting_durable::Activity for $marker {
            const TYPE: &'static str = $type_name;
            type Input = $input;
            type Output = $output;

            async fn execute(
                &self,
                _ctx: &hosting_durable::activity::ActivityContext,
                $input_ident: Self::Input,
            ) -> Result<Self::Output, hosting_durable::ActivityError> {
                let $client = self.0.as_ref();
                ($body)
                    .await
                    .map_err($crate::activities::binding::core_error_to_activity_error)
            }
        }
    };
}

pub(crate) use rpc_activity;

/// Adapts a typed `Activity` impl to the closure shape
/// `WorkerPool::register_handler` expects: decode the claimed task's JSON
/// input, run the activity, encode the result back to JSON. The pool itself
/// only ever sees `Result<serde_json::Value, String>` — retryability lives
/// in the `ActivityError` we serialize into that string, the same way any
/// other `last_error` text ends up in the task queue.
pub fn activity_handler<A>(
    activity: std::sync::Arc<A>,
) -> impl Fn(
    hosting_durable::persistence::ClaimedTask,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = hosting_durable::worker::ActivityResult> + Send>,
> + Send
       + Sync
       + 'static
where
    A: hosting_durable::Activity,
{
    move |task| {
        let activity = std::sync::Arc::clone(&activity);
        Box::pin(async move {
            let input: A::Input = serde_json::from_value(task.input)
                .map_err(|e| format!("decode input for {}: {e}", A::TYPE))?;

            let ctx = hosting_durable::activity::ActivityContext::new(
                task.workflow_id,
                task.id.to_string(),
                task.attempt,
                task.max_attempts,
            );

            match activity.execute(&ctx, input).await {
                Ok(output) => serde_json::to_value(output)
                    .map_err(|e| format!("encode output for {}: {e}", A::TYPE)),
                Err(err) => Err(serde_json::to_string(&err).unwrap_or(err.message)),
            }
        })
    }
}

/// Like [`activity_handler`], but also drives the owning workflow's next
/// decision task once the activity resolves, instead of leaving that to a
/// separate poller. Retry vs. final failure is decided the same way the
/// durable runtime's own retry policy would: retryable error and attempts
/// remaining means the workflow isn't told yet (the task queue will retry
/// it), otherwise the workflow sees a final `ActivityFailed`.
pub fn activity_handler_driving<A, S>(
    activity: std::sync::Arc<A>,
    executor: std::sync::Arc<hosting_durable::engine::WorkflowExecutor<S>>,
) -> impl Fn(
    hosting_durable::persistence::ClaimedTask,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = hosting_durable::worker::ActivityResult> + Send>,
> + Send
       + Sync
       + 'static
where
    A: hosting_durable::Activity,
    S: hosting_durable::persistence::WorkflowEventStore,
{
    move |task| {
        let activity = std::sync::Arc::clone(&activity);
        let executor = std::sync::Arc::clone(&executor);
        Box::pin(async move {
            let workflow_id = task.workflow_id;
            let seq = task.seq;
            let attempt = task.attempt;
            let max_attempts = task.max_attempts;

            let input: A::Input = serde_json::from_value(task.input)
                .map_err(|e| format!("decode input for {}: {e}", A::TYPE))?;

            let ctx = hosting_durable::activity::ActivityContext::new(
                workflow_id,
                task.id.to_string(),
                attempt,
                max_attempts,
            );

            match activity.execute(&ctx, input).await {
                Ok(output) => {
                    let value = serde_json::to_value(&output)
                        .map_err(|e| format!("encode output for {}: {e}", A::TYPE))?;
                    if let Err(e) = executor.on_activity_completed(workflow_id, seq, value.clone()).await {
                        tracing::error!(%workflow_id, seq, "failed to drive workflow after activity completion: {e}");
                    }
                    Ok(value)
                }
                Err(err) => {
                    let will_retry = err.retryable && attempt < max_attempts;
                    if let Err(e) = executor
                        .on_activity_failed(workflow_id, seq, err.clone(), will_retry)
                        .await
                    {
                        tracing::error!(%workflow_id, seq, "failed to drive workflow after activity failure: {e}");
                    }
                    Err(serde_json::to_string(&err).unwrap_or(err.message))
                }
            }
        })
    }
}

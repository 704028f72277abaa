//! Shared helpers used by more than one workflow: retry policy presets, the
//! bookkeeping status write every lifecycle workflow makes on entry and
//! exit, and the `go()`/`WaitGroup` fan-out combinator convergence uses to
//! run per-node work concurrently within one decision task.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use hosting_core::activities::UpdateResourceStatusInput;
use hosting_core::domain::ResourceStatus;
use hosting_durable::{ActivityOptions, RetryPolicy, WfContext, WorkflowError};

use crate::activities::core_store::UpdateResourceStatus;

/// Default retry for node-agent and core-store calls inside a lifecycle
/// workflow: a handful of attempts over a couple of minutes, enough to ride
/// out a restart of the collaborator without a workflow author having to
/// think about it at every call site.
pub fn lifecycle_retry() -> RetryPolicy {
    RetryPolicy::exponential()
        .with_max_attempts(5)
        .with_initial_interval(Duration::from_secs(2))
        .with_max_interval(Duration::from_secs(30))
}

/// Retry for calls the caller has already decided must not be retried
/// blindly (e.g. the investigate-incident model call, which burns tokens
/// per attempt).
pub fn no_retry() -> RetryPolicy {
    RetryPolicy::no_retry()
}

/// Write a resource's lifecycle status. Every resource workflow calls this
/// on entry (`provisioning`/`deleting`) and on exit (`active`/`deleted` or
/// `failed`); kept as one helper so the retry policy and table/id plumbing
/// live in exactly one place.
pub async fn write_status(
    ctx: &WfContext,
    table: &str,
    id: &str,
    status: ResourceStatus,
    status_message: Option<String>,
) -> Result<(), WorkflowError> {
    ctx.execute_activity::<UpdateResourceStatus>(
        UpdateResourceStatusInput {
            table: table.to_string(),
            id: id.to_string(),
            status,
            status_message,
        },
        ActivityOptions::default().with_retry(lifecycle_retry()),
    )
    .await
    .map_err(|e| WorkflowError::new(e.message))
}

/// Join per-node failure messages into one status message, truncated to
/// `max_len` bytes on a char boundary. Convergence can fail on an arbitrary
/// number of nodes at once; the joined message has to fit in a status
/// column rather than growing unbounded with the shard size.
pub fn truncate_joined_message(messages: &[String], max_len: usize) -> String {
    let joined = format!("convergence completed with {} error(s): {}", messages.len(), messages.join("; "));
    if joined.len() <= max_len {
        return joined;
    }
    let mut end = max_len;
    while !joined.is_char_boundary(end) {
        end -= 1;
    }
    joined[..end].to_string()
}

/// Run `f` once per item, each in its own cooperative sub-coroutine spawned
/// via [`WfContext::go`], and collect the results in input order once every
/// item has finished. Mirrors the fan-out shape shard convergence and
/// multi-node syncs use: spawn N independent units of work, wait for all of
/// them, then look at what happened to each.
pub async fn fan_out<T, F, Fut>(
    ctx: &WfContext,
    items: Vec<T>,
    f: F,
) -> Vec<Result<(), WorkflowError>>
where
    T: 'static,
    F: Fn(WfContext, T) -> Fut + 'static,
    Fut: std::future::Future<Output = Result<(), WorkflowError>> + 'static,
{
    let n = items.len();
    if n == 0 {
        return Vec::new();
    }

    let wg = ctx.new_wait_group(n);
    let results: Rc<RefCell<Vec<Option<Result<(), WorkflowError>>>>> =
        Rc::new(RefCell::new((0..n).map(|_| None).collect()));
    let f = Rc::new(f);

    for (idx, item) in items.into_iter().enumerate() {
        let ctx2 = ctx.clone();
        let wg2 = wg.clone();
        let results2 = results.clone();
        let f2 = f.clone();
        ctx.go(async move {
            let outcome = (f2)(ctx2, item).await;
            results2.borrow_mut()[idx] = Some(outcome);
            wg2.done();
        });
    }

    wg.wait().await;

    results
        .borrow()
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.clone().unwrap_or_else(|| {
                Err(WorkflowError::new(format!(
                    "fan_out: coroutine {idx} never resolved"
                )))
            })
        })
        .collect()
}

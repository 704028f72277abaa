//! Workflow executor with replay support
//!
//! The `WorkflowExecutor` is responsible for:
//! - Starting new workflows
//! - Driving a decision task: rebuild a [`WfContext`] from history, poll the
//!   workflow's coroutine future (and any `go()`-spawned sub-coroutines) to a
//!   fixed point, then persist whatever new commands came out of that poll
//! - Handling signals and continue-as-new

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::activity::ActivityError;
use crate::persistence::{
    ParentLink, StoreError, TaskDefinition, TraceContext, WorkflowEventStore, WorkflowStatus,
    GENERAL_TASK_QUEUE,
};
use crate::workflow::{
    Completion, NewCommand, Outcome, WfContext, WorkflowError, WorkflowEvent, WorkflowSignal,
};

use super::registry::{RegistryError, WorkflowFuture, WorkflowRegistry};

/// Configuration for the workflow executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum events per workflow (for safety)
    pub max_events_per_workflow: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_events_per_workflow: 10_000,
        }
    }
}

/// Errors from executor operations
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Registry error
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Workflow already completed
    #[error("workflow {0} already completed")]
    WorkflowCompleted(Uuid),

    /// Workflow not found
    #[error("workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    /// Replay error (non-determinism detected)
    #[error("replay error: {0}")]
    ReplayError(String),

    /// Too many events
    #[error("workflow {0} has too many events ({1} > {2})")]
    TooManyEvents(Uuid, usize, usize),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of processing one decision task
#[derive(Debug)]
pub struct ProcessResult {
    /// Whether the workflow run completed (finished or continued-as-new)
    pub completed: bool,

    /// Number of new events written
    pub events_written: usize,

    /// Number of tasks enqueued
    pub tasks_enqueued: usize,

    /// Number of signals delivered this decision task
    pub signals_processed: usize,
}

/// Workflow executor
///
/// The executor drives workflows by reconstructing a [`WfContext`] from
/// persisted history and polling the registered `Workflow::run` future
/// against it. It uses optimistic concurrency control on the event log to
/// handle concurrent decision tasks safely.
///
/// # Example
///
/// ```ignore
/// use hosting_durable::prelude::*;
///
/// let store = InMemoryWorkflowEventStore::new();
/// let mut executor = WorkflowExecutor::new(store);
/// executor.register::<MyWorkflow>();
///
/// let workflow_id = executor.start_workflow::<MyWorkflow>(input, None).await?;
/// executor.process_workflow(workflow_id).await?;
/// ```
pub struct WorkflowExecutor<S: WorkflowEventStore> {
    store: Arc<S>,
    registry: WorkflowRegistry,
    config: ExecutorConfig,
}

impl<S: WorkflowEventStore> WorkflowExecutor<S> {
    /// Create a new executor with the given store
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            registry: WorkflowRegistry::new(),
            config: ExecutorConfig::default(),
        }
    }

    /// Create a new executor with custom config
    pub fn with_config(store: S, config: ExecutorConfig) -> Self {
        Self {
            store: Arc::new(store),
            registry: WorkflowRegistry::new(),
            config,
        }
    }

    /// Register a workflow type
    pub fn register<W: crate::workflow::Workflow>(&mut self) {
        self.registry.register::<W>();
        info!(workflow_type = W::TYPE, "registered workflow type");
    }

    /// Get a reference to the store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a new workflow
    ///
    /// Persists the `WorkflowStarted` event, then immediately runs the first
    /// decision task so workflows that complete synchronously (no
    /// activities, timers, or signals needed) finish in the same call.
    #[instrument(skip(self, input, trace_context), fields(workflow_type = W::TYPE))]
    pub async fn start_workflow<W: crate::workflow::Workflow>(
        &self,
        input: W::Input,
        trace_context: Option<TraceContext>,
    ) -> Result<Uuid, ExecutorError> {
        self.start_workflow_with_id::<W>(Uuid::now_v7(), input, trace_context)
            .await
    }

    /// Like [`start_workflow`](Self::start_workflow), but with a
    /// caller-chosen workflow id instead of a freshly generated one. Used for
    /// workflows that need a stable, human-meaningful identity (derive the id
    /// with [`crate::persistence::deterministic_workflow_id`]) so that
    /// restarting them by name — rather than by a previously returned id — is
    /// possible.
    #[instrument(skip(self, input, trace_context), fields(workflow_type = W::TYPE))]
    pub async fn start_workflow_with_id<W: crate::workflow::Workflow>(
        &self,
        workflow_id: Uuid,
        input: W::Input,
        trace_context: Option<TraceContext>,
    ) -> Result<Uuid, ExecutorError> {
        let input_json = serde_json::to_value(&input)?;

        info!(%workflow_id, "starting new workflow");

        self.store
            .create_workflow(
                workflow_id,
                W::TYPE,
                input_json.clone(),
                trace_context.as_ref(),
                None,
            )
            .await?;

        self.store
            .append_events(
                workflow_id,
                0,
                vec![WorkflowEvent::WorkflowStarted { input: input_json }],
            )
            .await?;

        self.store
            .update_workflow_status(workflow_id, WorkflowStatus::Running, None, None)
            .await?;

        self.process_workflow(workflow_id).await?;

        Ok(workflow_id)
    }

    /// Create and run the first decision task of a workflow started as a
    /// child of another workflow's `ScheduleChildWorkflow` command.
    async fn start_child_workflow(
        &self,
        child_id: Uuid,
        workflow_type: &str,
        input: serde_json::Value,
        parent: ParentLink,
    ) -> Result<(), ExecutorError> {
        self.store
            .create_workflow(child_id, workflow_type, input.clone(), None, Some(parent))
            .await?;

        self.store
            .append_events(
                child_id,
                0,
                vec![WorkflowEvent::WorkflowStarted { input }],
            )
            .await?;

        self.store
            .update_workflow_status(child_id, WorkflowStatus::Running, None, None)
            .await?;

        self.process_workflow_boxed(child_id).await?;
        Ok(())
    }

    /// `process_workflow`, boxed so it can be called recursively (driving a
    /// child workflow's first decision task, or a parent's decision task
    /// once a child notifies it of completion) without an infinitely-sized
    /// future.
    fn process_workflow_boxed<'a>(
        &'a self,
        workflow_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult, ExecutorError>> + Send + 'a>> {
        Box::pin(self.process_workflow(workflow_id))
    }

    /// If `child_result` reflects a workflow that had a recorded parent link,
    /// append the corresponding `ChildWorkflowCompleted`/`ChildWorkflowFailed`
    /// event to the parent and drive its next decision task so that a
    /// pending `ChildWorkflowFuture` can resolve.
    async fn notify_parent(
        &self,
        parent: ParentLink,
        child_result: &Result<serde_json::Value, WorkflowError>,
    ) -> Result<(), ExecutorError> {
        let events = self.store.load_events(parent.workflow_id).await?;
        let sequence = events.len() as i32;

        let event = match child_result {
            Ok(result) => WorkflowEvent::ChildWorkflowCompleted {
                seq: parent.seq,
                result: result.clone(),
            },
            Err(error) => WorkflowEvent::ChildWorkflowFailed {
                seq: parent.seq,
                error: error.clone(),
            },
        };

        self.store
            .append_events(parent.workflow_id, sequence, vec![event])
            .await?;

        self.process_workflow_boxed(parent.workflow_id).await?;
        Ok(())
    }

    /// Send a signal to a workflow
    #[instrument(skip(self, signal))]
    pub async fn send_signal(
        &self,
        workflow_id: Uuid,
        signal: WorkflowSignal,
    ) -> Result<(), ExecutorError> {
        let status = self.store.get_workflow_status(workflow_id).await?;

        if matches!(
            status,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        ) {
            warn!(%workflow_id, ?status, "cannot send signal to completed workflow");
            return Err(ExecutorError::WorkflowCompleted(workflow_id));
        }

        self.store.send_signal(workflow_id, signal).await?;
        info!(%workflow_id, "signal sent");

        Ok(())
    }

    /// Run one decision task for a workflow: rebuild its context from
    /// history, drive its coroutine future to a fixed point, and persist
    /// whatever new commands that produced.
    ///
    /// Called after activity completion/failure, timer fire, or signal
    /// delivery — any event that might unblock a pending `.await` inside the
    /// workflow body.
    #[instrument(skip(self))]
    pub async fn process_workflow(
        &self,
        workflow_id: Uuid,
    ) -> Result<ProcessResult, ExecutorError> {
        let workflow_info = self.store.get_workflow_info(workflow_id).await?;

        if matches!(
            workflow_info.status,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        ) {
            debug!(%workflow_id, status = ?workflow_info.status, "workflow already in terminal state");
            return Ok(ProcessResult {
                completed: true,
                events_written: 0,
                tasks_enqueued: 0,
                signals_processed: 0,
            });
        }

        let events = self.store.load_events(workflow_id).await?;

        if events.is_empty() {
            return Err(ExecutorError::WorkflowNotFound(workflow_id));
        }

        if events.len() > self.config.max_events_per_workflow {
            return Err(ExecutorError::TooManyEvents(
                workflow_id,
                events.len(),
                self.config.max_events_per_workflow,
            ));
        }

        let mut sequence = events.len() as i32;
        let (run_input, run_events) = current_run(&events)?;
        let history = build_history(run_events);
        let signals = build_signal_buffers(&events);

        let ctx = WfContext::new(workflow_id.to_string(), Utc::now(), history, signals);
        let mut run = self
            .registry
            .create_run(&workflow_info.workflow_type, ctx.clone(), run_input)?;

        let outcome = drive_to_fixed_point(&mut run, &ctx);
        // `run` (and the `!Send` `WfContext` it closed over) is dropped here,
        // before any further `.await` below — it never crosses a real
        // suspension point, so nothing non-Send escapes this function.
        drop(run);

        let new_commands = ctx.drain_new_commands();
        let mut events_written = 0;
        let mut tasks_enqueued = 0;

        for command in new_commands {
            let child_start = match &command {
                NewCommand::ScheduleChildWorkflow {
                    seq,
                    workflow_type,
                    workflow_id: child_id,
                    input,
                } => Some((
                    // `child_id` is the caller's human-readable workflow identity
                    // (e.g. `create-database-db-42`); derive a stable `Uuid` from
                    // it rather than falling back to a fresh random one on every
                    // replay, which would violate the determinism contract.
                    crate::persistence::deterministic_workflow_id(child_id),
                    workflow_type.clone(),
                    input.clone(),
                    ParentLink {
                        workflow_id,
                        seq: *seq,
                    },
                )),
                _ => None,
            };

            let event = match &command {
                NewCommand::ScheduleActivity {
                    seq,
                    activity_type,
                    input,
                    options,
                } => WorkflowEvent::ActivityScheduled {
                    seq: *seq,
                    activity_type: activity_type.clone(),
                    input: input.clone(),
                    options: options.clone(),
                },
                NewCommand::StartTimer { seq, duration_ms } => WorkflowEvent::TimerStarted {
                    seq: *seq,
                    duration_ms: *duration_ms,
                    fires_at: Utc::now() + chrono::Duration::milliseconds(*duration_ms),
                },
                NewCommand::ScheduleChildWorkflow {
                    seq, workflow_type, ..
                } => WorkflowEvent::ChildWorkflowStarted {
                    seq: *seq,
                    workflow_id: child_start.as_ref().expect("set above").0,
                    workflow_type: workflow_type.clone(),
                },
            };

            sequence = self
                .store
                .append_events(workflow_id, sequence, vec![event])
                .await?;
            events_written += 1;

            if let NewCommand::ScheduleActivity {
                seq,
                activity_type,
                input,
                options,
            } = command
            {
                let task_queue = options
                    .task_queue
                    .clone()
                    .unwrap_or_else(|| GENERAL_TASK_QUEUE.to_string());

                let task = TaskDefinition {
                    workflow_id,
                    seq,
                    activity_type,
                    input,
                    options,
                    task_queue,
                };

                self.store.enqueue_task(task).await?;
                tasks_enqueued += 1;
            }

            if let Some((child_id, workflow_type, input, parent)) = child_start {
                self.start_child_workflow(child_id, &workflow_type, input, parent)
                    .await?;
            }
        }

        let mut completed = false;

        match outcome {
            Poll::Ready(Ok(Completion::Complete(result))) => {
                info!(%workflow_id, "workflow completed");
                sequence = self
                    .store
                    .append_events(
                        workflow_id,
                        sequence,
                        vec![WorkflowEvent::WorkflowCompleted {
                            result: result.clone(),
                        }],
                    )
                    .await?;
                events_written += 1;
                self.store
                    .update_workflow_status(workflow_id, WorkflowStatus::Completed, Some(result.clone()), None)
                    .await?;
                completed = true;
                if let Some(parent) = workflow_info.parent {
                    self.notify_parent(parent, &Ok(result)).await?;
                }
            }
            Poll::Ready(Ok(Completion::ContinueAsNew(next_input))) => {
                info!(%workflow_id, "workflow continuing as new");
                self.store
                    .append_events(
                        workflow_id,
                        sequence,
                        vec![WorkflowEvent::WorkflowContinuedAsNew { next_input }],
                    )
                    .await?;
                events_written += 1;
                completed = true;
                // Drive the new run's first decision task immediately rather
                // than waiting for the next unrelated trigger (a fresh
                // signal, a timer poll): buffered signals that carried over
                // across the rotation otherwise sit unprocessed until
                // something else happens to nudge this workflow again.
                return self.process_workflow_boxed(workflow_id).await;
            }
            Poll::Ready(Err(error)) => {
                error!(%workflow_id, error = %error.message, "workflow failed");
                sequence = self
                    .store
                    .append_events(
                        workflow_id,
                        sequence,
                        vec![WorkflowEvent::WorkflowFailed {
                            error: error.clone(),
                        }],
                    )
                    .await?;
                events_written += 1;
                self.store
                    .update_workflow_status(workflow_id, WorkflowStatus::Failed, None, Some(error.clone()))
                    .await?;
                completed = true;
                if let Some(parent) = workflow_info.parent {
                    self.notify_parent(parent, &Err(error)).await?;
                }
            }
            Poll::Pending => {
                let _ = sequence; // only needed along completed branches above
            }
        }

        Ok(ProcessResult {
            completed,
            events_written,
            tasks_enqueued,
            signals_processed: 0,
        })
    }

    /// Record an activity completion and immediately process the resulting
    /// decision task.
    #[instrument(skip(self, result))]
    pub async fn on_activity_completed(
        &self,
        workflow_id: Uuid,
        seq: u32,
        result: serde_json::Value,
    ) -> Result<ProcessResult, ExecutorError> {
        let events = self.store.load_events(workflow_id).await?;
        let sequence = events.len() as i32;

        self.store
            .append_events(
                workflow_id,
                sequence,
                vec![WorkflowEvent::ActivityCompleted { seq, result }],
            )
            .await?;

        self.process_workflow(workflow_id).await
    }

    /// Record a final activity failure (no more retries) and process the
    /// resulting decision task.
    #[instrument(skip(self, error))]
    pub async fn on_activity_failed(
        &self,
        workflow_id: Uuid,
        seq: u32,
        error: ActivityError,
        will_retry: bool,
    ) -> Result<ProcessResult, ExecutorError> {
        let events = self.store.load_events(workflow_id).await?;
        let sequence = events.len() as i32;

        self.store
            .append_events(
                workflow_id,
                sequence,
                vec![WorkflowEvent::ActivityFailed {
                    seq,
                    error,
                    will_retry,
                }],
            )
            .await?;

        if will_retry {
            return Ok(ProcessResult {
                completed: false,
                events_written: 1,
                tasks_enqueued: 0,
                signals_processed: 0,
            });
        }

        self.process_workflow(workflow_id).await
    }

    /// Record a timer fire and process the resulting decision task.
    #[instrument(skip(self))]
    pub async fn on_timer_fired(
        &self,
        workflow_id: Uuid,
        seq: u32,
    ) -> Result<ProcessResult, ExecutorError> {
        let events = self.store.load_events(workflow_id).await?;
        let sequence = events.len() as i32;

        self.store
            .append_events(workflow_id, sequence, vec![WorkflowEvent::TimerFired { seq }])
            .await?;

        self.process_workflow(workflow_id).await
    }
}

/// Find the start of the current run: the most recent `WorkflowStarted` or
/// `WorkflowContinuedAsNew` event, reading backwards. Returns the run's
/// input and the slice of events recorded since (activity/timer/child
/// sequence numbers reset to zero at the start of each run).
fn current_run(
    events: &[(i32, WorkflowEvent)],
) -> Result<(serde_json::Value, &[(i32, WorkflowEvent)]), ExecutorError> {
    for (idx, (_, event)) in events.iter().enumerate().rev() {
        match event {
            WorkflowEvent::WorkflowStarted { input } => {
                return Ok((input.clone(), &events[idx + 1..]))
            }
            WorkflowEvent::WorkflowContinuedAsNew { next_input } => {
                return Ok((next_input.clone(), &events[idx + 1..]))
            }
            _ => {}
        }
    }

    Err(ExecutorError::ReplayError(
        "workflow has no WorkflowStarted event".to_string(),
    ))
}

/// Build the `seq -> Outcome` map the current run's `WfContext` replays
/// against.
fn build_history(run_events: &[(i32, WorkflowEvent)]) -> HashMap<u32, Outcome> {
    let mut history = HashMap::new();

    for (_, event) in run_events {
        match event {
            WorkflowEvent::ActivityCompleted { seq, result } => {
                history.insert(*seq, Outcome::Activity(Ok(result.clone())));
            }
            WorkflowEvent::ActivityFailed {
                seq,
                error,
                will_retry,
            } => {
                if !will_retry {
                    history.insert(*seq, Outcome::Activity(Err(error.clone())));
                }
            }
            WorkflowEvent::TimerFired { seq } => {
                history.insert(*seq, Outcome::Timer);
            }
            WorkflowEvent::ChildWorkflowCompleted { seq, result } => {
                history.insert(*seq, Outcome::Child(Ok(result.clone())));
            }
            WorkflowEvent::ChildWorkflowFailed { seq, error } => {
                history.insert(*seq, Outcome::Child(Err(error.clone())));
            }
            _ => {}
        }
    }

    history
}

/// Build per-channel signal buffers from the *entire* event history (not
/// scoped to the current run) — signal delivery order survives
/// continue-as-new since signals are keyed by `workflow_id`, not by run.
fn build_signal_buffers(
    events: &[(i32, WorkflowEvent)],
) -> HashMap<String, VecDeque<WorkflowSignal>> {
    let mut signals: HashMap<String, VecDeque<WorkflowSignal>> = HashMap::new();

    for (_, event) in events {
        if let WorkflowEvent::SignalReceived { signal } = event {
            signals
                .entry(signal.signal_type.clone())
                .or_default()
                .push_back(signal.clone());
        }
    }

    signals
}

/// Append any signals the store has queued but not yet recorded as
/// `SignalReceived` events, then run a decision task. Call this on a timer
/// from the poll loop that watches for inbound signals, or right after
/// `send_signal` for low-latency delivery.
pub async fn deliver_pending_signals<S: WorkflowEventStore>(
    executor: &WorkflowExecutor<S>,
    workflow_id: Uuid,
) -> Result<ProcessResult, ExecutorError> {
    let pending = executor.store.get_pending_signals(workflow_id).await?;
    if pending.is_empty() {
        return executor.process_workflow(workflow_id).await;
    }

    let events = executor.store.load_events(workflow_id).await?;
    let mut sequence = events.len() as i32;

    for signal in &pending {
        sequence = executor
            .store
            .append_events(
                workflow_id,
                sequence,
                vec![WorkflowEvent::SignalReceived {
                    signal: signal.clone(),
                }],
            )
            .await?;
    }

    executor
        .store
        .mark_signals_processed(workflow_id, pending.len())
        .await?;

    executor.process_workflow(workflow_id).await
}

/// Poll the workflow future and any `go()`-spawned sub-coroutines to a
/// fixed point. History is static within one decision task, so the only
/// thing that can still move between passes is `WaitGroup`/`Semaphore`
/// state driven by other sub-coroutines completing — loop until a full pass
/// makes no further progress.
fn drive_to_fixed_point(
    run: &mut WorkflowFuture,
    ctx: &WfContext,
) -> Poll<Result<Completion<serde_json::Value>, WorkflowError>> {
    let waker = futures::task::noop_waker();
    let mut task_cx = TaskContext::from_waker(&waker);

    loop {
        if let Poll::Ready(result) = run.as_mut().poll(&mut task_cx) {
            return Poll::Ready(result);
        }

        let mut progressed = false;
        {
            let mut subs = ctx.sub_coroutines();
            let mut i = 0;
            while i < subs.len() {
                if Future::poll(subs[i].as_mut(), &mut task_cx).is_ready() {
                    subs.remove(i);
                    progressed = true;
                } else {
                    i += 1;
                }
            }
        }

        if !progressed {
            return Poll::Pending;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryWorkflowEventStore;
    use crate::workflow::{ActivityOptions, ActivitySpec};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct CounterInput {
        start: i32,
        target: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct CounterOutput {
        final_value: i32,
    }

    struct Increment;
    impl ActivitySpec for Increment {
        const TYPE: &'static str = "increment";
        type Input = i32;
        type Output = i32;
    }

    struct CounterWorkflow;

    #[async_trait(?Send)]
    impl crate::workflow::Workflow for CounterWorkflow {
        const TYPE: &'static str = "counter_workflow";
        type Input = CounterInput;
        type Output = CounterOutput;

        async fn run(
            ctx: WfContext,
            input: Self::Input,
        ) -> Result<Completion<Self::Output>, WorkflowError> {
            let mut current = input.start;
            while current < input.target {
                current = ctx
                    .execute_activity::<Increment>(current, ActivityOptions::default())
                    .await
                    .map_err(|e| WorkflowError::new(e.message))?;
            }
            Ok(Completion::Complete(CounterOutput {
                final_value: current,
            }))
        }
    }

    #[tokio::test]
    async fn test_start_workflow_writes_started_and_scheduled_events() {
        let store = InMemoryWorkflowEventStore::new();
        let mut executor = WorkflowExecutor::new(store);
        executor.register::<CounterWorkflow>();

        let input = CounterInput {
            start: 0,
            target: 3,
        };
        let workflow_id = executor
            .start_workflow::<CounterWorkflow>(input, None)
            .await
            .expect("should start workflow");

        let status = executor
            .store()
            .get_workflow_status(workflow_id)
            .await
            .expect("should get status");
        assert_eq!(status, WorkflowStatus::Running);

        let events = executor
            .store()
            .load_events(workflow_id)
            .await
            .expect("should load events");

        assert!(events.len() >= 2);
        assert!(matches!(events[0].1, WorkflowEvent::WorkflowStarted { .. }));
        assert!(matches!(
            events[1].1,
            WorkflowEvent::ActivityScheduled { .. }
        ));
    }

    #[tokio::test]
    async fn test_immediate_completion() {
        let store = InMemoryWorkflowEventStore::new();
        let mut executor = WorkflowExecutor::new(store);
        executor.register::<CounterWorkflow>();

        let input = CounterInput {
            start: 5,
            target: 3,
        };
        let workflow_id = executor
            .start_workflow::<CounterWorkflow>(input, None)
            .await
            .expect("should start workflow");

        let status = executor
            .store()
            .get_workflow_status(workflow_id)
            .await
            .expect("should get status");
        assert_eq!(status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn test_activity_completion_drives_workflow_to_completion() {
        let store = InMemoryWorkflowEventStore::new();
        let mut executor = WorkflowExecutor::new(store);
        executor.register::<CounterWorkflow>();

        let input = CounterInput {
            start: 0,
            target: 2,
        };
        let workflow_id = executor
            .start_workflow::<CounterWorkflow>(input, None)
            .await
            .expect("should start workflow");

        let result = executor
            .on_activity_completed(workflow_id, 0, serde_json::json!(1))
            .await
            .expect("should complete activity");
        assert!(!result.completed);

        let result = executor
            .on_activity_completed(workflow_id, 1, serde_json::json!(2))
            .await
            .expect("should complete activity");
        assert!(result.completed);

        let status = executor
            .store()
            .get_workflow_status(workflow_id)
            .await
            .expect("should get status");
        assert_eq!(status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn test_activity_failure_fails_workflow() {
        let store = InMemoryWorkflowEventStore::new();
        let mut executor = WorkflowExecutor::new(store);
        executor.register::<CounterWorkflow>();

        let input = CounterInput {
            start: 0,
            target: 5,
        };
        let workflow_id = executor
            .start_workflow::<CounterWorkflow>(input, None)
            .await
            .expect("should start workflow");

        let error = ActivityError::non_retryable("increment failed").with_type("INCREMENT_ERROR");
        let result = executor
            .on_activity_failed(workflow_id, 0, error, false)
            .await
            .expect("should handle failure");

        assert!(result.completed);

        let status = executor
            .store()
            .get_workflow_status(workflow_id)
            .await
            .expect("should get status");
        assert_eq!(status, WorkflowStatus::Failed);
    }

    #[tokio::test]
    async fn test_cannot_signal_completed_workflow() {
        let store = InMemoryWorkflowEventStore::new();
        let mut executor = WorkflowExecutor::new(store);
        executor.register::<CounterWorkflow>();

        let input = CounterInput {
            start: 10,
            target: 5,
        };
        let workflow_id = executor
            .start_workflow::<CounterWorkflow>(input, None)
            .await
            .expect("should start workflow");

        let signal = WorkflowSignal::new("test", serde_json::json!({}));
        let result = executor.send_signal(workflow_id, signal).await;

        assert!(matches!(result, Err(ExecutorError::WorkflowCompleted(_))));
    }

    #[tokio::test]
    async fn test_replay_consistency_across_decision_tasks() {
        let store = InMemoryWorkflowEventStore::new();
        let mut executor = WorkflowExecutor::new(store);
        executor.register::<CounterWorkflow>();

        let input = CounterInput {
            start: 0,
            target: 3,
        };
        let workflow_id = executor
            .start_workflow::<CounterWorkflow>(input, None)
            .await
            .unwrap();

        executor
            .on_activity_completed(workflow_id, 0, serde_json::json!(1))
            .await
            .unwrap();
        executor
            .on_activity_completed(workflow_id, 1, serde_json::json!(2))
            .await
            .unwrap();
        executor
            .on_activity_completed(workflow_id, 2, serde_json::json!(3))
            .await
            .unwrap();

        let result = executor.process_workflow(workflow_id).await.unwrap();
        assert!(result.completed);
    }
}

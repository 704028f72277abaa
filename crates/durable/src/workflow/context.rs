//! Coroutine authoring context
//!
//! `WfContext` is the surface workflow authors program against: activities,
//! timers, child workflows, signals, and the cooperative coordination
//! primitives (`go`, `Selector`, `WaitGroup`, `Semaphore`). It replaces the
//! old push-action reducer methods with plain `async fn` code.
//!
//! Determinism comes from full replay: every decision task constructs a
//! fresh `Workflow::run` future and polls it (and any `go`-spawned
//! sub-coroutines) to a fixed point against the already-recorded history.
//! Each context operation claims the next sequence number from a `Cell<u32>`
//! that only resets when a brand new top-level future is built, so the same
//! code path always claims the same sequence numbers in the same order.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::activity::ActivityError;
use super::action::ActivityOptions;
use super::definition::WorkflowError;
use super::signal::WorkflowSignal;

/// Call-site type information for an activity. Implemented by the same
/// struct the worker registers a handler under; only `TYPE`/`Input`/`Output`
/// are used when authoring, the `execute` body lives on the worker side.
pub trait ActivitySpec: Send + Sync + 'static {
    /// Activity type name used for task routing and replay lookup.
    const TYPE: &'static str;
    /// Activity input payload.
    type Input: Serialize + DeserializeOwned + Send;
    /// Activity output payload.
    type Output: Serialize + DeserializeOwned + Send;
}

/// Call-site type information for a child workflow.
pub trait ChildWorkflowSpec: Send + Sync + 'static {
    /// Workflow type name used for registry lookup and replay bookkeeping.
    const TYPE: &'static str;
    /// Workflow input payload.
    type Input: Serialize + DeserializeOwned + Send;
    /// Workflow output payload.
    type Output: Serialize + DeserializeOwned + Send;
}

/// A resolved outcome for a sequence number, recorded from history.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Activity(Result<Value, ActivityError>),
    Timer,
    Child(Result<Value, WorkflowError>),
}

/// A new command produced this decision task that the executor still needs
/// to persist (as a `WorkflowEvent`) and act on (enqueue a task, etc).
#[derive(Debug, Clone)]
pub enum NewCommand {
    /// Schedule an activity task.
    ScheduleActivity {
        seq: u32,
        activity_type: String,
        input: Value,
        options: ActivityOptions,
    },
    /// Start a durable timer.
    StartTimer { seq: u32, duration_ms: i64 },
    /// Start a child workflow.
    ScheduleChildWorkflow {
        seq: u32,
        workflow_type: String,
        workflow_id: String,
        input: Value,
    },
}

struct ContextState {
    workflow_id: String,
    now: DateTime<Utc>,
    next_seq: Cell<u32>,
    history: HashMap<u32, Outcome>,
    new_commands: RefCell<Vec<NewCommand>>,
    signals: RefCell<HashMap<String, VecDeque<WorkflowSignal>>>,
    signal_cursor: RefCell<HashMap<String, usize>>,
    sub_coroutines: RefCell<Vec<Pin<Box<dyn Future<Output = ()>>>>>,
    continue_as_new: RefCell<Option<Value>>,
}

/// The workflow authoring context.
///
/// Cheaply cloneable (an `Rc` handle); clones all share the same replay
/// state, which is what lets `go()`-spawned sub-coroutines and wait-group /
/// semaphore primitives observe each other's progress within one decision
/// task's fixed-point poll.
#[derive(Clone)]
pub struct WfContext(Rc<ContextState>);

impl fmt::Debug for WfContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WfContext")
            .field("workflow_id", &self.0.workflow_id)
            .field("now", &self.0.now)
            .finish()
    }
}

impl WfContext {
    /// Build a fresh context for one decision task from the currently known
    /// history. `signals` are all signals enqueued for this workflow so far,
    /// in delivery order, grouped by channel name.
    pub fn new(
        workflow_id: impl Into<String>,
        now: DateTime<Utc>,
        history: HashMap<u32, Outcome>,
        signals: HashMap<String, VecDeque<WorkflowSignal>>,
    ) -> Self {
        Self(Rc::new(ContextState {
            workflow_id: workflow_id.into(),
            now,
            next_seq: Cell::new(0),
            history,
            new_commands: RefCell::new(Vec::new()),
            signals: RefCell::new(signals),
            signal_cursor: RefCell::new(HashMap::new()),
            sub_coroutines: RefCell::new(Vec::new()),
            continue_as_new: RefCell::new(None),
        }))
    }

    fn next_seq(&self) -> u32 {
        let seq = self.0.next_seq.get();
        self.0.next_seq.set(seq + 1);
        seq
    }

    fn outcome(&self, seq: u32) -> Option<Outcome> {
        self.0.history.get(&seq).cloned()
    }

    /// Drain the commands newly produced this decision task.
    pub fn drain_new_commands(&self) -> Vec<NewCommand> {
        self.0.new_commands.borrow_mut().drain(..).collect()
    }

    /// The workflow's own deterministic clock. Never call `chrono::Utc::now()`
    /// directly from workflow code; use this instead.
    pub fn now(&self) -> DateTime<Utc> {
        self.0.now
    }

    /// The workflow's durable identity.
    pub fn workflow_id(&self) -> &str {
        &self.0.workflow_id
    }

    /// Execute an activity, retrying and load-balancing per `options`.
    pub fn execute_activity<A: ActivitySpec>(
        &self,
        input: A::Input,
        options: ActivityOptions,
    ) -> ActivityFuture<A::Output> {
        let seq = self.next_seq();
        if self.outcome(seq).is_none() {
            let payload = serde_json::to_value(&input).expect("activity input must serialize");
            self.0.new_commands.borrow_mut().push(NewCommand::ScheduleActivity {
                seq,
                activity_type: A::TYPE.to_string(),
                input: payload,
                options,
            });
        }
        ActivityFuture {
            ctx: self.clone(),
            seq,
            _marker: std::marker::PhantomData,
        }
    }

    /// Start a durable timer that fires after `duration`.
    pub fn new_timer(&self, duration: std::time::Duration) -> TimerFuture {
        let seq = self.next_seq();
        if self.outcome(seq).is_none() {
            self.0.new_commands.borrow_mut().push(NewCommand::StartTimer {
                seq,
                duration_ms: duration.as_millis() as i64,
            });
        }
        TimerFuture { ctx: self.clone(), seq }
    }

    /// Start a child workflow and await its completion.
    pub fn execute_child_workflow<W: ChildWorkflowSpec>(
        &self,
        workflow_id: impl Into<String>,
        input: W::Input,
    ) -> ChildWorkflowFuture<W::Output> {
        let seq = self.next_seq();
        let workflow_id = workflow_id.into();
        if self.outcome(seq).is_none() {
            let payload = serde_json::to_value(&input).expect("child input must serialize");
            self.0
                .new_commands
                .borrow_mut()
                .push(NewCommand::ScheduleChildWorkflow {
                    seq,
                    workflow_type: W::TYPE.to_string(),
                    workflow_id,
                    input: payload,
                });
        }
        ChildWorkflowFuture {
            ctx: self.clone(),
            seq,
            _marker: std::marker::PhantomData,
        }
    }

    /// Start a child workflow chosen by a runtime workflow-type name rather
    /// than a compile-time [`ChildWorkflowSpec`]. Needed by dispatchers that
    /// route to a workflow type carried in data (a signal payload, a task
    /// queue message) instead of one fixed at the call site.
    pub fn execute_child_workflow_dyn(
        &self,
        workflow_type: impl Into<String>,
        workflow_id: impl Into<String>,
        input: Value,
    ) -> ChildWorkflowFuture<Value> {
        let seq = self.next_seq();
        let workflow_id = workflow_id.into();
        if self.outcome(seq).is_none() {
            self.0
                .new_commands
                .borrow_mut()
                .push(NewCommand::ScheduleChildWorkflow {
                    seq,
                    workflow_type: workflow_type.into(),
                    workflow_id,
                    input,
                });
        }
        ChildWorkflowFuture {
            ctx: self.clone(),
            seq,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get a handle to a named, durable signal channel.
    ///
    /// Consumption order is deterministic: the Nth `.recv().await` on a
    /// channel within a replay always returns the Nth signal ever delivered
    /// to that channel, because the cursor is part of replay-stable state.
    pub fn get_signal_channel(&self, name: impl Into<String>) -> SignalChannel {
        SignalChannel {
            ctx: self.clone(),
            name: name.into(),
        }
    }

    /// Spawn a cooperative sub-coroutine sharing this context. Polled to a
    /// fixed point alongside the main workflow future within one decision
    /// task; never scheduled onto a real OS thread or tokio task.
    pub fn go<F>(&self, fut: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.0.sub_coroutines.borrow_mut().push(Box::pin(fut));
    }

    pub(crate) fn sub_coroutines(&self) -> std::cell::RefMut<'_, Vec<Pin<Box<dyn Future<Output = ()>>>>> {
        self.0.sub_coroutines.borrow_mut()
    }

    /// Build a new empty selector over this context.
    pub fn new_selector<T>(&self) -> Selector<T> {
        Selector { branches: Vec::new() }
    }

    /// Build a new wait-group with `count` outstanding completions.
    pub fn new_wait_group(&self, count: usize) -> WaitGroup {
        WaitGroup {
            remaining: Rc::new(Cell::new(count)),
        }
    }

    /// Build a new semaphore with `permits` available slots.
    pub fn new_semaphore(&self, permits: usize) -> Semaphore {
        Semaphore {
            available: Rc::new(Cell::new(permits)),
        }
    }

    /// Request that the workflow continue-as-new with `next_input` once
    /// `run` returns `Completion::ContinueAsNew`. Recording this here (vs.
    /// only in the return value) lets `go()`-spawned coroutines observe that
    /// a continuation has been requested and wind down cooperatively.
    pub fn request_continue_as_new<T: Serialize>(&self, next_input: &T) {
        let value = serde_json::to_value(next_input).expect("continue-as-new input must serialize");
        *self.0.continue_as_new.borrow_mut() = Some(value);
    }

    /// Whether `request_continue_as_new` has been called this decision task.
    pub fn continue_as_new_requested(&self) -> bool {
        self.0.continue_as_new.borrow().is_some()
    }
}

/// Future returned by [`WfContext::execute_activity`].
pub struct ActivityFuture<T> {
    ctx: WfContext,
    seq: u32,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DeserializeOwned> Future for ActivityFuture<T> {
    type Output = Result<T, ActivityError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        match self.ctx.outcome(self.seq) {
            Some(Outcome::Activity(Ok(value))) => Poll::Ready(
                serde_json::from_value(value)
                    .map_err(|e| ActivityError::non_retryable(format!("activity result decode: {e}"))),
            ),
            Some(Outcome::Activity(Err(err))) => Poll::Ready(Err(err)),
            Some(_) => panic!("sequence {} resolved with the wrong outcome kind", self.seq),
            None => Poll::Pending,
        }
    }
}

/// Future returned by [`WfContext::new_timer`].
pub struct TimerFuture {
    ctx: WfContext,
    seq: u32,
}

impl Future for TimerFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        match self.ctx.outcome(self.seq) {
            Some(Outcome::Timer) => Poll::Ready(()),
            Some(_) => panic!("sequence {} resolved with the wrong outcome kind", self.seq),
            None => Poll::Pending,
        }
    }
}

/// Future returned by [`WfContext::execute_child_workflow`].
pub struct ChildWorkflowFuture<T> {
    ctx: WfContext,
    seq: u32,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DeserializeOwned> Future for ChildWorkflowFuture<T> {
    type Output = Result<T, WorkflowError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        match self.ctx.outcome(self.seq) {
            Some(Outcome::Child(Ok(value))) => Poll::Ready(
                serde_json::from_value(value)
                    .map_err(|e| WorkflowError::new(format!("child result decode: {e}"))),
            ),
            Some(Outcome::Child(Err(err))) => Poll::Ready(Err(err)),
            Some(_) => panic!("sequence {} resolved with the wrong outcome kind", self.seq),
            None => Poll::Pending,
        }
    }
}

/// A durable, ordered signal channel.
#[derive(Clone)]
pub struct SignalChannel {
    ctx: WfContext,
    name: String,
}

impl SignalChannel {
    /// Receive the next signal ever delivered to this channel. Resolves
    /// immediately if a not-yet-consumed signal is already buffered.
    pub fn recv(&self) -> SignalRecvFuture {
        SignalRecvFuture {
            ctx: self.ctx.clone(),
            name: self.name.clone(),
        }
    }

    /// Non-blocking check for a buffered signal without consuming it.
    pub fn has_pending(&self) -> bool {
        let cursor = *self.ctx.0.signal_cursor.borrow().get(&self.name).unwrap_or(&0);
        let signals = self.ctx.0.signals.borrow();
        signals.get(&self.name).map(|q| q.len() > cursor).unwrap_or(false)
    }
}

/// Future returned by [`SignalChannel::recv`].
pub struct SignalRecvFuture {
    ctx: WfContext,
    name: String,
}

impl Future for SignalRecvFuture {
    type Output = WorkflowSignal;

    fn poll(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let mut cursors = self.ctx.0.signal_cursor.borrow_mut();
        let cursor = cursors.entry(self.name.clone()).or_insert(0);
        let signals = self.ctx.0.signals.borrow();
        match signals.get(&self.name).and_then(|q| q.get(*cursor)) {
            Some(signal) => {
                let signal = signal.clone();
                *cursor += 1;
                Poll::Ready(signal)
            }
            None => Poll::Pending,
        }
    }
}

/// A branch registered with a [`Selector`].
type SelectorBranch<T> = Pin<Box<dyn Future<Output = T>>>;

/// Fixed registration-order combinator: polls branches in the order they
/// were added and resolves to the first one ready, breaking ties by
/// registration order. Deterministic across replay as long as branches are
/// (re-)added in the same order each time, which holds for the same reason
/// sequence-number assignment holds.
pub struct Selector<T> {
    branches: Vec<SelectorBranch<T>>,
}

impl<T> Selector<T> {
    /// Register a branch. Map heterogeneous futures into a common `T`
    /// (typically an enum) before adding them.
    pub fn add<F>(mut self, fut: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        self.branches.push(Box::pin(fut));
        self
    }

    /// Wait for the first branch to resolve.
    pub fn select(self) -> SelectFuture<T> {
        SelectFuture { branches: self.branches }
    }
}

/// Future returned by [`Selector::select`].
pub struct SelectFuture<T> {
    branches: Vec<SelectorBranch<T>>,
}

impl<T> Future for SelectFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        for branch in this.branches.iter_mut() {
            if let Poll::Ready(value) = branch.as_mut().poll(cx) {
                return Poll::Ready(value);
            }
        }
        Poll::Pending
    }
}

/// In-memory fan-out coordination: wait for `count` independent
/// `go()`-spawned coroutines to call `done()`. Requires no persisted event
/// type of its own; its state is a pure function of already-recorded
/// command outcomes observed by the coroutines racing it.
#[derive(Clone)]
pub struct WaitGroup {
    remaining: Rc<Cell<usize>>,
}

impl WaitGroup {
    /// Mark one unit of work complete.
    pub fn done(&self) {
        let n = self.remaining.get();
        self.remaining.set(n.saturating_sub(1));
    }

    /// Await until all units of work have called `done()`.
    pub fn wait(&self) -> WaitGroupFuture {
        WaitGroupFuture { remaining: self.remaining.clone() }
    }
}

/// Future returned by [`WaitGroup::wait`].
pub struct WaitGroupFuture {
    remaining: Rc<Cell<usize>>,
}

impl Future for WaitGroupFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        if self.remaining.get() == 0 {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// In-memory bounded-concurrency gate for `go()`-spawned coroutines.
#[derive(Clone)]
pub struct Semaphore {
    available: Rc<Cell<usize>>,
}

impl Semaphore {
    /// Acquire one permit, waiting if none are available.
    pub fn acquire(&self) -> SemaphoreAcquireFuture {
        SemaphoreAcquireFuture {
            available: self.available.clone(),
            acquired: false,
        }
    }
}

/// Future returned by [`Semaphore::acquire`]. Releases the permit on drop.
pub struct SemaphoreAcquireFuture {
    available: Rc<Cell<usize>>,
    acquired: bool,
}

impl Future for SemaphoreAcquireFuture {
    type Output = SemaphorePermit;

    fn poll(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.acquired {
            return Poll::Ready(SemaphorePermit { available: this.available.clone() });
        }
        let n = this.available.get();
        if n > 0 {
            this.available.set(n - 1);
            this.acquired = true;
            Poll::Ready(SemaphorePermit { available: this.available.clone() })
        } else {
            Poll::Pending
        }
    }
}

/// A held semaphore permit; releases on drop.
pub struct SemaphorePermit {
    available: Rc<Cell<usize>>,
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        self.available.set(self.available.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> WfContext {
        WfContext::new("wf-1", Utc::now(), HashMap::new(), HashMap::new())
    }

    #[test]
    fn sequence_numbers_assigned_in_call_order() {
        struct Probe;
        impl ActivitySpec for Probe {
            const TYPE: &'static str = "probe";
            type Input = ();
            type Output = ();
        }
        let c = ctx();
        let _a = c.execute_activity::<Probe>((), ActivityOptions::default());
        let _b = c.new_timer(std::time::Duration::from_secs(1));
        let commands = c.drain_new_commands();
        assert_eq!(commands.len(), 2);
        match &commands[0] {
            NewCommand::ScheduleActivity { seq, .. } => assert_eq!(*seq, 0),
            _ => panic!("expected activity command first"),
        }
        match &commands[1] {
            NewCommand::StartTimer { seq, .. } => assert_eq!(*seq, 1),
            _ => panic!("expected timer command second"),
        }
    }

    #[test]
    fn replayed_activity_resolves_without_new_command() {
        let mut history = HashMap::new();
        history.insert(0, Outcome::Activity(Ok(serde_json::json!(42))));
        let c = WfContext::new("wf-1", Utc::now(), history, HashMap::new());

        struct Probe;
        impl ActivitySpec for Probe {
            const TYPE: &'static str = "probe";
            type Input = ();
            type Output = i32;
        }
        let _fut = c.execute_activity::<Probe>((), ActivityOptions::default());
        assert!(c.drain_new_commands().is_empty());
    }

    #[test]
    fn wait_group_resolves_after_all_done() {
        let c = ctx();
        let wg = c.new_wait_group(2);
        let mut fut = Box::pin(wg.wait());
        let waker = futures::task::noop_waker();
        let mut task_cx = TaskContext::from_waker(&waker);
        assert_eq!(fut.as_mut().poll(&mut task_cx), Poll::Pending);
        wg.done();
        assert_eq!(fut.as_mut().poll(&mut task_cx), Poll::Pending);
        wg.done();
        assert_eq!(fut.as_mut().poll(&mut task_cx), Poll::Ready(()));
    }

    #[test]
    fn semaphore_limits_concurrent_permits() {
        let c = ctx();
        let sem = c.new_semaphore(1);
        let waker = futures::task::noop_waker();
        let mut task_cx = TaskContext::from_waker(&waker);

        let mut first = Box::pin(sem.acquire());
        let permit = match first.as_mut().poll(&mut task_cx) {
            Poll::Ready(p) => p,
            Poll::Pending => panic!("expected immediate permit"),
        };

        let mut second = Box::pin(sem.acquire());
        assert_eq!(matches!(second.as_mut().poll(&mut task_cx), Poll::Pending), true);

        drop(permit);
        assert!(matches!(second.as_mut().poll(&mut task_cx), Poll::Ready(_)));
    }
}

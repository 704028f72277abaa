//! Workflow abstractions and types
//!
//! This module contains the core workflow primitives:
//! - [`Workflow`] trait, authored as an `async fn run(ctx, input)`
//! - [`WfContext`] — the coroutine-facing authoring surface (activities,
//!   timers, child workflows, signals, `go`/`Selector`/`WaitGroup`/`Semaphore`)
//! - [`WorkflowEvent`] enum for persisted events
//! - [`WorkflowSignal`] for external communication

mod action;
mod context;
mod definition;
mod event;
mod signal;

pub use action::ActivityOptions;
pub use context::{
    ActivityFuture, ActivitySpec, ChildWorkflowFuture, ChildWorkflowSpec, NewCommand,
    Selector, Semaphore, SemaphorePermit, SignalChannel, TimerFuture, WaitGroup, WfContext,
};
pub(crate) use context::Outcome;
pub use definition::{Completion, Workflow, WorkflowError};
pub use event::{TimeoutType, WorkflowEvent};
pub use signal::{signal_types, WorkflowSignal};

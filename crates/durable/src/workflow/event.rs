//! Workflow events for persistence
//!
//! Activities, timers, and child workflows are keyed by `seq` — the
//! deterministic call-order sequence number a [`crate::workflow::context::WfContext`]
//! operation assigns itself — rather than an author-chosen string id. Since
//! the whole workflow body re-executes from the top on every decision task,
//! the Nth context operation always claims sequence number N again, so `seq`
//! is as stable a key as a hand-picked id would have been, without the
//! author needing to invent unique names for every activity call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActivityOptions, WorkflowError, WorkflowSignal};
use crate::activity::ActivityError;

/// Types of timeouts that can occur
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutType {
    /// Activity was not claimed within schedule_to_start_timeout
    ScheduleToStart,

    /// Activity did not complete within start_to_close_timeout
    StartToClose,

    /// Worker did not send heartbeat within heartbeat_timeout
    Heartbeat,
}

/// Events stored in the durable_workflow_events table
///
/// These events form the append-only log for a workflow. They are used for:
/// - Persisting workflow progress
/// - Replaying workflows after recovery
/// - Auditing and debugging
///
/// Events are immutable once written. The workflow state is reconstructed
/// by replaying all events in sequence order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    // =========================================================================
    // Workflow Lifecycle Events
    // =========================================================================
    /// Workflow was started with the given input
    WorkflowStarted {
        /// The input provided when starting the workflow
        input: serde_json::Value,
    },

    /// Workflow completed successfully
    WorkflowCompleted {
        /// The result value
        result: serde_json::Value,
    },

    /// Workflow failed with an error
    WorkflowFailed {
        /// Error details
        error: WorkflowError,
    },

    /// Workflow was cancelled (via signal or admin action)
    WorkflowCancelled {
        /// Reason for cancellation
        reason: String,
    },

    /// Workflow continued as a new run under the same workflow id, carrying
    /// `next_input` forward. The replay cursor resets to empty for the next
    /// decision task; signals are untouched since they're keyed by
    /// workflow_id in a separate table, not by run.
    WorkflowContinuedAsNew {
        /// Input for the next run
        next_input: serde_json::Value,
    },

    // =========================================================================
    // Activity Lifecycle Events
    // =========================================================================
    /// Activity was scheduled for execution
    ActivityScheduled {
        /// Deterministic call-order sequence number
        seq: u32,

        /// Type of activity to execute
        activity_type: String,

        /// Input for the activity
        input: serde_json::Value,

        /// Execution options
        options: ActivityOptions,
    },

    /// Activity execution started (claimed by a worker)
    ActivityStarted {
        /// Sequence number
        seq: u32,

        /// Current attempt number (1-based)
        attempt: u32,

        /// ID of the worker executing the activity
        worker_id: String,
    },

    /// Activity completed successfully
    ActivityCompleted {
        /// Sequence number
        seq: u32,

        /// Result returned by the activity
        result: serde_json::Value,
    },

    /// Activity failed (may or may not retry)
    ActivityFailed {
        /// Sequence number
        seq: u32,

        /// Error details
        error: ActivityError,

        /// Whether the activity will be retried
        will_retry: bool,
    },

    /// Activity timed out
    ActivityTimedOut {
        /// Sequence number
        seq: u32,

        /// Type of timeout that occurred
        timeout_type: TimeoutType,
    },

    /// Activity was cancelled
    ActivityCancelled {
        /// Sequence number
        seq: u32,

        /// Reason for cancellation
        reason: String,
    },

    // =========================================================================
    // Timer Events
    // =========================================================================
    /// Timer was started
    TimerStarted {
        /// Sequence number
        seq: u32,

        /// Duration in milliseconds
        duration_ms: i64,

        /// Wall-clock time this timer fires at, computed once at schedule
        /// time so the firing side doesn't need to re-derive it from
        /// `duration_ms` plus some other event's timestamp.
        fires_at: DateTime<Utc>,
    },

    /// Timer fired (duration elapsed)
    TimerFired {
        /// Sequence number
        seq: u32,
    },

    /// Timer was cancelled
    TimerCancelled {
        /// Sequence number
        seq: u32,
    },

    // =========================================================================
    // Signal Events
    // =========================================================================
    /// External signal was received
    SignalReceived {
        /// The signal that was received
        signal: WorkflowSignal,
    },

    // =========================================================================
    // Child Workflow Events
    // =========================================================================
    /// Child workflow was started
    ChildWorkflowStarted {
        /// Sequence number
        seq: u32,

        /// Child workflow ID
        workflow_id: Uuid,

        /// Type of the child workflow
        workflow_type: String,
    },

    /// Child workflow completed successfully
    ChildWorkflowCompleted {
        /// Sequence number
        seq: u32,

        /// Result from the child workflow
        result: serde_json::Value,
    },

    /// Child workflow failed
    ChildWorkflowFailed {
        /// Sequence number
        seq: u32,

        /// Error from the child workflow
        error: WorkflowError,
    },
}

impl WorkflowEvent {
    /// Get the sequence number if this is a seq-keyed event
    pub fn seq(&self) -> Option<u32> {
        match self {
            Self::ActivityScheduled { seq, .. }
            | Self::ActivityStarted { seq, .. }
            | Self::ActivityCompleted { seq, .. }
            | Self::ActivityFailed { seq, .. }
            | Self::ActivityTimedOut { seq, .. }
            | Self::ActivityCancelled { seq, .. }
            | Self::TimerStarted { seq, .. }
            | Self::TimerFired { seq, .. }
            | Self::TimerCancelled { seq, .. }
            | Self::ChildWorkflowStarted { seq, .. }
            | Self::ChildWorkflowCompleted { seq, .. }
            | Self::ChildWorkflowFailed { seq, .. } => Some(*seq),
            _ => None,
        }
    }

    /// Check if this is a terminal workflow event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::WorkflowCompleted { .. }
                | Self::WorkflowFailed { .. }
                | Self::WorkflowCancelled { .. }
                | Self::WorkflowContinuedAsNew { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_workflow_event_serialization() {
        let event = WorkflowEvent::WorkflowStarted {
            input: json!({"order_id": "123"}),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"workflow_started\""));

        let parsed: WorkflowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn test_activity_event_serialization() {
        let event = WorkflowEvent::ActivityCompleted {
            seq: 0,
            result: json!({"status": "ok"}),
        };

        let json = serde_json::to_string(&event).unwrap();
        let parsed: WorkflowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn test_seq_extraction() {
        let event = WorkflowEvent::ActivityStarted {
            seq: 3,
            attempt: 1,
            worker_id: "worker-1".to_string(),
        };

        assert_eq!(event.seq(), Some(3));

        let start_event = WorkflowEvent::WorkflowStarted { input: json!({}) };
        assert_eq!(start_event.seq(), None);
    }

    #[test]
    fn test_is_terminal() {
        assert!(WorkflowEvent::WorkflowCompleted { result: json!({}) }.is_terminal());
        assert!(WorkflowEvent::WorkflowFailed {
            error: WorkflowError::new("error")
        }
        .is_terminal());
        assert!(WorkflowEvent::WorkflowCancelled {
            reason: "cancelled".to_string()
        }
        .is_terminal());
        assert!(WorkflowEvent::WorkflowContinuedAsNew {
            next_input: json!({})
        }
        .is_terminal());

        assert!(!WorkflowEvent::WorkflowStarted { input: json!({}) }.is_terminal());
        assert!(!WorkflowEvent::ActivityCompleted {
            seq: 0,
            result: json!({})
        }
        .is_terminal());
    }
}

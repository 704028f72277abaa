//! Error taxonomy
//!
//! Every failure a workflow observes is classified into one of these kinds
//! before it decides what status to write. The kind, not the message text,
//! drives retry/escalation behavior.

use serde::{Deserialize, Serialize};

/// The classification of a failure, independent of where it originated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A precondition was violated (no shard, no nodes, incompatible role).
    /// Written as `failed` with a human message; never retried.
    Validation,

    /// Network/timeout/agent-restart class failure. Retried by policy; if
    /// retries are exhausted this becomes `TransientExhausted` in the
    /// recorded status message.
    Transient,

    /// The collaborator returned a structured "this will never succeed"
    /// error. Retry is skipped.
    Permanent,

    /// Per-node errors accumulated during shard convergence. The shard
    /// becomes `failed` with the joined message; the system stays operable
    /// and the next convergence run retries.
    ConvergencePartial,

    /// Replayed history diverged from the current code path. Fatal for the
    /// decision task; the workflow is stuck until the code is fixed.
    NonDeterminism,

    /// Cooperative cancellation. Best-effort `failed` with message
    /// `"cancelled"`.
    Cancellation,
}

/// A classified domain error.
///
/// Distinct from [`hosting_durable::ActivityError`] and
/// [`hosting_durable::WorkflowError`]: those are wire-level error types that
/// cross the activity/workflow boundary. `CoreError` is the vocabulary
/// workflow bodies use internally before mapping a failure to a status
/// write; `From` conversions below translate it to `ActivityError` at
/// activity boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn convergence_partial(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ConvergencePartial,
            message: message.into(),
        }
    }

    pub fn cancellation() -> Self {
        Self {
            kind: ErrorKind::Cancellation,
            message: "cancelled".to_string(),
        }
    }

    /// Whether a transient failure's retry budget is still worth spending.
    /// Permanent and validation errors are never retryable; transient errors
    /// are retryable by definition until the caller's policy exhausts them.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Transient)
    }
}

/// Truncate a joined multi-error message to the limit the shard `failed`
/// status message uses (spec: 4000 chars), so a convergence run with many
/// failing nodes doesn't write an unbounded status_message.
pub fn truncate_joined_message(message: &str, limit: usize) -> String {
    if message.len() <= limit {
        return message.to_string();
    }
    let mut truncated: String = message.chars().take(limit).collect();
    truncated.push_str("...(truncated)");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable() {
        assert!(CoreError::transient("timeout").is_retryable());
        assert!(!CoreError::permanent("bad syntax").is_retryable());
        assert!(!CoreError::validation("no shard").is_retryable());
    }

    #[test]
    fn truncate_respects_limit() {
        let long = "x".repeat(5000);
        let truncated = truncate_joined_message(&long, 4000);
        assert!(truncated.len() <= 4000 + "...(truncated)".len());
        assert!(truncated.starts_with("xxx"));
    }

    #[test]
    fn truncate_is_noop_under_limit() {
        let short = "node unreachable";
        assert_eq!(truncate_joined_message(short, 4000), short);
    }
}

//! What the caller gets back from an invocation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::state::InvocationState;
use crate::policy::PolicyDecision;

/// Result text for a call a human declined.
pub const CANCELLATION_MESSAGE: &str =
    "Operation cancelled: user denied approval. No changes were made.";

/// Why an invocation did not produce a tool result.
///
/// These are ordinary results, not faults: the pipeline returns them to the
/// caller and records them in the audit trail.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterceptError {
    /// A rule or a guard denied the call.
    #[error("{reason}")]
    PolicyDenied { tool: String, reason: String },

    /// The human said no, or the channel failed before answering.
    #[error("{}", CANCELLATION_MESSAGE)]
    ApprovalRejected {
        tool: String,
        /// Channel failure, when that is what caused the rejection.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// No answer within the configured timeout.
    #[error("Operation cancelled: approval for {tool} timed out after {timeout:?}. No changes were made.")]
    ApprovalTimedOut { tool: String, timeout: Duration },

    /// The tool ran and failed, panicked, timed out, or does not exist.
    #[error("Tool {tool} failed: {reason}")]
    ExecutionFailed { tool: String, reason: String },

    /// The tool ran but an after-hook rejected its output.
    #[error("{reason}")]
    OutputBlocked { tool: String, reason: String },
}

impl InterceptError {
    pub fn kind(&self) -> &'static str {
        match self {
            InterceptError::PolicyDenied { .. } => "policy_denied",
            InterceptError::ApprovalRejected { .. } => "approval_rejected",
            InterceptError::ApprovalTimedOut { .. } => "approval_timed_out",
            InterceptError::ExecutionFailed { .. } => "execution_failed",
            InterceptError::OutputBlocked { .. } => "output_blocked",
        }
    }

    pub fn tool(&self) -> &str {
        match self {
            InterceptError::PolicyDenied { tool, .. }
            | InterceptError::ApprovalRejected { tool, .. }
            | InterceptError::ApprovalTimedOut { tool, .. }
            | InterceptError::ExecutionFailed { tool, .. }
            | InterceptError::OutputBlocked { tool, .. } => tool,
        }
    }

    /// Whether the tool's operation ran before the error.
    pub fn tool_ran(&self) -> bool {
        matches!(
            self,
            InterceptError::ExecutionFailed { .. } | InterceptError::OutputBlocked { .. }
        )
    }
}

/// Final result of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The tool ran and its (possibly hook-modified) output was accepted.
    Completed { output: String, duration_ms: u64 },
    /// The tool did not produce a usable result.
    Refused(InterceptError),
}

/// Everything the pipeline knows about one finished invocation.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    pub invocation_id: Uuid,
    pub tool_name: String,
    pub decision: PolicyDecision,
    pub outcome: Outcome,
    /// States visited, from `Received` to `Audited`.
    pub path: Vec<InvocationState>,
}

impl InvocationReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Completed { .. })
    }

    /// The text handed back to the decision-maker.
    pub fn text(&self) -> String {
        match &self.outcome {
            Outcome::Completed { output, .. } => output.clone(),
            Outcome::Refused(err) => err.to_string(),
        }
    }

    pub fn error(&self) -> Option<&InterceptError> {
        match &self.outcome {
            Outcome::Completed { .. } => None,
            Outcome::Refused(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let denied = InterceptError::PolicyDenied {
            tool: "run_sql_query".into(),
            reason: "Query cannot be empty.".into(),
        };
        assert_eq!(denied.to_string(), "Query cannot be empty.");

        let rejected = InterceptError::ApprovalRejected {
            tool: "process_refund".into(),
            detail: Some("channel closed".into()),
        };
        assert_eq!(rejected.to_string(), CANCELLATION_MESSAGE);

        let failed = InterceptError::ExecutionFailed {
            tool: "echo".into(),
            reason: "boom".into(),
        };
        assert_eq!(failed.to_string(), "Tool echo failed: boom");
        assert!(failed.tool_ran());
        assert!(!rejected.tool_ran());
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let refused = Outcome::Refused(InterceptError::PolicyDenied {
            tool: "x".into(),
            reason: "no".into(),
        });
        assert_eq!(
            serde_json::to_value(&refused).unwrap(),
            serde_json::json!({"refused": {"kind": "policy_denied", "tool": "x", "reason": "no"}})
        );

        let back: Outcome = serde_json::from_value(serde_json::to_value(&refused).unwrap()).unwrap();
        assert_eq!(back, refused);
    }
}

//! Core hook types and traits.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::policy::Parameters;

/// Points around a tool invocation where hooks can be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// After the policy allowed a call, before approval and execution.
    BeforeToolCall,
    /// After the tool returned successfully, before the result is reported.
    AfterToolCall,
}

/// Data carried with each hook invocation.
#[derive(Debug, Clone)]
pub enum HookEvent {
    /// A tool call about to be executed.
    ToolCall {
        tool_name: String,
        parameters: Parameters,
        session_id: Uuid,
    },
    /// A tool call that completed with `output`.
    ToolResult {
        tool_name: String,
        parameters: Parameters,
        session_id: Uuid,
        output: String,
    },
}

impl HookEvent {
    /// Returns the [`HookPoint`] this event corresponds to.
    pub fn hook_point(&self) -> HookPoint {
        match self {
            HookEvent::ToolCall { .. } => HookPoint::BeforeToolCall,
            HookEvent::ToolResult { .. } => HookPoint::AfterToolCall,
        }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            HookEvent::ToolCall { tool_name, .. } | HookEvent::ToolResult { tool_name, .. } => {
                tool_name
            }
        }
    }

    pub fn parameters(&self) -> &Parameters {
        match self {
            HookEvent::ToolCall { parameters, .. } | HookEvent::ToolResult { parameters, .. } => {
                parameters
            }
        }
    }

    /// The tool output, for result events.
    pub fn output(&self) -> Option<&str> {
        match self {
            HookEvent::ToolCall { .. } => None,
            HookEvent::ToolResult { output, .. } => Some(output),
        }
    }

    /// Apply a modification string to the event.
    ///
    /// Only result events carry modifiable content. A call's parameters are
    /// fixed once the invocation exists, so modifications to call events
    /// are dropped.
    pub fn apply_modification(&mut self, modified: &str) {
        match self {
            HookEvent::ToolResult { output, .. } => {
                *output = modified.to_string();
            }
            HookEvent::ToolCall { tool_name, .. } => {
                tracing::warn!(
                    tool = %tool_name,
                    "Hook tried to modify tool call parameters, ignoring"
                );
            }
        }
    }
}

/// The result of executing a hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// Continue processing, optionally with modified content.
    Continue {
        /// If `Some`, replace the event's output with this value.
        modified: Option<String>,
    },
    /// Reject the event entirely.
    Reject {
        /// Human-readable reason for the rejection.
        reason: String,
    },
}

impl HookOutcome {
    /// Shorthand for `Continue { modified: None }`.
    pub fn ok() -> Self {
        HookOutcome::Continue { modified: None }
    }

    /// Shorthand for `Continue { modified: Some(value) }`.
    pub fn modify(value: String) -> Self {
        HookOutcome::Continue {
            modified: Some(value),
        }
    }

    /// Shorthand for `Reject { reason }`.
    pub fn reject(reason: impl Into<String>) -> Self {
        HookOutcome::Reject {
            reason: reason.into(),
        }
    }
}

/// How to handle hook execution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookFailureMode {
    /// On error/timeout, continue processing as if the hook returned `ok()`.
    FailOpen,
    /// On error/timeout, reject the event.
    FailClosed,
}

/// Hook execution errors.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Hook execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("Hook timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Hook rejected: {reason}")]
    Rejected { reason: String },
}

/// Trait for implementing tool-call hooks.
#[async_trait]
pub trait Hook: Send + Sync {
    /// A unique name for this hook.
    fn name(&self) -> &str;

    /// The points this hook should be called at.
    fn hook_points(&self) -> &[HookPoint];

    /// How to handle failures in this hook.
    ///
    /// Default: `FailOpen` (continue on error).
    fn failure_mode(&self) -> HookFailureMode {
        HookFailureMode::FailOpen
    }

    /// Maximum time this hook is allowed to run.
    ///
    /// Default: 5 seconds.
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Execute the hook.
    async fn execute(&self, event: &HookEvent) -> Result<HookOutcome, HookError>;
}

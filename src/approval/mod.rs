//! Human approval for invocations the policy table flagged.
//!
//! An [`ApprovalRequest`] exists only while a decision is pending: it is
//! built when the policy says `RequireApproval`, handed to an
//! [`ApprovalChannel`], and dropped once the channel answers.

mod console;
mod fixed;
mod queue;

pub use console::ConsoleApproval;
pub use fixed::StaticApproval;
pub use queue::{ApprovalQueue, PendingApproval, QueuedApproval, approval_queue};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApprovalError;
use crate::policy::ToolInvocation;

/// A pending request for a human decision.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub invocation: ToolInvocation,
    /// Why the policy asked for approval.
    pub reason: String,
    pub requested_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn new(invocation: ToolInvocation, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            invocation,
            reason: reason.into(),
            requested_at: Utc::now(),
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.invocation.tool_name
    }
}

/// Obtains a yes/no answer for an [`ApprovalRequest`].
///
/// `Ok(true)` approves. `Ok(false)` and any error deny. Implementations
/// should call [`log_request`] before they start waiting.
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<bool, ApprovalError>;
}

/// Write the request to the log before blocking on a human.
pub fn log_request(request: &ApprovalRequest) {
    tracing::warn!(
        request_id = %request.id,
        tool = %request.invocation.tool_name,
        params = %request.invocation.parameters,
        reason = %request.reason,
        "Human approval required"
    );
}

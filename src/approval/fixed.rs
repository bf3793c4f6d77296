use async_trait::async_trait;

use crate::approval::{ApprovalChannel, ApprovalRequest, log_request};
use crate::error::ApprovalError;

/// Answers every request the same way. For unattended runs.
#[derive(Debug, Clone, Copy)]
pub struct StaticApproval {
    approve: bool,
}

impl StaticApproval {
    pub fn approve_all() -> Self {
        Self { approve: true }
    }

    pub fn deny_all() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl ApprovalChannel for StaticApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<bool, ApprovalError> {
        log_request(request);
        tracing::info!(
            tool = %request.tool_name(),
            approved = self.approve,
            "Approval answered automatically"
        );
        Ok(self.approve)
    }
}

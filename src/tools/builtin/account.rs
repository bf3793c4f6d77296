//! Account deletion.

use async_trait::async_trait;

use crate::context::SessionContext;
use crate::policy::Parameters;
use crate::tools::tool::{Tool, ToolError, ToolOutput, optional_str, require_str};

/// Permanently removes a user account (simulated).
pub struct DeleteUserAccountTool;

#[async_trait]
impl Tool for DeleteUserAccountTool {
    fn name(&self) -> &str {
        "delete_user_account"
    }

    fn description(&self) -> &str {
        "Delete a user account from the system. Destructive and irreversible."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "ID of the account to delete"
                },
                "reason": {
                    "type": "string",
                    "description": "Why the account is being deleted"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(
        &self,
        params: &Parameters,
        _ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let user_id = require_str(params, "user_id")?;
        if user_id.trim().is_empty() {
            return Err(ToolError::InvalidParameters(
                "'user_id' must not be empty".to_string(),
            ));
        }
        let reason = optional_str(params, "reason").unwrap_or("not given");

        tracing::info!(user_id = %user_id, "Deleting user account");

        Ok(ToolOutput::text(
            format!(
                "Account deleted successfully\n  User ID: {}\n  Reason: {}\n  Status: Account permanently removed",
                user_id, reason
            ),
            start.elapsed(),
        ))
    }
}

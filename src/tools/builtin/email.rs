//! Bulk email.

use async_trait::async_trait;

use crate::context::SessionContext;
use crate::policy::Parameters;
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_f64, require_str};

/// Sends one message to many recipients (simulated).
pub struct SendBulkEmailTool;

#[async_trait]
impl Tool for SendBulkEmailTool {
    fn name(&self) -> &str {
        "send_bulk_email"
    }

    fn description(&self) -> &str {
        "Send a bulk email to multiple recipients."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "recipient_count": {
                    "type": "integer",
                    "description": "Number of recipients"
                },
                "subject": {
                    "type": "string",
                    "description": "Email subject"
                },
                "message": {
                    "type": "string",
                    "description": "Email body"
                }
            },
            "required": ["recipient_count", "subject", "message"]
        })
    }

    async fn execute(
        &self,
        params: &Parameters,
        _ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let count = require_f64(params, "recipient_count")?;
        if count < 1.0 || count.fract() != 0.0 {
            return Err(ToolError::InvalidParameters(format!(
                "'recipient_count' must be a positive whole number, got {}",
                count
            )));
        }
        let subject = require_str(params, "subject")?;
        require_str(params, "message")?;

        tracing::info!(recipients = count as u64, "Sending bulk email");

        Ok(ToolOutput::text(
            format!(
                "Bulk email sent successfully\n  Recipients: {}\n  Subject: {}\n  Status: All emails queued for delivery",
                count as u64, subject
            ),
            start.elapsed(),
        ))
    }
}

//! Order refunds.

use async_trait::async_trait;

use crate::context::SessionContext;
use crate::policy::Parameters;
use crate::tools::tool::{Tool, ToolError, ToolOutput, optional_str, require_f64, require_str};

/// Refunds an order (simulated).
pub struct ProcessRefundTool;

#[async_trait]
impl Tool for ProcessRefundTool {
    fn name(&self) -> &str {
        "process_refund"
    }

    fn description(&self) -> &str {
        "Process a refund for an order. Large refunds need approval."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "order_id": {
                    "type": "string",
                    "description": "Order to refund"
                },
                "amount": {
                    "type": "number",
                    "description": "Refund amount in dollars"
                },
                "reason": {
                    "type": "string",
                    "description": "Reason for the refund"
                }
            },
            "required": ["order_id", "amount"]
        })
    }

    async fn execute(
        &self,
        params: &Parameters,
        _ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let order_id = require_str(params, "order_id")?;
        let amount = require_f64(params, "amount")?;
        if amount <= 0.0 {
            return Err(ToolError::InvalidParameters(format!(
                "refund amount must be positive, got {}",
                amount
            )));
        }
        let reason = optional_str(params, "reason").unwrap_or("not given");

        tracing::info!(order_id = %order_id, amount, "Processing refund");

        Ok(ToolOutput::text(
            format!(
                "Refund processed successfully\n  Order ID: {}\n  Amount: ${:.2}\n  Reason: {}\n  Status: Funds will be returned in 3-5 business days",
                order_id, amount, reason
            ),
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refund_formats_amount() {
        let mut ctx = SessionContext::new();
        let params = Parameters::new()
            .with("order_id", "A-1")
            .with("amount", 50)
            .with("reason", "damaged");
        let out = ProcessRefundTool.execute(&params, &mut ctx).await.unwrap();
        assert!(out.as_text().contains("Amount: $50.00"));
    }

    #[tokio::test]
    async fn test_refund_rejects_non_positive_amount() {
        let mut ctx = SessionContext::new();
        let params = Parameters::new().with("order_id", "A-1").with("amount", 0);
        assert!(ProcessRefundTool.execute(&params, &mut ctx).await.is_err());
    }
}

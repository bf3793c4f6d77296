use async_trait::async_trait;

use crate::audit::{AuditRecord, AuditSink};
use crate::error::AuditError;
use crate::pipeline::Outcome;

/// Emits each record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditRecord) -> Result<(), AuditError> {
        match &entry.outcome {
            Outcome::Completed { duration_ms, .. } => tracing::info!(
                invocation = %entry.invocation_id,
                tool = %entry.tool_name,
                params = %entry.parameters,
                decision = entry.decision.label(),
                duration_ms = *duration_ms,
                "AUDIT: tool executed"
            ),
            Outcome::Refused(err) => tracing::info!(
                invocation = %entry.invocation_id,
                tool = %entry.tool_name,
                params = %entry.parameters,
                decision = entry.decision.label(),
                kind = err.kind(),
                error = %err,
                "AUDIT: tool not executed"
            ),
        }
        Ok(())
    }
}

//! Append-only audit trail of invocations.
//!
//! The pipeline writes exactly one [`AuditRecord`] per invocation, after it
//! reaches a final outcome. Sink failures are logged and never fail the
//! invocation.

mod fanout;
mod jsonl;
mod log;
mod memory;

pub use fanout::FanoutAuditSink;
pub use jsonl::JsonlAuditLog;
pub use log::TracingAuditSink;
pub use memory::MemoryAuditLog;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuditError;
use crate::pipeline::{InvocationReport, Outcome};
use crate::policy::{Parameters, PolicyDecision, ToolInvocation};

/// What happened to one invocation. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub invocation_id: Uuid,
    pub session_id: Uuid,
    pub tool_name: String,
    /// The parameters exactly as the invocation carried them.
    pub parameters: Parameters,
    pub decision: PolicyDecision,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(invocation: &ToolInvocation, report: &InvocationReport) -> Self {
        Self {
            invocation_id: invocation.id,
            session_id: invocation.session_id,
            tool_name: invocation.tool_name.clone(),
            parameters: invocation.parameters.clone(),
            decision: report.decision.clone(),
            outcome: report.outcome.clone(),
            timestamp: Utc::now(),
        }
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        let result = match &self.outcome {
            Outcome::Completed { duration_ms, .. } => format!("completed in {}ms", duration_ms),
            Outcome::Refused(err) => format!("{}: {}", err.kind(), err),
        };
        format!(
            "{} {} [{}] decision={} -> {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.tool_name,
            self.parameters,
            self.decision.label(),
            result
        )
    }
}

/// Destination for audit records.
///
/// Implementations must keep records in the order `record` was called.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditRecord) -> Result<(), AuditError>;
}

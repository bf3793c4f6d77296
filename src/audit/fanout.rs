use std::sync::Arc;

use async_trait::async_trait;

use crate::audit::{AuditRecord, AuditSink};
use crate::error::AuditError;

/// Writes every record to each inner sink in turn.
///
/// A failing sink does not stop the others; the failure count is reported
/// afterwards.
#[derive(Default, Clone)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl AuditSink for FanoutAuditSink {
    async fn record(&self, entry: &AuditRecord) -> Result<(), AuditError> {
        let mut failed = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.record(entry).await {
                tracing::warn!(invocation = %entry.invocation_id, "Audit sink failed: {}", e);
                failed += 1;
            }
        }

        if failed > 0 {
            Err(AuditError::Partial {
                failed,
                total: self.sinks.len(),
            })
        } else {
            Ok(())
        }
    }
}

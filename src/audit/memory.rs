use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::audit::{AuditRecord, AuditSink};
use crate::error::AuditError;

/// Keeps records in memory. Useful in tests and for short sessions.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far, oldest first.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, entry: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().await.push(entry.clone());
        Ok(())
    }
}

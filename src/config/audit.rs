use std::path::PathBuf;

use crate::config::helpers::optional_env;
use crate::error::ConfigError;

/// Audit trail configuration.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    /// JSONL file to append records to. Records always go to the log as well.
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            path: optional_env("TOOLGATE_AUDIT_PATH")?.map(PathBuf::from),
        })
    }
}

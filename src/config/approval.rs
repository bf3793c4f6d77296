use std::time::Duration;

use crate::config::helpers::{parse_bool_env, parse_option_env};
use crate::error::ConfigError;

/// Human-approval configuration.
#[derive(Debug, Clone, Default)]
pub struct ApprovalConfig {
    /// How long to wait for an answer. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Grant every request without asking. Meant for CI and demos.
    pub auto_approve: bool,
}

impl ApprovalConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let timeout = match parse_option_env::<u64>("TOOLGATE_APPROVAL_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "TOOLGATE_APPROVAL_TIMEOUT_SECS".to_string(),
                    message: "must be at least 1 second (unset it to wait indefinitely)"
                        .to_string(),
                });
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Self {
            timeout,
            auto_approve: parse_bool_env("TOOLGATE_AUTO_APPROVE", false)?,
        })
    }
}

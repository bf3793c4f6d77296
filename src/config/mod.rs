//! Configuration for Toolgate.
//!
//! Everything is static: it is read once from environment variables (and a
//! `.env` file, via dotenvy) when the pipeline is built. Variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `TOOLGATE_POLICY_PATH` | built-in rules |
//! | `TOOLGATE_PREDICATE_FAILURE_MODE` | the document's, else `fail_open` |
//! | `TOOLGATE_APPROVAL_TIMEOUT_SECS` | wait indefinitely |
//! | `TOOLGATE_AUTO_APPROVE` | `false` |
//! | `TOOLGATE_AUDIT_PATH` | log only |
//! | `TOOLGATE_GUARDRAILS_ENABLED` | `true` |

mod approval;
mod audit;
mod guardrails;
pub(crate) mod helpers;
mod policy;

pub use approval::ApprovalConfig;
pub use audit::AuditConfig;
pub use guardrails::GuardrailConfig;
pub use policy::PolicyConfig;

use crate::error::ConfigError;

/// Main configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub policy: PolicyConfig,
    pub approval: ApprovalConfig,
    pub audit: AuditConfig,
    pub guardrails: GuardrailConfig,
}

impl Config {
    /// Load configuration from the environment, after loading `./.env`.
    ///
    /// dotenvy never overwrites variables that are already set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::resolve()
    }

    /// Resolve from the current environment only.
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            policy: PolicyConfig::resolve()?,
            approval: ApprovalConfig::resolve()?,
            audit: AuditConfig::resolve()?,
            guardrails: GuardrailConfig::resolve()?,
        })
    }
}

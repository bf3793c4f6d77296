use crate::config::helpers::parse_bool_env;
use crate::error::ConfigError;

/// Guardrail configuration.
#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    /// Register the built-in SQL injection guards.
    pub enabled: bool,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl GuardrailConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: parse_bool_env("TOOLGATE_GUARDRAILS_ENABLED", true)?,
        })
    }
}

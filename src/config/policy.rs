use std::path::PathBuf;

use crate::config::helpers::{optional_env, parse_option_env};
use crate::error::ConfigError;
use crate::policy::defaults::builtin_rules;
use crate::policy::{PolicyDocument, PolicyTable, PredicateFailureMode};

/// Where the policy table comes from.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    /// JSON policy document. `None` means the built-in rules.
    pub path: Option<PathBuf>,
    /// Overrides the document's own failure mode when set.
    pub failure_mode: Option<PredicateFailureMode>,
}

impl PolicyConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            path: optional_env("TOOLGATE_POLICY_PATH")?.map(PathBuf::from),
            failure_mode: parse_option_env("TOOLGATE_PREDICATE_FAILURE_MODE")?,
        })
    }

    /// Load and validate the effective table.
    pub fn load_table(&self) -> Result<PolicyTable, ConfigError> {
        let table = match &self.path {
            Some(path) => {
                let to_config_error = |source| ConfigError::PolicyFile {
                    path: path.display().to_string(),
                    source,
                };
                let table = PolicyDocument::load(path)
                    .and_then(PolicyDocument::into_table)
                    .map_err(to_config_error)?;
                tracing::debug!(path = %path.display(), rules = table.len(), "Loaded policy file");
                table
            }
            None => PolicyTable::new(builtin_rules()).map_err(|source| {
                ConfigError::PolicyFile {
                    path: "<built-in>".to_string(),
                    source,
                }
            })?,
        };

        Ok(match self.failure_mode {
            Some(mode) => table.with_failure_mode(mode),
            None => table,
        })
    }
}

//! Tool trait and types.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::SessionContext;
use crate::policy::{ParamValue, Parameters};

/// Error type for tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The result data.
    pub result: serde_json::Value,
    /// Time taken, as measured by the tool.
    pub duration: Duration,
}

impl ToolOutput {
    /// Create a text output.
    pub fn text(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            result: serde_json::Value::String(text.into()),
            duration,
        }
    }

    /// The result rendered as text. Strings are returned as-is, anything
    /// else as compact JSON.
    pub fn as_text(&self) -> String {
        match &self.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Definition of a tool's parameters using JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// An operation the decision-maker can invoke by name.
///
/// The pipeline calls `execute` at most once per invocation, and only after
/// policy (and, when required, a human) allowed it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with exactly the parameters of the invocation.
    async fn execute(
        &self,
        params: &Parameters,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError>;

    /// Maximum time this tool is allowed to run before the pipeline gives up
    /// on it. Default: 60 seconds.
    fn execution_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Extract a required string parameter.
///
/// Returns `ToolError::InvalidParameters` if the key is missing or not a string.
pub fn require_str<'a>(params: &'a Parameters, name: &str) -> Result<&'a str, ToolError> {
    params
        .get_str(name)
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{}' parameter", name)))
}

/// Extract a required numeric parameter.
pub fn require_f64(params: &Parameters, name: &str) -> Result<f64, ToolError> {
    match params.get(name) {
        Some(ParamValue::Number(n)) => Ok(*n),
        Some(other) => Err(ToolError::InvalidParameters(format!(
            "'{}' must be a number, got {}",
            name,
            other.type_name()
        ))),
        None => Err(ToolError::InvalidParameters(format!(
            "missing '{}' parameter",
            name
        ))),
    }
}

/// Extract an optional string parameter. Non-string values count as absent.
pub fn optional_str<'a>(params: &'a Parameters, name: &str) -> Option<&'a str> {
    params.get_str(name)
}

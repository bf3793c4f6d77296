//! Tool call requests and the invocations built from them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParameterError;
use crate::policy::params::Parameters;

/// A tool call as requested by the decision-maker.
///
/// Deserializes from the usual function-calling shape:
/// `{"name": "process_refund", "arguments": {"amount": 250}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default, alias = "arguments", alias = "args")]
    pub parameters: Parameters,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Build a call from a name and a JSON arguments object.
    pub fn from_json(
        name: impl Into<String>,
        arguments: &serde_json::Value,
    ) -> Result<Self, ParameterError> {
        Ok(Self::new(name, Parameters::from_json(arguments)?))
    }

    /// Parse a JSON line such as `{"name": "...", "arguments": {...}}`.
    pub fn parse_line(line: &str) -> Result<Self, ParameterError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// A requested operation, created right before the tool would run.
///
/// Read-only to policy code: the tool receives exactly these parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: Uuid,
    pub tool_name: String,
    pub parameters: Parameters,
    /// The session context this invocation belongs to.
    pub session_id: Uuid,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, parameters: Parameters, session_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            parameters,
            session_id,
        }
    }

    pub fn from_call(call: ToolCall, session_id: Uuid) -> Self {
        Self::new(call.name, call.parameters, session_id)
    }
}

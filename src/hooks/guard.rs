//! Substring deny-list guards for tool input and output.

use async_trait::async_trait;

use crate::hooks::hook::{Hook, HookError, HookEvent, HookFailureMode, HookOutcome, HookPoint};

/// Signatures of common SQL injection attempts.
pub const SQL_INJECTION_SIGNATURES: &[&str] = &["' OR 1=1", "\" OR 1=1", "--", "; DROP TABLE"];

const SQL_INPUT_REJECTION: &str = "Input blocked: Detected possible SQL injection pattern.";
const SQL_OUTPUT_REJECTION: &str = "Output blocked: Detected possible SQL injection pattern.";

#[derive(Debug, Clone)]
enum GuardTarget {
    /// A string parameter of the call.
    Parameter(String),
    /// The tool's output text.
    Output,
}

/// Rejects calls or results that contain any of a set of patterns.
///
/// Matching ignores case. Tools outside `tools` pass through; an empty tool
/// list guards every tool.
#[derive(Debug, Clone)]
pub struct PatternGuard {
    name: String,
    tools: Vec<String>,
    target: GuardTarget,
    patterns: Vec<String>,
    reason: String,
    points: [HookPoint; 1],
}

impl PatternGuard {
    /// Guard a string parameter before the tool runs.
    pub fn input<S: Into<String>>(
        name: impl Into<String>,
        tools: impl IntoIterator<Item = S>,
        param: impl Into<String>,
        patterns: impl IntoIterator<Item = S>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tools: tools.into_iter().map(Into::into).collect(),
            target: GuardTarget::Parameter(param.into()),
            patterns: lowercase_all(patterns),
            reason: reason.into(),
            points: [HookPoint::BeforeToolCall],
        }
    }

    /// Guard the output text after the tool runs.
    pub fn output<S: Into<String>>(
        name: impl Into<String>,
        tools: impl IntoIterator<Item = S>,
        patterns: impl IntoIterator<Item = S>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tools: tools.into_iter().map(Into::into).collect(),
            target: GuardTarget::Output,
            patterns: lowercase_all(patterns),
            reason: reason.into(),
            points: [HookPoint::AfterToolCall],
        }
    }

    /// Blocks injection signatures in `run_sql_query`'s `user_query`.
    pub fn sql_injection_input() -> Self {
        Self::input(
            "sql-injection-input",
            ["run_sql_query"],
            "user_query",
            SQL_INJECTION_SIGNATURES.iter().copied(),
            SQL_INPUT_REJECTION,
        )
    }

    /// Blocks injection signatures echoed back in `run_sql_query`'s output.
    pub fn sql_injection_output() -> Self {
        Self::output(
            "sql-injection-output",
            ["run_sql_query"],
            SQL_INJECTION_SIGNATURES.iter().copied(),
            SQL_OUTPUT_REJECTION,
        )
    }

    fn applies_to(&self, tool_name: &str) -> bool {
        self.tools.is_empty() || self.tools.iter().any(|t| t == tool_name)
    }

    fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.patterns.iter().any(|p| lowered.contains(p.as_str()))
    }
}

fn lowercase_all<S: Into<String>>(patterns: impl IntoIterator<Item = S>) -> Vec<String> {
    patterns
        .into_iter()
        .map(|p| p.into().to_lowercase())
        .collect()
}

#[async_trait]
impl Hook for PatternGuard {
    fn name(&self) -> &str {
        &self.name
    }

    fn hook_points(&self) -> &[HookPoint] {
        &self.points
    }

    fn failure_mode(&self) -> HookFailureMode {
        HookFailureMode::FailClosed
    }

    async fn execute(&self, event: &HookEvent) -> Result<HookOutcome, HookError> {
        if !self.applies_to(event.tool_name()) {
            return Ok(HookOutcome::ok());
        }

        let text = match &self.target {
            GuardTarget::Parameter(param) => event.parameters().get_str(param),
            GuardTarget::Output => event.output(),
        };

        match text {
            Some(text) if self.matches(text) => {
                tracing::warn!(
                    guard = %self.name,
                    tool = %event.tool_name(),
                    "Guardrail matched"
                );
                Ok(HookOutcome::reject(self.reason.clone()))
            }
            _ => Ok(HookOutcome::ok()),
        }
    }
}

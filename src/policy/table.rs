//! Ordered policy tables and their decisions.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::policy::invocation::ToolInvocation;
use crate::policy::rule::{PolicyRule, RuleOutcome};

/// The result of evaluating an invocation against a [`PolicyTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    Deny { reason: String },
    RequireApproval { reason: String },
}

impl PolicyDecision {
    pub fn deny(reason: impl Into<String>) -> Self {
        PolicyDecision::Deny {
            reason: reason.into(),
        }
    }

    pub fn require_approval(reason: impl Into<String>) -> Self {
        PolicyDecision::RequireApproval {
            reason: reason.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PolicyDecision::Allow => None,
            PolicyDecision::Deny { reason } | PolicyDecision::RequireApproval { reason } => {
                Some(reason)
            }
        }
    }

    /// Short label used in logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            PolicyDecision::Allow => "allow",
            PolicyDecision::Deny { .. } => "deny",
            PolicyDecision::RequireApproval { .. } => "require_approval",
        }
    }
}

impl fmt::Display for PolicyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}: {}", self.label(), reason),
            None => f.write_str(self.label()),
        }
    }
}

/// What happens when a rule's predicate cannot be evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateFailureMode {
    /// Treat the rule as non-matching and keep going.
    #[default]
    FailOpen,
    /// Deny the invocation.
    FailClosed,
}

impl FromStr for PredicateFailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail_open" | "fail-open" | "open" => Ok(PredicateFailureMode::FailOpen),
            "fail_closed" | "fail-closed" | "closed" => Ok(PredicateFailureMode::FailClosed),
            other => Err(format!(
                "unknown failure mode '{}', expected fail_open or fail_closed",
                other
            )),
        }
    }
}

impl fmt::Display for PredicateFailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateFailureMode::FailOpen => f.write_str("fail_open"),
            PredicateFailureMode::FailClosed => f.write_str("fail_closed"),
        }
    }
}

/// An ordered list of rules. First match wins; no match allows.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    rules: Vec<PolicyRule>,
    failure_mode: PredicateFailureMode,
}

impl PolicyTable {
    /// Build a table, validating every rule.
    pub fn new(rules: Vec<PolicyRule>) -> Result<Self, PolicyError> {
        let table = Self {
            rules,
            failure_mode: PredicateFailureMode::default(),
        };
        table.validate()?;
        Ok(table)
    }

    /// A table with no rules. Everything is allowed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_failure_mode(mut self, mode: PredicateFailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn failure_mode(&self) -> PredicateFailureMode {
        self.failure_mode
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn validate(&self) -> Result<(), PolicyError> {
        let mut seen = HashSet::new();

        for (index, rule) in self.rules.iter().enumerate() {
            let invalid = |reason: String| PolicyError::InvalidRule {
                index,
                name: rule.name.clone(),
                reason,
            };

            if rule.name.trim().is_empty() {
                return Err(invalid("rule name must not be empty".to_string()));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(PolicyError::DuplicateRule(rule.name.clone()));
            }
            match &rule.outcome {
                RuleOutcome::Deny { reason } | RuleOutcome::RequireApproval { reason }
                    if reason.trim().is_empty() =>
                {
                    return Err(invalid("reason must not be empty".to_string()));
                }
                _ => {}
            }
            rule.when.validate().map_err(invalid)?;
        }

        Ok(())
    }

    /// Evaluate an invocation.
    ///
    /// Pure with respect to the table: the same invocation always produces
    /// the same decision.
    pub fn evaluate(&self, invocation: &ToolInvocation) -> PolicyDecision {
        for rule in &self.rules {
            if !rule.tool.matches(&invocation.tool_name) {
                continue;
            }

            match rule.when.eval(&invocation.parameters) {
                Ok(true) => {
                    let decision = rule.outcome.decide(invocation);
                    tracing::debug!(
                        tool = %invocation.tool_name,
                        rule = %rule.name,
                        decision = decision.label(),
                        "Policy rule matched"
                    );
                    return decision;
                }
                Ok(false) => {}
                Err(e) => match self.failure_mode {
                    PredicateFailureMode::FailOpen => {
                        tracing::warn!(
                            tool = %invocation.tool_name,
                            rule = %rule.name,
                            error = %e,
                            "Policy rule could not be evaluated, skipping"
                        );
                    }
                    PredicateFailureMode::FailClosed => {
                        tracing::warn!(
                            tool = %invocation.tool_name,
                            rule = %rule.name,
                            error = %e,
                            "Policy rule could not be evaluated, denying"
                        );
                        return PolicyDecision::deny(format!(
                            "Policy rule '{}' could not be evaluated: {}",
                            rule.name, e
                        ));
                    }
                },
            }
        }

        PolicyDecision::Allow
    }
}

/// On-disk form of a policy table.
///
/// ```json
/// {
///   "failure_mode": "fail_closed",
///   "rules": [
///     {
///       "name": "high-value-refund",
///       "tool": "process_refund",
///       "when": {"kind": "greater_than", "param": "amount", "value": 100},
///       "outcome": {"decision": "require_approval", "reason": "High-value refund: ${amount}"}
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub failure_mode: PredicateFailureMode,
    pub rules: Vec<PolicyRule>,
}

impl PolicyDocument {
    pub fn from_json_str(s: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_table(table: &PolicyTable) -> Self {
        Self {
            failure_mode: table.failure_mode(),
            rules: table.rules().to_vec(),
        }
    }

    pub fn into_table(self) -> Result<PolicyTable, PolicyError> {
        Ok(PolicyTable::new(self.rules)?.with_failure_mode(self.failure_mode))
    }
}

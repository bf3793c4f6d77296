//! Policy rules: a tool matcher, a predicate over parameters, and an outcome.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PredicateError;
use crate::policy::invocation::ToolInvocation;
use crate::policy::params::{ParamValue, Parameters};
use crate::policy::table::PolicyDecision;

/// Which tools a rule applies to.
///
/// Serialized as a plain string; `"*"` matches every tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolMatcher {
    #[default]
    Any,
    Named(String),
}

impl ToolMatcher {
    pub fn named(name: impl Into<String>) -> Self {
        ToolMatcher::Named(name.into())
    }

    pub fn matches(&self, tool_name: &str) -> bool {
        match self {
            ToolMatcher::Any => true,
            ToolMatcher::Named(name) => name == tool_name,
        }
    }
}

impl From<String> for ToolMatcher {
    fn from(value: String) -> Self {
        if value == "*" {
            ToolMatcher::Any
        } else {
            ToolMatcher::Named(value)
        }
    }
}

impl From<ToolMatcher> for String {
    fn from(value: ToolMatcher) -> Self {
        match value {
            ToolMatcher::Any => "*".to_string(),
            ToolMatcher::Named(name) => name,
        }
    }
}

type PredicateFn = dyn Fn(&Parameters) -> Result<bool, PredicateError> + Send + Sync;

/// A predicate written in Rust rather than configuration.
#[derive(Clone)]
pub struct CustomPredicate {
    label: String,
    check: Arc<PredicateFn>,
}

impl CustomPredicate {
    pub fn new<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Parameters) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            check: Arc::new(check),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn eval(&self, params: &Parameters) -> Result<bool, PredicateError> {
        // A panicking closure counts as a failed predicate, not a crashed pipeline.
        match catch_unwind(AssertUnwindSafe(|| (self.check)(params))) {
            Ok(result) => result,
            Err(_) => Err(PredicateError::Failed(format!(
                "custom predicate '{}' panicked",
                self.label
            ))),
        }
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A condition over a call's parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every call.
    #[default]
    Always,
    /// Numeric parameter strictly greater than `value`.
    GreaterThan { param: String, value: f64 },
    /// Numeric parameter greater than or equal to `value`.
    AtLeast { param: String, value: f64 },
    /// Numeric parameter strictly less than `value`.
    LessThan { param: String, value: f64 },
    /// Parameter equals `value`. Values of different types are never equal.
    Equals { param: String, value: ParamValue },
    /// String parameter contains any of `patterns`.
    ContainsAny {
        param: String,
        patterns: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Parameter is absent, or a string that is empty after trimming.
    Blank { param: String },
    All { of: Vec<Predicate> },
    Any { of: Vec<Predicate> },
    Not { predicate: Box<Predicate> },
    /// Code-defined predicate. Cannot be written in a policy file.
    #[serde(skip)]
    Custom(CustomPredicate),
}

impl Predicate {
    pub fn greater_than(param: impl Into<String>, value: f64) -> Self {
        Predicate::GreaterThan {
            param: param.into(),
            value,
        }
    }

    pub fn at_least(param: impl Into<String>, value: f64) -> Self {
        Predicate::AtLeast {
            param: param.into(),
            value,
        }
    }

    pub fn less_than(param: impl Into<String>, value: f64) -> Self {
        Predicate::LessThan {
            param: param.into(),
            value,
        }
    }

    pub fn equals(param: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Predicate::Equals {
            param: param.into(),
            value: value.into(),
        }
    }

    pub fn contains_any<I, S>(param: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::ContainsAny {
            param: param.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            case_sensitive: false,
        }
    }

    pub fn blank(param: impl Into<String>) -> Self {
        Predicate::Blank {
            param: param.into(),
        }
    }

    pub fn custom<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Parameters) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        Predicate::Custom(CustomPredicate::new(label, check))
    }

    pub fn negate(self) -> Self {
        Predicate::Not {
            predicate: Box::new(self),
        }
    }

    /// Evaluate against a parameter map.
    ///
    /// Errors (missing parameters, wrong types, failing custom checks) are
    /// returned to the caller, which decides whether they fail open or closed.
    pub fn eval(&self, params: &Parameters) -> Result<bool, PredicateError> {
        match self {
            Predicate::Always => Ok(true),
            Predicate::GreaterThan { param, value } => Ok(number(params, param)? > *value),
            Predicate::AtLeast { param, value } => Ok(number(params, param)? >= *value),
            Predicate::LessThan { param, value } => Ok(number(params, param)? < *value),
            Predicate::Equals { param, value } => Ok(present(params, param)? == value),
            Predicate::ContainsAny {
                param,
                patterns,
                case_sensitive,
            } => {
                let text = string(params, param)?;
                if *case_sensitive {
                    Ok(patterns.iter().any(|p| text.contains(p.as_str())))
                } else {
                    let lowered = text.to_lowercase();
                    Ok(patterns
                        .iter()
                        .any(|p| lowered.contains(&p.to_lowercase())))
                }
            }
            Predicate::Blank { param } => Ok(match params.get(param) {
                None => true,
                Some(ParamValue::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            }),
            Predicate::All { of } => {
                for p in of {
                    if !p.eval(params)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any { of } => {
                for p in of {
                    if p.eval(params)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not { predicate } => Ok(!predicate.eval(params)?),
            Predicate::Custom(custom) => custom.eval(params),
        }
    }

    /// Structural checks run when a table is loaded.
    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            Predicate::Always | Predicate::Custom(_) => Ok(()),
            Predicate::GreaterThan { param, value }
            | Predicate::AtLeast { param, value }
            | Predicate::LessThan { param, value } => {
                require_name(param)?;
                if value.is_finite() {
                    Ok(())
                } else {
                    Err(format!("threshold for '{}' must be finite", param))
                }
            }
            Predicate::Equals { param, .. } | Predicate::Blank { param } => require_name(param),
            Predicate::ContainsAny {
                param, patterns, ..
            } => {
                require_name(param)?;
                if patterns.is_empty() || patterns.iter().any(|p| p.is_empty()) {
                    Err(format!("patterns for '{}' must be non-empty strings", param))
                } else {
                    Ok(())
                }
            }
            Predicate::All { of } | Predicate::Any { of } => {
                if of.is_empty() {
                    return Err("combinator needs at least one predicate".to_string());
                }
                of.iter().try_for_each(Predicate::validate)
            }
            Predicate::Not { predicate } => predicate.validate(),
        }
    }
}

fn require_name(param: &str) -> Result<(), String> {
    if param.trim().is_empty() {
        Err("parameter name must not be empty".to_string())
    } else {
        Ok(())
    }
}

fn present<'a>(params: &'a Parameters, param: &str) -> Result<&'a ParamValue, PredicateError> {
    params
        .get(param)
        .ok_or_else(|| PredicateError::MissingParameter {
            param: param.to_string(),
        })
}

fn number(params: &Parameters, param: &str) -> Result<f64, PredicateError> {
    let value = present(params, param)?;
    value.as_f64().ok_or_else(|| PredicateError::TypeMismatch {
        param: param.to_string(),
        expected: "number",
        found: value.type_name(),
    })
}

fn string<'a>(params: &'a Parameters, param: &str) -> Result<&'a str, PredicateError> {
    let value = present(params, param)?;
    value.as_str().ok_or_else(|| PredicateError::TypeMismatch {
        param: param.to_string(),
        expected: "string",
        found: value.type_name(),
    })
}

/// What a matching rule decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RuleOutcome {
    Allow,
    Deny { reason: String },
    RequireApproval { reason: String },
}

impl RuleOutcome {
    pub fn deny(reason: impl Into<String>) -> Self {
        RuleOutcome::Deny {
            reason: reason.into(),
        }
    }

    pub fn require_approval(reason: impl Into<String>) -> Self {
        RuleOutcome::RequireApproval {
            reason: reason.into(),
        }
    }

    /// Turn the outcome into a decision, filling reason placeholders.
    pub fn decide(&self, invocation: &ToolInvocation) -> PolicyDecision {
        match self {
            RuleOutcome::Allow => PolicyDecision::Allow,
            RuleOutcome::Deny { reason } => PolicyDecision::Deny {
                reason: render_reason(reason, invocation),
            },
            RuleOutcome::RequireApproval { reason } => PolicyDecision::RequireApproval {
                reason: render_reason(reason, invocation),
            },
        }
    }
}

/// One entry of a policy table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    #[serde(default)]
    pub tool: ToolMatcher,
    #[serde(default)]
    pub when: Predicate,
    pub outcome: RuleOutcome,
}

impl PolicyRule {
    /// A rule that applies to one tool on every call.
    pub fn for_tool(
        name: impl Into<String>,
        tool: impl Into<String>,
        outcome: RuleOutcome,
    ) -> Self {
        Self {
            name: name.into(),
            tool: ToolMatcher::named(tool),
            when: Predicate::Always,
            outcome,
        }
    }

    /// A rule that applies to every tool on every call.
    pub fn for_any_tool(name: impl Into<String>, outcome: RuleOutcome) -> Self {
        Self {
            name: name.into(),
            tool: ToolMatcher::Any,
            when: Predicate::Always,
            outcome,
        }
    }

    /// Restrict the rule to calls matching `predicate`.
    pub fn when(mut self, predicate: Predicate) -> Self {
        self.when = predicate;
        self
    }
}

/// Replace `{tool}` and `{<param>}` placeholders in a reason template.
///
/// Unknown placeholders are left untouched.
pub(crate) fn render_reason(template: &str, invocation: &ToolInvocation) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        if key == "tool" {
            out.push_str(&invocation.tool_name);
        } else if let Some(value) = invocation.parameters.get(key) {
            out.push_str(&value.to_string());
        } else {
            out.push('{');
            out.push_str(key);
            out.push('}');
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn params() -> Parameters {
        Parameters::new()
            .with("amount", 250)
            .with("query", "SELECT * FROM users WHERE id = '1' OR 1=1")
            .with("flag", true)
    }

    #[test]
    fn test_numeric_comparisons() {
        let p = params();
        assert!(Predicate::greater_than("amount", 100.0).eval(&p).unwrap());
        assert!(!Predicate::greater_than("amount", 250.0).eval(&p).unwrap());
        assert!(Predicate::at_least("amount", 250.0).eval(&p).unwrap());
        assert!(Predicate::less_than("amount", 251.0).eval(&p).unwrap());
    }

    #[test]
    fn test_numeric_comparison_errors() {
        let p = params();
        assert_eq!(
            Predicate::greater_than("missing", 1.0).eval(&p),
            Err(PredicateError::MissingParameter {
                param: "missing".into()
            })
        );
        assert!(matches!(
            Predicate::greater_than("query", 1.0).eval(&p),
            Err(PredicateError::TypeMismatch {
                expected: "number",
                found: "string",
                ..
            })
        ));
    }

    #[test]
    fn test_equals_across_types_is_false() {
        let p = params();
        assert!(Predicate::equals("flag", true).eval(&p).unwrap());
        assert!(!Predicate::equals("flag", "true").eval(&p).unwrap());
        assert!(Predicate::equals("amount", 250).eval(&p).unwrap());
    }

    #[test]
    fn test_contains_any_is_case_insensitive_by_default() {
        let p = params();
        assert!(
            Predicate::contains_any("query", ["' or 1=1"])
                .eval(&p)
                .unwrap()
        );

        let strict = Predicate::ContainsAny {
            param: "query".into(),
            patterns: vec!["' or 1=1".into()],
            case_sensitive: true,
        };
        assert!(!strict.eval(&p).unwrap());
    }

    #[test]
    fn test_blank() {
        let p = Parameters::new().with("empty", "   ").with("n", 0);
        assert!(Predicate::blank("empty").eval(&p).unwrap());
        assert!(Predicate::blank("absent").eval(&p).unwrap());
        assert!(!Predicate::blank("n").eval(&p).unwrap());
    }

    #[test]
    fn test_combinators() {
        let p = params();
        let both = Predicate::All {
            of: vec![
                Predicate::greater_than("amount", 100.0),
                Predicate::equals("flag", true),
            ],
        };
        assert!(both.eval(&p).unwrap());

        let either = Predicate::Any {
            of: vec![
                Predicate::greater_than("amount", 1000.0),
                Predicate::equals("flag", true),
            ],
        };
        assert!(either.eval(&p).unwrap());
        assert!(!either.negate().eval(&p).unwrap());
    }

    #[test]
    fn test_custom_predicate_panic_becomes_error() {
        let p = Predicate::custom("explodes", |_| panic!("boom"));
        let err = p.eval(&Parameters::new()).unwrap_err();
        assert!(err.to_string().contains("explodes"));
    }

    #[test]
    fn test_render_reason() {
        let inv = ToolInvocation::new(
            "process_refund",
            Parameters::new().with("amount", 250),
            Uuid::new_v4(),
        );
        assert_eq!(
            render_reason("{tool}: ${amount} over {limit}", &inv),
            "process_refund: $250 over {limit}"
        );
        assert_eq!(render_reason("unclosed {amount", &inv), "unclosed {amount");
    }

    #[test]
    fn test_rule_deserializes_from_json() {
        let rule: PolicyRule = serde_json::from_value(serde_json::json!({
            "name": "high-value-refund",
            "tool": "process_refund",
            "when": {"kind": "greater_than", "param": "amount", "value": 100},
            "outcome": {"decision": "require_approval", "reason": "High-value refund"}
        }))
        .unwrap();

        assert_eq!(rule.tool, ToolMatcher::named("process_refund"));
        assert!(matches!(rule.when, Predicate::GreaterThan { .. }));
        assert_eq!(
            rule.outcome,
            RuleOutcome::require_approval("High-value refund")
        );
    }

    #[test]
    fn test_rule_defaults_to_any_tool_always() {
        let rule: PolicyRule = serde_json::from_value(serde_json::json!({
            "name": "lockdown",
            "outcome": {"decision": "deny", "reason": "maintenance window"}
        }))
        .unwrap();
        assert_eq!(rule.tool, ToolMatcher::Any);
        assert!(matches!(rule.when, Predicate::Always));
    }

    #[test]
    fn test_validate_rejects_empty_combinator() {
        let p = Predicate::All { of: vec![] };
        assert!(p.validate().is_err());
        assert!(Predicate::contains_any("q", [""]).validate().is_err());
        assert!(Predicate::greater_than("", 1.0).validate().is_err());
    }
}

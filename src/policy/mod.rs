//! Policy evaluation for tool invocations.
//!
//! A [`PolicyTable`] is an ordered list of [`PolicyRule`]s. Each rule pairs a
//! tool matcher and a [`Predicate`] over the call's parameters with an
//! outcome. Rules are checked in declaration order; the first match decides.
//! An invocation no rule matches is allowed.

pub mod defaults;
mod invocation;
mod params;
mod rule;
mod table;

pub use invocation::{ToolCall, ToolInvocation};
pub use params::{ParamValue, Parameters};
pub use rule::{CustomPredicate, PolicyRule, Predicate, RuleOutcome, ToolMatcher};
pub use table::{PolicyDecision, PolicyDocument, PolicyTable, PredicateFailureMode};

//! Built-in rules for the bundled demo tools.

use crate::policy::rule::{PolicyRule, Predicate, RuleOutcome};
use crate::policy::table::PolicyTable;

pub const REFUND_APPROVAL_THRESHOLD: f64 = 100.0;
pub const BULK_EMAIL_APPROVAL_THRESHOLD: f64 = 10.0;

/// The rule list used when no policy file is configured.
pub fn builtin_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::for_tool(
            "critical-account-deletion",
            "delete_user_account",
            RuleOutcome::require_approval("CRITICAL OPERATION: {tool}"),
        ),
        PolicyRule::for_tool(
            "critical-schema-change",
            "update_database_schema",
            RuleOutcome::require_approval("CRITICAL OPERATION: {tool}"),
        ),
        PolicyRule::for_tool(
            "high-value-refund",
            "process_refund",
            RuleOutcome::require_approval("High-value refund: ${amount} (threshold: $100)"),
        )
        .when(Predicate::greater_than("amount", REFUND_APPROVAL_THRESHOLD)),
        PolicyRule::for_tool(
            "bulk-email",
            "send_bulk_email",
            RuleOutcome::require_approval(
                "Bulk email to {recipient_count} recipients (threshold: 10)",
            ),
        )
        .when(Predicate::greater_than(
            "recipient_count",
            BULK_EMAIL_APPROVAL_THRESHOLD,
        )),
        PolicyRule::for_tool(
            "empty-query",
            "run_sql_query",
            RuleOutcome::deny("Query cannot be empty."),
        )
        .when(Predicate::blank("user_query")),
    ]
}

/// [`builtin_rules`] as a table.
pub fn builtin_table() -> PolicyTable {
    // The built-in rules have unique names and non-empty reasons.
    PolicyTable::new(builtin_rules()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Built-in policy rules failed validation");
        PolicyTable::empty()
    })
}

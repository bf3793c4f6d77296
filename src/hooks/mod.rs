//! Hooks around tool execution.
//!
//! Two interception points:
//!
//! - **BeforeToolCall** runs after the policy table allowed (or asked
//!   approval for) a call and before anything executes. A rejection here
//!   denies the call.
//! - **AfterToolCall** runs on a successful tool result. Hooks may rewrite
//!   the output or reject it.
//!
//! Hooks are executed in priority order (lower number = higher priority).

pub mod guard;
pub mod hook;
pub mod registry;

pub use guard::{PatternGuard, SQL_INJECTION_SIGNATURES};
pub use hook::{Hook, HookError, HookEvent, HookFailureMode, HookOutcome, HookPoint};
pub use registry::HookRegistry;

use std::sync::Arc;

/// Register the built-in SQL injection guards.
pub async fn register_builtin_guards(registry: &HookRegistry) {
    registry
        .register_with_priority(Arc::new(PatternGuard::sql_injection_input()), 10)
        .await;
    registry
        .register_with_priority(Arc::new(PatternGuard::sql_injection_output()), 10)
        .await;
}

//! Toolgate - tool-call interception for LLM agents.
//!
//! A model (or any other decision-maker) asks for a named, parameterized
//! operation to run. Toolgate sits between that request and the operation:
//! it checks a policy table, runs guardrail hooks, asks a human when the
//! policy says so, executes the tool, screens its output, and writes one
//! audit record per request.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                    Decision-maker (model, script, CLI)                 │
//! └───────────────────────────────────┬───────────────────────────────────┘
//!                                     │ ToolCall { name, parameters }
//!                                     ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                               Pipeline                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐                │
//! │  │ Policy Table │──▶│ Before hooks │──▶│   Approval   │──┐             │
//! │  └──────────────┘   └──────────────┘   │   Channel    │  │             │
//! │                                        └──────────────┘  ▼             │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐        │
//! │  │  Audit Sink  │◀──│ After hooks  │◀──│ Tool (SessionContext)│        │
//! │  └──────────────┘   └──────────────┘   └──────────────────────┘        │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Ordered policy rules** - first match wins, unmatched calls are allowed
//! - **Human-in-the-loop** - console, queue-backed, or fixed approval channels
//! - **Guardrails** - deny-list hooks before and after tool execution
//! - **Audit trail** - exactly one record per invocation, whatever happened
//! - **Context passing** - a caller-owned session context, no global state

pub mod approval;
pub mod audit;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod policy;
pub mod testing;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::approval::{ApprovalChannel, ApprovalRequest};
    pub use crate::audit::{AuditRecord, AuditSink};
    pub use crate::context::SessionContext;
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{InterceptError, InvocationReport, Outcome, Pipeline};
    pub use crate::policy::{
        ParamValue, Parameters, PolicyDecision, PolicyRule, PolicyTable, ToolCall, ToolInvocation,
    };
    pub use crate::tools::{Tool, ToolError, ToolOutput, ToolRegistry};
}

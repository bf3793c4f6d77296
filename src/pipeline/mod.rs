//! The interception pipeline.
//!
//! ```text
//! Received → PolicyChecked → AutoAllowed ──────────────→ Executed → Audited
//!                          → AwaitingApproval → (yes) → Executed → Audited
//!                                             → (no)  → Cancelled → Audited
//!                          → AutoDenied ────────────────────────→ Audited
//! ```
//!
//! Every path ends in exactly one audit record. Nothing here returns an
//! error to the caller: refusals and tool failures come back as an
//! [`Outcome::Refused`] inside the [`InvocationReport`].

mod outcome;
mod state;

pub use outcome::{CANCELLATION_MESSAGE, InterceptError, InvocationReport, Outcome};
pub use state::{InvocationState, InvocationTrace, StateTransition};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Mutex;

use crate::approval::{ApprovalChannel, ApprovalRequest, StaticApproval};
use crate::audit::{AuditRecord, AuditSink, FanoutAuditSink, JsonlAuditLog, TracingAuditSink};
use crate::config::Config;
use crate::context::SessionContext;
use crate::error::Error;
use crate::hooks::{HookError, HookEvent, HookOutcome, HookRegistry, register_builtin_guards};
use crate::policy::{PolicyDecision, PolicyTable, ToolCall, ToolInvocation};
use crate::tools::ToolRegistry;

/// Coordinates policy, hooks, approval, execution, and audit for tool calls.
///
/// Built once with static configuration and shared between sessions. Each
/// call takes the caller's own [`SessionContext`].
pub struct Pipeline {
    policy: Arc<PolicyTable>,
    tools: Arc<ToolRegistry>,
    hooks: Arc<HookRegistry>,
    approval: Arc<dyn ApprovalChannel>,
    audit: Arc<dyn AuditSink>,
    approval_timeout: Option<Duration>,
    // A single approval prompt is pending at a time.
    approval_gate: Mutex<()>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Assemble a pipeline from resolved configuration.
    ///
    /// The policy table comes from the configured file or the built-in
    /// rules. Audit records always go to the log, and to a JSONL file when a
    /// path is configured. `approval` is replaced by an approve-all channel
    /// when auto-approval is on.
    pub async fn from_config(
        config: &Config,
        tools: Arc<ToolRegistry>,
        approval: Arc<dyn ApprovalChannel>,
    ) -> Result<Self, Error> {
        let policy = config.policy.load_table()?;

        let hooks = HookRegistry::new();
        if config.guardrails.enabled {
            register_builtin_guards(&hooks).await;
        }

        let mut audit = FanoutAuditSink::new().with(Arc::new(TracingAuditSink));
        if let Some(path) = &config.audit.path {
            audit = audit.with(Arc::new(JsonlAuditLog::open(path.clone()).await?));
        }

        let approval = if config.approval.auto_approve {
            tracing::warn!("Auto-approval is enabled: every approval request will be granted");
            Arc::new(StaticApproval::approve_all()) as Arc<dyn ApprovalChannel>
        } else {
            approval
        };

        Ok(Self::builder()
            .policy(policy)
            .tools(tools)
            .hooks(Arc::new(hooks))
            .approval(approval)
            .audit(Arc::new(audit))
            .approval_timeout(config.approval.timeout)
            .build())
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn approval_timeout(&self) -> Option<Duration> {
        self.approval_timeout
    }

    /// The decision an invocation would get, without asking anyone or
    /// running anything.
    pub async fn check(&self, invocation: &ToolInvocation) -> PolicyDecision {
        self.decide(invocation).await
    }

    /// Run one tool call through the pipeline.
    pub async fn invoke(&self, ctx: &mut SessionContext, call: ToolCall) -> InvocationReport {
        ctx.record_invocation();
        let invocation = ToolInvocation::from_call(call, ctx.session_id());
        let mut trace = InvocationTrace::new();

        tracing::debug!(
            invocation = %invocation.id,
            tool = %invocation.tool_name,
            params = %invocation.parameters,
            "Tool call received"
        );

        let decision = self.decide(&invocation).await;
        trace.advance(InvocationState::PolicyChecked);

        let outcome = match &decision {
            PolicyDecision::Deny { reason } => {
                trace.advance(InvocationState::AutoDenied);
                tracing::info!(tool = %invocation.tool_name, reason = %reason, "Tool call denied");
                Outcome::Refused(InterceptError::PolicyDenied {
                    tool: invocation.tool_name.clone(),
                    reason: reason.clone(),
                })
            }
            PolicyDecision::RequireApproval { reason } => {
                trace.advance(InvocationState::AwaitingApproval);
                match self.await_approval(&invocation, reason).await {
                    Ok(()) => self.execute(&invocation, ctx, &mut trace).await,
                    Err(refusal) => {
                        trace.advance(InvocationState::Cancelled);
                        Outcome::Refused(refusal)
                    }
                }
            }
            PolicyDecision::Allow => {
                trace.advance(InvocationState::AutoAllowed);
                self.execute(&invocation, ctx, &mut trace).await
            }
        };

        let mut report = InvocationReport {
            invocation_id: invocation.id,
            tool_name: invocation.tool_name.clone(),
            decision,
            outcome,
            path: Vec::new(),
        };

        let record = AuditRecord::new(&invocation, &report);
        if let Err(e) = self.audit.record(&record).await {
            tracing::warn!(
                invocation = %invocation.id,
                tool = %invocation.tool_name,
                "Failed to write audit record: {}",
                e
            );
        }
        trace.advance(InvocationState::Audited);
        report.path = trace.path();

        report
    }

    /// Policy table, then before-hooks. A deny from the table skips the hooks.
    async fn decide(&self, invocation: &ToolInvocation) -> PolicyDecision {
        let decision = self.policy.evaluate(invocation);
        if matches!(decision, PolicyDecision::Deny { .. }) {
            return decision;
        }

        let event = HookEvent::ToolCall {
            tool_name: invocation.tool_name.clone(),
            parameters: invocation.parameters.clone(),
            session_id: invocation.session_id,
        };

        match self.hooks.run(&event).await {
            Ok(_) => decision,
            Err(HookError::Rejected { reason }) => PolicyDecision::Deny { reason },
            Err(e) => PolicyDecision::deny(format!("Tool call blocked by hook policy: {}", e)),
        }
    }

    async fn await_approval(
        &self,
        invocation: &ToolInvocation,
        reason: &str,
    ) -> Result<(), InterceptError> {
        let request = ApprovalRequest::new(invocation.clone(), reason);
        let tool = invocation.tool_name.clone();

        // The timeout also covers waiting behind another session's prompt.
        let ask = async {
            let _gate = self.approval_gate.lock().await;
            self.approval.request_approval(&request).await
        };

        let answer = match self.approval_timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, ask).await {
                    Ok(answer) => answer,
                    Err(_) => {
                        tracing::warn!(tool = %tool, "Approval timed out after {:?}", timeout);
                        return Err(InterceptError::ApprovalTimedOut { tool, timeout });
                    }
                }
            }
            None => ask.await,
        };

        match answer {
            Ok(true) => {
                tracing::info!(tool = %tool, request_id = %request.id, "Approval granted");
                Ok(())
            }
            Ok(false) => {
                tracing::info!(tool = %tool, request_id = %request.id, "Approval denied");
                Err(InterceptError::ApprovalRejected { tool, detail: None })
            }
            Err(e) => {
                tracing::warn!(tool = %tool, "Approval channel failed, treating as denied: {}", e);
                Err(InterceptError::ApprovalRejected {
                    tool,
                    detail: Some(e.to_string()),
                })
            }
        }
    }

    async fn execute(
        &self,
        invocation: &ToolInvocation,
        ctx: &mut SessionContext,
        trace: &mut InvocationTrace,
    ) -> Outcome {
        trace.advance(InvocationState::Executed);
        let tool_name = invocation.tool_name.clone();
        let failed = |reason: String| {
            tracing::warn!(tool = %tool_name, "Tool execution failed: {}", reason);
            Outcome::Refused(InterceptError::ExecutionFailed {
                tool: tool_name.clone(),
                reason,
            })
        };

        let Some(tool) = self.tools.get(&invocation.tool_name).await else {
            return failed("tool not found".to_string());
        };

        let start = Instant::now();
        let timeout = tool.execution_timeout();
        let result = tokio::time::timeout(
            timeout,
            AssertUnwindSafe(tool.execute(&invocation.parameters, ctx)).catch_unwind(),
        )
        .await;

        let output = match result {
            Ok(Ok(Ok(output))) => output.as_text(),
            Ok(Ok(Err(e))) => return failed(e.to_string()),
            Ok(Err(panic)) => return failed(format!("tool panicked: {}", panic_message(&*panic))),
            Err(_) => return failed(format!("timed out after {:?}", timeout)),
        };

        let event = HookEvent::ToolResult {
            tool_name: invocation.tool_name.clone(),
            parameters: invocation.parameters.clone(),
            session_id: invocation.session_id,
            output: output.clone(),
        };
        let screened = self.hooks.run(&event).await;

        let output = match screened {
            Ok(HookOutcome::Continue {
                modified: Some(modified),
            }) => modified,
            Ok(_) => output,
            Err(HookError::Rejected { reason }) => {
                tracing::warn!(tool = %tool_name, reason = %reason, "Tool output blocked");
                return Outcome::Refused(InterceptError::OutputBlocked {
                    tool: tool_name.clone(),
                    reason,
                });
            }
            Err(e) => {
                return Outcome::Refused(InterceptError::OutputBlocked {
                    tool: tool_name.clone(),
                    reason: format!("Tool output blocked by hook policy: {}", e),
                });
            }
        };

        Outcome::Completed {
            output,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for [`Pipeline`].
///
/// Defaults: no rules (everything allowed), no tools, no hooks, a channel
/// that denies every approval, and audit records written to the log.
pub struct PipelineBuilder {
    policy: PolicyTable,
    tools: Arc<ToolRegistry>,
    hooks: Arc<HookRegistry>,
    approval: Arc<dyn ApprovalChannel>,
    audit: Arc<dyn AuditSink>,
    approval_timeout: Option<Duration>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            policy: PolicyTable::empty(),
            tools: Arc::new(ToolRegistry::new()),
            hooks: Arc::new(HookRegistry::new()),
            approval: Arc::new(StaticApproval::deny_all()),
            audit: Arc::new(TracingAuditSink),
            approval_timeout: None,
        }
    }
}

impl PipelineBuilder {
    pub fn policy(mut self, policy: PolicyTable) -> Self {
        self.policy = policy;
        self
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn approval(mut self, approval: Arc<dyn ApprovalChannel>) -> Self {
        self.approval = approval;
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn approval_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.approval_timeout = timeout;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            policy: Arc::new(self.policy),
            tools: self.tools,
            hooks: self.hooks,
            approval: self.approval,
            audit: self.audit,
            approval_timeout: self.approval_timeout,
            approval_gate: Mutex::new(()),
        }
    }
}

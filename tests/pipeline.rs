//! End-to-end tests for the interception pipeline.
//!
//! Each test builds a pipeline from public parts only: a policy table, a
//! tool registry, an approval channel, and one or more audit sinks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use toolgate::approval::{StaticApproval, approval_queue};
use toolgate::audit::{AuditRecord, AuditSink, FanoutAuditSink, JsonlAuditLog, MemoryAuditLog};
use toolgate::context::SessionContext;
use toolgate::error::AuditError;
use toolgate::hooks::{
    Hook, HookError, HookEvent, HookFailureMode, HookOutcome, HookPoint, HookRegistry,
    register_builtin_guards,
};
use toolgate::pipeline::{CANCELLATION_MESSAGE, InterceptError, InvocationState, Outcome, Pipeline};
use toolgate::policy::defaults::builtin_table;
use toolgate::policy::{
    Parameters, PolicyDecision, PolicyRule, PolicyTable, Predicate, RuleOutcome, ToolCall,
    ToolInvocation,
};
use toolgate::testing::{RecordingTool, ScriptedApproval};
use toolgate::tools::ToolRegistry;

fn refund_policy() -> PolicyTable {
    PolicyTable::new(vec![
        PolicyRule::for_tool(
            "high-value-refund",
            "refund",
            RuleOutcome::require_approval("High-value refund: ${amount} (threshold: $100)"),
        )
        .when(Predicate::greater_than("amount", 100.0)),
    ])
    .unwrap()
}

async fn registry_with(tools: &[Arc<RecordingTool>]) -> Arc<ToolRegistry> {
    let registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool.clone()).await;
    }
    Arc::new(registry)
}

fn refund_call(amount: f64) -> ToolCall {
    ToolCall::new("refund", Parameters::new().with("amount", amount))
}

#[tokio::test]
async fn test_approved_critical_call_runs_once() {
    let delete = Arc::new(RecordingTool::new("delete_account"));
    let approval = Arc::new(ScriptedApproval::new([true]));
    let audit = Arc::new(MemoryAuditLog::new());

    let policy = PolicyTable::new(vec![PolicyRule::for_tool(
        "critical",
        "delete_account",
        RuleOutcome::require_approval("CRITICAL OPERATION: {tool}"),
    )])
    .unwrap();

    let pipeline = Pipeline::builder()
        .policy(policy)
        .tools(registry_with(&[delete.clone()]).await)
        .approval(approval.clone())
        .audit(audit.clone())
        .build();

    let mut ctx = SessionContext::new();
    let call = ToolCall::new(
        "delete_account",
        Parameters::new().with("user_id", "12345"),
    );
    let report = pipeline.invoke(&mut ctx, call).await;

    assert!(report.is_success());
    assert_eq!(delete.calls(), 1);
    assert_eq!(approval.requests(), 1);
    assert_eq!(approval.seen()[0].reason, "CRITICAL OPERATION: delete_account");

    let records = audit.records().await;
    assert_eq!(records.len(), 1);
    assert!(matches!(
        records[0].decision,
        PolicyDecision::RequireApproval { .. }
    ));
    assert!(matches!(records[0].outcome, Outcome::Completed { .. }));
    assert_eq!(records[0].parameters.get_str("user_id"), Some("12345"));
}

#[tokio::test]
async fn test_declined_refund_never_runs() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let audit = Arc::new(MemoryAuditLog::new());

    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .approval(Arc::new(ScriptedApproval::new([false])))
        .audit(audit.clone())
        .build();

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(250.0)).await;

    assert_eq!(refund.calls(), 0);
    assert_eq!(report.text(), CANCELLATION_MESSAGE);
    assert_eq!(
        report.decision,
        PolicyDecision::require_approval("High-value refund: $250 (threshold: $100)")
    );
    assert_eq!(
        report.path,
        vec![
            InvocationState::Received,
            InvocationState::PolicyChecked,
            InvocationState::AwaitingApproval,
            InvocationState::Cancelled,
            InvocationState::Audited,
        ]
    );

    let records = audit.records().await;
    assert_eq!(records.len(), 1);
    assert!(matches!(
        records[0].outcome,
        Outcome::Refused(InterceptError::ApprovalRejected { detail: None, .. })
    ));
}

#[tokio::test]
async fn test_small_refund_is_allowed_without_asking() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let approval = Arc::new(ScriptedApproval::new([]));
    let audit = Arc::new(MemoryAuditLog::new());

    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .approval(approval.clone())
        .audit(audit.clone())
        .build();

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(50.0)).await;

    assert_eq!(report.decision, PolicyDecision::Allow);
    assert!(report.is_success());
    assert_eq!(refund.calls(), 1);
    assert_eq!(approval.requests(), 0);
    assert_eq!(
        refund.last_params().and_then(|p| p.get_f64("amount")),
        Some(50.0)
    );
    assert_eq!(
        report.path,
        vec![
            InvocationState::Received,
            InvocationState::PolicyChecked,
            InvocationState::AutoAllowed,
            InvocationState::Executed,
            InvocationState::Audited,
        ]
    );
    assert_eq!(audit.len().await, 1);
}

#[tokio::test]
async fn test_tool_failure_is_reported_and_audited() {
    let refund = Arc::new(RecordingTool::failing("refund", "payment gateway unavailable"));
    let audit = Arc::new(MemoryAuditLog::new());

    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .audit(audit.clone())
        .build();

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(20.0)).await;

    assert_eq!(refund.calls(), 1);
    let Some(InterceptError::ExecutionFailed { tool, reason }) = report.error() else {
        panic!("expected an execution failure, got {:?}", report.outcome);
    };
    assert_eq!(tool, "refund");
    assert!(reason.contains("payment gateway unavailable"));

    // The pipeline is still usable afterwards.
    let again = pipeline.invoke(&mut ctx, refund_call(30.0)).await;
    assert!(again.error().is_some());

    let records = audit.records().await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.decision.is_allow()));
    assert_eq!(ctx.invocation_count(), 2);
}

#[tokio::test]
async fn test_decisions_are_deterministic() {
    let pipeline = Pipeline::builder().policy(builtin_table()).build();
    let session = SessionContext::new().session_id();

    let cases = [
        ("process_refund", Parameters::new().with("amount", 500)),
        ("process_refund", Parameters::new().with("amount", 5)),
        ("delete_user_account", Parameters::new().with("user_id", "u1")),
        ("run_sql_query", Parameters::new().with("user_query", "  ")),
        ("send_bulk_email", Parameters::new().with("recipient_count", 11)),
    ];

    for (tool, params) in cases {
        let invocation = ToolInvocation::new(tool, params, session);
        let first = pipeline.check(&invocation).await;
        for _ in 0..5 {
            assert_eq!(pipeline.check(&invocation).await, first);
        }
    }
}

#[tokio::test]
async fn test_check_does_not_run_or_audit() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let approval = Arc::new(ScriptedApproval::new([true]));
    let audit = Arc::new(MemoryAuditLog::new());

    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .approval(approval.clone())
        .audit(audit.clone())
        .build();

    let invocation = ToolInvocation::new(
        "refund",
        Parameters::new().with("amount", 900),
        SessionContext::new().session_id(),
    );
    let decision = pipeline.check(&invocation).await;

    assert!(matches!(decision, PolicyDecision::RequireApproval { .. }));
    assert_eq!(refund.calls(), 0);
    assert_eq!(approval.requests(), 0);
    assert!(audit.is_empty().await);
}

#[tokio::test]
async fn test_queue_channel_answers_from_another_task() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let (channel, queue) = approval_queue(4);

    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .approval(Arc::new(channel))
        .build();

    let responder = tokio::spawn(async move {
        let mut reasons = Vec::new();
        for approve in [true, false] {
            let Some(pending) = queue.next().await else {
                break;
            };
            reasons.push(pending.request.reason.clone());
            pending.respond(approve);
        }
        reasons
    });

    let mut ctx = SessionContext::new();
    let first = pipeline.invoke(&mut ctx, refund_call(150.0)).await;
    let second = pipeline.invoke(&mut ctx, refund_call(175.0)).await;

    assert!(first.is_success());
    assert_eq!(second.text(), CANCELLATION_MESSAGE);
    assert_eq!(refund.calls(), 1);

    let reasons = responder.await.unwrap();
    assert_eq!(
        reasons,
        vec![
            "High-value refund: $150 (threshold: $100)".to_string(),
            "High-value refund: $175 (threshold: $100)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_dropped_queue_denies() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let (channel, queue) = approval_queue(1);

    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .approval(Arc::new(channel))
        .build();

    tokio::spawn(async move {
        // Take the request and drop it unanswered.
        let _ = queue.next().await;
    });

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(400.0)).await;

    assert_eq!(refund.calls(), 0);
    assert!(matches!(
        report.error(),
        Some(InterceptError::ApprovalRejected {
            detail: Some(_),
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_slow_approval_times_out() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let audit = Arc::new(MemoryAuditLog::new());

    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .approval(Arc::new(
            ScriptedApproval::new([true]).with_delay(Duration::from_secs(120)),
        ))
        .approval_timeout(Some(Duration::from_secs(30)))
        .audit(audit.clone())
        .build();

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(1000.0)).await;

    assert_eq!(refund.calls(), 0);
    assert_eq!(
        report.error(),
        Some(&InterceptError::ApprovalTimedOut {
            tool: "refund".to_string(),
            timeout: Duration::from_secs(30),
        })
    );
    assert_eq!(audit.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_covers_waiting_behind_another_prompt() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let audit = Arc::new(MemoryAuditLog::new());

    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .approval(Arc::new(
            ScriptedApproval::new([true, true]).with_delay(Duration::from_secs(20)),
        ))
        .approval_timeout(Some(Duration::from_secs(30)))
        .audit(audit.clone())
        .build();

    // The second call queues behind the first prompt for 20s, then needs
    // another 20s of its own. Only the first fits in 30s.
    let mut first_ctx = SessionContext::new();
    let mut second_ctx = SessionContext::new();
    let (first, second) = tokio::join!(
        pipeline.invoke(&mut first_ctx, refund_call(500.0)),
        pipeline.invoke(&mut second_ctx, refund_call(600.0)),
    );

    let timed_out = [&first, &second]
        .iter()
        .filter(|r| matches!(r.error(), Some(InterceptError::ApprovalTimedOut { .. })))
        .count();
    assert_eq!(timed_out, 1);
    assert!(first.is_success() || second.is_success());
    assert_eq!(refund.calls(), 1);
    assert_eq!(audit.len().await, 2);
}

#[tokio::test]
async fn test_deny_rule_never_runs_tool() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let audit = Arc::new(MemoryAuditLog::new());
    let policy = PolicyTable::new(vec![PolicyRule::for_tool(
        "refunds-closed",
        "refund",
        RuleOutcome::deny("Refunds are closed for {tool}"),
    )])
    .unwrap();

    let pipeline = Pipeline::builder()
        .policy(policy)
        .tools(registry_with(&[refund.clone()]).await)
        .approval(Arc::new(StaticApproval::approve_all()))
        .audit(audit.clone())
        .build();

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(5.0)).await;

    assert_eq!(refund.calls(), 0);
    assert_eq!(report.text(), "Refunds are closed for refund");
    assert_eq!(
        report.error(),
        Some(&InterceptError::PolicyDenied {
            tool: "refund".to_string(),
            reason: "Refunds are closed for refund".to_string(),
        })
    );

    let records = audit.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].decision.label(), "deny");
}

/// A hook with a bug in it.
struct PanickingHook {
    name: String,
    points: [HookPoint; 1],
    mode: HookFailureMode,
}

impl PanickingHook {
    fn new(point: HookPoint, mode: HookFailureMode) -> Self {
        Self {
            name: format!("panics-{:?}", point),
            points: [point],
            mode,
        }
    }
}

#[async_trait]
impl Hook for PanickingHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn hook_points(&self) -> &[HookPoint] {
        &self.points
    }

    fn failure_mode(&self) -> HookFailureMode {
        self.mode
    }

    async fn execute(&self, _event: &HookEvent) -> Result<HookOutcome, HookError> {
        panic!("hook bug");
    }
}

async fn pipeline_with_hook(
    refund: &Arc<RecordingTool>,
    audit: &Arc<MemoryAuditLog>,
    hook: PanickingHook,
) -> Pipeline {
    let hooks = HookRegistry::new();
    hooks.register(Arc::new(hook)).await;
    Pipeline::builder()
        .tools(registry_with(&[refund.clone()]).await)
        .hooks(Arc::new(hooks))
        .audit(audit.clone())
        .build()
}

#[tokio::test]
async fn test_panicking_after_hook_still_audits() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let audit = Arc::new(MemoryAuditLog::new());
    let hook = PanickingHook::new(HookPoint::AfterToolCall, HookFailureMode::FailClosed);
    let pipeline = pipeline_with_hook(&refund, &audit, hook).await;

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(10.0)).await;

    assert_eq!(refund.calls(), 1);
    match report.error() {
        Some(InterceptError::OutputBlocked { reason, .. }) => {
            assert!(reason.contains("hook panicked: hook bug"));
        }
        other => panic!("expected OutputBlocked, got {:?}", other),
    }
    assert_eq!(audit.len().await, 1);
    assert_eq!(report.path.last(), Some(&InvocationState::Audited));
}

#[tokio::test]
async fn test_panicking_fail_open_hook_is_ignored() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let audit = Arc::new(MemoryAuditLog::new());
    let hook = PanickingHook::new(HookPoint::AfterToolCall, HookFailureMode::FailOpen);
    let pipeline = pipeline_with_hook(&refund, &audit, hook).await;

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(10.0)).await;

    assert!(report.is_success());
    assert_eq!(refund.calls(), 1);
    assert_eq!(audit.len().await, 1);
}

#[tokio::test]
async fn test_panicking_before_hook_denies() {
    let refund = Arc::new(RecordingTool::new("refund"));
    let audit = Arc::new(MemoryAuditLog::new());
    let hook = PanickingHook::new(HookPoint::BeforeToolCall, HookFailureMode::FailClosed);
    let pipeline = pipeline_with_hook(&refund, &audit, hook).await;

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(10.0)).await;

    assert_eq!(refund.calls(), 0);
    assert_eq!(report.decision.label(), "deny");
    assert!(matches!(
        report.error(),
        Some(InterceptError::PolicyDenied { .. })
    ));
    assert_eq!(audit.len().await, 1);
}

#[tokio::test]
async fn test_builtin_guards_block_sql_injection() {
    let hooks = HookRegistry::new();
    register_builtin_guards(&hooks).await;
    let audit = Arc::new(MemoryAuditLog::new());

    let pipeline = Pipeline::builder()
        .policy(builtin_table())
        .tools(Arc::new(ToolRegistry::with_builtin_tools().await))
        .hooks(Arc::new(hooks))
        .approval(Arc::new(StaticApproval::deny_all()))
        .audit(audit.clone())
        .build();

    let mut ctx = SessionContext::new();

    let clean = ToolCall::new(
        "run_sql_query",
        Parameters::new().with("user_query", "SELECT name FROM users"),
    );
    let report = pipeline.invoke(&mut ctx, clean).await;
    assert_eq!(report.text(), "Query executed: SELECT name FROM users");

    let attack = ToolCall::new(
        "run_sql_query",
        Parameters::new().with("user_query", "x' or 1=1 --"),
    );
    let report = pipeline.invoke(&mut ctx, attack).await;
    assert_eq!(
        report.decision,
        PolicyDecision::deny("Input blocked: Detected possible SQL injection pattern.")
    );
    assert!(matches!(
        report.error(),
        Some(InterceptError::PolicyDenied { .. })
    ));

    let empty = ToolCall::new("run_sql_query", Parameters::new().with("user_query", ""));
    let report = pipeline.invoke(&mut ctx, empty).await;
    assert_eq!(report.text(), "Query cannot be empty.");

    let records = audit.records().await;
    assert_eq!(records.len(), 3);
    assert!(records[0].decision.is_allow());
    assert_eq!(records[1].decision.label(), "deny");
    assert_eq!(records[2].decision.label(), "deny");
}

#[tokio::test]
async fn test_context_is_per_session() {
    let pipeline = Pipeline::builder()
        .policy(builtin_table())
        .tools(Arc::new(ToolRegistry::with_builtin_tools().await))
        .build();

    let mut alice = SessionContext::new();
    let mut anonymous = SessionContext::new();

    let identify = ToolCall::new(
        "set_user_context",
        Parameters::new()
            .with("user_id", "u-1")
            .with("user_name", "Alice")
            .with("language", "fr"),
    );
    assert!(pipeline.invoke(&mut alice, identify).await.is_success());

    let info = ToolCall::new("get_user_info", Parameters::new());
    let report = pipeline.invoke(&mut alice, info.clone()).await;
    assert!(report.text().contains("Name: Alice"));
    assert!(report.text().contains("Language: fr"));

    let report = pipeline.invoke(&mut anonymous, info).await;
    assert_eq!(
        report.text(),
        "No user context set. Please use set_user_context first."
    );

    assert_eq!(alice.user_id(), Some("u-1"));
    assert_eq!(anonymous.user_id(), None);
    assert_eq!(alice.invocation_count(), 2);
    assert_eq!(anonymous.invocation_count(), 1);
}

#[tokio::test]
async fn test_jsonl_audit_log_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit").join("calls.jsonl");
    let log = Arc::new(JsonlAuditLog::open(&path).await.unwrap());

    let refund = Arc::new(RecordingTool::new("refund"));
    let pipeline = Pipeline::builder()
        .policy(refund_policy())
        .tools(registry_with(&[refund.clone()]).await)
        .approval(Arc::new(StaticApproval::deny_all()))
        .audit(log.clone())
        .build();

    let mut ctx = SessionContext::new();
    let allowed = pipeline.invoke(&mut ctx, refund_call(10.0)).await;
    let refused = pipeline.invoke(&mut ctx, refund_call(1000.0)).await;

    let records = JsonlAuditLog::read_all(log.path()).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].invocation_id, allowed.invocation_id);
    assert_eq!(records[1].invocation_id, refused.invocation_id);
    assert_eq!(records[0].session_id, ctx.session_id());
    assert_eq!(records[1].outcome, refused.outcome);
    assert!(records[1].summary().contains("approval_rejected"));

    // Reopening appends rather than truncating.
    drop(pipeline);
    let reopened = JsonlAuditLog::open(&path).await.unwrap();
    reopened.record(&records[0]).await.unwrap();
    assert_eq!(JsonlAuditLog::read_all(&path).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_jsonl_reader_skips_torn_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.jsonl");
    let log = Arc::new(JsonlAuditLog::open(&path).await.unwrap());

    let pipeline = Pipeline::builder()
        .tools(registry_with(&[Arc::new(RecordingTool::new("refund"))]).await)
        .audit(log.clone())
        .build();
    let mut ctx = SessionContext::new();
    let first = pipeline.invoke(&mut ctx, refund_call(1.0)).await;

    // A write cut short by a crash, followed by a later good record.
    {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        file.write_all(b"{\"invocation_id\": \"a7f3\", \"tool_na\n")
            .unwrap();
    }
    let second = pipeline.invoke(&mut ctx, refund_call(2.0)).await;

    let records = JsonlAuditLog::read_all(&path).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].invocation_id, first.invocation_id);
    assert_eq!(records[1].invocation_id, second.invocation_id);
}

struct BrokenSink;

#[async_trait]
impl AuditSink for BrokenSink {
    async fn record(&self, _entry: &AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::Io(std::io::Error::other("disk full")))
    }
}

#[tokio::test]
async fn test_fanout_keeps_writing_past_a_broken_sink() {
    let memory = Arc::new(MemoryAuditLog::new());
    let fanout = FanoutAuditSink::new()
        .with(Arc::new(BrokenSink))
        .with(memory.clone());
    assert_eq!(fanout.len(), 2);

    let refund = Arc::new(RecordingTool::new("refund"));
    let pipeline = Pipeline::builder()
        .tools(registry_with(&[refund.clone()]).await)
        .audit(Arc::new(fanout))
        .build();

    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, refund_call(10.0)).await;

    // An audit failure does not change what the caller gets back.
    assert!(report.is_success());
    assert_eq!(refund.calls(), 1);
    assert_eq!(memory.len().await, 1);
}

#[tokio::test]
async fn test_fanout_reports_partial_failure() {
    let memory = Arc::new(MemoryAuditLog::new());
    let fanout = FanoutAuditSink::new()
        .with(memory.clone())
        .with(Arc::new(BrokenSink));

    let pipeline = Pipeline::builder()
        .audit(Arc::new(MemoryAuditLog::new()))
        .build();
    let mut ctx = SessionContext::new();
    let report = pipeline
        .invoke(&mut ctx, ToolCall::new("missing", Parameters::new()))
        .await;
    let invocation = ToolInvocation::new("missing", Parameters::new(), ctx.session_id());

    let err = fanout
        .record(&AuditRecord::new(&invocation, &report))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuditError::Partial {
            failed: 1,
            total: 2
        }
    ));
    assert_eq!(memory.len().await, 1);
}

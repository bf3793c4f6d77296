//! Test doubles for pipeline tests.
//!
//! Provides:
//! - [`RecordingTool`]: a tool that counts calls and remembers its last parameters
//! - [`ScriptedApproval`]: an approval channel that replays canned answers
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolgate::pipeline::Pipeline;
//! use toolgate::testing::{RecordingTool, ScriptedApproval};
//! use toolgate::tools::ToolRegistry;
//!
//! # async fn demo() {
//! let tool = Arc::new(RecordingTool::new("refund"));
//! let tools = Arc::new(ToolRegistry::new());
//! tools.register(tool.clone()).await;
//! let pipeline = Pipeline::builder()
//!     .tools(tools)
//!     .approval(Arc::new(ScriptedApproval::new([true])))
//!     .build();
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::approval::{ApprovalChannel, ApprovalRequest};
use crate::context::SessionContext;
use crate::error::ApprovalError;
use crate::policy::Parameters;
use crate::tools::{Tool, ToolError, ToolOutput};

/// What a [`RecordingTool`] does when executed.
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Return this text.
    Succeed(String),
    /// Return `ToolError::ExecutionFailed` with this message.
    Fail(String),
    /// Panic with this message.
    Panic(String),
    /// Sleep, then succeed.
    Sleep(Duration),
}

/// A tool stub that records every call.
pub struct RecordingTool {
    name: String,
    behavior: StubBehavior,
    timeout: Duration,
    call_count: AtomicU32,
    last_params: Mutex<Option<Parameters>>,
}

impl RecordingTool {
    /// A tool that succeeds with `"<name> ok"`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let text = format!("{} ok", name);
        Self::with_behavior(name, StubBehavior::Succeed(text))
    }

    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_behavior(name, StubBehavior::Fail(message.into()))
    }

    pub fn panicking(name: impl Into<String>) -> Self {
        Self::with_behavior(name, StubBehavior::Panic("stub tool panicked".into()))
    }

    pub fn with_behavior(name: impl Into<String>, behavior: StubBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            timeout: Duration::from_secs(60),
            call_count: AtomicU32::new(0),
            last_params: Mutex::new(None),
        }
    }

    /// Override the execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of times `execute` was called.
    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Parameters of the most recent call.
    pub fn last_params(&self) -> Option<Parameters> {
        self.last_params.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Test stub that records its calls"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}, "required": []})
    }

    fn execution_timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(
        &self,
        params: &Parameters,
        _ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_params.lock() {
            *last = Some(params.clone());
        }

        match &self.behavior {
            StubBehavior::Succeed(text) => Ok(ToolOutput::text(text.clone(), Duration::ZERO)),
            StubBehavior::Fail(message) => Err(ToolError::ExecutionFailed(message.clone())),
            StubBehavior::Panic(message) => panic!("{}", message),
            StubBehavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(ToolOutput::text(format!("{} ok", self.name), *duration))
            }
        }
    }
}

/// An approval channel that answers from a script.
///
/// Answers are used in order. Once the script runs out every request is
/// denied.
pub struct ScriptedApproval {
    answers: Mutex<VecDeque<bool>>,
    delay: Option<Duration>,
    request_count: AtomicU32,
    seen: Mutex<Vec<ApprovalRequest>>,
}

impl ScriptedApproval {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            delay: None,
            request_count: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of approval requests received.
    pub fn requests(&self) -> u32 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every request received, oldest first.
    pub fn seen(&self) -> Vec<ApprovalRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ApprovalChannel for ScriptedApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<bool, ApprovalError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let answer = self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front());
        Ok(answer.unwrap_or(false))
    }
}
